use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::lock::Mutex as AsyncMutex;

/// One async mutex per user id. Check-in and check-out hold it across their
/// read and write so two writes for the same user never interleave.
///
/// Entries live for the life of the process, one per user that has written.
#[derive(Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `user_id`; callers `.lock().await` it.
    pub fn slot(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
