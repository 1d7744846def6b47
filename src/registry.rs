//! Lookups the attendance core consumes from the user and QR code registries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::ledger::error::StoreError;
use crate::model::qr_code::QrCode;
use crate::model::user::PrincipalInfo;

/// Display fields for a principal. Used to enrich listings only.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup_display_info(
        &self,
        user_id: &str,
    ) -> Result<Option<PrincipalInfo>, StoreError>;
}

/// Resolves a scanned QR payload to the registered code.
#[async_trait]
pub trait QrCodeLookup: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<QrCode>, StoreError>;
}

/// Keeps recently seen principals in memory so paging through a listing does
/// not hit the users table once per row. Misses are not cached.
pub struct CachedDirectory {
    inner: Arc<dyn Directory>,
    cache: Cache<String, PrincipalInfo>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn Directory>, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drops a cached entry after the user row changed.
    pub async fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
    }
}

#[async_trait]
impl Directory for CachedDirectory {
    async fn lookup_display_info(
        &self,
        user_id: &str,
    ) -> Result<Option<PrincipalInfo>, StoreError> {
        if let Some(info) = self.cache.get(user_id).await {
            return Ok(Some(info));
        }

        let found = self.inner.lookup_display_info(user_id).await?;
        if let Some(info) = &found {
            self.cache.insert(user_id.to_string(), info.clone()).await;
        }
        Ok(found)
    }
}
