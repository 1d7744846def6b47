pub mod attendance;
pub mod qr_code;
pub mod role;
pub mod user;
