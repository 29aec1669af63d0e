pub mod attendance;
pub mod reason;
pub mod role;
pub mod user;
