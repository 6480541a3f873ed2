pub mod attendance;
pub mod login;
pub mod overtime;
pub mod router;
