pub mod inactivity;
pub mod retry;
