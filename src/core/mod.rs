pub mod attendance;
pub mod recognition;
pub mod services;
