pub mod attendance;
pub mod branch;
pub mod employee;
pub mod holiday;
pub mod role;
pub mod settings;
