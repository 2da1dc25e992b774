pub mod identity;
pub mod plans;
pub mod progress;
