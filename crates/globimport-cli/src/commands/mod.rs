pub mod project;
pub mod transform;
pub mod watch;
