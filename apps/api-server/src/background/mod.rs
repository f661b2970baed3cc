//! Background jobs that run beside the HTTP server.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};
