//! Admission control services built on the counter store port.

mod duplicates;
mod engine;
mod keys;
mod locks;
mod policies;
mod usage;

#[cfg(test)]
mod testing;

pub use duplicates::{DEFAULT_DUPLICATE_RETENTION, DuplicateCheck, DuplicateSuppressor};
pub use engine::{AdmissionConfig, AdmissionEngine, DEFAULT_QUEUE_NAME};
pub use keys::{DEFAULT_KEY_PREFIX, KeySpace};
pub use locks::CooldownLocks;
pub use policies::PolicyRegistry;
pub use usage::UsageCounter;
