//! # Intake Core
//!
//! The admission control domain: quota policies, usage windows, duplicate
//! suppression and cooldown locks, plus the engine that combines them.
//! All shared state goes through the ports in [`ports`]; this crate has no
//! infrastructure dependencies.

pub mod admission;
pub mod domain;
pub mod error;
pub mod ports;

pub use admission::{AdmissionConfig, AdmissionEngine};
pub use error::{PolicyError, RequestError};
