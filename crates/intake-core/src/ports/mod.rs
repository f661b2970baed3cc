//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod counter_store;
mod work_queue;

pub use counter_store::{CounterStore, StoreError};
pub use work_queue::{QueueError, WorkQueue};
