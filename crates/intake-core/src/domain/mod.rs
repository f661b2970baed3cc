//! Domain entities - the core business objects.

mod lock;
mod outcome;
mod policy;
mod submission;
mod window;

pub use lock::{CooldownLock, LockReason};
pub use outcome::{FailureCause, Outcome};
pub use policy::QuotaPolicy;
pub use submission::{DuplicateRecord, Submission, WorkItem};
pub use window::{ProcessingCalendar, UsageWindow, WindowBounds, WindowKind, ttl_until};
