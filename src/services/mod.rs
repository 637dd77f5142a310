pub mod enrolments;
pub mod scheduler;
pub mod sync_service;

pub use scheduler::SyncScheduler;
pub use sync_service::{SYNC_SUCCESS_MESSAGE, SyncReport, SyncService};
