//! Background jobs
//!
//! Schedulers own their task handle and cancellation token, and are started
//! and stopped explicitly.

pub mod error;
pub mod notification_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use notification_scheduler::{NotificationScheduler, NotificationSchedulerConfig};
