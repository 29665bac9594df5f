//! Service Module
//!
//! Business logic layer for the server.
//! Services orchestrate between the stores and the work queue.

pub mod schedule;
pub mod schedule_manager;
pub mod task;

pub use schedule::ScheduleService;
pub use schedule_manager::{ScheduleError, ScheduleManager};
pub use task::{TaskError, TaskService};
