//! Scheduler layer
//!
//! The beat periodically reads enabled job definitions from the trigger store
//! and submits the ones that are due to the work queue. Only one beat should
//! run per deployment.

pub mod beat;

pub use beat::Beat;
