//! Core domain types
//!
//! This module contains the core domain structures used across Tally crates.
//! These types represent the fundamental business entities and are shared between
//! the server (for persistence) and the client (for display).

pub mod schedule;
pub mod task;
