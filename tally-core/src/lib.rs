//! Tally Core
//!
//! Core types shared by the Tally server, client and CLI.
//!
//! This crate contains:
//! - Domain types: Core business entities (Task, TaskResult, TaskSchedule)
//! - DTOs: Request and response shapes of the HTTP API

pub mod domain;
pub mod dto;
