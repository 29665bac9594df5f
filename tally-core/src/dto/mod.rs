//! Data Transfer Objects for the HTTP API
//!
//! Requests accepted by the server and the response shapes it returns. Task
//! responses come in two explicit shapes: a summary used in listings and a
//! detail view that also carries the result history.

pub mod datetime;
pub mod schedule;
pub mod task;
