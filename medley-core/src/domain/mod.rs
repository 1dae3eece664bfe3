//! Core domain types
//!
//! The pipeline aggregate and the enums that describe its steps. Shared
//! between the monitor service (which persists and advances pipelines) and
//! the test suites.

pub mod media;
pub mod pipeline;
