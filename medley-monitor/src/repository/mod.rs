//! Repository Module
//!
//! Data access for the non-pipeline tables. Pipeline documents go through
//! the store layer instead, which adds the concurrency control they need.

pub mod event;

pub use event as event_repository;
