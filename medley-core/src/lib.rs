//! Medley Core
//!
//! Core types for the Medley media-request tracker.
//!
//! This crate contains:
//! - Domain types: the pipeline aggregate and its step/status/key enums
//! - DTOs: inbound webhook payload models for the monitored services

pub mod domain;
pub mod dto;
