//! Medley Monitor
//!
//! Tracks a media request's lifecycle across the services that handle it.
//! Webhook deliveries from Ombi, Sonarr, and Radarr advance a persisted
//! per-title pipeline; the requester is notified on Discord when their title
//! lands in the library.
//!
//! Layering follows api -> ingest/engine -> store/repository. The engine owns
//! all pipeline mutation: per-id serialization plus versioned upserts keep
//! concurrent webhook deliveries from losing each other's updates.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod ingest;
pub mod registry;
pub mod repository;
pub mod steps;
pub mod store;
