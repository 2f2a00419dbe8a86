//! # Event Log Ingest
//!
//! Minimal analytics event ingestion service: accepts JSON events over
//! HTTP and appends each one as a document in the Firestore collection
//! `event_logs`.
//!
//! ## Architecture
//!
//! - [`models`]: the [`models::LogEntry`] record and its validation
//! - [`db`]: the [`db::LogStore`] trait and its Firestore, local and degraded implementations
//! - [`http`]: axum router and handlers for `POST /log` and `GET /health`
//! - [`config`]: server settings read from the environment
//!
//! If the store cannot be reached at startup the server still runs, with
//! `/health` reporting `db_down` and every `/log` write failing with 500.

pub mod config;
pub mod db;
pub mod models;

#[cfg(feature = "http-server")]
pub mod http;
