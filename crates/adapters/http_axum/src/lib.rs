//! # mailflow-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **JSON admin API** under `/api` (automations, queue
//!   inspection and control, event ingestion, manual enrollment)
//! - Guard `/api` with a bearer token check
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`MailflowError`](mailflow_domain::error::MailflowError) into HTTP
//!   status codes
//!
//! ## Dependency rule
//! Depends on `mailflow-app` (for port traits and services) and
//! `mailflow-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod auth;
pub mod error;
pub mod router;
pub mod state;
