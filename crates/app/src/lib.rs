//! # mailflow-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AutomationRepository` — CRUD for automations, cancelling scheduled
//!     sends when an automation stops accepting enrollments
//!   - `QueueRepository` — enqueue, claim, compare-and-swap updates, stats
//!   - `EmailTransport` — deliver one rendered email
//! - Define **driving/inbound ports** as use-case structs:
//!   - `AutomationService` — CRUD, status/enabled toggles, default catalogue
//!   - `TriggerRouter` — match events to automations and enroll recipients
//!   - `QueueScheduler` — turn one enrollment into scheduled queue items
//!   - `QueueProcessor` — claim due items, render, dispatch, record outcome
//!   - `RetryManager` — manual retry and cancel
//!   - `QueueInspector` — listing and statistics
//! - Provide the periodic `QueueWorker` driving the processor
//!
//! ## Dependency rule
//! Depends on `mailflow-domain` only (plus `tokio` for timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;

#[cfg(any(test, feature = "testing"))]
#[allow(clippy::missing_panics_doc)]
pub mod testing;
