//! # mailflow-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `AutomationRepository` and `QueueRepository` from `mailflow-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! Both repositories share one pool, so changing an automation and cancelling
//! its scheduled queue items happen in a single transaction.
//!
//! ## Dependency rule
//! Depends on `mailflow-app` (for port traits) and `mailflow-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod automation_repo;
mod codec;
mod error;
mod pool;
mod queue_repo;

pub use automation_repo::SqliteAutomationRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use queue_repo::SqliteQueueRepository;
