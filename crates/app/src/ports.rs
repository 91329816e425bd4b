//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod automation_repo;
pub mod email_transport;
pub mod queue_repo;

pub use automation_repo::AutomationRepository;
pub use email_transport::EmailTransport;
pub use queue_repo::{QueueFilter, QueueRepository};
