//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod automation_service;
pub mod queue_inspector;
pub mod queue_processor;
pub mod queue_scheduler;
pub mod queue_worker;
pub mod retry_manager;
pub mod trigger_router;
