//! # mailflow-domain
//!
//! Pure domain model for the mailflow email automation service.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Automations** (trigger → template or multi-step sequence)
//! - Define **Queue items** (one scheduled send per recipient and step) and
//!   their status lifecycle
//! - Define **Recipients** and **Events** (the domain signals that enroll them)
//! - Placeholder rendering for subjects and bodies
//! - The built-in catalogue of system automations
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod event;
pub mod placeholder;
pub mod queue;
pub mod recipient;
pub mod seed;
