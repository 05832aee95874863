//! Domain model for the event-sourced CRM core.
//!
//! # Responsibility
//! - Define the immutable `Event` envelope and its closed payload registry.
//! - Define entity and relation records projected into the `Document`.
//!
//! # Invariants
//! - Events are the sole unit of causality; entities never carry history.
//! - Every entity id is an opaque string that is never reused.

pub mod entity;
pub mod event;
pub mod relation;
