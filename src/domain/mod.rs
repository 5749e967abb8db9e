//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the quota system:
//! - Action and identity value types
//! - Tier configuration and counting-key derivation
//! - The sliding-window record log and quota snapshots
//! - Attempt outcomes surfaced to the caller
//!
//! All types in this layer are pure and easily testable.

pub mod action;
pub mod outcome;
pub mod tier;
pub mod window;
