//! Module use-case services.
//!
//! # Responsibility
//! - Orchestrate registry transitions with store persistence (`gateway`).
//! - Derive UI contributions from enabled modules (`aggregator`).
//!
//! # See also
//! - `crate::host` for the composition root that wires both.

pub mod aggregator;
pub mod gateway;
