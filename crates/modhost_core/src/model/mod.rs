//! Data shapes for module state and UI contributions.
//!
//! # Responsibility
//! - Define the records persisted by the gateway (manifests, configurations,
//!   migration ledger rows).
//! - Define ephemeral extension contributions rendered by the host.

pub mod extension;
pub mod module;
