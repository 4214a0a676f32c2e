//! Store access for module state.
//!
//! # Responsibility
//! - Define the durable store contract the persistence gateway depends on.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`InvalidData`) in addition to DB
//!   transport errors.

pub mod module_repo;
