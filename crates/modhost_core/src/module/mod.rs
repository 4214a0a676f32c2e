//! Module subsystem.
//!
//! Descriptors declare what a module is and contributes; the registry holds
//! them for the process lifetime. Persistence and aggregation live in
//! `service`.

pub mod boundary;
pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod schema;
