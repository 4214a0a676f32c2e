//! Persisted module records.
//!
//! # Responsibility
//! - Define the manifest, configuration and migration ledger shapes shared by
//!   the registry, the gateway and the store.
//!
//! # Invariants
//! - `ModuleManifest::id` always equals the owning descriptor id.
//! - `MigrationRecord` values are append-only; nothing mutates them after insert.
//! - Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable module identifier (descriptor `id`).
pub type ModuleId = String;

/// Key-value settings document stored per module.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Persisted projection of one registered descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub id: ModuleId,
    pub name: String,
    /// Opaque version string; compared for equality only.
    pub version: String,
    pub description: String,
    pub author: String,
    /// Required module ids in declared order.
    pub requires: Vec<String>,
    /// Capability tags in declared order.
    pub permissions: Vec<String>,
    pub is_enabled: bool,
    pub install_date: i64,
    pub update_date: i64,
}

/// Per-module settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfiguration {
    pub module_id: ModuleId,
    pub settings: Settings,
    /// `None` until the configuration has been persisted once.
    pub last_updated: Option<i64>,
}

impl ModuleConfiguration {
    /// Creates a configuration with the given settings, not yet persisted.
    pub fn new(module_id: impl Into<ModuleId>, settings: Settings) -> Self {
        Self {
            module_id: module_id.into(),
            settings,
            last_updated: None,
        }
    }

    /// Empty settings used when no configuration was ever stored.
    pub fn empty(module_id: impl Into<ModuleId>) -> Self {
        Self::new(module_id, Settings::new())
    }

    /// Returns whether this value was read back from the store.
    pub fn is_persisted(&self) -> bool {
        self.last_updated.is_some()
    }
}

/// One row of the append-only migration ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Surrogate ledger id.
    pub id: Uuid,
    pub module_id: ModuleId,
    pub version: String,
    pub description: String,
    pub applied_at: i64,
}

/// Current wall clock as epoch milliseconds.
///
/// Clocks set before 1970 collapse to `0` instead of failing.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
