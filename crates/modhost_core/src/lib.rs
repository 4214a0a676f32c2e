//! Core of the module host.
//! Registry, persistence gateway and extension aggregation for in-process
//! modules, backed by SQLite.

pub mod config;
pub mod db;
pub mod host;
pub mod logging;
pub mod model;
pub mod module;
pub mod repo;
pub mod service;

pub use config::{ConfigError, HostConfig};
pub use host::ModuleHost;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::extension::{DashboardEntry, DashboardItem, NavigationEntry, NavigationItem};
pub use model::module::{MigrationRecord, ModuleConfiguration, ModuleManifest, Settings};
pub use module::builtin::StaticModule;
pub use module::descriptor::{HookError, HookResult, ModuleDescriptor, ModuleMigration};
pub use module::error::{ModuleError, ModuleResult};
pub use module::registry::ModuleRegistry;
pub use module::schema::{ConfigField, ConfigSchema, SchemaViolation, SettingKind};
pub use repo::module_repo::{ModuleRepository, RepoError, RepoResult, SqliteModuleRepository};
pub use service::aggregator::{ExtensionAggregator, ExtensionSnapshot};
pub use service::gateway::PersistenceGateway;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
