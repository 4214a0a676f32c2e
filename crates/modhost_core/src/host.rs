//! Host composition root.
//!
//! # Responsibility
//! - Own the store connection and the module registry for one process.
//! - Boot the persistence gateway before any module registers.
//! - Expose the host-facing surface: bool-returning lifecycle calls plus
//!   manifest, extension and configuration reads.
//!
//! # Invariants
//! - A `ModuleHost` is always initialized; construction fails otherwise.
//! - Lifecycle failures are logged and kept as `last_error`, never panicked.

use crate::config::HostConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::model::extension::{DashboardEntry, NavigationEntry};
use crate::model::module::{MigrationRecord, ModuleConfiguration, ModuleManifest};
use crate::module::descriptor::ModuleDescriptor;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::registry::ModuleRegistry;
use crate::repo::module_repo::{RepoError, SqliteModuleRepository};
use crate::service::aggregator::ExtensionAggregator;
use crate::service::gateway::PersistenceGateway;
use log::warn;
use rusqlite::Connection;

/// Process-wide owner of module state.
pub struct ModuleHost {
    conn: Connection,
    registry: ModuleRegistry,
    config: HostConfig,
    last_error: Option<ModuleError>,
}

impl ModuleHost {
    /// Opens the configured store and initializes the gateway.
    pub fn open(config: HostConfig) -> ModuleResult<Self> {
        let opened = match &config.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        };
        let conn = opened.map_err(|err| ModuleError::Initialization(RepoError::Db(err)))?;
        Self::from_connection(conn, config)
    }

    /// Boots a host over an already opened connection.
    pub fn from_connection(conn: Connection, config: HostConfig) -> ModuleResult<Self> {
        let mut host = Self {
            conn,
            registry: ModuleRegistry::new(),
            config,
            last_error: None,
        };
        host.gateway().initialize()?;
        Ok(host)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Error recorded by the most recent failed `register`/`enable`/`disable`.
    pub fn last_error(&self) -> Option<&ModuleError> {
        self.last_error.as_ref()
    }

    /// Registers a module; a persisted "enabled" state is resumed.
    pub fn register(&mut self, descriptor: Box<dyn ModuleDescriptor>) -> bool {
        let module_id = descriptor.id().trim().to_string();
        let result = self.gateway().register_module(descriptor);
        self.settle("register", &module_id, result)
    }

    pub fn enable(&mut self, module_id: &str) -> bool {
        let result = self.gateway().enable_module(module_id);
        self.settle("enable", module_id, result)
    }

    pub fn disable(&mut self, module_id: &str) -> bool {
        let result = self.gateway().disable_module(module_id);
        self.settle("disable", module_id, result)
    }

    pub fn is_enabled(&self, module_id: &str) -> bool {
        self.registry.is_enabled(module_id)
    }

    /// Manifests of registered modules in registration order.
    pub fn list_manifests(&self) -> Vec<ModuleManifest> {
        self.registry.list_manifests()
    }

    pub fn dashboard_extensions(&self) -> Vec<DashboardEntry> {
        ExtensionAggregator::new(&self.registry).dashboard()
    }

    pub fn navigation_extensions(&self) -> Vec<NavigationEntry> {
        ExtensionAggregator::new(&self.registry).navigation()
    }

    pub fn get_configuration(&mut self, module_id: &str) -> ModuleResult<ModuleConfiguration> {
        self.gateway().get_configuration(module_id)
    }

    pub fn save_configuration(
        &mut self,
        configuration: &ModuleConfiguration,
    ) -> ModuleResult<ModuleConfiguration> {
        self.gateway().save_configuration(configuration)
    }

    pub fn migration_history(&mut self, module_id: &str) -> ModuleResult<Vec<MigrationRecord>> {
        self.gateway().migration_history(module_id)
    }

    fn gateway(&mut self) -> PersistenceGateway<'_, SqliteModuleRepository<'_>> {
        PersistenceGateway::new(&mut self.registry, SqliteModuleRepository::new(&self.conn))
            .with_requirement_enforcement(self.config.enforce_requires)
    }

    fn settle(&mut self, action: &'static str, module_id: &str, result: ModuleResult<()>) -> bool {
        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                warn!(
                    "event=host_{action} module=host status=error module_id={module_id} error_code={} error={err}",
                    err.code()
                );
                self.last_error = Some(err);
                false
            }
        }
    }
}
