//! Persistence gateway for module state.
//!
//! # Responsibility
//! - Reconcile registry state with the durable store at boot.
//! - Orchestrate enable/disable: migrations, registry flag, manifest persist.
//! - Read and write module configurations with schema validation.
//!
//! # Invariants
//! - The gateway is the only component that talks to the store.
//! - `enable_module` runs migrations, then the registry flip, then the
//!   manifest write, stopping at the first failure.
//! - A ledgered migration version is never executed again.
//! - Migrations are never rolled back by disable or by a failed enable.

use crate::model::module::{MigrationRecord, ModuleConfiguration, ModuleManifest};
use crate::module::boundary::guard;
use crate::module::descriptor::{ModuleDescriptor, ModuleMigration};
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::registry::ModuleRegistry;
use crate::repo::module_repo::ModuleRepository;
use log::{error, info, warn};
use std::time::Instant;

/// Synchronizes one registry with one module store.
///
/// The registry is borrowed for the gateway's lifetime; the host composition
/// root owns both and builds a gateway per operation.
pub struct PersistenceGateway<'r, R: ModuleRepository> {
    registry: &'r mut ModuleRegistry,
    repo: R,
    enforce_requires: bool,
}

impl<'r, R: ModuleRepository> PersistenceGateway<'r, R> {
    /// Creates a gateway with requirement enforcement enabled.
    pub fn new(registry: &'r mut ModuleRegistry, repo: R) -> Self {
        Self {
            registry,
            repo,
            enforce_requires: true,
        }
    }

    /// Toggles checking of `requires` on enable/disable.
    pub fn with_requirement_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_requires = enforce;
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &*self.registry
    }

    /// Ensures the store schema and loads persisted manifests.
    ///
    /// No-op once the registry is marked initialized. Does not retry.
    pub fn initialize(&mut self) -> ModuleResult<()> {
        if self.registry.is_initialized() {
            return Ok(());
        }

        let started_at = Instant::now();
        info!("event=gateway_init module=gateway status=start");
        let loaded = self
            .repo
            .ensure_schema()
            .and_then(|()| self.repo.load_manifests());
        let manifests = match loaded {
            Ok(manifests) => manifests,
            Err(err) => {
                error!(
                    "event=gateway_init module=gateway status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(ModuleError::Initialization(err));
            }
        };

        let count = manifests.len();
        self.registry.seed_persisted(manifests);
        self.registry.mark_initialized();
        info!(
            "event=gateway_init module=gateway status=ok duration_ms={} manifests={count}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Registers a descriptor and records its manifest.
    ///
    /// When the store says the module was enabled, it is resumed through the
    /// full enable sequence. A failed resume is logged and leaves the module
    /// disabled in memory; it does not fail registration. When the manifest
    /// cannot be stored the registry entry is dropped again.
    pub fn register_module(&mut self, descriptor: Box<dyn ModuleDescriptor>) -> ModuleResult<()> {
        self.ensure_initialized()?;
        let module_id = descriptor.id().trim().to_string();
        self.registry.register(descriptor)?;
        if let Err(err) = self.record_registration(&module_id) {
            self.registry.unregister(&module_id);
            error!(
                "event=module_register module=gateway status=error module_id={module_id} error_code={} error={err}",
                err.code()
            );
            return Err(err);
        }
        self.resume_pending();
        Ok(())
    }

    /// Upserts one manifest by id.
    pub fn save_manifest(&self, manifest: &ModuleManifest) -> ModuleResult<()> {
        self.repo
            .upsert_manifest(manifest)
            .map_err(ModuleError::Persistence)
    }

    /// Applies every not-yet-ledgered migration in declared order.
    ///
    /// Stops at the first failing migration; earlier ones stay applied.
    /// Returns the ledger rows written by this call.
    pub fn apply_migrations(
        &self,
        module_id: &str,
        migrations: &[ModuleMigration],
    ) -> ModuleResult<Vec<MigrationRecord>> {
        let mut applied = self
            .repo
            .applied_versions(module_id)
            .map_err(ModuleError::Persistence)?;

        let mut written = Vec::new();
        for migration in migrations {
            if applied.contains(migration.version.as_str()) {
                continue;
            }

            let started_at = Instant::now();
            let record = self
                .repo
                .apply_migration(module_id, migration)
                .map_err(|cause| {
                    error!(
                        "event=module_migration module=gateway status=error module_id={module_id} version={} duration_ms={} error={}",
                        migration.version,
                        started_at.elapsed().as_millis(),
                        cause
                    );
                    ModuleError::Migration {
                        module_id: module_id.to_string(),
                        version: migration.version.clone(),
                        cause,
                    }
                })?;
            info!(
                "event=module_migration module=gateway status=ok module_id={module_id} version={} duration_ms={}",
                record.version,
                started_at.elapsed().as_millis()
            );
            applied.insert(record.version.clone());
            written.push(record);
        }
        Ok(written)
    }

    /// Enables one module: migrations, then `on_enable`, then persist.
    pub fn enable_module(&mut self, module_id: &str) -> ModuleResult<()> {
        self.ensure_initialized()?;
        let module_id = self.require_registered(module_id)?;
        if self.enforce_requires {
            if let Some(required) = self.registry.unmet_requirement(&module_id) {
                return Err(ModuleError::UnsatisfiedRequirement {
                    module_id,
                    required,
                });
            }
        }

        self.registry.take_pending_resume(&module_id);
        self.run_enable_sequence(&module_id)?;
        self.resume_pending();
        Ok(())
    }

    /// Disables one module and persists the flag. Never touches the ledger.
    pub fn disable_module(&mut self, module_id: &str) -> ModuleResult<()> {
        self.ensure_initialized()?;
        let module_id = self.require_registered(module_id)?;
        if self.enforce_requires {
            if let Some(dependent) = self.registry.enabled_dependent(&module_id) {
                return Err(ModuleError::RequiredByEnabled {
                    module_id,
                    dependent,
                });
            }
        }

        self.registry.take_pending_resume(&module_id);
        self.registry.set_enabled(&module_id, false)?;
        self.persist_current(&module_id)?;
        info!("event=module_disable module=gateway status=ok module_id={module_id}");
        Ok(())
    }

    /// Reads a module configuration, filling schema defaults.
    ///
    /// Missing configuration yields empty settings, never an error.
    pub fn get_configuration(&self, module_id: &str) -> ModuleResult<ModuleConfiguration> {
        self.ensure_initialized()?;
        let module_id = module_id.trim();
        let mut configuration = self
            .repo
            .get_configuration(module_id)
            .map_err(ModuleError::Persistence)?
            .unwrap_or_else(|| ModuleConfiguration::empty(module_id));

        if let Some(descriptor) = self.registry.get(module_id) {
            let schema = guard(module_id, "config_schema", || Ok(descriptor.config_schema()))
                .map_err(|err| ModuleError::hook(module_id, "config_schema", err))?;
            if let Some(schema) = schema {
                configuration.settings = schema.with_defaults(&configuration.settings);
            }
        }
        Ok(configuration)
    }

    /// Validates settings against the module schema, then upserts them.
    pub fn save_configuration(
        &self,
        configuration: &ModuleConfiguration,
    ) -> ModuleResult<ModuleConfiguration> {
        self.ensure_initialized()?;
        let module_id = self.require_registered(&configuration.module_id)?;
        let descriptor = self
            .registry
            .get(&module_id)
            .ok_or_else(|| ModuleError::NotFound(module_id.clone()))?;

        let schema = guard(&module_id, "config_schema", || Ok(descriptor.config_schema()))
            .map_err(|err| ModuleError::hook(&module_id, "config_schema", err))?;
        if let Some(schema) = schema {
            schema
                .validate(&configuration.settings)
                .map_err(|violation| ModuleError::InvalidConfiguration {
                    module_id: module_id.clone(),
                    violation,
                })?;
        }

        self.ensure_manifest_row(&module_id)?;
        let normalized = ModuleConfiguration {
            module_id: module_id.clone(),
            ..configuration.clone()
        };
        let saved = self
            .repo
            .upsert_configuration(&normalized)
            .map_err(ModuleError::Persistence)?;
        info!("event=module_config_save module=gateway status=ok module_id={module_id}");
        Ok(saved)
    }

    /// Ledger rows for one module in application order.
    pub fn migration_history(&self, module_id: &str) -> ModuleResult<Vec<MigrationRecord>> {
        self.repo
            .list_migrations(module_id.trim())
            .map_err(ModuleError::Persistence)
    }

    fn run_enable_sequence(&mut self, module_id: &str) -> ModuleResult<()> {
        let started_at = Instant::now();
        info!("event=module_enable module=gateway status=start module_id={module_id}");
        let result = self.enable_steps(module_id);
        match &result {
            Ok(()) => info!(
                "event=module_enable module=gateway status=ok module_id={module_id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=module_enable module=gateway status=error module_id={module_id} duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    fn enable_steps(&mut self, module_id: &str) -> ModuleResult<()> {
        // Ledger rows reference the manifest row.
        self.ensure_manifest_row(module_id)?;

        let descriptor = self
            .registry
            .get(module_id)
            .ok_or_else(|| ModuleError::NotFound(module_id.to_string()))?;
        let migrations = guard(module_id, "migrations", || Ok(descriptor.migrations()))
            .map_err(|err| ModuleError::hook(module_id, "migrations", err))?;
        self.apply_migrations(module_id, &migrations)?;

        self.registry.set_enabled(module_id, true)?;

        if let Err(err) = self.persist_current(module_id) {
            // Keep memory and store agreeing on "disabled" when the write fails.
            if let Err(revert) = self.registry.set_enabled(module_id, false) {
                error!(
                    "event=module_enable_revert module=gateway status=error module_id={module_id} error={revert}"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn resume_pending(&mut self) {
        loop {
            let mut progressed = false;
            for module_id in self.registry.pending_resumes() {
                if self.enforce_requires && self.registry.unmet_requirement(&module_id).is_some() {
                    continue;
                }
                self.registry.take_pending_resume(&module_id);
                match self.run_enable_sequence(&module_id) {
                    Ok(()) => {
                        progressed = true;
                        info!("event=module_resume module=gateway status=ok module_id={module_id}");
                    }
                    Err(err) => warn!(
                        "event=module_resume module=gateway status=error module_id={module_id} error={err}"
                    ),
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn record_registration(&self, module_id: &str) -> ModuleResult<()> {
        let Some(current) = self.registry.manifest(module_id) else {
            return Err(ModuleError::NotFound(module_id.to_string()));
        };
        let Some(previous) = self.registry.persisted_manifest(module_id) else {
            return self.save_manifest(current);
        };

        let mut merged = current.clone();
        merged.is_enabled = previous.is_enabled;
        if same_identity(&merged, previous) {
            return Ok(());
        }
        self.save_manifest(&merged)
    }

    fn ensure_manifest_row(&self, module_id: &str) -> ModuleResult<()> {
        let stored = self
            .repo
            .get_manifest(module_id)
            .map_err(ModuleError::Persistence)?;
        if stored.is_some() {
            return Ok(());
        }
        self.persist_current(module_id)
    }

    fn persist_current(&self, module_id: &str) -> ModuleResult<()> {
        let manifest = self
            .registry
            .manifest(module_id)
            .ok_or_else(|| ModuleError::NotFound(module_id.to_string()))?;
        self.save_manifest(manifest)
    }

    fn require_registered(&self, module_id: &str) -> ModuleResult<String> {
        let module_id = module_id.trim();
        if !self.registry.contains(module_id) {
            return Err(ModuleError::NotFound(module_id.to_string()));
        }
        Ok(module_id.to_string())
    }

    fn ensure_initialized(&self) -> ModuleResult<()> {
        if self.registry.is_initialized() {
            Ok(())
        } else {
            Err(ModuleError::NotInitialized)
        }
    }
}

fn same_identity(current: &ModuleManifest, stored: &ModuleManifest) -> bool {
    current.name == stored.name
        && current.version == stored.version
        && current.description == stored.description
        && current.author == stored.author
        && current.requires == stored.requires
        && current.permissions == stored.permissions
}
