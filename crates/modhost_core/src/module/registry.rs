//! In-memory module registry.
//!
//! # Responsibility
//! - Own every registered descriptor and its manifest for this process.
//! - Run lifecycle hooks before committing the state they guard.
//!
//! # Invariants
//! - One entry per module id; duplicates are rejected, never merged.
//! - `is_enabled` flips only after the matching hook returned `Ok`.
//! - Iteration follows registration order.
//! - No I/O: persisted state arrives through `seed_persisted` and leaves
//!   through the gateway.

use crate::model::module::{now_epoch_ms, ModuleManifest};
use crate::module::boundary::guard;
use crate::module::descriptor::ModuleDescriptor;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::manifest::{project_manifest, validate_descriptor};
use log::info;
use std::collections::{BTreeMap, BTreeSet};

/// One registered module: live descriptor plus its manifest.
pub struct RegisteredModule {
    descriptor: Box<dyn ModuleDescriptor>,
    manifest: ModuleManifest,
}

impl RegisteredModule {
    pub fn descriptor(&self) -> &dyn ModuleDescriptor {
        self.descriptor.as_ref()
    }

    pub fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    pub fn id(&self) -> &str {
        self.manifest.id.as_str()
    }

    pub fn is_enabled(&self) -> bool {
        self.manifest.is_enabled
    }
}

/// Registry of modules known to this process.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<RegisteredModule>,
    index: BTreeMap<String, usize>,
    persisted: BTreeMap<String, ModuleManifest>,
    resume_pending: BTreeSet<String>,
    initialized: bool,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one descriptor.
    ///
    /// Runs `on_register`, then `on_update(previous)` when a persisted manifest
    /// carries a different version. Any failure leaves the registry unchanged.
    pub fn register(&mut self, descriptor: Box<dyn ModuleDescriptor>) -> ModuleResult<()> {
        validate_descriptor(descriptor.as_ref())?;
        let id = descriptor.id().trim().to_string();
        if self.index.contains_key(id.as_str()) {
            return Err(ModuleError::Duplicate(id));
        }

        guard(&id, "on_register", || descriptor.on_register())
            .map_err(|err| ModuleError::hook(&id, "on_register", err))?;

        let now = now_epoch_ms();
        let mut manifest = project_manifest(descriptor.as_ref(), now);
        if let Some(previous) = self.persisted.get(id.as_str()) {
            if previous.version != manifest.version {
                guard(&id, "on_update", || descriptor.on_update(&previous.version))
                    .map_err(|err| ModuleError::hook(&id, "on_update", err))?;
                info!(
                    "event=module_update module=registry status=ok module_id={id} from={} to={}",
                    previous.version, manifest.version
                );
            }
            manifest.install_date = previous.install_date;
        }

        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(RegisteredModule {
            descriptor,
            manifest,
        });
        info!("event=module_register module=registry status=ok module_id={id}");
        Ok(())
    }

    /// Drops a registered entry without running any hook.
    ///
    /// Used by the gateway to undo a registration whose manifest could not be
    /// stored. Returns whether the id was registered.
    pub(crate) fn unregister(&mut self, module_id: &str) -> bool {
        let Some(position) = self.index.remove(module_id.trim()) else {
            return false;
        };
        self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.index.contains_key(module_id.trim())
    }

    pub fn entry(&self, module_id: &str) -> Option<&RegisteredModule> {
        self.index
            .get(module_id.trim())
            .map(|position| &self.entries[*position])
    }

    pub fn get(&self, module_id: &str) -> Option<&dyn ModuleDescriptor> {
        self.entry(module_id).map(RegisteredModule::descriptor)
    }

    pub fn manifest(&self, module_id: &str) -> Option<&ModuleManifest> {
        self.entry(module_id).map(RegisteredModule::manifest)
    }

    /// Registered modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.entries.iter()
    }

    pub fn list(&self) -> Vec<&dyn ModuleDescriptor> {
        self.iter().map(RegisteredModule::descriptor).collect()
    }

    pub fn list_manifests(&self) -> Vec<ModuleManifest> {
        self.iter().map(|entry| entry.manifest.clone()).collect()
    }

    /// Unknown ids report `false`.
    pub fn is_enabled(&self, module_id: &str) -> bool {
        self.entry(module_id).is_some_and(RegisteredModule::is_enabled)
    }

    /// Runs `on_enable`/`on_disable`, then flips the flag.
    ///
    /// Requesting the current state is a no-op and runs no hook.
    pub fn set_enabled(&mut self, module_id: &str, enabled: bool) -> ModuleResult<()> {
        let position = *self
            .index
            .get(module_id.trim())
            .ok_or_else(|| ModuleError::NotFound(module_id.trim().to_string()))?;
        let entry = &mut self.entries[position];
        if entry.manifest.is_enabled == enabled {
            return Ok(());
        }

        let id = entry.manifest.id.clone();
        let descriptor = entry.descriptor.as_ref();
        let callback = if enabled { "on_enable" } else { "on_disable" };
        guard(&id, callback, || {
            if enabled {
                descriptor.on_enable()
            } else {
                descriptor.on_disable()
            }
        })
        .map_err(|err| ModuleError::hook(&id, callback, err))?;

        entry.manifest.is_enabled = enabled;
        entry.manifest.update_date = now_epoch_ms();
        Ok(())
    }

    /// First declared requirement that is not registered and enabled.
    pub fn unmet_requirement(&self, module_id: &str) -> Option<String> {
        let entry = self.entry(module_id)?;
        entry
            .manifest
            .requires
            .iter()
            .find(|required| !self.is_enabled(required))
            .cloned()
    }

    /// First enabled module (registration order) that requires `module_id`.
    pub fn enabled_dependent(&self, module_id: &str) -> Option<String> {
        let module_id = module_id.trim();
        self.iter()
            .filter(|entry| entry.is_enabled() && entry.id() != module_id)
            .find(|entry| {
                entry
                    .manifest
                    .requires
                    .iter()
                    .any(|required| required == module_id)
            })
            .map(|entry| entry.id().to_string())
    }

    /// Records manifests loaded from the store.
    ///
    /// Modules stored as enabled become pending resumes; they are re-enabled by
    /// the gateway once they register again.
    pub fn seed_persisted(&mut self, manifests: Vec<ModuleManifest>) {
        for manifest in manifests {
            if manifest.is_enabled && !self.is_enabled(&manifest.id) {
                self.resume_pending.insert(manifest.id.clone());
            }
            self.persisted.insert(manifest.id.clone(), manifest);
        }
    }

    pub fn persisted_manifest(&self, module_id: &str) -> Option<&ModuleManifest> {
        self.persisted.get(module_id.trim())
    }

    /// Registered modules still waiting to be resumed, in registration order.
    pub fn pending_resumes(&self) -> Vec<String> {
        self.iter()
            .filter(|entry| self.resume_pending.contains(entry.id()))
            .map(|entry| entry.id().to_string())
            .collect()
    }

    /// Consumes the pending-resume marker. Returns whether one was present.
    pub fn take_pending_resume(&mut self, module_id: &str) -> bool {
        self.resume_pending.remove(module_id.trim())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Set once by the gateway after the first successful load.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}
