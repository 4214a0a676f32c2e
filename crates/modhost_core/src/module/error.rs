//! Module subsystem error taxonomy.
//!
//! # Invariants
//! - Registry-level structural failures (`Validation`, `Duplicate`) are
//!   returned as values and never leave partial registry state.
//! - `Migration` always names the failing version.

use crate::module::descriptor::HookError;
use crate::module::manifest::ManifestValidationError;
use crate::module::schema::SchemaViolation;
use crate::repo::module_repo::{MigrationStepError, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModuleResult<T> = Result<T, ModuleError>;

#[derive(Debug)]
pub enum ModuleError {
    /// Malformed descriptor at registration.
    Validation(ManifestValidationError),
    /// Module id already registered.
    Duplicate(String),
    /// Module id is not registered.
    NotFound(String),
    /// Gateway operation attempted before `initialize()` succeeded.
    NotInitialized,
    /// Store bootstrap or manifest reconciliation failed.
    Initialization(RepoError),
    /// Manifest or configuration read/write failed.
    Persistence(RepoError),
    /// A migration step failed; later migrations in the batch were not tried.
    Migration {
        module_id: String,
        version: String,
        cause: MigrationStepError,
    },
    /// A lifecycle hook or provider returned an error or panicked.
    Hook {
        module_id: String,
        callback: &'static str,
        source: HookError,
    },
    /// A required module is not registered or not enabled.
    UnsatisfiedRequirement { module_id: String, required: String },
    /// An enabled module still requires the one being disabled.
    RequiredByEnabled { module_id: String, dependent: String },
    /// Settings do not satisfy the module's declared schema.
    InvalidConfiguration {
        module_id: String,
        violation: SchemaViolation,
    },
}

impl ModuleError {
    pub(crate) fn hook(module_id: &str, callback: &'static str, source: HookError) -> Self {
        Self::Hook {
            module_id: module_id.to_string(),
            callback,
            source,
        }
    }

    /// Stable code used in log events and by hosts mapping errors to messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Duplicate(_) => "duplicate",
            Self::NotFound(_) => "not_found",
            Self::NotInitialized => "not_initialized",
            Self::Initialization(_) => "initialization",
            Self::Persistence(_) => "persistence",
            Self::Migration { .. } => "migration",
            Self::Hook { .. } => "hook",
            Self::UnsatisfiedRequirement { .. } => "unsatisfied_requirement",
            Self::RequiredByEnabled { .. } => "required_by_enabled",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
        }
    }
}

impl Display for ModuleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid module descriptor: {err}"),
            Self::Duplicate(id) => write!(f, "module already registered: {id}"),
            Self::NotFound(id) => write!(f, "module not registered: {id}"),
            Self::NotInitialized => write!(f, "module store has not been initialized"),
            Self::Initialization(err) => write!(f, "module store initialization failed: {err}"),
            Self::Persistence(err) => write!(f, "module store write failed: {err}"),
            Self::Migration {
                module_id,
                version,
                cause,
            } => write!(f, "migration {version} of module {module_id} failed: {cause}"),
            Self::Hook {
                module_id,
                callback,
                source,
            } => write!(f, "module {module_id} {callback} failed: {source}"),
            Self::UnsatisfiedRequirement {
                module_id,
                required,
            } => write!(
                f,
                "module {module_id} requires {required}, which is not registered and enabled"
            ),
            Self::RequiredByEnabled {
                module_id,
                dependent,
            } => write!(
                f,
                "module {module_id} is required by enabled module {dependent}"
            ),
            Self::InvalidConfiguration {
                module_id,
                violation,
            } => write!(f, "invalid configuration for module {module_id}: {violation}"),
        }
    }
}

impl Error for ModuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Initialization(err) | Self::Persistence(err) => Some(err),
            Self::Migration { cause, .. } => Some(cause),
            Self::Hook { source, .. } => Some(source),
            Self::InvalidConfiguration { violation, .. } => Some(violation),
            Self::Duplicate(_)
            | Self::NotFound(_)
            | Self::NotInitialized
            | Self::UnsatisfiedRequirement { .. }
            | Self::RequiredByEnabled { .. } => None,
        }
    }
}

impl From<ManifestValidationError> for ModuleError {
    fn from(value: ManifestValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleError;
    use crate::module::descriptor::HookError;
    use crate::repo::module_repo::MigrationStepError;

    #[test]
    fn migration_error_names_version() {
        let err = ModuleError::Migration {
            module_id: "m2".to_string(),
            version: "v2".to_string(),
            cause: MigrationStepError::Operation(HookError::new("column exists")),
        };
        let message = err.to_string();
        assert!(message.contains("v2"));
        assert!(message.contains("m2"));
        assert!(message.contains("column exists"));
        assert_eq!(err.code(), "migration");
    }

    #[test]
    fn hook_error_exposes_source() {
        let err = ModuleError::hook("inv", "on_enable", HookError::new("no printer"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "module inv on_enable failed: no printer");
    }
}
