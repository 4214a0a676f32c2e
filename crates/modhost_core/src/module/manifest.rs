//! Descriptor validation and manifest projection.

use crate::model::module::ModuleManifest;
use crate::module::descriptor::ModuleDescriptor;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validates the declaration-level shape of a descriptor.
///
/// Identity fields must be non-blank. `requires` entries must be non-blank
/// and must not name the module itself; `permissions` entries must be non-blank.
pub fn validate_descriptor(
    descriptor: &dyn ModuleDescriptor,
) -> Result<(), ManifestValidationError> {
    let id = descriptor.id().trim();
    if id.is_empty() {
        return Err(ManifestValidationError::EmptyId);
    }
    if descriptor.name().trim().is_empty() {
        return Err(ManifestValidationError::EmptyName);
    }
    if descriptor.version().trim().is_empty() {
        return Err(ManifestValidationError::EmptyVersion);
    }

    for required in descriptor.requires() {
        let required = required.trim();
        if required.is_empty() {
            return Err(ManifestValidationError::EmptyRequirement);
        }
        if required == id {
            return Err(ManifestValidationError::SelfRequirement(id.to_string()));
        }
    }

    if descriptor
        .permissions()
        .iter()
        .any(|permission| permission.trim().is_empty())
    {
        return Err(ManifestValidationError::EmptyPermission);
    }
    Ok(())
}

/// Builds the initial (disabled) manifest for a descriptor.
pub fn project_manifest(descriptor: &dyn ModuleDescriptor, now: i64) -> ModuleManifest {
    ModuleManifest {
        id: descriptor.id().trim().to_string(),
        name: descriptor.name().trim().to_string(),
        version: descriptor.version().trim().to_string(),
        description: descriptor.description().to_string(),
        author: descriptor.author().to_string(),
        requires: descriptor
            .requires()
            .iter()
            .map(|value| value.trim().to_string())
            .collect(),
        permissions: descriptor
            .permissions()
            .iter()
            .map(|value| value.trim().to_string())
            .collect(),
        is_enabled: false,
        install_date: now,
        update_date: now,
    }
}

/// Descriptor shape errors reported at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    EmptyId,
    EmptyName,
    EmptyVersion,
    EmptyRequirement,
    SelfRequirement(String),
    EmptyPermission,
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "module id must not be empty"),
            Self::EmptyName => write!(f, "module name must not be empty"),
            Self::EmptyVersion => write!(f, "module version must not be empty"),
            Self::EmptyRequirement => write!(f, "module requires contains an empty id"),
            Self::SelfRequirement(id) => write!(f, "module `{id}` must not require itself"),
            Self::EmptyPermission => write!(f, "module permissions contain an empty tag"),
        }
    }
}

impl Error for ManifestValidationError {}

#[cfg(test)]
mod tests {
    use super::{project_manifest, validate_descriptor, ManifestValidationError};
    use crate::module::descriptor::ModuleDescriptor;

    struct Declared {
        id: &'static str,
        name: &'static str,
        version: &'static str,
        requires: Vec<&'static str>,
        permissions: Vec<&'static str>,
    }

    impl ModuleDescriptor for Declared {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            self.version
        }

        fn author(&self) -> &str {
            "Board"
        }

        fn requires(&self) -> Vec<String> {
            self.requires.iter().map(|value| value.to_string()).collect()
        }

        fn permissions(&self) -> Vec<String> {
            self.permissions.iter().map(|value| value.to_string()).collect()
        }
    }

    fn valid() -> Declared {
        Declared {
            id: "inv",
            name: "Inventory",
            version: "1.0.0",
            requires: vec!["members"],
            permissions: vec!["inventory.write", "inventory.read"],
        }
    }

    #[test]
    fn accepts_valid_descriptor() {
        assert!(validate_descriptor(&valid()).is_ok());
    }

    #[test]
    fn rejects_blank_identity_fields() {
        let mut module = valid();
        module.id = "  ";
        assert_eq!(validate_descriptor(&module), Err(ManifestValidationError::EmptyId));

        let mut module = valid();
        module.name = "";
        assert_eq!(validate_descriptor(&module), Err(ManifestValidationError::EmptyName));

        let mut module = valid();
        module.version = "";
        assert_eq!(
            validate_descriptor(&module),
            Err(ManifestValidationError::EmptyVersion)
        );
    }

    #[test]
    fn rejects_self_requirement_and_blank_entries() {
        let mut module = valid();
        module.requires = vec!["inv"];
        assert_eq!(
            validate_descriptor(&module),
            Err(ManifestValidationError::SelfRequirement("inv".to_string()))
        );

        let mut module = valid();
        module.requires = vec![" "];
        assert_eq!(
            validate_descriptor(&module),
            Err(ManifestValidationError::EmptyRequirement)
        );

        let mut module = valid();
        module.permissions = vec![""];
        assert_eq!(
            validate_descriptor(&module),
            Err(ManifestValidationError::EmptyPermission)
        );
    }

    #[test]
    fn projects_disabled_manifest_preserving_list_order() {
        let manifest = project_manifest(&valid(), 42);
        assert_eq!(manifest.id, "inv");
        assert_eq!(manifest.author, "Board");
        assert_eq!(manifest.permissions, vec!["inventory.write", "inventory.read"]);
        assert!(!manifest.is_enabled);
        assert_eq!(manifest.install_date, 42);
        assert_eq!(manifest.update_date, 42);
    }
}
