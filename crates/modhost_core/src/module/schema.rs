//! Module configuration schema and settings validation.
//!
//! # Responsibility
//! - Describe the settings a module accepts as typed fields.
//! - Validate settings documents before they are persisted.
//! - Fill declared defaults when a module reads its configuration.
//!
//! # Invariants
//! - Validation is strict: keys not declared in the schema are rejected.
//! - `null` counts as absent for optional fields and as missing for required ones.

use crate::model::module::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value type accepted by one settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Object,
}

impl SettingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Object => "object",
        }
    }

    /// Returns whether `value` is acceptable for this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One declared settings key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub kind: SettingKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

impl ConfigField {
    pub fn required(key: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    pub fn optional(key: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            required: false,
            ..Self::required(key, kind)
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Settings schema declared by a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Checks a settings document against this schema.
    ///
    /// Reports the first violation in declared field order, then unknown keys
    /// in document order.
    pub fn validate(&self, settings: &Settings) -> Result<(), SchemaViolation> {
        for field in &self.fields {
            match settings.get(field.key.as_str()) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(SchemaViolation::MissingRequired(field.key.clone()));
                    }
                }
                Some(value) => {
                    if !field.kind.accepts(value) {
                        return Err(SchemaViolation::TypeMismatch {
                            key: field.key.clone(),
                            expected: field.kind,
                            found: value_kind(value),
                        });
                    }
                }
            }
        }

        if let Some(unknown) = settings.keys().find(|key| self.get(key).is_none()) {
            return Err(SchemaViolation::UnknownKey(unknown.clone()));
        }
        Ok(())
    }

    /// Returns `settings` with declared defaults filled in for absent keys.
    pub fn with_defaults(&self, settings: &Settings) -> Settings {
        let mut merged = settings.clone();
        for field in &self.fields {
            let Some(default) = &field.default else {
                continue;
            };
            let absent = matches!(merged.get(field.key.as_str()), None | Some(Value::Null));
            if absent {
                merged.insert(field.key.clone(), default.clone());
            }
        }
        merged
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Settings validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    UnknownKey(String),
    MissingRequired(String),
    TypeMismatch {
        key: String,
        expected: SettingKind,
        found: &'static str,
    },
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "setting `{key}` is not declared by the schema"),
            Self::MissingRequired(key) => write!(f, "required setting `{key}` is missing"),
            Self::TypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "setting `{key}` expects {}, got {found}",
                expected.as_str()
            ),
        }
    }
}

impl Error for SchemaViolation {}
