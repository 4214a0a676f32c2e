//! Module descriptor contract.
//!
//! A descriptor is the only thing a module author implements. Identity
//! (`id`, `name`, `version`) is required; every other capability has a
//! default so a module opts in only to what it provides.
//!
//! All callbacks return [`HookResult`]. The registry, gateway and aggregator
//! invoke them through a per-module boundary that also contains panics, so a
//! defective module surfaces as a [`HookError`] instead of unwinding into the
//! host.

use crate::model::extension::{DashboardItem, NavigationItem};
use crate::module::schema::ConfigSchema;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub type HookResult<T> = Result<T, HookError>;

/// Failure reported by (or captured from) a module callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for HookError {}

impl From<rusqlite::Error> for HookError {
    fn from(value: rusqlite::Error) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for HookError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for HookError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

type MigrationOperation = Box<dyn Fn(&Connection) -> HookResult<()>>;

/// One versioned data/schema operation owned by a module.
///
/// The operation runs inside a store transaction together with its ledger
/// row; it must not commit or roll back on its own.
pub struct ModuleMigration {
    pub version: String,
    pub description: String,
    operation: MigrationOperation,
}

impl ModuleMigration {
    pub fn new(
        version: impl Into<String>,
        description: impl Into<String>,
        operation: impl Fn(&Connection) -> HookResult<()> + 'static,
    ) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            operation: Box::new(operation),
        }
    }

    /// Migration that executes a static SQL batch.
    pub fn sql(
        version: impl Into<String>,
        description: impl Into<String>,
        sql: &'static str,
    ) -> Self {
        Self::new(version, description, move |conn| {
            conn.execute_batch(sql)?;
            Ok(())
        })
    }

    /// Runs the operation against the store connection.
    pub fn run(&self, conn: &Connection) -> HookResult<()> {
        (self.operation)(conn)
    }
}

impl Debug for ModuleMigration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleMigration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Contract implemented by every module.
pub trait ModuleDescriptor {
    /// Stable unique id, e.g. `inventory`.
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }

    /// Ids of modules this one depends on, in declared order.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Capability tags the module asks for, in declared order.
    fn permissions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once, before the registry accepts the descriptor.
    fn on_register(&self) -> HookResult<()> {
        Ok(())
    }

    /// Called before the enabled flag flips to `true`.
    fn on_enable(&self) -> HookResult<()> {
        Ok(())
    }

    /// Called before the enabled flag flips to `false`.
    fn on_disable(&self) -> HookResult<()> {
        Ok(())
    }

    /// Called at registration when the stored manifest carries another version.
    fn on_update(&self, _previous_version: &str) -> HookResult<()> {
        Ok(())
    }

    fn dashboard_items(&self) -> HookResult<Vec<DashboardItem>> {
        Ok(Vec::new())
    }

    fn navigation_items(&self) -> HookResult<Vec<NavigationItem>> {
        Ok(Vec::new())
    }

    /// Migrations in the order they must be applied.
    fn migrations(&self) -> Vec<ModuleMigration> {
        Vec::new()
    }

    /// Schema used to validate saved settings. `None` accepts any document.
    fn config_schema(&self) -> Option<ConfigSchema> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{HookError, ModuleDescriptor, ModuleMigration};
    use rusqlite::Connection;

    struct Bare;

    impl ModuleDescriptor for Bare {
        fn id(&self) -> &str {
            "bare"
        }

        fn name(&self) -> &str {
            "Bare"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }
    }

    #[test]
    fn optional_capabilities_default_to_empty() {
        let module = Bare;
        assert!(module.requires().is_empty());
        assert!(module.permissions().is_empty());
        assert!(module.migrations().is_empty());
        assert!(module.config_schema().is_none());
        assert!(module.on_enable().is_ok());
        assert!(module.on_update("0.9.0").is_ok());
        assert!(module.dashboard_items().expect("dashboard").is_empty());
    }

    #[test]
    fn sql_migration_executes_batch() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let migration = ModuleMigration::sql("1.0.0", "create t", "CREATE TABLE t (x INTEGER);");
        migration.run(&conn).expect("migration should run");
        conn.execute("INSERT INTO t (x) VALUES (1);", [])
            .expect("table should exist");
    }

    #[test]
    fn sql_errors_convert_into_hook_errors() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let migration = ModuleMigration::sql("1.0.0", "broken", "CREATE TABLE (;");
        let err = migration.run(&conn).expect_err("invalid SQL must fail");
        assert!(!err.message().is_empty());
        assert_eq!(HookError::from("x").to_string(), "x");
    }
}
