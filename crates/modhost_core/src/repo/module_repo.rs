//! Module store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist manifests and configurations keyed by module id.
//! - Own the append-only migration ledger and run module migrations.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Ledger rows are inserted, never updated or deleted.
//! - A migration operation and its ledger row commit together or not at all.
//! - Read paths reject malformed persisted rows instead of masking them.

use crate::db::migrations::apply_migrations;
use crate::db::DbError;
use crate::model::module::{
    now_epoch_ms, MigrationRecord, ModuleConfiguration, ModuleManifest, Settings,
};
use crate::module::boundary::guard;
use crate::module::descriptor::{HookError, ModuleMigration};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MANIFEST_SELECT_SQL: &str = "SELECT
    id,
    name,
    version,
    description,
    author,
    requires,
    permissions,
    is_enabled,
    install_date,
    update_date
FROM module_manifests";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error for module persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted module data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Why one migration step did not reach the ledger.
#[derive(Debug)]
pub enum MigrationStepError {
    /// The module's operation failed or panicked; its effects were rolled back.
    Operation(HookError),
    /// The store failed around the operation; nothing was committed.
    Store(RepoError),
}

impl Display for MigrationStepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(err) => write!(f, "operation failed: {err}"),
            Self::Store(err) => write!(f, "ledger write failed: {err}"),
        }
    }
}

impl Error for MigrationStepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RepoError> for MigrationStepError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for MigrationStepError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.into())
    }
}

/// Durable store interface used by the persistence gateway.
pub trait ModuleRepository {
    /// Creates the module collections when missing. Safe to call repeatedly.
    fn ensure_schema(&self) -> RepoResult<()>;
    /// Lists every stored manifest ordered by install date, then id.
    fn load_manifests(&self) -> RepoResult<Vec<ModuleManifest>>;
    fn get_manifest(&self, module_id: &str) -> RepoResult<Option<ModuleManifest>>;
    /// Inserts or replaces the manifest row keyed by `manifest.id`.
    fn upsert_manifest(&self, manifest: &ModuleManifest) -> RepoResult<()>;
    fn get_configuration(&self, module_id: &str) -> RepoResult<Option<ModuleConfiguration>>;
    /// Stores settings and returns the persisted value with its timestamp.
    fn upsert_configuration(
        &self,
        configuration: &ModuleConfiguration,
    ) -> RepoResult<ModuleConfiguration>;
    /// Versions already present in the ledger for one module.
    fn applied_versions(&self, module_id: &str) -> RepoResult<BTreeSet<String>>;
    /// Ledger rows for one module in application order.
    fn list_migrations(&self, module_id: &str) -> RepoResult<Vec<MigrationRecord>>;
    /// Runs one migration and appends its ledger row atomically.
    fn apply_migration(
        &self,
        module_id: &str,
        migration: &ModuleMigration,
    ) -> Result<MigrationRecord, MigrationStepError>;
}

/// SQLite-backed module store.
pub struct SqliteModuleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteModuleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ModuleRepository for SqliteModuleRepository<'_> {
    fn ensure_schema(&self) -> RepoResult<()> {
        apply_migrations(self.conn)?;
        Ok(())
    }

    fn load_manifests(&self) -> RepoResult<Vec<ModuleManifest>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MANIFEST_SELECT_SQL} ORDER BY install_date ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut manifests = Vec::new();
        while let Some(row) = rows.next()? {
            manifests.push(parse_manifest_row(row)?);
        }
        Ok(manifests)
    }

    fn get_manifest(&self, module_id: &str) -> RepoResult<Option<ModuleManifest>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MANIFEST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([module_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_manifest_row(row)?));
        }
        Ok(None)
    }

    fn upsert_manifest(&self, manifest: &ModuleManifest) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO module_manifests (
                id,
                name,
                version,
                description,
                author,
                requires,
                permissions,
                is_enabled,
                install_date,
                update_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                version = excluded.version,
                description = excluded.description,
                author = excluded.author,
                requires = excluded.requires,
                permissions = excluded.permissions,
                is_enabled = excluded.is_enabled,
                install_date = excluded.install_date,
                update_date = excluded.update_date;",
            params![
                manifest.id.as_str(),
                manifest.name.as_str(),
                manifest.version.as_str(),
                manifest.description.as_str(),
                manifest.author.as_str(),
                encode_list(&manifest.requires)?,
                encode_list(&manifest.permissions)?,
                bool_to_int(manifest.is_enabled),
                manifest.install_date,
                manifest.update_date,
            ],
        )?;
        Ok(())
    }

    fn get_configuration(&self, module_id: &str) -> RepoResult<Option<ModuleConfiguration>> {
        let row = self
            .conn
            .query_row(
                "SELECT settings, last_updated
                 FROM module_configurations
                 WHERE module_id = ?1;",
                [module_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((settings_text, last_updated)) = row else {
            return Ok(None);
        };
        let settings: Settings = serde_json::from_str(&settings_text).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid settings document for `{module_id}` in module_configurations.settings: {err}"
            ))
        })?;
        Ok(Some(ModuleConfiguration {
            module_id: module_id.to_string(),
            settings,
            last_updated: Some(last_updated),
        }))
    }

    fn upsert_configuration(
        &self,
        configuration: &ModuleConfiguration,
    ) -> RepoResult<ModuleConfiguration> {
        let settings_text = serde_json::to_string(&configuration.settings)
            .map_err(|err| RepoError::InvalidData(format!("cannot encode settings: {err}")))?;
        let last_updated = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO module_configurations (module_id, settings, last_updated)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (module_id) DO UPDATE SET
                settings = excluded.settings,
                last_updated = excluded.last_updated;",
            params![configuration.module_id.as_str(), settings_text, last_updated],
        )?;

        Ok(ModuleConfiguration {
            module_id: configuration.module_id.clone(),
            settings: configuration.settings.clone(),
            last_updated: Some(last_updated),
        })
    }

    fn applied_versions(&self, module_id: &str) -> RepoResult<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM module_migrations WHERE module_id = ?1;")?;
        let versions = stmt
            .query_map([module_id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(versions)
    }

    fn list_migrations(&self, module_id: &str) -> RepoResult<Vec<MigrationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, module_id, version, description, applied_at
             FROM module_migrations
             WHERE module_id = ?1
             ORDER BY seq ASC;",
        )?;
        let mut rows = stmt.query([module_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_migration_row(row)?);
        }
        Ok(records)
    }

    fn apply_migration(
        &self,
        module_id: &str,
        migration: &ModuleMigration,
    ) -> Result<MigrationRecord, MigrationStepError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        // Dropping `tx` on the error path rolls back partial operation effects.
        guard(module_id, "migration", || migration.run(&tx))
            .map_err(MigrationStepError::Operation)?;

        let record = MigrationRecord {
            id: Uuid::new_v4(),
            module_id: module_id.to_string(),
            version: migration.version.clone(),
            description: migration.description.clone(),
            applied_at: now_epoch_ms(),
        };
        tx.execute(
            "INSERT INTO module_migrations (id, module_id, version, description, applied_at, seq)
             VALUES (
                ?1, ?2, ?3, ?4, ?5,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM module_migrations WHERE module_id = ?2)
             );",
            params![
                record.id.to_string(),
                record.module_id.as_str(),
                record.version.as_str(),
                record.description.as_str(),
                record.applied_at,
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }
}

fn parse_manifest_row(row: &Row<'_>) -> RepoResult<ModuleManifest> {
    let id: String = row.get("id")?;
    let is_enabled = match row.get::<_, i64>("is_enabled")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_enabled value `{other}` for `{id}` in module_manifests.is_enabled"
            )));
        }
    };
    let requires = decode_list(&id, "requires", &row.get::<_, String>("requires")?)?;
    let permissions = decode_list(&id, "permissions", &row.get::<_, String>("permissions")?)?;

    Ok(ModuleManifest {
        name: row.get("name")?,
        version: row.get("version")?,
        description: row.get("description")?,
        author: row.get("author")?,
        requires,
        permissions,
        is_enabled,
        install_date: row.get("install_date")?,
        update_date: row.get("update_date")?,
        id,
    })
}

fn parse_migration_row(row: &Row<'_>) -> RepoResult<MigrationRecord> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in module_migrations.id"))
    })?;
    Ok(MigrationRecord {
        id,
        module_id: row.get("module_id")?,
        version: row.get("version")?,
        description: row.get("description")?,
        applied_at: row.get("applied_at")?,
    })
}

fn encode_list(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode list column: {err}")))
}

fn decode_list(id: &str, column: &str, raw: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(raw).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid list `{raw}` for `{id}` in module_manifests.{column}: {err}"
        ))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
