//! Versioned layout of the module store tables.
//!
//! # Responsibility
//! - Hold the ordered SQL steps that build the manifest, configuration and
//!   migration-ledger tables.
//! - Bring an opened store up to the layout this binary expects.
//!
//! # Invariants
//! - Step numbers start at 1 and grow by one; a new table layout is a new step.
//! - `PRAGMA user_version` holds the last step executed against the file.
//! - A store written by a newer binary is refused, never downgraded.
//! - Pending steps commit together or not at all.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_module_manifests.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_module_configurations.sql"),
    },
    Migration {
        version: 3,
        sql: include_str!("0003_module_migrations.sql"),
    },
];

/// Highest table layout step this binary can build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Runs the layout steps the store has not seen yet.
///
/// A store already at [`latest_version`] is left untouched.
pub fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
    {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

/// Layout step currently recorded in the store file.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
