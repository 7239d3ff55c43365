#![forbid(unsafe_code)]

mod sql;

use super::super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};

pub(in crate::store) const SCHEMA_VERSION: i64 = 1;

pub(in crate::store) fn migrate_sqlite_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(&sql::full_schema_sql())?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
                params!["schema_version", SCHEMA_VERSION.to_string()],
            )?;
        }
        Some(raw) => {
            // Unparseable values count as too new.
            let found = raw.trim().parse::<i64>().unwrap_or(i64::MAX);
            if found > SCHEMA_VERSION {
                return Err(StoreError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
        }
    }

    Ok(())
}
