//! SQLite-backed persistence adapter
//!
//! Every model shares two tables: `rows` (one entry per stored key) and
//! `cells` (one entry per written column, key columns included). A write
//! upserts only the cells it was given, so columns never written stay
//! absent and are left untouched by a session merge.

#![allow(clippy::result_large_err)]

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;

use super::codec::{decode_key, decode_value, encode_key, encode_value};
use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::inspect::{self, ModelSummary};
use crate::migrations::apply_migrations;
use tessera_core::adapter::{counter_overflow, key_row, AdapterResult, PersistenceAdapter, Row};
use tessera_core::{Filter, KeyTuple, ModelSchema, Value};

/// Persistence adapter over a single SQLite connection
///
/// The connection is serialised behind a mutex; each write runs in its
/// own transaction.
pub struct SqliteAdapter {
    conn: Mutex<Connection>,
}

impl SqliteAdapter {
    /// Open (creating if needed) and migrate the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Configure and migrate an already open connection
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Models with at least one stored row, with their row counts
    pub fn list_models(&self) -> Result<Vec<ModelSummary>> {
        inspect::list_models(&self.conn.lock())
    }

    /// Every stored row of `model`, in key order
    pub fn dump_rows(&self, model: &str) -> Result<Vec<Row>> {
        inspect::dump_rows(&self.conn.lock(), model)
    }

    fn touch_row(tx: &Transaction, model: &str, row_key: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        tx.execute(
            "INSERT INTO rows (model, row_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(model, row_key) DO UPDATE SET
                updated_at = excluded.updated_at",
            rusqlite::params![model, row_key, now],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    fn upsert_cell(tx: &Transaction, model: &str, row_key: &str, column: &str, value: &Value) -> Result<()> {
        tx.execute(
            "INSERT INTO cells (model, row_key, column_name, value_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(model, row_key, column_name) DO UPDATE SET
                value_json = excluded.value_json",
            rusqlite::params![model, row_key, column, encode_value(value)?],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Create the row entry and its key cells when missing
    fn ensure_row(tx: &Transaction, schema: &ModelSchema, key: &KeyTuple, row_key: &str) -> Result<()> {
        Self::touch_row(tx, schema.name(), row_key)?;
        for (column, value) in key_row(schema, key) {
            Self::upsert_cell(tx, schema.name(), row_key, &column, &value)?;
        }
        Ok(())
    }
}

/// Cells of one row, decoded
fn load_cells(conn: &Connection, model: &str, row_key: &str) -> Result<Row> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name, value_json FROM cells
             WHERE model = ?1 AND row_key = ?2",
        )
        .map_err(from_rusqlite)?;
    let cells = stmt
        .query_map(rusqlite::params![model, row_key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    cells
        .into_iter()
        .map(|(column, json)| Ok((column, decode_value(&json)?)))
        .collect()
}

/// Every row of a model keyed by decoded key tuple
pub(crate) fn load_model_rows(conn: &Connection, model: &str) -> Result<BTreeMap<KeyTuple, Row>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.row_key, c.column_name, c.value_json
             FROM rows r
             LEFT JOIN cells c ON c.model = r.model AND c.row_key = r.row_key
             WHERE r.model = ?1",
        )
        .map_err(from_rusqlite)?;
    let entries = stmt
        .query_map([model], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    let mut by_encoded: BTreeMap<String, Row> = BTreeMap::new();
    for (row_key, column, json) in entries {
        let row = by_encoded.entry(row_key).or_default();
        if let (Some(column), Some(json)) = (column, json) {
            row.insert(column, decode_value(&json)?);
        }
    }

    by_encoded
        .into_iter()
        .map(|(row_key, row)| Ok((decode_key(&row_key)?, row)))
        .collect()
}

impl PersistenceAdapter for SqliteAdapter {
    fn fetch_one(&self, schema: &ModelSchema, key: &KeyTuple) -> AdapterResult<Option<Row>> {
        let row_key = encode_key(key)?;
        let conn = self.conn.lock();

        let exists = conn
            .query_row(
                "SELECT 1 FROM rows WHERE model = ?1 AND row_key = ?2",
                rusqlite::params![schema.name(), row_key],
                |_| Ok(()),
            )
            .optional()
            .map_err(from_rusqlite)?
            .is_some();
        if !exists {
            return Ok(None);
        }

        load_cells(&conn, schema.name(), &row_key).map(Some)
    }

    fn fetch_many(&self, schema: &ModelSchema, filter: &Filter) -> AdapterResult<Vec<Row>> {
        let rows = load_model_rows(&self.conn.lock(), schema.name())?;
        let matching: Vec<Row> = rows
            .into_values()
            .filter(|row| filter.matches(row))
            .collect();
        tracing::trace!(model = %schema.name(), filter = %filter, rows = matching.len(), "fetch_many");
        Ok(matching)
    }

    fn write_row(&self, schema: &ModelSchema, key: &KeyTuple, values: &Row) -> AdapterResult<()> {
        let row_key = encode_key(key)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(from_rusqlite)?;

        Self::ensure_row(&tx, schema, key, &row_key)?;
        for (column, value) in values {
            Self::upsert_cell(&tx, schema.name(), &row_key, column, value)?;
        }

        tx.commit().map_err(from_rusqlite)?;
        tracing::trace!(model = %schema.name(), key = %key, columns = values.len(), "row written");
        Ok(())
    }

    fn increment_counter(
        &self,
        schema: &ModelSchema,
        key: &KeyTuple,
        column: &str,
        delta: i64,
    ) -> AdapterResult<()> {
        let row_key = encode_key(key)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(from_rusqlite)?;

        Self::ensure_row(&tx, schema, key, &row_key)?;
        let current: Option<String> = tx
            .query_row(
                "SELECT value_json FROM cells
                 WHERE model = ?1 AND row_key = ?2 AND column_name = ?3",
                rusqlite::params![schema.name(), row_key, column],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        let current = match current {
            Some(json) => decode_value(&json)?.as_int().unwrap_or(0),
            None => 0,
        };
        let total = current
            .checked_add(delta)
            .ok_or_else(|| counter_overflow(schema, key, column, delta))?;
        Self::upsert_cell(&tx, schema.name(), &row_key, column, &Value::Int(total))?;

        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter").finish_non_exhaustive()
    }
}
