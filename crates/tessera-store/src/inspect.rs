//! Read-only views over stored data
//!
//! These work without a model schema: key columns are stored as cells, so
//! every row can be reconstructed from the generic tables alone.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;

use crate::errors::{from_rusqlite, Result};
use crate::repo::sqlite_adapter::load_model_rows;
use tessera_core::Row;

/// A stored model and how many rows it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub model: String,
    pub rows: usize,
}

/// Every model with at least one row, ordered by name
pub fn list_models(conn: &Connection) -> Result<Vec<ModelSummary>> {
    let mut stmt = conn
        .prepare("SELECT model, COUNT(*) FROM rows GROUP BY model ORDER BY model")
        .map_err(from_rusqlite)?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(ModelSummary {
                model: row.get(0)?,
                rows: row.get::<_, i64>(1)? as usize,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(summaries)
}

/// Every row of `model` in key order; empty for an unknown model
pub fn dump_rows(conn: &Connection, model: &str) -> Result<Vec<Row>> {
    Ok(load_model_rows(conn, model)?.into_values().collect())
}
