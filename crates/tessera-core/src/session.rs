//! Unit-of-work session: identity map, deferred writes and the process default

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::adapter::{row_key, PersistenceAdapter, Row};
use crate::core_types::SessionId;
use crate::errors::{Result, SessionError};
use crate::facade::ModelRef;
use crate::identity::IdentityMap;
use crate::model::{KeyTuple, ModelSchema};
use crate::state::{Instance, Record};
use crate::{log_op_end, log_op_error, log_op_start};

/// Code-level session settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Free-form name attached to every boundary log of the session
    #[serde(default)]
    pub label: Option<String>,
}

/// Outcome of a successful save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub rows_written: usize,
    pub counters_incremented: usize,
}

#[derive(Debug)]
struct SessionState {
    id: SessionId,
    identity: IdentityMap,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            id: SessionId::new(),
            identity: IdentityMap::new(),
        }
    }
}

/// Unit of work over one persistence adapter
///
/// Holds at most one instance per (model, key). Local assignments stay in
/// memory until [`Session::save`]; loads never overwrite them. The session
/// lock is never held while the adapter runs.
pub struct Session {
    adapter: Arc<dyn PersistenceAdapter>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self::with_config(adapter, SessionConfig::default())
    }

    pub fn with_config(adapter: Arc<dyn PersistenceAdapter>, config: SessionConfig) -> Self {
        Self {
            adapter,
            config,
            state: Mutex::new(SessionState::fresh()),
        }
    }

    /// Id of the current generation; changes on every `clear`
    pub fn id(&self) -> SessionId {
        self.state.lock().id.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn adapter(&self) -> &Arc<dyn PersistenceAdapter> {
        &self.adapter
    }

    pub fn model(&self, schema: &Arc<ModelSchema>) -> ModelRef<'_> {
        ModelRef::new(self, schema.clone())
    }

    /// Number of instances resident in the session
    pub fn len(&self) -> usize {
        self.state.lock().identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().identity.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.state.lock().identity.dirty_records().len()
    }

    pub fn contains(&self, model: &str, key: &KeyTuple) -> bool {
        self.state.lock().identity.contains(model, key)
    }

    pub(crate) fn resolve<F>(&self, schema: &Arc<ModelSchema>, key: KeyTuple, factory: F) -> (Record, bool)
    where
        F: FnOnce(Arc<ModelSchema>, KeyTuple) -> Instance,
    {
        self.state.lock().identity.lookup_or_create(schema, key, factory)
    }

    /// Resolve a fetched row and merge it into its instance
    pub(crate) fn merge_row(&self, schema: &Arc<ModelSchema>, row: Row) -> Result<Record> {
        let key = row_key(schema, &row)?;
        let (record, _) = self.resolve(schema, key, Instance::blind);
        record.write_instance().merge_row(&row);
        Ok(record)
    }

    /// Run a boundary operation with start/end/error logging
    pub(crate) fn observe<T, F>(&self, op: &'static str, model: Option<&str>, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let session_id = self.id();
        let label = self.config.label.as_deref();
        log_op_start!(op, session_id = %session_id, model = model, label = label);
        let start = Instant::now();

        let result = f();

        let elapsed = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = elapsed, session_id = %session_id, model = model);
            }
            Err(e) => {
                log_op_error!(op, e.clone(), duration_ms = elapsed, session_id = %session_id, model = model);
            }
        }
        result
    }

    /// Re-read one instance's row and merge it
    ///
    /// # Errors
    ///
    /// `NotFound` when storage has no row for the instance's key, `Adapter`
    /// for storage failures.
    pub fn refresh(&self, record: &Record) -> Result<()> {
        let (schema, key) = {
            let instance = record.read_instance();
            (instance.schema().clone(), instance.key().clone())
        };
        self.observe("refresh", Some(schema.name()), || {
            match self.adapter.fetch_one(&schema, &key)? {
                Some(row) => {
                    record.write_instance().merge_row(&row);
                    Ok(())
                }
                None => Err(SessionError::NotFound {
                    model: schema.name().to_string(),
                    key: key.to_string(),
                }),
            }
        })
    }

    /// Write every pending change
    ///
    /// Instances are written one at a time in (model, key) order. On the
    /// first adapter failure the error is returned: instances already
    /// written stay committed, the failing one and the rest stay dirty, and
    /// a later `save` picks them up.
    ///
    /// # Errors
    ///
    /// `Adapter` with the first storage failure.
    pub fn save(&self) -> Result<SaveReport> {
        self.observe("save", None, || self.save_impl())
    }

    fn save_impl(&self) -> Result<SaveReport> {
        let dirty = self.state.lock().identity.dirty_records();
        let mut report = SaveReport::default();

        for record in dirty {
            let (schema, key, pending) = {
                let instance = record.read_instance();
                (
                    instance.schema().clone(),
                    instance.key().clone(),
                    instance.pending_write(),
                )
            };

            if pending.needs_row_write() {
                self.adapter.write_row(&schema, &key, &pending.row)?;
                record.write_instance().commit(&pending.committed);
                report.rows_written += 1;
            }

            for (index, column, delta) in &pending.counters {
                self.adapter
                    .increment_counter(&schema, &key, column, *delta)?;
                record.write_instance().commit_counter(*index, *delta);
                report.counters_incremented += 1;
            }
        }

        tracing::debug!(
            rows_written = report.rows_written,
            counters_incremented = report.counters_incremented,
            "save flushed"
        );
        Ok(report)
    }

    /// Forget every instance, discarding unsaved changes
    ///
    /// Storage is untouched. Handles obtained earlier keep working but are
    /// no longer reachable through the session.
    pub fn clear(&self) {
        let previous = self.id();
        let label = self.config.label.as_deref();
        log_op_start!("clear", session_id = %previous, label = label);
        let start = Instant::now();

        let discarded = {
            let mut state = self.state.lock();
            let discarded = state.identity.len();
            *state = SessionState::fresh();
            discarded
        };

        let elapsed = start.elapsed().as_millis() as u64;
        log_op_end!(
            "clear",
            duration_ms = elapsed,
            session_id = %previous,
            discarded = discarded,
            next_session_id = %self.id()
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("id", &state.id)
            .field("label", &self.config.label)
            .field("instances", &state.identity.len())
            .finish()
    }
}

// ========== Process default ==========

static DEFAULT_SESSION: RwLock<Option<Arc<Session>>> = parking_lot::const_rwlock(None);

/// Create the process-wide session over `adapter`, replacing any previous one
pub fn install_default(adapter: Arc<dyn PersistenceAdapter>) -> Arc<Session> {
    let session = Arc::new(Session::new(adapter));
    *DEFAULT_SESSION.write() = Some(session.clone());
    tracing::debug!(session_id = %session.id(), "default session installed");
    session
}

/// Remove the process-wide session, returning it
pub fn uninstall_default() -> Option<Arc<Session>> {
    DEFAULT_SESSION.write().take()
}

/// # Errors
///
/// `NoDefaultSession` when none is installed.
pub fn default_session() -> Result<Arc<Session>> {
    DEFAULT_SESSION
        .read()
        .clone()
        .ok_or(SessionError::NoDefaultSession)
}

/// Save the process-wide session
///
/// # Errors
///
/// `NoDefaultSession`, or whatever [`Session::save`] reports.
pub fn save() -> Result<SaveReport> {
    default_session()?.save()
}

/// Clear the process-wide session
///
/// # Errors
///
/// `NoDefaultSession`.
pub fn clear() -> Result<()> {
    default_session()?.clear();
    Ok(())
}
