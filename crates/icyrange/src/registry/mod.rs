//! Module: registry
//! Responsibility: the set of ready indexes, who is reading them, and
//! deletion deferred until the last reader lets go.
//! Does not own: index storage or how drivers persist indexes.


use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::IndexModel,
    obs::sink::{MetricsEvent, RegistryAction, record},
};
use parking_lot::{Condvar, Mutex, RwLock};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    fmt,
    ops::Deref,
    sync::Arc,
    time::Duration,
};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// RegistryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RegistryError {
    #[error("index '{database}.{id}' is already registered")]
    DuplicateIndex { database: String, id: String },

    #[error("index '{database}.{id}' not found")]
    IndexNotFound { database: String, id: String },

    #[error("index '{database}.{id}' is already being deleted")]
    DeletionPending { database: String, id: String },

    #[error("index driver '{0}' is already registered")]
    DuplicateDriver(String),
}

impl RegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::IndexNotFound { .. } => ErrorClass::NotFound,
            Self::DuplicateIndex { .. } | Self::DeletionPending { .. } | Self::DuplicateDriver(_) => {
                ErrorClass::Conflict
            }
        }
    }
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Registry, err.to_string())
    }
}

///
/// IndexDriver
/// Backend that materialises indexes; only its identity matters here.
///

pub trait IndexDriver: Send + Sync {
    fn id(&self) -> &str;
}

///
/// IndexKey
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct IndexKey {
    database: String,
    id: String,
}

impl IndexKey {
    fn new(database: &str, id: &str) -> Self {
        Self {
            database: database.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.id)
    }
}

#[derive(Debug)]
struct IndexEntry {
    index: Arc<IndexModel>,
    generation: u64,
    ready: bool,
}

#[derive(Debug, Default)]
struct IndexTable {
    entries: BTreeMap<IndexKey, IndexEntry>,
    order: Vec<IndexKey>,
    // bumped per registration, so a re-added key never shares reader counts
    generation: u64,
}

impl IndexTable {
    fn remove(&mut self, key: &IndexKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[derive(Clone, Copy)]
struct Readers {
    generation: u64,
    count: usize,
}

#[derive(Default)]
struct RefTable {
    counts: BTreeMap<IndexKey, Readers>,
    pending: BTreeMap<IndexKey, Arc<Completion>>,
}

///
/// IndexRegistry
///
/// Ready indexes keyed by (database, id), in registration order.
///
/// Readers hold an `IndexGuard`; deleting an index that still has readers
/// stops new readers at once and defers removal to the last release.
/// Lock order is indexes, then reference counts.
///

#[derive(Default)]
pub struct IndexRegistry {
    indexes: RwLock<IndexTable>,
    drivers: RwLock<BTreeMap<String, Arc<dyn IndexDriver>>>,
    refs: Mutex<RefTable>,
}

impl IndexRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_index(&self, index: Arc<IndexModel>) -> Result<(), RegistryError> {
        let key = IndexKey::new(index.database(), index.id());
        let mut guard = self.indexes.write();
        let indexes = &mut *guard;

        match indexes.entries.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(RegistryError::DuplicateIndex {
                    database: key.database,
                    id: key.id,
                });
            }
            Entry::Vacant(slot) => {
                indexes.generation += 1;
                slot.insert(IndexEntry {
                    index,
                    generation: indexes.generation,
                    ready: true,
                });
            }
        }
        debug!(index = %key, generation = indexes.generation, "index registered");
        indexes.order.push(key);

        Ok(())
    }

    /// Retain a ready index until the returned guard drops.
    #[must_use]
    pub fn index(&self, database: &str, id: &str) -> Option<IndexGuard<'_>> {
        let key = IndexKey::new(database, id);
        let indexes = self.indexes.read();
        let entry = indexes.entries.get(&key).filter(|entry| entry.ready)?;

        // Counted under the index read lock so a concurrent delete sees it.
        self.refs
            .lock()
            .counts
            .entry(key.clone())
            .or_insert(Readers {
                generation: entry.generation,
                count: 0,
            })
            .count += 1;
        record(MetricsEvent::Registry {
            action: RegistryAction::Retain,
        });

        Some(IndexGuard {
            registry: self,
            index: Arc::clone(&entry.index),
            generation: entry.generation,
            key,
        })
    }

    /// Whether the index exists and accepts new readers.
    #[must_use]
    pub fn is_ready(&self, database: &str, id: &str) -> bool {
        self.indexes
            .read()
            .entries
            .get(&IndexKey::new(database, id))
            .is_some_and(|entry| entry.ready)
    }

    /// Ready indexes of one table in registration order.
    #[must_use]
    pub fn indexes_by_table(&self, database: &str, table: &str) -> Vec<Arc<IndexModel>> {
        let indexes = self.indexes.read();

        indexes
            .order
            .iter()
            .filter_map(|key| indexes.entries.get(key))
            .filter(|entry| {
                entry.ready && entry.index.database() == database && entry.index.table() == table
            })
            .map(|entry| Arc::clone(&entry.index))
            .collect()
    }

    /// Stop new readers and remove the index once no reader holds it.
    ///
    /// With `force`, or with no outstanding readers, the index is removed
    /// now and the ticket is already complete.
    pub fn delete_index(
        &self,
        database: &str,
        id: &str,
        force: bool,
    ) -> Result<DeleteTicket, RegistryError> {
        let key = IndexKey::new(database, id);
        let mut indexes = self.indexes.write();

        let Some(entry) = indexes.entries.get_mut(&key) else {
            return Err(RegistryError::IndexNotFound {
                database: key.database,
                id: key.id,
            });
        };
        if !entry.ready {
            return Err(RegistryError::DeletionPending {
                database: key.database,
                id: key.id,
            });
        }
        entry.ready = false;

        let mut refs = self.refs.lock();
        let readers = refs.counts.get(&key).map_or(0, |readers| readers.count);
        if force || readers == 0 {
            refs.counts.remove(&key);
            indexes.remove(&key);

            debug!(index = %key, readers, force, "index deleted");
            record(MetricsEvent::Registry {
                action: RegistryAction::Delete,
            });

            return Ok(DeleteTicket::completed());
        }

        let completion = Arc::new(Completion::default());
        refs.pending.insert(key.clone(), Arc::clone(&completion));

        debug!(index = %key, readers, "index deletion deferred");
        record(MetricsEvent::Registry {
            action: RegistryAction::DeferredDelete,
        });

        Ok(DeleteTicket(completion))
    }

    pub fn register_driver(&self, driver: Arc<dyn IndexDriver>) -> Result<(), RegistryError> {
        let mut drivers = self.drivers.write();
        let id = driver.id().to_string();
        if drivers.contains_key(&id) {
            return Err(RegistryError::DuplicateDriver(id));
        }

        debug!(driver = %id, "index driver registered");
        drivers.insert(id, driver);

        Ok(())
    }

    #[must_use]
    pub fn driver(&self, id: &str) -> Option<Arc<dyn IndexDriver>> {
        self.drivers.read().get(id).cloned()
    }

    /// The only registered driver, if exactly one is registered.
    #[must_use]
    pub fn default_driver(&self) -> Option<Arc<dyn IndexDriver>> {
        let drivers = self.drivers.read();
        if drivers.len() != 1 {
            return None;
        }

        drivers.values().next().cloned()
    }

    fn release(&self, key: &IndexKey, generation: u64) {
        record(MetricsEvent::Registry {
            action: RegistryAction::Release,
        });

        let completion = {
            let mut refs = self.refs.lock();
            // a forced delete already dropped the count, and a later
            // registration of the same key counts its own readers
            let Some(readers) = refs
                .counts
                .get_mut(key)
                .filter(|readers| readers.generation == generation)
            else {
                return;
            };
            readers.count -= 1;
            if readers.count > 0 {
                return;
            }

            refs.counts.remove(key);
            refs.pending.remove(key)
        };

        // Not ready, so nobody can retain it between the two locks.
        if let Some(completion) = completion {
            self.indexes.write().remove(key);
            debug!(index = %key, "deferred index deletion completed");
            record(MetricsEvent::Registry {
                action: RegistryAction::Delete,
            });
            completion.complete();
        }
    }
}

impl fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("indexes", &self.indexes.read().order)
            .field("drivers", &self.drivers.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

///
/// IndexGuard
/// Shared hold on a registered index; released on drop.
///

pub struct IndexGuard<'a> {
    registry: &'a IndexRegistry,
    index: Arc<IndexModel>,
    generation: u64,
    key: IndexKey,
}

impl IndexGuard<'_> {
    /// Owned handle to the model, independent of the hold.
    #[must_use]
    pub fn model(&self) -> Arc<IndexModel> {
        Arc::clone(&self.index)
    }
}

impl Deref for IndexGuard<'_> {
    type Target = IndexModel;

    fn deref(&self) -> &Self::Target {
        &self.index
    }
}

impl Drop for IndexGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.generation);
    }
}

impl fmt::Debug for IndexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IndexGuard").field(&self.key).finish()
    }
}

#[derive(Debug, Default)]
struct Completion {
    done: Mutex<bool>,
    cv: Condvar,
}

impl Completion {
    fn complete(&self) {
        *self.done.lock() = true;
        self.cv.notify_all();
    }
}

///
/// DeleteTicket
/// Completes when the deleted index has actually been removed.
///

#[derive(Clone, Debug)]
pub struct DeleteTicket(Arc<Completion>);

impl DeleteTicket {
    fn completed() -> Self {
        Self(Arc::new(Completion {
            done: Mutex::new(true),
            cv: Condvar::new(),
        }))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        *self.0.done.lock()
    }

    /// Block until the index is removed.
    pub fn wait(&self) {
        let mut done = self.0.done.lock();
        while !*done {
            self.0.cv.wait(&mut done);
        }
    }

    /// Block for at most `timeout`; returns whether the index was removed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut done = self.0.done.lock();
        if !*done {
            self.0.cv.wait_while_for(&mut done, |done| !*done, timeout);
        }

        *done
    }
}
