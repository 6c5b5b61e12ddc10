//! The object store
//!
//! `Store` is a cheaply clonable handle (`Arc` inside) to one open store.
//! All clones see the same data.
//!
//! ## Transactions
//!
//! Reads never need a transaction. Every mutation must happen between
//! `begin_write` and `commit`/`cancel`; mutating outside one returns
//! `Error::NotInWriteTransaction`. There is one write transaction per store
//! at a time: a second `begin_write` returns
//! `Error::AlreadyInWriteTransaction` instead of blocking.
//!
//! `begin_write` clones the table data. `cancel` restores that clone;
//! `commit` compares it with the new state to build change notifications,
//! releases every lock, and then hands the deliveries to the scheduler.

use crate::config::{SchedulerKind, StoreConfig};
use crate::dictionary::Dictionary;
use crate::group::Group;
use crate::notifications::{Registry, WriteLog};
use crate::obj::Obj;
use crate::scheduler::{ImmediateScheduler, Scheduler, ThreadScheduler};
use crate::schema::{table_name_for_object_type, Schema};
use crate::table::TableRef;
use crate::thread_safe_reference::{ReferenceTarget, ThreadSafeReference};
use dualstore_core::{Error, ObjLink, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

struct WriteTxn {
    snapshot: Group,
    log: WriteLog,
}

pub(crate) struct StoreState {
    group: Group,
    txn: Option<WriteTxn>,
}

pub(crate) struct StoreInner {
    id: u64,
    config: StoreConfig,
    schema: Schema,
    state: RwLock<StoreState>,
    version: AtomicU64,
    closed: AtomicBool,
    pub(crate) registry: Mutex<Registry>,
    scheduler: Box<dyn Scheduler>,
}

impl StoreInner {
    /// Get next version number (atomic increment)
    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Handle to an open store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Open an in-memory store with the given configuration and schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the config or schema is invalid, or the
    /// notification thread cannot be started.
    pub fn open(config: StoreConfig, schema: Schema) -> Result<Store> {
        config.validate()?;
        schema.validate()?;
        let scheduler: Box<dyn Scheduler> = match config.scheduler_kind()? {
            SchedulerKind::Immediate => Box::new(ImmediateScheduler),
            SchedulerKind::Thread => Box::new(ThreadScheduler::new(config.max_pending_notifications)?),
        };
        info!(
            path = %config.path,
            schema_version = config.schema_version,
            classes = schema.objects().len(),
            "opening store"
        );
        let group = Group::from_schema(&schema);
        Ok(Store {
            inner: Arc::new(StoreInner {
                id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
                config,
                schema,
                state: RwLock::new(StoreState { group, txn: None }),
                version: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                registry: Mutex::new(Registry::default()),
                scheduler,
            }),
        })
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Schema the store was opened with
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Number of committed write transactions
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Whether both handles refer to the same store
    pub fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Arc::downgrade(&self.inner)
    }

    // ========== Lifecycle ==========

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Close the store.
    ///
    /// An open write transaction is rolled back and every change handler is
    /// unregistered. Further reads and writes through any handle return
    /// `Error::StoreClosed`. Closing twice is a no-op.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.write();
            if let Some(txn) = state.txn.take() {
                state.group = txn.snapshot;
            }
        }
        self.inner.registry.lock().clear();
        info!(path = %self.inner.config.path, "store closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::StoreClosed)
        } else {
            Ok(())
        }
    }

    // ========== Transactions ==========

    /// Whether a write transaction is open
    pub fn is_in_write_transaction(&self) -> bool {
        self.inner.state.read().txn.is_some()
    }

    /// Open a write transaction.
    pub fn begin_write(&self) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.write();
        if state.txn.is_some() {
            return Err(Error::AlreadyInWriteTransaction);
        }
        let snapshot = state.group.clone();
        state.txn = Some(WriteTxn {
            snapshot,
            log: WriteLog::default(),
        });
        debug!(path = %self.inner.config.path, "write transaction started");
        Ok(())
    }

    /// Commit the open write transaction and deliver change notifications.
    ///
    /// Returns the new store version.
    pub fn commit(&self) -> Result<u64> {
        self.ensure_open()?;
        let (version, deliveries) = {
            let mut state = self.inner.state.write();
            let txn = state.txn.take().ok_or(Error::NotInWriteTransaction)?;
            let version = self.inner.next_version();
            let deliveries = self
                .inner
                .registry
                .lock()
                .collect(&txn.snapshot, &state.group, &txn.log);
            (version, deliveries)
        };
        debug!(version, deliveries = deliveries.len(), "write transaction committed");
        for task in deliveries {
            self.inner.scheduler.invoke(task);
        }
        Ok(version)
    }

    /// Roll back the open write transaction.
    pub fn cancel(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        let txn = state.txn.take().ok_or(Error::NotInWriteTransaction)?;
        state.group = txn.snapshot;
        debug!(path = %self.inner.config.path, "write transaction rolled back");
        Ok(())
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn write<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.begin_write()?;
        match f() {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if self.is_in_write_transaction() {
                    self.cancel()?;
                }
                Err(e)
            }
        }
    }

    /// Block until every notification scheduled so far has been delivered.
    pub fn wait_for_notifications(&self) {
        self.inner.scheduler.drain();
    }

    /// Number of registered change handlers
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    // ========== Data access (crate-internal) ==========

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Group) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let state = self.inner.state.read();
        f(&state.group)
    }

    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Group, &mut WriteLog) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let mut state = self.inner.state.write();
        let StoreState { group, txn } = &mut *state;
        match txn {
            Some(txn) => f(group, &mut txn.log),
            None => Err(Error::NotInWriteTransaction),
        }
    }

    pub(crate) fn registry(&self) -> &Mutex<Registry> {
        &self.inner.registry
    }

    // ========== Lookup ==========

    /// Look up a table by its table name (e.g. `class_Person`).
    pub fn table(&self, name: &str) -> Result<TableRef> {
        let key = self.read(|g| {
            g.table_by_name(name)
                .ok_or_else(|| Error::TableNotFound(name.to_string()))
        })?;
        Ok(TableRef::new(self.clone(), key))
    }

    /// Look up the table of an object class.
    pub fn table_for_object_type(&self, class_name: &str) -> Result<TableRef> {
        self.table(&table_name_for_object_type(class_name))
    }

    /// Accessor for a linked object, or `None` if the link is dangling.
    pub fn resolve_link(&self, link: ObjLink) -> Option<Obj> {
        match self.read(|g| Ok(g.contains(link))) {
            Ok(true) => Some(Obj::new(self.clone(), link)),
            _ => None,
        }
    }

    /// Accessor for a linked object that must exist.
    pub fn object(&self, link: ObjLink) -> Result<Obj> {
        self.resolve_link(link)
            .ok_or_else(|| Error::InvalidObject(format!("object {} does not exist", link)))
    }

    // ========== Thread handover ==========

    /// Resolve a reference to an object in this store.
    pub fn resolve_object(&self, reference: &ThreadSafeReference) -> Result<Obj> {
        match self.check_reference(reference)? {
            ReferenceTarget::Object(link) => self.object(link),
            ReferenceTarget::Dictionary { .. } => Err(Error::InvalidInput(
                "reference is to a dictionary, not an object".to_string(),
            )),
        }
    }

    /// Resolve a reference to a dictionary in this store.
    pub fn resolve_dictionary(&self, reference: &ThreadSafeReference) -> Result<Dictionary> {
        match self.check_reference(reference)? {
            ReferenceTarget::Dictionary { owner, col } => {
                let dict = self.object(owner)?.get_dictionary(col)?;
                Ok(dict)
            }
            ReferenceTarget::Object(_) => Err(Error::InvalidInput(
                "reference is to an object, not a dictionary".to_string(),
            )),
        }
    }

    fn check_reference(&self, reference: &ThreadSafeReference) -> Result<ReferenceTarget> {
        self.ensure_open()?;
        if reference.store_id() != self.id() {
            return Err(Error::InvalidInput(
                "reference was created by a different store".to_string(),
            ));
        }
        Ok(reference.target())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.inner.config.path)
            .field("version", &self.version())
            .field("closed", &self.is_closed())
            .finish()
    }
}
