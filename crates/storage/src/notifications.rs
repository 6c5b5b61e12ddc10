//! Dictionary change notifications
//!
//! Handlers are registered per dictionary (owner object + column). At commit
//! the store compares each observed dictionary in the pre-transaction
//! snapshot with its committed contents, adds the keys the transaction wrote
//! (even when the value ended up unchanged), and schedules one
//! `DictionaryChange` per handler whose dictionary changed.
//!
//! ## Lifetime
//!
//! A `SubscriptionHandle` holds only a weak reference to the store, so it may
//! outlive it. Unregistering flips a shared flag first and then removes the
//! registry entry; deliveries already queued check the flag and are skipped.

use crate::group::{DictData, Group};
use crate::scheduler::Task;
use crate::store::StoreInner;
use dualstore_core::{ColKey, Mixed, ObjLink};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

/// Keys affected by one committed write transaction.
///
/// Key lists are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryChange {
    /// Keys that did not exist before the transaction
    pub insertions: Vec<String>,
    /// Keys that existed before and were written or changed
    pub modifications: Vec<String>,
    /// Keys that existed before and are gone
    pub deletions: Vec<String>,
    /// The dictionary was cleared at some point in the transaction
    pub cleared: bool,
    /// The object owning the dictionary was deleted
    pub root_deleted: bool,
}

impl DictionaryChange {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
            && self.modifications.is_empty()
            && self.deletions.is_empty()
            && !self.cleared
            && !self.root_deleted
    }
}

pub(crate) type Callback = Box<dyn FnMut(&DictionaryChange) + Send + 'static>;

// ============================================================================
// Write log
// ============================================================================

/// Writes recorded during the current transaction.
#[derive(Debug, Default)]
pub(crate) struct WriteLog {
    touched: FxHashSet<(ObjLink, ColKey, String)>,
    cleared: FxHashSet<(ObjLink, ColKey)>,
}

impl WriteLog {
    pub(crate) fn record_write(&mut self, owner: ObjLink, col: ColKey, key: &str) {
        self.touched.insert((owner, col, key.to_string()));
    }

    pub(crate) fn record_clear(&mut self, owner: ObjLink, col: ColKey) {
        self.cleared.insert((owner, col));
    }

    fn was_touched(&self, owner: ObjLink, col: ColKey, key: &str) -> bool {
        self.touched.contains(&(owner, col, key.to_string()))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A handler plus the changes that arrived while it was running.
///
/// The handler is taken out while it runs, so a handler whose own write
/// triggers another delivery finds the slot empty and queues the change
/// instead of waiting on itself.
struct HandlerSlot {
    callback: Option<Callback>,
    pending: VecDeque<DictionaryChange>,
}

struct Subscription {
    id: u64,
    owner: ObjLink,
    col: ColKey,
    handler: Arc<Mutex<HandlerSlot>>,
    active: Arc<AtomicBool>,
}

/// All live subscriptions of a store.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl Registry {
    pub(crate) fn add(
        &mut self,
        owner: ObjLink,
        col: ColKey,
        callback: Callback,
    ) -> (u64, Arc<AtomicBool>) {
        self.next_id += 1;
        let active = Arc::new(AtomicBool::new(true));
        self.subscriptions.push(Subscription {
            id: self.next_id,
            owner,
            col,
            handler: Arc::new(Mutex::new(HandlerSlot {
                callback: Some(callback),
                pending: VecDeque::new(),
            })),
            active: Arc::clone(&active),
        });
        (self.next_id, active)
    }

    pub(crate) fn remove(&mut self, id: u64) {
        self.subscriptions.retain(|s| s.id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Deactivate and drop every subscription.
    pub(crate) fn clear(&mut self) {
        for s in self.subscriptions.drain(..) {
            s.active.store(false, Ordering::SeqCst);
        }
    }

    /// Build the deliveries for one committed transaction.
    pub(crate) fn collect(&self, before: &Group, after: &Group, log: &WriteLog) -> Vec<Task> {
        let mut tasks: Vec<Task> = Vec::new();
        for sub in &self.subscriptions {
            let change = diff(
                before.dict_if_exists(sub.owner, sub.col),
                after.dict_if_exists(sub.owner, sub.col),
                sub.owner,
                sub.col,
                log,
            );
            let change = match change {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            trace!(subscription = sub.id, owner = %sub.owner, "scheduling change delivery");
            let handler = Arc::clone(&sub.handler);
            let active = Arc::clone(&sub.active);
            let id = sub.id;
            tasks.push(Box::new(move || deliver(id, &active, &handler, change)));
        }
        tasks
    }
}

fn deliver(id: u64, active: &AtomicBool, slot: &Mutex<HandlerSlot>, mut change: DictionaryChange) {
    let mut callback = {
        let mut slot = slot.lock();
        match slot.callback.take() {
            Some(callback) => callback,
            None => {
                trace!(subscription = id, "handler is running, queueing change");
                slot.pending.push_back(change);
                return;
            }
        }
    };
    loop {
        if active.load(Ordering::SeqCst)
            && catch_unwind(AssertUnwindSafe(|| callback(&change))).is_err()
        {
            warn!(subscription = id, "change handler panicked; delivery dropped");
        }
        let mut slot = slot.lock();
        match slot.pending.pop_front() {
            Some(queued) => change = queued,
            None => {
                slot.callback = Some(callback);
                return;
            }
        }
    }
}

/// Value equality for change detection; doubles compare by bit pattern so
/// an untouched NaN is not a change.
fn same_value(a: Option<&Mixed>, b: Option<&Mixed>) -> bool {
    match (a, b) {
        (Some(Mixed::Double(x)), Some(Mixed::Double(y))) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn diff(
    before: Option<&DictData>,
    after: Option<&DictData>,
    owner: ObjLink,
    col: ColKey,
    log: &WriteLog,
) -> Option<DictionaryChange> {
    let mut change = DictionaryChange::default();
    match (before, after) {
        (None, None) => return None,
        (Some(_), None) => {
            change.root_deleted = true;
            return Some(change);
        }
        (None, Some(after)) => {
            change.insertions = after.keys().map(String::from).collect();
        }
        (Some(before), Some(after)) => {
            let old: BTreeSet<&str> = before.keys().collect();
            let new: BTreeSet<&str> = after.keys().collect();
            change.insertions = new.difference(&old).map(|k| k.to_string()).collect();
            change.deletions = old.difference(&new).map(|k| k.to_string()).collect();
            change.modifications = old
                .intersection(&new)
                .filter(|k| {
                    !same_value(before.get(k), after.get(k)) || log.was_touched(owner, col, k)
                })
                .map(|k| k.to_string())
                .collect();
        }
    }
    change.cleared = log.cleared.contains(&(owner, col));
    Some(change)
}

// ============================================================================
// Handle
// ============================================================================

/// Keeps a change handler registered. Dropping it unregisters.
pub struct SubscriptionHandle {
    id: u64,
    active: Arc<AtomicBool>,
    store: Weak<StoreInner>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: u64, active: Arc<AtomicBool>, store: Weak<StoreInner>) -> Self {
        SubscriptionHandle { id, active, store }
    }

    /// Stop deliveries to this handler.
    ///
    /// Idempotent, and safe after the store was closed or dropped.
    pub fn unregister(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            inner.registry.lock().remove(self.id);
        }
        trace!(subscription = self.id, "unregistered");
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
