//! Shared test utilities for the dualstore integration suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use std::sync::Once;

use chrono::{DateTime, Utc};
pub use dualstore::storage::CONFIG_FILE_NAME;
pub use dualstore::{
    embedded_object, persisted_object, Db, Error, MapChange, Mixed, ObjectModel, Persisted,
    PersistedMap, SchedulerKind, StoreConfig,
};
use tempfile::TempDir;
use uuid::Uuid;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Models
// ============================================================================

embedded_object! {
    pub struct Phone {
        pub number: Persisted<String>,
        pub primary: Persisted<bool>,
    }
}

persisted_object! {
    pub struct Contact {
        pub name: Persisted<String>,
        pub best_friend: Persisted<Option<Box<Contact>>>,
        pub tags: PersistedMap<String>,
        pub ids: PersistedMap<Uuid>,
        pub birthdays: PersistedMap<DateTime<Utc>>,
        pub friends: PersistedMap<Option<Contact>>,
        pub phones: PersistedMap<Option<Phone>>,
    }
}

pub fn contact(name: &str) -> Contact {
    let mut c = Contact::default();
    c.name.set(name.to_string()).unwrap();
    c
}

pub fn phone(number: &str) -> Phone {
    let mut p = Phone::default();
    p.number.set(number.to_string()).unwrap();
    p
}

// ============================================================================
// TestDb
// ============================================================================

/// A Db opened from a `store.toml` in a temporary directory
pub struct TestDb {
    pub db: Db,
    pub dir: TempDir,
}

impl TestDb {
    /// Default configuration, written to disk and loaded back.
    pub fn new() -> Self {
        Self::with_scheduler(SchedulerKind::Immediate)
    }

    /// Same as `new`, with notifications delivered by `kind`.
    pub fn with_scheduler(kind: SchedulerKind) -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&path).unwrap();
        let config = StoreConfig::from_file(&path).unwrap().with_scheduler(kind);
        let db = Db::open(config, Db::schema_for::<Contact>()).unwrap();
        TestDb { db, dir }
    }

    /// Add `value` in its own write transaction
    pub fn add<T: ObjectModel>(&self, value: &mut T) {
        self.db.write(|| self.db.add(value)).unwrap();
    }
}
