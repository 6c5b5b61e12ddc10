//! Store configuration loaded from `store.toml`

use crate::common::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    StoreConfig::write_default_if_missing(&path).unwrap();
    fs::write(&path, "schema_version = 7\n").unwrap();
    StoreConfig::write_default_if_missing(&path).unwrap();

    let config = StoreConfig::from_file(&path).unwrap();
    assert_eq!(config.schema_version, 7);
}

#[test]
fn test_thread_scheduler_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "scheduler = \"thread\"\n").unwrap();

    let config = StoreConfig::from_file(&path).unwrap();
    assert_eq!(config.scheduler_kind().unwrap(), SchedulerKind::Thread);
    let db = Db::open(config, Db::schema_for::<Contact>()).unwrap();
    assert!(!db.store().is_closed());
}

#[test]
fn test_unknown_scheduler_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "scheduler = \"carrier-pigeon\"\n").unwrap();

    let config = StoreConfig::from_file(&path).unwrap();
    let err = Db::open(config, Db::schema_for::<Contact>()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_test_db_uses_file_config() {
    let t = TestDb::new();
    assert!(t.dir.path().join(CONFIG_FILE_NAME).exists());
    assert_eq!(t.db.store().config().scheduler_kind().unwrap(), SchedulerKind::Immediate);
}
