//! Change notifications on managed maps

use crate::common::*;
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects delivered change sets
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<MapChange>>>);

impl Recorder {
    fn handler(&self) -> impl FnMut(&MapChange) + Send + 'static {
        let inner = Arc::clone(&self.0);
        move |change: &MapChange| inner.lock().push(change.clone())
    }

    fn changes(&self) -> Vec<MapChange> {
        self.0.lock().clone()
    }
}

#[test]
fn test_one_notification_per_transaction() {
    let t = TestDb::new();
    let mut c = contact("ada");
    t.add(&mut c);
    let rec = Recorder::default();
    let _token = c.tags.observe(rec.handler()).unwrap();

    t.db.write(|| {
        c.tags.insert("a", "1".to_string())?;
        c.tags.insert("b", "2".to_string())?;
        c.tags.insert("a", "3".to_string())
    })
    .unwrap();

    let changes = rec.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].insertions, vec!["a", "b"]);
    assert!(changes[0].modifications.is_empty());
}

#[test]
fn test_unrelated_writes_do_not_notify() {
    let t = TestDb::new();
    let mut c = contact("ada");
    t.add(&mut c);
    let rec = Recorder::default();
    let _token = c.tags.observe(rec.handler()).unwrap();

    t.db.write(|| c.name.set("grace".to_string())).unwrap();
    t.db.write(|| c.ids.insert("x", uuid::Uuid::nil())).unwrap();

    assert!(rec.changes().is_empty());
}

#[test]
fn test_rewriting_same_value_is_a_modification() {
    let t = TestDb::new();
    let mut c = contact("ada");
    c.tags.insert("a", "1".to_string()).unwrap();
    t.add(&mut c);
    let rec = Recorder::default();
    let _token = c.tags.observe(rec.handler()).unwrap();

    t.db.write(|| c.tags.insert("a", "1".to_string())).unwrap();

    let changes = rec.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].modifications, vec!["a"]);
}

#[test]
fn test_background_delivery() {
    let t = TestDb::with_scheduler(SchedulerKind::Thread);
    let mut c = contact("ada");
    t.add(&mut c);
    let rec = Recorder::default();
    let token = c.tags.observe(rec.handler()).unwrap();

    for i in 0..10 {
        t.db.write(|| c.tags.insert(format!("k{i}"), i.to_string())).unwrap();
    }
    t.db.store().wait_for_notifications();

    let changes = rec.changes();
    assert_eq!(changes.len(), 10);
    assert_eq!(changes[9].insertions, vec!["k9"]);
    drop(token);
}

#[test]
fn test_handler_panic_does_not_poison_store() {
    let t = TestDb::new();
    let mut c = contact("ada");
    t.add(&mut c);
    let _bad = c.tags.observe(|_| panic!("handler failure")).unwrap();
    let rec = Recorder::default();
    let _good = c.tags.observe(rec.handler()).unwrap();

    t.db.write(|| c.tags.insert("a", "1".to_string())).unwrap();
    t.db.write(|| c.tags.insert("b", "2".to_string())).unwrap();

    assert_eq!(rec.changes().len(), 2);
}
