//! A map's life: unmanaged edits, migration on add, managed edits, close

use crate::common::*;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

#[test]
fn test_unmanaged_edits_survive_add() {
    let t = TestDb::new();
    let mut c = contact("ada");
    c.tags.insert("lang", "en".to_string()).unwrap();
    c.tags.insert("team", "core".to_string()).unwrap();
    c.tags.erase("team").unwrap();
    let before = c.tags.detach().unwrap();

    t.add(&mut c);

    assert!(c.tags.is_managed());
    assert_eq!(c.tags.detach().unwrap(), before);
    assert_eq!(c.name.get().unwrap(), "ada");
}

#[test]
fn test_typed_values_migrate() {
    let t = TestDb::new();
    let id = Uuid::new_v4();
    let birthday = Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap();
    let mut c = contact("ada");
    c.ids.insert("primary", id).unwrap();
    c.birthdays.insert("ada", birthday).unwrap();

    t.add(&mut c);

    assert_eq!(c.ids.get("primary").unwrap(), Some(id));
    assert_eq!(c.birthdays.get("ada").unwrap(), Some(birthday));
}

#[test]
fn test_managed_edits_are_visible_to_other_accessors() {
    let t = TestDb::new();
    let mut c = contact("ada");
    t.add(&mut c);

    let found = t.db.objects::<Contact>().unwrap().pop().unwrap();
    t.db.write(|| c.tags.insert("lang", "fr".to_string())).unwrap();

    assert_eq!(found.tags.get("lang").unwrap(), Some("fr".to_string()));
    let cursor = found.tags.find("lang").unwrap();
    assert_eq!(cursor.value().unwrap(), "fr");
}

#[test]
fn test_cancelled_transaction_leaves_map_unchanged() {
    let t = TestDb::new();
    let mut c = contact("ada");
    c.tags.insert("a", "1".to_string()).unwrap();
    t.add(&mut c);

    let result: Result<(), Error> = t.db.write(|| {
        c.tags.clear()?;
        c.tags.insert("b", "2".to_string())?;
        Err(Error::InvalidInput("abort".to_string()))
    });
    assert!(result.is_err());
    assert!(!t.db.store().is_in_write_transaction());
    assert_eq!(
        c.tags.detach().unwrap(),
        BTreeMap::from([("a".to_string(), "1".to_string())])
    );
}

#[test]
fn test_closed_store_rejects_access() {
    let t = TestDb::new();
    let mut c = contact("ada");
    c.tags.insert("a", "1".to_string()).unwrap();
    t.add(&mut c);

    t.db.close();

    assert!(matches!(c.tags.get("a"), Err(Error::StoreClosed)));
    assert_eq!(c.tags.len(), 0);
    assert!(matches!(t.db.begin_write(), Err(Error::StoreClosed)));
}

#[test]
fn test_iteration_matches_detach() {
    let t = TestDb::new();
    let mut c = contact("ada");
    for (k, v) in [("z", "26"), ("m", "13"), ("a", "1")] {
        c.tags.insert(k, v.to_string()).unwrap();
    }
    t.add(&mut c);

    let iterated: BTreeMap<String, String> =
        (&c.tags).into_iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(iterated, c.tags.detach().unwrap());
    let keys: Vec<String> = c.tags.iter().map(|e| e.unwrap().0).collect();
    assert_eq!(keys, vec!["a", "m", "z"]);
}
