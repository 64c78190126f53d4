use chrono::{Duration, TimeZone, Utc};
use rusqlite::Connection;
use simpleorm::{EntryState, JournalStore, MirrorEntry, Orm};
use tempfile::TempDir;

fn temp_store() -> (JournalStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = JournalStore::open(&dir.path().join("journal.db")).unwrap();
    (store, dir)
}

fn raw_row(dir: &TempDir, id: i64) -> (i64, i64, String) {
    let conn = Connection::open(dir.path().join("journal.db")).unwrap();
    conn.query_row(
        r#"SELECT "Modified", "IsFolder", "State" FROM mirror_entries WHERE "ID" = ?"#,
        [id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .unwrap()
}

#[test]
fn test_entries_survive_reopen() {
    let (store, dir) = temp_store();
    let modified = Utc.with_ymd_and_hms(2023, 11, 5, 10, 20, 30).unwrap();
    let added = store
        .add(MirrorEntry::folder("photos", modified + Duration::milliseconds(400)))
        .unwrap();
    drop(store);

    let reopened = JournalStore::open(&dir.path().join("journal.db")).unwrap();
    let entry = reopened.get(added.id).unwrap().unwrap();
    assert_eq!(entry.path, "photos");
    assert!(entry.is_folder);
    assert_eq!(entry.modified, modified);

    let (seconds, folder, state) = raw_row(&dir, added.id);
    assert_eq!(seconds, modified.timestamp());
    assert_eq!(folder, 1);
    assert_eq!(state, "Pending");
}

#[test]
fn test_replace_twice_gives_same_table() {
    let (store, _dir) = temp_store();
    let base = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    let entries = vec![
        MirrorEntry { id: 10, ..MirrorEntry::new("a", 1, base) },
        MirrorEntry { id: 11, state: EntryState::Mirrored, ..MirrorEntry::new("b", 2, base) },
        MirrorEntry { id: 12, ..MirrorEntry::folder("c", base).with_note("kept") },
    ];

    store.replace(&entries).unwrap();
    let first = store.all().unwrap();
    store.replace(&entries).unwrap();
    let second = store.all().unwrap();

    assert_eq!(first, entries);
    assert_eq!(first, second);
}

#[test]
fn test_single_insert_gets_identity_batch_does_not() {
    let (store, _dir) = temp_store();
    let now = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();

    let one = store.add(MirrorEntry::new("single", 5, now)).unwrap();
    assert!(one.id > 0);

    let mut batch = vec![MirrorEntry::new("x", 1, now), MirrorEntry::new("y", 2, now)];
    store.add_all(&mut batch, None).unwrap();
    assert!(batch.iter().all(|e| e.id == 0));
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn test_shared_transaction_across_calls() {
    let (store, _dir) = temp_store();
    let now = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();
    let kept = store.add(MirrorEntry::new("kept", 1, now)).unwrap();

    {
        let tx = store.transaction().unwrap();
        let orm = store.orm();
        orm.insert(&mut [MirrorEntry::new("tmp", 1, now)], Some(&tx)).unwrap();
        assert!(orm.delete_by_id::<MirrorEntry>(kept.id, Some(&tx)).unwrap());
        // Rolled back on drop.
    }
    assert_eq!(store.all().unwrap(), vec![kept.clone()]);

    let tx = store.transaction().unwrap();
    store.orm().insert(&mut [MirrorEntry::new("tmp", 1, now)], Some(&tx)).unwrap();
    tx.commit().unwrap();
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_orm_on_plain_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.db");
    JournalStore::open(&path).unwrap();

    let conn = Connection::open(&path).unwrap();
    let orm = Orm::new(&conn);
    let mut one = [MirrorEntry::new("z", 3, Utc.timestamp_opt(1_000, 0).unwrap())];
    orm.insert(&mut one, None).unwrap();

    let found: Vec<MirrorEntry> = orm.read(r#""Path" = ?"#, ["z"]).unwrap();
    assert_eq!(found, one.to_vec());
}

#[test]
fn test_replace_with_new_entries_gets_fresh_ids() {
    let (store, _dir) = temp_store();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let existing = store.add(MirrorEntry::new("kept", 1, now)).unwrap();

    store
        .replace(&[existing.clone(), MirrorEntry::new("new1", 2, now)])
        .unwrap();
    store
        .replace(&[MirrorEntry::new("n2", 3, now), MirrorEntry::new("n3", 4, now)])
        .unwrap();

    let all = store.all().unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0], existing);
    let mut ids: Vec<i64> = all.iter().map(|e| e.id).collect();
    assert!(ids.iter().all(|&id| id > 0));
    ids.dedup();
    assert_eq!(ids.len(), 4);
}
