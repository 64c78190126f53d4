//! Mirror journal - a concrete record type on top of the mapping layer
//!
//! Tracks files mirrored from a source tree in one table:
//! - mirror_entries(ID, Path, Size, Modified, IsFolder, State, Note)

pub mod schema;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};

use crate::convert::{unset_timestamp, SqlEnum};
use crate::orm::Orm;
use crate::schema::{FieldDef, Record, TypeDescriptor};
use crate::{Error, Result};

/// Lifecycle of a mirrored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryState {
    /// Seen at the source, not copied yet
    #[default]
    Pending,
    /// Copied and verified
    Mirrored,
    /// Removed at the source
    Deleted,
    /// Copy attempted and failed
    Failed,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Pending => "Pending",
            EntryState::Mirrored => "Mirrored",
            EntryState::Deleted => "Deleted",
            EntryState::Failed => "Failed",
        }
    }
}

impl SqlEnum for EntryState {
    const VARIANTS: &'static [Self] = &[
        EntryState::Pending,
        EntryState::Mirrored,
        EntryState::Deleted,
        EntryState::Failed,
    ];

    fn name(&self) -> &'static str {
        self.as_str()
    }
}

impl FromStr for EntryState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EntryState::VARIANTS
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown entry state: {}", s))
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One journal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub id: i64,
    /// Path relative to the mirrored root
    pub path: String,
    pub size: i64,
    /// Last modification time, stored with whole-second precision
    pub modified: DateTime<Utc>,
    pub is_folder: bool,
    pub state: EntryState,
    pub note: Option<String>,
}

impl MirrorEntry {
    /// A pending entry whose ID is assigned on insert.
    pub fn new(path: impl Into<String>, size: i64, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
            ..Self::default()
        }
    }

    pub fn folder(path: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            is_folder: true,
            ..Self::new(path, 0, modified)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl Default for MirrorEntry {
    fn default() -> Self {
        Self {
            id: 0,
            path: String::new(),
            size: 0,
            modified: unset_timestamp(),
            is_folder: false,
            state: EntryState::Pending,
            note: None,
        }
    }
}

impl Record for MirrorEntry {
    fn describe() -> TypeDescriptor<Self> {
        TypeDescriptor::builder()
            .table("mirror_entries")
            .field(FieldDef::new("ID", |e: &MirrorEntry| e.id, |e, v| e.id = v))
            .field(FieldDef::new("Path", |e: &MirrorEntry| e.path.clone(), |e, v| e.path = v))
            .field(FieldDef::new("Size", |e: &MirrorEntry| e.size, |e, v| e.size = v))
            .field(FieldDef::new("Modified", |e: &MirrorEntry| e.modified, |e, v| e.modified = v))
            .field(FieldDef::new("IsFolder", |e: &MirrorEntry| e.is_folder, |e, v| e.is_folder = v))
            .field(FieldDef::enumeration("State", |e: &MirrorEntry| e.state, |e, v| e.state = v))
            .field(FieldDef::new("Note", |e: &MirrorEntry| e.note.clone(), |e, v| e.note = v))
            .build()
    }
}

/// SQLite-backed journal of mirrored entries
pub struct JournalStore {
    conn: Connection,
}

impl JournalStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    pub fn orm(&self) -> Orm<'_> {
        Orm::new(&self.conn)
    }

    /// Start a transaction spanning several journal calls
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Insert one entry and return it with its assigned ID
    pub fn add(&self, entry: MirrorEntry) -> Result<MirrorEntry> {
        let mut batch = [entry];
        self.orm().insert(&mut batch, None)?;
        let [entry] = batch;
        Ok(entry)
    }

    /// Insert many entries; their IDs are not read back
    pub fn add_all(&self, entries: &mut [MirrorEntry], tx: Option<&Transaction<'_>>) -> Result<()> {
        self.orm().insert(entries, tx)
    }

    pub fn get(&self, id: i64) -> Result<Option<MirrorEntry>> {
        self.orm().find_by_id(id)
    }

    /// Entries matching a raw WHERE clause, ordered by ID
    pub fn find(&self, filter: &str, args: &[String]) -> Result<Vec<MirrorEntry>> {
        let filter = if filter.trim().is_empty() {
            "1=1".to_string()
        } else {
            format!("({})", filter)
        };
        self.orm()
            .read(&format!("{} ORDER BY \"ID\"", filter), rusqlite::params_from_iter(args.iter()))
    }

    pub fn all(&self) -> Result<Vec<MirrorEntry>> {
        self.find("", &[])
    }

    pub fn in_state(&self, state: EntryState) -> Result<Vec<MirrorEntry>> {
        self.find("\"State\" = ?", &[state.as_str().to_string()])
    }

    pub fn update(&self, entry: &MirrorEntry) -> Result<()> {
        self.orm().update(std::slice::from_ref(entry), None)
    }

    /// Move an entry to a new state
    pub fn mark(&self, id: i64, state: EntryState) -> Result<MirrorEntry> {
        let mut entry = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("mirror entry {}", id)))?;
        entry.state = state;
        self.update(&entry)?;
        Ok(entry)
    }

    /// Overwrite entries by ID, inserting any that do not exist yet
    pub fn replace(&self, entries: &[MirrorEntry]) -> Result<()> {
        self.orm().insert_or_replace(entries, None)
    }

    pub fn remove(&self, id: i64) -> Result<bool> {
        self.orm().delete_by_id::<MirrorEntry>(id, None)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mirror_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Per-state totals
    pub fn stats(&self) -> Result<JournalStats> {
        let entries = self.all()?;
        let mut stats = JournalStats {
            entries: entries.len(),
            ..JournalStats::default()
        };
        for entry in &entries {
            match entry.state {
                EntryState::Pending => stats.pending += 1,
                EntryState::Mirrored => stats.mirrored += 1,
                EntryState::Deleted => stats.deleted += 1,
                EntryState::Failed => stats.failed += 1,
            }
            if !entry.is_folder {
                stats.bytes += entry.size.max(0) as u64;
            }
        }
        Ok(stats)
    }
}

/// Journal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub entries: usize,
    pub pending: usize,
    pub mirrored: usize,
    pub deleted: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl fmt::Display for JournalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Journal Statistics:")?;
        writeln!(f, "  Entries: {}", self.entries)?;
        writeln!(f, "  Pending: {}", self.pending)?;
        writeln!(f, "  Mirrored: {}", self.mirrored)?;
        writeln!(f, "  Deleted: {}", self.deleted)?;
        writeln!(f, "  Failed: {}", self.failed)?;
        writeln!(f, "  Bytes: {}", self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let store = JournalStore::open_in_memory().unwrap();

        let added = store
            .add(MirrorEntry::new("docs/readme.txt", 120, at(1_600_000_000)).with_note("first"))
            .unwrap();
        assert!(added.id > 0);

        let fetched = store.get(added.id).unwrap().unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched.state, EntryState::Pending);
    }

    #[test]
    fn test_batch_add_and_filter() {
        let store = JournalStore::open_in_memory().unwrap();
        let mut batch = vec![
            MirrorEntry::new("a.bin", 10, at(1_000)),
            MirrorEntry::folder("dir", at(2_000)),
            MirrorEntry::new("b.bin", 30, at(3_000)),
        ];
        store.add_all(&mut batch, None).unwrap();
        assert!(batch.iter().all(|e| e.id == 0));
        assert_eq!(store.count().unwrap(), 3);

        let folders = store.find("\"IsFolder\" = ?", &["1".to_string()]).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].path, "dir");

        let big = store.find("\"Size\" > 15", &[]).unwrap();
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].path, "b.bin");
    }

    #[test]
    fn test_mark_and_stats() {
        let store = JournalStore::open_in_memory().unwrap();
        let a = store.add(MirrorEntry::new("a", 5, at(10))).unwrap();
        let b = store.add(MirrorEntry::new("b", 7, at(20))).unwrap();
        store.add(MirrorEntry::folder("c", at(30))).unwrap();

        let marked = store.mark(a.id, EntryState::Mirrored).unwrap();
        assert_eq!(marked.state, EntryState::Mirrored);
        store.mark(b.id, EntryState::Failed).unwrap();

        assert_eq!(store.in_state(EntryState::Mirrored).unwrap().len(), 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.mirrored, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.bytes, 12);

        assert!(matches!(store.mark(999, EntryState::Deleted), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_replace_and_remove() {
        let store = JournalStore::open_in_memory().unwrap();
        let a = store.add(MirrorEntry::new("a", 1, at(10))).unwrap();

        let mut changed = a.clone();
        changed.size = 99;
        changed.state = EntryState::Mirrored;
        store.replace(&[changed.clone()]).unwrap();
        assert_eq!(store.get(a.id).unwrap().unwrap(), changed);
        assert_eq!(store.count().unwrap(), 1);

        assert!(store.remove(a.id).unwrap());
        assert!(!store.remove(a.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_entry_state_parse() {
        assert_eq!("mirrored".parse::<EntryState>().unwrap(), EntryState::Mirrored);
        assert_eq!(" FAILED ".parse::<EntryState>().unwrap(), EntryState::Failed);
        assert!("gone".parse::<EntryState>().is_err());
    }

    #[test]
    fn test_unknown_state_reads_as_pending() {
        let store = JournalStore::open_in_memory().unwrap();
        let a = store.add(MirrorEntry::new("a", 1, at(10))).unwrap();
        store
            .orm()
            .connection()
            .execute("UPDATE mirror_entries SET \"State\" = 'Archived' WHERE \"ID\" = ?", [a.id])
            .unwrap();
        assert_eq!(store.get(a.id).unwrap().unwrap().state, EntryState::Pending);
    }
}
