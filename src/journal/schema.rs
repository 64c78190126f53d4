//! Database schema definitions
//!
//! The mapping layer never issues DDL; applications create their tables.

/// SQL to create the mirror_entries table
pub const CREATE_MIRROR_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mirror_entries (
    "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
    "Path" TEXT NOT NULL,
    "Size" INTEGER NOT NULL DEFAULT 0,
    "Modified" INTEGER NOT NULL DEFAULT 0,
    "IsFolder" INTEGER NOT NULL DEFAULT 0,
    "State" TEXT NOT NULL DEFAULT 'Pending',
    "Note" TEXT
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    r#"CREATE INDEX IF NOT EXISTS idx_mirror_entries_path ON mirror_entries("Path")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_mirror_entries_state ON mirror_entries("State")"#,
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_MIRROR_ENTRIES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
