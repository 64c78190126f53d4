//! # SimpleORM - declarative record <-> table mapping for SQLite
//!
//! SimpleORM maps typed records onto rows of a single table without
//! hand-written SQL per entity:
//! - Declarative descriptors (table, columns, identity, autogeneration)
//! - Bidirectional conversion between semantic types and SQLite scalars
//! - Parameterized SELECT / INSERT / UPDATE / DELETE generation
//! - Insert, update and delete-then-insert ("replace") write modes
//!
//! ```no_run
//! use simpleorm::{FieldDef, Orm, Record, TypeDescriptor};
//!
//! #[derive(Debug, Default)]
//! struct Bookmark {
//!     id: i64,
//!     url: String,
//! }
//!
//! impl Record for Bookmark {
//!     fn describe() -> TypeDescriptor<Self> {
//!         TypeDescriptor::builder()
//!             .table("bookmarks")
//!             .field(FieldDef::new("ID", |b: &Bookmark| b.id, |b, v| b.id = v))
//!             .field(FieldDef::new("Url", |b: &Bookmark| b.url.clone(), |b, v| b.url = v))
//!             .build()
//!     }
//! }
//!
//! # fn main() -> simpleorm::Result<()> {
//! let conn = rusqlite::Connection::open("bookmarks.db")?;
//! let orm = Orm::new(&conn);
//! let mut new = [Bookmark { id: 0, url: "https://example.org".into() }];
//! orm.insert(&mut new, None)?;
//! let found: Vec<Bookmark> = orm.read("\"Url\" LIKE ?", ["%example%"])?;
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod schema;
pub mod query;
pub mod orm;
pub mod journal;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use convert::{ColumnValue, Converter, DefaultConverter, EnumConverter, FnConverter, Persist, SemanticType, SqlEnum};
pub use schema::{FieldDef, FieldDescriptor, Record, TypeDescriptor, TypeDescriptorBuilder};
pub use orm::{Orm, WriteMode};
pub use journal::{EntryState, JournalStore, MirrorEntry};

/// Result type alias for SimpleORM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SimpleORM operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Too many records deleted from table {table} for id {id}: {affected}")]
    TooManyRowsDeleted {
        table: String,
        id: ColumnValue,
        affected: usize,
    },

    #[error("Table {table} has no identity field")]
    MissingIdentity { table: String },

    #[error("Record not found: {0}")]
    NotFound(String),
}
