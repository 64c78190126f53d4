//! CRUD executor and upsert orchestration
//!
//! [`Orm`] borrows a connection and drives every operation through a
//! freshly resolved [`TypeDescriptor`]. Write operations accept an optional
//! caller transaction: when one is given the work joins it and is never
//! committed or rolled back here; otherwise a transaction is opened and
//! committed around the operation. A failed operation drops the
//! self-opened transaction uncommitted, which rolls it back.

use std::ops::Deref;

use rusqlite::{params_from_iter, Connection, Params, Transaction};

use crate::convert::ColumnValue;
use crate::query;
use crate::schema::{resolve, FieldDescriptor, Record, TypeDescriptor};
use crate::{Error, Result};

/// How [`Orm::write`] treats the incoming records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// INSERT every record; a single autogenerated identity is read back.
    Insert,
    /// UPDATE every record by identity.
    Update,
    /// DELETE all identities in one statement, then INSERT every record.
    Replace,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Insert => "insert",
            WriteMode::Update => "update",
            WriteMode::Replace => "replace",
        }
    }
}

/// Maps records onto a single connection.
///
/// Not safe to share between concurrent callers; serialize access outside.
pub struct Orm<'c> {
    conn: &'c Connection,
}

impl<'c> Orm<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    // ========== Read ==========

    /// Read every row matching `filter`.
    ///
    /// `filter` is raw SQL placed after `WHERE` (a blank filter reads the
    /// whole table) and `args` binds its `?` placeholders. Nothing about the
    /// clause is validated or escaped.
    pub fn read<T: Record, P: Params>(&self, filter: &str, args: P) -> Result<Vec<T>> {
        self.read_with(&resolve::<T>(), filter, args)
    }

    pub fn read_all<T: Record>(&self) -> Result<Vec<T>> {
        self.read("", [])
    }

    /// Look up one record by identity.
    pub fn find_by_id<T: Record>(&self, id: impl Into<ColumnValue>) -> Result<Option<T>> {
        let desc = resolve::<T>();
        let identity = require_identity(&desc)?;
        let filter = format!("{}=?", query::quote_ident(identity.column_name()));
        Ok(self.read_with(&desc, &filter, [id.into()])?.into_iter().next())
    }

    fn read_with<T: Record, P: Params>(&self, desc: &TypeDescriptor<T>, filter: &str, args: P) -> Result<Vec<T>> {
        let columns: Vec<&str> = desc.fields().iter().map(|f| f.column_name()).collect();
        let sql = query::select_sql(desc.table_name(), &columns, filter);
        tracing::debug!(table = desc.table_name(), sql = %sql, "read");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(args)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = T::default();
            for (i, field) in desc.fields().iter().enumerate() {
                let raw: ColumnValue = row.get(i)?;
                field.write(&mut record, &raw);
            }
            records.push(record);
        }
        Ok(records)
    }

    // ========== Write ==========

    /// Insert records. When exactly one record is inserted and its identity
    /// is autogenerated, the engine-assigned identity is written back into
    /// it; larger batches keep whatever identity they came with.
    pub fn insert<T: Record>(&self, records: &mut [T], tx: Option<&Transaction<'_>>) -> Result<()> {
        self.write(records, WriteMode::Insert, tx)
    }

    pub fn update<T: Record>(&self, records: &[T], tx: Option<&Transaction<'_>>) -> Result<()> {
        let desc = resolve::<T>();
        self.in_transaction(tx, |conn| write_rows(conn, &desc, records, WriteMode::Update))
    }

    /// Delete any rows sharing an identity with `records`, then insert them
    /// all, atomically.
    pub fn insert_or_replace<T: Record>(&self, records: &[T], tx: Option<&Transaction<'_>>) -> Result<()> {
        let desc = resolve::<T>();
        self.in_transaction(tx, |conn| write_rows(conn, &desc, records, WriteMode::Replace))
    }

    /// Shared entry point for the three write modes.
    pub fn write<T: Record>(&self, records: &mut [T], mode: WriteMode, tx: Option<&Transaction<'_>>) -> Result<()> {
        let desc = resolve::<T>();
        self.in_transaction(tx, |conn| {
            write_rows(conn, &desc, records, mode)?;
            if mode == WriteMode::Insert && records.len() == 1 {
                assign_generated_identity(conn, &desc, &mut records[0])?;
            }
            Ok(())
        })
    }

    // ========== Delete ==========

    /// Delete the row holding `record`'s identity.
    pub fn delete<T: Record>(&self, record: &T, tx: Option<&Transaction<'_>>) -> Result<bool> {
        let desc = resolve::<T>();
        let id = require_identity(&desc)?.read(record);
        self.delete_with(&desc, id, tx)
    }

    /// Delete by identity value. Returns whether a row was removed.
    ///
    /// More than one affected row means the identity column is not unique;
    /// that is reported as [`Error::TooManyRowsDeleted`] and the deletion is
    /// not committed by this call.
    pub fn delete_by_id<T: Record>(&self, id: impl Into<ColumnValue>, tx: Option<&Transaction<'_>>) -> Result<bool> {
        let desc = resolve::<T>();
        self.delete_with(&desc, id.into(), tx)
    }

    fn delete_with<T>(&self, desc: &TypeDescriptor<T>, id: ColumnValue, tx: Option<&Transaction<'_>>) -> Result<bool> {
        let identity = require_identity(desc)?;
        let sql = query::delete_sql(desc.table_name(), identity.column_name());
        tracing::debug!(table = desc.table_name(), sql = %sql, id = %id, "delete");

        self.in_transaction(tx, |conn| {
            let affected = conn.execute(&sql, [&id])?;
            if affected > 1 {
                return Err(Error::TooManyRowsDeleted {
                    table: desc.table_name().to_string(),
                    id: id.clone(),
                    affected,
                });
            }
            Ok(affected == 1)
        })
    }

    // ========== Transactions ==========

    /// Run `op` inside the caller's transaction, or inside one opened and
    /// committed here.
    fn in_transaction<R>(
        &self,
        tx: Option<&Transaction<'_>>,
        op: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        match tx {
            Some(tx) => op(tx.deref()),
            None => {
                let tx = self.conn.unchecked_transaction()?;
                let result = op(tx.deref())?;
                tx.commit()?;
                Ok(result)
            }
        }
    }
}

fn require_identity<T>(desc: &TypeDescriptor<T>) -> Result<&FieldDescriptor<T>> {
    desc.identity().ok_or_else(|| Error::MissingIdentity {
        table: desc.table_name().to_string(),
    })
}

fn write_rows<T>(conn: &Connection, desc: &TypeDescriptor<T>, records: &[T], mode: WriteMode) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let table = desc.table_name();
    tracing::debug!(table, mode = mode.as_str(), rows = records.len(), "write");
    match mode {
        WriteMode::Insert => {
            let fields: Vec<&FieldDescriptor<T>> = desc.writable_fields().collect();
            insert_rows(conn, table, &fields, records, |field, record| field.read(record))
        }
        WriteMode::Update => {
            let identity = require_identity(desc)?;
            let fields: Vec<&FieldDescriptor<T>> = desc.writable_fields().collect();
            if fields.is_empty() {
                tracing::debug!(table, "nothing to update");
                return Ok(());
            }
            let columns: Vec<&str> = fields.iter().map(|f| f.column_name()).collect();
            let sql = query::update_sql(table, &columns, identity.column_name());
            tracing::debug!(table, sql = %sql, rows = records.len(), "update");

            let mut stmt = conn.prepare(&sql)?;
            for record in records {
                let mut values: Vec<ColumnValue> = fields.iter().map(|f| f.read(record)).collect();
                values.push(identity.read(record));
                stmt.execute(params_from_iter(values.iter()))?;
            }
            Ok(())
        }
        WriteMode::Replace => {
            let identity = require_identity(desc)?;
            let ids: Vec<ColumnValue> = records
                .iter()
                .map(|r| identity.read(r))
                .filter(|id| !is_unassigned(identity, id))
                .collect();
            if !ids.is_empty() {
                let sql = query::delete_in_sql(table, identity.column_name(), ids.len());
                tracing::debug!(table, sql = %sql, rows = ids.len(), "replace: delete existing");
                let removed = conn.execute(&sql, params_from_iter(ids.iter()))?;
                tracing::debug!(table, removed, "replace: deleted");
            }

            // Assigned identities are written back as-is; unassigned ones
            // bind NULL so the engine picks a fresh key.
            let fields: Vec<&FieldDescriptor<T>> = desc
                .fields()
                .iter()
                .filter(|f| f.is_identity() || !f.is_autogenerated())
                .collect();
            insert_rows(conn, table, &fields, records, |field, record| {
                let value = field.read(record);
                if field.is_identity() && is_unassigned(field, &value) {
                    ColumnValue::Null
                } else {
                    value
                }
            })
        }
    }
}

/// An autogenerated identity that still holds its unset value.
fn is_unassigned<T>(field: &FieldDescriptor<T>, value: &ColumnValue) -> bool {
    field.is_autogenerated() && matches!(value, ColumnValue::Null | ColumnValue::Integer(0))
}

fn insert_rows<T>(
    conn: &Connection,
    table: &str,
    fields: &[&FieldDescriptor<T>],
    records: &[T],
    bind: impl Fn(&FieldDescriptor<T>, &T) -> ColumnValue,
) -> Result<()> {
    let columns: Vec<&str> = fields.iter().map(|f| f.column_name()).collect();
    let sql = query::insert_sql(table, &columns);
    tracing::debug!(table, sql = %sql, rows = records.len(), "insert");

    let mut stmt = conn.prepare(&sql)?;
    for record in records {
        let values: Vec<ColumnValue> = fields.iter().map(|&f| bind(f, record)).collect();
        stmt.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}

fn assign_generated_identity<T>(conn: &Connection, desc: &TypeDescriptor<T>, record: &mut T) -> Result<()> {
    if !desc.is_autogenerated_identity() {
        return Ok(());
    }
    let identity = require_identity(desc)?;
    let id: ColumnValue = conn.query_row(query::LAST_INSERT_ID_SQL, [], |row| row.get(0))?;
    tracing::debug!(table = desc.table_name(), id = %id, "assigned identity");
    identity.write(record, &id);
    Ok(())
}
