//! SQL text for each operation
//!
//! Every builder takes plain table and column names and emits one `?`
//! placeholder per bound value, in binding order. Identifiers are always
//! double-quoted. Filter clauses are caller-supplied SQL and are passed
//! through untouched.

/// Fetches the rowid assigned by the most recent INSERT on the connection.
pub const LAST_INSERT_ID_SQL: &str = "SELECT last_insert_rowid()";

/// Quote an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?, ?, ?` for `count` values.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `SELECT "a", "b" FROM "t" [WHERE <filter>]`
///
/// A blank filter omits the WHERE keyword.
pub fn select_sql(table: &str, columns: &[&str], filter: &str) -> String {
    let mut sql = format!("SELECT {} FROM {}", column_list(columns), quote_ident(table));
    let filter = filter.trim();
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

/// `INSERT INTO "t" ("a", "b") VALUES (?, ?)`
pub fn insert_sql(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list(columns),
        placeholders(columns.len())
    )
}

/// `UPDATE "t" SET "a"=?, "b"=? WHERE "id"=?`
///
/// Binding order is every SET column followed by the identity value.
pub fn update_sql(table: &str, columns: &[&str], identity_column: &str) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{}=?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {}=?",
        quote_ident(table),
        assignments,
        quote_ident(identity_column)
    )
}

/// `DELETE FROM "t" WHERE "id"=?`
pub fn delete_sql(table: &str, identity_column: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {}=?",
        quote_ident(table),
        quote_ident(identity_column)
    )
}

/// `DELETE FROM "t" WHERE "id" IN (?, ?, ...)`
pub fn delete_in_sql(table: &str, identity_column: &str, count: usize) -> String {
    format!(
        "DELETE FROM {} WHERE {} IN ({})",
        quote_ident(table),
        quote_ident(identity_column),
        placeholders(count)
    )
}
