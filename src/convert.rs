//! Type Conversion Layer - SQL-native scalars <-> semantic field types
//!
//! SQLite only speaks integers and text for our purposes, so every semantic
//! type is folded onto one of those:
//! - `int64`     <-> INTEGER
//! - `string`    <-> TEXT (NULL stays distinguishable from "")
//! - `bool`      <-> INTEGER, `1` is true and anything else is false
//! - `timestamp` <-> INTEGER seconds since 1970-01-01T00:00:00Z
//! - `enum`      <-> TEXT holding the canonical variant name
//!
//! All conversions towards the semantic side are total: values that do not
//! fit fall back to a documented default instead of raising.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use std::fmt;
use std::marker::PhantomData;

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch.
const UNSET_EPOCH_OFFSET: i64 = -62_135_596_800;

/// A transient scalar exchanged with the storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ColumnValue {
    #[default]
    Null,
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::Integer(i) => write!(f, "{}", i),
            ColumnValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl<V: Into<ColumnValue>> From<Option<V>> for ColumnValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(Value::Null),
            ColumnValue::Integer(i) => ToSqlOutput::from(*i),
            ColumnValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl FromSql for ColumnValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => ColumnValue::Null,
            ValueRef::Integer(i) => ColumnValue::Integer(i),
            ValueRef::Real(f) => ColumnValue::Integer(f.round() as i64),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                ColumnValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        })
    }
}

/// The in-memory meaning of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Int64,
    String,
    Bool,
    Timestamp,
    Enum,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Int64 => "int64",
            SemanticType::String => "string",
            SemanticType::Bool => "bool",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Enum => "enum",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========== Conversion table ==========

/// Read an integer, falling back to `default` for NULL or unparseable text.
pub fn to_int64(raw: &ColumnValue, default: i64) -> i64 {
    match raw {
        ColumnValue::Null => default,
        ColumnValue::Integer(i) => *i,
        ColumnValue::Text(s) => s.trim().parse().unwrap_or_else(|_| {
            tracing::trace!(value = %s, "non-numeric text read as integer, using default");
            default
        }),
    }
}

/// Read text. NULL stays `None`, integers are rendered as decimal.
pub fn to_string(raw: &ColumnValue) -> Option<String> {
    match raw {
        ColumnValue::Null => None,
        ColumnValue::Integer(i) => Some(i.to_string()),
        ColumnValue::Text(s) => Some(s.clone()),
    }
}

/// Only an exact `1` reads back as `true`.
pub fn to_bool(raw: &ColumnValue) -> bool {
    to_int64(raw, 0) == 1
}

pub fn from_bool(value: bool) -> ColumnValue {
    ColumnValue::Integer(i64::from(value))
}

/// The timestamp handed back for a stored `0` (0001-01-01T00:00:00Z).
pub fn unset_timestamp() -> DateTime<Utc> {
    Utc.timestamp_opt(UNSET_EPOCH_OFFSET, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Floor a timestamp to the whole second.
pub fn normalize_timestamp(value: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(value.timestamp(), 0)
        .single()
        .unwrap_or(value)
}

/// Whole seconds since the Unix epoch; sub-second precision is discarded.
pub fn from_timestamp(value: &DateTime<Utc>) -> ColumnValue {
    ColumnValue::Integer(value.timestamp())
}

/// A stored `0` (or NULL) means "unset", not the epoch itself.
pub fn to_timestamp(raw: &ColumnValue) -> DateTime<Utc> {
    let seconds = to_int64(raw, 0);
    if seconds == 0 {
        return unset_timestamp();
    }
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(|| {
        tracing::trace!(seconds, "stored timestamp out of range, reading as unset");
        unset_timestamp()
    })
}

/// Case-insensitive name lookup with a silent fallback.
pub fn to_enum<E: SqlEnum>(raw: &ColumnValue, default: E) -> E {
    let Some(text) = to_string(raw) else {
        return default;
    };
    let text = text.trim();
    E::VARIANTS
        .iter()
        .copied()
        .find(|v| v.name().eq_ignore_ascii_case(text))
        .unwrap_or_else(|| {
            tracing::trace!(value = %text, fallback = default.name(), "unknown enum name");
            default
        })
}

pub fn from_enum<E: SqlEnum>(value: &E) -> ColumnValue {
    ColumnValue::Text(value.name().to_string())
}

// ========== Traits ==========

/// Types with a built-in row in the conversion table.
pub trait Persist: Sized + 'static {
    const SEMANTIC: SemanticType;

    fn from_column(raw: &ColumnValue) -> Self;

    fn to_column(&self) -> ColumnValue;
}

impl Persist for i64 {
    const SEMANTIC: SemanticType = SemanticType::Int64;

    fn from_column(raw: &ColumnValue) -> Self {
        to_int64(raw, 0)
    }

    fn to_column(&self) -> ColumnValue {
        ColumnValue::Integer(*self)
    }
}

impl Persist for Option<String> {
    const SEMANTIC: SemanticType = SemanticType::String;

    fn from_column(raw: &ColumnValue) -> Self {
        to_string(raw)
    }

    fn to_column(&self) -> ColumnValue {
        self.clone().into()
    }
}

/// Plain `String` fields cannot hold NULL; it reads back as "".
impl Persist for String {
    const SEMANTIC: SemanticType = SemanticType::String;

    fn from_column(raw: &ColumnValue) -> Self {
        to_string(raw).unwrap_or_default()
    }

    fn to_column(&self) -> ColumnValue {
        ColumnValue::Text(self.clone())
    }
}

impl Persist for bool {
    const SEMANTIC: SemanticType = SemanticType::Bool;

    fn from_column(raw: &ColumnValue) -> Self {
        to_bool(raw)
    }

    fn to_column(&self) -> ColumnValue {
        from_bool(*self)
    }
}

impl Persist for DateTime<Utc> {
    const SEMANTIC: SemanticType = SemanticType::Timestamp;

    fn from_column(raw: &ColumnValue) -> Self {
        to_timestamp(raw)
    }

    fn to_column(&self) -> ColumnValue {
        from_timestamp(self)
    }
}

/// A fieldless enum stored by variant name.
///
/// `VARIANTS` lists every value in declaration order; the first one is the
/// fallback used when stored text matches no name.
pub trait SqlEnum: Copy + 'static {
    const VARIANTS: &'static [Self];

    fn name(&self) -> &'static str;
}

/// Pluggable per-field conversion.
pub trait Converter<V>: 'static {
    fn to_semantic(&self, raw: &ColumnValue) -> V;

    fn to_storage(&self, value: &V) -> ColumnValue;
}

/// Delegates to the [`Persist`] conversion table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl<V: Persist> Converter<V> for DefaultConverter {
    fn to_semantic(&self, raw: &ColumnValue) -> V {
        V::from_column(raw)
    }

    fn to_storage(&self, value: &V) -> ColumnValue {
        value.to_column()
    }
}

/// Enum conversion with a caller-chosen default variant.
#[derive(Debug, Clone, Copy)]
pub struct EnumConverter<E> {
    default: E,
}

impl<E: SqlEnum> EnumConverter<E> {
    pub fn new(default: E) -> Self {
        Self { default }
    }

    /// Falls back to the first declared variant, `None` for an empty enum.
    pub fn first_declared() -> Option<Self> {
        E::VARIANTS.first().copied().map(Self::new)
    }
}

impl<E: SqlEnum> Converter<E> for EnumConverter<E> {
    fn to_semantic(&self, raw: &ColumnValue) -> E {
        to_enum(raw, self.default)
    }

    fn to_storage(&self, value: &E) -> ColumnValue {
        from_enum(value)
    }
}

/// Wraps a pair of plain functions as a [`Converter`].
pub struct FnConverter<V> {
    read: fn(&ColumnValue) -> V,
    write: fn(&V) -> ColumnValue,
    _marker: PhantomData<fn() -> V>,
}

impl<V> FnConverter<V> {
    pub fn new(read: fn(&ColumnValue) -> V, write: fn(&V) -> ColumnValue) -> Self {
        Self {
            read,
            write,
            _marker: PhantomData,
        }
    }
}

impl<V: 'static> Converter<V> for FnConverter<V> {
    fn to_semantic(&self, raw: &ColumnValue) -> V {
        (self.read)(raw)
    }

    fn to_storage(&self, value: &V) -> ColumnValue {
        (self.write)(value)
    }
}
