//! Schema descriptors - how a record type maps onto one table
//!
//! A record type implements [`Record`] and builds its [`TypeDescriptor`]
//! from typed [`FieldDef`] declarations. Each declaration carries a getter,
//! a setter and a converter; building the descriptor erases them into
//! closures that speak [`ColumnValue`] so the executor never needs to know
//! the concrete member types.
//!
//! Descriptors are rebuilt for every operation and never cached.

use std::fmt;
use std::rc::Rc;

use crate::convert::{
    ColumnValue, Converter, DefaultConverter, EnumConverter, Persist, SemanticType, SqlEnum,
};

/// Identity member name used when a descriptor does not override it.
pub const DEFAULT_IDENTITY: &str = "ID";

/// A record type persisted to a single table.
///
/// Result rows are materialized into `Self::default()` before each column is
/// assigned, so every unmapped member keeps its default value.
pub trait Record: Default + 'static {
    fn describe() -> TypeDescriptor<Self>;
}

/// Resolve the descriptor for `T`.
pub fn resolve<T: Record>() -> TypeDescriptor<T> {
    let descriptor = T::describe();
    tracing::trace!(
        table = descriptor.table_name(),
        fields = descriptor.fields().len(),
        identity = ?descriptor.identity().map(|f| f.member_name()),
        "resolved descriptor"
    );
    descriptor
}

/// Typed declaration of one persisted member.
pub struct FieldDef<T, V> {
    member_name: String,
    column_name: Option<String>,
    semantic_type: SemanticType,
    autogenerated: Option<bool>,
    get: fn(&T) -> V,
    set: fn(&mut T, V),
    converter: Rc<dyn Converter<V>>,
}

impl<T: 'static, V: Persist> FieldDef<T, V> {
    /// Declare a member handled by the default conversion table.
    pub fn new(member_name: impl Into<String>, get: fn(&T) -> V, set: fn(&mut T, V)) -> Self {
        Self {
            member_name: member_name.into(),
            column_name: None,
            semantic_type: V::SEMANTIC,
            autogenerated: None,
            get,
            set,
            converter: Rc::new(DefaultConverter),
        }
    }
}

impl<T: 'static, E: SqlEnum> FieldDef<T, E> {
    /// Declare an enum member. Unknown stored names read back as the first
    /// declared variant unless [`FieldDef::fallback`] picks another.
    ///
    /// # Panics
    ///
    /// Panics if `E::VARIANTS` is empty.
    pub fn enumeration(member_name: impl Into<String>, get: fn(&T) -> E, set: fn(&mut T, E)) -> Self {
        let converter = EnumConverter::<E>::first_declared()
            .expect("SqlEnum::VARIANTS must list at least one variant");
        Self {
            member_name: member_name.into(),
            column_name: None,
            semantic_type: SemanticType::Enum,
            autogenerated: None,
            get,
            set,
            converter: Rc::new(converter),
        }
    }

    /// Variant used when the stored text matches no name.
    pub fn fallback(mut self, default: E) -> Self {
        self.converter = Rc::new(EnumConverter::new(default));
        self
    }
}

impl<T: 'static, V: 'static> FieldDef<T, V> {
    /// Declare a member with an explicit converter.
    pub fn custom(
        member_name: impl Into<String>,
        semantic_type: SemanticType,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
        converter: impl Converter<V>,
    ) -> Self {
        Self {
            member_name: member_name.into(),
            column_name: None,
            semantic_type,
            autogenerated: None,
            get,
            set,
            converter: Rc::new(converter),
        }
    }

    /// Store the member under a different column name.
    pub fn column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    /// Override the autogeneration default.
    pub fn autogenerated(mut self, autogenerated: bool) -> Self {
        self.autogenerated = Some(autogenerated);
        self
    }

    /// Replace the converter for this member.
    pub fn converter(mut self, converter: impl Converter<V>) -> Self {
        self.converter = Rc::new(converter);
        self
    }
}

/// One persisted member with its accessors bound.
pub struct FieldDescriptor<T> {
    member_name: String,
    column_name: String,
    semantic_type: SemanticType,
    is_identity: bool,
    autogenerated: bool,
    autogenerated_override: Option<bool>,
    read: Box<dyn Fn(&T) -> ColumnValue>,
    write: Box<dyn Fn(&mut T, &ColumnValue)>,
}

impl<T: 'static, V: 'static> From<FieldDef<T, V>> for FieldDescriptor<T> {
    fn from(def: FieldDef<T, V>) -> Self {
        let FieldDef {
            member_name,
            column_name,
            semantic_type,
            autogenerated,
            get,
            set,
            converter,
        } = def;

        let column_name = column_name
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| member_name.clone());
        let reader = Rc::clone(&converter);

        Self {
            member_name,
            column_name,
            semantic_type,
            is_identity: false,
            autogenerated: false,
            autogenerated_override: autogenerated,
            read: Box::new(move |record: &T| reader.to_storage(&get(record))),
            write: Box::new(move |record: &mut T, raw: &ColumnValue| {
                set(record, converter.to_semantic(raw))
            }),
        }
    }
}

impl<T> FieldDescriptor<T> {
    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    /// Autogenerated members are left out of INSERT and UPDATE column lists.
    pub fn is_autogenerated(&self) -> bool {
        self.autogenerated
    }

    /// Read the member and convert it to its storage form.
    pub fn read(&self, record: &T) -> ColumnValue {
        (self.read)(record)
    }

    /// Convert a storage value and assign it to the member.
    pub fn write(&self, record: &mut T, raw: &ColumnValue) {
        (self.write)(record, raw)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("member_name", &self.member_name)
            .field("column_name", &self.column_name)
            .field("semantic_type", &self.semantic_type)
            .field("is_identity", &self.is_identity)
            .field("autogenerated", &self.autogenerated)
            .finish()
    }
}

/// Table name, ordered fields and the identity field of a record type.
#[derive(Debug)]
pub struct TypeDescriptor<T> {
    table_name: String,
    fields: Vec<FieldDescriptor<T>>,
    identity: Option<usize>,
}

impl<T: 'static> TypeDescriptor<T> {
    pub fn builder() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new()
    }
}

impl<T> TypeDescriptor<T> {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn identity(&self) -> Option<&FieldDescriptor<T>> {
        self.identity.map(|i| &self.fields[i])
    }

    /// Fields written by INSERT and UPDATE.
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDescriptor<T>> {
        self.fields.iter().filter(|f| !f.is_autogenerated())
    }

    pub fn is_autogenerated_identity(&self) -> bool {
        self.identity().is_some_and(|f| f.is_autogenerated())
    }

    /// The record's identity in storage form.
    pub fn identity_value(&self, record: &T) -> Option<ColumnValue> {
        self.identity().map(|f| f.read(record))
    }

    pub fn field(&self, member_name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.member_name == member_name)
    }
}

/// Builds a [`TypeDescriptor`], resolving identity and autogeneration.
pub struct TypeDescriptorBuilder<T> {
    table_name: Option<String>,
    identity_name: Option<String>,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> TypeDescriptorBuilder<T> {
    pub fn new() -> Self {
        Self {
            table_name: None,
            identity_name: None,
            fields: Vec::new(),
        }
    }

    /// Table name override; defaults to the type's own name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Identity member override; defaults to [`DEFAULT_IDENTITY`].
    pub fn identity(mut self, member_name: impl Into<String>) -> Self {
        self.identity_name = Some(member_name.into());
        self
    }

    pub fn field(mut self, field: impl Into<FieldDescriptor<T>>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn build(self) -> TypeDescriptor<T> {
        let table_name = self
            .table_name
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(short_type_name::<T>);
        let identity_name = self
            .identity_name
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string());

        let mut fields = self.fields;
        let identity = fields.iter().position(|f| f.member_name == identity_name);

        for (i, field) in fields.iter_mut().enumerate() {
            field.is_identity = identity == Some(i);
            field.autogenerated = match field.autogenerated_override {
                Some(explicit) => explicit,
                None => field.is_identity && field.semantic_type == SemanticType::Int64,
            };
        }

        TypeDescriptor {
            table_name,
            fields,
            identity,
        }
    }
}

impl<T: 'static> Default for TypeDescriptorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// `my_crate::model::Entry<X>` -> `Entry`
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
