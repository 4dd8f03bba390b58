//! The reflection capability the core depends on (spec §9).
//!
//! The core never reflects over host types directly — it asks a
//! `Reflector` for the shape of a value once, caches the answer in
//! [`crate::typeinfo`], and afterwards only talks to [`crate::locator`]
//! handles. This keeps the pipeline unit-testable with a mock reflector and
//! portable to whatever the host language's actual reflection facility
//! looks like.

use std::any::TypeId;
use std::fmt;

use crate::error::BoxDynError;
use crate::value::Value;

/// Stable identity for a host type. Two values share a `TypeId` iff they were
/// produced by the same concrete Rust type.
pub type HostTypeId = TypeId;

/// The coarse shape of a host value, as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Struct,
    Map,
    Slice,
    Other,
}

/// One `db`-tagged field of a struct type, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub field_index: usize,
    pub name: String,
    pub omit_empty: bool,
}

/// Describes the fields, or map/slice element type, of a host type without
/// requiring a live value — used once per argument to build a
/// [`crate::typeinfo::TypeInfo`], then cached.
pub trait Reflector: Send + Sync {
    /// The handle this reflector resolves host types and values through.
    type Value: ReflectedValue;

    /// Short type name used as the key in `$TypeName.member` expressions,
    /// e.g. `"Person"` for `myapp::models::Person`.
    fn short_name(&self, value: &Self::Value) -> String;

    /// Fully qualified name, used in error messages to disambiguate a
    /// short-name clash (e.g. `"myapp::models::Person"`).
    fn qualified_name(&self, value: &Self::Value) -> String;

    fn type_id(&self, value: &Self::Value) -> HostTypeId;

    fn kind(&self, value: &Self::Value) -> Kind;

    /// Declared, exported, `db`-tagged fields of a struct, in declaration
    /// order. Empty for non-struct kinds.
    fn struct_fields(&self, value: &Self::Value) -> Result<Vec<FieldMeta>, BoxDynError>;

    /// The map's value type identity (keys are required to be `string`).
    /// Only meaningful when `kind` is `Map`.
    fn map_value_type_id(&self, value: &Self::Value) -> HostTypeId;

    /// The slice's element type identity. Only meaningful when `kind` is
    /// `Slice`.
    fn slice_element_type_id(&self, value: &Self::Value) -> HostTypeId;

    fn slice_len(&self, value: &Self::Value) -> usize;

    /// Load a struct field, a map entry, or a slice element as a runtime
    /// [`Value`].
    fn get_struct_field(&self, value: &Self::Value, field_index: usize) -> Result<Value, BoxDynError>;
    fn get_map_entry(&self, value: &Self::Value, key: &str) -> Option<Value>;
    fn get_slice_element(&self, value: &Self::Value, index: usize) -> Result<Value, BoxDynError>;

    /// Write a struct field or a map entry from a scanned [`Value`]. Used by
    /// [`crate::locator::ScanProxy`].
    ///
    /// A scanned column that was NULL arrives here as `Value::Null`. Per spec
    /// §4.6's NULL-safety rule (testable property 7), a field whose host
    /// type cannot itself represent NULL (not an `Option<T>`/pointer) must
    /// end up holding its zero value, not `Value::Null` — a real,
    /// derive-macro-backed implementation knows the field's concrete type
    /// and can special-case this; a field that *can* represent NULL (an
    /// `Option<T>`) stores `None` and may pass `Value::Null` straight
    /// through. [`Value::zero_like`] gives a variant-preserving zero for
    /// implementations, such as [`crate::testing::MockReflector`], that
    /// track a field's type only through the `Value` already stored there.
    fn set_struct_field(&self, value: &mut Self::Value, field_index: usize, new_value: Value) -> Result<(), BoxDynError>;

    /// Write a map entry from a scanned [`Value`]. Map values are untyped
    /// from the core's perspective, so no NULL-to-zero substitution applies
    /// here: a NULL column scanned into a map key is stored as `Value::Null`
    /// verbatim.
    fn set_map_entry(&self, value: &mut Self::Value, key: &str, new_value: Value) -> Result<(), BoxDynError>;
}

/// A host value handle a [`Reflector`] knows how to introspect. Left opaque
/// on purpose: the core never pattern-matches on it directly.
pub trait ReflectedValue: fmt::Debug {}

impl<T: fmt::Debug> ReflectedValue for T {}
