//! A minimal in-memory [`Reflector`] implementation for exercising this
//! crate without a real driver or a derive-macro-backed host type, in the
//! style of `sqlx-core`'s `testing` module.
//!
//! Not meant for production use: every struct field is stored and looked up
//! by name, which a derive-macro-backed implementation would do at compile
//! time instead.

use std::any::TypeId;
use std::collections::BTreeMap;

use crate::error::BoxDynError;
use crate::reflect::{FieldMeta, HostTypeId, Kind, Reflector};
use crate::value::Value;

/// A host value as modeled by [`MockReflector`]: a struct (ordered named
/// fields), a string-keyed map, or a slice of scalar values.
#[derive(Debug, Clone)]
pub enum MockValue {
    Struct {
        type_name: &'static str,
        type_id: HostTypeId,
        fields: Vec<(&'static str, bool, Value)>,
    },
    Map {
        type_name: &'static str,
        type_id: HostTypeId,
        entries: BTreeMap<String, Value>,
    },
    Slice {
        type_name: &'static str,
        type_id: HostTypeId,
        elements: Vec<Value>,
    },
}

impl MockValue {
    pub fn struct_of(
        type_id: HostTypeId,
        type_name: &'static str,
        fields: Vec<(&'static str, bool, Value)>,
    ) -> Self {
        MockValue::Struct {
            type_name,
            type_id,
            fields,
        }
    }

    pub fn map_of(
        type_id: HostTypeId,
        type_name: &'static str,
        entries: BTreeMap<String, Value>,
    ) -> Self {
        MockValue::Map {
            type_name,
            type_id,
            entries,
        }
    }

    pub fn slice_of(type_id: HostTypeId, type_name: &'static str, elements: Vec<Value>) -> Self {
        MockValue::Slice {
            type_name,
            type_id,
            elements,
        }
    }

    /// Reads a named struct field back out, for asserting on a destination
    /// after a scan cycle.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            MockValue::Struct { fields, .. } => {
                fields.iter().find(|(n, _, _)| *n == name).map(|(_, _, v)| v)
            }
            _ => None,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Value> {
        match self {
            MockValue::Map { entries, .. } => entries.get(key),
            _ => None,
        }
    }
}

/// The [`Reflector`] that understands [`MockValue`].
pub struct MockReflector;

impl Reflector for MockReflector {
    type Value = MockValue;

    fn short_name(&self, value: &Self::Value) -> String {
        match value {
            MockValue::Struct { type_name, .. }
            | MockValue::Map { type_name, .. }
            | MockValue::Slice { type_name, .. } => type_name.to_string(),
        }
    }

    fn qualified_name(&self, value: &Self::Value) -> String {
        format!("testing::{}", self.short_name(value))
    }

    fn type_id(&self, value: &Self::Value) -> HostTypeId {
        match value {
            MockValue::Struct { type_id, .. }
            | MockValue::Map { type_id, .. }
            | MockValue::Slice { type_id, .. } => *type_id,
        }
    }

    fn kind(&self, value: &Self::Value) -> Kind {
        match value {
            MockValue::Struct { .. } => Kind::Struct,
            MockValue::Map { .. } => Kind::Map,
            MockValue::Slice { .. } => Kind::Slice,
        }
    }

    fn struct_fields(&self, value: &Self::Value) -> Result<Vec<FieldMeta>, BoxDynError> {
        match value {
            MockValue::Struct { fields, .. } => Ok(fields
                .iter()
                .enumerate()
                .map(|(i, (name, omit_empty, _))| FieldMeta {
                    field_index: i,
                    name: name.to_string(),
                    omit_empty: *omit_empty,
                })
                .collect()),
            _ => Ok(vec![]),
        }
    }

    fn map_value_type_id(&self, _value: &Self::Value) -> HostTypeId {
        TypeId::of::<String>()
    }

    fn slice_element_type_id(&self, _value: &Self::Value) -> HostTypeId {
        TypeId::of::<String>()
    }

    fn slice_len(&self, value: &Self::Value) -> usize {
        match value {
            MockValue::Slice { elements, .. } => elements.len(),
            _ => 0,
        }
    }

    fn get_struct_field(&self, value: &Self::Value, field_index: usize) -> Result<Value, BoxDynError> {
        match value {
            MockValue::Struct { fields, .. } => Ok(fields[field_index].2.clone()),
            _ => Err("not a struct".into()),
        }
    }

    fn get_map_entry(&self, value: &Self::Value, key: &str) -> Option<Value> {
        match value {
            MockValue::Map { entries, .. } => entries.get(key).cloned(),
            _ => None,
        }
    }

    fn get_slice_element(&self, value: &Self::Value, index: usize) -> Result<Value, BoxDynError> {
        match value {
            MockValue::Slice { elements, .. } => Ok(elements[index].clone()),
            _ => Err("not a slice".into()),
        }
    }

    fn set_struct_field(&self, value: &mut Self::Value, field_index: usize, new_value: Value) -> Result<(), BoxDynError> {
        match value {
            MockValue::Struct { fields, .. } => {
                let slot = &mut fields[field_index].2;
                // No field carries its own "is this field nullable" flag in
                // this mock model, so a scanned NULL always collapses to the
                // zero value of whatever variant the field already holds
                // (spec §4.6 testable property 7).
                *slot = if new_value.is_null() {
                    slot.zero_like()
                } else {
                    new_value
                };
                Ok(())
            }
            _ => Err("not a struct".into()),
        }
    }

    fn set_map_entry(&self, value: &mut Self::Value, key: &str, new_value: Value) -> Result<(), BoxDynError> {
        match value {
            MockValue::Map { entries, .. } => {
                entries.insert(key.to_string(), new_value);
                Ok(())
            }
            _ => Err("not a map".into()),
        }
    }
}
