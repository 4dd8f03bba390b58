//! Describes a user-provided type as a struct, a string-keyed map, or a
//! slice (spec §3 "TypeInfo variants"). Built once per type identity via a
//! [`crate::reflect::Reflector`] and cached by [`cache`].

pub mod cache;

use indexmap::IndexMap;

use crate::error::PrepareError;
use crate::reflect::{FieldMeta as ReflectedField, HostTypeId, Kind, Reflector};

/// One `db`-tagged struct field, keyed by tag in [`TypeInfo::Struct::fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub field_index: usize,
    pub field_name: String,
    pub omit_empty: bool,
}

/// A type's shape, as needed by the type-binder and the input/scan binders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    Struct {
        type_id: HostTypeId,
        short_name: String,
        qualified_name: String,
        /// Tags in declaration order — the order asterisk expansion uses.
        ordered_tags: Vec<String>,
        /// Tag -> field metadata.
        fields: IndexMap<String, FieldMeta>,
    },
    Map {
        type_id: HostTypeId,
        short_name: String,
        qualified_name: String,
    },
    Slice {
        type_id: HostTypeId,
        short_name: String,
        qualified_name: String,
    },
}

impl TypeInfo {
    pub fn type_id(&self) -> HostTypeId {
        match self {
            TypeInfo::Struct { type_id, .. }
            | TypeInfo::Map { type_id, .. }
            | TypeInfo::Slice { type_id, .. } => *type_id,
        }
    }

    pub fn short_name(&self) -> &str {
        match self {
            TypeInfo::Struct { short_name, .. }
            | TypeInfo::Map { short_name, .. }
            | TypeInfo::Slice { short_name, .. } => short_name,
        }
    }

    pub fn qualified_name(&self) -> &str {
        match self {
            TypeInfo::Struct { qualified_name, .. }
            | TypeInfo::Map { qualified_name, .. }
            | TypeInfo::Slice { qualified_name, .. } => qualified_name,
        }
    }

    pub fn field(&self, tag: &str) -> Option<&FieldMeta> {
        match self {
            TypeInfo::Struct { fields, .. } => fields.get(tag),
            _ => None,
        }
    }
}

const TAG_RULE: &str = "^[A-Za-z_][A-Za-z0-9_]*$";

fn is_valid_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builds a [`TypeInfo`] for a single argument value by asking the
/// reflector for its kind and (if a struct) its tagged fields. This is the
/// expensive path; callers should go through [`cache::get_or_build`] so it
/// only runs once per type identity per process.
pub fn build<R: Reflector>(reflector: &R, value: &R::Value) -> Result<TypeInfo, PrepareError> {
    let type_id = reflector.type_id(value);
    let short_name = reflector.short_name(value);
    let qualified_name = reflector.qualified_name(value);

    match reflector.kind(value) {
        Kind::Struct => {
            let raw_fields = reflector.struct_fields(value).map_err(|e| {
                tracing::warn!(type_name = %short_name, error = %e, "reflector failed to enumerate struct fields");
                PrepareError::UnsupportedKind {
                    type_name: short_name.clone(),
                }
            })?;
            let mut ordered_tags = Vec::with_capacity(raw_fields.len());
            let mut fields = IndexMap::with_capacity(raw_fields.len());
            for ReflectedField {
                field_index,
                name,
                omit_empty,
            } in raw_fields
            {
                if name == "*" || !is_valid_tag_name(&name) {
                    return Err(PrepareError::UnsupportedKind {
                        type_name: format!("{short_name} (invalid db tag {name:?}, must match {TAG_RULE})"),
                    });
                }
                ordered_tags.push(name.clone());
                fields.insert(
                    name.clone(),
                    FieldMeta {
                        field_index,
                        field_name: name,
                        omit_empty,
                    },
                );
            }
            Ok(TypeInfo::Struct {
                type_id,
                short_name,
                qualified_name,
                ordered_tags,
                fields,
            })
        }
        Kind::Map => Ok(TypeInfo::Map {
            type_id,
            short_name,
            qualified_name,
        }),
        Kind::Slice => Ok(TypeInfo::Slice {
            type_id,
            short_name,
            qualified_name,
        }),
        Kind::Other => Err(PrepareError::UnsupportedKind {
            type_name: short_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_validation_matches_spec_pattern() {
        assert!(is_valid_tag_name("id"));
        assert!(is_valid_tag_name("_private"));
        assert!(is_valid_tag_name("col_2"));
        assert!(!is_valid_tag_name("2col"));
        assert!(!is_valid_tag_name("has-dash"));
        assert!(!is_valid_tag_name(""));
    }
}
