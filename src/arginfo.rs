//! Per-prepare directory mapping type-name strings to [`TypeInfo`], with
//! lookup-by-member/key/slice operations returning [`Locator`]s (spec §4.3).

use std::collections::HashMap;

use crate::error::PrepareError;
use crate::locator::Locator;
use crate::reflect::{HostTypeId, Kind, Reflector};
use crate::typeinfo::{self, TypeInfo};

struct ArgEntry {
    info: TypeInfo,
    qualified_name: String,
}

/// Built once per prepared query from the argument values the caller passed
/// at prepare time (spec §4.3 `ArgInfo.build`).
pub struct ArgInfo {
    by_name: HashMap<String, ArgEntry>,
}

impl ArgInfo {
    /// Builds the directory from prepare-time argument values. Fails if two
    /// arguments share a short type name, if the same type is passed twice,
    /// or if a value is not a struct/map/slice.
    pub fn build<R: Reflector>(
        reflector: &R,
        args: &[R::Value],
    ) -> Result<ArgInfo, PrepareError> {
        let mut by_name: HashMap<String, ArgEntry> = HashMap::new();
        let mut seen_ids: HashMap<HostTypeId, String> = HashMap::new();

        for value in args {
            match reflector.kind(value) {
                Kind::Struct | Kind::Map | Kind::Slice => {}
                Kind::Other => {
                    return Err(PrepareError::UnsupportedKind {
                        type_name: reflector.short_name(value),
                    })
                }
            }

            let type_id = reflector.type_id(value);
            let short_name = reflector.short_name(value);
            let qualified_name = reflector.qualified_name(value);

            if let Some(existing_name) = seen_ids.get(&type_id) {
                return Err(PrepareError::DuplicateTypeInstance {
                    type_name: existing_name.clone(),
                });
            }

            if let Some(existing) = by_name.get(&short_name) {
                return Err(PrepareError::DuplicateTypeName {
                    type_name: short_name,
                    first: existing.qualified_name.clone(),
                    second: qualified_name,
                });
            }

            let info = typeinfo::cache::get_or_build(reflector, value)?;
            seen_ids.insert(type_id, short_name.clone());
            by_name.insert(
                short_name,
                ArgEntry {
                    info,
                    qualified_name,
                },
            );
        }

        Ok(ArgInfo { by_name })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|s| s.as_str())
    }

    pub fn kind(&self, type_name: &str) -> Option<&TypeInfo> {
        self.by_name.get(type_name).map(|e| &e.info)
    }

    fn require(&self, type_name: &str) -> Result<&TypeInfo, PrepareError> {
        self.by_name
            .get(type_name)
            .map(|e| &e.info)
            .ok_or_else(|| PrepareError::TypeMissing {
                type_name: type_name.to_string(),
                have_names: self.type_names().map(str::to_string).collect(),
            })
    }

    /// Resolves `$Type.member` / `&Type.member` to an input-and/or-output
    /// capable locator.
    pub fn get_member(&self, type_name: &str, member: &str) -> Result<Locator, PrepareError> {
        let info = self.require(type_name)?;
        match info {
            TypeInfo::Struct { type_id, fields, .. } => {
                let field = fields
                    .get(member)
                    .ok_or_else(|| PrepareError::TagNotFound {
                        type_name: type_name.to_string(),
                        tag: member.to_string(),
                    })?;
                Ok(Locator::StructField {
                    type_id: *type_id,
                    type_name: type_name.to_string(),
                    field: field.clone(),
                })
            }
            TypeInfo::Map { type_id, .. } => Ok(Locator::MapKey {
                type_id: *type_id,
                type_name: type_name.to_string(),
                key: member.to_string(),
            }),
            TypeInfo::Slice { .. } => Err(PrepareError::UnsupportedKind {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Resolves `$Type.*` / `&Type.*`: every tagged member of a struct, in
    /// declaration order, alongside the tag names used as default column
    /// names. Maps are rejected for `&Type.*` by the caller (spec §4.4).
    pub fn get_all_struct_members(
        &self,
        type_name: &str,
    ) -> Result<(Vec<Locator>, Vec<String>), PrepareError> {
        let info = self.require(type_name)?;
        match info {
            TypeInfo::Struct {
                type_id,
                ordered_tags,
                fields,
                ..
            } => {
                let mut locators = Vec::with_capacity(ordered_tags.len());
                for tag in ordered_tags {
                    let field = &fields[tag];
                    locators.push(Locator::StructField {
                        type_id: *type_id,
                        type_name: type_name.to_string(),
                        field: field.clone(),
                    });
                }
                Ok((locators, ordered_tags.clone()))
            }
            TypeInfo::Map { .. } => Err(PrepareError::MapNeedsColumns {
                type_name: type_name.to_string(),
            }),
            TypeInfo::Slice { .. } => Err(PrepareError::UnsupportedKind {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Resolves `$Type[:]`.
    pub fn get_slice(&self, type_name: &str) -> Result<Locator, PrepareError> {
        let info = self.require(type_name)?;
        match info {
            TypeInfo::Slice { type_id, .. } => Ok(Locator::SliceAll {
                type_id: *type_id,
                type_name: type_name.to_string(),
            }),
            _ => Err(PrepareError::UnsupportedKind {
                type_name: type_name.to_string(),
            }),
        }
    }
}
