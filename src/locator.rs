//! Runtime value handles abstracting over struct fields, map keys, and
//! slice elements (spec §3 "Locators (runtime value interfaces)", §9
//! "Locator role is dual ... expressed as two traits with variant
//! implementations").

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::BindError;
use crate::reflect::{HostTypeId, Reflector};
use crate::typeinfo::FieldMeta;
use crate::value::Value;

/// Maps a type identity to the caller-provided value that plays that role
/// for one bind/scan cycle (spec §4.5 `ValidateInputs` / §4.6
/// `ValidateOutputs`). Borrowed for the duration of a single cycle only.
pub struct TypeToValue<'v, V> {
    values: HashMap<HostTypeId, &'v mut V>,
}

impl<'v, V> TypeToValue<'v, V> {
    pub fn new() -> Self {
        TypeToValue {
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, type_id: HostTypeId, value: &'v mut V) -> Option<&'v mut V> {
        self.values.insert(type_id, value)
    }

    pub fn contains(&self, type_id: HostTypeId) -> bool {
        self.values.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, type_id: HostTypeId) -> Option<&V> {
        self.values.get(&type_id).map(|v| &**v)
    }

    pub fn get_mut(&mut self, type_id: HostTypeId) -> Option<&mut V> {
        self.values.get_mut(&type_id).map(|v| &mut **v)
    }
}

impl<'v, V> Default for TypeToValue<'v, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of resolving an input locator: spec §3's
/// `Params { values: [Any], omit, bulk, arg_type_used }`.
#[derive(Debug, Clone)]
pub struct Params {
    pub values: SmallVec<[Value; 1]>,
    pub omit: bool,
    pub bulk: bool,
    pub arg_type_used: HostTypeId,
}

/// A pluggable runtime handle: one of a struct field, a map key, or a
/// slice's elements. Constructed by [`crate::arginfo::ArgInfo`] at
/// type-bind time; resolved against a [`TypeToValue`] at input/scan-bind
/// time.
#[derive(Debug, Clone)]
pub enum Locator {
    StructField {
        type_id: HostTypeId,
        type_name: String,
        field: FieldMeta,
    },
    MapKey {
        type_id: HostTypeId,
        type_name: String,
        key: String,
    },
    SliceAll {
        type_id: HostTypeId,
        type_name: String,
    },
}

impl Locator {
    pub fn type_id(&self) -> HostTypeId {
        match self {
            Locator::StructField { type_id, .. }
            | Locator::MapKey { type_id, .. }
            | Locator::SliceAll { type_id, .. } => *type_id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Locator::StructField { type_name, .. }
            | Locator::MapKey { type_name, .. }
            | Locator::SliceAll { type_name, .. } => type_name,
        }
    }

    /// Input capability: resolve to the runtime value(s) to bind (spec
    /// §3/§4.5).
    pub fn locate_input<R: Reflector>(
        &self,
        reflector: &R,
        values: &TypeToValue<'_, R::Value>,
    ) -> Result<Params, BindError> {
        match self {
            Locator::StructField {
                type_id,
                type_name,
                field,
            } => {
                let value = values.get(*type_id).ok_or_else(|| BindError::NotBindable {
                    type_name: type_name.clone(),
                })?;
                let v = reflector
                    .get_struct_field(value, field.field_index)
                    .map_err(BindError::Reflector)?;
                let omit = field.omit_empty && v.is_zero();
                Ok(Params {
                    values: smallvec::smallvec![v],
                    omit,
                    bulk: false,
                    arg_type_used: *type_id,
                })
            }
            Locator::MapKey {
                type_id,
                type_name,
                key,
            } => {
                let value = values.get(*type_id).ok_or_else(|| BindError::NotBindable {
                    type_name: type_name.clone(),
                })?;
                let v = reflector
                    .get_map_entry(value, key)
                    .ok_or_else(|| BindError::MissingMapKey {
                        type_name: type_name.clone(),
                        key: key.clone(),
                    })?;
                Ok(Params {
                    values: smallvec::smallvec![v],
                    omit: false,
                    bulk: false,
                    arg_type_used: *type_id,
                })
            }
            Locator::SliceAll { type_id, type_name } => {
                let value = values.get(*type_id).ok_or_else(|| BindError::NotBindable {
                    type_name: type_name.clone(),
                })?;
                let len = reflector.slice_len(value);
                let mut out = SmallVec::with_capacity(len);
                for i in 0..len {
                    out.push(
                        reflector
                            .get_slice_element(value, i)
                            .map_err(BindError::Reflector)?,
                    );
                }
                Ok(Params {
                    values: out,
                    omit: false,
                    bulk: true,
                    arg_type_used: *type_id,
                })
            }
        }
    }

    /// Output capability: returns a staging slot the driver scans into, and
    /// a commit closure that transfers the staged value into the caller's
    /// destination on successful decode (spec §4.6 `ScanProxy`).
    pub fn locate_scan_target<R: Reflector + 'static>(
        &self,
    ) -> Result<(ScanSlot, ScanProxy<R>), BindError> {
        let slot = ScanSlot::new();
        let proxy = match self.clone() {
            Locator::StructField { type_id, field, .. } => {
                let slot = slot.clone();
                ScanProxy::new(move |reflector: &R, values: &mut TypeToValue<'_, R::Value>| {
                    let staged = slot.take();
                    let dest = values
                        .get_mut(type_id)
                        .expect("destination for scan target missing at commit time");
                    reflector
                        .set_struct_field(dest, field.field_index, staged)
                        .map_err(BindError::Reflector)
                })
            }
            Locator::MapKey { type_id, key, .. } => {
                let slot = slot.clone();
                ScanProxy::new(move |reflector: &R, values: &mut TypeToValue<'_, R::Value>| {
                    let staged = slot.take();
                    let dest = values
                        .get_mut(type_id)
                        .expect("destination for scan target missing at commit time");
                    reflector
                        .set_map_entry(dest, &key, staged)
                        .map_err(BindError::Reflector)
                })
            }
            Locator::SliceAll { type_name, .. } => {
                return Err(BindError::NotBindable { type_name });
            }
        };
        Ok((slot, proxy))
    }
}

/// A single cell the driver writes a scanned column value into.
#[derive(Clone)]
pub struct ScanSlot(Rc<RefCell<Value>>);

impl ScanSlot {
    fn new() -> Self {
        ScanSlot(Rc::new(RefCell::new(Value::Null)))
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    fn take(&self) -> Value {
        std::mem::replace(&mut *self.0.borrow_mut(), Value::Null)
    }
}

/// Deferred write bound to a [`ScanSlot`], invoked on successful row decode
/// to transfer the staged value into the caller's destination (spec
/// glossary "ScanProxy").
pub struct ScanProxy<R: Reflector> {
    commit: Box<dyn for<'v> FnOnce(&R, &mut TypeToValue<'v, R::Value>) -> Result<(), BindError>>,
}

impl<R: Reflector> ScanProxy<R> {
    fn new(
        f: impl for<'v> FnOnce(&R, &mut TypeToValue<'v, R::Value>) -> Result<(), BindError> + 'static,
    ) -> Self {
        ScanProxy { commit: Box::new(f) }
    }

    pub fn commit(
        self,
        reflector: &R,
        values: &mut TypeToValue<'_, R::Value>,
    ) -> Result<(), BindError> {
        (self.commit)(reflector, values)
    }
}

