//! Scan-binder: resolves scan pointers for a returned row against the
//! driver's reported column names and the caller's destinations, and
//! produces a commit hook that writes map entries and NULL-safe struct
//! fields on success (spec §4.6).

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result, ScanError};
use crate::locator::{Locator, ScanProxy, ScanSlot, TypeToValue};
use crate::reflect::{HostTypeId, Kind, Reflector};

/// What the driver should scan one reported column into: a staging slot
/// feeding a locator, or a disposable sink for columns the query didn't ask
/// for (spec §4.6 step 2, "supports extra/unaliased columns").
pub enum ScanTarget {
    Slot(ScanSlot),
    Sink,
}

/// Deferred commit of every resolved [`ScanProxy`], run once a row has been
/// successfully scanned into its slots.
pub struct OnSuccess<R: Reflector> {
    proxies: Vec<ScanProxy<R>>,
}

impl<R: Reflector> OnSuccess<R> {
    pub fn commit(self, reflector: &R, destinations: &mut TypeToValue<'_, R::Value>) -> Result<()> {
        for proxy in self.proxies {
            proxy.commit(reflector, destinations).map_err(Error::from)?;
        }
        Ok(())
    }
}

/// Validated, per-scan directory of destination values keyed by type
/// identity (spec §4.6 `ValidateOutputs`), built fresh for every row cycle
/// since destinations are only borrowed for its duration.
pub struct ScanContext<'v, R: Reflector> {
    type_to_value: TypeToValue<'v, R::Value>,
    id_to_name: HashMap<HostTypeId, String>,
}

impl<'v, R: Reflector> ScanContext<'v, R> {
    /// `ValidateOutputs`: each destination must be a struct or a map value;
    /// duplicates by type are rejected. Pointer-nilness has no analogue for
    /// an owned `R::Value` handle, so that check is left to the reflector
    /// (documented in DESIGN.md).
    pub fn build(
        reflector: &R,
        destinations: &'v mut [R::Value],
    ) -> std::result::Result<Self, ScanError> {
        let mut type_to_value = TypeToValue::new();
        let mut id_to_name = HashMap::new();

        for value in destinations.iter_mut() {
            match reflector.kind(value) {
                Kind::Struct | Kind::Map => {}
                Kind::Slice | Kind::Other => {
                    return Err(ScanError::NotScannable {
                        type_name: reflector.short_name(value),
                    })
                }
            }
            let type_id = reflector.type_id(value);
            let short_name = reflector.short_name(value);
            if id_to_name.contains_key(&type_id) {
                return Err(ScanError::DuplicateTypeInstance {
                    type_name: short_name,
                });
            }
            id_to_name.insert(type_id, short_name);
            type_to_value.insert(type_id, value);
        }

        Ok(ScanContext {
            type_to_value,
            id_to_name,
        })
    }

    pub fn type_to_value(&mut self) -> &mut TypeToValue<'v, R::Value> {
        &mut self.type_to_value
    }
}

fn decode_sqlair_index(name: &str) -> Option<usize> {
    name.strip_prefix("_sqlair_").and_then(|rest| rest.parse().ok())
}

fn locator_member_name(locator: &Locator) -> String {
    match locator {
        Locator::StructField { field, .. } => field.field_name.clone(),
        Locator::MapKey { key, .. } => key.clone(),
        Locator::SliceAll { .. } => "*".to_string(),
    }
}

/// Resolves one scan target per driver-reported column name, checks that
/// every query output was actually returned by the driver, and checks that
/// every destination argument is referenced by some output (spec §4.6
/// steps 2-4).
pub fn bind_scan<R: Reflector + 'static>(
    outputs: &[Locator],
    columns: &[String],
    ctx: &ScanContext<'_, R>,
) -> Result<(Vec<ScanTarget>, OnSuccess<R>)> {
    let mut targets = Vec::with_capacity(columns.len());
    let mut proxies = Vec::new();
    let mut covered = vec![false; outputs.len()];
    let mut used_types: HashSet<HostTypeId> = HashSet::new();

    for name in columns {
        match decode_sqlair_index(name) {
            Some(index) => {
                let locator = outputs
                    .get(index)
                    .ok_or(ScanError::ColumnIndexInconsistent { index })?;
                if !ctx.type_to_value.contains(locator.type_id()) {
                    return Err(Error::from(ScanError::TypeNotInQuery {
                        type_name: locator.type_name().to_string(),
                    }));
                }
                covered[index] = true;
                used_types.insert(locator.type_id());
                let (slot, proxy) = locator.locate_scan_target::<R>().map_err(Error::from)?;
                targets.push(ScanTarget::Slot(slot));
                proxies.push(proxy);
            }
            None => targets.push(ScanTarget::Sink),
        }
    }

    for (index, locator) in outputs.iter().enumerate() {
        if !covered[index] {
            return Err(Error::from(ScanError::OutsideResultContext {
                type_name: locator.type_name().to_string(),
                member: locator_member_name(locator),
            }));
        }
    }

    for (type_id, name) in &ctx.id_to_name {
        if !used_types.contains(type_id) {
            return Err(Error::from(ScanError::UnusedType {
                type_name: name.clone(),
            }));
        }
    }

    Ok((targets, OnSuccess { proxies }))
}
