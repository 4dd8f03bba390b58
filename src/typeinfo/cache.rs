//! Process-wide cache of [`TypeInfo`] keyed by type identity.
//!
//! TypeInfo entries are immutable once inserted and cheap to recompute if
//! two threads race to build the same one, so this is a plain read-mostly
//! `RwLock<HashMap>` rather than anything more exotic: many readers take the
//! shared lock on the common path, and only an actual cache miss upgrades to
//! the exclusive lock for insertion. A double-insert from a lost race is
//! benign because both builds are value-equal (spec §5, §9).

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::PrepareError;
use crate::reflect::{HostTypeId, Reflector};
use crate::typeinfo::TypeInfo;

static CACHE: Lazy<RwLock<HashMap<HostTypeId, TypeInfo>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the cached [`TypeInfo`] for `value`'s type, building and
/// inserting it on a cache miss.
pub fn get_or_build<R: Reflector>(
    reflector: &R,
    value: &R::Value,
) -> Result<TypeInfo, PrepareError> {
    let type_id = reflector.type_id(value);

    if let Some(info) = CACHE.read().expect("typeinfo cache poisoned").get(&type_id) {
        return Ok(info.clone());
    }

    let built = super::build(reflector, value)?;
    let mut guard = CACHE.write().expect("typeinfo cache poisoned");
    // Another thread may have inserted the same entry while we built ours;
    // keep whichever is already there (they're value-equal).
    let info = guard.entry(type_id).or_insert(built);
    Ok(info.clone())
}

/// Test-only: clears the cache so tests with mock reflectors don't leak
/// type identities across test cases that happen to reuse a `TypeId`.
#[cfg(test)]
pub(crate) fn clear() {
    CACHE.write().expect("typeinfo cache poisoned").clear();
}
