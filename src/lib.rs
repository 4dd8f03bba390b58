#![forbid(unsafe_code)]
//! A SQL query preprocessor: parses typed `$Type.member` (input) and
//! `&Type.member` (output) placeholders out of otherwise-plain SQL, resolves
//! them against the caller's argument values through a pluggable
//! [`reflect::Reflector`], and hands a driver a final, placeholder-free query
//! plus the locators needed to scan a returned row back into the caller's
//! destinations.
//!
//! The crate is organized as a pipeline, leaves first: [`lexer`] and
//! [`parser`] turn query text into an expression list; [`typeinfo`] and
//! [`arginfo`] describe the caller's argument types; [`typebind`] resolves
//! the expression list against those types; [`inputbind`] and [`scanbind`]
//! resolve the type-bound list against live values for one prepare/bind/scan
//! cycle. [`driver`] is the narrow boundary a host driver adapter sits
//! behind; it is not a database client.

pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod reflect;
pub mod value;

pub mod locator;
pub mod typeinfo;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

mod arginfo;
mod driver;
mod inputbind;
mod logging;
mod scanbind;
mod typebind;

pub use arginfo::ArgInfo;
pub use config::{Config, UnusedArgPolicy};
pub use driver::{scan_all, scan_row, DriverRow};
pub use error::{Error, Result};
pub use inputbind::{bind_query, bind_query_with_config, NamedArg, PrimedQuery};
pub use scanbind::{bind_scan, OnSuccess, ScanContext, ScanTarget};
pub use typebind::{bind as bind_types, TypedExpr};

/// Parses, type-binds, and input-binds a query against one set of argument
/// values in a single call — the common case where a query is prepared and
/// bound exactly once (spec §4, end to end). Callers preparing the same
/// query text repeatedly should instead call [`parser::parse`] and
/// [`ArgInfo::build`]/[`bind_types`] once and reuse the typed expression list
/// across binds, matching the prepare/bind split the rest of this crate
/// exposes.
pub fn prepare_and_bind<R: reflect::Reflector>(
    reflector: &R,
    query: &str,
    values: &mut [R::Value],
) -> Result<PrimedQuery> {
    let exprs = parser::parse(query).map_err(Error::from)?;
    let arg_info = ArgInfo::build(reflector, values)?;
    let typed = bind_types(exprs, &arg_info)?;
    bind_query(reflector, &typed, values)
}
