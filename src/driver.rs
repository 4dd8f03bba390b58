//! The minimal surface a plain SQL driver needs to implement to consume a
//! [`crate::inputbind::PrimedQuery`] and feed rows back through the
//! scan-binder (spec §3 "Primed query" / §4.6, glossary "Driver").
//!
//! This module does not talk to any actual database; it defines the
//! boundary the façade crate's driver adapter sits behind, and provides the
//! `scan_row` helper that ties one driver-reported row to the scan-binder.

use crate::error::Result;
use crate::locator::{Locator, TypeToValue};
use crate::logging::BindLogger;
use crate::reflect::Reflector;
use crate::scanbind::{self, OnSuccess, ScanContext, ScanTarget};
use crate::value::Value;

/// One row reported back by the driver: the column names the underlying
/// query actually returned (which may include extras the query didn't ask
/// for, or omit a requested alias if the driver deduplicates names) and a
/// way to read a column's raw value by position.
pub trait DriverRow {
    fn column_names(&self) -> &[String];
    fn get_raw(&self, index: usize) -> Value;
}

/// Scans one driver row into the caller's destinations. Returns the number
/// of columns routed to a [`ScanTarget::Slot`] (as opposed to a sink), for
/// callers that want to track rows processed.
///
/// `ctx` must be built fresh per row from the same destination slice, since
/// [`TypeToValue`] borrows are scoped to a single cycle (spec §4.6).
pub fn scan_row<R, Row>(
    outputs: &[Locator],
    row: &Row,
    ctx: &ScanContext<'_, R>,
    reflector: &R,
    destinations: &mut TypeToValue<'_, R::Value>,
) -> Result<usize>
where
    R: Reflector + 'static,
    Row: DriverRow,
{
    let (targets, on_success) = scanbind::bind_scan(outputs, row.column_names(), ctx)?;
    let mut slots_filled = 0;
    for (index, target) in targets.iter().enumerate() {
        if let ScanTarget::Slot(slot) = target {
            slot.set(row.get_raw(index));
            slots_filled += 1;
        }
    }
    commit(on_success, reflector, destinations)?;
    Ok(slots_filled)
}

fn commit<R: Reflector>(
    on_success: OnSuccess<R>,
    reflector: &R,
    destinations: &mut TypeToValue<'_, R::Value>,
) -> Result<()> {
    on_success.commit(reflector, destinations)
}

/// Runs `scan_row` for every row in `rows`, logging one summary event for
/// the whole cycle (spec §2 "Logging"), the way `QueryLogger` covers a
/// single query execution rather than each row individually.
pub fn scan_all<R, Row>(
    sql: &str,
    outputs: &[Locator],
    rows: &[Row],
    ctx: &ScanContext<'_, R>,
    reflector: &R,
    destinations: &mut TypeToValue<'_, R::Value>,
) -> Result<u64>
where
    R: Reflector + 'static,
    Row: DriverRow,
{
    let mut logger = BindLogger::new(sql);
    for row in rows {
        match scan_row(outputs, row, ctx, reflector, destinations) {
            Ok(_) => logger.record_row_scanned(),
            Err(err) => {
                logger.fail();
                return Err(err);
            }
        }
    }
    logger.record_rows_affected(rows.len() as u64);
    logger.succeed();
    Ok(rows.len() as u64)
}
