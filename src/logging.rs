//! Structured `tracing` spans and events around the prepare / bind / scan
//! cycles, in the style of `sqlx-core`'s `QueryLogger` (spec §2 "Logging").

use std::time::Instant;

/// Tracks one prepare-and-bind cycle end to end, logging a single summary
/// event on drop the way `QueryLogger` does, so a cycle that bails out early
/// via `?` still gets logged.
pub(crate) struct BindLogger<'q> {
    sql: &'q str,
    start: Instant,
    outputs_scanned: u64,
    rows_affected: u64,
    outcome: Outcome,
}

#[derive(Clone, Copy)]
enum Outcome {
    Pending,
    Ok,
    Err,
}

impl<'q> BindLogger<'q> {
    pub(crate) fn new(sql: &'q str) -> Self {
        BindLogger {
            sql,
            start: Instant::now(),
            outputs_scanned: 0,
            rows_affected: 0,
            outcome: Outcome::Pending,
        }
    }

    pub(crate) fn record_row_scanned(&mut self) {
        self.outputs_scanned += 1;
    }

    pub(crate) fn record_rows_affected(&mut self, n: u64) {
        self.rows_affected += n;
    }

    pub(crate) fn succeed(mut self) {
        self.outcome = Outcome::Ok;
    }

    pub(crate) fn fail(mut self) {
        self.outcome = Outcome::Err;
    }
}

impl<'q> Drop for BindLogger<'q> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let summary = summarize(self.sql);
        match self.outcome {
            Outcome::Ok => tracing::debug!(
                target: "sigilsql::query",
                rows_affected = self.rows_affected,
                rows_scanned = self.outputs_scanned,
                elapsed = ?elapsed,
                "{summary}",
            ),
            Outcome::Err => tracing::warn!(
                target: "sigilsql::query",
                elapsed = ?elapsed,
                "{summary} (failed)",
            ),
            Outcome::Pending => tracing::trace!(
                target: "sigilsql::query",
                elapsed = ?elapsed,
                "{summary} (dropped before outcome recorded)",
            ),
        }
    }
}

/// Collapses a query to one line and truncates it for log readability,
/// mirroring `QueryLogger`'s query-summary behavior without pulling in a
/// SQL-formatting dependency this crate doesn't otherwise need.
fn summarize(sql: &str) -> String {
    const MAX_LEN: usize = 120;
    let collapsed: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_LEN {
        let truncated: String = collapsed.chars().take(MAX_LEN).collect();
        format!("{truncated}…")
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_collapses_whitespace() {
        assert_eq!(summarize("SELECT  1\n  FROM t"), "SELECT 1 FROM t");
    }

    #[test]
    fn summarize_truncates_long_queries() {
        let sql = "SELECT ".to_string() + &"x".repeat(200);
        let summary = summarize(&sql);
        assert!(summary.ends_with('…'));
        assert!(summary.chars().count() <= 121);
    }
}
