//! Statement-level logging (spec 6's `echo`/`log_statements`; ambient stack
//! carried regardless of the spec's Non-goals around outer-surface logging).
//!
//! Grounded on `sqlx-core/src/logger.rs`'s `QueryLogger`: a timer started
//! when a command is dispatched, accumulating row counts as the caller
//! drains the result, and emitting one `tracing` event when it is dropped.
//! marina trims the teacher's dynamic slow-query level switch and SQL
//! pretty-printing (no `sqlformat` dependency in this crate's stack) but
//! keeps the start-timer/accumulate/emit-on-drop shape.

use std::time::Instant;

pub(crate) struct QueryLogger {
    sql: Box<str>,
    rows_affected: u64,
    rows_returned: u64,
    start: Instant,
    enabled: bool,
}

impl QueryLogger {
    pub(crate) fn new(sql: impl Into<Box<str>>, enabled: bool) -> Self {
        Self {
            sql: sql.into(),
            rows_affected: 0,
            rows_returned: 0,
            start: Instant::now(),
            enabled,
        }
    }

    pub(crate) fn increment_rows_returned(&mut self) {
        self.rows_returned += 1;
    }

    pub(crate) fn set_rows_affected(&mut self, n: u64) {
        self.rows_affected = n;
    }
}

impl Drop for QueryLogger {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        tracing::debug!(
            target: "marina::query",
            rows_affected = self.rows_affected,
            rows_returned = self.rows_returned,
            ?elapsed,
            "{}",
            self.sql,
        );
    }
}
