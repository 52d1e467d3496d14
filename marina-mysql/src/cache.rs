//! Per-connection prepared statement cache (spec 4.6, Data Model's
//! `PreparedStatement`: "Owned by a Connection; invalidated on Connection
//! close").
//!
//! Keyed by the literal SQL text so that repeated calls to `execute` with
//! the same query string skip the `COM_STMT_PREPARE` round-trip.

use std::collections::HashMap;

use crate::statement::PreparedStatement;

pub(crate) struct StatementCache {
    statements: HashMap<Box<str>, PreparedStatement>,
}

impl StatementCache {
    pub(crate) fn new() -> Self {
        Self {
            statements: HashMap::with_capacity(10),
        }
    }

    pub(crate) fn get(&self, query: &str) -> Option<&PreparedStatement> {
        self.statements.get(query)
    }

    pub(crate) fn insert(&mut self, query: &str, statement: PreparedStatement) {
        self.statements.insert(query.into(), statement);
    }

    /// Drains every cached statement id, handed to the connection so it can
    /// fire `COM_STMT_CLOSE` for each before the socket goes away.
    pub(crate) fn drain_ids(&mut self) -> Vec<u32> {
        self.statements.drain().map(|(_, stmt)| stmt.statement_id).collect()
    }
}
