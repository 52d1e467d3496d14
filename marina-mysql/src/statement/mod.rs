//! Prepared statement lifecycle (spec 4.6, Data Model's `PreparedStatement`).

use crate::protocol::ColumnDef;

/// A statement prepared on the server. Owned by the `MySqlConnection` that
/// created it; using it against a different connection is a logic error
/// the caller must avoid (spec 3: "Owned by a Connection; invalidated on
/// Connection close").
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    pub(crate) statement_id: u32,
    pub(crate) params: Vec<ColumnDef>,
    pub(crate) columns: Vec<ColumnDef>,
}

impl PreparedStatement {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
}
