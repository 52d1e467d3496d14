use marina_mysql::{Error, PreparedStatement, Value};

use crate::connection::{Connection, ResultStream};

/// A statement prepared on a particular connection (spec 6: `Stmt`).
/// Executing it against a different connection than the one it was
/// prepared on is a logic error the caller must avoid.
pub struct Statement(PreparedStatement);

impl Statement {
    pub(crate) fn new(inner: PreparedStatement) -> Self {
        Self(inner)
    }

    pub fn param_count(&self) -> usize {
        self.0.param_count()
    }

    /// Runs the statement through the binary protocol (spec 6:
    /// `stmt.execute(params) → ResultStream`).
    pub async fn execute<'c>(&self, conn: &'c mut Connection, params: &[Value]) -> Result<ResultStream<'c>, Error> {
        let result = conn.0.execute_statement(&self.0, params).await?;
        Ok(ResultStream::new(&mut conn.0, result, Some(self.0.clone())))
    }

    /// Deallocates the statement server-side (spec 6: `stmt.close()`).
    pub async fn close(self, conn: &mut Connection) -> Result<(), Error> {
        conn.0.close_statement(self.0).await
    }
}
