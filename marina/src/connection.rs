use std::sync::Arc;

use marina_mysql::{ColumnDef, Done, Error, MySqlConnectOptions, MySqlConnection, PreparedStatement, QueryResult, Status, Value};

use crate::statement::Statement;

/// Rows pulled per `COM_STMT_FETCH` once a cursored result needs more than
/// the initial batch (spec Open Question 1).
const CURSOR_FETCH_SIZE: u32 = 1024;

/// A single connection to the server (spec 6: `open(options)`, `query`,
/// `prepare`, `ping`, `close`). Thin wrapper over [`MySqlConnection`]; all
/// protocol work happens there.
pub struct Connection(pub(crate) MySqlConnection);

impl Connection {
    pub async fn connect(options: MySqlConnectOptions) -> Result<Self, Error> {
        Ok(Self(MySqlConnection::connect(options).await?))
    }

    /// Runs `sql` through the text protocol, returning a stream the caller
    /// drains with [`ResultStream::next`] (spec 6: `query(text) → ResultStream`).
    pub async fn query(&mut self, sql: &str) -> Result<ResultStream<'_>, Error> {
        let result = self.0.query(sql).await?;
        Ok(ResultStream::new(&mut self.0, result, None))
    }

    /// Prepares `sql` on the server (spec 6: `prepare(text) → Stmt`).
    pub async fn prepare(&mut self, sql: &str) -> Result<Statement, Error> {
        Ok(Statement::new(self.0.prepare(sql).await?))
    }

    pub async fn ping(&mut self) -> Result<(), Error> {
        self.0.ping().await
    }

    pub async fn close(self) -> Result<(), Error> {
        self.0.close().await
    }

    pub fn server_version(&self) -> &str {
        self.0.server_version()
    }
}

/// A lazily-drained result set (spec Data Model's `ResultSet::Rows`). `Ok`
/// results surface immediately through [`ResultStream::done`]; `Rows`
/// results yield one row at a time from [`ResultStream::next`] until it
/// returns `None`, at which point `done()` carries the terminal status.
pub struct ResultStream<'c> {
    conn: &'c mut MySqlConnection,
    columns: Arc<[ColumnDef]>,
    done: Option<Done>,
    /// The statement this result was produced from, kept around to page
    /// through a `SERVER_STATUS_CURSOR_EXISTS` result via `COM_STMT_FETCH`
    /// (spec Open Question 1). `None` for text-protocol queries, which never
    /// set cursor status.
    stmt: Option<PreparedStatement>,
}

impl<'c> ResultStream<'c> {
    pub(crate) fn new(conn: &'c mut MySqlConnection, result: QueryResult, stmt: Option<PreparedStatement>) -> Self {
        match result {
            QueryResult::Ok(done) => Self { conn, columns: Arc::from(Vec::new()), done: Some(done), stmt },
            QueryResult::Rows(meta) => Self { conn, columns: meta.columns, done: None, stmt },
        }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// `Some` once the result set (or the command, for an `Ok` result) has
    /// fully completed.
    pub fn done(&self) -> Option<&Done> {
        self.done.as_ref()
    }

    /// Pulls the next row, or `None` once the result set is exhausted.
    ///
    /// When the server paginates a prepared-statement result via a cursor
    /// (`SERVER_STATUS_CURSOR_EXISTS`), exhausting the current batch fetches
    /// the next one automatically rather than ending the stream.
    pub async fn next(&mut self) -> Result<Option<Vec<Value>>, Error> {
        loop {
            if self.done.is_some() {
                return Ok(None);
            }

            match self.conn.fetch_row().await? {
                Some(row) => return Ok(Some(row)),
                None => {
                    let done = self.conn.last_result().cloned();
                    let cursor_open = done
                        .as_ref()
                        .is_some_and(|d| d.status.contains(Status::SERVER_STATUS_CURSOR_EXISTS));

                    if cursor_open {
                        if let Some(stmt) = &self.stmt {
                            self.conn.fetch_cursor(stmt, CURSOR_FETCH_SIZE).await?;
                            continue;
                        }
                    }

                    self.done = done;
                    return Ok(None);
                }
            }
        }
    }
}
