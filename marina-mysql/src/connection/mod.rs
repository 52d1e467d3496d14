//! The connection state machine (spec 4.4): `Connecting` → `Authenticating`
//! → `Idle` ⇄ `Command`/`Reading-Rows`/`In-LocalInfile` → `Closed`.
//!
//! [`establish`] owns the first two states; everything here is the `Idle`
//! connection's command dispatch and the result-set decoder (spec 4.5).

pub(crate) mod establish;
pub(crate) mod stream;

use std::sync::Arc;

use crate::cache::StatementCache;
use crate::error::{protocol_err, Error, MySqlDatabaseError};
use crate::io::Decode;
use crate::local_infile;
use crate::logger::QueryLogger;
use crate::options::MySqlConnectOptions;
use crate::protocol::auth::RsaPublicKeyCache;
use crate::protocol::{
    classify_response_header, decode_binary_row, decode_text_row, Capabilities, ColumnCount, ColumnDef, ComPing,
    ComQuery, ComQuit, ComStmtClose, ComStmtExecute, ComStmtFetch, ComStmtPrepare, ComStmtPrepareOk, ComStmtReset,
    ComStmtSendLongData, EofPacket, ErrPacket, LocalInfileRequest, OkPacket, ResponseKind, Status,
};
use crate::statement::PreparedStatement;
use crate::value::Value;

use self::stream::MySqlStream;

/// The `OK_Packet` half of a command's outcome (spec 3's `ResultSet`).
#[derive(Debug, Clone)]
pub struct Done {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,
    pub info: String,
}

impl From<OkPacket> for Done {
    fn from(ok: OkPacket) -> Self {
        Self {
            affected_rows: ok.affected_rows,
            last_insert_id: ok.last_insert_id,
            status: ok.status,
            warnings: ok.warnings,
            info: ok.info,
        }
    }
}

/// Column metadata for a result set whose rows are pulled one at a time via
/// [`MySqlConnection::fetch_row`] (spec 3's `ResultSet::Rows`).
#[derive(Debug, Clone)]
pub struct RowsMeta {
    pub columns: Arc<[ColumnDef]>,
}

/// What a command produced: either it completed with no rows (`Ok`), or it
/// opened a result set whose rows must be drained with `fetch_row` before
/// the connection returns to `Idle` (spec 4.4, 4.5).
#[derive(Debug)]
pub enum QueryResult {
    Ok(Done),
    Rows(RowsMeta),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Command,
    ReadingRows,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowProtocol {
    Text,
    Binary,
}

/// One MySQL/MariaDB connection. Single-owner per spec 5: a command issued
/// while `mode != Idle` is rejected with [`Error::ConnectionBusy`] rather
/// than queued.
pub struct MySqlConnection {
    stream: MySqlStream,
    mode: Mode,
    row_protocol: RowProtocol,
    columns: Arc<[ColumnDef]>,
    last_done: Option<Done>,
    server_version: String,
    connection_id: u32,
    statement_cache: StatementCache,
    options: MySqlConnectOptions,
    /// Live for the duration of the command that opened it; logs on drop
    /// once `read_command_response`/`fetch_row_inner` learns the final
    /// affected/returned row counts (spec 6's `log_statements`/`echo`).
    query_logger: Option<QueryLogger>,
}

impl MySqlConnection {
    pub async fn connect(options: MySqlConnectOptions) -> Result<Self, Error> {
        let rsa_cache = RsaPublicKeyCache::shared();
        let established = establish::establish(&options, &rsa_cache).await?;

        let mut conn = Self {
            stream: established.stream,
            mode: Mode::Idle,
            row_protocol: RowProtocol::Text,
            columns: Arc::from(Vec::new()),
            last_done: None,
            server_version: established.server_version,
            connection_id: established.connection_id,
            statement_cache: StatementCache::new(),
            options,
            query_logger: None,
        };

        conn.run_setup().await?;
        Ok(conn)
    }

    /// `SET sql_mode=...` / `SET NAMES ...` / the configured `init_command`,
    /// run once right after authentication (spec 6's configuration options;
    /// grounded on `sqlx-core`'s old `MySqlConnection::open` setup batch).
    async fn run_setup(&mut self) -> Result<(), Error> {
        let mut statements = Vec::new();

        if let Some(sql_mode) = self.options.sql_mode.clone() {
            statements.push(format!("SET sql_mode={sql_mode}"));
        }

        statements.push(format!("SET NAMES {}", self.options.charset));

        if let Some(init_command) = self.options.init_command.clone() {
            statements.push(init_command);
        }

        for statement in statements {
            self.simple_execute(&statement).await?;
        }

        Ok(())
    }

    async fn simple_execute(&mut self, sql: &str) -> Result<(), Error> {
        match self.query(sql).await? {
            QueryResult::Ok(_) => Ok(()),
            QueryResult::Rows(_) => {
                while self.fetch_row().await?.is_some() {}
                Ok(())
            }
        }
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Status/affected-rows/last-insert-id of the most recently completed
    /// command, including the terminal packet of a just-drained result set.
    pub fn last_result(&self) -> Option<&Done> {
        self.last_done.as_ref()
    }

    fn begin_command(&mut self) -> Result<(), Error> {
        if self.mode != Mode::Idle {
            return Err(Error::ConnectionBusy);
        }
        self.stream.begin_command();
        self.mode = Mode::Command;
        Ok(())
    }

    /// `true` once a fatal error or an explicit `close()` has left this
    /// connection unusable (spec 7: "fatal errors transition the connection
    /// to `Closed`"). The pool checks this before returning a connection to
    /// its idle set (spec 3, invariant 6).
    pub fn is_closed(&self) -> bool {
        self.mode == Mode::Closed
    }

    /// Every fallible command entry point routes its result through here:
    /// a fatal error (anything that isn't a `ServerError`/`UsageError`, per
    /// [`Error::is_fatal`]) leaves the wire in an indeterminate state, so the
    /// connection is marked `Closed` rather than returned to `Idle`.
    fn note_fatal<T>(&mut self, result: &Result<T, Error>) {
        if let Err(e) = result {
            if e.is_fatal() {
                self.mode = Mode::Closed;
            }
        }
    }

    pub async fn ping(&mut self) -> Result<(), Error> {
        let result = self.ping_inner().await;
        self.note_fatal(&result);
        result
    }

    async fn ping_inner(&mut self) -> Result<(), Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(&ComPing, ());
        self.stream.flush().await?;

        match self.read_command_response().await? {
            QueryResult::Ok(_) => Ok(()),
            QueryResult::Rows(_) => Err(protocol_err!("COM_PING unexpectedly returned a result set")),
        }
    }

    /// Sends `COM_QUIT` and shuts down the socket. Does not fail the caller
    /// if the server has already gone away; the connection is unusable
    /// either way once this returns.
    pub async fn close(mut self) -> Result<(), Error> {
        if self.mode == Mode::Closed {
            return Ok(());
        }

        for statement_id in self.statement_cache.drain_ids() {
            self.stream.begin_command();
            self.stream.write_packet_ctx(&ComStmtClose { statement_id }, ());
            let _ = self.stream.flush().await;
        }

        self.stream.begin_command();
        self.stream.write_packet_ctx(&ComQuit, ());
        let _ = self.stream.flush().await;

        self.mode = Mode::Closed;
        self.stream.shutdown().await
    }

    /// Runs `sql` through the text protocol (`COM_QUERY`).
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult, Error> {
        let result = self.query_inner(sql).await;
        self.note_fatal(&result);
        result
    }

    async fn query_inner(&mut self, sql: &str) -> Result<QueryResult, Error> {
        self.begin_command()?;
        self.query_logger = Some(QueryLogger::new(sql, self.options.log_statements));
        self.stream.write_packet_ctx(&ComQuery { sql }, ());
        self.stream.flush().await?;
        self.row_protocol = RowProtocol::Text;
        self.read_command_response().await
    }

    /// Prepares `sql` on the server (spec 4.6).
    pub async fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, Error> {
        let result = self.prepare_inner(sql).await;
        self.note_fatal(&result);
        result
    }

    async fn prepare_inner(&mut self, sql: &str) -> Result<PreparedStatement, Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(&ComStmtPrepare { query: sql }, ());
        self.stream.flush().await?;

        let packet = self.stream.recv_packet().await?;
        if packet.first().copied() == Some(0xff) {
            self.mode = Mode::Idle;
            let err = ErrPacket::decode_with(packet, self.stream.capabilities)?;
            return Err(Error::Database(MySqlDatabaseError::from(err)));
        }

        let ok = ComStmtPrepareOk::decode_with(packet, ())?;
        let deprecate_eof = self.stream.capabilities.contains(Capabilities::DEPRECATE_EOF);

        let mut params = Vec::with_capacity(ok.num_params as usize);
        for _ in 0..ok.num_params {
            params.push(ColumnDef::decode_with(self.stream.recv_packet().await?, ())?);
        }
        if ok.num_params > 0 && !deprecate_eof {
            self.stream.recv_with::<EofPacket, _>(()).await?;
        }

        let mut columns = Vec::with_capacity(ok.num_columns as usize);
        for _ in 0..ok.num_columns {
            columns.push(ColumnDef::decode_with(self.stream.recv_packet().await?, ())?);
        }
        if ok.num_columns > 0 && !deprecate_eof {
            self.stream.recv_with::<EofPacket, _>(()).await?;
        }

        self.mode = Mode::Idle;

        Ok(PreparedStatement {
            statement_id: ok.statement_id,
            params,
            columns,
        })
    }

    /// Runs a prepared statement through the binary protocol (spec 4.6).
    pub async fn execute_statement(&mut self, stmt: &PreparedStatement, params: &[Value]) -> Result<QueryResult, Error> {
        let result = self.execute_statement_inner(stmt, params).await;
        self.note_fatal(&result);
        result
    }

    async fn execute_statement_inner(&mut self, stmt: &PreparedStatement, params: &[Value]) -> Result<QueryResult, Error> {
        if params.len() != stmt.params.len() {
            return Err(protocol_err!(
                "statement expects {} parameters, {} were given",
                stmt.params.len(),
                params.len()
            ));
        }

        self.begin_command()?;
        self.query_logger = Some(QueryLogger::new(
            format!("<prepared statement #{}>", stmt.statement_id),
            self.options.log_statements,
        ));
        self.stream.write_packet_ctx(
            &ComStmtExecute {
                statement_id: stmt.statement_id,
                params,
            },
            (),
        );
        self.stream.flush().await?;
        self.row_protocol = RowProtocol::Binary;
        self.read_command_response().await
    }

    /// Sends one chunk of a long parameter value (spec 4.6, "long data").
    /// Fire-and-forget: the server never replies.
    pub async fn send_long_data(&mut self, stmt: &PreparedStatement, param_id: u16, data: &[u8]) -> Result<(), Error> {
        let result = self.send_long_data_inner(stmt, param_id, data).await;
        self.note_fatal(&result);
        result
    }

    async fn send_long_data_inner(&mut self, stmt: &PreparedStatement, param_id: u16, data: &[u8]) -> Result<(), Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(
            &ComStmtSendLongData {
                statement_id: stmt.statement_id,
                param_id,
                data,
            },
            (),
        );
        self.stream.flush().await?;
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Clears any long-data buffered on the server for `stmt` without
    /// deallocating it.
    pub async fn reset_statement(&mut self, stmt: &PreparedStatement) -> Result<(), Error> {
        let result = self.reset_statement_inner(stmt).await;
        self.note_fatal(&result);
        result
    }

    async fn reset_statement_inner(&mut self, stmt: &PreparedStatement) -> Result<(), Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(&ComStmtReset { statement_id: stmt.statement_id }, ());
        self.stream.flush().await?;

        match self.read_command_response().await? {
            QueryResult::Ok(_) => Ok(()),
            QueryResult::Rows(_) => Err(protocol_err!("COM_STMT_RESET unexpectedly returned a result set")),
        }
    }

    /// Deallocates a prepared statement server-side. Fire-and-forget.
    pub async fn close_statement(&mut self, stmt: PreparedStatement) -> Result<(), Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(&ComStmtClose { statement_id: stmt.statement_id }, ());
        self.stream.flush().await?;
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Pulls the next `rows` rows from a cursor opened by a prior
    /// `execute_statement` whose result carried `SERVER_STATUS_CURSOR_EXISTS`
    /// (spec Open Question 1: supported, but never forced automatically).
    pub async fn fetch_cursor(&mut self, stmt: &PreparedStatement, rows: u32) -> Result<QueryResult, Error> {
        let result = self.fetch_cursor_inner(stmt, rows).await;
        self.note_fatal(&result);
        result
    }

    async fn fetch_cursor_inner(&mut self, stmt: &PreparedStatement, rows: u32) -> Result<QueryResult, Error> {
        self.begin_command()?;
        self.stream.write_packet_ctx(
            &ComStmtFetch {
                statement_id: stmt.statement_id,
                rows,
            },
            (),
        );
        self.stream.flush().await?;

        self.row_protocol = RowProtocol::Binary;
        self.columns = Arc::from(stmt.columns.clone());
        self.mode = Mode::ReadingRows;

        Ok(QueryResult::Rows(RowsMeta { columns: self.columns.clone() }))
    }

    /// Runs `sql` via a statement cached by literal text, preparing it on
    /// first use (spec 4.6's `PreparedStatement` cache).
    pub async fn query_cached(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, Error> {
        if self.statement_cache.get(sql).is_none() {
            let stmt = self.prepare(sql).await?;
            self.statement_cache.insert(sql, stmt);
        }

        let stmt = self.statement_cache.get(sql).expect("just inserted").clone();
        self.execute_statement(&stmt, params).await
    }

    /// Reads the first packet of a command's response and dispatches on it
    /// (spec 4.4, `Command` state), looping past any `LOCAL INFILE` request.
    async fn read_command_response(&mut self) -> Result<QueryResult, Error> {
        let deprecate_eof = self.stream.capabilities.contains(Capabilities::DEPRECATE_EOF);

        loop {
            let packet = self.stream.recv_packet().await?;
            let first_byte = packet.first().copied().unwrap_or(0);

            match classify_response_header(first_byte, packet.len(), deprecate_eof) {
                ResponseKind::Ok => {
                    let ok = OkPacket::decode_with(packet, self.stream.capabilities)?;
                    self.mode = Mode::Idle;
                    let done: Done = ok.into();
                    self.last_done = Some(done.clone());
                    if let Some(mut logger) = self.query_logger.take() {
                        logger.set_rows_affected(done.affected_rows);
                    }
                    return Ok(QueryResult::Ok(done));
                }
                ResponseKind::Err => {
                    self.mode = Mode::Idle;
                    self.query_logger.take();
                    let err = ErrPacket::decode_with(packet, self.stream.capabilities)?;
                    return Err(Error::Database(MySqlDatabaseError::from(err)));
                }
                ResponseKind::Eof => {
                    let eof = EofPacket::decode_with(packet, ())?;
                    self.mode = Mode::Idle;
                    let done = Done {
                        affected_rows: 0,
                        last_insert_id: 0,
                        status: eof.status,
                        warnings: eof.warnings,
                        info: String::new(),
                    };
                    self.last_done = Some(done.clone());
                    if let Some(mut logger) = self.query_logger.take() {
                        logger.set_rows_affected(done.affected_rows);
                    }
                    return Ok(QueryResult::Ok(done));
                }
                ResponseKind::LocalInfile => {
                    let request = LocalInfileRequest::decode_with(packet, ())?;
                    local_infile::handle(&mut self.stream, &self.options, &request.filename).await?;
                    // the terminal OK/ERR for the LOAD DATA statement itself follows
                }
                ResponseKind::ColumnCount => {
                    let count = ColumnCount::decode_with(packet, ())?;
                    let mut columns = Vec::with_capacity(count.columns as usize);
                    for _ in 0..count.columns {
                        columns.push(ColumnDef::decode_with(self.stream.recv_packet().await?, ())?);
                    }
                    if !deprecate_eof {
                        self.stream.recv_with::<EofPacket, _>(()).await?;
                    }

                    self.columns = Arc::from(columns);
                    self.mode = Mode::ReadingRows;
                    return Ok(QueryResult::Rows(RowsMeta { columns: self.columns.clone() }));
                }
            }
        }
    }

    /// Pulls the next row of a result set opened by `query`/`execute_statement`/
    /// `fetch_cursor`, returning `None` once the terminal OK/EOF is reached
    /// (spec 4.5).
    pub async fn fetch_row(&mut self) -> Result<Option<Vec<Value>>, Error> {
        let result = self.fetch_row_inner().await;
        self.note_fatal(&result);
        result
    }

    async fn fetch_row_inner(&mut self) -> Result<Option<Vec<Value>>, Error> {
        if self.mode != Mode::ReadingRows {
            return Ok(None);
        }

        let packet = self.stream.recv_packet().await?;

        // Row data never legitimately starts with 0xFE: a text row's lenenc
        // prefix only takes that value for strings needing an 8-byte length,
        // and a binary row always starts with the fixed 0x00 header. MySQL
        // reserves 0xFE for the terminal OK/EOF that ends the result set,
        // even under CLIENT_DEPRECATE_EOF.
        if packet.first().copied() == Some(0xfe) {
            let deprecate_eof = self.stream.capabilities.contains(Capabilities::DEPRECATE_EOF);
            let done = if deprecate_eof {
                OkPacket::decode_with(packet, self.stream.capabilities)?.into()
            } else {
                let eof = EofPacket::decode_with(packet, ())?;
                Done {
                    affected_rows: 0,
                    last_insert_id: 0,
                    status: eof.status,
                    warnings: eof.warnings,
                    info: String::new(),
                }
            };

            // SERVER_MORE_RESULTS_EXISTS chaining is out of scope (spec
            // Non-goals: "multi-statement result handling beyond the 'more
            // results' flag"); the flag is still surfaced via `last_result`.
            self.mode = Mode::Idle;
            if let Some(mut logger) = self.query_logger.take() {
                logger.set_rows_affected(done.affected_rows);
            }
            self.last_done = Some(done);
            return Ok(None);
        }

        let row = match self.row_protocol {
            RowProtocol::Text => decode_text_row(packet, &self.columns)?,
            RowProtocol::Binary => decode_binary_row(packet, &self.columns)?,
        };

        if let Some(logger) = self.query_logger.as_mut() {
            logger.increment_rows_returned();
        }

        Ok(Some(row))
    }
}
