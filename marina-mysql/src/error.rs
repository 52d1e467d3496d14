use std::fmt::{self, Display, Formatter};
use std::io;

use crate::protocol::ErrPacket;

/// A specialized `Result` type for `marina-mysql` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing a connection or running a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error communicating with the server: {0}")]
    Io(#[from] io::Error),

    #[error("error while upgrading the connection to TLS: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("error parsing connection options: {0}")]
    Configuration(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Database(#[from] MySqlDatabaseError),

    #[error("error decoding column {index}: {source}")]
    ColumnDecode {
        index: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("no column found for name {0:?}")]
    ColumnNotFound(String),

    #[error("no rows returned by a query that expected to return at least one row")]
    RowNotFound,

    #[error("a command was attempted on a connection that has an outstanding, unconsumed result")]
    ConnectionBusy,

    #[error("attempted to acquire a connection from a closed pool")]
    PoolClosed,

    #[error("timed out while waiting to acquire a connection from the pool")]
    PoolTimedOut,

    #[error("a background worker task crashed")]
    WorkerCrashed,
}

impl Error {
    /// `true` if this error leaves the owning connection unusable and it must be
    /// dropped rather than returned to a pool.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Database(_) | Error::ConnectionBusy | Error::PoolClosed | Error::PoolTimedOut
        )
    }
}

/// The database returned an error response (`ERR_Packet`).
#[derive(Debug)]
pub struct MySqlDatabaseError(pub(crate) ErrPacket);

impl From<ErrPacket> for MySqlDatabaseError {
    fn from(err: ErrPacket) -> Self {
        Self(err)
    }
}

impl MySqlDatabaseError {
    pub fn code(&self) -> u16 {
        self.0.error_code
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.0.sql_state.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.0.error_message
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message(), self.code())
    }
}

impl std::error::Error for MySqlDatabaseError {}

macro_rules! protocol_err {
    ($($args:tt)*) => {
        $crate::error::Error::Protocol(format!($($args)*))
    };
}

macro_rules! tls_err {
    ($err:expr) => {
        $crate::error::Error::Tls(Box::new($err))
    };
}

pub(crate) use protocol_err;
pub(crate) use tls_err;
