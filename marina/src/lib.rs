//! `marina` is the thin facade over [`marina_mysql`], the engine crate that
//! speaks the wire protocol. It exposes exactly the operations a cursor or
//! session adaptor needs and nothing more: connect, query, prepare, execute
//! a prepared statement, ping, close, and the pool's acquire/release pair.
//!
//! Mirrors the split between `sqlx` and `sqlx-mysql`/`sqlx-core`: the facade
//! owns naming and ergonomics, the engine crate owns the protocol.

mod connection;
mod pool;
mod statement;

pub use marina_mysql::{
    Compression, Done, Error, MySqlConnectOptions, MySqlDatabaseError, MySqlSslMode, PoolOptions, Result, Value,
};

pub use crate::connection::Connection;
pub use crate::pool::{Pool, PooledConnection};
pub use crate::statement::Statement;
