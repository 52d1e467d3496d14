use marina_mysql::{Error, MySqlConnectOptions, PoolOptions, Value};

use crate::connection::ResultStream;
use crate::statement::Statement;

/// A pool of connections (spec 6: `pool.acquire()`, `pool.release()`).
/// `release` has no explicit method: dropping a [`PooledConnection`]
/// returns it to the pool, matching [`marina_mysql::PoolConnection`]'s
/// `Drop`-based release.
pub struct Pool(marina_mysql::Pool);

impl Pool {
    pub async fn connect(connect_options: MySqlConnectOptions, pool_options: PoolOptions) -> Result<Self, Error> {
        Ok(Self(marina_mysql::Pool::connect(connect_options, pool_options).await?))
    }

    pub async fn acquire(&self) -> Result<PooledConnection, Error> {
        Ok(PooledConnection(self.0.acquire().await?))
    }

    pub async fn close(&self) {
        self.0.close().await
    }

    /// Total connections currently live, idle or checked out.
    pub fn size(&self) -> u32 {
        self.0.size()
    }

    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }
}

/// A connection checked out of a [`Pool`]. Exposes the same operations as
/// [`crate::Connection`]; releasing it back to the pool happens implicitly
/// on drop rather than through an explicit `release()` call.
pub struct PooledConnection(marina_mysql::PoolConnection);

impl PooledConnection {
    pub async fn query(&mut self, sql: &str) -> Result<ResultStream<'_>, Error> {
        let result = self.0.query(sql).await?;
        Ok(ResultStream::new(&mut self.0, result))
    }

    // `&mut self.0` here coerces through `PoolConnection`'s `DerefMut` to the
    // `&mut MySqlConnection` that `ResultStream::new` expects.

    pub async fn prepare(&mut self, sql: &str) -> Result<Statement, Error> {
        Ok(Statement::new(self.0.prepare(sql).await?))
    }

    pub async fn ping(&mut self) -> Result<(), Error> {
        self.0.ping().await
    }
}
