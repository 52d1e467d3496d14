use std::time::Duration;

/// Pool-only configuration (spec 6: "pool-only: `minsize`, `maxsize`,
/// `pool_recycle` seconds, `echo` (bool)").
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub(crate) minsize: u32,
    pub(crate) maxsize: u32,
    pub(crate) pool_recycle: Option<Duration>,
    pub(crate) echo: bool,
    pub(crate) acquire_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            minsize: 1,
            maxsize: 10,
            pool_recycle: None,
            echo: false,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections established eagerly when the pool is built, and the
    /// floor an idle-evicting reaper will not close below (spec 4.8:
    /// "The pool enforces a `minsize` floor by not closing idle connections
    /// below it on eviction").
    pub fn minsize(mut self, minsize: u32) -> Self {
        self.minsize = minsize;
        self
    }

    /// `idle + in_use <= maxsize` at every observable moment (spec 3).
    pub fn maxsize(mut self, maxsize: u32) -> Self {
        self.maxsize = maxsize;
        self
    }

    /// Maximum age an idle connection may reach before `acquire` pings it
    /// (and discards it on failure) instead of handing it out directly
    /// (spec 4.8: "optionally ping if `pool_recycle` expired").
    pub fn pool_recycle(mut self, recycle: Duration) -> Self {
        self.pool_recycle = Some(recycle);
        self
    }

    /// Log every statement executed through a pooled connection (spec 6).
    /// Purely a logging toggle; marina-mysql itself only reads this to
    /// decide the `tracing` level of its own acquire/release events.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// How long `acquire` waits for a free connection before failing with
    /// [`crate::Error::PoolTimedOut`]. `None` waits indefinitely.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }
}
