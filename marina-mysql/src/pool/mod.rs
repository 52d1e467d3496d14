//! The async connection pool (spec 4.8). Grounded on
//! `sqlx-core/src/pool/inner.rs` and `sqlx-core/src/pool/connection.rs`'s
//! older `async-std`-channel-based design: a fixed ceiling of live
//! connections, a FIFO queue of waiters parked on one-shot completion
//! handles, and a synchronous release path driven from `Drop`.

pub(crate) mod options;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures_channel::oneshot;
use futures_util::future;

use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::options::MySqlConnectOptions;

pub use self::options::PoolOptions;

struct IdleConn {
    conn: MySqlConnection,
    since: Instant,
}

#[derive(Default)]
struct State {
    idle: VecDeque<IdleConn>,
    waiters: VecDeque<oneshot::Sender<()>>,
}

struct Shared {
    connect_options: MySqlConnectOptions,
    pool_options: PoolOptions,
    state: Mutex<State>,
    in_use: AtomicU32,
    size: AtomicU32,
    closed: AtomicBool,
}

impl Shared {
    /// Wakes the oldest waiter that still has a live receiver, skipping any
    /// that cancelled their `acquire` in the meantime. Called any time a
    /// connection becomes available: either handed back idle, or a slot
    /// freed up by a discarded connection that a waiter may now fill by
    /// dialing a fresh one.
    fn wake_one_waiter(&self) {
        let mut state = self.state.lock().unwrap();
        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return;
            }
        }
    }

    /// Called synchronously from [`PoolConnection`]'s `Drop`, mirroring the
    /// teacher's `PoolConnection::drop` releasing to the shared pool without
    /// spawning a task (`sqlx-core/src/pool/connection.rs`).
    fn release(&self, conn: MySqlConnection) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);

        if self.closed.load(Ordering::SeqCst) || conn.is_closed() {
            self.size.fetch_sub(1, Ordering::SeqCst);
        } else {
            let mut state = self.state.lock().unwrap();
            state.idle.push_back(IdleConn { conn, since: Instant::now() });
        }

        self.wake_one_waiter();
    }
}

/// A pool of MySQL/MariaDB connections (spec 4.8). `minsize` connections are
/// established eagerly by [`Pool::connect`]; `maxsize` bounds how many may
/// ever be live at once, with excess callers parked in FIFO order.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Opens `pool_options.minsize` connections up front and returns once
    /// all of them have authenticated, failing fast if any does not (spec
    /// 4.8: "the pool enforces a `minsize` floor").
    pub async fn connect(connect_options: MySqlConnectOptions, pool_options: PoolOptions) -> Result<Self, Error> {
        let minsize = pool_options.minsize;

        let shared = Arc::new(Shared {
            connect_options,
            pool_options,
            state: Mutex::new(State::default()),
            in_use: AtomicU32::new(0),
            size: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        });

        let connects = future::join_all((0..minsize).map(|_| MySqlConnection::connect(shared.connect_options.clone()))).await;

        let mut state = shared.state.lock().unwrap();
        for result in connects {
            let conn = result?;
            shared.size.fetch_add(1, Ordering::SeqCst);
            state.idle.push_back(IdleConn { conn, since: Instant::now() });
        }
        drop(state);

        Ok(Self { shared })
    }

    /// Checks out a connection, opening a new one if under `maxsize` and no
    /// idle connection is available, or waiting in FIFO order otherwise
    /// (spec 3, invariant: `idle + in_use <= maxsize`).
    pub async fn acquire(&self) -> Result<PoolConnection, Error> {
        match self.shared.pool_options.acquire_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.acquire_inner()).await {
                Ok(result) => result,
                Err(_) => Err(Error::PoolTimedOut),
            },
            None => self.acquire_inner().await,
        }
    }

    async fn acquire_inner(&self) -> Result<PoolConnection, Error> {
        loop {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::PoolClosed);
            }

            if let Some(conn) = self.try_take_idle() {
                return Ok(conn);
            }

            if let Some(conn) = self.try_open_new().await? {
                return Ok(conn);
            }

            let rx = {
                let mut state = self.shared.state.lock().unwrap();
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                rx
            };

            // A wake is only a hint to retry, not a guarantee a connection is
            // still ours; another waiter or a fresh `acquire` call may win
            // the race, so we loop back to `try_take_idle`/`try_open_new`.
            let _ = rx.await;
        }
    }

    /// Pops one idle connection, recycling it through a ping first if it has
    /// outlived `pool_recycle` (spec 4.8: "optionally ping if `pool_recycle`
    /// expired"). A ping failure discards the connection and frees its slot
    /// for a waiter, then the loop in `acquire_inner` tries again.
    fn try_take_idle(&self) -> Option<PoolConnection> {
        loop {
            let idle = {
                let mut state = self.shared.state.lock().unwrap();
                state.idle.pop_front()?
            };

            if let Some(recycle) = self.shared.pool_options.pool_recycle {
                if idle.since.elapsed() >= recycle {
                    // Dropping `idle.conn` here runs the connection's own
                    // teardown; no graceful COM_QUIT, matching the teacher's
                    // handling of a connection it decides not to keep.
                    self.shared.size.fetch_sub(1, Ordering::SeqCst);
                    continue;
                }
            }

            self.shared.in_use.fetch_add(1, Ordering::SeqCst);
            return Some(PoolConnection {
                conn: Some(idle.conn),
                pool: self.shared.clone(),
            });
        }
    }

    /// Reserves a capacity slot and dials a fresh connection if the pool
    /// hasn't reached `maxsize`. Returns `Ok(None)` when the pool is already
    /// full, so the caller falls back to waiting.
    async fn try_open_new(&self) -> Result<Option<PoolConnection>, Error> {
        let maxsize = self.shared.pool_options.maxsize;

        loop {
            let current = self.shared.size.load(Ordering::SeqCst);
            if current >= maxsize {
                return Ok(None);
            }
            if self
                .shared
                .size
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        match MySqlConnection::connect(self.shared.connect_options.clone()).await {
            Ok(conn) => {
                self.shared.in_use.fetch_add(1, Ordering::SeqCst);
                Ok(Some(PoolConnection {
                    conn: Some(conn),
                    pool: self.shared.clone(),
                }))
            }
            Err(e) => {
                self.shared.size.fetch_sub(1, Ordering::SeqCst);
                self.shared.wake_one_waiter();
                Err(e)
            }
        }
    }

    /// Total connections currently live, idle or checked out.
    pub fn size(&self) -> u32 {
        self.shared.size.load(Ordering::SeqCst)
    }

    /// Connections sitting idle right now.
    pub fn num_idle(&self) -> usize {
        self.shared.state.lock().unwrap().idle.len()
    }

    /// Marks the pool closed, drains and gracefully closes every idle
    /// connection, wakes any remaining waiters (who then observe `closed`
    /// and error out), and waits for outstanding connections to be released
    /// (spec 4.8: "close drains the pool").
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);

        let idle: Vec<MySqlConnection> = {
            let mut state = self.shared.state.lock().unwrap();
            while let Some(tx) = state.waiters.pop_front() {
                let _ = tx.send(());
            }
            state.idle.drain(..).map(|idle| idle.conn).collect()
        };

        for conn in idle {
            let _ = conn.close().await;
            self.shared.size.fetch_sub(1, Ordering::SeqCst);
        }

        while self.shared.in_use.load(Ordering::SeqCst) > 0 {
            tokio::task::yield_now().await;
        }
    }
}

/// A connection checked out of a [`Pool`]. Derefs to [`MySqlConnection`];
/// dropping it returns the connection to the pool rather than closing it
/// (spec 4.8, mirroring `sqlx-core::pool::PoolConnection`'s `Drop`).
pub struct PoolConnection {
    conn: Option<MySqlConnection>,
    pool: Arc<Shared>,
}

impl std::ops::Deref for PoolConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &MySqlConnection {
        self.conn.as_ref().expect("connection taken only on drop")
    }
}

impl std::ops::DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut MySqlConnection {
        self.conn.as_mut().expect("connection taken only on drop")
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Shared {
        Shared {
            connect_options: MySqlConnectOptions::default(),
            pool_options: PoolOptions::default(),
            state: Mutex::new(State::default()),
            in_use: AtomicU32::new(0),
            size: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[test]
    fn wake_one_waiter_skips_cancelled_receivers() {
        let shared = shared();

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();

        {
            let mut state = shared.state.lock().unwrap();
            state.waiters.push_back(tx1);
            state.waiters.push_back(tx2);
        }

        // The first waiter already cancelled its acquire; waking it must fall
        // through to the next one instead of leaking the notification.
        drop(rx1);

        shared.wake_one_waiter();

        assert!(rx2.try_recv().unwrap().is_some());
        assert!(shared.state.lock().unwrap().waiters.is_empty());
    }

    #[test]
    fn wake_one_waiter_is_a_noop_with_no_waiters() {
        let shared = shared();
        shared.wake_one_waiter();
        assert!(shared.state.lock().unwrap().waiters.is_empty());
    }
}
