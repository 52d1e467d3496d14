use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::error::Error;
use crate::options::MySqlConnectOptions;

/// A TCP or (on Unix) local stream socket (spec 6, "Transports").
pub(crate) enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
    /// An in-memory duplex pair standing in for a live server, used to drive
    /// the connection-establishment/auth-dispatch state machine in tests
    /// without a socket.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

impl Socket {
    pub(crate) async fn connect(options: &MySqlConnectOptions) -> Result<Self, Error> {
        match options.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, Self::connect_inner(options)).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into()),
            },
            None => Self::connect_inner(options).await,
        }
    }

    async fn connect_inner(options: &MySqlConnectOptions) -> Result<Self, Error> {
        #[cfg(unix)]
        if let Some(path) = &options.socket {
            let stream = UnixStream::connect(path).await?;
            return Ok(Socket::Unix(stream));
        }

        let stream = TcpStream::connect((options.host.as_str(), options.port)).await?;
        stream.set_nodelay(true)?;
        Ok(Socket::Tcp(stream))
    }

    #[cfg(test)]
    pub(crate) fn mock_pair() -> (Socket, tokio::io::DuplexStream) {
        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        (Socket::Mock(ours), theirs)
    }
}

impl AsyncRead for Socket {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            Socket::Unix(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(test)]
            Socket::Mock(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Socket {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Socket::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            Socket::Unix(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(test)]
            Socket::Mock(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            Socket::Unix(s) => Pin::new(s).poll_flush(cx),
            #[cfg(test)]
            Socket::Mock(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Socket::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            Socket::Unix(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(test)]
            Socket::Mock(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}
