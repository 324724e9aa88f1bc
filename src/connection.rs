//! TCP session lifecycle.
//!
//! [`Connection`] is a thin async wrapper around `tokio::net::TcpStream`
//! that speaks the two events the protocol state machine cares about: a
//! chunk of inbound bytes, or the session ending.  All protocol logic lives
//! elsewhere; this module owns only byte I/O and timeouts.
//!
//! There is no in-band end-of-stream marker — the server signals completion
//! by closing the transport.  An idle timeout (no inbound data for the
//! configured duration) is treated identically to a peer-initiated close, so
//! both funnel into [`SessionEvent::Closed`].

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Read buffer size.  Reads usually return far less; the decoder handles any
/// chunking.
const READ_BUF: usize = 4096;

/// Bound on how long a TCP connect may take before the run gives up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can arise from session operations.
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the transport produced when asked for the next event.
#[derive(Debug)]
pub enum SessionEvent {
    /// A chunk of inbound bytes (arbitrarily aligned with record boundaries).
    Data(Vec<u8>),
    /// The session ended: peer close, or idle timeout with no inbound data.
    Closed,
}

/// One live TCP session with the exchange server.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    idle_timeout: Duration,
}

impl Connection {
    /// Open a TCP session to `host:port`.
    ///
    /// Fails with [`ConnError::Connect`] / [`ConnError::ConnectTimeout`] if
    /// the transport cannot be established; the caller decides whether that
    /// is fatal (it is for the initial connect).
    pub async fn connect(host: &str, port: u16, idle_timeout: Duration) -> Result<Self, ConnError> {
        let addr = format!("{host}:{port}");
        let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnError::Connect { addr, source }),
            Err(_elapsed) => {
                return Err(ConnError::ConnectTimeout {
                    addr,
                    timeout: CONNECT_TIMEOUT,
                })
            }
        };
        log::debug!("connected to {addr}");
        Ok(Self {
            stream,
            idle_timeout,
        })
    }

    /// Write one request frame in full.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), ConnError> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Wait for the next session event.
    ///
    /// Suspends until inbound bytes arrive, the peer closes, or the idle
    /// timeout elapses.  Timeout and peer close both yield
    /// [`SessionEvent::Closed`] — the state machine treats them the same.
    pub async fn next_event(&mut self) -> Result<SessionEvent, ConnError> {
        let mut buf = vec![0u8; READ_BUF];
        match timeout(self.idle_timeout, self.stream.read(&mut buf)).await {
            Err(_elapsed) => {
                log::debug!("idle timeout ({:?}) — treating as close", self.idle_timeout);
                Ok(SessionEvent::Closed)
            }
            Ok(Ok(0)) => Ok(SessionEvent::Closed),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(SessionEvent::Data(buf))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn connect_refused_is_an_error() {
        // Bind then drop the listener so the port is (very likely) closed.
        let (listener, port) = listener().await;
        drop(listener);

        let result = Connection::connect("127.0.0.1", port, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn peer_close_yields_closed_event() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            drop(sock); // immediate close
        });

        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        let event = conn.next_event().await.unwrap();
        assert!(matches!(event, SessionEvent::Closed));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn idle_timeout_yields_closed_event() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            // Hold the socket open without sending anything.
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(sock);
        });

        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_millis(50))
            .await
            .unwrap();
        let event = conn.next_event().await.unwrap();
        assert!(matches!(event, SessionEvent::Closed));
        server.abort();
    }

    #[tokio::test]
    async fn data_round_trip() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 2];
            sock.read_exact(&mut req).await.unwrap();
            assert_eq!(req, [1, 0]);
            sock.write_all(b"hello").await.unwrap();
        });

        let mut conn = Connection::connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        conn.send(&[1, 0]).await.unwrap();
        match conn.next_event().await.unwrap() {
            SessionEvent::Data(bytes) => assert_eq!(bytes, b"hello"),
            other => panic!("expected data, got {other:?}"),
        }
        server.await.unwrap();
    }
}
