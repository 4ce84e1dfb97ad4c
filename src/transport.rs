//! # Transport — Address-Family-Parameterized Stream Abstraction
//!
//! The reference keeps two largely-duplicated code paths for AF_INET and AF_UNIX. This
//! rewrite picks one `Stream`/`Listener` enum pair instead (§9, open question), so the
//! coordinator and participant code is written once against a single abstraction regardless
//! of which address family [`crate::config::TransportKind`] selects.

use crate::config::{Config, TransportKind};
use crate::error::{CrossValidationError, Result};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Bounded connect retry budget matching the reference (~50 attempts x 100ms).
pub const CONNECT_RETRY_ATTEMPTS: u32 = 50;
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Listener {
    pub async fn bind(cfg: &Config) -> Result<Self> {
        match cfg.transport {
            TransportKind::Tcp => {
                let addr = format!("{}:{}", cfg.server_addr, cfg.server_port);
                let listener = TcpListener::bind(&addr).await?;
                info!(addr, "coordinator listening (tcp)");
                Ok(Listener::Tcp(listener))
            }
            TransportKind::Unix => {
                let _ = std::fs::remove_file(&cfg.socket_path);
                let listener = UnixListener::bind(&cfg.socket_path)?;
                info!(path = %cfg.socket_path.display(), "coordinator listening (unix)");
                Ok(Listener::Unix(listener))
            }
        }
    }

    pub async fn accept(&self) -> Result<Stream> {
        match self {
            Listener::Tcp(l) => {
                let (stream, _) = l.accept().await?;
                Ok(Stream::Tcp(stream))
            }
            Listener::Unix(l) => {
                let (stream, _) = l.accept().await?;
                Ok(Stream::Unix(stream))
            }
        }
    }

    /// Remove the filesystem rendezvous file on clean teardown (P5), no-op for TCP.
    pub fn unbind(&self, cfg: &Config) {
        if cfg.transport == TransportKind::Unix {
            let _ = std::fs::remove_file(&cfg.socket_path);
        }
    }
}

pub enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Stream {
    /// Connect to the coordinator, retrying with bounded backoff (§4.3).
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let mut attempt = 0;
        loop {
            let outcome = match cfg.transport {
                TransportKind::Tcp => {
                    let addr = format!("{}:{}", cfg.server_addr, cfg.server_port);
                    TcpStream::connect(&addr).await.map(Stream::Tcp)
                }
                TransportKind::Unix => UnixStream::connect(&cfg.socket_path).await.map(Stream::Unix),
            };
            match outcome {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    attempt += 1;
                    if attempt >= CONNECT_RETRY_ATTEMPTS {
                        return Err(CrossValidationError::ConnectExhausted { attempts: attempt });
                    }
                    warn!(attempt, error = %e, "connect failed, retrying");
                    sleep(CONNECT_RETRY_INTERVAL).await;
                }
            }
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Stream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Stream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_flush(cx),
            Stream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Stream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Stream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Default AF_UNIX rendezvous path for a given port, used when
/// `CROSS_VALIDATION_SOCKET_PATH` is unset (§4.6).
pub fn default_socket_path(port: u16) -> PathBuf {
    PathBuf::from(format!("/tmp/cross_validation_{port}.sock"))
}
