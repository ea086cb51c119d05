use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{info, Instrument};

use crate::config::Config;
use crate::files::StaticFileResolver;
use crate::http::connection::{Connection, ConnectionOptions};

/// Pause after running out of file descriptors before accepting again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound socket plus everything its connections share.
pub struct Listener {
    listener: TcpListener,
    resolver: Arc<StaticFileResolver>,
    options: ConnectionOptions,
    limiter: Option<Arc<Semaphore>>,
}

/// Binds the configured address and prepares the document root.
///
/// Both must succeed before anything is accepted.
pub async fn bind(cfg: &Config) -> anyhow::Result<Listener> {
    let resolver = StaticFileResolver::from_config(&cfg.static_files)?;

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;

    Ok(Listener {
        listener,
        resolver: Arc::new(resolver),
        options: cfg.connection_options(),
        limiter: cfg
            .server
            .max_connections
            .map(|n| Arc::new(Semaphore::new(n))),
    })
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    bind(cfg).await?.serve().await
}

impl Listener {
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one task each.
    ///
    /// Only returns on an accept error that is not worth retrying.
    pub async fn serve(self) -> anyhow::Result<()> {
        info!(
            addr = %self.local_addr()?,
            root = %self.resolver.root().display(),
            "Listening"
        );

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) => {
                    tracing::warn!(error = %e, "Accept failed, continuing");
                    if is_fd_exhaustion(&e) {
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, shutting down listener");
                    return Err(e).context("failed to accept connection");
                }
            };

            info!("Accepted connection from {}", peer);
            self.spawn(socket, peer);
        }
    }

    fn spawn(&self, socket: TcpStream, peer: SocketAddr) {
        let resolver = self.resolver.clone();
        let options = self.options;
        let limiter = self.limiter.clone();

        let span = tracing::info_span!("conn", %peer);
        tokio::spawn(
            async move {
                // Held until the connection is done.
                let _permit = match limiter {
                    Some(limiter) => match limiter.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return,
                    },
                    None => None,
                };

                let mut conn = Connection::new(socket, resolver).with_options(options);
                if let Err(e) = conn.run().await {
                    if is_peer_disconnect(&e) {
                        tracing::debug!("Connection dropped by {}: {:#}", peer, e);
                    } else {
                        tracing::warn!("Connection error from {}: {:#}", peer, e);
                    }
                }
            }
            .instrument(span),
        );
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) || is_fd_exhaustion(e)
}

// EMFILE / ENFILE
fn is_fd_exhaustion(e: &io::Error) -> bool {
    cfg!(unix) && matches!(e.raw_os_error(), Some(23 | 24))
}

fn is_peer_disconnect(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io| {
            matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionAborted
            )
        })
}
