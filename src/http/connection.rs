use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::files::StaticFileResolver;
use crate::http::buffer::{RawHead, StreamBuffer, READ_CHUNK_SIZE};
use crate::http::parser::parse_request_head;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!("lantern/", env!("CARGO_PKG_VERSION"));

/// Default cap on a buffered request head, and on a request body.
pub const DEFAULT_MAX_HEAD_SIZE: usize = 64 * 1024;

/// Per-connection limits, shared read-only by every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Give up on a read that stays silent this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub max_head_size: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
        }
    }
}

pub struct Connection<S> {
    stream: S,
    buffer: StreamBuffer,
    resolver: Arc<StaticFileResolver>,
    options: ConnectionOptions,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    AwaitingRequest,
    Parsing(RawHead),
    Responding(ResponseWriter, bool), // bool = close after writing?
    Closed,
}

enum ReadOutcome {
    Head(RawHead),
    Closed,
    TimedOut,
    TooLarge,
}

enum Fill {
    Data,
    Eof,
    TimedOut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, resolver: Arc<StaticFileResolver>) -> Self {
        Self {
            stream,
            buffer: StreamBuffer::new(),
            resolver,
            options: ConnectionOptions::default(),
            state: ConnectionState::AwaitingRequest,
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Drives the connection until the peer goes away.
    ///
    /// An I/O error leaves the connection `Closed` and is returned to the
    /// caller; protocol errors are answered on the wire instead.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::AwaitingRequest => match self.read_head().await? {
                    ReadOutcome::Head(head) => ConnectionState::Parsing(head),

                    ReadOutcome::Closed => {
                        if self.buffer.is_empty() {
                            tracing::debug!("Peer closed connection");
                        } else {
                            tracing::debug!(
                                pending = self.buffer.len(),
                                "Peer closed mid-request, discarding partial head"
                            );
                        }
                        ConnectionState::Closed
                    }

                    ReadOutcome::TimedOut if self.buffer.is_empty() => {
                        tracing::debug!("Idle timeout, closing");
                        ConnectionState::Closed
                    }

                    ReadOutcome::TimedOut => {
                        tracing::warn!(pending = self.buffer.len(), "Timed out waiting for request head");
                        Self::respond(self.resolver.bad_request().await, true)
                    }

                    ReadOutcome::TooLarge => {
                        tracing::warn!(
                            limit = self.options.max_head_size,
                            "Request head too large"
                        );
                        Self::respond(self.resolver.bad_request().await, true)
                    }
                },

                ConnectionState::Parsing(head) => self.process(head).await?,

                ConnectionState::Responding(mut writer, close) => {
                    writer
                        .write_to_stream(&mut self.stream)
                        .await
                        .context("failed to write response")?;

                    if close {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::AwaitingRequest // go back for next request
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    async fn process(&mut self, head: RawHead) -> anyhow::Result<ConnectionState> {
        let mut request = match parse_request_head(&head.bytes) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Bad request");
                return Ok(Self::respond(self.resolver.bad_request().await, false));
            }
        };

        // Without chunked decoding there is no way to find the next request.
        if request.header("Transfer-Encoding").is_some() {
            tracing::warn!("Transfer-Encoding is not supported, closing");
            return Ok(Self::respond(Response::not_implemented(), true));
        }

        let length = match request.content_length() {
            Ok(length) if length <= self.options.max_head_size => length,
            Ok(length) => {
                tracing::warn!(length, limit = self.options.max_head_size, "Request body too large");
                return Ok(Self::respond(self.resolver.bad_request().await, true));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bad request");
                return Ok(Self::respond(self.resolver.bad_request().await, true));
            }
        };

        if length > 0 {
            match self.read_body(length).await? {
                Some(body) => request.body = body.to_vec(),
                None => {
                    tracing::debug!(expected = length, "Peer closed mid-body");
                    return Ok(ConnectionState::Closed);
                }
            }
        }

        let response = self.resolver.resolve(&request).await;

        let status = response.status.as_u16();
        if response.status.is_server_error() {
            tracing::error!(method = %request.method, path = %request.path, status, "Request failed");
        } else {
            tracing::info!(method = %request.method, path = %request.path, status, "Request served");
        }

        Ok(Self::respond(response, !request.keep_alive()))
    }

    fn respond(mut response: Response, close: bool) -> ConnectionState {
        response.set_header("Server", SERVER_NAME);
        if close {
            response.set_header("Connection", "close");
        }

        ConnectionState::Responding(ResponseWriter::new(&response), close)
    }

    async fn read_head(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try framing whatever we already have
            if let Some(head) = self.buffer.try_extract_head() {
                return Ok(ReadOutcome::Head(head));
            }

            if self.buffer.len() > self.options.max_head_size {
                return Ok(ReadOutcome::TooLarge);
            }

            match self.fill().await? {
                Fill::Data => {}
                Fill::Eof => return Ok(ReadOutcome::Closed),
                Fill::TimedOut => return Ok(ReadOutcome::TimedOut),
            }
        }
    }

    async fn read_body(&mut self, length: usize) -> anyhow::Result<Option<Bytes>> {
        loop {
            if let Some(body) = self.buffer.take(length) {
                return Ok(Some(body));
            }

            match self.fill().await? {
                Fill::Data => {}
                Fill::Eof | Fill::TimedOut => return Ok(None),
            }
        }
    }

    /// Reads one bounded chunk from the peer into the buffer.
    async fn fill(&mut self) -> anyhow::Result<Fill> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = self.stream.read(&mut chunk);

        let result = match self.options.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => return Ok(Fill::TimedOut),
            },
            None => read.await,
        };

        let n = result.context("failed to read from peer")?;
        if n == 0 {
            // Client closed connection
            return Ok(Fill::Eof);
        }

        self.buffer.feed(&chunk[..n]);
        Ok(Fill::Data)
    }
}
