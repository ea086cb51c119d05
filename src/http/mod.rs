//! HTTP/1.1 wire handling for the static file server.
//!
//! One client socket may carry any number of sequential requests; each is
//! answered in arrival order before the next head is looked at.
//!
//! # Layout
//!
//! - [`buffer`] holds bytes read from the socket and cuts heads at `\r\n\r\n`
//! - [`parser`] turns one framed head into a [`request::Request`]
//! - [`request`] / [`response`] are the message types
//! - [`writer`] puts a [`response::Response`] on the wire
//! - [`mime`] picks a `Content-Type` from a file extension
//! - [`connection`] ties them together per socket
//!
//! # Connection State Machine
//!
//! [`connection::Connection`] cycles through these states:
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Buffer bytes until a full head arrives
//!        └──────┬───────────┘
//!               │ Head framed            (peer close → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsing      │ ← Parse, then resolve against the docroot
//!        └──────┬───────────┘
//!               │ Response ready         (parse error → 400)
//!               ▼
//!        ┌──────────────────┐
//!        │    Responding    │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → AwaitingRequest (same connection)
//!               └─ Connection: close / write error → Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lantern::files::StaticFileResolver;
//! use lantern::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = Arc::new(StaticFileResolver::new("./public", "index.html")?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let resolver = resolver.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, resolver);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod buffer;
pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod mime;
