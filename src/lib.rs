//! Lantern - minimal HTTP/1.1 static file server
//!
//! Core library: connection handling, request framing and parsing,
//! response serialization and docroot resolution.

pub mod config;
pub mod files;
pub mod http;
pub mod server;
