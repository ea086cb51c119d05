//! Static file serving
//!
//! Resolves GET requests against a document root, guarding against any path
//! that would leave it.

pub mod resolver;

pub use resolver::{ResolveError, StaticFileResolver};
