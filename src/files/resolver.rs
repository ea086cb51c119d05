//! Mapping of request paths onto files below the document root.

use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use thiserror::Error;
use url::Url;

use crate::config::StaticFilesConfig;
use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Used only to run request paths through the WHATWG path parser.
const BASE_URL: &str = "http://localhost/";

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The path tried to leave the document root or is not representable
    #[error("path is not allowed: {0}")]
    Forbidden(String),

    /// Missing or unreadable resource
    #[error("no such resource: {0}")]
    NotFound(String),

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResolveError::Forbidden(_) => StatusCode::BadRequest,
            ResolveError::NotFound(_) => StatusCode::NotFound,
            ResolveError::Io { .. } => StatusCode::InternalServerError,
        }
    }

    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::NotADirectory => ResolveError::NotFound(path.display().to_string()),
            _ => ResolveError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Serves GET requests from a document root.
///
/// The root is canonicalized once at construction; every file that is served
/// must canonicalize to a descendant of it.
#[derive(Debug, Clone)]
pub struct StaticFileResolver {
    root: PathBuf,
    index: String,
    not_found_page: Option<PathBuf>,
    bad_request_page: Option<PathBuf>,
    base: Url,
}

impl StaticFileResolver {
    pub fn new(root: impl AsRef<Path>, index: impl Into<String>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root)
            .with_context(|| format!("document root {} is not accessible", root.display()))?;

        if !canonical.is_dir() {
            anyhow::bail!("document root {} is not a directory", canonical.display());
        }

        Ok(Self {
            root: canonical,
            index: index.into(),
            not_found_page: None,
            bad_request_page: None,
            base: Url::parse(BASE_URL)?,
        })
    }

    pub fn from_config(cfg: &StaticFilesConfig) -> anyhow::Result<Self> {
        let mut resolver = Self::new(&cfg.root, cfg.index.clone())?;
        if let Some(page) = &cfg.not_found_page {
            resolver = resolver.with_not_found_page(page);
        }
        if let Some(page) = &cfg.bad_request_page {
            resolver = resolver.with_bad_request_page(page);
        }
        Ok(resolver)
    }

    /// Body for 404 responses, relative to the root.
    pub fn with_not_found_page(mut self, page: impl AsRef<Path>) -> Self {
        self.not_found_page = Some(self.root.join(page));
        self
    }

    /// Body for 400 responses, relative to the root.
    pub fn with_bad_request_page(mut self, page: impl AsRef<Path>) -> Self {
        self.bad_request_page = Some(self.root.join(page));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Produces the response for a parsed request. Never fails: every
    /// resolution error is turned into the matching error response.
    pub async fn resolve(&self, request: &Request) -> Response {
        if request.method != Method::GET {
            tracing::debug!(method = %request.method, "Method not implemented");
            return Response::not_implemented();
        }

        match self.load(&request.path).await {
            Ok((path, body)) => {
                let content_type = mime::from_path(&path);
                Response::ok(body, content_type.as_ref())
            }
            Err(e) => {
                match &e {
                    ResolveError::NotFound(_) => tracing::debug!(path = %request.path, "{}", e),
                    ResolveError::Forbidden(_) => tracing::warn!(path = %request.path, "{}", e),
                    ResolveError::Io { .. } => tracing::error!(path = %request.path, error = %e, "Failed to read resource"),
                }
                self.error_response(&e).await
            }
        }
    }

    /// The 400 response, using the configured page when it can be read.
    pub async fn bad_request(&self) -> Response {
        page_or(
            self.bad_request_page.as_deref(),
            StatusCode::BadRequest,
            Response::bad_request,
        )
        .await
    }

    /// The 404 response, using the configured page when it can be read.
    pub async fn not_found(&self) -> Response {
        page_or(
            self.not_found_page.as_deref(),
            StatusCode::NotFound,
            Response::not_found,
        )
        .await
    }

    async fn error_response(&self, err: &ResolveError) -> Response {
        match err.status() {
            StatusCode::BadRequest => self.bad_request().await,
            StatusCode::NotFound => self.not_found().await,
            _ => Response::internal_error(),
        }
    }

    /// Maps a request target onto a path below the root without touching
    /// the filesystem.
    ///
    /// Query and fragment are dropped and `/` becomes the index resource.
    /// Dot-segments may move around inside the root but never above it.
    /// Each remaining segment must percent-decode to a single plain path
    /// component.
    pub fn resolve_path(&self, request_path: &str) -> Result<PathBuf, ResolveError> {
        let target = request_path.split(['?', '#']).next().unwrap_or("/");
        let target = if target == "/" {
            format!("/{}", self.index)
        } else {
            target.to_string()
        };

        let forbidden = || ResolveError::Forbidden(request_path.to_string());

        if climbs_above_root(&target) {
            return Err(forbidden());
        }

        let mut url = self.base.clone();
        url.set_path(&target);
        let segments = url.path_segments().ok_or_else(forbidden)?;

        let mut path = self.root.clone();
        for segment in segments.filter(|s| !s.is_empty()) {
            let decoded = percent_decode(segment).ok_or_else(forbidden)?;
            if !is_plain_component(&decoded) {
                return Err(forbidden());
            }
            path.push(decoded);
        }

        Ok(path)
    }

    /// Finds the file to serve and reads it.
    async fn load(&self, request_path: &str) -> Result<(PathBuf, Vec<u8>), ResolveError> {
        let candidate = self.resolve_path(request_path)?;
        let mut path = self.contained(&candidate, request_path).await?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ResolveError::from_io(&path, e))?;

        if meta.is_dir() {
            path = self.contained(&path.join(&self.index), request_path).await?;
        }

        let body = tokio::fs::read(&path)
            .await
            .map_err(|e| ResolveError::from_io(&path, e))?;

        Ok((path, body))
    }

    /// Canonicalizes `path` and checks it is still below the root, which
    /// catches symlinks pointing elsewhere.
    async fn contained(&self, path: &Path, request_path: &str) -> Result<PathBuf, ResolveError> {
        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| ResolveError::from_io(path, e))?;

        if !canonical.starts_with(&self.root) {
            return Err(ResolveError::Forbidden(request_path.to_string()));
        }

        Ok(canonical)
    }
}

/// Whether the dot-segments of `target` ever step above its first segment.
///
/// Segments are split on `/` and `\` and percent-decoded first, so `%2e%2e`
/// counts as `..` the same way the URL path parser treats it.
fn climbs_above_root(target: &str) -> bool {
    let mut depth = 0usize;

    for segment in target.split(['/', '\\']) {
        let decoded = percent_decode(segment);
        match decoded.as_deref().unwrap_or(segment) {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            _ => depth += 1,
        }
    }

    false
}

async fn page_or(page: Option<&Path>, status: StatusCode, fallback: fn() -> Response) -> Response {
    let Some(page) = page else {
        return fallback();
    };

    match tokio::fs::read(page).await {
        Ok(body) => ResponseBuilder::new(status)
            .header("Content-Type", mime::from_path(page).to_string())
            .body(body)
            .build(),
        Err(e) => {
            tracing::warn!(page = %page.display(), error = %e, "Error page unavailable");
            fallback()
        }
    }
}

fn is_plain_component(segment: &str) -> bool {
    if segment.contains(['/', '\\', '\0']) {
        return false;
    }

    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Decodes `%XX` escapes. `None` on malformed escapes or non-UTF-8 output.
fn percent_decode(input: &str) -> Option<String> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();

    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let high = from_hex(bytes.next()?)?;
            let low = from_hex(bytes.next()?)?;
            out.push((high << 4) | low);
        } else {
            out.push(byte);
        }
    }

    String::from_utf8(out).ok()
}

fn from_hex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}
