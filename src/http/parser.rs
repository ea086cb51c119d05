use std::collections::HashMap;

use thiserror::Error;

use crate::http::request::{Method, Request};

/// Why a message head could not be turned into a [`Request`].
///
/// Every variant is answered with 400 Bad Request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,

    #[error("malformed request line: {0:?}")]
    InvalidRequestLine(String),

    #[error("invalid method token: {0:?}")]
    InvalidMethod(String),

    #[error("request path must start with '/': {0:?}")]
    InvalidPath(String),

    #[error("unsupported http version: {0:?}")]
    InvalidVersion(String),

    #[error("malformed header line: {0:?}")]
    InvalidHeader(String),

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),
}

/// Parses a raw message head (boundary already stripped) into a [`Request`].
///
/// The head is split on `\r\n`; the first line must hold exactly three
/// single-space separated tokens and every following line must be a
/// `name: value` header.
pub fn parse_request_head(raw: &[u8]) -> Result<Request, ParseError> {
    let head = std::str::from_utf8(raw).map_err(|_| ParseError::InvalidEncoding)?;

    let mut lines: Vec<&str> = head.split("\r\n").collect();
    if lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    // Request line
    let request_line = lines[0];
    let parts: Vec<&str> = request_line.split(' ').collect();

    let &[method_str, path, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine(request_line.to_string()));
    };

    if method_str.is_empty() || path.is_empty() || version.is_empty() {
        return Err(ParseError::InvalidRequestLine(request_line.to_string()));
    }

    let method = Method::from_token(method_str)
        .ok_or_else(|| ParseError::InvalidMethod(method_str.to_string()))?;

    if !path.starts_with('/') {
        return Err(ParseError::InvalidPath(path.to_string()));
    }

    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidVersion(version.to_string()));
    }

    // Headers
    let mut headers = HashMap::new();

    for line in &lines[1..] {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader(line.to_string()));
        }

        headers.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
    })
}
