//! HTTP response builder.
//!
//! A [`Response`] stays mutable until it is handed to the
//! [`ResponseEncoder`](crate::codec::ResponseEncoder). Headers are kept in an
//! ordered table so they are written back in the order they were set, with the
//! casing of the most recent `set_header` call.

use std::fmt;

use bytes::{BufMut, BytesMut};
use http::{StatusCode, header};

use crate::protocol::error_page::{DefaultErrorRenderer, ErrorPage, ErrorRenderer};
use crate::protocol::StatusCodeError;

/// One entry of the response header table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    key: String,
    value: String,
}

impl HeaderEntry {
    /// The header name with the casing it was last set with.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A mutable HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<HeaderEntry>,
    body: BytesMut,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// An empty `200 OK` response with an HTML content type.
    pub fn new() -> Self {
        Self::with_content_type("", mime::TEXT_HTML_UTF_8.as_ref())
    }

    /// A `200 OK` HTML response whose body is `content`.
    pub fn html<S: AsRef<str>>(content: S) -> Self {
        Self::with_content_type(content, mime::TEXT_HTML_UTF_8.as_ref())
    }

    pub fn with_content_type<S: AsRef<str>>(content: S, content_type: &str) -> Self {
        let mut response = Self::empty();
        response.set_header("Content-Type", content_type);
        response.write_str(content.as_ref());
        response
    }

    /// A `200 OK` response without any header.
    pub fn empty() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: BytesMut::new() }
    }

    /// Builds the built-in error page for `status`.
    pub fn error(status: StatusCode) -> Self {
        Self::error_with(&DefaultErrorRenderer, status)
    }

    /// Builds an error page for `status` using a custom renderer.
    pub fn error_with(renderer: &dyn ErrorRenderer, status: StatusCode) -> Self {
        let page = ErrorPage::new(status.as_u16(), reason_phrase(status.as_u16()));
        let mut response = Self::html(renderer.render(&page));
        response.status = status;
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the numeric status code, which must lie in `100..=999`.
    pub fn set_status(&mut self, code: u16) -> Result<(), StatusCodeError> {
        self.status = StatusCode::from_u16(code).map_err(|_| StatusCodeError(code))?;
        Ok(())
    }

    pub fn set_status_code(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The reason phrase written on the status line.
    pub fn status_message(&self) -> &'static str {
        reason_phrase(self.status.as_u16())
    }

    /// Sets a header, replacing any previous value regardless of its casing.
    pub fn set_header<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(index) => self.headers[index] = HeaderEntry { key, value },
            None => self.headers.push(HeaderEntry { key, value }),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.position(key).map(|index| self.headers[index].value.as_str())
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Removes a header, returning its value if it was set.
    pub fn delete_header(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|index| self.headers.remove(index).value)
    }

    /// Iterates over the headers in insertion order.
    pub fn headers(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.headers.iter()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.headers.iter().position(|entry| entry.key.eq_ignore_ascii_case(key))
    }

    /// Appends raw bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.put_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.body.put_slice(s.as_bytes());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sets `Connection: close` unless a `Connection` header is already present.
    ///
    /// Safe to call more than once.
    pub fn prepare(&mut self) {
        if !self.has_header(header::CONNECTION.as_str()) {
            self.set_header("Connection", "close");
        }
    }
}

impl fmt::Write for Response {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Response::write_str(self, s);
        Ok(())
    }
}

/// Returns the reason phrase for `code`, or `Unknown Error` for codes outside the table.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "Switch Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "Unknown Error",
    }
}
