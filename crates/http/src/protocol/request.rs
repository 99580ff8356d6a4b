//! HTTP request representation.
//!
//! A [`Request`] is assembled exactly once per connection from a parsed
//! [`RequestHead`] and, for `POST`, the raw body. It is immutable afterwards:
//! routing, views and websocket sessions only ever borrow it.

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::protocol::{ParseError, Params};

/// The request line and header block of a request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    full_path: String,
    path_len: usize,
    version: String,
    headers: HeaderMap,
}

impl RequestHead {
    /// Builds a head from an already validated request line and header map.
    ///
    /// `full_path` is split at the first `?`; the part before it is the path.
    pub fn new(method: Method, full_path: String, version: String, headers: HeaderMap) -> Self {
        let path_len = full_path.find('?').unwrap_or(full_path.len());
        Self { method, full_path, path_len, version, headers }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn path(&self) -> &str {
        &self.full_path[..self.path_len]
    }

    /// The query string without the leading `?`, empty when absent.
    pub fn query_string(&self) -> &str {
        self.full_path.get(self.path_len + 1..).unwrap_or("")
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks up a header case-insensitively, skipping values that are not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether a body must be read for this request. Only `POST` carries one.
    pub fn has_body(&self) -> bool {
        self.method == Method::POST
    }
}

/// An immutable, fully parsed HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    head: RequestHead,
    params: Params,
    posts: Params,
    raw_post_data: Option<Bytes>,
}

impl Request {
    /// Attaches the body to a parsed head and decodes the query string and form body.
    ///
    /// The body is only form-decoded when `Content-Type` is exactly
    /// `application/x-www-form-urlencoded`; any other content type leaves the raw
    /// bytes available through [`Request::raw_post_data`].
    pub fn from_parts(head: RequestHead, raw_post_data: Option<Bytes>) -> Result<Self, ParseError> {
        let params = Params::parse(head.query_string().as_bytes())?;

        let posts = match &raw_post_data {
            Some(body) if head.header("content-type") == Some(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()) => {
                Params::parse(body)?
            }
            _ => Params::new(),
        };

        Ok(Self { head, params, posts, raw_post_data })
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    /// The request target including the query string, e.g. `/file.html?param=value`.
    pub fn full_path(&self) -> &str {
        self.head.full_path()
    }

    /// The request target without the query string, e.g. `/file.html`.
    pub fn path(&self) -> &str {
        self.head.path()
    }

    /// The query string, e.g. `param=value`.
    pub fn query_string(&self) -> &str {
        self.head.query_string()
    }

    /// The protocol version token as sent, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn param_multi(&self, key: &str) -> Option<&[String]> {
        self.params.get_all(key)
    }

    pub fn posts(&self) -> &Params {
        &self.posts
    }

    pub fn post(&self, key: &str) -> Option<&str> {
        self.posts.get(key)
    }

    pub fn post_multi(&self, key: &str) -> Option<&[String]> {
        self.posts.get_all(key)
    }

    /// The raw body of a `POST` request, `None` for every other method.
    pub fn raw_post_data(&self) -> Option<&Bytes> {
        self.raw_post_data.as_ref()
    }
}
