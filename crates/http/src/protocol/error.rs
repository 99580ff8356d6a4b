use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("path must begin with '/': {path}")]
    InvalidPath { path: String },

    #[error("path contains '.' or '..' segment: {path}")]
    PathTraversal { path: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("content-length {length} exceed the limit {max_size}")]
    TooLargeBody { length: u64, max_size: usize },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("stream ended prematurely: {reason}")]
    PrematureEnd { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_path<S: ToString>(path: S) -> Self {
        Self::InvalidPath { path: path.to_string() }
    }

    pub fn path_traversal<S: ToString>(path: S) -> Self {
        Self::PathTraversal { path: path.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(length: u64, max_size: usize) -> Self {
        Self::TooLargeBody { length, max_size }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn premature_end<S: ToString>(str: S) -> Self {
        Self::PrematureEnd { reason: str.to_string() }
    }
}

/// Failure while writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Returned when a status code outside `100..=999` is applied to a response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("status code must be between 100-999 inclusive, got {0}")]
pub struct StatusCodeError(pub u16);
