use std::io;

use http::StatusCode;
use thiserror::Error;

/// Reasons a request-target is rejected while it is decomposed and normalized.
///
/// Every variant is a client error answered with `400 Bad Request`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid character in uri: {byte:#04x}")]
    ForbiddenByte { byte: u8 },

    #[error("invalid percent escape at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("encoded slash is not permitted in uri path")]
    EncodedSlash,

    #[error("dot segment is not permitted in uri path")]
    DotSegment,

    #[error("decoded uri path is not valid utf-8")]
    InvalidUtf8,

    #[error("uri path does not begin with '/': {path:?}")]
    RelativePath { path: String },
}

impl NormalizeError {
    pub fn forbidden_byte(byte: u8) -> Self {
        Self::ForbiddenByte { byte }
    }

    pub fn invalid_escape(offset: usize) -> Self {
        Self::InvalidEscape { offset }
    }

    pub fn relative_path<S: ToString>(path: S) -> Self {
        Self::RelativePath { path: path.to_string() }
    }
}

/// Terminal outcomes of request resolution.
///
/// `BadRequest` and `PayloadTooLarge` are the client errors, the remaining
/// variants map to the access, lookup and fault statuses.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("bad request: {source}")]
    BadRequest {
        #[from]
        source: NormalizeError,
    },

    #[error("request body too large, declared {content_length} bytes exceed the limit {max_size}")]
    PayloadTooLarge { content_length: u64, max_size: u64 },

    #[error("access denied: {path}")]
    AccessDenied { path: String },

    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("server fault: {reason}")]
    ServerFault { reason: String },
}

impl ResolveError {
    pub fn payload_too_large(content_length: u64, max_size: u64) -> Self {
        Self::PayloadTooLarge { content_length, max_size }
    }

    pub fn access_denied<S: ToString>(path: S) -> Self {
        Self::AccessDenied { path: path.to_string() }
    }

    pub fn not_found<S: ToString>(path: S) -> Self {
        Self::NotFound { path: path.to_string() }
    }

    pub fn server_fault<S: ToString>(reason: S) -> Self {
        Self::ServerFault { reason: reason.to_string() }
    }

    /// The response status this outcome is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ServerFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true for the 4xx outcomes caused by a malformed request.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest { .. } | Self::PayloadTooLarge { .. })
    }

    /// Returns true when the request framing can no longer be trusted, so the
    /// connection must not be reused.
    #[inline]
    pub fn closes_connection(&self) -> bool {
        self.is_client_error() || matches!(self, Self::MethodNotAllowed)
    }

    /// Returns true when the physical path must not survive this outcome.
    #[inline]
    pub fn resets_physical_path(&self) -> bool {
        matches!(self, Self::AccessDenied { .. } | Self::NotFound { .. } | Self::ServerFault { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
