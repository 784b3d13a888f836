//! Per-request state shared by every stage of request resolution.
//!
//! A [`RequestContext`] lives as long as its connection. It is reset at the
//! start of each fresh request and survives suspend/resume cycles untouched,
//! so every stage can pick up exactly where the previous turn stopped.

use http::{Method, StatusCode, Version};
use tracing::error;

use crate::config::RequestConfig;
use crate::pipeline::Stage;
use crate::plugin::Hook;
use crate::protocol::{HandlerResult, ResolveError, ResponseHeaders};

/// The pre-parsed request line and the framing facts the core needs.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// The request-target exactly as received.
    pub target: String,
    pub version: Version,
    /// The `Host` header value, if any.
    pub host: Option<String>,
    /// Declared body length, `0` when the request has no body.
    pub content_length: u64,
    /// Body bytes received so far.
    pub body_bytes_in: u64,
    /// Whether the client asked for a persistent connection.
    pub keep_alive: bool,
    /// Trailing path beyond the resolved filesystem object.
    pub pathinfo: String,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>, version: Version) -> Self {
        Self {
            method,
            target: target.into(),
            version,
            host: None,
            content_length: 0,
            body_bytes_in: 0,
            keep_alive: version == Version::HTTP_11,
            pathinfo: String::new(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target, Version::HTTP_11)
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_content_length(mut self, content_length: u64, body_bytes_in: u64) -> Self {
        self.content_length = content_length;
        self.body_bytes_in = body_bytes_in;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::get("/")
    }
}

/// The request-target decomposed into its RFC 3986 parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriParts {
    pub scheme: String,
    /// The lowercased host the request was addressed to.
    pub authority: String,
    /// Path before percent-decoding.
    pub path_raw: String,
    /// Decoded and simplified path.
    pub path: String,
    pub query: String,
}

/// Filesystem side of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Physical {
    pub doc_root: String,
    /// Copy of `doc_root` taken when the physical path was assembled.
    pub basedir: String,
    pub rel_path: String,
    pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct Response {
    /// `None` until some stage decides the outcome.
    pub status: Option<StatusCode>,
    pub headers: ResponseHeaders,
    pub finished: bool,
    /// Length of the serialized header block.
    pub header_len: usize,
}

/// Connection persistence bookkeeping, kept across pipelined requests.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Transport scheme, `http` or `https`.
    pub scheme: String,
    pub keep_alive: bool,
    /// Idle timeout armed for the next request, in seconds.
    pub keep_alive_idle: u32,
    /// Number of requests started on this connection, the current one included.
    pub request_count: u32,
    /// Byte-rate cap, `0` meaning no cap.
    pub bytes_per_second: u64,
}

impl ConnectionState {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self { scheme: scheme.into(), keep_alive: true, keep_alive_idle: 0, request_count: 0, bytes_per_second: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal resolution against the filesystem.
    Direct,
    /// A handler plugin has taken over the request.
    Claimed(&'static str),
}

#[derive(Debug)]
pub struct RequestContext {
    pub request: Request,
    pub uri: UriParts,
    pub physical: Physical,
    pub response: Response,
    pub conn: ConnectionState,
    pub conf: RequestConfig,
    pub mode: Mode,
    /// Name the request is served under; doc-root hooks may set it.
    pub server_name: String,
    pub(crate) stage: Stage,
    /// Hook and plugin index a suspended chain resumes at.
    pub(crate) suspended_hook: Option<(Hook, usize)>,
    pub(crate) resumed: bool,
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, conf: RequestConfig) -> Self {
        Self {
            request: Request::default(),
            uri: UriParts::default(),
            physical: Physical::default(),
            response: Response::default(),
            conn: ConnectionState::new(scheme),
            conf,
            mode: Mode::Direct,
            server_name: String::new(),
            stage: Stage::Start,
            suspended_hook: None,
            resumed: false,
        }
    }

    /// Starts a fresh request on this connection.
    pub fn begin(&mut self, request: Request) {
        self.reset();
        self.conn.keep_alive = request.keep_alive;
        self.conn.request_count = self.conn.request_count.saturating_add(1);
        self.request = request;
    }

    /// Clears every per-request field. Connection state and the last resolved
    /// configuration are kept.
    pub fn reset(&mut self) {
        self.request = Request::default();
        self.uri = UriParts::default();
        self.physical = Physical::default();
        self.response = Response::default();
        self.mode = Mode::Direct;
        self.server_name.clear();
        self.stage = Stage::Start;
        self.suspended_hook = None;
        self.resumed = false;
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns true while a suspended stage is being re-entered.
    #[inline]
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.mode == Mode::Direct
    }

    /// Returns true once some stage has decided the response status.
    #[inline]
    pub fn is_decided(&self) -> bool {
        self.response.status.is_some()
    }

    /// Hands the request over to a handler plugin.
    pub fn claim(&mut self, handler: &'static str) {
        self.mode = Mode::Claimed(handler);
    }

    /// Decides the response with the given status.
    pub fn finish(&mut self, status: StatusCode) -> HandlerResult {
        self.response.status = Some(status);
        self.response.finished = true;
        HandlerResult::Finished
    }

    /// Decides the response from a terminal resolution outcome.
    pub fn reject(&mut self, error: ResolveError) -> HandlerResult {
        if let ResolveError::ServerFault { .. } = error {
            error!(cause = %error, uri = %self.uri.path, path = %self.physical.path, "request failed");
        }
        if error.closes_connection() {
            self.conn.keep_alive = false;
        }
        if error.resets_physical_path() {
            self.physical.path.clear();
        }
        self.finish(error.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NormalizeError;

    fn context() -> RequestContext {
        RequestContext::new("http", RequestConfig::default())
    }

    #[test]
    fn begin_counts_requests_and_resets_state() {
        let mut ctx = context();
        ctx.begin(Request::get("/a"));
        ctx.uri.path = "/a".to_string();
        ctx.response.headers.append("Allow", "GET");
        ctx.claim("proxy");
        ctx.resumed = true;

        ctx.begin(Request::get("/b"));

        assert_eq!(ctx.conn.request_count, 2);
        assert_eq!(ctx.request.target, "/b");
        assert!(ctx.uri.path.is_empty());
        assert!(ctx.response.headers.is_empty());
        assert!(ctx.is_direct());
        assert!(!ctx.is_resumed());
        assert_eq!(ctx.stage(), Stage::Start);
    }

    #[test]
    fn begin_takes_keep_alive_from_request() {
        let mut ctx = context();
        ctx.begin(Request::new(Method::GET, "/", Version::HTTP_10));
        assert!(!ctx.conn.keep_alive);

        ctx.begin(Request::get("/"));
        assert!(ctx.conn.keep_alive);
    }

    #[test]
    fn reject_applies_error_side_effects() {
        let mut ctx = context();
        ctx.physical.path = "/srv/a".to_string();

        let result = ctx.reject(ResolveError::from(NormalizeError::DotSegment));
        assert_eq!(result, HandlerResult::Finished);
        assert_eq!(ctx.response.status, Some(StatusCode::BAD_REQUEST));
        assert!(ctx.response.finished);
        assert!(!ctx.conn.keep_alive);
        assert_eq!(ctx.physical.path, "/srv/a");

        let mut ctx = context();
        ctx.physical.path = "/srv/a".to_string();
        ctx.reject(ResolveError::not_found("/srv/a"));
        assert!(ctx.physical.path.is_empty());
        assert!(ctx.conn.keep_alive);
    }
}
