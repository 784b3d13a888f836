//! Response header serialization.
//!
//! The encoder turns the status and the ordered [`ResponseHeaders`] of a
//! [`RequestContext`] into the wire header block. It is also the last point
//! that decides connection persistence, so it updates the context's
//! [`ConnectionState`] as a side effect:
//!
//! - `Connection` is set to `upgrade`, `close` or `keep-alive` as needed
//! - internal `X-` headers are consumed and never reach the client
//! - `Date` and `Server` are appended when no stage produced them
//!
//! [`ResponseHeaders`]: crate::protocol::ResponseHeaders
//! [`ConnectionState`]: crate::protocol::ConnectionState

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{StatusCode, Version};
use tokio_util::codec::Encoder;
use tracing::debug;

use crate::date::DateCache;
use crate::protocol::{HeaderField, HeaderTags, Mode, RequestContext, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

const INTERNAL_PREFIX: &str = "X-LIGHTTPD-";
const RATE_LIMIT_HEADER: &str = "X-LIGHTTPD-KBytes-per-second";

/// Encoder for the response header block of a [`RequestContext`].
///
/// A context whose status is still undecided is serialized as `500`.
#[derive(Debug, Clone, Copy)]
pub struct HeaderEncoder {
    dates: &'static DateCache,
}

impl HeaderEncoder {
    pub fn new() -> Self {
        Self { dates: DateCache::global() }
    }
}

impl Default for HeaderEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<&mut RequestContext> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, ctx: &mut RequestContext, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        dst.reserve(INIT_HEADER_SIZE);

        let status = ctx.response.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let protocol = if ctx.request.version == Version::HTTP_11 { "HTTP/1.1" } else { "HTTP/1.0" };
        match status.canonical_reason() {
            Some(reason) => write!(FastWrite(dst), "{protocol} {} {reason}", status.as_str())?,
            None => write!(FastWrite(dst), "{protocol} {}", status.as_str())?,
        }

        finalize_keep_alive(ctx);

        let headers = &mut ctx.response.headers;
        if headers.has(HeaderTags::UPGRADE) && ctx.request.version == Version::HTTP_11 {
            headers.set("Connection", "upgrade");
        } else if !ctx.conn.keep_alive {
            headers.set("Connection", "close");
        } else if ctx.request.version == Version::HTTP_10 {
            headers.set("Connection", "keep-alive");
        }

        if status == StatusCode::NOT_MODIFIED && headers.has(HeaderTags::CONTENT_ENCODING) {
            headers.unset("Content-Encoding");
        }

        for field in ctx.response.headers.iter() {
            if !field.is_emittable() {
                continue;
            }
            if field.key().as_bytes()[0] & 0xdf == b'X' && omit_header(field, &mut ctx.conn.bytes_per_second) {
                continue;
            }

            put_line(dst, field.key(), field.value().as_bytes());
        }

        if !ctx.response.headers.has(HeaderTags::DATE) {
            put_line(dst, "Date", &self.dates.now());
        }

        if !ctx.response.headers.has(HeaderTags::SERVER) && !ctx.conf.server_tag.is_empty() {
            put_line(dst, "Server", ctx.conf.server_tag.as_bytes());
        }

        dst.put_slice(b"\r\n\r\n");

        ctx.response.header_len = dst.len() - start;

        if ctx.conf.log_response_header {
            debug!(header = %String::from_utf8_lossy(&dst[start..]), "response header");
        }

        Ok(())
    }
}

/// Settles whether the connection survives this response.
fn finalize_keep_alive(ctx: &mut RequestContext) {
    let conf = &ctx.conf;
    let request = &ctx.request;

    if ctx.conn.request_count > conf.max_keep_alive_requests || conf.max_keep_alive_idle == 0 {
        ctx.conn.keep_alive = false;
    } else if request.content_length != 0
        && request.content_length != request.body_bytes_in
        && (ctx.mode == Mode::Direct || !conf.stream_request_body)
    {
        // unread body bytes would be taken for the next request
        ctx.conn.keep_alive = false;
    } else {
        ctx.conn.keep_alive_idle = conf.max_keep_alive_idle;
    }
}

/// Returns true for internal headers that must not reach the client.
///
/// A rate limit carried by `X-LIGHTTPD-KBytes-per-second` is applied to
/// `bytes_per_second` when it tightens the current cap.
fn omit_header(field: &HeaderField, bytes_per_second: &mut u64) -> bool {
    let key = field.key();
    if key.eq_ignore_ascii_case("X-Sendfile") {
        return true;
    }

    let is_internal = key.get(..INTERNAL_PREFIX.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(INTERNAL_PREFIX));
    if !is_internal {
        return false;
    }

    if key.eq_ignore_ascii_case(RATE_LIMIT_HEADER) {
        let limit = decimal_prefix(field.value()).saturating_mul(1024);
        if let Ok(limit) = u64::try_from(limit) {
            if limit > 0 && (limit < *bytes_per_second || *bytes_per_second == 0) {
                *bytes_per_second = limit;
            }
        }
    }
    true
}

/// Parses the leading decimal integer of `value`, `0` when there is none.
fn decimal_prefix(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));

    if negative { -magnitude } else { magnitude }
}

#[inline]
fn put_line(dst: &mut BytesMut, key: &str, value: &[u8]) {
    dst.put_slice(b"\r\n");
    dst.put_slice(key.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value);
}

/// Fast writer implementation for writing to BytesMut.
///
/// Space is reserved up front, so writes never fail.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::config::RequestConfig;
    use crate::protocol::Request;

    fn context(version: Version, status: StatusCode) -> RequestContext {
        let mut ctx = RequestContext::new("http", RequestConfig::default());
        ctx.begin(Request::new(http::Method::GET, "/", version));
        ctx.conf.server_tag = "micro-httpd".to_string();
        ctx.response.status = Some(status);
        // fixed date keeps the output stable
        ctx.response.headers.append("Date", "Thu, 01 Jan 1970 00:00:00 GMT");
        ctx
    }

    fn encode(ctx: &mut RequestContext) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder::new().encode(ctx, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    fn crlf(text: &str) -> String {
        text.replace('\n', "\r\n")
    }

    #[test]
    fn http11_keep_alive() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.response.headers.append("Content-Length", "5");

        let expected = indoc! {r##"
        HTTP/1.1 200 OK
        Date: Thu, 01 Jan 1970 00:00:00 GMT
        Content-Length: 5
        Server: micro-httpd

        "##};

        assert_eq!(encode(&mut ctx), crlf(expected));
        assert!(ctx.conn.keep_alive);
        assert_eq!(ctx.conn.keep_alive_idle, 5);
        assert_eq!(ctx.response.header_len, crlf(expected).len());
    }

    #[test]
    fn http10_keep_alive_is_explicit() {
        let mut ctx = context(Version::HTTP_10, StatusCode::NOT_FOUND);
        ctx.conn.keep_alive = true;

        let expected = indoc! {r##"
        HTTP/1.0 404 Not Found
        Date: Thu, 01 Jan 1970 00:00:00 GMT
        Connection: keep-alive
        Server: micro-httpd

        "##};

        assert_eq!(encode(&mut ctx), crlf(expected));
    }

    #[test]
    fn request_limit_closes_connection() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.conf.max_keep_alive_requests = 3;
        ctx.conn.request_count = 4;

        let text = encode(&mut ctx);
        assert!(text.contains("\r\nConnection: close\r\n"));
        assert!(!ctx.conn.keep_alive);

        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.conf.max_keep_alive_requests = 3;
        ctx.conn.request_count = 3;

        let text = encode(&mut ctx);
        assert!(!text.contains("Connection"));
        assert!(ctx.conn.keep_alive);
        assert_eq!(ctx.conn.keep_alive_idle, 5);
    }

    #[test]
    fn zero_idle_timeout_closes_connection() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.conf.max_keep_alive_idle = 0;

        assert!(encode(&mut ctx).contains("\r\nConnection: close\r\n"));
        assert!(!ctx.conn.keep_alive);
    }

    #[test]
    fn unread_body_closes_connection() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.request.content_length = 100;
        ctx.request.body_bytes_in = 10;

        encode(&mut ctx);
        assert!(!ctx.conn.keep_alive);

        // a claimed request streaming its body keeps the connection
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.request.content_length = 100;
        ctx.request.body_bytes_in = 10;
        ctx.conf.stream_request_body = true;
        ctx.claim("proxy");

        encode(&mut ctx);
        assert!(ctx.conn.keep_alive);
    }

    #[test]
    fn upgrade_wins_over_close() {
        let mut ctx = context(Version::HTTP_11, StatusCode::SWITCHING_PROTOCOLS);
        ctx.response.headers.append("Upgrade", "websocket");
        ctx.conn.keep_alive = false;

        let text = encode(&mut ctx);
        assert!(text.contains("\r\nConnection: upgrade\r\n"));
        assert!(!text.contains("close"));
    }

    #[test]
    fn existing_connection_header_is_replaced() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.response.headers.append("Connection", "keep-alive");
        ctx.conn.keep_alive = false;

        let text = encode(&mut ctx);
        assert_eq!(text.matches("Connection").count(), 1);
        assert!(text.contains("\r\nConnection: close\r\n"));
    }

    #[test]
    fn not_modified_drops_content_encoding() {
        let mut ctx = context(Version::HTTP_11, StatusCode::NOT_MODIFIED);
        ctx.response.headers.append("Content-Encoding", "gzip");
        ctx.response.headers.append("ETag", "\"abc\"");

        let text = encode(&mut ctx);
        assert!(!text.contains("Content-Encoding"));
        assert!(text.contains("\r\nETag: \"abc\"\r\n"));
    }

    #[test]
    fn internal_headers_are_omitted() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.response.headers.append("X-Sendfile", "/srv/secret");
        ctx.response.headers.append("x-lighttpd-send-file", "/srv/secret");
        ctx.response.headers.append("X-LIGHTTPD-KBytes-per-second", "64");
        ctx.response.headers.append("X-Powered-By", "rust");
        ctx.response.headers.append("X-Empty", "");

        let text = encode(&mut ctx);
        assert!(!text.to_ascii_lowercase().contains("sendfile"));
        assert!(!text.to_ascii_lowercase().contains("lighttpd"));
        assert!(!text.contains("X-Empty"));
        assert!(text.contains("\r\nX-Powered-By: rust\r\n"));
        assert_eq!(ctx.conn.bytes_per_second, 65536);
    }

    #[test]
    fn rate_limit_only_tightens() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.conn.bytes_per_second = 1024;
        ctx.response.headers.append("X-LIGHTTPD-KBytes-per-second", "64");
        encode(&mut ctx);
        assert_eq!(ctx.conn.bytes_per_second, 1024);

        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.response.headers.append("X-LIGHTTPD-KBytes-per-second", "-5");
        encode(&mut ctx);
        assert_eq!(ctx.conn.bytes_per_second, 0);
    }

    #[test]
    fn appends_date_and_omits_empty_server_tag() {
        let mut ctx = RequestContext::new("http", RequestConfig::default());
        ctx.begin(Request::get("/"));
        ctx.conf.server_tag.clear();
        ctx.response.status = Some(StatusCode::NO_CONTENT);

        let text = encode(&mut ctx);
        let date = text.lines().find_map(|line| line.strip_prefix("Date: ")).unwrap();
        assert!(date.ends_with(" GMT"));
        assert!(!text.contains("Server"));
    }

    #[test]
    fn undecided_status_is_server_error() {
        let mut ctx = context(Version::HTTP_11, StatusCode::OK);
        ctx.response.status = None;

        assert!(encode(&mut ctx).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn unknown_status_has_no_reason_phrase() {
        let status = StatusCode::from_u16(599).unwrap();
        let mut ctx = context(Version::HTTP_11, status);

        assert!(encode(&mut ctx).starts_with("HTTP/1.1 599\r\n"));
    }

    #[test]
    fn decimal_prefix_parsing() {
        assert_eq!(decimal_prefix("64"), 64);
        assert_eq!(decimal_prefix("  12abc"), 12);
        assert_eq!(decimal_prefix("-3"), -3);
        assert_eq!(decimal_prefix("abc"), 0);
        assert_eq!(decimal_prefix(""), 0);
    }
}
