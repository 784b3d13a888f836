//! Request-target decomposition and normalization.
//!
//! A raw request-target is split into the [`UriParts`] the rest of the
//! pipeline works with:
//!
//! ```text
//! (scheme)://(authority)(path)?(query)#fragment
//! ```
//!
//! The scheme comes from the transport and the authority from the `Host`
//! header. The path goes through two passes: [`normalize_target`] rewrites
//! the raw target per the configured [`ParseOptions`], then the path part is
//! percent-decoded and simplified into `uri.path`.

mod normalize;
mod options;
mod path;

pub use normalize::normalize_target;
pub use normalize::NormalizedTarget;
pub use options::ParseOptions;
pub use path::decode_path;
pub use path::encode_path;
pub use path::merge_slashes;
pub use path::remove_dot_segments;
pub use path::simplify_path;

use http::Method;

use crate::ensure;
use crate::protocol::{NormalizeError, Request, UriParts};

/// Returns true for targets that are not paths and bypass normalization:
/// any CONNECT authority and the `OPTIONS *` asterisk form.
#[inline]
pub fn is_verbatim_target(request: &Request) -> bool {
    request.method == Method::CONNECT || (request.method == Method::OPTIONS && request.target == "*")
}

/// Decomposes a request-target into its URI parts.
///
/// # Errors
///
/// Returns [`NormalizeError`] if the target contains a forbidden byte or a
/// malformed escape, or if the decoded path is not absolute. With
/// [`ParseOptions::PATH_UTF8_REJECT`] a path decoding to invalid UTF-8 is an
/// error too.
pub fn decompose(request: &Request, scheme: &str, options: ParseOptions) -> Result<UriParts, NormalizeError> {
    let mut uri = UriParts {
        scheme: scheme.to_string(),
        authority: request.host.as_deref().unwrap_or_default().to_ascii_lowercase(),
        ..UriParts::default()
    };

    if is_verbatim_target(request) {
        uri.path_raw.clone_from(&request.target);
        uri.path.clone_from(&request.target);
        return Ok(uri);
    }

    let target = normalize_target(&request.target, options)?;
    uri.path_raw = target.path().to_string();
    uri.query = target.query().unwrap_or_default().to_string();
    uri.path = simplify_path(&decode_path(&uri.path_raw, options)?);

    ensure!(uri.path.starts_with('/'), NormalizeError::relative_path(&uri.path));
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use http::Version;

    use super::*;

    fn options() -> ParseOptions {
        ParseOptions::URL_NORMALIZE | ParseOptions::UNRESERVED | ParseOptions::CTRLS_REJECT
    }

    #[test]
    fn decompose_origin_form() {
        let request = Request::get("/docs/a%20b/../c.html?lang=en#intro").with_host("Example.COM:8080");
        let uri = decompose(&request, "https", options()).unwrap();

        assert_eq!(uri.scheme, "https");
        assert_eq!(uri.authority, "example.com:8080");
        assert_eq!(uri.path_raw, "/docs/a%20b/../c.html");
        assert_eq!(uri.path, "/docs/c.html");
        assert_eq!(uri.query, "lang=en");
    }

    #[test]
    fn connect_and_options_asterisk_are_verbatim() {
        let connect = Request::new(Method::CONNECT, "example.com:443", Version::HTTP_11);
        let uri = decompose(&connect, "http", options()).unwrap();
        assert_eq!(uri.path_raw, "example.com:443");
        assert_eq!(uri.path, "example.com:443");
        assert!(uri.query.is_empty());

        let asterisk = Request::new(Method::OPTIONS, "*", Version::HTTP_11);
        let uri = decompose(&asterisk, "http", options()).unwrap();
        assert_eq!(uri.path, "*");
    }

    #[test]
    fn relative_and_empty_paths_are_rejected() {
        let request = Request::get("index.html");
        assert_eq!(decompose(&request, "http", options()), Err(NormalizeError::relative_path("index.html")));

        let request = Request::get("?a=1");
        assert_eq!(decompose(&request, "http", options()), Err(NormalizeError::relative_path("")));
    }

    #[test]
    fn absolute_form_path_is_not_accepted_as_is() {
        let request = Request::get("http://example.com/a");
        assert!(decompose(&request, "http", options()).is_err());
    }

    #[test]
    fn decoded_path_never_leaves_root() {
        for target in ["/../../etc/passwd", "/a/%2e%2e/%2e%2e/b", "/./", "//x//y"] {
            let uri = decompose(&Request::get(target), "http", options()).unwrap();
            assert!(uri.path.starts_with('/'), "{target} -> {}", uri.path);
            assert!(!uri.path.split('/').any(|segment| segment == ".."), "{target} -> {}", uri.path);
        }
    }

    #[test]
    fn latin1_escape_is_kept_escaped() {
        let request = Request::get("/caf%e9.html");
        let uri = decompose(&request, "http", options()).unwrap();
        assert_eq!(uri.path_raw, "/caf%E9.html");
        assert_eq!(uri.path, "/caf%E9.html");

        let strict = options() | ParseOptions::PATH_UTF8_REJECT;
        assert_eq!(decompose(&request, "http", strict), Err(NormalizeError::InvalidUtf8));
    }

    #[test]
    fn missing_host_gives_empty_authority() {
        let uri = decompose(&Request::get("/"), "http", options()).unwrap();
        assert!(uri.authority.is_empty());
    }
}
