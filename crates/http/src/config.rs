//! Server configuration and the condition-resolver seam.
//!
//! [`ServerConfig`] is the deserializable, file-facing shape. Each request
//! works on a [`RequestConfig`] snapshot which a [`ConfigResolver`] may patch
//! once the request's URI fields are known.

use serde::{Deserialize, Serialize};

use crate::protocol::RequestContext;
use crate::uri::ParseOptions;

/// Root configuration of the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base directory request paths resolve under.
    pub document_root: String,

    /// Request-target normalization switches.
    pub url_normalize: UrlNormalizeConfig,

    /// Lowercase the relative path before it hits the filesystem.
    pub force_lowercase_filenames: bool,

    /// Permit serving through symbolic links.
    pub follow_symlink: bool,

    /// Requests served on one connection before it is closed.
    pub max_keep_alive_requests: u32,

    /// Idle seconds a persistent connection may wait for the next request, `0` disables keep-alive.
    pub max_keep_alive_idle: u32,

    /// Maximum declared request body size in KiB, `0` meaning unlimited.
    pub max_request_size: u64,

    /// Answer HTTP/1.1 requests as HTTP/1.1; otherwise everything is downgraded to HTTP/1.0.
    pub allow_http11: bool,

    /// Value of the `Server` response header, empty to omit it.
    pub server_tag: String,

    /// Request bodies are streamed to handlers instead of buffered.
    pub stream_request_body: bool,

    /// Initial byte-rate cap per connection, `0` meaning no cap.
    pub bytes_per_second: u64,

    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_root: "/var/www".to_string(),
            url_normalize: UrlNormalizeConfig::default(),
            force_lowercase_filenames: false,
            follow_symlink: true,
            max_keep_alive_requests: 100,
            max_keep_alive_idle: 5,
            max_request_size: 0,
            allow_http11: true,
            server_tag: concat!("micro-httpd/", env!("CARGO_PKG_VERSION")).to_string(),
            stream_request_body: false,
            bytes_per_second: 0,
            log: LogConfig::default(),
        }
    }
}

/// Request-target normalization switches, see [`ParseOptions`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UrlNormalizeConfig {
    pub enabled: bool,
    pub decode_unreserved: bool,
    pub reject_ctrls: bool,
    pub backslash_trans: bool,
    pub decode_2f: bool,
    pub reject_2f: bool,
    pub remove_dot_segments: bool,
    pub reject_dot_segments: bool,
    pub merge_slashes: bool,
    pub query_20_plus: bool,
    pub reject_invalid_utf8: bool,
}

impl Default for UrlNormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decode_unreserved: true,
            reject_ctrls: true,
            backslash_trans: false,
            decode_2f: false,
            reject_2f: false,
            remove_dot_segments: false,
            reject_dot_segments: false,
            merge_slashes: false,
            query_20_plus: false,
            reject_invalid_utf8: false,
        }
    }
}

impl UrlNormalizeConfig {
    pub fn options(&self) -> ParseOptions {
        let switches = [
            (self.enabled, ParseOptions::URL_NORMALIZE),
            (self.decode_unreserved, ParseOptions::UNRESERVED),
            (self.reject_ctrls, ParseOptions::CTRLS_REJECT),
            (self.backslash_trans, ParseOptions::PATH_BACKSLASH_TRANS),
            (self.decode_2f, ParseOptions::PATH_2F_DECODE),
            (self.reject_2f, ParseOptions::PATH_2F_REJECT),
            (self.remove_dot_segments, ParseOptions::PATH_DOTSEG_REMOVE),
            (self.reject_dot_segments, ParseOptions::PATH_DOTSEG_REJECT),
            (self.merge_slashes, ParseOptions::PATH_MERGE_SLASHES),
            (self.query_20_plus, ParseOptions::QUERY_20_PLUS),
            (self.reject_invalid_utf8, ParseOptions::PATH_UTF8_REJECT),
        ];

        switches
            .into_iter()
            .filter(|(on, _)| *on)
            .fold(ParseOptions::empty(), |options, (_, option)| options | option)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub request_handling: bool,
    pub condition_handling: bool,
    pub file_not_found: bool,
    pub response_header: bool,
}

/// The settings in effect for one request.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub document_root: String,
    pub parse_options: ParseOptions,
    pub force_lowercase_filenames: bool,
    pub follow_symlink: bool,
    pub max_keep_alive_requests: u32,
    pub max_keep_alive_idle: u32,
    pub max_request_size: u64,
    pub allow_http11: bool,
    pub server_tag: String,
    pub stream_request_body: bool,
    pub bytes_per_second: u64,
    pub log_request_handling: bool,
    pub log_condition_handling: bool,
    pub log_file_not_found: bool,
    pub log_response_header: bool,
}

impl From<&ServerConfig> for RequestConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            document_root: config.document_root.clone(),
            parse_options: config.url_normalize.options(),
            force_lowercase_filenames: config.force_lowercase_filenames,
            follow_symlink: config.follow_symlink,
            max_keep_alive_requests: config.max_keep_alive_requests,
            max_keep_alive_idle: config.max_keep_alive_idle,
            max_request_size: config.max_request_size,
            allow_http11: config.allow_http11,
            server_tag: config.server_tag.clone(),
            stream_request_body: config.stream_request_body,
            bytes_per_second: config.bytes_per_second,
            log_request_handling: config.log.request_handling,
            log_condition_handling: config.log.condition_handling,
            log_file_not_found: config.log.file_not_found,
            log_response_header: config.log.response_header,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Selects the configuration a request runs with.
///
/// `defaults` is applied at the start of every fresh request, before the
/// request-target is normalized. `resolve` runs once the URI fields are
/// populated and may patch any setting based on request attributes.
pub trait ConfigResolver: Send + Sync {
    fn defaults(&self) -> RequestConfig;

    fn resolve(&self, ctx: &mut RequestContext);
}

/// Applies one [`ServerConfig`] to every request.
#[derive(Debug, Clone)]
pub struct StaticConfigResolver {
    config: RequestConfig,
}

impl StaticConfigResolver {
    pub fn new(config: &ServerConfig) -> Self {
        Self { config: RequestConfig::from(config) }
    }
}

impl ConfigResolver for StaticConfigResolver {
    fn defaults(&self) -> RequestConfig {
        self.config.clone()
    }

    fn resolve(&self, _ctx: &mut RequestContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = UrlNormalizeConfig::default().options();
        assert!(options.contains(ParseOptions::URL_NORMALIZE));
        assert!(options.contains(ParseOptions::UNRESERVED));
        assert!(options.contains(ParseOptions::CTRLS_REJECT));
        assert!(!options.contains(ParseOptions::PATH_DOTSEG_REMOVE));
        assert!(!options.contains(ParseOptions::PATH_UTF8_REJECT));

        let strict = UrlNormalizeConfig { reject_invalid_utf8: true, ..UrlNormalizeConfig::default() };
        assert!(strict.options().contains(ParseOptions::PATH_UTF8_REJECT));
    }

    #[test]
    fn deserialize_partial_config() {
        let json = r#"{
            "document_root": "/srv",
            "max_keep_alive_requests": 16,
            "url_normalize": { "remove_dot_segments": true },
            "log": { "request_handling": true }
        }"#;

        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.document_root, "/srv");
        assert_eq!(config.max_keep_alive_requests, 16);
        assert_eq!(config.max_keep_alive_idle, 5);
        assert!(config.follow_symlink);

        let request_config = RequestConfig::from(&config);
        assert!(request_config.parse_options.contains(ParseOptions::PATH_DOTSEG_REMOVE));
        assert!(request_config.parse_options.contains(ParseOptions::URL_NORMALIZE));
        assert!(request_config.log_request_handling);
        assert!(!request_config.log_response_header);
    }

    #[test]
    fn static_resolver_hands_out_its_config() {
        let config = ServerConfig { document_root: "/srv".to_string(), ..ServerConfig::default() };
        let resolver = StaticConfigResolver::new(&config);
        assert_eq!(resolver.defaults().document_root, "/srv");
    }
}
