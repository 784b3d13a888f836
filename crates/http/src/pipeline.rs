//! The request preparation state machine.
//!
//! [`RequestPipeline::prepare`] drives one request through its stages:
//!
//! ```text
//! Start -> UriRaw -> UriClean -> DocRoot -> Physical -> Resolve -> SubrequestStart -> Subrequest -> Done
//! ```
//!
//! The current [`Stage`] lives in the [`RequestContext`], so a stage that
//! answers `Suspend` is re-entered on the next call while everything before
//! it stays committed. Work a stage does before its plugins run is skipped
//! when the stage is resumed.

use http::{Method, StatusCode, Version};
use tracing::{debug, error};

use crate::config::ConfigResolver;
use crate::plugin::{Hook, PluginChain};
use crate::protocol::{HandlerResult, RequestContext, ResolveError};
use crate::resolve::{resolve_physical_path, MetadataLookup};
use crate::uri;

const OPTIONS_ALLOW: &str = "OPTIONS, GET, HEAD, POST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Target decomposition and config resolution.
    Start,
    UriRaw,
    UriClean,
    DocRoot,
    Physical,
    /// Filesystem lookup and PATHINFO split.
    Resolve,
    SubrequestStart,
    Subrequest,
    Done,
}

impl Stage {
    fn next(self) -> Self {
        match self {
            Self::Start => Self::UriRaw,
            Self::UriRaw => Self::UriClean,
            Self::UriClean => Self::DocRoot,
            Self::DocRoot => Self::Physical,
            Self::Physical => Self::Resolve,
            Self::Resolve => Self::SubrequestStart,
            Self::SubrequestStart => Self::Subrequest,
            Self::Subrequest | Self::Done => Self::Done,
        }
    }
}

/// Plugins, metadata collaborator and config resolver shared by every connection.
#[derive(Debug)]
pub struct RequestPipeline<M, C> {
    plugins: PluginChain,
    metadata: M,
    config: C,
}

impl<M, C> RequestPipeline<M, C>
where
    M: MetadataLookup,
    C: ConfigResolver,
{
    pub fn new(plugins: PluginChain, metadata: M, config: C) -> Self {
        Self { plugins, metadata, config }
    }

    pub fn plugins(&self) -> &PluginChain {
        &self.plugins
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Advances the request as far as it can go.
    ///
    /// Returns `Suspend` when a stage is waiting on something external; call
    /// again later to resume it. Any other result is final: `Finished` once
    /// the response is decided (or handed over to a handler), `Fault` after
    /// the response was turned into a `500`.
    pub fn prepare(&self, ctx: &mut RequestContext) -> HandlerResult {
        if ctx.is_direct() && ctx.is_decided() {
            return HandlerResult::Finished;
        }

        loop {
            let stage = ctx.stage;
            if stage == Stage::Done {
                return HandlerResult::Finished;
            }

            match self.run_stage(stage, ctx) {
                HandlerResult::Continue => {
                    ctx.resumed = false;
                    ctx.stage = stage.next();
                }
                HandlerResult::Suspend => {
                    ctx.resumed = true;
                    return HandlerResult::Suspend;
                }
                HandlerResult::Finished => {
                    ctx.resumed = false;
                    ctx.stage = Stage::Done;
                    return HandlerResult::Finished;
                }
                HandlerResult::Fault => {
                    ctx.resumed = false;
                    ctx.stage = Stage::Done;
                    ctx.reject(ResolveError::server_fault(format!("{stage:?} stage failed")));
                    return HandlerResult::Fault;
                }
            }
        }
    }

    fn run_stage(&self, stage: Stage, ctx: &mut RequestContext) -> HandlerResult {
        match stage {
            Stage::Start if ctx.resumed => HandlerResult::Continue,
            Stage::Start => self.start(ctx),
            Stage::UriRaw => self.plugins.call(Hook::UriRaw, ctx),
            Stage::UriClean => match self.plugins.call(Hook::UriClean, ctx) {
                HandlerResult::Continue => after_uri_clean(ctx),
                result => result,
            },
            Stage::DocRoot => {
                if !ctx.resumed {
                    ctx.physical.doc_root.clone_from(&ctx.conf.document_root);
                    ctx.physical.rel_path.clone_from(&ctx.uri.path);
                    log_physical(ctx, "before doc root");
                }
                match self.plugins.call(Hook::DocRoot, ctx) {
                    HandlerResult::Continue => {
                        assemble_physical_path(ctx);
                        HandlerResult::Continue
                    }
                    result => result,
                }
            }
            // the CONNECT authority never went through path normalization
            Stage::Physical if ctx.request.method == Method::CONNECT => HandlerResult::Continue,
            Stage::Physical => match self.plugins.call(Hook::Physical, ctx) {
                HandlerResult::Continue => {
                    log_physical(ctx, "logical -> physical");
                    HandlerResult::Continue
                }
                result => result,
            },
            Stage::Resolve if !ctx.is_direct() => HandlerResult::Continue,
            Stage::Resolve => {
                if ctx.conf.log_request_handling {
                    debug!(path = %ctx.physical.path, "handling physical path");
                }
                resolve_physical_path(ctx, &self.metadata)
            }
            Stage::SubrequestStart if !ctx.is_direct() => HandlerResult::Continue,
            Stage::SubrequestStart => self.subrequest_start(ctx),
            Stage::Subrequest => match self.plugins.call(Hook::Subrequest, ctx) {
                // nobody produced anything more, the request is done
                HandlerResult::Continue => HandlerResult::Finished,
                result => result,
            },
            Stage::Done => HandlerResult::Finished,
        }
    }

    fn start(&self, ctx: &mut RequestContext) -> HandlerResult {
        ctx.conf = self.config.defaults();
        if ctx.conf.log_condition_handling {
            debug!("run condition");
        }

        match uri::decompose(&ctx.request, &ctx.conn.scheme, ctx.conf.parse_options) {
            Ok(parts) => ctx.uri = parts,
            Err(e) => {
                error!(cause = %e, request_target = %ctx.request.target, "invalid request target -> 400");
                return ctx.reject(e.into());
            }
        }

        self.config.resolve(ctx);

        if !ctx.conf.allow_http11 {
            ctx.request.version = Version::HTTP_10;
        }
        ctx.conn.bytes_per_second = ctx.conf.bytes_per_second;

        if ctx.conf.log_request_handling {
            debug!(
                request_target = %ctx.request.target,
                scheme = %ctx.uri.scheme,
                authority = %ctx.uri.authority,
                path_raw = %ctx.uri.path_raw,
                path = %ctx.uri.path,
                query = %ctx.uri.query,
                "splitting request target"
            );
        }

        // max_request_size is in KiB
        let max_size = ctx.conf.max_request_size.saturating_mul(1024);
        if max_size != 0 && ctx.request.content_length > max_size {
            error!(content_length = ctx.request.content_length, max_size, "request size too large -> 413");
            return ctx.reject(ResolveError::payload_too_large(ctx.request.content_length, max_size));
        }

        HandlerResult::Continue
    }

    fn subrequest_start(&self, ctx: &mut RequestContext) -> HandlerResult {
        if ctx.conf.log_request_handling {
            debug!(
                path = %ctx.physical.path,
                uri = %ctx.uri.path,
                pathinfo = %ctx.request.pathinfo,
                "handling subrequest"
            );
        }

        let result = self.plugins.call(Hook::SubrequestStart, ctx);
        if !result.is_continue() {
            if ctx.conf.log_request_handling && !result.is_suspend() {
                debug!("subrequest finished");
            }
            return result;
        }

        // still not claimed, nothing is going to serve it
        if ctx.is_direct() && !ctx.is_decided() {
            let status = if ctx.request.method == Method::OPTIONS { StatusCode::OK } else { StatusCode::FORBIDDEN };
            return ctx.finish(status);
        }

        HandlerResult::Continue
    }
}

fn after_uri_clean(ctx: &mut RequestContext) -> HandlerResult {
    if ctx.request.method == Method::OPTIONS && ctx.uri.path == "*" {
        ctx.response.headers.append("Allow", OPTIONS_ALLOW);
        return ctx.finish(StatusCode::OK);
    }

    if ctx.request.method == Method::CONNECT && ctx.is_direct() {
        return ctx.reject(ResolveError::MethodNotAllowed);
    }

    HandlerResult::Continue
}

fn assemble_physical_path(ctx: &mut RequestContext) {
    if ctx.conf.force_lowercase_filenames {
        ctx.physical.rel_path.make_ascii_lowercase();
    }

    if ctx.server_name.is_empty() {
        ctx.server_name.clone_from(&ctx.uri.authority);
    }

    ctx.physical.basedir.clone_from(&ctx.physical.doc_root);
    ctx.physical.path = join_path(&ctx.physical.doc_root, &ctx.physical.rel_path);

    log_physical(ctx, "after doc root");
}

/// Appends `rel` to `base` with exactly one `/` between them.
fn join_path(base: &str, rel: &str) -> String {
    let mut path = String::with_capacity(base.len() + rel.len() + 1);
    path.push_str(base);
    match (base.ends_with('/'), rel.starts_with('/')) {
        (true, true) => path.push_str(&rel[1..]),
        (false, false) if !base.is_empty() && !rel.is_empty() => {
            path.push('/');
            path.push_str(rel);
        }
        _ => path.push_str(rel),
    }
    path
}

fn log_physical(ctx: &RequestContext, step: &str) {
    if ctx.conf.log_request_handling {
        debug!(
            doc_root = %ctx.physical.doc_root,
            basedir = %ctx.physical.basedir,
            rel_path = %ctx.physical.rel_path,
            path = %ctx.physical.path,
            "{step}"
        );
    }
}
