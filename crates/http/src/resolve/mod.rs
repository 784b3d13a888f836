//! Physical path resolution and PATHINFO splitting.
//!
//! Once the pipeline has assembled `physical.path` from the document root and
//! the normalized request path, [`resolve_physical_path`] decides what it
//! names:
//!
//! 1. an existing object: go on (or redirect a directory missing its slash)
//! 2. a regular file followed by extra segments: the extra segments become
//!    PATHINFO and both `physical.path` and `uri.path` are shortened
//! 3. nothing: `404`
//!
//! The PATHINFO search walks prefixes left to right from the first `/` past
//! the document root and stops at the first prefix that is not a directory,
//! so no prefix is ever looked up twice.
//!
//! All lookups go through a [`MetadataLookup`]; a [`Lookup::Pending`] answer
//! suspends the request without touching the context, so re-entry simply
//! starts over.

mod fs;
mod metadata;

#[cfg(test)]
pub(crate) mod testing;

pub use fs::FsMetadata;
pub use metadata::Entry;
pub use metadata::EntryKind;
pub use metadata::Lookup;
pub use metadata::LookupError;
pub use metadata::MetadataLookup;

use http::{Method, StatusCode};
use tracing::{debug, info};

use crate::protocol::{HandlerResult, Physical, RequestContext, ResolveError};
use crate::uri::encode_path;

/// Maps the assembled `physical.path` onto the filesystem.
///
/// Returns `Continue` when the request may be handed to a handler, `Suspend`
/// when a lookup is still pending and `Finished` for every terminal outcome.
/// A context whose status is already decided is left untouched.
pub fn resolve_physical_path<M>(ctx: &mut RequestContext, metadata: &M) -> HandlerResult
where
    M: MetadataLookup + ?Sized,
{
    if ctx.is_decided() {
        return HandlerResult::Finished;
    }

    let entry = match metadata.lookup(&ctx.physical.path) {
        Lookup::Pending => return HandlerResult::Suspend,
        Lookup::Ready(Ok(entry)) => entry,
        Lookup::Ready(Err(LookupError::PermissionDenied)) => {
            if ctx.conf.log_request_handling {
                debug!(path = %ctx.physical.path, "access denied");
            }
            return ctx.reject(ResolveError::access_denied(&ctx.physical.path));
        }
        Lookup::Ready(Err(e)) if e.is_missing() => {
            if ctx.request.method == Method::OPTIONS && ctx.response.headers.contains("Allow") {
                return ctx.finish(StatusCode::OK);
            }

            match split_pathinfo(&ctx.physical, metadata) {
                Split::Pending => return HandlerResult::Suspend,
                Split::Found { boundary, entry } => {
                    apply_pathinfo(ctx, boundary);
                    entry
                }
                Split::NotFound => {
                    if ctx.conf.log_file_not_found {
                        info!(uri = %ctx.uri.path, path = %ctx.physical.path, "file not found");
                    }
                    return ctx.reject(ResolveError::not_found(&ctx.physical.path));
                }
            }
        }
        Lookup::Ready(Err(e)) => {
            let reason = format!("lookup of {} failed: {e}", ctx.physical.path);
            return ctx.reject(ResolveError::server_fault(reason));
        }
    };

    if !ctx.conf.follow_symlink && metadata.path_contains_symlink(&ctx.physical.path) {
        if ctx.conf.log_request_handling {
            debug!(path = %ctx.physical.path, "access denied due to symlink restriction");
        }
        return ctx.reject(ResolveError::access_denied(&ctx.physical.path));
    }

    if entry.is_dir() && !ctx.uri.path.ends_with('/') {
        return redirect_to_directory(ctx, StatusCode::MOVED_PERMANENTLY);
    }

    HandlerResult::Continue
}

/// Redirects to the request path with a trailing slash, query preserved.
pub fn redirect_to_directory(ctx: &mut RequestContext, status: StatusCode) -> HandlerResult {
    let host = if ctx.uri.authority.is_empty() { &ctx.server_name } else { &ctx.uri.authority };

    let mut location = String::with_capacity(ctx.uri.path.len() + ctx.uri.query.len() + host.len() + 16);
    if !host.is_empty() {
        location.push_str(if ctx.uri.scheme.is_empty() { "http" } else { &ctx.uri.scheme });
        location.push_str("://");
        location.push_str(host);
    }
    location.push_str(&encode_path(&ctx.uri.path));
    location.push('/');
    if !ctx.uri.query.is_empty() {
        location.push('?');
        location.push_str(&ctx.uri.query);
    }

    ctx.response.headers.set("Location", location);
    ctx.finish(status)
}

enum Split {
    Found { boundary: usize, entry: Entry },
    NotFound,
    Pending,
}

fn split_pathinfo<M>(physical: &Physical, metadata: &M) -> Split
where
    M: MetadataLookup + ?Sized,
{
    let path = physical.path.as_str();
    let mut cursor = pathinfo_candidate(&physical.basedir, path);

    while let Some(boundary) = cursor {
        match metadata.lookup(&path[..boundary]) {
            Lookup::Pending => return Split::Pending,
            // the previous prefix is a directory, which cannot carry PATHINFO
            Lookup::Ready(Err(_)) => return Split::NotFound,
            Lookup::Ready(Ok(entry)) if entry.is_dir() => cursor = next_slash(path, boundary),
            Lookup::Ready(Ok(entry)) if entry.is_file() => return Split::Found { boundary, entry },
            Lookup::Ready(Ok(_)) => return Split::NotFound,
        }
    }

    Split::NotFound
}

/// First `/` of `path` past the document root, where the PATHINFO walk starts.
fn pathinfo_candidate(basedir: &str, path: &str) -> Option<usize> {
    let len = basedir.strip_suffix('/').unwrap_or(basedir).len();
    if path.as_bytes().get(len) != Some(&b'/') {
        return None;
    }
    // a root document root must not become the boundary itself
    if len == 0 {
        return next_slash(path, 0);
    }
    Some(len)
}

#[inline]
fn next_slash(path: &str, from: usize) -> Option<usize> {
    path[from + 1..].find('/').map(|index| from + 1 + index)
}

fn apply_pathinfo(ctx: &mut RequestContext, boundary: usize) {
    let pathinfo = &ctx.physical.path[boundary..];
    let len = pathinfo.len();

    let preserved = if ctx.conf.force_lowercase_filenames { original_case_suffix(&ctx.request.target, pathinfo) } else { None };
    ctx.request.pathinfo = preserved.unwrap_or(pathinfo).to_string();

    let uri_len = ctx.uri.path.len().saturating_sub(len);
    truncate_floor(&mut ctx.uri.path, uri_len);
    ctx.physical.path.truncate(boundary);
}

/// The suffix of the request-target spelling `pathinfo` case-insensitively.
///
/// Only a best effort: any stage that rewrote the target makes this miss and
/// the decoded PATHINFO is used instead.
fn original_case_suffix<'a>(target: &'a str, pathinfo: &str) -> Option<&'a str> {
    let start = target.len().checked_sub(pathinfo.len())?;
    let suffix = target.get(start..)?;
    suffix.eq_ignore_ascii_case(pathinfo).then_some(suffix)
}

fn truncate_floor(s: &mut String, mut len: usize) {
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    s.truncate(len);
}
