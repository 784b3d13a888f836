use crate::protocol::NormalizeError;
use crate::uri::path::{has_dot_segment, hex_pair, is_ctrl, is_unreserved, merge_slashes, remove_dot_segments, HEX_UPPER};
use crate::uri::ParseOptions;

/// A request-target with its fragment dropped and its escapes canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTarget {
    target: String,
    query_start: Option<usize>,
}

impl NormalizedTarget {
    /// The path part, before the first unescaped `?`.
    pub fn path(&self) -> &str {
        match self.query_start {
            Some(index) => &self.target[..index],
            None => &self.target,
        }
    }

    /// The query part, after the first unescaped `?`.
    pub fn query(&self) -> Option<&str> {
        self.query_start.map(|index| &self.target[index + 1..])
    }

    pub fn as_str(&self) -> &str {
        &self.target
    }
}

/// Normalizes a raw request-target according to `options`.
///
/// The fragment is always discarded. Without [`ParseOptions::URL_NORMALIZE`]
/// the target is only split at the first `?`; with it every escape is
/// validated and the path is rewritten per the remaining options. The output
/// is pure ASCII: raw non-ASCII bytes are percent-encoded.
pub fn normalize_target(target: &str, options: ParseOptions) -> Result<NormalizedTarget, NormalizeError> {
    let target = target.find('#').map_or(target, |index| &target[..index]);

    if !options.contains(ParseOptions::URL_NORMALIZE) {
        return Ok(NormalizedTarget { target: target.to_string(), query_start: target.find('?') });
    }

    let reject_ctrls = options.contains(ParseOptions::CTRLS_REJECT);
    let bytes = target.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 8);
    let mut query_start: Option<usize> = None;

    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        let in_path = query_start.is_none();

        match byte {
            b'%' => {
                let value = hex_pair(bytes, index).ok_or(NormalizeError::invalid_escape(index))?;
                index += 3;

                if reject_ctrls && is_ctrl(value) {
                    return Err(NormalizeError::forbidden_byte(value));
                }

                if in_path && value == b'/' {
                    if options.contains(ParseOptions::PATH_2F_REJECT) {
                        return Err(NormalizeError::EncodedSlash);
                    }
                    if options.contains(ParseOptions::PATH_2F_DECODE) {
                        out.push(b'/');
                        continue;
                    }
                }

                if !in_path && value == b' ' && options.contains(ParseOptions::QUERY_20_PLUS) {
                    out.push(b'+');
                } else if options.contains(ParseOptions::UNRESERVED) && is_unreserved(value) {
                    out.push(value);
                } else {
                    push_escaped(&mut out, value);
                }
                continue;
            }
            b'?' if in_path => {
                query_start = Some(out.len());
                out.push(b'?');
            }
            b'\\' if in_path && options.contains(ParseOptions::PATH_BACKSLASH_TRANS) => out.push(b'/'),
            byte if is_ctrl(byte) && reject_ctrls => return Err(NormalizeError::forbidden_byte(byte)),
            byte if !byte.is_ascii() => push_escaped(&mut out, byte),
            byte => out.push(byte),
        }
        index += 1;
    }

    // every byte written above is ASCII
    let Ok(normalized) = String::from_utf8(out) else {
        return Err(NormalizeError::InvalidUtf8);
    };

    let (path, query) = match query_start {
        Some(index) => normalized.split_at(index),
        None => (normalized.as_str(), ""),
    };

    let mut path = path.to_string();
    if options.contains(ParseOptions::PATH_DOTSEG_REJECT) {
        if has_dot_segment(&path) {
            return Err(NormalizeError::DotSegment);
        }
    } else if options.contains(ParseOptions::PATH_DOTSEG_REMOVE) {
        path = remove_dot_segments(&path);
    }
    if options.contains(ParseOptions::PATH_MERGE_SLASHES) {
        path = merge_slashes(&path);
    }

    let query_start = query_start.map(|_| path.len());
    path.push_str(query);
    Ok(NormalizedTarget { target: path, query_start })
}

fn push_escaped(out: &mut Vec<u8>, byte: u8) {
    out.push(b'%');
    out.push(HEX_UPPER[usize::from(byte >> 4)]);
    out.push(HEX_UPPER[usize::from(byte & 0x0f)]);
}
