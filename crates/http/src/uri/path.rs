//! Path-level helpers: percent-decoding, dot-segment handling and encoding.

use crate::protocol::NormalizeError;
use crate::uri::ParseOptions;

pub(crate) const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Parses the two hex digits following a `%` at `index`.
pub(crate) fn hex_pair(bytes: &[u8], index: usize) -> Option<u8> {
    let high = hex_value(*bytes.get(index + 1)?)?;
    let low = hex_value(*bytes.get(index + 2)?)?;
    Some((high << 4) | low)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[inline]
pub(crate) fn is_ctrl(byte: u8) -> bool {
    byte < 0x20 || byte == 0x7f
}

#[inline]
pub(crate) fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Percent-decodes a raw path.
///
/// Malformed escapes are copied through untouched and decoded control bytes
/// are mapped to `_`, so a path can never smuggle a NUL or a line break to
/// the filesystem layer.
///
/// Escaped bytes that do not form valid UTF-8 stay escaped, with uppercase
/// hex digits, unless `options` asks for [`ParseOptions::PATH_UTF8_REJECT`].
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidUtf8`] only under `PATH_UTF8_REJECT`.
pub fn decode_path(raw: &str, options: ParseOptions) -> Result<String, NormalizeError> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());

    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'%' {
            if let Some(value) = hex_pair(bytes, index) {
                decoded.push(if is_ctrl(value) { b'_' } else { value });
                index += 3;
                continue;
            }
        }
        decoded.push(byte);
        index += 1;
    }

    match String::from_utf8(decoded) {
        Ok(path) => Ok(path),
        Err(_) if options.contains(ParseOptions::PATH_UTF8_REJECT) => Err(NormalizeError::InvalidUtf8),
        Err(e) => Ok(escape_invalid_utf8(e.as_bytes())),
    }
}

// raw input is a str, so only decoded escapes can land in an invalid chunk
fn escape_invalid_utf8(bytes: &[u8]) -> String {
    let mut path = String::with_capacity(bytes.len() * 3);
    for chunk in bytes.utf8_chunks() {
        path.push_str(chunk.valid());
        for &byte in chunk.invalid() {
            path.push('%');
            path.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
            path.push(char::from(HEX_UPPER[usize::from(byte & 0x0f)]));
        }
    }
    path
}

/// Collapses repeated slashes and resolves `.` and `..` segments, never
/// climbing above the root. A trailing slash (or a trailing dot segment)
/// leaves a trailing slash.
///
/// A relative input stays relative so callers can reject it.
pub fn simplify_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in path.split('/') {
        match segment {
            "" | "." => trailing_slash = true,
            ".." => {
                segments.pop();
                trailing_slash = true;
            }
            segment => {
                segments.push(segment);
                trailing_slash = false;
            }
        }
    }

    join_segments(path.starts_with('/'), &segments, trailing_slash, path.len())
}

/// Removes `.` and `..` segments without touching empty segments.
pub fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts = path.split('/');
    if absolute {
        parts.next();
    }

    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in parts {
        match segment {
            "." => trailing_slash = true,
            ".." => {
                segments.pop();
                trailing_slash = true;
            }
            segment => {
                segments.push(segment);
                trailing_slash = false;
            }
        }
    }

    join_segments(absolute, &segments, trailing_slash, path.len())
}

fn join_segments(absolute: bool, segments: &[&str], trailing_slash: bool, capacity: usize) -> String {
    let mut joined = String::with_capacity(capacity);
    if absolute {
        joined.push('/');
    }
    joined.push_str(&segments.join("/"));
    if trailing_slash && !segments.is_empty() && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Collapses every run of `/` into a single one.
pub fn merge_slashes(path: &str) -> String {
    let mut merged = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && merged.ends_with('/') {
            continue;
        }
        merged.push(c);
    }
    merged
}

pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

/// Percent-encodes a decoded path so it can be sent back in a `Location`.
pub fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for &byte in path.as_bytes() {
        if is_unreserved(byte) || matches!(byte, b'/' | b':' | b'@' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=') {
            encoded.push(char::from(byte));
        } else {
            encoded.push('%');
            encoded.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
            encoded.push(char::from(HEX_UPPER[usize::from(byte & 0x0f)]));
        }
    }
    encoded
}
