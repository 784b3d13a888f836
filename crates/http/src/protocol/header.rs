//! Response header collection.
//!
//! Headers are kept as an ordered list of owned key/value pairs rather than an
//! `http::HeaderMap`: the wire output must preserve insertion order across
//! distinct names and the exact key casing chosen by whoever added the field.
//! A small [`HeaderTags`] bitset mirrors the presence of the handful of
//! headers the serializer has to reason about.

use std::fmt;
use std::ops::BitOr;

/// A single response header field.
///
/// Key comparison is ASCII case-insensitive. Fields with an empty key or an
/// empty value are kept in the collection but never written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    key: String,
    value: String,
}

impl HeaderField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }

    /// Returns true if this field would be written to the wire.
    #[inline]
    pub fn is_emittable(&self) -> bool {
        !self.key.is_empty() && !self.value.is_empty()
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// Presence flags for the well-known response headers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTags(u8);

impl HeaderTags {
    pub const DATE: Self = Self(1);
    pub const SERVER: Self = Self(1 << 1);
    pub const CONNECTION: Self = Self(1 << 2);
    pub const UPGRADE: Self = Self(1 << 3);
    pub const CONTENT_ENCODING: Self = Self(1 << 4);

    const WELL_KNOWN: [(&'static str, HeaderTags); 5] = [
        ("Date", Self::DATE),
        ("Server", Self::SERVER),
        ("Connection", Self::CONNECTION),
        ("Upgrade", Self::UPGRADE),
        ("Content-Encoding", Self::CONTENT_ENCODING),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns the tag of a header name, or an empty set for other headers.
    pub fn of(name: &str) -> Self {
        Self::WELL_KNOWN
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map_or(Self::empty(), |(_, tag)| *tag)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for HeaderTags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Ordered response header collection; duplicates are permitted.
#[derive(Debug, Default, Clone)]
pub struct ResponseHeaders {
    fields: Vec<HeaderField>,
    tags: HeaderTags,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping any existing field with the same name.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let field = HeaderField::new(key, value);
        self.tags.insert(HeaderTags::of(field.key()));
        self.fields.push(field);
    }

    /// Sets a field: the first field with this name takes the new value and
    /// later duplicates are removed. Appends when the name is absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter().position(|field| field.is_named(key)) {
            Some(index) => {
                self.fields[index].value = value;
                let mut seen = 0usize;
                self.fields.retain(|field| {
                    if !field.is_named(key) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => {
                self.fields.push(HeaderField::new(key, value));
            }
        }
        self.tags.insert(HeaderTags::of(key));
    }

    /// Removes every field with this name.
    pub fn unset(&mut self, key: &str) {
        self.fields.retain(|field| !field.is_named(key));
        self.tags.remove(HeaderTags::of(key));
    }

    /// Returns the value of the first field with this name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|field| field.is_named(key)).map(HeaderField::value)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|field| field.is_named(key))
    }

    #[inline]
    pub fn tags(&self) -> HeaderTags {
        self.tags
    }

    #[inline]
    pub fn has(&self, tag: HeaderTags) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.tags = HeaderTags::empty();
    }
}

impl<'a> IntoIterator for &'a ResponseHeaders {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
