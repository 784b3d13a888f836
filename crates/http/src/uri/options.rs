use std::ops::BitOr;

/// Bit-set selecting how a request-target is normalized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseOptions(u16);

impl ParseOptions {
    /// Master switch: validate escapes and apply the options below.
    pub const URL_NORMALIZE: Self = Self(1);
    /// Decode escaped unreserved bytes, uppercase the hex digits of the rest.
    pub const UNRESERVED: Self = Self(1 << 1);
    /// Reject raw or encoded control bytes.
    pub const CTRLS_REJECT: Self = Self(1 << 2);
    /// Translate `\` into `/` in the path.
    pub const PATH_BACKSLASH_TRANS: Self = Self(1 << 3);
    /// Decode `%2F` in the path.
    pub const PATH_2F_DECODE: Self = Self(1 << 4);
    /// Reject `%2F` in the path.
    pub const PATH_2F_REJECT: Self = Self(1 << 5);
    /// Remove `.` and `..` segments from the path.
    pub const PATH_DOTSEG_REMOVE: Self = Self(1 << 6);
    /// Reject `.` and `..` segments in the path.
    pub const PATH_DOTSEG_REJECT: Self = Self(1 << 7);
    /// Collapse runs of `/` in the path.
    pub const PATH_MERGE_SLASHES: Self = Self(1 << 8);
    /// Encode `%20` in the query as `+`.
    pub const QUERY_20_PLUS: Self = Self(1 << 9);
    /// Reject a path whose escapes decode to invalid UTF-8 instead of keeping
    /// those bytes escaped.
    pub const PATH_UTF8_REJECT: Self = Self(1 << 10);

    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ParseOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
