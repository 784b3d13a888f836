use std::io;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// What the metadata collaborator knows about an existing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    kind: EntryKind,
}

impl Entry {
    pub const fn new(kind: EntryKind) -> Self {
        Self { kind }
    }

    pub const fn file() -> Self {
        Self::new(EntryKind::File)
    }

    pub const fn directory() -> Self {
        Self::new(EntryKind::Directory)
    }

    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no such file or directory")]
    NotFound,

    #[error("a path component is not a directory")]
    NotADirectory,

    #[error("permission denied")]
    PermissionDenied,

    #[error("file name too long")]
    NameTooLong,

    #[error("lookup failed: {reason}")]
    Other { reason: String },
}

impl LookupError {
    pub fn other<S: ToString>(reason: S) -> Self {
        Self::Other { reason: reason.to_string() }
    }

    /// Returns true if the path simply does not name an object, which makes
    /// the request a candidate for PATHINFO splitting.
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound | Self::NotADirectory | Self::NameTooLong)
    }
}

impl From<io::Error> for LookupError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::NotADirectory => Self::NotADirectory,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::InvalidFilename => Self::NameTooLong,
            _ => Self::other(e),
        }
    }
}

/// Answer of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Ready(Result<Entry, LookupError>),
    /// The answer is not known yet; ask again on a later scheduling turn.
    Pending,
}

impl From<Result<Entry, LookupError>> for Lookup {
    fn from(result: Result<Entry, LookupError>) -> Self {
        Self::Ready(result)
    }
}

/// Filesystem metadata collaborator, potentially backed by a cache.
///
/// Implementations must not block: a cache miss that needs an asynchronous
/// probe answers [`Lookup::Pending`] and the request is suspended until a
/// later call can answer it.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataLookup: Send + Sync {
    /// Looks up the object `path` names, following symbolic links.
    fn lookup(&self, path: &str) -> Lookup;

    /// Returns true if any component of `path` is a symbolic link.
    fn path_contains_symlink(&self, path: &str) -> bool;
}
