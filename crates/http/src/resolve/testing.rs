//! In-memory metadata lookup for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::resolve::{Entry, Lookup, LookupError, MetadataLookup};

#[derive(Debug, Default)]
pub(crate) struct MemoryMetadata {
    entries: HashMap<String, Entry>,
    symlinks: HashSet<String>,
    denied: HashSet<String>,
    pending: Mutex<HashSet<String>>,
    lookups: Mutex<Vec<String>>,
}

impl MemoryMetadata {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a regular file and all of its parent directories.
    pub(crate) fn file(mut self, path: &str) -> Self {
        self.add_parents(path);
        self.entries.insert(path.to_string(), Entry::file());
        self
    }

    /// Adds a directory and all of its parents.
    pub(crate) fn dir(mut self, path: &str) -> Self {
        self.add_parents(path);
        self.entries.insert(path.to_string(), Entry::directory());
        self
    }

    pub(crate) fn symlink(mut self, path: &str) -> Self {
        self.symlinks.insert(path.to_string());
        self
    }

    pub(crate) fn denied(mut self, path: &str) -> Self {
        self.denied.insert(path.to_string());
        self
    }

    /// The next lookup of `path` answers `Pending`.
    pub(crate) fn pending_once(self, path: &str) -> Self {
        self.pending.lock().unwrap().insert(path.to_string());
        self
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn add_parents(&mut self, path: &str) {
        let mut end = path.len();
        while let Some(index) = path[..end].rfind('/') {
            let parent = if index == 0 { "/" } else { &path[..index] };
            self.entries.entry(parent.to_string()).or_insert(Entry::directory());
            if index == 0 {
                break;
            }
            end = index;
        }
    }
}

impl MetadataLookup for MemoryMetadata {
    fn lookup(&self, path: &str) -> Lookup {
        self.lookups.lock().unwrap().push(path.to_string());
        if self.pending.lock().unwrap().remove(path) {
            return Lookup::Pending;
        }
        if self.denied.contains(path) {
            return Lookup::Ready(Err(LookupError::PermissionDenied));
        }

        let trailing_slash = path.len() > 1 && path.ends_with('/');
        let key = if trailing_slash { &path[..path.len() - 1] } else { path };
        if let Some(entry) = self.entries.get(key) {
            if trailing_slash && !entry.is_dir() {
                return Lookup::Ready(Err(LookupError::NotADirectory));
            }
            return Lookup::Ready(Ok(*entry));
        }

        let mut end = key.len();
        while let Some(index) = key[..end].rfind('/') {
            if self.entries.get(&key[..index]).is_some_and(Entry::is_file) {
                return Lookup::Ready(Err(LookupError::NotADirectory));
            }
            end = index;
        }
        Lookup::Ready(Err(LookupError::NotFound))
    }

    fn path_contains_symlink(&self, path: &str) -> bool {
        self.symlinks.iter().any(|link| path == link || path.strip_prefix(link.as_str()).is_some_and(|rest| rest.starts_with('/')))
    }
}
