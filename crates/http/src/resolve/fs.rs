use std::fs;
use std::path::Path;

use crate::resolve::{Entry, EntryKind, Lookup, LookupError, MetadataLookup};

/// Uncached metadata lookup answered directly by the filesystem.
///
/// Every call is a `stat`, so it always answers [`Lookup::Ready`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMetadata;

impl MetadataLookup for FsMetadata {
    fn lookup(&self, path: &str) -> Lookup {
        let result = fs::metadata(path).map_err(LookupError::from).map(|metadata| {
            let file_type = metadata.file_type();
            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::Other
            };
            Entry::new(kind)
        });
        Lookup::Ready(result)
    }

    fn path_contains_symlink(&self, path: &str) -> bool {
        Path::new(path)
            .ancestors()
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .any(|ancestor| fs::symlink_metadata(ancestor).is_ok_and(|metadata| metadata.file_type().is_symlink()))
    }
}
