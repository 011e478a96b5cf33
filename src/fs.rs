//! Filesystem primitives consumed by the walker

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::types::{FileKind, StatResult};

/// Iterator over the paths of a directory's direct children
pub type DirEntries = Box<dyn Iterator<Item = io::Result<PathBuf>> + Send>;

/// Directory listing and stat capability
///
/// The walker never touches `std::fs` directly so tests can fake device ids
/// and unusual trees.
pub trait FileSystem {
    /// List the direct children of `path`
    ///
    /// # Errors
    /// Returns error if the directory cannot be opened.
    fn read_dir(&self, path: &Path) -> io::Result<DirEntries>;

    /// Stat `path`, following a final symlink only when `follow_symlinks`
    ///
    /// # Errors
    /// Returns error if the path does not exist or cannot be stat'ed.
    fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<StatResult>;

    /// Resolve every symlink in `path`
    ///
    /// # Errors
    /// Returns error if any component does not exist.
    fn real_path(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`FileSystem`] backed by the host operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_dir(&self, path: &Path) -> io::Result<DirEntries> {
        let entries = fs::read_dir(path)?;
        Ok(Box::new(entries.map(|entry| entry.map(|e| e.path()))))
    }

    fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<StatResult> {
        let metadata =
            if follow_symlinks { fs::metadata(path)? } else { fs::symlink_metadata(path)? };
        Ok(stat_from_metadata(&metadata))
    }

    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

fn kind_of(metadata: &Metadata) -> FileKind {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    }
}

#[cfg(unix)]
fn timestamp(secs: i64, nsecs: i64) -> DateTime<Utc> {
    let nsecs = u32::try_from(nsecs).unwrap_or(0);
    DateTime::from_timestamp(secs, nsecs).unwrap_or_default()
}

/// Convert `std` metadata into a [`StatResult`]
#[cfg(unix)]
#[must_use]
pub fn stat_from_metadata(metadata: &Metadata) -> StatResult {
    use std::os::unix::fs::MetadataExt;

    StatResult {
        kind:     kind_of(metadata),
        mode:     metadata.mode(),
        inode:    metadata.ino(),
        device:   metadata.dev(),
        links:    metadata.nlink(),
        uid:      metadata.uid(),
        gid:      metadata.gid(),
        size:     metadata.size(),
        accessed: timestamp(metadata.atime(), metadata.atime_nsec()),
        modified: timestamp(metadata.mtime(), metadata.mtime_nsec()),
        changed:  timestamp(metadata.ctime(), metadata.ctime_nsec()),
    }
}

/// Convert `std` metadata into a [`StatResult`]
#[cfg(not(unix))]
#[must_use]
pub fn stat_from_metadata(metadata: &Metadata) -> StatResult {
    let modified = metadata.modified().map(DateTime::<Utc>::from).unwrap_or_default();
    StatResult {
        kind: kind_of(metadata),
        mode: 0,
        inode: 0,
        device: 0,
        links: 1,
        uid: 0,
        gid: 0,
        size: metadata.len(),
        accessed: metadata.accessed().map(DateTime::<Utc>::from).unwrap_or(modified),
        modified,
        changed: modified,
    }
}
