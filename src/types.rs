//! Common types and constants for `hodgepodge`

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default block size for streaming file reads (8 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024;

/// Symlinks are stat'ed with `lstat` semantics unless asked otherwise
pub const FOLLOW_SYMLINKS_BY_DEFAULT: bool = false;

/// Traversal crosses filesystem boundaries unless asked otherwise
pub const FOLLOW_MOUNT_POINTS_BY_DEFAULT: bool = true;

/// Content hashes are opt-in
pub const INCLUDE_HASHES_BY_DEFAULT: bool = false;

/// Glob matching folds case unless asked otherwise
pub const CASE_SENSITIVE_BY_DEFAULT: bool = false;

/// Hex digests keyed by algorithm name
pub type Hashes = BTreeMap<String, String>;

/// Kind of filesystem object behind a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only reported when links are not followed)
    Symlink,
    /// Device, socket, fifo, ...
    Other,
}

/// Raw stat record for one path
///
/// Unix-only fields are zero on other platforms, where `changed` falls back
/// to the modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatResult {
    /// Object kind
    pub kind:     FileKind,
    /// Permission and type bits
    pub mode:     u32,
    /// Inode number
    pub inode:    u64,
    /// Identifier of the device holding the object
    pub device:   u64,
    /// Number of hard links
    pub links:    u64,
    /// Owner user id
    pub uid:      u32,
    /// Owner group id
    pub gid:      u32,
    /// Size in bytes
    pub size:     u64,
    /// Last access time
    pub accessed: DateTime<Utc>,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Last status change time
    pub changed:  DateTime<Utc>,
}

impl StatResult {
    /// Returns true for directories
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Returns true for regular files
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Returns true for symbolic links
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// One search result, files and directories alike
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Absolute path of the entry
    pub path:               PathBuf,
    /// Canonical target, only set for symbolic links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_path:          Option<PathBuf>,
    /// Base name
    pub name:               String,
    /// Object kind
    pub kind:               FileKind,
    /// Size in bytes
    pub size:               u64,
    /// Last modification time
    pub last_modified_time: DateTime<Utc>,
    /// Last access time
    pub last_accessed_time: DateTime<Utc>,
    /// Last status change time
    pub last_changed_time:  DateTime<Utc>,
    /// Hex digests, only for regular files when hashing was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hashes:     Option<Hashes>,
    /// Wall-clock time the walker observed the entry
    pub seen_time:          DateTime<Utc>,
}

const _: () = {
    assert!(DEFAULT_BLOCK_SIZE > 0);
};
