//! Depth-first directory walker
//!
//! The walker is a lazy pre-order iterator driven by an explicit stack of
//! open directory handles. Every visited path is yielded, including
//! directories whose subtree is pruned; pruning only stops the descent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::fs::{DirEntries, FileSystem};
use crate::paths::path_in_any_directory;
use crate::types::StatResult;

/// Traversal limits shared by every root of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Directory levels below the root that may be listed
    pub max_depth:           Option<usize>,
    /// Stat through symlinks and descend into symlinked directories
    pub follow_symlinks:     bool,
    /// Descend into directories living on another device
    pub follow_mount_points: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth:           None,
            follow_symlinks:     crate::types::FOLLOW_SYMLINKS_BY_DEFAULT,
            follow_mount_points: crate::types::FOLLOW_MOUNT_POINTS_BY_DEFAULT,
        }
    }
}

/// A path visited by the walker together with its stat result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path as reached from the root
    pub path:      PathBuf,
    /// Levels below the root (root is 0)
    pub depth:     usize,
    /// Stat result, through symlinks when they are followed
    pub stat:      StatResult,
    /// Canonical target when the path is a symlink
    pub real_path: Option<PathBuf>,
    /// Wall-clock time the path was stat'ed
    pub seen_time: DateTime<Utc>,
}

/// Open directory on the work stack
struct Frame {
    /// Remaining children
    entries:  DirEntries,
    /// Depth of the directory itself
    depth:    usize,
    /// Device of the directory, compared against its children
    device:   u64,
    /// `(device, inode)` used to detect symlink cycles
    identity: (u64, u64),
}

/// Directory walker over a single root
pub struct Crawler<'a, F: FileSystem + ?Sized> {
    /// Filesystem being walked
    fs:            &'a F,
    /// Traversal limits
    options:       WalkOptions,
    /// Subtrees that are listed but never descended into
    excluded:      &'a [PathBuf],
    /// Root waiting for the first call to `next`
    pending_root:  Option<PathBuf>,
    /// Open directories, innermost last
    stack:         Vec<Frame>,
    /// Number of entries yielded
    entries_count: usize,
    /// Number of directories opened for listing
    dir_count:     usize,
}

impl<F: FileSystem + ?Sized> std::fmt::Debug for Crawler<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("options", &self.options)
            .field("pending_root", &self.pending_root)
            .field("open_dirs", &self.stack.len())
            .field("entries_count", &self.entries_count)
            .field("dir_count", &self.dir_count)
            .finish_non_exhaustive()
    }
}

impl<'a, F: FileSystem + ?Sized> Crawler<'a, F> {
    /// Create a new crawler starting at the given root
    ///
    /// Nothing is read until the first call to `next`.
    #[must_use]
    pub fn new(fs: &'a F, root: &Path, options: WalkOptions, excluded: &'a [PathBuf]) -> Self {
        Self {
            fs,
            options,
            excluded,
            pending_root: Some(root.to_path_buf()),
            stack: Vec::new(),
            entries_count: 0,
            dir_count: 0,
        }
    }

    /// Get the current progress of the walk
    ///
    /// Returns a tuple of:
    /// - Number of entries yielded so far
    /// - Number of directories opened for listing
    #[must_use = "Progress information should be used for monitoring"]
    pub const fn progress(&self) -> (usize, usize) {
        (self.entries_count, self.dir_count)
    }

    /// Whether a directory at `depth` may have its children listed
    fn may_list(&self, depth: usize) -> bool {
        self.options.max_depth.is_none_or(|max| depth < max)
    }

    /// Stat a path, keeping the link itself when its target is gone
    fn visit(&mut self, path: PathBuf, depth: usize) -> Option<WalkEntry> {
        let link_stat = match self.fs.stat(&path, false) {
            Ok(stat) => stat,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                return None;
            },
        };

        let is_symlink = link_stat.is_symlink();
        let stat = if is_symlink && self.options.follow_symlinks {
            match self.fs.stat(&path, true) {
                Ok(stat) => stat,
                Err(e) => {
                    debug!("Dangling symlink {}: {e}", path.display());
                    link_stat
                },
            }
        } else {
            link_stat
        };
        let real_path = if is_symlink { self.fs.real_path(&path).ok() } else { None };

        self.entries_count += 1;
        Some(WalkEntry { path, depth, stat, real_path, seen_time: Utc::now() })
    }

    /// Open the root; missing roots yield nothing, unlistable ones a single leaf
    fn start(&mut self, root: PathBuf) -> Option<WalkEntry> {
        let listing = match self.fs.read_dir(&root) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Root {} does not exist", root.display());
                return None;
            },
            listing => listing,
        };

        let entry = self.visit(root, 0)?;
        match listing {
            Ok(entries) if self.may_list(0) => {
                // A symlinked root is listed through its target
                let target = if entry.stat.is_symlink() {
                    self.fs.stat(&entry.path, true).ok()
                } else {
                    None
                };
                let listed = target.as_ref().unwrap_or(&entry.stat);
                self.dir_count += 1;
                self.stack.push(Frame {
                    entries,
                    depth: 0,
                    device: listed.device,
                    identity: (listed.device, listed.inode),
                });
            },
            Ok(_) => debug!("Depth limit reached at root {}", entry.path.display()),
            Err(e) => debug!("Treating {} as a leaf: {e}", entry.path.display()),
        }
        Some(entry)
    }

    /// Decide whether a directory child gets its own listing
    fn should_descend(&self, entry: &WalkEntry, parent_device: u64) -> bool {
        if !entry.stat.is_dir() {
            return false;
        }
        if !self.may_list(entry.depth) {
            debug!("Depth limit reached at {}", entry.path.display());
            return false;
        }
        if !self.options.follow_mount_points && entry.stat.device != parent_device {
            debug!("Not crossing mount point at {}", entry.path.display());
            return false;
        }
        if path_in_any_directory(&entry.path, self.excluded.iter().map(PathBuf::as_path)) {
            debug!("Pruning excluded directory {}", entry.path.display());
            return false;
        }
        let identity = (entry.stat.device, entry.stat.inode);
        if self.stack.iter().any(|frame| frame.identity == identity) {
            warn!("Not following directory cycle at {}", entry.path.display());
            return false;
        }
        true
    }

    /// Push a listing for `entry` onto the stack
    fn descend(&mut self, entry: &WalkEntry) {
        match self.fs.read_dir(&entry.path) {
            Ok(entries) => {
                self.dir_count += 1;
                self.stack.push(Frame {
                    entries,
                    depth: entry.depth,
                    device: entry.stat.device,
                    identity: (entry.stat.device, entry.stat.inode),
                });
            },
            Err(e) => debug!("Cannot list {}: {e}", entry.path.display()),
        }
    }
}

impl<F: FileSystem + ?Sized> Iterator for Crawler<'_, F> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.pending_root.take() {
            if let Some(entry) = self.start(root) {
                return Some(entry);
            }
        }

        loop {
            let (child, depth, parent_device) = {
                let frame = self.stack.last_mut()?;
                (frame.entries.next(), frame.depth + 1, frame.device)
            };

            match child {
                None => {
                    self.stack.pop();
                },
                Some(Err(e)) => warn!("Skipping unreadable directory entry: {e}"),
                Some(Ok(path)) => {
                    let Some(entry) = self.visit(path, depth) else { continue };
                    if self.should_descend(&entry, parent_device) {
                        self.descend(&entry);
                    }
                    return Some(entry);
                },
            }
        }
    }
}
