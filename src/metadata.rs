//! Turning walker output into [`FileEntry`] records

use std::path::Path;

use crate::crawler::WalkEntry;
use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::hashing::{self, HashAlgorithm};
use crate::types::{DEFAULT_BLOCK_SIZE, FileEntry};

/// Which digests to compute and how to read files for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOptions {
    /// Algorithms fed in parallel from the same blocks
    pub algorithms: Vec<HashAlgorithm>,
    /// Bytes read per block
    pub block_size: usize,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self { algorithms: HashAlgorithm::ALL.to_vec(), block_size: DEFAULT_BLOCK_SIZE }
    }
}

/// Build the result record for a walked entry
///
/// Digests are computed for regular files only, and only when `hashing` is set.
///
/// # Errors
/// Returns [`crate::error::Error::Hash`] if the file cannot be read in full.
pub fn enrich(entry: WalkEntry, hashing: Option<&HashOptions>) -> Result<FileEntry> {
    let content_hashes = match hashing {
        Some(options) if entry.stat.is_file() => Some(hashing::hash_file(
            &entry.path,
            options.algorithms.iter().copied(),
            options.block_size,
        )?),
        _ => None,
    };

    let name = entry.path.file_name().map_or_else(
        || entry.path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    );

    Ok(FileEntry {
        name,
        kind: entry.stat.kind,
        size: entry.stat.size,
        last_modified_time: entry.stat.modified,
        last_accessed_time: entry.stat.accessed,
        last_changed_time: entry.stat.changed,
        content_hashes,
        seen_time: entry.seen_time,
        real_path: entry.real_path,
        path: entry.path,
    })
}

/// Describe a single path without walking
///
/// The path is made absolute first.
///
/// # Errors
/// Returns error if the path cannot be stat'ed or, when hashing, read.
pub fn file_metadata(
    path: &Path,
    follow_symlinks: bool,
    hashing: Option<&HashOptions>,
) -> Result<FileEntry> {
    let path = std::path::absolute(path)?;
    let fs = OsFileSystem;

    let link_stat = fs.stat(&path, false)?;
    let real_path = if link_stat.is_symlink() { fs.real_path(&path).ok() } else { None };
    let stat = if follow_symlinks && link_stat.is_symlink() {
        fs.stat(&path, true)?
    } else {
        link_stat
    };

    let entry = WalkEntry { path, depth: 0, stat, real_path, seen_time: chrono::Utc::now() };
    enrich(entry, hashing)
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::types::FileKind;

    #[test]
    fn test_enrich_regular_file_with_hashes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let entry = file_metadata(&path, false, Some(&HashOptions::default())).unwrap();
        assert_eq!(entry.name, "hello.txt");
        assert_eq!(entry.size, 11);
        assert_eq!(entry.kind, FileKind::File);
        let hashes = entry.content_hashes.unwrap();
        assert_eq!(hashes["md5"], "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    fn test_enrich_without_hashing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("quiet.txt");
        File::create(&path).unwrap();

        let entry = file_metadata(&path, false, None).unwrap();
        assert!(entry.content_hashes.is_none());
        assert_eq!(entry.size, 0);
        assert!(entry.real_path.is_none());
    }

    #[test]
    fn test_directories_are_never_hashed() {
        let temp_dir = TempDir::new().unwrap();

        let entry = file_metadata(temp_dir.path(), false, Some(&HashOptions::default())).unwrap();
        assert_eq!(entry.kind, FileKind::Directory);
        assert!(entry.content_hashes.is_none());
    }

    #[test]
    fn test_selected_algorithms() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");
        File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let options = HashOptions { algorithms: vec![HashAlgorithm::Sha256], block_size: 4 };
        let hashes = file_metadata(&path, false, Some(&options)).unwrap().content_hashes.unwrap();
        assert_eq!(hashes.len(), 1);
        assert_eq!(
            hashes["sha256"],
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_vanished_file_surfaces_hash_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short-lived.txt");
        File::create(&path).unwrap();
        let entry = file_metadata(&path, false, None).unwrap();
        fs::remove_file(&path).unwrap();

        // Stat of a live directory, relabelled to look like the removed file
        let mut stat = OsFileSystem.stat(temp_dir.path(), false).unwrap();
        stat.kind = FileKind::File;
        let walk_entry = WalkEntry {
            path: entry.path,
            depth: 0,
            stat,
            real_path: None,
            seen_time: entry.seen_time,
        };
        assert!(matches!(
            enrich(walk_entry, Some(&HashOptions::default())),
            Err(Error::Hash { .. })
        ));
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = file_metadata(&temp_dir.path().join("nope"), false, None);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_reports_real_path() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target.txt");
        File::create(&target).unwrap().write_all(b"12345").unwrap();
        let link = temp_dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let lstat = file_metadata(&link, false, None).unwrap();
        assert_eq!(lstat.kind, FileKind::Symlink);
        assert_eq!(lstat.real_path, Some(fs::canonicalize(&target).unwrap()));

        let followed = file_metadata(&link, true, Some(&HashOptions::default())).unwrap();
        assert_eq!(followed.kind, FileKind::File);
        assert_eq!(followed.size, 5);
        assert!(followed.content_hashes.is_some());
    }
}
