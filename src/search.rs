//! Search pipeline: resolve roots, walk, filter and enrich

use std::path::PathBuf;

use log::{debug, warn};

use crate::crawler::{Crawler, WalkEntry, WalkOptions};
use crate::error::{Error, Result};
use crate::filter::{NameMatcher, ResultFilter, SizeRange};
use crate::fs::{FileSystem, OsFileSystem};
use crate::hashing::HashAlgorithm;
use crate::metadata::{HashOptions, enrich};
use crate::paths::{ResolvedPath, resolve_non_overlapping};
use crate::types::{
    CASE_SENSITIVE_BY_DEFAULT, DEFAULT_BLOCK_SIZE, FOLLOW_MOUNT_POINTS_BY_DEFAULT,
    FOLLOW_SYMLINKS_BY_DEFAULT, FileEntry, INCLUDE_HASHES_BY_DEFAULT,
};

/// What to search for and where
///
/// Built with consuming `with_*` methods:
///
/// ```
/// use hodgepodge::search::SearchSpec;
///
/// let spec = SearchSpec::new(["/var/log"]).with_name_patterns(["*.log"]).with_max_depth(Some(2));
/// assert_eq!(spec.max_depth, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    /// Starting paths; globs, `$VAR` and `~` are expanded
    pub roots:                  Vec<String>,
    /// Subtrees that are never descended into
    pub excluded_paths:         Vec<String>,
    /// Glob patterns checked against names and paths
    pub name_patterns:          Vec<String>,
    /// Match patterns without case folding
    pub case_sensitive:         bool,
    /// Smallest accepted size in bytes
    pub min_size:               Option<u64>,
    /// Largest accepted size in bytes
    pub max_size:               Option<u64>,
    /// Directory levels below each root that may be listed
    pub max_depth:              Option<usize>,
    /// Cap on entries yielded across all roots
    pub max_results:            Option<usize>,
    /// Stat through symlinks and descend into symlinked directories
    pub follow_symlinks:        bool,
    /// Descend into directories on other devices
    pub follow_mount_points:    bool,
    /// Compute content digests for regular files
    pub include_content_hashes: bool,
    /// Digests to compute when hashing
    pub hash_algorithms:        Vec<HashAlgorithm>,
    /// Bytes read per block when hashing
    pub block_size:             usize,
}

impl SearchSpec {
    /// Default settings over the given roots
    #[must_use]
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots:                  roots.into_iter().map(Into::into).collect(),
            excluded_paths:         Vec::new(),
            name_patterns:          Vec::new(),
            case_sensitive:         CASE_SENSITIVE_BY_DEFAULT,
            min_size:               None,
            max_size:               None,
            max_depth:              None,
            max_results:            None,
            follow_symlinks:        FOLLOW_SYMLINKS_BY_DEFAULT,
            follow_mount_points:    FOLLOW_MOUNT_POINTS_BY_DEFAULT,
            include_content_hashes: INCLUDE_HASHES_BY_DEFAULT,
            hash_algorithms:        HashAlgorithm::ALL.to_vec(),
            block_size:             DEFAULT_BLOCK_SIZE,
        }
    }

    /// Prune these subtrees
    #[must_use]
    pub fn with_excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Keep only entries whose name or path matches one of these globs
    #[must_use]
    pub fn with_name_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Match patterns with or without case folding
    #[must_use]
    pub const fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Inclusive lower size bound
    #[must_use]
    pub const fn with_min_size(mut self, min_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self
    }

    /// Inclusive upper size bound
    #[must_use]
    pub const fn with_max_size(mut self, max_size: Option<u64>) -> Self {
        self.max_size = max_size;
        self
    }

    /// Limit how deep below each root directories are listed
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Stop after this many entries
    #[must_use]
    pub const fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Follow symbolic links
    #[must_use]
    pub const fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Cross filesystem boundaries
    #[must_use]
    pub const fn with_follow_mount_points(mut self, follow_mount_points: bool) -> Self {
        self.follow_mount_points = follow_mount_points;
        self
    }

    /// Compute content digests of regular files
    #[must_use]
    pub const fn with_content_hashes(mut self, include_content_hashes: bool) -> Self {
        self.include_content_hashes = include_content_hashes;
        self
    }

    /// Pick the digests computed when hashing
    #[must_use]
    pub fn with_hash_algorithms<I>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = HashAlgorithm>,
    {
        self.hash_algorithms = algorithms.into_iter().collect();
        self
    }

    /// Set the hashing block size
    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Check the settings for contradictions
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if:
    /// - `min_size` is larger than `max_size`
    /// - the block size is zero
    /// - hashing is requested without any algorithm
    pub fn validate(&self) -> Result<()> {
        SizeRange::new(self.min_size, self.max_size).validate()?;
        if self.block_size == 0 {
            return Err(Error::config("block size must be at least one byte"));
        }
        if self.include_content_hashes && self.hash_algorithms.is_empty() {
            return Err(Error::config("content hashes requested without any hash algorithm"));
        }
        Ok(())
    }
}

/// A validated search, ready to be iterated any number of times
#[derive(Debug)]
pub struct FileSearch<F: FileSystem = OsFileSystem> {
    /// Filesystem being searched
    fs:          F,
    /// Non-overlapping roots
    roots:       Vec<ResolvedPath>,
    /// Excluded subtrees, both as given and as resolved
    excluded:    Vec<PathBuf>,
    /// Compiled name patterns
    names:       NameMatcher,
    /// Accepted sizes
    sizes:       SizeRange,
    /// Traversal limits
    options:     WalkOptions,
    /// Cap on yielded entries
    max_results: Option<usize>,
    /// Digest settings, `None` when hashing is off
    hashing:     Option<HashOptions>,
}

impl FileSearch {
    /// Build a search over the local filesystem
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the settings are contradictory.
    pub fn new(spec: SearchSpec) -> Result<Self> {
        Self::with_fs(spec, OsFileSystem)
    }
}

impl<F: FileSystem> FileSearch<F> {
    /// Build a search over any [`FileSystem`]
    ///
    /// Roots and excluded paths are expanded against the real filesystem.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the settings are contradictory.
    pub fn with_fs(spec: SearchSpec, fs: F) -> Result<Self> {
        spec.validate()?;

        let roots = resolve_non_overlapping(&spec.roots, spec.follow_symlinks);
        debug!("Searching {} root(s)", roots.len());

        let mut excluded: Vec<PathBuf> = resolve_non_overlapping(&spec.excluded_paths, false)
            .into_iter()
            .flat_map(|p| [p.path, p.real_path])
            .collect();
        // Roots walked through a symlink reach excluded subtrees under the link
        let aliased: Vec<PathBuf> = roots
            .iter()
            .filter(|root| root.path != root.real_path)
            .flat_map(|root| {
                excluded.iter().filter_map(move |path| {
                    path.strip_prefix(&root.real_path).ok().map(|rel| root.path.join(rel))
                })
            })
            .collect();
        excluded.extend(aliased);
        excluded.sort();
        excluded.dedup();

        let hashing = spec.include_content_hashes.then(|| HashOptions {
            algorithms: spec.hash_algorithms.clone(),
            block_size: spec.block_size,
        });

        Ok(Self {
            fs,
            roots,
            excluded,
            names: NameMatcher::new(&spec.name_patterns, spec.case_sensitive),
            sizes: SizeRange::new(spec.min_size, spec.max_size),
            options: WalkOptions {
                max_depth:           spec.max_depth,
                follow_symlinks:     spec.follow_symlinks,
                follow_mount_points: spec.follow_mount_points,
            },
            max_results: spec.max_results,
            hashing,
        })
    }

    /// Roots that will be walked, in walk order
    #[must_use]
    pub fn roots(&self) -> &[ResolvedPath] {
        &self.roots
    }

    /// Lazily walk every root, yielding matching entries
    ///
    /// A hashing failure is yielded as an error and the walk goes on.
    #[must_use]
    pub fn iter(&self) -> Matches<'_, F> {
        Matches { entries: self.entries(), hashing: self.hashing.as_ref() }
    }

    /// Matching paths, without hashing
    #[must_use]
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.entries().map(|entry| entry.path)
    }

    /// Number of matching entries
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries().count()
    }

    /// Combined size in bytes of every matching entry
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries().map(|entry| entry.stat.size).sum()
    }

    fn entries(&self) -> ResultFilter<'_, Walk<'_, F>> {
        let walk = Walk { search: self, next_root: 0, current: None };
        ResultFilter::new(walk, self.sizes, &self.names, self.max_results)
    }
}

impl<'a, F: FileSystem> IntoIterator for &'a FileSearch<F> {
    type IntoIter = Matches<'a, F>;
    type Item = Result<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walk of every root in turn
struct Walk<'a, F: FileSystem> {
    /// Search owning the roots
    search:    &'a FileSearch<F>,
    /// Index of the next root to open
    next_root: usize,
    /// Walker over the current root
    current:   Option<Crawler<'a, F>>,
}

impl<F: FileSystem> std::fmt::Debug for Walk<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk")
            .field("next_root", &self.next_root)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<'a, F: FileSystem> Iterator for Walk<'a, F> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.as_mut().and_then(Iterator::next) {
                return Some(entry);
            }
            let search: &'a FileSearch<F> = self.search;
            let root = search.roots.get(self.next_root)?;
            self.next_root += 1;
            debug!("Walking {}", root.path.display());
            self.current =
                Some(Crawler::new(&search.fs, &root.path, search.options, &search.excluded));
        }
    }
}

/// Iterator over the results of a [`FileSearch`]
#[derive(Debug)]
pub struct Matches<'a, F: FileSystem> {
    /// Filtered walker output
    entries: ResultFilter<'a, Walk<'a, F>>,
    /// Digest settings
    hashing: Option<&'a HashOptions>,
}

impl<F: FileSystem> Iterator for Matches<'_, F> {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = enrich(self.entries.next()?, self.hashing);
        if let Err(e) = &result {
            warn!("{e}");
        }
        Some(result)
    }
}
