//! Size, name and result-count filtering of walker output

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::warn;

use crate::crawler::WalkEntry;
use crate::error::{Error, Result};

/// Inclusive byte-size bounds; unset bounds are open
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    /// Smallest accepted size
    pub min: Option<u64>,
    /// Largest accepted size
    pub max: Option<u64>,
}

impl SizeRange {
    /// Create a new size range
    #[must_use]
    pub const fn new(min: Option<u64>, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Returns true if `size` lies within the bounds
    #[must_use]
    pub fn contains(&self, size: u64) -> bool {
        self.min.is_none_or(|min| size >= min) && self.max.is_none_or(|max| size <= max)
    }

    /// Check that the bounds are ordered
    ///
    /// # Errors
    /// Returns error if both bounds are set and `min > max`.
    pub fn validate(&self) -> Result<()> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(Error::config(format!(
                "minimum size {min} is larger than maximum size {max}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Shell-glob matcher for entry names and paths
///
/// `*` crosses path separators, as with `fnmatch`.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    /// Compiled patterns
    set:        GlobSet,
    /// Whether any pattern was supplied at all
    configured: bool,
}

impl NameMatcher {
    /// Compile patterns, dropping malformed ones with a warning
    ///
    /// If every pattern is malformed the matcher matches nothing.
    #[must_use]
    pub fn new<I, S>(patterns: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut configured = false;
        for pattern in patterns {
            configured = true;
            match compile(pattern.as_ref(), case_sensitive) {
                Ok(glob) => {
                    builder.add(glob);
                },
                Err(e) => warn!("{e}; the pattern will match nothing"),
            }
        }
        let set = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build pattern set: {e}");
            GlobSet::empty()
        });
        Self { set, configured }
    }

    /// Compile patterns, failing on the first malformed one
    ///
    /// # Errors
    /// Returns error if any pattern is not a valid glob.
    pub fn strict<I, S>(patterns: I, case_sensitive: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut configured = false;
        for pattern in patterns {
            configured = true;
            builder.add(compile(pattern.as_ref(), case_sensitive)?);
        }
        let set = builder.build().map_err(|e| Error::InvalidPattern(e.to_string()))?;
        Ok(Self { set, configured })
    }

    /// Returns true if no pattern was supplied
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.configured
    }

    /// Check a single string or path against every pattern
    #[must_use]
    pub fn is_match(&self, candidate: impl AsRef<Path>) -> bool {
        self.set.is_match(candidate)
    }

    /// Check an entry's name, path and, for symlinks, its target
    #[must_use]
    pub fn matches(&self, entry: &WalkEntry) -> bool {
        if !self.configured {
            return true;
        }
        let own = [entry.path.as_path()];
        let target = entry.real_path.as_deref();
        own.into_iter().chain(target).any(|path| {
            path.file_name().is_some_and(|name| self.is_match(name)) || self.is_match(path)
        })
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self { set: GlobSet::empty(), configured: false }
    }
}

fn compile(pattern: &str, case_sensitive: bool) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .literal_separator(false)
        .build()
        .map_err(|e| Error::InvalidPattern(format!("{pattern}: {e}")))
}

/// Iterator adapter applying size bounds, name patterns and a result cap
#[derive(Debug)]
pub struct ResultFilter<'a, I> {
    /// Upstream walker output
    inner:     I,
    /// Accepted sizes
    sizes:     SizeRange,
    /// Accepted names
    names:     &'a NameMatcher,
    /// Entries still allowed through, `None` for unlimited
    remaining: Option<usize>,
}

impl<'a, I> ResultFilter<'a, I>
where
    I: Iterator<Item = WalkEntry>,
{
    /// Wrap a walker stream
    #[must_use]
    pub const fn new(
        inner: I,
        sizes: SizeRange,
        names: &'a NameMatcher,
        max_results: Option<usize>,
    ) -> Self {
        Self { inner, sizes, names, remaining: max_results }
    }

    /// Returns true if the entry passes size and name rules
    fn accepts(&self, entry: &WalkEntry) -> bool {
        self.sizes.contains(entry.stat.size) && self.names.matches(entry)
    }
}

impl<I> Iterator for ResultFilter<'_, I>
where
    I: Iterator<Item = WalkEntry>,
{
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let entry = self.inner.next()?;
            if !self.accepts(&entry) {
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(entry);
        }
    }
}
