//! Root path expansion and non-overlapping reduction

use std::fs;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use log::{debug, warn};

/// Characters that turn a path into a glob pattern
const GLOB_MAGIC: [char; 3] = ['*', '?', '['];

/// A user-supplied path after expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path handed to the walker
    pub path:      PathBuf,
    /// Canonical form used for overlap comparison
    pub real_path: PathBuf,
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references
///
/// Unknown variables are left untouched.
#[must_use]
pub fn expand(path: &str) -> String {
    expand_vars(&expand_home(path))
}

fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(std::path::is_separator) => rest,
        _ => return path.to_owned(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => path.to_owned(),
    }
}

fn expand_vars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        let (name, raw_len) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => {
                out.push('$');
                out.push_str(&after[..raw_len]);
            },
        }
        rest = &after[raw_len..];
    }
    out.push_str(rest);
    out
}

/// Returns true if the path contains glob wildcards
#[must_use]
pub fn has_magic(path: &str) -> bool {
    path.contains(GLOB_MAGIC)
}

/// Returns true if `path` is `directory` or lies below it
///
/// Comparison is on whole path segments: `/usr/bin` is in `/usr`, `/usrlocal` is not.
#[must_use]
pub fn path_in_directory(path: &Path, directory: &Path) -> bool {
    path.starts_with(directory)
}

/// Returns true if `path` lies within any of `directories`
#[must_use]
pub fn path_in_any_directory<'a, I>(path: &Path, directories: I) -> bool
where
    I: IntoIterator<Item = &'a Path>,
{
    directories.into_iter().any(|directory| path_in_directory(path, directory))
}

fn resolve_one(path: PathBuf, follow_symlinks: bool) -> Option<ResolvedPath> {
    let absolute = match std::path::absolute(&path) {
        Ok(absolute) => absolute,
        Err(e) => {
            warn!("Skipping path {}: {e}", path.display());
            return None;
        },
    };
    let real_path = fs::canonicalize(&absolute).unwrap_or_else(|_| absolute.clone());
    let path = if follow_symlinks { real_path.clone() } else { absolute };
    Some(ResolvedPath { path, real_path })
}

fn expand_glob(pattern: &str, follow_symlinks: bool, out: &mut Vec<ResolvedPath>) {
    let options = MatchOptions { require_literal_leading_dot: true, ..MatchOptions::new() };
    let matches = match glob::glob_with(pattern, options) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("Ignoring malformed glob {pattern}: {e}");
            return;
        },
    };
    for entry in matches {
        match entry {
            Ok(path) => out.extend(resolve_one(path, follow_symlinks)),
            Err(e) => debug!("Glob {pattern} skipped an unreadable path: {e}"),
        }
    }
}

/// Expand and deduplicate paths, allowing overlap
///
/// Literal paths that do not exist are kept; globs that match nothing
/// contribute nothing. The result is sorted by real path.
#[must_use]
pub fn resolve_paths<I, S>(paths: I, follow_symlinks: bool) -> Vec<ResolvedPath>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolved = Vec::new();
    for raw in paths {
        let expanded = expand(raw.as_ref());
        if has_magic(&expanded) {
            expand_glob(&expanded, follow_symlinks, &mut resolved);
        } else {
            resolved.extend(resolve_one(PathBuf::from(expanded), follow_symlinks));
        }
    }
    resolved.sort_by(|a, b| a.real_path.cmp(&b.real_path).then_with(|| a.path.cmp(&b.path)));
    resolved.dedup_by(|a, b| a.real_path == b.real_path);
    resolved
}

/// Drop every path that lies below another path of the set
///
/// Sorting component-wise places each descendant right after its
/// ancestors, so comparing against the last kept path is enough.
#[must_use]
pub fn non_overlapping(mut paths: Vec<ResolvedPath>) -> Vec<ResolvedPath> {
    paths.sort_by(|a, b| a.real_path.cmp(&b.real_path));

    let mut roots: Vec<ResolvedPath> = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(last) = roots.last() {
            if path_in_directory(&path.real_path, &last.real_path) {
                debug!(
                    "Collapsing {} into {}",
                    path.path.display(),
                    last.path.display()
                );
                continue;
            }
        }
        roots.push(path);
    }
    roots
}

/// Expand paths and reduce them to non-overlapping roots
#[must_use]
pub fn resolve_non_overlapping<I, S>(paths: I, follow_symlinks: bool) -> Vec<ResolvedPath>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    non_overlapping(resolve_paths(paths, follow_symlinks))
}
