//! `hodgepodge` - Recursive file-tree search with filtering and content hashes.

#![deny(
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]

pub mod crawler;
pub mod error;
pub mod filter;
pub mod fs;
pub mod hashing;
pub mod metadata;
pub mod paths;
pub mod search;
pub mod types;

pub use error::{Error, Result};
pub use search::{FileSearch, SearchSpec};
pub use types::{FileEntry, FileKind};
