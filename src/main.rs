#![deny(
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! `hodge` - Search file trees from the command line.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use clap_cargo::style::CLAP_STYLING;
use hodgepodge::error::Result;
use hodgepodge::filter::NameMatcher;
use hodgepodge::hashing::{self, HashAlgorithm};
use hodgepodge::metadata::{self, HashOptions};
use hodgepodge::search::{FileSearch, SearchSpec};
use hodgepodge::types::DEFAULT_BLOCK_SIZE;
use humansize::{DECIMAL, format_size};
use log::debug;

/// CLI arguments for `hodge`
#[derive(Parser, Debug)]
#[command(author, version, about, styles = CLAP_STYLING)]
struct Cli {
    /// Log pruning decisions and skipped entries
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Search file trees
    #[command(subcommand_precedence_over_arg = true)]
    Search {
        #[command(flatten)]
        args:   SearchArgs,
        /// What to print for the matches
        #[command(subcommand)]
        output: Option<Output>,
    },
    /// Print content digests of a file
    Hash {
        /// File to hash
        file:       PathBuf,
        /// Digest to compute; repeat for several (default: all)
        #[arg(short, long = "algorithm")]
        algorithms: Vec<HashAlgorithm>,
        /// Bytes read per block
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
    },
    /// Print the metadata of a single path as JSON
    Stat {
        /// Path to describe
        path:            PathBuf,
        /// Describe the target of a symlink instead of the link
        #[arg(short = 'L', long)]
        follow_symlinks: bool,
        /// Include content digests
        #[arg(long)]
        hashes:          bool,
    },
}

/// Where and what to search
#[derive(Args, Debug)]
struct SearchArgs {
    /// Starting paths; globs, `$VAR` and `~` are expanded
    #[arg(default_value = ".")]
    roots:           Vec<String>,
    /// Subtree to skip; repeat for several
    #[arg(short = 'x', long = "exclude")]
    exclude:         Vec<String>,
    /// Glob matched against names and paths; repeat for several
    #[arg(short, long = "pattern")]
    patterns:        Vec<String>,
    /// Smallest size in bytes
    #[arg(long)]
    min_size:        Option<u64>,
    /// Largest size in bytes
    #[arg(long)]
    max_size:        Option<u64>,
    /// Directory levels below each root to list
    #[arg(short = 'd', long)]
    max_depth:       Option<usize>,
    /// Stop after this many matches
    #[arg(short = 'n', long)]
    max_results:     Option<usize>,
    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,
    /// Stay on the filesystem of each root
    #[arg(long)]
    no_mounts:       bool,
    /// Match patterns without folding case
    #[arg(short = 'c', long)]
    case_sensitive:  bool,
}

/// Output modes of `search`
#[derive(Subcommand, Debug)]
enum Output {
    /// Print matching paths (default)
    Paths,
    /// Print the number of matches
    Count,
    /// Print one JSON record per match
    Metadata {
        /// Include content digests of regular files
        #[arg(long)]
        hashes:     bool,
        /// Digest to compute; repeat for several (default: all)
        #[arg(short, long = "algorithm")]
        algorithms: Vec<HashAlgorithm>,
    },
    /// Print the combined size of the matches
    TotalSize,
}

impl SearchArgs {
    /// Map the flags onto search settings
    fn into_spec(self) -> Result<SearchSpec> {
        // Fail fast here; the library only warns about bad patterns
        NameMatcher::strict(&self.patterns, self.case_sensitive)?;

        Ok(SearchSpec::new(self.roots)
            .with_excluded_paths(self.exclude)
            .with_name_patterns(self.patterns)
            .with_case_sensitive(self.case_sensitive)
            .with_min_size(self.min_size)
            .with_max_size(self.max_size)
            .with_max_depth(self.max_depth)
            .with_max_results(self.max_results)
            .with_follow_symlinks(self.follow_symlinks)
            .with_follow_mount_points(!self.no_mounts))
    }
}

/// Fall back to every algorithm when none was named
fn selected(algorithms: Vec<HashAlgorithm>) -> Vec<HashAlgorithm> {
    if algorithms.is_empty() { HashAlgorithm::ALL.to_vec() } else { algorithms }
}

/// Install the logger; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Run a search and print its results
fn search(args: SearchArgs, output: Output) -> Result<()> {
    let mut spec = args.into_spec()?;
    if let Output::Metadata { hashes, algorithms } = &output {
        spec = spec.with_content_hashes(*hashes).with_hash_algorithms(selected(algorithms.clone()));
    }
    let search = FileSearch::new(spec)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        Output::Paths => {
            for path in search.paths() {
                writeln!(out, "{}", path.display())?;
            }
        },
        Output::Count => writeln!(out, "{}", search.count())?,
        Output::Metadata { .. } => {
            for result in &search {
                match result {
                    Ok(entry) => {
                        let line = serde_json::to_string(&entry).map_err(io::Error::from)?;
                        writeln!(out, "{line}")?;
                    },
                    Err(e) => debug!("Skipping entry: {e}"),
                }
            }
        },
        Output::TotalSize => writeln!(out, "{}", format_size(search.total_size(), DECIMAL))?,
    }
    Ok(())
}

/// Print `algorithm  digest` lines for one file
fn hash(file: &Path, algorithms: Vec<HashAlgorithm>, block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(hodgepodge::Error::config("block size must be at least one byte"));
    }
    let hashes = hashing::hash_file(file, selected(algorithms), block_size)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (algorithm, digest) in hashes {
        writeln!(out, "{algorithm}  {digest}")?;
    }
    Ok(())
}

/// Print one path's metadata as JSON
fn stat(path: &Path, follow_symlinks: bool, hashes: bool) -> Result<()> {
    let options = hashes.then(HashOptions::default);
    let entry = metadata::file_metadata(path, follow_symlinks, options.as_ref())?;
    let line = serde_json::to_string_pretty(&entry).map_err(io::Error::from)?;
    println!("{line}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Search { args, output } => search(args, output.unwrap_or(Output::Paths)),
        Command::Hash { file, algorithms, block_size } => hash(&file, algorithms, block_size),
        Command::Stat { path, follow_symlinks, hashes } => stat(&path, follow_symlinks, hashes),
    };

    if let Err(e) = result {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
