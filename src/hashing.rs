//! Streaming content hashes
//!
//! Every block read from a file is fed into one running accumulator per
//! requested algorithm, so a file is read exactly once whatever the number
//! of digests.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{Error, Result};
use crate::types::{DEFAULT_BLOCK_SIZE, Hashes};

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    /// MD5 (128 bits)
    Md5,
    /// SHA-1 (160 bits)
    Sha1,
    /// SHA-256 (256 bits)
    Sha256,
    /// SHA-512 (512 bits)
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, the default selection
    pub const ALL: [Self; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Name used as the key in [`Hashes`]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn accumulator(self) -> Accumulator {
        match self {
            Self::Md5 => Accumulator::Md5(Md5::new()),
            Self::Sha1 => Accumulator::Sha1(Sha1::new()),
            Self::Sha256 => Accumulator::Sha256(Sha256::new()),
            Self::Sha512 => Accumulator::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// Running digest state for one algorithm
enum Accumulator {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Accumulator {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => format!("{:x}", h.finalize()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha512(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Set of accumulators fed in lockstep
pub struct MultiHasher {
    /// One accumulator per requested algorithm
    accumulators: Vec<(HashAlgorithm, Accumulator)>,
}

impl fmt::Debug for MultiHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.accumulators.iter().map(|(algorithm, _)| algorithm)).finish()
    }
}

impl MultiHasher {
    /// Create accumulators for each distinct algorithm
    #[must_use]
    pub fn new<I>(algorithms: I) -> Self
    where
        I: IntoIterator<Item = HashAlgorithm>,
    {
        let mut algorithms: Vec<HashAlgorithm> = algorithms.into_iter().collect();
        algorithms.sort_unstable();
        algorithms.dedup();
        Self {
            accumulators: algorithms.into_iter().map(|a| (a, a.accumulator())).collect(),
        }
    }

    /// Feed a block to every accumulator
    pub fn update(&mut self, data: &[u8]) {
        for (_, accumulator) in &mut self.accumulators {
            accumulator.update(data);
        }
    }

    /// Finish every accumulator into lowercase hex digests
    #[must_use]
    pub fn finalize(self) -> Hashes {
        self.accumulators
            .into_iter()
            .map(|(algorithm, accumulator)| (algorithm.name().to_owned(), accumulator.finalize_hex()))
            .collect()
    }
}

/// Hash an in-memory buffer
#[must_use]
pub fn hash_bytes<I>(data: &[u8], algorithms: I) -> Hashes
where
    I: IntoIterator<Item = HashAlgorithm>,
{
    let mut hasher = MultiHasher::new(algorithms);
    hasher.update(data);
    hasher.finalize()
}

/// Hash a reader until end of stream, `block_size` bytes at a time
///
/// # Errors
/// Returns error if a read fails; no digest is produced in that case.
pub fn hash_reader<R, I>(mut reader: R, algorithms: I, block_size: usize) -> std::io::Result<Hashes>
where
    R: Read,
    I: IntoIterator<Item = HashAlgorithm>,
{
    let mut hasher = MultiHasher::new(algorithms);
    let mut block = vec![0u8; block_size.max(1)];
    loop {
        match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => hasher.update(&block[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize())
}

/// Hash a file on disk
///
/// # Errors
/// Returns [`Error::Hash`] if the file cannot be opened or read.
pub fn hash_file<I>(path: &Path, algorithms: I, block_size: usize) -> Result<Hashes>
where
    I: IntoIterator<Item = HashAlgorithm>,
{
    File::open(path)
        .and_then(|file| hash_reader(file, algorithms, block_size))
        .map_err(|source| Error::Hash { path: path.to_path_buf(), source })
}

/// Hash a file with every algorithm and the default block size
///
/// # Errors
/// Returns [`Error::Hash`] if the file cannot be opened or read.
pub fn hash_file_default(path: &Path) -> Result<Hashes> {
    hash_file(path, HashAlgorithm::ALL, DEFAULT_BLOCK_SIZE)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_hash_bytes_known_vectors() {
        let hashes = hash_bytes(b"hello world", HashAlgorithm::ALL);
        assert_eq!(hashes["md5"], HELLO_MD5);
        assert_eq!(hashes["sha1"], HELLO_SHA1);
        assert_eq!(hashes["sha256"], HELLO_SHA256);
        assert_eq!(hashes["sha512"].len(), 128);
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    fn test_hash_file_matches_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        File::create(&path).unwrap().write_all(b"hello world").unwrap();

        // A 3-byte block forces many partial updates
        let streamed = hash_file(&path, HashAlgorithm::ALL, 3).unwrap();
        assert_eq!(streamed["md5"], HELLO_MD5);
        assert_eq!(streamed["sha256"], HELLO_SHA256);
        assert_eq!(streamed, hash_bytes(b"hello world", HashAlgorithm::ALL));
        assert_eq!(streamed, hash_file_default(&path).unwrap());
    }

    #[test]
    fn test_hash_large_file_across_blocks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        File::create(&path).unwrap().write_all(&data).unwrap();

        let streamed = hash_file(&path, [HashAlgorithm::Sha512], DEFAULT_BLOCK_SIZE).unwrap();
        assert_eq!(streamed, hash_bytes(&data, [HashAlgorithm::Sha512]));
    }

    #[test]
    fn test_selected_algorithms_only() {
        let hashes = hash_bytes(b"", [HashAlgorithm::Sha256, HashAlgorithm::Md5, HashAlgorithm::Md5]);
        assert_eq!(hashes.keys().collect::<Vec<_>>(), vec!["md5", "sha256"]);
        assert_eq!(hashes["md5"], "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        match hash_file(&missing, HashAlgorithm::ALL, DEFAULT_BLOCK_SIZE) {
            Err(Error::Hash { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), ErrorKind::NotFound);
            },
            other => panic!("Expected Hash error, got {other:?}"),
        }
    }

    #[test]
    fn test_reader_failure_yields_no_digest() {
        struct Flaky {
            calls: usize,
        }
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.calls += 1;
                if self.calls > 2 {
                    return Err(std::io::Error::other("device went away"));
                }
                buf[0] = b'x';
                Ok(1)
            }
        }

        assert!(hash_reader(Flaky { calls: 0 }, HashAlgorithm::ALL, 16).is_err());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!(HashAlgorithm::Sha1.to_string(), "sha1");
        assert!(matches!("crc32".parse::<HashAlgorithm>(), Err(Error::UnsupportedAlgorithm(_))));
    }
}
