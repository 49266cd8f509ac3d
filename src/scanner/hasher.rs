//! Partial and full content digests.
//!
//! # Overview
//!
//! Two digest flavors drive the dedup stages:
//!
//! - **Partial digest**: a cheap pre-filter over the first and last chunk of
//!   a file (default 4 KiB each). The two chunks are concatenated *before*
//!   digesting so that different split points can never produce the same
//!   digest pair. Matching partial digests are never proof of equality.
//! - **Full digest**: streams the entire file through a cryptographic
//!   digest. This is the authoritative duplicate confirmation.
//!
//! BLAKE3 is the default algorithm (memory-mapped and multi-threaded for
//! large files); SHA-256 is available for the conservative.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use super::HashError;

/// A 32-byte content digest. Both supported algorithms produce 256 bits.
pub type Digest = [u8; 32];

/// Default sample size for partial digests, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Files at or above this size are hashed via memory mapping with the
/// multi-threaded BLAKE3 path.
const MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Streaming read buffer for the non-mmap paths.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Content digest algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// BLAKE3 (default): fast, parallel, cryptographically secure.
    #[default]
    Blake3,
    /// SHA-256 via the `sha2` crate.
    Sha256,
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestAlgorithm::Blake3 => write!(f, "blake3"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Computes partial and full digests for single files.
///
/// # Example
///
/// ```no_run
/// use dupescan::scanner::Hasher;
/// use std::path::Path;
///
/// let hasher = Hasher::new();
/// let partial = hasher.partial_digest(Path::new("a.bin")).unwrap();
/// let full = hasher.full_digest(Path::new("a.bin")).unwrap();
/// assert_eq!(partial.len(), 32);
/// assert_eq!(full.len(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: DigestAlgorithm,
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default algorithm (BLAKE3) and chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: DigestAlgorithm::Blake3,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the partial-digest sample size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The configured digest algorithm.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The configured partial-digest sample size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the partial digest of a file.
    ///
    /// Reads the first and last `chunk_size` bytes and digests their
    /// concatenation. Files smaller than two chunks are read whole, so the
    /// same bytes may contribute twice near the midpoint; that overlap is
    /// deliberate and kept stable for cache compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file vanishes or becomes unreadable.
    pub fn partial_digest(&self, path: &Path) -> Result<Digest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let chunk = self.chunk_size as u64;
        let mut sample = Vec::with_capacity((chunk as usize) * 2);

        if size < chunk * 2 {
            file.read_to_end(&mut sample)
                .map_err(|e| HashError::from_io(path, e))?;
        } else {
            let mut head = vec![0u8; self.chunk_size];
            file.read_exact(&mut head)
                .map_err(|e| HashError::from_io(path, e))?;
            file.seek(SeekFrom::End(-(chunk as i64)))
                .map_err(|e| HashError::from_io(path, e))?;
            let mut tail = vec![0u8; self.chunk_size];
            file.read_exact(&mut tail)
                .map_err(|e| HashError::from_io(path, e))?;
            sample = head;
            sample.extend_from_slice(&tail);
        }

        Ok(self.digest_bytes(&sample))
    }

    /// Compute the full content digest of a file.
    ///
    /// Streams the whole file; large files take the memory-mapped,
    /// rayon-parallel BLAKE3 path when that algorithm is selected.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file vanishes or becomes unreadable
    /// mid-read.
    pub fn full_digest(&self, path: &Path) -> Result<Digest, HashError> {
        match self.algorithm {
            DigestAlgorithm::Blake3 => self.full_blake3(path),
            DigestAlgorithm::Sha256 => self.full_sha256(path),
        }
    }

    fn full_blake3(&self, path: &Path) -> Result<Digest, HashError> {
        let size = std::fs::metadata(path)
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut hasher = blake3::Hasher::new();
        if size >= MMAP_THRESHOLD {
            hasher
                .update_mmap_rayon(path)
                .map_err(|e| HashError::from_io(path, e))?;
        } else {
            let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
            let mut buf = vec![0u8; READ_BUF_SIZE];
            loop {
                let n = file.read(&mut buf).map_err(|e| HashError::from_io(path, e))?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
        }
        Ok(*hasher.finalize().as_bytes())
    }

    fn full_sha256(&self, path: &Path) -> Result<Digest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            let n = file.read(&mut buf).map_err(|e| HashError::from_io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().into())
    }

    fn digest_bytes(&self, bytes: &[u8]) -> Digest {
        match self.algorithm {
            DigestAlgorithm::Blake3 => *blake3::hash(bytes).as_bytes(),
            DigestAlgorithm::Sha256 => Sha256::digest(bytes).into(),
        }
    }
}

/// Render a digest as a lowercase hex string.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse a 64-character hex string back into a digest.
#[must_use]
pub fn hex_to_digest(hex: &str) -> Option<Digest> {
    if hex.len() != 64 {
        return None;
    }
    let mut digest = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
        let s = std::str::from_utf8(chunk).ok()?;
        digest[i] = u8::from_str_radix(s, 16).ok()?;
    }
    Some(digest)
}
