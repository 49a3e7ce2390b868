//! Hashing utilities for content-addressed storage.
//!
//! This module provides:
//! - `ObjectHash`: A truncated 20-character hash for store paths
//! - `TypedHash`: An algorithm-tagged digest (`sha256:<hex>`) describing content
//! - `hash_tree()`: Deterministic hashing of a file or directory tree
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

/// A content-addressed hash identifying a store object.
///
/// The hash is the first 20 hex characters of a SHA-256 digest. This provides
/// sufficient collision resistance while keeping paths readable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl ObjectHash {
  /// Truncates the SHA-256 of `fingerprint` to the store path prefix length.
  pub fn of(fingerprint: &str) -> Self {
    let full = hash_bytes(fingerprint.as_bytes());
    ObjectHash(full.hex[..OBJ_HASH_PREFIX_LEN].to_string())
  }
}

impl fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
  Sha256,
  Sha512,
}

impl HashAlgorithm {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Sha256 => "sha256",
      Self::Sha512 => "sha512",
    }
  }

  /// Length of the digest in bytes.
  pub fn digest_len(&self) -> usize {
    match self {
      Self::Sha256 => 32,
      Self::Sha512 => 64,
    }
  }
}

impl fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
  #[error("hash '{0}' is missing an algorithm prefix (expected '<algo>:<hex>')")]
  MissingAlgorithm(String),

  #[error("unsupported hash algorithm '{0}'")]
  UnsupportedAlgorithm(String),

  #[error("invalid hex digest '{0}'")]
  InvalidHex(String),

  #[error("{algorithm} digest must be {expected} bytes, got {actual}")]
  WrongLength {
    algorithm: HashAlgorithm,
    expected: usize,
    actual: usize,
  },
}

/// A digest tagged with the algorithm that produced it.
///
/// # Format
///
/// Textual form is `<algo>:<hex>` with a lowercase hex digest, e.g.
/// `"sha256:2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypedHash {
  pub algorithm: HashAlgorithm,
  pub hex: String,
}

impl TypedHash {
  pub fn sha256(hex: impl Into<String>) -> Result<Self, HashError> {
    Self::new(HashAlgorithm::Sha256, hex)
  }

  pub fn new(algorithm: HashAlgorithm, hex: impl Into<String>) -> Result<Self, HashError> {
    let hex = hex.into().to_ascii_lowercase();
    let bytes = hex::decode(&hex).map_err(|_| HashError::InvalidHex(hex.clone()))?;
    if bytes.len() != algorithm.digest_len() {
      return Err(HashError::WrongLength {
        algorithm,
        expected: algorithm.digest_len(),
        actual: bytes.len(),
      });
    }
    Ok(Self { algorithm, hex })
  }
}

impl FromStr for TypedHash {
  type Err = HashError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (algo, digest) = s
      .split_once(':')
      .ok_or_else(|| HashError::MissingAlgorithm(s.to_string()))?;
    let algorithm = match algo {
      "sha256" => HashAlgorithm::Sha256,
      "sha512" => HashAlgorithm::Sha512,
      other => return Err(HashError::UnsupportedAlgorithm(other.to_string())),
    };
    Self::new(algorithm, digest)
  }
}

impl TryFrom<String> for TypedHash {
  type Error = HashError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<TypedHash> for String {
  fn from(hash: TypedHash) -> Self {
    hash.to_string()
  }
}

impl fmt::Display for TypedHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.algorithm, self.hex)
  }
}

/// Error while hashing local content.
#[derive(Debug, thiserror::Error)]
pub enum TreeHashError {
  #[error("failed to walk {path}: {source}")]
  WalkDir {
    path: String,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read symlink {path}: {source}")]
  ReadSymlink {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// Compute a deterministic hash of a file or directory tree.
///
/// The hash covers file contents, directory structure and symlink targets, but
/// not metadata such as timestamps. Entries are visited in file-name order. A
/// plain file root hashes as a single anonymous entry so that a file and a
/// directory containing it never collide.
pub fn hash_tree(path: &Path) -> Result<TypedHash, TreeHashError> {
  let mut hasher = Sha256::new();

  for entry in WalkDir::new(path).sort_by_file_name() {
    let entry = entry.map_err(|e| TreeHashError::WalkDir {
      path: path.display().to_string(),
      source: e,
    })?;
    let entry_path = entry.path();

    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .to_string_lossy()
      .replace('\\', "/");

    let file_type = entry.file_type();
    let line = if file_type.is_file() {
      format!("F:{}:{}", rel_path, hash_file(entry_path)?.hex)
    } else if file_type.is_dir() {
      if rel_path.is_empty() {
        continue;
      }
      format!("D:{}", rel_path)
    } else if file_type.is_symlink() {
      let target = fs::read_link(entry_path).map_err(|e| TreeHashError::ReadSymlink {
        path: entry_path.display().to_string(),
        source: e,
      })?;
      format!("L:{}:{}", rel_path, hash_bytes(target.to_string_lossy().as_bytes()).hex)
    } else {
      // Sockets, devices and fifos carry no content.
      continue;
    };

    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }

  Ok(sha256_digest(hasher))
}

/// Hash a file's contents with SHA-256.
pub fn hash_file(path: &Path) -> Result<TypedHash, TreeHashError> {
  let read_err = |e| TreeHashError::ReadFile {
    path: path.display().to_string(),
    source: e,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(sha256_digest(hasher))
}

/// Hash arbitrary bytes with SHA-256.
pub fn hash_bytes(data: &[u8]) -> TypedHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  sha256_digest(hasher)
}

fn sha256_digest(hasher: Sha256) -> TypedHash {
  TypedHash {
    algorithm: HashAlgorithm::Sha256,
    hex: hex::encode(hasher.finalize()),
  }
}
