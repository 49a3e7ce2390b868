//! Store path computation for fixed-output content.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::hash::{HashAlgorithm, ObjectHash, TypedHash};

const MAX_NAME_LEN: usize = 211;

/// Normalisation applied to content before it is hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionMethod {
  /// The raw bytes of a single file.
  Flat,
  /// A whole file system tree, structure included.
  Recursive,
}

impl IngestionMethod {
  fn prefix(&self) -> &'static str {
    match self {
      Self::Flat => "",
      Self::Recursive => "r:",
    }
  }
}

/// A store object identifier: `<hash>-<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorePath {
  pub hash: ObjectHash,
  pub name: String,
}

impl StorePath {
  /// Absolute location of this object inside `store_dir`.
  pub fn in_store(&self, store_dir: &Path) -> PathBuf {
    store_dir.join(self.to_string())
  }
}

impl fmt::Display for StorePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.hash, self.name)
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StorePathError {
  #[error("store path name is empty")]
  EmptyName,

  #[error("store path name '{0}' is longer than {MAX_NAME_LEN} characters")]
  NameTooLong(String),

  #[error("store path name '{0}' must not start with '.'")]
  HiddenName(String),

  #[error("store path name '{name}' contains illegal character '{ch}'")]
  IllegalCharacter { name: String, ch: char },
}

pub fn validate_name(name: &str) -> Result<(), StorePathError> {
  if name.is_empty() {
    return Err(StorePathError::EmptyName);
  }
  if name.len() > MAX_NAME_LEN {
    return Err(StorePathError::NameTooLong(name.to_string()));
  }
  if name.starts_with('.') {
    return Err(StorePathError::HiddenName(name.to_string()));
  }
  if let Some(ch) = name
    .chars()
    .find(|c| !(c.is_ascii_alphanumeric() || "+-._?=".contains(*c)))
  {
    return Err(StorePathError::IllegalCharacter {
      name: name.to_string(),
      ch,
    });
  }
  Ok(())
}

/// Maps hashed content to store paths.
///
/// Implementations own the hashing and encoding rules; callers only choose
/// which digest and ingestion method identify the content.
pub trait AddressingScheme {
  fn store_dir(&self) -> &Path;

  fn fixed_output_path(
    &self,
    method: IngestionMethod,
    hash: &TypedHash,
    name: &str,
  ) -> Result<StorePath, StorePathError>;
}

/// Addressing for a store rooted at a local directory.
///
/// Recursive SHA-256 content is addressed directly as a source path. Every
/// other combination goes through an intermediate `fixed:out:` fingerprint so
/// the ingestion method and algorithm are both bound into the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScheme {
  store_dir: PathBuf,
}

impl LocalScheme {
  pub fn new(store_dir: impl Into<PathBuf>) -> Self {
    Self {
      store_dir: store_dir.into(),
    }
  }
}

impl AddressingScheme for LocalScheme {
  fn store_dir(&self) -> &Path {
    &self.store_dir
  }

  fn fixed_output_path(
    &self,
    method: IngestionMethod,
    hash: &TypedHash,
    name: &str,
  ) -> Result<StorePath, StorePathError> {
    validate_name(name)?;
    let store_dir = self.store_dir.display();

    let fingerprint = if method == IngestionMethod::Recursive && hash.algorithm == HashAlgorithm::Sha256 {
      format!("source:{}:{}:{}", hash, store_dir, name)
    } else {
      let inner = crate::util::hash::hash_bytes(format!("fixed:out:{}{}:", method.prefix(), hash).as_bytes());
      format!("output:out:sha256:{}:{}:{}", inner.hex, store_dir, name)
    };

    Ok(StorePath {
      hash: ObjectHash::of(&fingerprint),
      name: name.to_string(),
    })
  }
}
