//! Content descriptors and the store paths derived from them.
//!
//! A fetched tree is described by up to two digests: a recursive (tree) hash
//! that covers any file system structure, and an optional content hash taken
//! with an explicit ingestion method. The content hash lets a single file
//! fetched in two different ways converge on one store path, so it wins
//! whenever it is usable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::SOURCE_NAME;
use crate::store::path::{AddressingScheme, IngestionMethod, StorePath};
use crate::util::hash::{TreeHashError, TypedHash, hash_file, hash_tree};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nar_hash: Option<TypedHash>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_hash: Option<TypedHash>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ingestion_method: Option<IngestionMethod>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DescriptorError {
  #[error("content descriptor has neither a narHash nor a contentHash")]
  MissingHash,

  #[error("content descriptor has a contentHash but no ingestionMethod")]
  MissingIngestionMethod,
}

impl ContentDescriptor {
  /// Descriptor addressed only by its recursive tree hash.
  pub fn from_nar_hash(nar_hash: TypedHash) -> Self {
    Self {
      nar_hash: Some(nar_hash),
      ..Self::default()
    }
  }

  /// Descriptor addressed by a content hash taken with `method`.
  pub fn from_content_hash(method: IngestionMethod, content_hash: TypedHash) -> Self {
    Self {
      content_hash: Some(content_hash),
      ingestion_method: Some(method),
      ..Self::default()
    }
  }

  /// Hashes local content the way `method` prescribes.
  ///
  /// Flat ingestion hashes the bytes of a single file; recursive ingestion
  /// hashes the whole tree and records it as the tree hash.
  pub fn from_path(path: &Path, method: IngestionMethod) -> Result<Self, TreeHashError> {
    match method {
      IngestionMethod::Flat => Ok(Self::from_content_hash(method, hash_file(path)?)),
      IngestionMethod::Recursive => Ok(Self::from_nar_hash(hash_tree(path)?)),
    }
  }

  /// Checks the invariants `store_path` relies on.
  ///
  /// Descriptors read from untrusted input should be validated first; calling
  /// `store_path` on an invalid descriptor is a bug in the caller.
  pub fn validate(&self) -> Result<(), DescriptorError> {
    if self.content_hash.is_some() && self.ingestion_method.is_none() {
      return Err(DescriptorError::MissingIngestionMethod);
    }
    if self.nar_hash.is_none() && self.content_hash.is_none() {
      return Err(DescriptorError::MissingHash);
    }
    Ok(())
  }

  /// Derives the store path of the described content.
  ///
  /// # Panics
  ///
  /// Panics if neither a usable content hash nor a tree hash is present.
  pub fn store_path(&self, scheme: &dyn AddressingScheme) -> StorePath {
    let (method, hash) = match (&self.content_hash, self.ingestion_method) {
      (Some(content_hash), Some(method)) => (method, content_hash),
      _ => {
        let nar_hash = self
          .nar_hash
          .as_ref()
          .unwrap_or_else(|| panic!("store_path called on a descriptor without narHash: {:?}", self));
        (IngestionMethod::Recursive, nar_hash)
      }
    };

    match scheme.fixed_output_path(method, hash, SOURCE_NAME) {
      Ok(path) => path,
      Err(e) => unreachable!("'{}' is a valid store name: {}", SOURCE_NAME, e),
    }
  }
}
