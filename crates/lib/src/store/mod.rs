//! Store selection and addressing.
//!
//! Only stores living on the local file system can be inspected: the slot pool
//! and the processes holding its locks are host-local state.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── store/                  # Content-addressed objects
//! │   └── <hash>-<name>
//! └── var/
//!     └── userpool/           # One lock file per build slot
//!         └── <uid>
//! ```

pub mod descriptor;
pub mod path;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::USER_POOL_DIR;
use crate::platform::paths::{state_dir, store_dir};
use crate::store::path::LocalScheme;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("must provide local store, found '{0}'")]
  NotLocal(String),
}

/// Where a store lives, as given by a store URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUri {
  /// Local store; `None` selects the configured default location.
  Local(Option<PathBuf>),
  Remote(String),
}

impl StoreUri {
  /// Classifies a store URI.
  ///
  /// `""`, `auto`, `local`, absolute paths and `file://` URIs are local;
  /// everything else (daemon sockets, ssh, http caches) is remote.
  pub fn parse(uri: &str) -> Self {
    match uri {
      "" | "auto" | "local" => StoreUri::Local(None),
      _ if uri.starts_with('/') => StoreUri::Local(Some(PathBuf::from(uri))),
      _ => match uri.strip_prefix("file://") {
        Some(path) if path.starts_with('/') => StoreUri::Local(Some(PathBuf::from(path))),
        _ => StoreUri::Remote(uri.to_string()),
      },
    }
  }
}

impl fmt::Display for StoreUri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StoreUri::Local(None) => f.write_str("local"),
      StoreUri::Local(Some(root)) => write!(f, "{}", root.display()),
      StoreUri::Remote(uri) => f.write_str(uri),
    }
  }
}

/// A store on the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStore {
  store_dir: PathBuf,
  state_dir: PathBuf,
}

impl LocalStore {
  pub fn new(store_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
    Self {
      store_dir: store_dir.into(),
      state_dir: state_dir.into(),
    }
  }

  /// Opens the store a URI points at, refusing anything non-local.
  ///
  /// A local URI naming a root directory uses `<root>/store` and `<root>/var`;
  /// the default location follows the environment configuration.
  pub fn open(uri: &StoreUri) -> Result<Self, StoreError> {
    match uri {
      StoreUri::Local(None) => Ok(Self::new(store_dir(), state_dir())),
      StoreUri::Local(Some(root)) => Ok(Self::new(root.join("store"), root.join("var"))),
      StoreUri::Remote(uri) => Err(StoreError::NotLocal(uri.clone())),
    }
  }

  pub fn store_dir(&self) -> &Path {
    &self.store_dir
  }

  pub fn state_dir(&self) -> &Path {
    &self.state_dir
  }

  pub fn user_pool_dir(&self) -> PathBuf {
    self.state_dir.join(USER_POOL_DIR)
  }

  pub fn addressing(&self) -> LocalScheme {
    LocalScheme::new(&self.store_dir)
  }
}
