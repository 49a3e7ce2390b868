//! Implementation of the `storeprobe store-path` command.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use storeprobe_lib::store::descriptor::ContentDescriptor;
use storeprobe_lib::store::path::IngestionMethod;
use storeprobe_lib::store::{LocalStore, StoreUri};

/// Where the content to address comes from.
pub enum StorePathSource {
  /// A JSON content descriptor file.
  Descriptor(PathBuf),
  /// Local content, hashed on the spot.
  Content { path: PathBuf, flat: bool },
}

/// Execute the store-path command.
///
/// Prints the absolute store path the content would occupy in the selected
/// store. Nothing is added to the store.
pub fn cmd_store_path(store_uri: &str, source: StorePathSource) -> Result<()> {
  let store = LocalStore::open(&StoreUri::parse(store_uri))?;

  let descriptor = match source {
    StorePathSource::Descriptor(file) => {
      let text =
        fs::read_to_string(&file).with_context(|| format!("Failed to read descriptor {}", file.display()))?;
      let descriptor: ContentDescriptor =
        serde_json::from_str(&text).with_context(|| format!("Invalid descriptor {}", file.display()))?;
      descriptor
        .validate()
        .with_context(|| format!("Invalid descriptor {}", file.display()))?;
      descriptor
    }
    StorePathSource::Content { path, flat } => {
      let method = if flat {
        IngestionMethod::Flat
      } else {
        IngestionMethod::Recursive
      };
      ContentDescriptor::from_path(&path, method).with_context(|| format!("Failed to hash {}", path.display()))?
    }
  };

  debug!(?descriptor, store = %store.store_dir().display(), "deriving store path");

  let store_path = descriptor.store_path(&store.addressing());
  println!("{}", store_path.in_store(store.store_dir()).display());
  Ok(())
}
