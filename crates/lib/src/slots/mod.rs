//! Build slot pool inspection.
//!
//! Every build slot is a file in the pool directory named after the uid it
//! grants, locked exclusively by the process currently using that identity.
//! Slots are created and handed out elsewhere; this module only looks.

pub mod probe;
pub mod render;
pub mod scan;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::{Pid, ProcessError};

pub use probe::{find_holder, is_held};
pub use render::ReportWriter;
pub use scan::{SlotScan, SlotScanner};

#[derive(Debug, Error)]
pub enum ScanError {
  #[error("you don't have permissions to see the userpool locks in {path}")]
  PermissionDenied { path: PathBuf },

  #[error("failed to read slot pool {path}: {source}")]
  ReadPool {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to probe slot lock {path}: {source}")]
  Probe {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("can't find user for uid '{uid}'")]
  UnknownUser { uid: u32 },

  #[error("failed to look up user for uid '{uid}': {source}")]
  IdentityLookup {
    uid: u32,
    #[source]
    source: io::Error,
  },
}

/// A slot as observed in the pool directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
  pub id: u32,
  pub lock_path: PathBuf,
}

/// Parses a pool entry name as a slot id.
///
/// Slot ids are uids: one or more ASCII digits that fit in a `u32`. Signs,
/// whitespace and anything else mark the entry as not being a slot.
pub fn parse_slot_id(name: &str) -> Option<u32> {
  if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  name.parse().ok()
}

/// What a held slot is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReport {
  pub slot_id: u32,
  pub owner_name: String,
  pub holder_pid: Pid,
  pub holder_label: String,
  /// Leaf processes under the holder, the ones doing actual work.
  pub leaves: Vec<String>,
  pub lock_paths: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_unsigned_decimal_ids() {
    assert_eq!(parse_slot_id("3"), Some(3));
    assert_eq!(parse_slot_id("30001"), Some(30001));
    assert_eq!(parse_slot_id("007"), Some(7));
    assert_eq!(parse_slot_id("4294967295"), Some(u32::MAX));
  }

  #[test]
  fn rejects_everything_else() {
    for name in ["abc", "-1", "+3", "", " 3", "3 ", "3.0", "0x10", "4294967296", "5.lock"] {
      assert_eq!(parse_slot_id(name), None, "{name:?}");
    }
  }
}
