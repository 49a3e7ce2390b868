//! Pool directory scanning.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::probe::{find_holder, is_held};
use super::{ScanError, Slot, SlotReport, parse_slot_id};
use crate::consts::LOCK_SUFFIX;
use crate::platform::identity::IdentityLookup;
use crate::process::ProcessIndex;
use crate::process::tree::{leaf_descendants, process_label};

/// Inspects held slots using one process index and identity source.
#[derive(Clone, Copy)]
pub struct SlotScanner<'a> {
  index: &'a dyn ProcessIndex,
  identity: &'a dyn IdentityLookup,
}

impl<'a> SlotScanner<'a> {
  pub fn new(index: &'a dyn ProcessIndex, identity: &'a dyn IdentityLookup) -> Self {
    Self { index, identity }
  }

  /// Starts a scan of `pool_dir`.
  ///
  /// Fails before touching any slot unless the caller owns the pool directory
  /// or is root. Reports are produced lazily, one per held slot, in directory
  /// order; free slots, non-slot entries and holders that vanish mid-scan
  /// yield nothing.
  pub fn scan(&self, pool_dir: &Path) -> Result<SlotScan<'a>, ScanError> {
    self.check_permissions(pool_dir)?;

    let entries = fs::read_dir(pool_dir).map_err(|e| ScanError::ReadPool {
      path: pool_dir.to_path_buf(),
      source: e,
    })?;

    Ok(SlotScan {
      scanner: *self,
      pool_dir: pool_dir.to_path_buf(),
      entries,
    })
  }

  fn check_permissions(&self, pool_dir: &Path) -> Result<(), ScanError> {
    let metadata = fs::metadata(pool_dir).map_err(|e| ScanError::ReadPool {
      path: pool_dir.to_path_buf(),
      source: e,
    })?;

    let euid = self.identity.effective_uid();
    if metadata.uid() != euid && euid != 0 {
      return Err(ScanError::PermissionDenied {
        path: pool_dir.to_path_buf(),
      });
    }
    Ok(())
  }

  /// Builds the report for one slot, or `None` if nobody holds it.
  pub fn inspect(&self, slot: &Slot) -> Result<Option<SlotReport>, ScanError> {
    let held = is_held(&slot.lock_path).map_err(|e| ScanError::Probe {
      path: slot.lock_path.clone(),
      source: e,
    })?;
    if !held {
      return Ok(None);
    }

    let Some(holder) = find_holder(self.index, &slot.lock_path)? else {
      debug!(slot = slot.id, backend = self.index.backend(), "slot holder exited before it was found");
      return Ok(None);
    };

    let owner_name = match self.identity.user_name(slot.id) {
      Ok(Some(name)) => name,
      Ok(None) => return Err(ScanError::UnknownUser { uid: slot.id }),
      Err(e) => return Err(ScanError::IdentityLookup { uid: slot.id, source: e }),
    };

    let leaves = leaf_descendants(self.index, holder)?
      .into_iter()
      .map(|pid| process_label(self.index, pid))
      .collect();

    let lock_paths = self
      .index
      .open_targets(holder)
      .unwrap_or_default()
      .into_iter()
      .map(|target| target.path)
      .filter(|path| path.to_string_lossy().ends_with(LOCK_SUFFIX))
      .collect();

    Ok(Some(SlotReport {
      slot_id: slot.id,
      owner_name,
      holder_pid: holder,
      holder_label: process_label(self.index, holder),
      leaves,
      lock_paths,
    }))
  }
}

/// Lazy sequence of reports for the held slots of one pool directory.
pub struct SlotScan<'a> {
  scanner: SlotScanner<'a>,
  pool_dir: PathBuf,
  entries: fs::ReadDir,
}

impl Iterator for SlotScan<'_> {
  type Item = Result<SlotReport, ScanError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let entry = match self.entries.next()? {
        Ok(entry) => entry,
        Err(e) => {
          warn!(pool = %self.pool_dir.display(), error = %e, "failed to read slot pool entry");
          return Some(Err(ScanError::ReadPool {
            path: self.pool_dir.clone(),
            source: e,
          }));
        }
      };

      let Some(id) = entry.file_name().to_str().and_then(parse_slot_id) else {
        continue;
      };
      let slot = Slot {
        id,
        lock_path: entry.path(),
      };

      match self.scanner.inspect(&slot) {
        Ok(Some(report)) => return Some(Ok(report)),
        Ok(None) => continue,
        Err(e) => return Some(Err(e)),
      }
    }
  }
}
