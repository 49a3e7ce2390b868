//! Process-table queries.
//!
//! Two backends answer the same questions:
//! - [`ProcfsIndex`] reads a mounted process-information filesystem directly.
//! - [`FuserIndex`] shells out to `fuser(1)` where no such filesystem exists;
//!   it can locate a lock holder but cannot enumerate processes.
//!
//! The process table changes underneath every query. Per-pid lookups therefore
//! answer `None` instead of failing when a process has exited or hides its
//! details from the caller.

pub mod fuser;
pub mod procfs;
pub mod tree;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub use fuser::FuserIndex;
pub use procfs::ProcfsIndex;

pub type Pid = u32;

/// An open descriptor and the path it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTarget {
  pub fd: u32,
  pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to list processes in {path}: {source}")]
  ListProcesses {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to collect output of {program}: {source}")]
  Output {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{program} exited with {status} for {path}")]
  ExitStatus {
    program: String,
    status: std::process::ExitStatus,
    path: PathBuf,
  },

  #[error("{program} did not finish within {timeout:?} for {path}")]
  Timeout {
    program: String,
    timeout: Duration,
    path: PathBuf,
  },

  #[error("could not parse a pid from {program} output {output:?}")]
  Parse { program: String, output: String },
}

/// Read-only view of the OS process table.
pub trait ProcessIndex {
  /// Backend name for diagnostics.
  fn backend(&self) -> &'static str;

  /// Pids present at the time of the call.
  fn list_pids(&self) -> Result<Vec<Pid>, ProcessError>;

  /// Command line with arguments joined by spaces.
  fn cmdline(&self, pid: Pid) -> Option<String>;

  fn parent(&self, pid: Pid) -> Option<Pid>;

  /// Open descriptors of `pid`, skipping any that no longer resolve.
  /// `None` when the descriptor table itself cannot be read.
  fn open_targets(&self, pid: Pid) -> Option<Vec<OpenTarget>>;

  /// First process holding `path` open, if any.
  fn find_holder(&self, path: &Path) -> Result<Option<Pid>, ProcessError> {
    for pid in self.list_pids()? {
      let Some(targets) = self.open_targets(pid) else {
        continue;
      };
      if targets.iter().any(|target| target.path == path) {
        return Ok(Some(pid));
      }
    }
    Ok(None)
  }
}

/// Options for choosing and configuring a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
  pub proc_root: PathBuf,
  pub fuser_timeout: Option<Duration>,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      proc_root: crate::platform::paths::proc_root(),
      fuser_timeout: None,
    }
  }
}

/// Picks the backend once, by probing for `<proc_root>/self`.
pub fn detect(config: &IndexConfig) -> Box<dyn ProcessIndex> {
  if config.proc_root.join("self").exists() {
    debug!(root = %config.proc_root.display(), "using procfs process index");
    Box::new(ProcfsIndex::new(&config.proc_root))
  } else {
    debug!(timeout = ?config.fuser_timeout, "no procfs found, falling back to fuser");
    Box::new(FuserIndex::new().with_timeout(config.fuser_timeout))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn detect_prefers_procfs_when_mounted() {
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("self")).unwrap();

    let index = detect(&IndexConfig {
      proc_root: root.path().to_path_buf(),
      fuser_timeout: None,
    });
    assert_eq!(index.backend(), "procfs");
  }

  #[test]
  fn detect_falls_back_without_procfs() {
    let root = tempdir().unwrap();

    let index = detect(&IndexConfig {
      proc_root: root.path().join("missing"),
      fuser_timeout: Some(Duration::from_secs(1)),
    });
    assert_eq!(index.backend(), "fuser");
  }
}
