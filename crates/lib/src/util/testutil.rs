//! Test utilities for storeprobe-lib.
//!
//! `FakeProc` lays out a synthetic procfs tree in a temporary directory so the
//! process index and slot scanner can be exercised against a known process
//! table.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::process::{Pid, ProcfsIndex};

pub struct FakeProc {
  root: TempDir,
}

impl FakeProc {
  pub fn new() -> Self {
    let root = TempDir::new().unwrap();
    fs::create_dir(root.path().join("self")).unwrap();
    Self { root }
  }

  pub fn path(&self) -> &Path {
    self.root.path()
  }

  pub fn index(&self) -> ProcfsIndex {
    ProcfsIndex::new(self.root.path())
  }

  /// Adds a process with the given parent and NUL-separated arguments.
  pub fn spawn(&self, pid: Pid, ppid: Pid, args: &[&str]) {
    let dir = self.root.path().join(pid.to_string());
    fs::create_dir_all(dir.join("fd")).unwrap();

    let mut cmdline = Vec::new();
    for arg in args {
      cmdline.extend_from_slice(arg.as_bytes());
      cmdline.push(0);
    }
    fs::write(dir.join("cmdline"), cmdline).unwrap();
    fs::write(
      dir.join("status"),
      format!("Name:\t{}\nPid:\t{}\nPPid:\t{}\n", args.first().unwrap_or(&""), pid, ppid),
    )
    .unwrap();
  }

  /// Removes the command line, as for a process hiding it from the caller.
  pub fn hide_cmdline(&self, pid: Pid) {
    fs::remove_file(self.root.path().join(pid.to_string()).join("cmdline")).unwrap();
  }

  /// Records descriptor `fd` of `pid` as pointing at `target`.
  #[cfg(unix)]
  pub fn open(&self, pid: Pid, fd: u32, target: &Path) {
    let link = self.root.path().join(pid.to_string()).join("fd").join(fd.to_string());
    std::os::unix::fs::symlink(target, link).unwrap();
  }
}

/// Takes an exclusive lock on `path` through a fresh open file description,
/// creating the file if needed. The lock lasts as long as the returned file.
#[cfg(unix)]
pub fn hold_lock(path: &Path) -> fs::File {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let file = fs::OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(path)
    .unwrap();
  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive).unwrap();
  file
}
