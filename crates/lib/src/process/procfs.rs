//! Process index backed by a mounted procfs (`/proc/<pid>/...`).

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::{OpenTarget, Pid, ProcessError, ProcessIndex};

#[derive(Debug, Clone)]
pub struct ProcfsIndex {
  root: PathBuf,
}

impl ProcfsIndex {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn pid_dir(&self, pid: Pid) -> PathBuf {
    self.root.join(pid.to_string())
  }
}

impl ProcessIndex for ProcfsIndex {
  fn backend(&self) -> &'static str {
    "procfs"
  }

  fn list_pids(&self) -> Result<Vec<Pid>, ProcessError> {
    let entries = fs::read_dir(&self.root).map_err(|e| ProcessError::ListProcesses {
      path: self.root.clone(),
      source: e,
    })?;

    let mut pids: Vec<Pid> = entries
      .flatten()
      .filter_map(|entry| parse_numeric(&entry.file_name()))
      .collect();
    pids.sort_unstable();
    Ok(pids)
  }

  fn cmdline(&self, pid: Pid) -> Option<String> {
    let raw = fs::read(self.pid_dir(pid).join("cmdline")).ok()?;
    Some(parse_cmdline(&raw))
  }

  fn parent(&self, pid: Pid) -> Option<Pid> {
    let status = fs::read_to_string(self.pid_dir(pid).join("status")).ok()?;
    parse_ppid(&status)
  }

  fn open_targets(&self, pid: Pid) -> Option<Vec<OpenTarget>> {
    let fd_dir = self.pid_dir(pid).join("fd");
    let entries = fs::read_dir(&fd_dir).ok()?;

    let mut targets = Vec::new();
    for entry in entries.flatten() {
      let Some(fd) = parse_numeric(&entry.file_name()) else {
        continue;
      };
      // The descriptor may close between listing and readlink.
      let Ok(path) = fs::read_link(entry.path()) else {
        continue;
      };
      targets.push(OpenTarget { fd, path });
    }
    targets.sort_by_key(|target| target.fd);
    Some(targets)
  }
}

fn parse_numeric(name: &OsStr) -> Option<u32> {
  let name = name.to_str()?;
  if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  name.parse().ok()
}

/// Arguments are NUL-separated (and usually NUL-terminated).
fn parse_cmdline(raw: &[u8]) -> String {
  let joined: Vec<u8> = raw.iter().map(|&b| if b == 0 { b' ' } else { b }).collect();
  String::from_utf8_lossy(&joined).trim_end().to_string()
}

fn parse_ppid(status: &str) -> Option<Pid> {
  status
    .lines()
    .find_map(|line| line.strip_prefix("PPid:"))
    .and_then(|value| value.trim().parse().ok())
}
