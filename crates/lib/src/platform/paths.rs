use crate::consts::{APP_NAME, USER_POOL_DIR};
use std::path::PathBuf;

#[cfg(windows)]
pub fn root_dir() -> PathBuf {
  if let Ok(path) = std::env::var("STOREPROBE_ROOT") {
    return PathBuf::from(path);
  }
  let drive = std::env::var("SYSTEMDRIVE").unwrap_or_else(|_| "C:".to_string());
  PathBuf::from(drive).join(APP_NAME)
}

#[cfg(not(windows))]
pub fn root_dir() -> PathBuf {
  if let Ok(path) = std::env::var("STOREPROBE_ROOT") {
    return PathBuf::from(path);
  }
  PathBuf::from("/").join(APP_NAME)
}

/// Directory holding store objects. Part of every store path fingerprint.
pub fn store_dir() -> PathBuf {
  if let Ok(path) = std::env::var("STOREPROBE_STORE_DIR") {
    return PathBuf::from(path);
  }
  root_dir().join("store")
}

/// Mutable store state (databases, slot pool, per-build locks).
pub fn state_dir() -> PathBuf {
  if let Ok(path) = std::env::var("STOREPROBE_STATE_DIR") {
    return PathBuf::from(path);
  }
  root_dir().join("var")
}

/// Directory of build slot lock files, one per slot id.
pub fn user_pool_dir() -> PathBuf {
  state_dir().join(USER_POOL_DIR)
}

/// Mount point of the process-information filesystem.
pub fn proc_root() -> PathBuf {
  if let Ok(path) = std::env::var("STOREPROBE_PROC_ROOT") {
    return PathBuf::from(path);
  }
  PathBuf::from("/proc")
}
