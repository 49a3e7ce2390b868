//! Lock probing for slot files.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::process::{Pid, ProcessError, ProcessIndex};

/// Whether another open file description holds an exclusive lock on the file.
///
/// The probe takes the lock itself without blocking and releases it at once,
/// so a free slot is left exactly as it was found. A file that disappeared
/// before it could be opened is reported as free.
pub fn is_held(lock_path: &Path) -> io::Result<bool> {
  let file = match OpenOptions::new().read(true).write(true).open(lock_path) {
    Ok(file) => file,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
    Err(e) => return Err(e),
  };

  match try_lock_exclusive(&file) {
    Ok(()) => {
      unlock(&file)?;
      Ok(false)
    }
    Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(true),
    Err(e) => Err(e),
  }
}

/// Finds the process holding `lock_path` open.
///
/// `None` means the holder went away after the lock was observed as held.
pub fn find_holder(index: &dyn ProcessIndex, lock_path: &Path) -> Result<Option<Pid>, ProcessError> {
  // Open descriptors resolve to canonical paths.
  let Ok(canonical) = dunce::canonicalize(lock_path) else {
    return Ok(None);
  };
  index.find_holder(&canonical)
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(unix)]
fn unlock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::Unlock).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::util::testutil::{FakeProc, hold_lock};
  use tempfile::TempDir;

  fn slot_file(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "").unwrap();
    path
  }

  #[test]
  fn free_slot_is_not_held() {
    let dir = TempDir::new().unwrap();
    let path = slot_file(&dir, "5");
    assert!(!is_held(&path).unwrap());
  }

  #[test]
  fn probing_leaves_free_slot_free() {
    let dir = TempDir::new().unwrap();
    let path = slot_file(&dir, "5");

    for _ in 0..5 {
      assert!(!is_held(&path).unwrap());
    }
    // Would panic if a probe had left the lock behind.
    let _lock = hold_lock(&path);
  }

  #[test]
  fn held_slot_is_detected_until_released() {
    let dir = TempDir::new().unwrap();
    let path = slot_file(&dir, "5");

    let lock = hold_lock(&path);
    assert!(is_held(&path).unwrap());
    assert!(is_held(&path).unwrap());

    drop(lock);
    assert!(!is_held(&path).unwrap());
  }

  #[test]
  fn vanished_slot_is_free() {
    let dir = TempDir::new().unwrap();
    assert!(!is_held(&dir.path().join("5")).unwrap());
  }

  #[test]
  fn holder_is_found_through_the_index() {
    let dir = TempDir::new().unwrap();
    let path = slot_file(&dir, "5");
    let proc = FakeProc::new();
    proc.spawn(4242, 1, &["worker"]);
    proc.open(4242, 3, &dunce::canonicalize(&path).unwrap());

    assert_eq!(find_holder(&proc.index(), &path).unwrap(), Some(4242));
  }

  #[test]
  fn missing_holder_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = slot_file(&dir, "5");
    let proc = FakeProc::new();
    proc.spawn(4242, 1, &["worker"]);

    assert_eq!(find_holder(&proc.index(), &path).unwrap(), None);
    assert_eq!(find_holder(&proc.index(), &dir.path().join("gone")).unwrap(), None);
  }
}
