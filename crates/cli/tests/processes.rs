//! Integration tests for `storeprobe processes`.
//!
//! Each test lays out a store root with a userpool, and where needed a
//! synthetic proc tree or a stand-in `fuser`, then runs the real binary.

#![cfg(unix)]

use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rustix::fs::{FlockOperation, flock};
use serial_test::serial;
use tempfile::TempDir;

fn probe_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("storeprobe");
  cmd.env_remove("STOREPROBE_STORE").env_remove("STOREPROBE_FUSER_TIMEOUT");
  cmd
}

/// Effective uid of the test process and its user name.
fn current_user() -> (u32, String) {
  let uid = nix::unistd::geteuid();
  let user = nix::unistd::User::from_uid(uid).unwrap().expect("test user has a passwd entry");
  (uid.as_raw(), user.name)
}

/// Store root with an empty `var/userpool`.
fn store_root() -> (TempDir, PathBuf) {
  let root = TempDir::new().unwrap();
  let pool = root.path().join("var").join("userpool");
  fs::create_dir_all(&pool).unwrap();
  (root, pool)
}

fn hold_lock(path: &Path) -> File {
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

/// Writes a process entry into a synthetic proc tree.
fn fake_process(proc_root: &Path, pid: u32, ppid: u32, cmdline: &str, fds: &[&Path]) {
  let dir = proc_root.join(pid.to_string());
  fs::create_dir_all(dir.join("fd")).unwrap();
  fs::write(dir.join("cmdline"), cmdline).unwrap();
  fs::write(dir.join("status"), format!("Name:\tfake\nPid:\t{pid}\nPPid:\t{ppid}\n")).unwrap();
  for (fd, target) in fds.iter().enumerate() {
    std::os::unix::fs::symlink(target, dir.join("fd").join((fd + 3).to_string())).unwrap();
  }
}

/// Directory holding an executable `fuser` with the given shell body.
fn fake_fuser(body: &str) -> TempDir {
  let dir = TempDir::new().unwrap();
  let script = dir.path().join("fuser");
  fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
  fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
  dir
}

fn path_with(dir: &Path) -> String {
  format!("{}:{}", dir.display(), std::env::var("PATH").unwrap_or_default())
}

// =============================================================================
// Store selection
// =============================================================================

#[test]
fn remote_store_is_refused() {
  probe_cmd()
    .args(["--store", "ssh://builder", "processes"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("must provide local store, found 'ssh://builder'"));
}

#[test]
fn store_can_come_from_environment() {
  probe_cmd()
    .env("STOREPROBE_STORE", "daemon")
    .arg("processes")
    .assert()
    .failure()
    .stderr(predicate::str::contains("found 'daemon'"));
}

#[test]
fn bad_fuser_timeout_is_a_usage_error() {
  probe_cmd()
    .args(["--fuser-timeout", "soon", "processes"])
    .assert()
    .failure()
    .code(2);
}

#[test]
#[serial]
fn missing_pool_fails() {
  let root = TempDir::new().unwrap();

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read slot pool"));
}

// =============================================================================
// Procfs backend
// =============================================================================

#[test]
#[serial]
fn free_slots_print_nothing() {
  let (root, pool) = store_root();
  let (uid, _) = current_user();
  File::create(pool.join(uid.to_string())).unwrap();
  File::create(pool.join("not-a-slot")).unwrap();

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .assert()
    .success()
    .stdout(predicate::str::is_empty());
}

#[test]
#[serial]
fn held_slot_is_reported() {
  let (root, pool) = store_root();
  let (uid, name) = current_user();
  let slot = pool.join(uid.to_string());
  let _lock = hold_lock(&slot);
  File::create(pool.join((uid + 1).to_string())).unwrap();

  let proc_root = root.path().join("proc");
  fs::create_dir_all(proc_root.join("self")).unwrap();
  let canonical = dunce::canonicalize(&slot).unwrap();
  fake_process(
    &proc_root,
    4242,
    1,
    "worker\0--build\0",
    &[&canonical, Path::new("/x/y.lock"), Path::new("/x/log.txt")],
  );
  fake_process(&proc_root, 4243, 4242, "sh\0", &[]);
  fake_process(&proc_root, 4244, 4243, "cc\0-c\0a.c\0", &[]);

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .env("STOREPROBE_PROC_ROOT", &proc_root)
    .assert()
    .success()
    .stdout(format!(
      "Build User: {name}\n\
       Build Process: worker --build\n\
       Child Process: cc -c a.c\n\
       File Lock: /x/y.lock\n"
    ));
}

#[test]
#[serial]
fn vanished_holder_prints_nothing() {
  let (root, pool) = store_root();
  let (uid, _) = current_user();
  let _lock = hold_lock(&pool.join(uid.to_string()));

  let proc_root = root.path().join("proc");
  fs::create_dir_all(proc_root.join("self")).unwrap();

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .env("STOREPROBE_PROC_ROOT", &proc_root)
    .assert()
    .success()
    .stdout(predicate::str::is_empty());
}

// =============================================================================
// fuser fallback
// =============================================================================

#[test]
#[serial]
fn fuser_fallback_reports_holder_pid() {
  let (root, pool) = store_root();
  let (uid, name) = current_user();
  let _lock = hold_lock(&pool.join(uid.to_string()));
  let bin = fake_fuser("echo ' 4242'");

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .env("STOREPROBE_PROC_ROOT", root.path().join("no-proc"))
    .env("PATH", path_with(bin.path()))
    .assert()
    .success()
    .stdout(format!("Build User: {name}\nBuild Process: 4242\n"))
    .stderr(predicate::str::contains("is not mounted"));
}

#[test]
#[serial]
fn fuser_failure_aborts_the_scan() {
  let (root, pool) = store_root();
  let (uid, _) = current_user();
  let _lock = hold_lock(&pool.join(uid.to_string()));
  let bin = fake_fuser("exit 1");

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .arg("processes")
    .env("STOREPROBE_PROC_ROOT", root.path().join("no-proc"))
    .env("PATH", path_with(bin.path()))
    .assert()
    .failure()
    .stderr(predicate::str::contains("exited with"));
}

#[test]
#[serial]
fn fuser_timeout_kills_a_hung_lookup() {
  let (root, pool) = store_root();
  let (uid, _) = current_user();
  let _lock = hold_lock(&pool.join(uid.to_string()));
  let bin = fake_fuser("exec sleep 30");

  probe_cmd()
    .arg("--store")
    .arg(root.path())
    .args(["--fuser-timeout", "200ms", "processes"])
    .env("STOREPROBE_PROC_ROOT", root.path().join("no-proc"))
    .env("PATH", path_with(bin.path()))
    .assert()
    .failure()
    .stderr(predicate::str::contains("did not finish within"));
}
