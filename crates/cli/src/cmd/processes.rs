//! Implementation of the `storeprobe processes` command.
//!
//! Shows which processes are holding build slots, what they are running and
//! which lock files they keep open.

use std::time::Duration;

use anyhow::Result;

/// Execute the processes command.
///
/// Scans the store's slot pool and prints one report per held slot. Prints
/// nothing when no slot is held.
#[cfg(unix)]
pub fn cmd_processes(store_uri: &str, fuser_timeout: Option<Duration>) -> Result<()> {
  use std::io;

  use anyhow::Context;
  use tracing::debug;

  use storeprobe_lib::platform::identity::SystemIdentity;
  use storeprobe_lib::platform::paths::proc_root;
  use storeprobe_lib::process::{self, IndexConfig};
  use storeprobe_lib::slots::{ReportWriter, SlotScanner};
  use storeprobe_lib::store::{LocalStore, StoreUri};

  use crate::output::print_warning;

  let store = LocalStore::open(&StoreUri::parse(store_uri))?;
  let pool_dir = store.user_pool_dir();

  let config = IndexConfig {
    proc_root: proc_root(),
    fuser_timeout,
  };
  let index = process::detect(&config);
  if index.backend() == "fuser" {
    print_warning(&format!(
      "{} is not mounted; child processes and held lock files will not be shown",
      config.proc_root.display()
    ));
  }

  let identity = SystemIdentity;
  let scanner = SlotScanner::new(index.as_ref(), &identity);

  let stdout = io::stdout();
  let mut writer = ReportWriter::new(stdout.lock());
  for report in scanner.scan(&pool_dir)? {
    writer.write(&report?).context("Failed to write slot report")?;
  }

  debug!(pool = %pool_dir.display(), held = writer.written(), "slot scan complete");
  Ok(())
}

#[cfg(not(unix))]
pub fn cmd_processes(_store_uri: &str, _fuser_timeout: Option<Duration>) -> Result<()> {
  anyhow::bail!("build slot inspection is only supported on Unix")
}
