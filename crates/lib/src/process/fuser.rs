//! Process index backed by the `fuser(1)` utility.
//!
//! Used where no procfs is mounted. `fuser` answers one question, which pid
//! has a given file open, so the process table itself stays opaque: listing
//! yields nothing and per-pid queries answer `None`.

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{OpenTarget, Pid, ProcessError, ProcessIndex};
use crate::consts::FUSER_OUTPUT_LIMIT;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct FuserIndex {
  program: OsString,
  args: Vec<OsString>,
  timeout: Option<Duration>,
}

impl Default for FuserIndex {
  fn default() -> Self {
    Self::new()
  }
}

impl FuserIndex {
  pub fn new() -> Self {
    Self::with_command("fuser", Vec::<OsString>::new())
  }

  /// Runs `program args... <path>` instead of `fuser <path>`.
  pub fn with_command<I, S>(program: impl Into<OsString>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
      timeout: None,
    }
  }

  /// Bounds how long a single lookup may run. `None` waits indefinitely.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  fn program_name(&self) -> String {
    self.program.to_string_lossy().into_owned()
  }

  fn wait(&self, child: &mut Child, path: &Path) -> Result<ExitStatus, ProcessError> {
    let output_err = |e| ProcessError::Output {
      program: self.program_name(),
      source: e,
    };

    let Some(timeout) = self.timeout else {
      return child.wait().map_err(output_err);
    };

    let deadline = Instant::now() + timeout;
    loop {
      if let Some(status) = child.try_wait().map_err(output_err)? {
        return Ok(status);
      }
      if Instant::now() >= deadline {
        // Reap the child; the lookup has already failed.
        let _ = child.kill();
        let _ = child.wait();
        return Err(ProcessError::Timeout {
          program: self.program_name(),
          timeout,
          path: path.to_path_buf(),
        });
      }
      thread::sleep(POLL_INTERVAL);
    }
  }
}

impl ProcessIndex for FuserIndex {
  fn backend(&self) -> &'static str {
    "fuser"
  }

  fn list_pids(&self) -> Result<Vec<Pid>, ProcessError> {
    Ok(Vec::new())
  }

  fn cmdline(&self, _pid: Pid) -> Option<String> {
    None
  }

  fn parent(&self, _pid: Pid) -> Option<Pid> {
    None
  }

  fn open_targets(&self, _pid: Pid) -> Option<Vec<OpenTarget>> {
    None
  }

  fn find_holder(&self, path: &Path) -> Result<Option<Pid>, ProcessError> {
    debug!(program = %self.program_name(), path = %path.display(), "querying lock holder");

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .arg(path)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| ProcessError::Spawn {
        program: self.program_name(),
        source: e,
      })?;

    let status = self.wait(&mut child, path)?;
    if !status.success() {
      return Err(ProcessError::ExitStatus {
        program: self.program_name(),
        status,
        path: path.to_path_buf(),
      });
    }

    let mut buffer = [0u8; FUSER_OUTPUT_LIMIT];
    let size = match child.stdout.take() {
      Some(mut stdout) => stdout.read(&mut buffer).map_err(|e| ProcessError::Output {
        program: self.program_name(),
        source: e,
      })?,
      None => 0,
    };

    let output = String::from_utf8_lossy(&buffer[..size]);
    match parse_first_pid(&output) {
      Some(pid) => Ok(Some(pid)),
      None => Err(ProcessError::Parse {
        program: self.program_name(),
        output: output.into_owned(),
      }),
    }
  }
}

/// `fuser` prints the holding pids separated by whitespace; the first wins.
fn parse_first_pid(output: &str) -> Option<Pid> {
  output.split_whitespace().next()?.parse().ok()
}
