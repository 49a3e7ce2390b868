//! Plain-text rendering of slot reports.

use std::fmt;
use std::io::{self, Write};

use super::SlotReport;

impl fmt::Display for SlotReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Build User: {}", self.owner_name)?;
    writeln!(f, "Build Process: {}", self.holder_label)?;
    for leaf in &self.leaves {
      writeln!(f, "Child Process: {}", leaf)?;
    }
    for path in &self.lock_paths {
      writeln!(f, "File Lock: {}", path.display())?;
    }
    Ok(())
  }
}

/// Streams reports to `out`, separating consecutive reports by a blank line.
pub struct ReportWriter<W> {
  out: W,
  written: usize,
}

impl<W: Write> ReportWriter<W> {
  pub fn new(out: W) -> Self {
    Self { out, written: 0 }
  }

  pub fn write(&mut self, report: &SlotReport) -> io::Result<()> {
    if self.written > 0 {
      writeln!(self.out)?;
    }
    write!(self.out, "{}", report)?;
    self.out.flush()?;
    self.written += 1;
    Ok(())
  }

  /// Number of reports written so far.
  pub fn written(&self) -> usize {
    self.written
  }
}
