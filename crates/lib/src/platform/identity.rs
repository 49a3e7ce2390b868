//! OS identity queries: the caller's effective uid and uid → user name lookup.

use std::io;

/// Identity services the slot scanner consumes from the operating system.
pub trait IdentityLookup {
  /// Effective user id of the calling process.
  fn effective_uid(&self) -> u32;

  /// Resolves a uid to a login name. `Ok(None)` means the uid has no entry.
  fn user_name(&self, uid: u32) -> io::Result<Option<String>>;
}

/// Backed by `geteuid(2)` and the passwd database.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdentity;

#[cfg(unix)]
impl IdentityLookup for SystemIdentity {
  fn effective_uid(&self) -> u32 {
    nix::unistd::geteuid().as_raw()
  }

  fn user_name(&self, uid: u32) -> io::Result<Option<String>> {
    nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
      .map(|user| user.map(|u| u.name))
      .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
  }
}
