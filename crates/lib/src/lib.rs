//! storeprobe-lib: inspection layer of a content-addressed build store.
//!
//! This crate provides:
//! - `store`: store URIs, local layout and content-addressed store paths
//! - `process`: read-only process table queries over procfs or `fuser`
//! - `slots`: build slot lock probing and holder reports
//! - `platform`: directory configuration and OS identity lookup

pub mod consts;
pub mod platform;
#[cfg(unix)]
pub mod process;
#[cfg(unix)]
pub mod slots;
pub mod store;
pub mod util;
