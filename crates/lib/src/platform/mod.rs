//! Host integration: directory layout, configuration overrides and OS identity.

pub mod identity;
pub mod paths;
