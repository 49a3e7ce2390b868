/// Application name, used for default directory layout.
pub const APP_NAME: &str = "storeprobe";

/// Number of hex characters kept from a SHA-256 digest in store path names.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Name given to fetched source trees in the store.
pub const SOURCE_NAME: &str = "source";

/// Directory under the state dir holding one lock file per build slot.
pub const USER_POOL_DIR: &str = "userpool";

/// Suffix identifying lock files among a process's open descriptors.
pub const LOCK_SUFFIX: &str = ".lock";

/// Upper bound on what is read from the fallback discovery utility.
pub const FUSER_OUTPUT_LIMIT: usize = 4096;
