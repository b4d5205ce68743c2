/// Namespace every preload database lives in.
pub const NAMESPACE: &str = "hstspreload";

/// Project (database) name used by ephemeral local stores.
pub const LOCAL_PROJECT_ID: &str = "hstspreload-local";

/// Project (database) name of the production store.
pub const PROD_PROJECT_ID: &str = "hstspreload";

/// Default per-call deadline, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
