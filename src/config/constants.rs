//! Configuration constants.

/// Upstream resolvers used when none are configured.
pub const DEFAULT_RESOLVERS: &[&str] = &[
    // Cloudflare
    "1.1.1.1:53",
    "1.0.0.1:53",
    // Google
    "8.8.8.8:53",
    "8.8.4.4:53",
];

/// Per-query timeout handed to the resolver library.
pub const DNS_TIMEOUT_SECS: u64 = 5;

/// Default number of resolver rotations per question type.
pub const DEFAULT_RETRIES: usize = 2;

/// Default resolver-pool size.
pub const DEFAULT_THREADS: usize = 25;

/// Default minimum shared-A multiplicity before an address anchors wildcard
/// candidate selection.
pub const DEFAULT_WILDCARD_THRESHOLD: usize = 5;

/// Default bound on trace recursion depth.
pub const DEFAULT_TRACE_MAX_RECURSION: usize = 32;

/// Well-known path of the resume state file.
pub const RESUME_FILE: &str = "resume.cfg";

/// Host-store entry count at which the in-memory map spills to disk.
pub const STORE_SPILL_THRESHOLD: usize = 262_144;

/// Bounded capacity of the work and output channels.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Seconds between progress-statistics lines.
pub const STATS_INTERVAL_SECS: u64 = 5;

/// Length of the random sibling label used for wildcard probing.
pub const PROBE_LABEL_LEN: usize = 15;
