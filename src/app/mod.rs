//! Main application modules.
//!
//! This module provides utilities for logging, shutdown handling, and
//! progress statistics used by the runner and the binary.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::init_logger_with;
pub use shutdown::shutdown_gracefully;
pub use statistics::{spawn_progress_printer, ScanStats};
