//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults, limits, well-known paths)
//! - Configuration types (library-only, no CLI dependencies)

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, QuestionType};
