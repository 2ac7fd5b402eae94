//! Centralized validation system for media-archon
//!
//! This module provides common validation functions for:
//! - Configuration values (file suffixes, pool sizes)
//! - Paths (home expansion, existence, nesting)

use std::error::Error;
use std::fmt;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Generic validation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// Invalid configuration value
	ConfigError(String),
	/// Invalid path
	PathError(String),
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::ConfigError(msg) => write!(f, "{}", msg),
			ValidationError::PathError(msg) => write!(f, "{}", msg),
		}
	}
}

impl Error for ValidationError {}
