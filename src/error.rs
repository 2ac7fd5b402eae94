//! Error types for media-archon operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::template::TemplateError;

/// Main error type for synchronization runs
///
/// Everything here aborts the run. Converter failures never become a
/// `SyncError`; they are reported through the observer and skipped.
#[derive(Debug)]
pub enum SyncError {
	/// Filesystem operation failed on a path
	Io { path: PathBuf, source: io::Error },

	/// Source directory vanished or stopped being a directory mid-walk
	NotADirectory { path: PathBuf },

	/// A per-subtree override file could not be loaded
	Override { path: PathBuf, source: ConfigError },

	/// A pool worker panicked or was torn down before finishing
	TaskFailed { what: String, message: String },

	/// Work was refused because the pools were already shut down
	Cancelled { what: String },

	/// The discovery channel closed before the root task was registered
	ChannelClosed,
}

impl SyncError {
	/// Attach a path to an I/O error
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		SyncError::Io { path: path.into(), source }
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Io { path, source } => {
				write!(f, "I/O error on {}: {}", path.display(), source)
			}
			SyncError::NotADirectory { path } => {
				write!(f, "Source {} is not a directory", path.display())
			}
			SyncError::Override { path, source } => {
				write!(f, "Cannot apply override {}: {}", path.display(), source)
			}
			SyncError::TaskFailed { what, message } => {
				write!(f, "Worker for {} failed: {}", what, message)
			}
			SyncError::Cancelled { what } => write!(f, "Cancelled before start: {}", what),
			SyncError::ChannelClosed => write!(f, "Discovery channel closed unexpectedly"),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io { source, .. } => Some(source),
			SyncError::Override { source, .. } => Some(source),
			_ => None,
		}
	}
}

/// Configuration errors, detected before any work is scheduled
#[derive(Debug)]
pub enum ConfigError {
	/// Configuration file could not be read
	Unreadable { path: PathBuf, source: io::Error },

	/// Configuration file is not valid TOML or has the wrong shape
	Parse { path: Option<PathBuf>, message: String },

	/// Required key is absent
	Missing { key: &'static str },

	/// Key is present but its value is unusable
	Invalid { key: &'static str, reason: String },
}

impl ConfigError {
	pub(crate) fn invalid(key: &'static str, err: impl fmt::Display) -> Self {
		ConfigError::Invalid { key, reason: err.to_string() }
	}

	/// The configuration key this error is about, if any
	pub fn key(&self) -> Option<&'static str> {
		match self {
			ConfigError::Missing { key } | ConfigError::Invalid { key, .. } => Some(*key),
			_ => None,
		}
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Unreadable { path, source } => {
				write!(f, "Cannot read configuration {}: {}", path.display(), source)
			}
			ConfigError::Parse { path: Some(path), message } => {
				write!(f, "Configuration {} is not valid: {}", path.display(), message)
			}
			ConfigError::Parse { path: None, message } => {
				write!(f, "Configuration is not valid: {}", message)
			}
			ConfigError::Missing { key } => write!(f, "{} must be defined in the config", key),
			ConfigError::Invalid { key, reason } => write!(f, "{}: {}", key, reason),
		}
	}
}

impl Error for ConfigError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ConfigError::Unreadable { source, .. } => Some(source),
			_ => None,
		}
	}
}

impl From<TemplateError> for ConfigError {
	fn from(e: TemplateError) -> Self {
		let key = match e {
			TemplateError::Reserved { .. } => "converter.args",
			_ => "converter.cmd",
		};
		ConfigError::Invalid { key, reason: e.to_string() }
	}
}


// vim: ts=4
