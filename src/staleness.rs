//! Staleness checks shared by the copy and convert operations
//!
//! Comparisons use `SystemTime` straight from the filesystem, which carries
//! nanosecond resolution on the platforms we target.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::SyncError;
use crate::logging::*;

/// Outcome of comparing a source entry with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	/// Target does not exist
	Missing,
	/// One side is a directory and the other is not
	KindMismatch,
	/// Source modified at or after the target
	SourceNewer,
	/// Configuration modified at or after the target
	ConfigNewer,
	/// Target is current, skip
	Current,
}

impl Verdict {
	/// Must the operation run?
	pub fn is_stale(self) -> bool {
		self != Verdict::Current
	}
}

/// Compare `src` with `tgt`
///
/// `config_mtime` is only given for conversions; a configuration at least as
/// new as the target invalidates it.
pub fn assess(
	src: &Path,
	tgt: &Path,
	config_mtime: Option<SystemTime>,
) -> Result<Verdict, SyncError> {
	let tgt_meta = match fs::symlink_metadata(tgt) {
		Ok(m) => m,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Verdict::Missing),
		Err(e) => return Err(SyncError::io(tgt, e)),
	};
	let src_meta = fs::metadata(src).map_err(|e| SyncError::io(src, e))?;

	if src_meta.is_dir() != tgt_meta.is_dir() {
		return Ok(Verdict::KindMismatch);
	}

	let tgt_mtime = tgt_meta.modified().map_err(|e| SyncError::io(tgt, e))?;
	let src_mtime = src_meta.modified().map_err(|e| SyncError::io(src, e))?;
	if src_mtime >= tgt_mtime {
		return Ok(Verdict::SourceNewer);
	}
	if let Some(config_mtime) = config_mtime {
		if config_mtime >= tgt_mtime {
			return Ok(Verdict::ConfigNewer);
		}
	}
	Ok(Verdict::Current)
}

/// Assess and, when stale, clear the way for a fresh target
///
/// Returns `true` when the caller must (re)produce `tgt`.
pub fn prepare_target(
	src: &Path,
	tgt: &Path,
	config_mtime: Option<SystemTime>,
) -> Result<bool, SyncError> {
	let verdict = assess(src, tgt, config_mtime)?;
	match verdict {
		Verdict::Missing => {}
		Verdict::Current => return Ok(false),
		stale => {
			debug!("    Removing {:?} target '{}'", stale, tgt.display());
			remove_entry(tgt)?;
		}
	}
	Ok(true)
}

/// Remove a file, symlink or whole directory tree
///
/// Returns whether the entry was a directory.
pub fn remove_entry(path: &Path) -> Result<bool, SyncError> {
	let meta = fs::symlink_metadata(path).map_err(|e| SyncError::io(path, e))?;
	if meta.is_dir() {
		fs::remove_dir_all(path).map_err(|e| SyncError::io(path, e))?;
		Ok(true)
	} else {
		fs::remove_file(path).map_err(|e| SyncError::io(path, e))?;
		Ok(false)
	}
}


// vim: ts=4
