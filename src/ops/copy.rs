//! Verbatim file copies

use std::fs;
use std::path::Path;

use crate::error::SyncError;
use crate::logging::*;
use crate::observer::{Reporter, SyncEvent};
use crate::staleness;

/// Copy `src` to `tgt` unless `tgt` is already current
///
/// The copy gets a fresh modification time, which is what keeps a second
/// run from copying it again.
pub fn copy_file(src: &Path, tgt: &Path, reporter: &Reporter) -> Result<(), SyncError> {
	debug!("Considering for copy {} -> {}", src.display(), tgt.display());
	if !staleness::prepare_target(src, tgt, None)? {
		reporter.record(SyncEvent::UpToDate { target: tgt.to_path_buf() });
		return Ok(());
	}

	fs::copy(src, tgt).map_err(|e| SyncError::io(tgt, e))?;
	reporter.record(SyncEvent::Copied { source: src.to_path_buf(), target: tgt.to_path_buf() });
	Ok(())
}


// vim: ts=4
