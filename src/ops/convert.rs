//! Transcoding through the external converter
//!
//! The converter writes into a private staging directory; only a finished
//! output is copied into the mirror. Converter failures are reported and
//! swallowed here, they never abort the run.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::SyncError;
use crate::logging::*;
use crate::observer::{Reporter, SyncEvent};
use crate::snapshot::Snapshot;
use crate::staleness;

/// Prefix of staging directories under the system temp dir
pub const STAGING_PREFIX: &str = "media-archon-";

/// Longest stderr excerpt kept in a failure report
const STDERR_EXCERPT: usize = 512;

/// Convert `src` into `tgt` unless `tgt` is current for both the source and
/// the snapshot's configuration
///
/// Errors returned are filesystem errors around staging and placing the
/// output. A converter that cannot start or exits non-zero is recorded as
/// [`SyncEvent::ConversionFailed`] and yields `Ok(())`.
pub fn convert_file(
	src: &Path,
	tgt: &Path,
	snapshot: &Snapshot,
	reporter: &Reporter,
) -> Result<(), SyncError> {
	debug!("Considering for conversion {} -> {}", src.display(), tgt.display());
	if !staleness::prepare_target(src, tgt, Some(snapshot.config_mtime()))? {
		reporter.record(SyncEvent::UpToDate { target: tgt.to_path_buf() });
		return Ok(());
	}

	let staging = tempfile::Builder::new()
		.prefix(STAGING_PREFIX)
		.tempdir()
		.map_err(|e| SyncError::io(std::env::temp_dir(), e))?;
	let staged = match tgt.file_name() {
		Some(name) => staging.path().join(name),
		None => staging.path().join("output"),
	};

	let converted = match run_converter(src, &staged, snapshot) {
		Ok(()) => fs::copy(&staged, tgt).map(|_| true).map_err(|e| SyncError::io(tgt, e)),
		Err(reason) => {
			reporter.record(SyncEvent::ConversionFailed { source: src.to_path_buf(), reason });
			Ok(false)
		}
	};

	let staging_path = staging.path().to_path_buf();
	if let Err(e) = staging.close() {
		warn!("Could not remove staging dir {}: {}", staging_path.display(), e);
	}

	if converted? {
		reporter
			.record(SyncEvent::Converted { source: src.to_path_buf(), target: tgt.to_path_buf() });
	}
	Ok(())
}

/// Run the converter once, returning a failure description on error
fn run_converter(src: &Path, staged: &Path, snapshot: &Snapshot) -> Result<(), String> {
	let exe = snapshot.converter_exe();
	let argv =
		snapshot.command().render(src, staged, snapshot.extra_args()).map_err(|e| e.to_string())?;
	debug!("    Running {} {:?}", exe.display(), argv);

	let output = Command::new(exe)
		.args(&argv)
		.stdin(Stdio::null())
		.output()
		.map_err(|e| format!("cannot start {}: {}", exe.display(), e))?;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		let stderr = stderr.trim();
		let excerpt = match stderr.char_indices().nth(STDERR_EXCERPT) {
			Some((cut, _)) => &stderr[..cut],
			None => stderr,
		};
		return Err(if excerpt.is_empty() {
			format!("converter {}", output.status)
		} else {
			format!("converter {}: {}", output.status, excerpt)
		});
	}
	if !staged.is_file() {
		return Err("converter succeeded but wrote no output".to_string());
	}
	Ok(())
}


// vim: ts=4
