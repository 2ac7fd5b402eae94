//! Directory walk tasks
//!
//! A [`WalkTask`] reconciles one source directory against one target
//! directory. It dispatches a child walk per subdirectory and a copy or
//! conversion per recognized file, then prunes target entries nothing in the
//! source accounts for.
//!
//! Entries are sorted by name and any override file is applied before the
//! rest are dispatched, so the snapshot every entry of a directory sees does
//! not depend on the filesystem's enumeration order.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConverterOverride;
use crate::error::SyncError;
use crate::logging::*;
use crate::observer::{Reporter, SyncEvent};
use crate::ops;
use crate::scheduler::{PoolKind, Scheduler, WorkKind};
use crate::snapshot::{is_hidden, Disposition, Snapshot};

/// State shared by every task of one run
#[derive(Debug)]
pub struct RunContext {
	pub scheduler: Scheduler,
	pub reporter: Reporter,
}

/// Synchronize `source` into `target` under `snapshot`
#[derive(Debug, Clone)]
pub struct WalkTask {
	source: PathBuf,
	target: PathBuf,
	snapshot: Arc<Snapshot>,
}

impl WalkTask {
	pub fn new(source: PathBuf, target: PathBuf, snapshot: Arc<Snapshot>) -> Self {
		WalkTask { source, target, snapshot }
	}

	/// Queue this task on the walker pool
	pub fn submit(self, ctx: &Arc<RunContext>) {
		let task_ctx = ctx.clone();
		let path = self.source.clone();
		ctx.scheduler.submit(PoolKind::Walker, WorkKind::Walk, path, move || {
			self.walk(&task_ctx)
		});
	}

	fn walk(self, ctx: &Arc<RunContext>) -> Result<(), SyncError> {
		debug!("Walking '{}'", self.source.display());
		let meta = fs::metadata(&self.source).map_err(|e| SyncError::io(&self.source, e))?;
		if !meta.is_dir() {
			return Err(SyncError::NotADirectory { path: self.source });
		}

		self.prepare_target_dir(&ctx.reporter)?;

		let mut entries = self.read_source()?;
		let snapshot = self.apply_override(&mut entries, &ctx.reporter)?;

		let mut expected: HashSet<OsString> = HashSet::new();
		for (name, path) in entries {
			if is_hidden(&name) {
				continue;
			}
			let meta = match fs::metadata(&path) {
				Ok(meta) => meta,
				Err(e) if e.kind() == io::ErrorKind::NotFound && is_symlink(&path) => {
					warn!("Skipping dangling symlink '{}'", path.display());
					continue;
				}
				Err(e) => return Err(SyncError::io(&path, e)),
			};

			if meta.is_dir() {
				if is_symlink(&path) && links_to_ancestor(&path, &self.source) {
					warn!("Skipping '{}': links back into its own tree", path.display());
					continue;
				}
				if claim(&mut expected, &name, &path) {
					let target = self.target.join(&name);
					WalkTask::new(path, target, snapshot.clone()).submit(ctx);
				}
			} else if meta.is_file() {
				match snapshot.classify(&name) {
					Disposition::Copy { target_name } => {
						if claim(&mut expected, &target_name, &path) {
							submit_copy(ctx, path, self.target.join(&target_name));
						}
					}
					Disposition::Convert { target_name } => {
						if claim(&mut expected, &target_name, &path) {
							let target = self.target.join(&target_name);
							submit_convert(ctx, path, target, snapshot.clone());
						}
					}
					Disposition::Ignore => debug!("  Ignoring '{}'", path.display()),
				}
			} else {
				debug!("  Ignoring special file '{}'", path.display());
			}
		}

		self.prune(&expected, ctx)
	}

	/// Make sure the target is a directory, following symlinks
	fn prepare_target_dir(&self, reporter: &Reporter) -> Result<(), SyncError> {
		let target = &self.target;
		match fs::metadata(target) {
			Ok(meta) if meta.is_dir() => return Ok(()),
			Ok(_) => {}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(SyncError::io(target, e)),
		}
		// A file, a link to one, or a dangling link
		if fs::symlink_metadata(target).is_ok() {
			debug!("  Replacing with dir {}", target.display());
			fs::remove_file(target).map_err(|e| SyncError::io(target, e))?;
		}
		fs::create_dir(target).map_err(|e| SyncError::io(target, e))?;
		reporter.record(SyncEvent::DirectoryCreated { path: target.clone() });
		Ok(())
	}

	/// List the source directory, sorted by name
	fn read_source(&self) -> Result<Vec<(OsString, PathBuf)>, SyncError> {
		let read_err = |e| SyncError::io(&self.source, e);
		let mut entries = Vec::new();
		for entry in fs::read_dir(&self.source).map_err(read_err)? {
			let entry = entry.map_err(read_err)?;
			entries.push((entry.file_name(), entry.path()));
		}
		entries.sort();
		Ok(entries)
	}

	/// Pull the override file out of `entries` and derive its snapshot
	fn apply_override(
		&self,
		entries: &mut Vec<(OsString, PathBuf)>,
		reporter: &Reporter,
	) -> Result<Arc<Snapshot>, SyncError> {
		let found = entries
			.iter()
			.position(|(name, path)| self.snapshot.is_override_file(name) && path.is_file());
		let (_, path) = match found {
			Some(idx) => entries.remove(idx),
			None => return Ok(self.snapshot.clone()),
		};

		let derived = ConverterOverride::from_file(&path)
			.and_then(|(ov, mtime)| self.snapshot.with_override(ov, mtime))
			.map_err(|source| SyncError::Override { path: path.clone(), source })?;
		reporter.record(SyncEvent::OverrideApplied { path });
		Ok(Arc::new(derived))
	}

	/// Delete target entries that no source entry produced
	fn prune(&self, expected: &HashSet<OsString>, ctx: &Arc<RunContext>) -> Result<(), SyncError> {
		let read_err = |e| SyncError::io(&self.target, e);
		for entry in fs::read_dir(&self.target).map_err(read_err)? {
			let entry = entry.map_err(read_err)?;
			let name = entry.file_name();
			if is_hidden(&name) || expected.contains(&name) {
				continue;
			}
			let path = entry.path();
			debug!("  Pruning '{}'", path.display());
			let job_ctx = ctx.clone();
			let job_path = path.clone();
			ctx.scheduler.submit(PoolKind::Walker, WorkKind::Delete, path, move || {
				ops::delete_entry(&job_path, &job_ctx.reporter)
			});
		}
		Ok(())
	}
}

/// Reserve a target name, refusing a second source entry that maps onto it
fn claim(expected: &mut HashSet<OsString>, target_name: &OsString, source: &Path) -> bool {
	if expected.insert(target_name.clone()) {
		return true;
	}
	warn!(
		"Skipping '{}': target name {:?} is already produced by another entry",
		source.display(),
		target_name
	);
	false
}

fn is_symlink(path: &Path) -> bool {
	fs::symlink_metadata(path).map(|m| m.file_type().is_symlink()).unwrap_or(false)
}

/// Does the directory link at `link` resolve to `dir` or one of its ancestors?
fn links_to_ancestor(link: &Path, dir: &Path) -> bool {
	match (fs::canonicalize(link), fs::canonicalize(dir)) {
		(Ok(resolved), Ok(here)) => here.starts_with(resolved),
		_ => false,
	}
}

fn submit_copy(ctx: &Arc<RunContext>, source: PathBuf, target: PathBuf) {
	let job_ctx = ctx.clone();
	ctx.scheduler.submit(PoolKind::Walker, WorkKind::Copy, source.clone(), move || {
		ops::copy_file(&source, &target, &job_ctx.reporter)
	});
}

fn submit_convert(
	ctx: &Arc<RunContext>,
	source: PathBuf,
	target: PathBuf,
	snapshot: Arc<Snapshot>,
) {
	let job_ctx = ctx.clone();
	ctx.scheduler.submit(PoolKind::Converter, WorkKind::Convert, source.clone(), move || {
		ops::convert_file(&source, &target, &snapshot, &job_ctx.reporter)
	});
}

// vim: ts=4
