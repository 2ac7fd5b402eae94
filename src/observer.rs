//! Event reporting for synchronization runs
//!
//! Operations never log results to ambient state directly; they hand a
//! [`SyncEvent`] to the run's [`Reporter`], which keeps counts, logs the
//! event and forwards it to an optional caller-supplied [`SyncObserver`].

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::logging::*;

/// Something that happened to one entry during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
	/// Target directory was created (or replaced a file)
	DirectoryCreated { path: PathBuf },

	/// An override file changed the converter settings for a subtree
	OverrideApplied { path: PathBuf },

	/// File copied verbatim
	Copied { source: PathBuf, target: PathBuf },

	/// File transcoded
	Converted { source: PathBuf, target: PathBuf },

	/// Converter failed; the file stays unconverted for this run
	ConversionFailed { source: PathBuf, reason: String },

	/// Target entry removed by mirror pruning
	Deleted { path: PathBuf, was_dir: bool },

	/// Target already current, nothing done
	UpToDate { target: PathBuf },
}

/// Trait for receiving sync events
pub trait SyncObserver: Send + Sync {
	fn on_event(&self, _event: &SyncEvent) {}
}

impl<T: Fn(&SyncEvent) + Send + Sync> SyncObserver for T {
	fn on_event(&self, event: &SyncEvent) {
		self(event);
	}
}

/// Counts of what a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
	pub directories_created: usize,
	pub overrides_applied: usize,
	pub files_copied: usize,
	pub files_converted: usize,
	pub conversions_failed: usize,
	pub entries_deleted: usize,
	pub up_to_date: usize,
}

impl SyncReport {
	/// Number of copy, convert and delete operations actually performed
	pub fn operations(&self) -> usize {
		self.files_copied + self.files_converted + self.entries_deleted
	}
}

#[derive(Debug, Default)]
struct SyncStats {
	directories_created: AtomicUsize,
	overrides_applied: AtomicUsize,
	files_copied: AtomicUsize,
	files_converted: AtomicUsize,
	conversions_failed: AtomicUsize,
	entries_deleted: AtomicUsize,
	up_to_date: AtomicUsize,
}

/// Per-run event sink shared by every task
pub struct Reporter {
	stats: SyncStats,
	observer: Option<Arc<dyn SyncObserver>>,
}

impl Reporter {
	pub fn new(observer: Option<Arc<dyn SyncObserver>>) -> Self {
		Reporter { stats: SyncStats::default(), observer }
	}

	pub fn record(&self, event: SyncEvent) {
		let s = &self.stats;
		let counter = match &event {
			SyncEvent::DirectoryCreated { path } => {
				debug!("  Created dir {}", path.display());
				&s.directories_created
			}
			SyncEvent::OverrideApplied { path } => {
				info!("Applying config override {}", path.display());
				&s.overrides_applied
			}
			SyncEvent::Copied { source, target } => {
				info!("Copied '{}' to '{}'", source.display(), target.display());
				&s.files_copied
			}
			SyncEvent::Converted { source, target } => {
				info!("Converted '{}' to '{}'", source.display(), target.display());
				&s.files_converted
			}
			SyncEvent::ConversionFailed { source, reason } => {
				warn!("Conversion of '{}' failed: {}", source.display(), reason);
				&s.conversions_failed
			}
			SyncEvent::Deleted { path, was_dir } => {
				info!("Deleted {} '{}'", if *was_dir { "dir" } else { "file" }, path.display());
				&s.entries_deleted
			}
			SyncEvent::UpToDate { target } => {
				debug!("  Up to date '{}'", target.display());
				&s.up_to_date
			}
		};
		counter.fetch_add(1, Ordering::Relaxed);

		if let Some(observer) = &self.observer {
			observer.on_event(&event);
		}
	}

	/// Current counts
	pub fn report(&self) -> SyncReport {
		let s = &self.stats;
		let load = |c: &AtomicUsize| c.load(Ordering::Relaxed);
		SyncReport {
			directories_created: load(&s.directories_created),
			overrides_applied: load(&s.overrides_applied),
			files_copied: load(&s.files_copied),
			files_converted: load(&s.files_converted),
			conversions_failed: load(&s.conversions_failed),
			entries_deleted: load(&s.entries_deleted),
			up_to_date: load(&s.up_to_date),
		}
	}
}

impl fmt::Debug for Reporter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reporter")
			.field("report", &self.report())
			.field("observer", &self.observer.is_some())
			.finish()
	}
}


// vim: ts=4
