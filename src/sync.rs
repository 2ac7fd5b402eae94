//! Public entry point for a synchronization run
//!
//! ```rust,ignore
//! use media_archon::{Config, Synchronizer};
//!
//! let config = Config::from_file("media-archon.toml".as_ref())?;
//! let report = Synchronizer::new(config).run().await?;
//! println!("Converted {} files", report.files_converted);
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use crate::observer::{Reporter, SyncObserver, SyncReport};
use crate::scheduler::Scheduler;
use crate::walker::{RunContext, WalkTask};

/// Mirrors `config.source` into `config.target`
pub struct Synchronizer {
	config: Config,
	observer: Option<Arc<dyn SyncObserver>>,
}

impl Synchronizer {
	pub fn new(config: Config) -> Self {
		Synchronizer { config, observer: None }
	}

	/// Receive every event of the run
	pub fn observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
		self.observer = Some(observer);
		self
	}

	/// Run one full synchronization
	///
	/// Must be awaited inside a tokio runtime whose blocking pool can hold
	/// `walkers + converters` threads, otherwise the pools run below their
	/// configured size. Returns after every discovered job has completed, or
	/// with the first unexpected error once in-flight jobs have settled.
	pub async fn run(self) -> Result<SyncReport, SyncError> {
		let Synchronizer { config, observer } = self;
		info!(
			"Synchronizing '{}' into '{}'",
			config.source.display(),
			config.target.display()
		);

		let (scheduler, driver) = Scheduler::new(config.walkers, config.converters);
		let ctx = Arc::new(RunContext { scheduler, reporter: Reporter::new(observer) });

		WalkTask::new(config.source, config.target, Arc::new(config.snapshot)).submit(&ctx);
		let outcome = driver.drive(&ctx.scheduler).await;
		ctx.scheduler.shutdown();

		let report = ctx.reporter.report();
		match outcome {
			Ok(jobs) => {
				debug!("{} jobs completed", jobs);
				Ok(report)
			}
			Err(e) => {
				debug!("Run aborted after {} operations", report.operations());
				Err(e)
			}
		}
	}
}

// vim: ts=4
