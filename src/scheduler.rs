//! Worker pools, the discovery channel and the completion driver
//!
//! Work is created lazily: a walk task spawns more walks, copies, conversions
//! and deletions while it runs. Every submission pushes its [`PendingWork`]
//! onto one unbounded channel, and the [`Driver`] only ever learns about work
//! through that channel.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::SyncError;
use crate::logging::*;

type Settling = BoxFuture<'static, Result<(), SyncError>>;

/// Which pool a job runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
	/// Directory reads, copies and deletions
	Walker,
	/// External converter processes
	Converter,
}

/// What a pending job is doing, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
	Walk,
	Copy,
	Convert,
	Delete,
}

impl fmt::Display for WorkKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			WorkKind::Walk => "walk",
			WorkKind::Copy => "copy",
			WorkKind::Convert => "convert",
			WorkKind::Delete => "delete",
		};
		f.write_str(name)
	}
}

/// A bounded set of blocking workers
///
/// Jobs run on tokio's blocking thread pool; the semaphore caps how many of
/// this pool's jobs run at once. Excess submissions wait for a permit.
#[derive(Debug)]
pub struct WorkerPool {
	name: &'static str,
	size: usize,
	permits: Arc<Semaphore>,
}

impl WorkerPool {
	pub fn new(name: &'static str, size: usize) -> Self {
		let size = size.max(1);
		WorkerPool { name, size, permits: Arc::new(Semaphore::new(size)) }
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn size(&self) -> usize {
		self.size
	}

	/// Stop handing out permits; queued jobs finish as cancelled
	pub fn close(&self) {
		self.permits.close();
	}
}

/// Handle to an in-flight job, visible only to the driver
pub struct PendingWork {
	kind: WorkKind,
	path: PathBuf,
	handle: JoinHandle<Result<(), SyncError>>,
}

impl PendingWork {
	/// Resolve to the job's own result, folding panics into errors
	fn settle(self) -> Settling {
		let PendingWork { kind, path, handle } = self;
		async move {
			match handle.await {
				Ok(result) => result,
				Err(e) => Err(SyncError::TaskFailed {
					what: format!("{} {}", kind, path.display()),
					message: e.to_string(),
				}),
			}
		}
		.boxed()
	}
}

impl fmt::Debug for PendingWork {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingWork").field("kind", &self.kind).field("path", &self.path).finish()
	}
}

/// Two worker pools plus the sending half of the discovery channel
///
/// Safe to use from pool workers: submission only needs the runtime handle
/// captured at construction.
#[derive(Debug)]
pub struct Scheduler {
	runtime: Handle,
	walkers: WorkerPool,
	converters: WorkerPool,
	discovered: UnboundedSender<PendingWork>,
}

impl Scheduler {
	/// Create the pools and the discovery channel
	///
	/// Must be called from within a tokio runtime.
	pub fn new(walkers: usize, converters: usize) -> (Self, Driver) {
		let (tx, rx) = mpsc::unbounded_channel();
		let scheduler = Scheduler {
			runtime: Handle::current(),
			walkers: WorkerPool::new("walker", walkers),
			converters: WorkerPool::new("converter", converters),
			discovered: tx,
		};
		for pool in [&scheduler.walkers, &scheduler.converters] {
			info!("{} pool created. Size: {}", pool.name(), pool.size());
		}
		(scheduler, Driver { discovered: rx })
	}

	pub fn pool(&self, kind: PoolKind) -> &WorkerPool {
		match kind {
			PoolKind::Walker => &self.walkers,
			PoolKind::Converter => &self.converters,
		}
	}

	/// Run `job` on a pool and register it on the discovery channel
	pub fn submit<F>(&self, pool: PoolKind, kind: WorkKind, path: PathBuf, job: F)
	where
		F: FnOnce() -> Result<(), SyncError> + Send + 'static,
	{
		let pool = self.pool(pool);
		let permits = pool.permits.clone();
		let what = format!("{} {}", kind, path.display());
		// Not nested under the submitting job's span
		let span = tracing::info_span!(parent: None, "job", pool = pool.name(), kind = %kind);
		let handle = self.runtime.spawn(async move {
			let _permit = match permits.acquire_owned().await {
				Ok(permit) => permit,
				Err(_) => return Err(SyncError::Cancelled { what }),
			};
			let run = move || {
				let _entered = span.enter();
				job()
			};
			match tokio::task::spawn_blocking(run).await {
				Ok(result) => result,
				Err(e) => Err(SyncError::TaskFailed { what, message: e.to_string() }),
			}
		});

		if self.discovered.send(PendingWork { kind, path, handle }).is_err() {
			debug!("Driver gone, {} will not be awaited", kind);
		}
	}

	/// Close both pools so no further job starts
	pub fn shutdown(&self) {
		self.walkers.close();
		self.converters.close();
	}
}

/// Receiving half of the discovery channel plus the completion protocol
#[derive(Debug)]
pub struct Driver {
	discovered: UnboundedReceiver<PendingWork>,
}

impl Driver {
	/// Wait until every discovered job has completed
	///
	/// Returns the number of jobs that completed. On the first failed job the
	/// pools are shut down, in-flight jobs are left to settle with their
	/// results discarded, and that first error is returned.
	pub async fn drive(mut self, scheduler: &Scheduler) -> Result<usize, SyncError> {
		let mut active = FuturesUnordered::new();
		match self.discovered.recv().await {
			Some(work) => active.push(work.settle()),
			None => return Err(SyncError::ChannelClosed),
		}
		let mut completed = 0;

		loop {
			self.drain_into(&mut active);
			debug!("waiting for {} jobs", active.len());

			match active.next().await {
				Some(Ok(())) => completed += 1,
				Some(Err(e)) => {
					error!("Aborting: {}", e);
					scheduler.shutdown();
					self.settle(active).await;
					return Err(e);
				}
				None => {
					self.drain_into(&mut active);
					if active.is_empty() {
						debug!("All {} jobs completed", completed);
						return Ok(completed);
					}
				}
			}
		}
	}

	/// Move every currently discovered job into the active batch
	fn drain_into(&mut self, active: &mut FuturesUnordered<Settling>) {
		loop {
			match self.discovered.try_recv() {
				Ok(work) => active.push(work.settle()),
				Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
			}
		}
	}

	/// Let outstanding jobs finish after an abort, ignoring their results
	async fn settle(&mut self, mut active: FuturesUnordered<Settling>) {
		let mut abandoned = 0;
		loop {
			self.drain_into(&mut active);
			match active.next().await {
				Some(_) => abandoned += 1,
				None => {
					self.drain_into(&mut active);
					if active.is_empty() {
						break;
					}
				}
			}
		}
		debug!("{} in-flight jobs settled after abort", abandoned);
	}
}


// vim: ts=4
