//! # media-archon - Incremental Media Library Mirror
//!
//! media-archon keeps a target tree in step with a source tree. Files with a
//! copy extension are copied verbatim, files with a convert extension are
//! transcoded by an external program, and anything in the target that the
//! source no longer accounts for is deleted. Only stale outputs are touched,
//! so repeated runs over an unchanged library do no work.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use media_archon::{Config, Synchronizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("media-archon.toml".as_ref())?;
//!     let report = Synchronizer::new(config).run().await?;
//!     println!("{} files converted", report.files_converted);
//!     Ok(())
//! }
//! ```
//!
//! ## Observing a Run
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use media_archon::{SyncEvent, Synchronizer};
//!
//! let report = Synchronizer::new(config)
//!     .observer(Arc::new(|event: &SyncEvent| eprintln!("{:?}", event)))
//!     .run()
//!     .await?;
//! ```
//!
//! Directories can carry an override file (named by `converter.config`)
//! whose `[converter]` table replaces `cmd` and `args` for that directory
//! and everything below it.

pub mod config;
pub mod error;
pub mod logging;
pub mod observer;
pub mod ops;
pub mod scheduler;
pub mod snapshot;
pub mod staleness;
pub mod sync;
pub mod template;
pub mod validation;
pub mod walker;

// Re-export commonly used types
pub use config::{Config, ConverterOverride};
pub use error::{ConfigError, SyncError};
pub use observer::{SyncEvent, SyncObserver, SyncReport};
pub use snapshot::{Disposition, Snapshot};
pub use sync::Synchronizer;

// vim: ts=4
