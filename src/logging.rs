//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Walker pool created. Size: {}", size);
//! debug!("Walking '{}'", dir.display());
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// By default, logs at INFO level and above are displayed. Control the log level
/// with the `RUST_LOG` environment variable:
///
/// ```bash
/// RUST_LOG=debug media-archon
/// RUST_LOG=media_archon::walker=debug,media_archon::ops=trace media-archon
/// ```
///
/// Every pool job runs inside a `job` span carrying its `pool` and `kind`,
/// so walker and converter output can be told apart.
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_thread_names(true)
		.with_writer(std::io::stderr)
		.init();
}
