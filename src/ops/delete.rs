//! Mirror pruning deletions

use std::path::Path;

use crate::error::SyncError;
use crate::observer::{Reporter, SyncEvent};
use crate::staleness;

/// Remove a target entry that no source entry accounts for
///
/// Directories go with their whole contents.
pub fn delete_entry(path: &Path, reporter: &Reporter) -> Result<(), SyncError> {
	let was_dir = staleness::remove_entry(path)?;
	reporter.record(SyncEvent::Deleted { path: path.to_path_buf(), was_dir });
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn test_delete_file_and_tree() {
		let tmp = TempDir::new().unwrap();
		let file = tmp.path().join("stale.opus");
		let tree = tmp.path().join("old_album");
		fs::write(&file, b"x").unwrap();
		fs::create_dir_all(tree.join("disc1")).unwrap();
		fs::write(tree.join("disc1/track.opus"), b"y").unwrap();
		let reporter = Reporter::new(None);

		delete_entry(&file, &reporter).unwrap();
		delete_entry(&tree, &reporter).unwrap();

		assert!(!file.exists());
		assert!(!tree.exists());
		assert_eq!(reporter.report().entries_deleted, 2);
	}

	#[cfg(unix)]
	#[test]
	fn test_delete_symlink_leaves_pointee() {
		let tmp = TempDir::new().unwrap();
		let real = tmp.path().join("real");
		let link = tmp.path().join("link");
		fs::create_dir(&real).unwrap();
		fs::write(real.join("keep"), b"k").unwrap();
		std::os::unix::fs::symlink(&real, &link).unwrap();

		delete_entry(&link, &Reporter::new(None)).unwrap();
		assert!(!link.exists());
		assert!(real.join("keep").exists());
	}
}

// vim: ts=4
