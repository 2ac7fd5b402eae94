//! Path validation functions

use std::path::{Path, PathBuf};

use super::ValidationError;

/// Expand a leading `~` to the user's home directory
///
/// Only `~` and `~/...` are expanded; `~user` forms are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
	let home = std::env::var_os("HOME");
	match (path, home) {
		("~", Some(home)) => PathBuf::from(home),
		(p, Some(home)) if p.starts_with("~/") => PathBuf::from(home).join(&p[2..]),
		(p, _) => PathBuf::from(p),
	}
}

/// Validate that `path` names an existing directory
pub fn validate_is_dir(path: &Path) -> Result<(), ValidationError> {
	if !path.is_dir() {
		return Err(ValidationError::PathError(format!(
			"{} is not a directory or does not exist",
			path.display()
		)));
	}
	Ok(())
}

/// Validate that `path` names an existing regular file
pub fn validate_is_file(path: &Path) -> Result<(), ValidationError> {
	if !path.is_file() {
		return Err(ValidationError::PathError(format!(
			"{} is not a file or does not exist",
			path.display()
		)));
	}
	Ok(())
}

/// Validate that neither directory contains the other
///
/// Both paths must exist; they are canonicalized before comparison so
/// symlinked and relative spellings are caught.
pub fn validate_not_nested(source: &Path, target: &Path) -> Result<(), ValidationError> {
	let canonical = |p: &Path| {
		p.canonicalize().map_err(|e| {
			ValidationError::PathError(format!("cannot resolve {}: {}", p.display(), e))
		})
	};
	let src = canonical(source)?;
	let tgt = canonical(target)?;
	if src.starts_with(&tgt) || tgt.starts_with(&src) {
		return Err(ValidationError::PathError(format!(
			"{} and {} overlap; source and target must be separate trees",
			source.display(),
			target.display()
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_expand_home_plain_path() {
		assert_eq!(expand_home("/srv/music"), PathBuf::from("/srv/music"));
		assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
	}

	#[test]
	fn test_expand_home_tilde() {
		if let Some(home) = std::env::var_os("HOME") {
			assert_eq!(expand_home("~/Music"), PathBuf::from(&home).join("Music"));
			assert_eq!(expand_home("~"), PathBuf::from(home));
		}
	}

	#[test]
	fn test_validate_is_dir_and_file() {
		let tmp = TempDir::new().unwrap();
		let file = tmp.path().join("exe");
		std::fs::write(&file, b"#!/bin/sh\n").unwrap();

		assert!(validate_is_dir(tmp.path()).is_ok());
		assert!(validate_is_dir(&file).is_err());
		assert!(validate_is_file(&file).is_ok());
		assert!(validate_is_file(tmp.path()).is_err());
		assert!(validate_is_file(&tmp.path().join("missing")).is_err());
	}

	#[test]
	fn test_validate_not_nested() {
		let tmp = TempDir::new().unwrap();
		let src = tmp.path().join("lib");
		let tgt = tmp.path().join("out");
		let inner = src.join("out");
		std::fs::create_dir_all(&inner).unwrap();
		std::fs::create_dir(&tgt).unwrap();

		assert!(validate_not_nested(&src, &tgt).is_ok());
		assert!(validate_not_nested(&src, &inner).is_err());
		assert!(validate_not_nested(&inner, &src).is_err());
		assert!(validate_not_nested(&src, &src).is_err());
	}
}
