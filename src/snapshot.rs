//! Immutable configuration snapshots
//!
//! A [`Snapshot`] governs how one subtree is classified and converted. It is
//! built once from the top-level configuration and shared behind an `Arc`;
//! an override file found during the walk produces a derived snapshot for
//! that directory's remaining entries and descendants only.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::ConverterOverride;
use crate::error::ConfigError;
use crate::template::{ArgValue, CommandTemplate};
use crate::validation;

/// Leading character that marks an entry as hidden
pub const HIDDEN_MARKER: char = '.';

/// Is this directory entry name hidden?
pub fn is_hidden(name: &OsStr) -> bool {
	name.to_string_lossy().starts_with(HIDDEN_MARKER)
}

/// What to do with a regular file found in a source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
	/// Copy verbatim under the same name
	Copy { target_name: OsString },
	/// Transcode into `target_name`
	Convert { target_name: OsString },
	/// Unrecognized extension
	Ignore,
}

/// Everything needed to construct a root snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSpec {
	pub copy_extensions: Vec<String>,
	pub convert_extensions: Vec<String>,
	pub output_extension: String,
	pub converter_exe: PathBuf,
	pub command: Vec<String>,
	pub extra_args: BTreeMap<String, ArgValue>,
	pub config_file_name: String,
	pub config_mtime: SystemTime,
}

/// Classification rules and converter invocation for a subtree
#[derive(Debug, Clone)]
pub struct Snapshot {
	copy_extensions: BTreeSet<String>,
	convert_extensions: BTreeSet<String>,
	output_extension: String,
	converter_exe: PathBuf,
	command: CommandTemplate,
	extra_args: BTreeMap<String, ArgValue>,
	config_file_name: String,
	config_mtime: SystemTime,
}

impl Snapshot {
	/// Validate `spec` and build a snapshot from it
	pub fn new(spec: SnapshotSpec) -> Result<Self, ConfigError> {
		let copy_extensions = validation::validate_suffixes(&spec.copy_extensions)
			.map_err(|e| ConfigError::invalid("copier.inputs", e))?;
		let convert_extensions = validation::validate_suffixes(&spec.convert_extensions)
			.map_err(|e| ConfigError::invalid("converter.inputs", e))?;
		validation::validate_suffix(&spec.output_extension)
			.map_err(|e| ConfigError::invalid("converter.output", e))?;

		if let Some(ext) = copy_extensions.intersection(&convert_extensions).next() {
			return Err(ConfigError::Invalid {
				key: "converter.inputs",
				reason: format!("{} is also listed in copier.inputs", ext),
			});
		}

		validation::validate_is_file(&spec.converter_exe)
			.map_err(|e| ConfigError::invalid("converter.exe", e))?;

		if spec.config_file_name.is_empty()
			|| spec.config_file_name.contains(std::path::is_separator)
		{
			return Err(ConfigError::Invalid {
				key: "converter.config",
				reason: format!("{:?} is not a plain file name", spec.config_file_name),
			});
		}

		let command = CommandTemplate::parse(&spec.command)?;
		command.check(&spec.extra_args)?;

		Ok(Snapshot {
			copy_extensions,
			convert_extensions,
			output_extension: spec.output_extension,
			converter_exe: spec.converter_exe,
			command,
			extra_args: spec.extra_args,
			config_file_name: spec.config_file_name,
			config_mtime: spec.config_mtime,
		})
	}

	/// Derive a snapshot with the converter settings of an override file
	///
	/// Fields the override leaves out are inherited. The override's
	/// modification time becomes the new `config_mtime`.
	pub fn with_override(
		&self,
		ov: ConverterOverride,
		mtime: SystemTime,
	) -> Result<Self, ConfigError> {
		let mut derived = self.clone();
		if let Some(cmd) = ov.cmd {
			derived.command = CommandTemplate::parse(cmd.into_tokens())?;
		}
		if let Some(args) = ov.args {
			derived.extra_args = args;
		}
		derived.command.check(&derived.extra_args)?;
		derived.config_mtime = mtime;
		Ok(derived)
	}

	/// Decide what to do with a regular file called `name`
	pub fn classify(&self, name: &OsStr) -> Disposition {
		let path = Path::new(name);
		let ext = match path.extension().and_then(OsStr::to_str) {
			Some(ext) => format!(".{}", ext),
			None => return Disposition::Ignore,
		};
		if self.copy_extensions.contains(&ext) {
			Disposition::Copy { target_name: name.to_os_string() }
		} else if self.convert_extensions.contains(&ext) {
			let mut target_name = path.file_stem().unwrap_or(name).to_os_string();
			target_name.push(&self.output_extension);
			Disposition::Convert { target_name }
		} else {
			Disposition::Ignore
		}
	}

	/// Is `name` the per-subtree override file?
	pub fn is_override_file(&self, name: &OsStr) -> bool {
		name == OsStr::new(&self.config_file_name)
	}

	pub fn copy_extensions(&self) -> &BTreeSet<String> {
		&self.copy_extensions
	}

	pub fn convert_extensions(&self) -> &BTreeSet<String> {
		&self.convert_extensions
	}

	pub fn output_extension(&self) -> &str {
		&self.output_extension
	}

	pub fn converter_exe(&self) -> &Path {
		&self.converter_exe
	}

	pub fn command(&self) -> &CommandTemplate {
		&self.command
	}

	pub fn extra_args(&self) -> &BTreeMap<String, ArgValue> {
		&self.extra_args
	}

	pub fn config_file_name(&self) -> &str {
		&self.config_file_name
	}

	/// Modification time of the configuration in effect
	pub fn config_mtime(&self) -> SystemTime {
		self.config_mtime
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::CommandSpec;
	use std::time::{Duration, UNIX_EPOCH};
	use tempfile::TempDir;

	fn spec_with_exe(exe: PathBuf) -> SnapshotSpec {
		SnapshotSpec {
			copy_extensions: vec![".txt".into(), ".jpg".into()],
			convert_extensions: vec![".wav".into(), ".flac".into()],
			output_extension: ".opus".into(),
			converter_exe: exe,
			command: vec!["{input}".into(), "{output}".into()],
			extra_args: BTreeMap::new(),
			config_file_name: "media-archon.toml".into(),
			config_mtime: UNIX_EPOCH,
		}
	}

	fn fixture() -> (TempDir, SnapshotSpec) {
		let tmp = TempDir::new().unwrap();
		let exe = tmp.path().join("conv");
		std::fs::write(&exe, b"").unwrap();
		let spec = spec_with_exe(exe);
		(tmp, spec)
	}

	#[test]
	fn test_classify() {
		let (_tmp, spec) = fixture();
		let snap = Snapshot::new(spec).unwrap();

		assert_eq!(
			snap.classify(OsStr::new("notes.txt")),
			Disposition::Copy { target_name: "notes.txt".into() }
		);
		assert_eq!(
			snap.classify(OsStr::new("a.b.wav")),
			Disposition::Convert { target_name: "a.b.opus".into() }
		);
		assert_eq!(snap.classify(OsStr::new("cover.png")), Disposition::Ignore);
		assert_eq!(snap.classify(OsStr::new("README")), Disposition::Ignore);
		assert_eq!(snap.classify(OsStr::new("LOUD.WAV")), Disposition::Ignore);
	}

	#[test]
	fn test_hidden_names() {
		assert!(is_hidden(OsStr::new(".DS_Store")));
		assert!(is_hidden(OsStr::new(".git")));
		assert!(!is_hidden(OsStr::new("a.wav")));
	}

	#[test]
	fn test_rejects_overlapping_extensions() {
		let (_tmp, mut spec) = fixture();
		spec.copy_extensions.push(".wav".into());
		let err = Snapshot::new(spec).unwrap_err();
		assert_eq!(err.key(), Some("converter.inputs"));
	}

	#[test]
	fn test_rejects_missing_exe() {
		let (tmp, mut spec) = fixture();
		spec.converter_exe = tmp.path().join("nope");
		assert_eq!(Snapshot::new(spec).unwrap_err().key(), Some("converter.exe"));
	}

	#[test]
	fn test_rejects_bad_output_suffix() {
		let (_tmp, mut spec) = fixture();
		spec.output_extension = "opus".into();
		assert_eq!(Snapshot::new(spec).unwrap_err().key(), Some("converter.output"));
	}

	#[test]
	fn test_rejects_unknown_placeholder() {
		let (_tmp, mut spec) = fixture();
		spec.command.push("{bitrate}".into());
		assert_eq!(Snapshot::new(spec).unwrap_err().key(), Some("converter.cmd"));
	}

	#[test]
	fn test_reserved_arg_blames_args() {
		let (_tmp, mut spec) = fixture();
		spec.extra_args.insert("output".to_string(), ArgValue::Text("x".into()));
		assert_eq!(Snapshot::new(spec).unwrap_err().key(), Some("converter.args"));
	}

	#[test]
	fn test_override_derives_new_snapshot() {
		let (_tmp, spec) = fixture();
		let parent = Snapshot::new(spec).unwrap();
		let later = UNIX_EPOCH + Duration::from_secs(1_000);

		let mut args = BTreeMap::new();
		args.insert("q".to_string(), ArgValue::Integer(5));
		let ov = ConverterOverride {
			cmd: Some(CommandSpec::Tokens(vec!["-q".into(), "{q}".into(), "{input}".into()])),
			args: Some(args),
		};
		let child = parent.with_override(ov, later).unwrap();

		assert_eq!(child.config_mtime(), later);
		assert_eq!(child.command().placeholders(), vec!["q", "input"]);
		assert_eq!(child.extra_args().len(), 1);
		assert_eq!(child.copy_extensions(), parent.copy_extensions());
		assert_eq!(parent.config_mtime(), UNIX_EPOCH);
		assert!(parent.extra_args().is_empty());
	}

	#[test]
	fn test_override_inherits_missing_fields() {
		let (_tmp, spec) = fixture();
		let parent = Snapshot::new(spec).unwrap();
		let child = parent.with_override(ConverterOverride::default(), UNIX_EPOCH).unwrap();
		assert_eq!(child.command(), parent.command());
	}

	#[test]
	fn test_override_must_satisfy_template() {
		let (_tmp, spec) = fixture();
		let parent = Snapshot::new(spec).unwrap();
		let ov = ConverterOverride {
			cmd: Some(CommandSpec::Line("-q {quality} {input} {output}".into())),
			args: None,
		};
		assert!(parent.with_override(ov, UNIX_EPOCH).is_err());
	}
}

// vim: ts=4
