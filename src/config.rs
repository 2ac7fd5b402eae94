//! Configuration loading for media-archon
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (pool sizes derived from the CPU count)
//! 2. Config file (`media-archon.toml` by default)
//! 3. CLI flags (highest priority, applied by the binary)
//!
//! Everything is validated here, before any worker pool exists, so a bad key
//! is reported by name and the run never starts.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::ConfigError;
use crate::logging::*;
use crate::snapshot::{Snapshot, SnapshotSpec};
use crate::template::ArgValue;
use crate::validation;

/// Default name of the top-level configuration file
pub const DEFAULT_CONFIG_FILE: &str = "media-archon.toml";

/// Walker pool threads per available CPU
pub const WALKERS_PER_CPU: usize = 10;

/// Converter pool threads per available CPU
pub const CONVERTERS_PER_CPU: usize = 2;

// ============================================================================
// RAW FILE SCHEMA
// ============================================================================

/// Converter command as written in a config file
///
/// Either a list of argument tokens or a single line split on whitespace.
/// The single-line form has no quoting; use the list form for arguments
/// containing spaces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
	Tokens(Vec<String>),
	Line(String),
}

impl CommandSpec {
	pub fn into_tokens(self) -> Vec<String> {
		match self {
			CommandSpec::Tokens(tokens) => tokens,
			CommandSpec::Line(line) => line.split_whitespace().map(str::to_string).collect(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
	source: Option<String>,
	target: Option<String>,
	walkers: Option<i64>,
	converters: Option<i64>,
	copier: Option<RawCopier>,
	converter: Option<RawConverter>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCopier {
	inputs: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConverter {
	inputs: Option<Vec<String>>,
	output: Option<String>,
	exe: Option<String>,
	cmd: Option<CommandSpec>,
	config: Option<String>,
	#[serde(default)]
	args: BTreeMap<String, ArgValue>,
}

/// Converter settings found in a per-subtree override file
///
/// The file uses the same `[converter]` table as the top-level config but
/// only `cmd` and `args` are honoured; absent keys are inherited.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConverterOverride {
	pub cmd: Option<CommandSpec>,
	pub args: Option<BTreeMap<String, ArgValue>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOverride {
	converter: Option<ConverterOverride>,
}

impl ConverterOverride {
	/// Parse override settings from TOML text
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let raw: RawOverride = toml::from_str(text)
			.map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
		Ok(raw.converter.unwrap_or_default())
	}

	/// Load an override file, returning its settings and modification time
	pub fn from_file(path: &Path) -> Result<(Self, SystemTime), ConfigError> {
		let (text, mtime) = read_with_mtime(path)?;
		let ov = Self::from_toml_str(&text).map_err(|e| with_path(e, path))?;
		Ok((ov, mtime))
	}
}

// ============================================================================
// VALIDATED CONFIGURATION
// ============================================================================

/// Validated top-level configuration
#[derive(Debug, Clone)]
pub struct Config {
	/// Root of the tree to mirror
	pub source: PathBuf,

	/// Root of the mirror
	pub target: PathBuf,

	/// Walker pool size (directory reads, copies, deletions)
	pub walkers: usize,

	/// Converter pool size (external converter processes)
	pub converters: usize,

	/// Root configuration snapshot
	pub snapshot: Snapshot,
}

impl Config {
	/// Read, parse and validate a configuration file
	///
	/// The file's modification time becomes the root snapshot's
	/// `config_mtime`, so editing the config invalidates earlier conversions.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let (text, mtime) = read_with_mtime(path)?;
		Self::from_toml_str(&text, mtime).map_err(|e| with_path(e, path))
	}

	/// Parse and validate configuration text
	pub fn from_toml_str(text: &str, config_mtime: SystemTime) -> Result<Self, ConfigError> {
		let raw: RawConfig = toml::from_str(text)
			.map_err(|e| ConfigError::Parse { path: None, message: e.to_string() })?;
		debug!("Config: {:?}", raw);

		let walkers = match raw.walkers {
			Some(n) => validation::validate_pos_int(n)
				.map_err(|e| ConfigError::invalid("walkers", e))?,
			None => {
				let n = available_cpus() * WALKERS_PER_CPU;
				debug!("Walker pool threads defaulting to {}", n);
				n
			}
		};
		let converters = match raw.converters {
			Some(n) => validation::validate_pos_int(n)
				.map_err(|e| ConfigError::invalid("converters", e))?,
			None => {
				let n = available_cpus() * CONVERTERS_PER_CPU;
				debug!("Converter pool threads defaulting to {}", n);
				n
			}
		};

		let source = required_dir(raw.source, "source")?;
		let target = required_dir(raw.target, "target")?;
		validation::validate_not_nested(&source, &target)
			.map_err(|e| ConfigError::invalid("target", e))?;

		let copier = raw.copier.ok_or(ConfigError::Missing { key: "copier" })?;
		let converter = raw.converter.ok_or(ConfigError::Missing { key: "converter" })?;

		let spec = SnapshotSpec {
			copy_extensions: copier.inputs.ok_or(ConfigError::Missing { key: "copier.inputs" })?,
			convert_extensions: converter
				.inputs
				.ok_or(ConfigError::Missing { key: "converter.inputs" })?,
			output_extension: converter
				.output
				.ok_or(ConfigError::Missing { key: "converter.output" })?,
			converter_exe: validation::expand_home(
				&converter.exe.ok_or(ConfigError::Missing { key: "converter.exe" })?,
			),
			command: converter
				.cmd
				.ok_or(ConfigError::Missing { key: "converter.cmd" })?
				.into_tokens(),
			extra_args: converter.args,
			config_file_name: converter
				.config
				.ok_or(ConfigError::Missing { key: "converter.config" })?,
			config_mtime,
		};

		Ok(Config { source, target, walkers, converters, snapshot: Snapshot::new(spec)? })
	}
}

/// Number of CPUs this process may run on, at least 1
pub fn available_cpus() -> usize {
	match std::thread::available_parallelism() {
		Ok(n) => n.get(),
		Err(e) => {
			warn!("Failed to determine number of available CPUs ({}), assuming 1", e);
			1
		}
	}
}

fn required_dir(value: Option<String>, key: &'static str) -> Result<PathBuf, ConfigError> {
	let dir = validation::expand_home(&value.ok_or(ConfigError::Missing { key })?);
	validation::validate_is_dir(&dir).map_err(|e| ConfigError::invalid(key, e))?;
	Ok(dir)
}

fn read_with_mtime(path: &Path) -> Result<(String, SystemTime), ConfigError> {
	let unreadable = |source| ConfigError::Unreadable { path: path.to_path_buf(), source };
	let text = fs::read_to_string(path).map_err(unreadable)?;
	let mtime = fs::metadata(path).and_then(|m| m.modified()).map_err(unreadable)?;
	Ok((text, mtime))
}

fn with_path(err: ConfigError, path: &Path) -> ConfigError {
	match err {
		ConfigError::Parse { path: None, message } => {
			ConfigError::Parse { path: Some(path.to_path_buf()), message }
		}
		other => other,
	}
}


// vim: ts=4
