use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;

use media_archon::config::{Config, DEFAULT_CONFIG_FILE};
use media_archon::logging::*;
use media_archon::validation;
use media_archon::{ConfigError, Synchronizer};

/// Blocking threads kept free beyond the two pools
const SPARE_BLOCKING_THREADS: usize = 4;

const EXIT_RUNTIME_ERROR: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

fn cli() -> Command {
	Command::new("media-archon")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Mirror a media library, copying some files and transcoding others")
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.default_value(DEFAULT_CONFIG_FILE)
				.value_parser(value_parser!(PathBuf))
				.help("Configuration file"),
		)
		.arg(
			Arg::new("walkers")
				.short('w')
				.long("walkers")
				.value_name("N")
				.value_parser(value_parser!(i64))
				.allow_negative_numbers(true)
				.help("Walker pool threads (overrides the config file)"),
		)
		.arg(
			Arg::new("converters")
				.short('j')
				.long("converters")
				.value_name("N")
				.value_parser(value_parser!(i64))
				.allow_negative_numbers(true)
				.help("Converter pool threads (overrides the config file)"),
		)
}

/// Load the config file and apply CLI overrides on top of it
fn load_config(matches: &ArgMatches) -> Result<Config, ConfigError> {
	let path = matches
		.get_one::<PathBuf>("config")
		.cloned()
		.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
	info!("Loading configuration from {}", path.display());
	let mut config = Config::from_file(&path)?;

	if let Some(&n) = matches.get_one::<i64>("walkers") {
		config.walkers = validation::validate_pos_int(n)
			.map_err(|e| ConfigError::Invalid { key: "walkers", reason: e.to_string() })?;
	}
	if let Some(&n) = matches.get_one::<i64>("converters") {
		config.converters = validation::validate_pos_int(n)
			.map_err(|e| ConfigError::Invalid { key: "converters", reason: e.to_string() })?;
	}
	Ok(config)
}

fn main() -> ExitCode {
	let matches = cli().get_matches();
	media_archon::logging::init_tracing();

	let config = match load_config(&matches) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("Error: {}", e);
			return ExitCode::from(EXIT_CONFIG_ERROR);
		}
	};

	let runtime = match tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.thread_name("media-archon")
		.max_blocking_threads(config.walkers + config.converters + SPARE_BLOCKING_THREADS)
		.build()
	{
		Ok(rt) => rt,
		Err(e) => {
			eprintln!("Error: cannot start runtime: {}", e);
			return ExitCode::from(EXIT_RUNTIME_ERROR);
		}
	};

	match runtime.block_on(Synchronizer::new(config).run()) {
		Ok(report) => {
			info!(
				"Done: {} copied, {} converted, {} failed, {} deleted, {} up to date",
				report.files_copied,
				report.files_converted,
				report.conversions_failed,
				report.entries_deleted,
				report.up_to_date
			);
			eprintln!("Synchronization complete");
			ExitCode::SUCCESS
		}
		Err(e) => {
			eprintln!("Error: {}", e);
			ExitCode::from(EXIT_RUNTIME_ERROR)
		}
	}
}


// vim: ts=4
