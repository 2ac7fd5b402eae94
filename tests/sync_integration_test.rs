//! End-to-end synchronization tests
//!
//! Each test builds a real source library in a temp dir, runs the
//! synchronizer against it with a shell-script converter, and checks the
//! resulting mirror and the reported events.
//!
//! Source files and the config file are aged into the past so every output
//! written by a run is strictly newer than its inputs.
#![cfg(unix)]

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use media_archon::{Config, ConfigError, SyncError, SyncEvent, SyncReport, Synchronizer};

const OVERRIDE: &str = "media-archon.toml";

/// Writes "<tag>:" followed by the input into the output, fails on "corrupt"
const CONVERTER: &str = r#"#!/bin/sh
if grep -q corrupt "$3"; then
	echo "corrupt input" >&2
	exit 1
fi
printf '%s:' "$2" > "$4"
cat "$3" >> "$4"
"#;

struct Library {
	_root: TempDir,
	source: PathBuf,
	target: PathBuf,
	config: PathBuf,
}

fn library() -> Library {
	let root = TempDir::new().unwrap();
	let source = root.path().join("library");
	let target = root.path().join("mirror");
	let exe = root.path().join("conv.sh");
	let config = root.path().join("media-archon.toml");
	fs::create_dir(&source).unwrap();
	fs::create_dir(&target).unwrap();
	fs::write(&exe, CONVERTER).unwrap();
	fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

	let text = format!(
		r#"
source = {:?}
target = {:?}
walkers = 4
converters = 2

[copier]
inputs = [".txt", ".jpg"]

[converter]
inputs = [".wav", ".flac"]
output = ".opus"
exe = {:?}
cmd = ["--tag", "{{tag}}", "{{input}}", "{{output}}"]
config = "{}"

[converter.args]
tag = "root"
"#,
		source, target, exe, OVERRIDE
	);
	fs::write(&config, text).unwrap();
	age(&config);

	Library { _root: root, source, target, config }
}

/// Push a file's mtime far into the past
fn age(path: &Path) {
	set_file_mtime(path, FileTime::from_unix_time(1_000_000, 0)).unwrap();
}

/// Bump a file's mtime to now
fn touch(path: &Path) {
	set_file_mtime(path, FileTime::now()).unwrap();
}

/// Create an aged source file, making parent dirs as needed
fn add(lib: &Library, rel: &str, content: &str) -> PathBuf {
	let path = lib.source.join(rel);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(&path, content).unwrap();
	age(&path);
	path
}

fn read(dir: &Path, rel: &str) -> Option<String> {
	fs::read_to_string(dir.join(rel)).ok()
}

async fn sync(lib: &Library) -> Result<(SyncReport, Vec<SyncEvent>), SyncError> {
	let config = Config::from_file(&lib.config).expect("config should load");
	let events = Arc::new(Mutex::new(Vec::new()));
	let sink = events.clone();
	let report = Synchronizer::new(config)
		.observer(Arc::new(move |e: &SyncEvent| sink.lock().unwrap().push(e.clone())))
		.run()
		.await?;
	let events = events.lock().unwrap().clone();
	Ok((report, events))
}

fn converted_sources(events: &[SyncEvent]) -> Vec<PathBuf> {
	let mut sources: Vec<PathBuf> = events
		.iter()
		.filter_map(|e| match e {
			SyncEvent::Converted { source, .. } => Some(source.clone()),
			_ => None,
		})
		.collect();
	sources.sort();
	sources
}

fn basic_library() -> Library {
	let lib = library();
	add(&lib, "a.wav", "alpha");
	add(&lib, "sub/b.wav", "beta");
	add(&lib, "notes.txt", "liner notes");
	lib
}

// ===================================================================
// MIRRORING
// ===================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_first_run_builds_mirror() {
	let lib = basic_library();
	add(&lib, "cover.png", "not listed");
	add(&lib, ".hidden.wav", "skipped");

	let (report, _) = sync(&lib).await.unwrap();

	assert_eq!(read(&lib.target, "a.opus").as_deref(), Some("root:alpha"));
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("root:beta"));
	assert_eq!(read(&lib.target, "notes.txt").as_deref(), Some("liner notes"));
	assert!(!lib.target.join("cover.png").exists());
	assert!(!lib.target.join(".hidden.opus").exists());
	assert!(!lib.target.join("a.wav").exists());

	assert_eq!(report.files_converted, 2);
	assert_eq!(report.files_copied, 1);
	assert_eq!(report.directories_created, 1);
	assert_eq!(report.entries_deleted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_run_does_nothing() {
	let lib = basic_library();
	sync(&lib).await.unwrap();

	let (report, events) = sync(&lib).await.unwrap();
	assert_eq!(report.operations(), 0);
	assert_eq!(report.up_to_date, 3);
	assert!(converted_sources(&events).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removed_source_is_pruned() {
	let lib = basic_library();
	sync(&lib).await.unwrap();

	fs::remove_file(lib.source.join("notes.txt")).unwrap();
	let (report, events) = sync(&lib).await.unwrap();

	assert!(!lib.target.join("notes.txt").exists());
	assert!(lib.target.join("a.opus").exists());
	assert_eq!(report.entries_deleted, 1);
	assert_eq!(report.files_converted, 0);
	assert!(events.contains(&SyncEvent::Deleted {
		path: lib.target.join("notes.txt"),
		was_dir: false
	}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_touched_source_is_reconverted_alone() {
	let lib = basic_library();
	sync(&lib).await.unwrap();

	let a = lib.source.join("a.wav");
	fs::write(&a, "alpha v2").unwrap();
	touch(&a);
	let (report, events) = sync(&lib).await.unwrap();

	assert_eq!(converted_sources(&events), vec![a]);
	assert_eq!(report.files_copied, 0);
	assert_eq!(read(&lib.target, "a.opus").as_deref(), Some("root:alpha v2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stray_target_entries_removed_hidden_kept() {
	let lib = basic_library();
	fs::write(lib.target.join("stray.txt"), "old").unwrap();
	fs::create_dir_all(lib.target.join("gone/deeper")).unwrap();
	fs::write(lib.target.join("gone/deeper/x.opus"), "old").unwrap();
	fs::write(lib.target.join(".keep"), "mine").unwrap();

	let (report, events) = sync(&lib).await.unwrap();

	assert!(!lib.target.join("stray.txt").exists());
	assert!(!lib.target.join("gone").exists());
	assert_eq!(read(&lib.target, ".keep").as_deref(), Some("mine"));
	assert_eq!(report.entries_deleted, 2);
	assert!(events
		.contains(&SyncEvent::Deleted { path: lib.target.join("gone"), was_dir: true }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_kind_mismatch_is_replaced() {
	let lib = basic_library();
	fs::create_dir_all(lib.target.join("notes.txt/inner")).unwrap();
	fs::write(lib.target.join("sub"), "a file where a dir belongs").unwrap();

	sync(&lib).await.unwrap();

	assert_eq!(read(&lib.target, "notes.txt").as_deref(), Some("liner notes"));
	assert!(lib.target.join("sub").is_dir());
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("root:beta"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_name_collision_first_entry_wins() {
	let lib = library();
	add(&lib, "a.flac", "from flac");
	add(&lib, "a.wav", "from wav");

	let (report, events) = sync(&lib).await.unwrap();

	assert_eq!(read(&lib.target, "a.opus").as_deref(), Some("root:from flac"));
	assert_eq!(report.files_converted, 1);
	assert_eq!(converted_sources(&events), vec![lib.source.join("a.flac")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dangling_symlink_is_skipped() {
	let lib = basic_library();
	std::os::unix::fs::symlink(lib.source.join("nowhere.wav"), lib.source.join("link.wav"))
		.unwrap();

	let (report, _) = sync(&lib).await.unwrap();
	assert_eq!(report.files_converted, 2);
	assert!(!lib.target.join("link.opus").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deep_tree_completes() {
	let lib = library();
	for i in 0..6 {
		for j in 0..6 {
			add(&lib, &format!("d{}/e{}/t{}.txt", i, j, j), "text");
		}
	}

	let (report, _) = sync(&lib).await.unwrap();
	assert_eq!(report.files_copied, 36);
	assert_eq!(report.directories_created, 6 + 36);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_symlinked_target_root_is_kept() {
	let lib = basic_library();
	let device = lib.target.parent().unwrap().join("usb");
	fs::create_dir(&device).unwrap();
	fs::remove_dir(&lib.target).unwrap();
	std::os::unix::fs::symlink(&device, &lib.target).unwrap();

	let (report, _) = sync(&lib).await.unwrap();

	assert!(fs::symlink_metadata(&lib.target).unwrap().file_type().is_symlink());
	assert_eq!(read(&device, "notes.txt").as_deref(), Some("liner notes"));
	assert_eq!(read(&device, "sub/b.opus").as_deref(), Some("root:beta"));
	assert_eq!(report.directories_created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_symlinked_target_subdir_is_kept() {
	let lib = basic_library();
	let elsewhere = lib.target.parent().unwrap().join("elsewhere");
	fs::create_dir(&elsewhere).unwrap();
	std::os::unix::fs::symlink(&elsewhere, lib.target.join("sub")).unwrap();

	let (report, _) = sync(&lib).await.unwrap();

	assert!(fs::symlink_metadata(lib.target.join("sub")).unwrap().file_type().is_symlink());
	assert_eq!(read(&elsewhere, "b.opus").as_deref(), Some("root:beta"));
	assert_eq!(report.directories_created, 0);
	assert_eq!(report.entries_deleted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dangling_target_link_becomes_dir() {
	let lib = basic_library();
	let gone = lib.target.parent().unwrap().join("unplugged");
	std::os::unix::fs::symlink(&gone, lib.target.join("sub")).unwrap();

	sync(&lib).await.unwrap();

	assert!(lib.target.join("sub").is_dir());
	assert!(!gone.exists());
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("root:beta"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_source_link_to_ancestor_is_skipped() {
	let lib = basic_library();
	std::os::unix::fs::symlink(&lib.source, lib.source.join("sub/loop")).unwrap();
	std::os::unix::fs::symlink(lib.source.join("sub"), lib.source.join("sub/self")).unwrap();

	let (report, _) = sync(&lib).await.unwrap();

	assert!(!lib.target.join("sub/loop").exists());
	assert!(!lib.target.join("sub/self").exists());
	assert_eq!(report.files_converted, 2);
}

// ===================================================================
// CONFIGURATION CASCADE
// ===================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_override_applies_to_subtree_only() {
	let lib = basic_library();
	add(&lib, "sub/deeper/c.wav", "gamma");
	add(&lib, &format!("sub/{}", OVERRIDE), "[converter.args]\ntag = \"sub\"\n");

	let (report, events) = sync(&lib).await.unwrap();

	assert_eq!(read(&lib.target, "a.opus").as_deref(), Some("root:alpha"));
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("sub:beta"));
	assert_eq!(read(&lib.target, "sub/deeper/c.opus").as_deref(), Some("sub:gamma"));
	assert!(!lib.target.join("sub").join(OVERRIDE).exists());
	assert_eq!(report.overrides_applied, 1);
	let ov = lib.source.join("sub").join(OVERRIDE);
	assert!(events.contains(&SyncEvent::OverrideApplied { path: ov }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_override_can_replace_command() {
	let lib = basic_library();
	add(
		&lib,
		&format!("sub/{}", OVERRIDE),
		"[converter]\ncmd = \"--tag fixed {input} {output}\"\nargs = {}\n",
	);

	sync(&lib).await.unwrap();
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("fixed:beta"));
	assert_eq!(read(&lib.target, "a.opus").as_deref(), Some("root:alpha"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_changed_override_reconverts_its_subtree() {
	let lib = basic_library();
	let ov = add(&lib, &format!("sub/{}", OVERRIDE), "[converter.args]\ntag = \"old\"\n");
	sync(&lib).await.unwrap();

	fs::write(&ov, "[converter.args]\ntag = \"new\"\n").unwrap();
	touch(&ov);
	let (report, events) = sync(&lib).await.unwrap();

	assert_eq!(converted_sources(&events), vec![lib.source.join("sub/b.wav")]);
	assert_eq!(report.files_copied, 0);
	assert_eq!(read(&lib.target, "sub/b.opus").as_deref(), Some("new:beta"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_changed_config_reconverts_everything() {
	let lib = basic_library();
	sync(&lib).await.unwrap();

	touch(&lib.config);
	let (report, _) = sync(&lib).await.unwrap();

	assert_eq!(report.files_converted, 2);
	assert_eq!(report.files_copied, 0);
	assert_eq!(report.up_to_date, 1);
}

// ===================================================================
// FAILURES
// ===================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conversion_failure_is_isolated() {
	let lib = basic_library();
	let bad = add(&lib, "bad.wav", "corrupt data");

	let (report, events) = sync(&lib).await.unwrap();

	assert!(!lib.target.join("bad.opus").exists());
	assert!(lib.target.join("a.opus").exists());
	assert!(lib.target.join("sub/b.opus").exists());
	assert_eq!(report.conversions_failed, 1);
	assert_eq!(report.files_converted, 2);
	assert!(events.iter().any(|e| matches!(
		e,
		SyncEvent::ConversionFailed { source, reason }
			if *source == bad && reason.contains("corrupt input")
	)));

	// Still unconverted, so the next run tries again
	let (report, _) = sync(&lib).await.unwrap();
	assert_eq!(report.conversions_failed, 1);
	assert_eq!(report.files_converted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broken_override_aborts_run() {
	let lib = basic_library();
	add(&lib, &format!("sub/{}", OVERRIDE), "[converter\n");

	let err = sync(&lib).await.unwrap_err();
	match err {
		SyncError::Override { path, .. } => {
			assert_eq!(path, lib.source.join("sub").join(OVERRIDE))
		}
		other => panic!("unexpected error {}", other),
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_override_with_unknown_placeholder_aborts_run() {
	let lib = basic_library();
	let text = "[converter]\ncmd = \"-b {bitrate} {input} {output}\"\n";
	add(&lib, &format!("sub/{}", OVERRIDE), text);

	let err = sync(&lib).await.unwrap_err();
	assert!(matches!(err, SyncError::Override { .. }));
}

#[test]
fn test_nested_target_is_config_error() {
	let lib = library();
	let nested = lib.source.join("mirror");
	fs::create_dir(&nested).unwrap();
	let text = fs::read_to_string(&lib.config)
		.unwrap()
		.replace(&format!("{:?}", lib.target), &format!("{:?}", nested));
	fs::write(&lib.config, text).unwrap();

	let err = Config::from_file(&lib.config).unwrap_err();
	assert_eq!(err.key(), Some("target"));
}

#[test]
fn test_missing_converter_is_config_error() {
	let lib = library();
	fs::remove_file(lib.config.parent().unwrap().join("conv.sh")).unwrap();

	let err = Config::from_file(&lib.config).unwrap_err();
	assert!(matches!(err, ConfigError::Invalid { key: "converter.exe", .. }));
}

// vim: ts=4
