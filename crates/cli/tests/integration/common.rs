//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory with isolated root, store, and
/// eval paths.
pub struct TestEnv {
  pub temp: TempDir,
  pub defs_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file.
  ///
  /// Copies the fixture content to a temporary `defs.lua` file.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let defs_path = temp.path().join("defs.lua");
    std::fs::write(&defs_path, fixture_content(name)).unwrap();
    Self { temp, defs_path }
  }

  /// Root path (isolated per test).
  pub fn root_path(&self) -> PathBuf {
    let p = self.temp.path().join("cairn");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Store root rendered into store paths.
  pub fn store_path(&self) -> PathBuf {
    self.root_path().join("store")
  }

  /// Directory specifications are written to.
  pub fn eval_path(&self) -> PathBuf {
    self.root_path().join("eval")
  }

  /// Names of the files currently in the eval directory, sorted.
  pub fn emitted_files(&self) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(self.eval_path()) else {
      return Vec::new();
    };
    let mut names: Vec<String> = entries
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }

  /// Get a pre-configured Command for the cairn binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `CAIRN_ROOT`: Isolated root path
  /// - `CAIRN_STORE`: Store root under it
  /// - `CAIRN_EVAL`: Eval directory under it
  pub fn cairn_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("cairn");
    cmd.env("CAIRN_ROOT", self.root_path());
    cmd.env("CAIRN_STORE", self.store_path());
    cmd.env("CAIRN_EVAL", self.eval_path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
