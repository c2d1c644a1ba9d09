use std::path::PathBuf;

use crate::consts::APP_NAME;

/// Env var overriding the cairn root directory.
pub const ROOT_ENV: &str = "CAIRN_ROOT";

/// Env var overriding the store directory.
pub const STORE_ENV: &str = "CAIRN_STORE";

/// Env var overriding the directory specifications are emitted into.
pub const EVAL_ENV: &str = "CAIRN_EVAL";

pub struct StorePaths {
  pub store: PathBuf,
  pub eval: PathBuf,
}

impl StorePaths {
  pub fn current() -> Self {
    Self {
      store: Self::store_path(),
      eval: Self::eval_path(),
    }
  }

  pub fn root_path() -> PathBuf {
    if let Ok(path) = std::env::var(ROOT_ENV) {
      return PathBuf::from(path);
    }

    PathBuf::from("/").join(APP_NAME)
  }

  pub fn store_path() -> PathBuf {
    if let Ok(path) = std::env::var(STORE_ENV) {
      return PathBuf::from(path);
    }

    Self::root_path().join("store")
  }

  pub fn eval_path() -> PathBuf {
    if let Ok(path) = std::env::var(EVAL_ENV) {
      return PathBuf::from(path);
    }

    Self::root_path().join("eval")
  }
}
