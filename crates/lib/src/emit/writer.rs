use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tracing::{debug, info, warn};

use super::{Emit, EmitError, SpecFormat, SpecSerializer};
use crate::unit::{Specification, UnitId};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What a write did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Written,
  /// An identical file was already present.
  Unchanged,
}

/// Writes specifications as files under an eval directory.
#[derive(Debug, Clone)]
pub struct SpecWriter<S = SpecFormat> {
  eval_dir: PathBuf,
  serializer: S,
}

impl<S: SpecSerializer> SpecWriter<S> {
  pub fn new(eval_dir: impl Into<PathBuf>, serializer: S) -> Self {
    Self {
      eval_dir: eval_dir.into(),
      serializer,
    }
  }

  pub fn eval_dir(&self) -> &Path {
    &self.eval_dir
  }

  /// `<eval-dir>/<identifier>.<ext>`
  pub fn path_for(&self, id: &UnitId) -> PathBuf {
    self.eval_dir.join(format!("{}.{}", id, self.serializer.extension()))
  }

  /// Persist `spec` under `id`.
  ///
  /// Skips the write when the file already holds the same bytes. Otherwise
  /// writes a temp file in the eval directory and renames it over the target.
  pub async fn write(&self, id: &UnitId, spec: &Specification) -> Result<WriteOutcome, EmitError> {
    let path = self.path_for(id);
    let content = self.serializer.serialize(spec)?;

    match fs::read(&path).await {
      Ok(existing) if existing == content.as_bytes() => {
        debug!(unit = %id, path = %path.display(), "specification already present");
        return Ok(WriteOutcome::Unchanged);
      }
      Ok(_) => warn!(unit = %id, path = %path.display(), "replacing specification with different content"),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => {
        return Err(EmitError::Read {
          path,
          source: Arc::new(e),
        });
      }
    }

    fs::create_dir_all(&self.eval_dir)
      .await
      .map_err(|e| EmitError::CreateDir {
        path: self.eval_dir.clone(),
        source: Arc::new(e),
      })?;

    let temp_path = self.temp_path_for(id);
    let written = async {
      fs::write(&temp_path, content.as_bytes()).await?;
      fs::rename(&temp_path, &path).await
    }
    .await;

    if let Err(e) = written {
      let _ = fs::remove_file(&temp_path).await;
      return Err(EmitError::Write {
        path,
        source: Arc::new(e),
      });
    }

    info!(unit = %id, path = %path.display(), "specification written");
    Ok(WriteOutcome::Written)
  }

  /// Read back a previously written specification.
  ///
  /// Returns `Ok(None)` if no file exists for `id`.
  pub async fn load(&self, id: &UnitId) -> Result<Option<Specification>, EmitError> {
    let path = self.path_for(id);

    let content = match fs::read_to_string(&path).await {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(unit = %id, path = %path.display(), "specification not found");
        return Ok(None);
      }
      Err(e) => {
        return Err(EmitError::Read {
          path,
          source: Arc::new(e),
        });
      }
    };

    let spec = self.serializer.deserialize(&content)?;
    if spec.identifier() != id {
      return Err(EmitError::Mismatch {
        expected: id.clone(),
        found: spec.identifier().clone(),
      });
    }
    Ok(Some(spec))
  }

  fn temp_path_for(&self, id: &UnitId) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    self.eval_dir.join(format!(
      ".{}.{}.{}.{}.tmp",
      id,
      std::process::id(),
      n,
      self.serializer.extension()
    ))
  }
}

impl<S> Emit for SpecWriter<S>
where
  S: SpecSerializer + Send + Sync + 'static,
{
  async fn emit(&self, id: &UnitId, spec: &Specification) -> Result<(), EmitError> {
    self.write(id, spec).await.map(|_| ())
  }
}
