use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{ByteStream, Error, Store};

/// Filesystem store. Each artifact lives at `{base_path}/{key}`; parent
/// directories are created on write.
#[derive(Debug, Clone)]
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  /// Resolve a key, rejecting anything that is not a plain relative path.
  pub fn key_to_path(&self, key: &str) -> Result<PathBuf, Error> {
    let relative = Path::new(key);
    let plain = !key.is_empty()
      && relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if !plain {
      return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(self.base_path.join(relative))
  }
}

fn not_found_or_io(key: &str, e: std::io::Error) -> Error {
  if e.kind() == std::io::ErrorKind::NotFound {
    Error::NotFound(key.to_string())
  } else {
    Error::Io(e)
  }
}

#[async_trait]
impl Store for FsStore {
  async fn get(&self, key: &str) -> Result<ByteStream, Error> {
    let path = self.key_to_path(key)?;
    let file = File::open(&path).await.map_err(|e| not_found_or_io(key, e))?;
    let stream = ReaderStream::new(file).map(|r| r.map_err(Error::Io));
    Ok(Box::pin(stream))
  }

  async fn put(&self, key: &str, data: ByteStream, content_type: &str) -> Result<(), Error> {
    let path = self.key_to_path(key)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut file = File::create(&path).await?;
    let mut stream = data;
    let mut written = 0usize;

    while let Some(chunk) = stream.next().await {
      let bytes = chunk?;
      written += bytes.len();
      file.write_all(&bytes).await?;
    }

    file.flush().await?;
    debug!(key, content_type, bytes = written, "artifact_written");
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    let path = self.key_to_path(key)?;
    fs::remove_file(&path)
      .await
      .map_err(|e| not_found_or_io(key, e))
  }
}
