//! Attachment data sources.
//!
//! - **MemoryDataSource**: bytes held in memory (generated sync payloads)
//! - **FileDataSource**: a file on local disk, removed by `delete`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::DataSource;

/// In-memory attachment bytes. `delete` drops the buffer.
pub struct MemoryDataSource {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryDataSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.bytes.lock().is_none()
    }

    fn gone() -> std::io::Error {
        std::io::Error::new(ErrorKind::NotFound, "data source was deleted")
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn size(&self) -> std::io::Result<u64> {
        self.bytes
            .lock()
            .as_ref()
            .map(|b| b.len() as u64)
            .ok_or_else(Self::gone)
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        self.bytes.lock().clone().ok_or_else(Self::gone)
    }

    async fn delete(&self) -> std::io::Result<()> {
        self.bytes.lock().take();
        Ok(())
    }
}

/// Attachment bytes stored in a local file.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn size(&self) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    async fn delete(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
