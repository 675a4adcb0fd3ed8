// JSON data file: load with defaults + validation, save atomically (temp file + rename).

use crate::error::{Error, Result};
use crate::models::DataDocument;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[async_trait]
pub trait Loader: Send + Sync {
    /// Fresh, validated and defaulted copy of the persisted document.
    async fn load(&self) -> Result<DataDocument>;
}

#[async_trait]
pub trait Saver: Send + Sync {
    /// Writes `doc` so that readers only ever see the old or the new file.
    async fn save(&self, doc: &DataDocument) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses file contents. Empty input is an empty document.
    pub fn parse(bytes: &[u8]) -> Result<DataDocument> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(DataDocument::default());
        }
        let mut doc: DataDocument = serde_json::from_slice(bytes)
            .map_err(|e| Error::Validation(format!("data file is not a valid document: {}", e)))?;
        doc.validate()?;
        doc.normalize_order();
        Ok(doc)
    }

    fn read_blocking(path: &Path) -> Result<DataDocument> {
        match std::fs::read(path) {
            Ok(bytes) => Self::parse(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DataDocument::default()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn write_blocking(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Validation(format!("data file path {:?} has no file name", path)))?;
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(".tmp");
        let tmp = dir.join(tmp_name);

        let result = (|| {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            std::fs::rename(&tmp, path)
        })();
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl Loader for DocumentFile {
    #[instrument(skip(self), fields(repo = "document_file", operation = "load"))]
    async fn load(&self) -> Result<DataDocument> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&path))
            .await
            .map_err(|_| Error::Cancelled)?
    }
}

#[async_trait]
impl Saver for DocumentFile {
    #[instrument(skip(self, doc), fields(repo = "document_file", operation = "save", version = doc.metadata.last_update))]
    async fn save(&self, doc: &DataDocument) -> Result<()> {
        doc.validate()?;
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| Error::Validation(format!("serialize document: {}", e)))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_blocking(&path, &bytes))
            .await
            .map_err(|_| Error::Cancelled)?
    }
}
