use crate::error::IngestError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Opaque blob store the ingestion pipeline writes raw uploads into. The
/// core only ever passes the returned path around.
pub trait BlobStorage {
    fn store(&self, bytes: &[u8], stored_name: &str) -> Result<String, IngestError>;
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<Vec<u8>, IngestError>;
    fn delete(&self, path: &str) -> Result<(), IngestError>;
    fn clear(&self) -> Result<(), IngestError>;
}

/// Builds a collision-resistant stored name: millisecond timestamp, a
/// random fragment, then the sanitized original name. The random fragment
/// keeps concurrent uploads of the same file apart within one clock tick.
pub fn generate_stored_name(original_name: &str) -> String {
    let sanitized: String = original_name
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8],
        sanitized
    )
}

pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStorage for FsBlobStorage {
    fn store(&self, bytes: &[u8], stored_name: &str) -> Result<String, IngestError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(stored_name);
        fs::write(&path, bytes)?;
        Ok(path.to_string_lossy().to_string())
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        Ok(fs::read(path)?)
    }

    fn delete(&self, path: &str) -> Result<(), IngestError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), IngestError> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}
