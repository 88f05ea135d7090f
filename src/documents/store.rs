//! Flat output directory addressed by file name.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use super::error::{DocumentError, DocumentResult};
use super::types::ArtifactInfo;

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    /// Open the store, creating the directory (and parents) if needed.
    pub fn open(dir: impl Into<PathBuf>) -> DocumentResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| DocumentError::Store {
            dir: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a destination name inside the store.
    pub fn resolve(&self, name: &str) -> DocumentResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Path of an existing artifact.
    pub fn locate(&self, name: &str) -> DocumentResult<PathBuf> {
        let path = self.resolve(name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(DocumentError::NotFound(name.to_string()))
        }
    }

    /// PDF files in the store, sorted by name.
    pub async fn list(&self) -> std::io::Result<Vec<ArtifactInfo>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut artifacts = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if !is_pdf {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created = metadata.created().or_else(|_| metadata.modified())?;

            artifacts.push(ArtifactInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: metadata.len(),
                created_at: DateTime::<Utc>::from(created),
            });
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }
}

/// A destination must be exactly one plain file-name component.
pub fn validate_name(name: &str) -> DocumentResult<()> {
    let invalid = || DocumentError::InvalidName(name.to_string());

    if name.trim().is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
