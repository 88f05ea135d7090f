//! Multipart upload staging.
//!
//! Files are streamed into the upload directory under a random name and
//! removed again when the [`Upload`] is dropped, so a request never leaves
//! its inputs behind whatever the outcome.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::Response;
use tokio::io::AsyncWriteExt;

use super::helpers::json_error;
use crate::server::AppState;

/// Content types accepted for uploaded files.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["application/pdf", "text/html", "text/plain"];

/// A file staged in the upload directory.
#[derive(Debug)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub original_name: Option<String>,
    pub content_type: String,
    pub size: usize,
}

/// Text fields and staged files of one multipart request.
#[derive(Debug, Default)]
pub struct Upload {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        let paths: Vec<PathBuf> = self.files.drain(..).map(|f| f.path).collect();
        if paths.is_empty() {
            return;
        }

        // Removal must not block a runtime worker
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for path in paths {
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            tracing::debug!("Failed to remove upload {}: {}", path.display(), e);
                        }
                    }
                });
            }
            Err(_) => {
                for path in paths {
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::debug!("Failed to remove upload {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

/// Read a multipart body, staging up to `max_files` files from `file_field`.
pub async fn receive(
    state: &AppState,
    mut multipart: Multipart,
    file_field: &str,
    max_files: usize,
) -> Result<Upload, Response> {
    let mut upload = Upload::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        json_error(StatusCode::BAD_REQUEST, "Failed to read upload")
    })? {
        let name = field.name().unwrap_or("").to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|e| {
                tracing::warn!("Failed to read multipart text field '{}': {}", name, e);
                json_error(StatusCode::BAD_REQUEST, "Failed to read upload")
            })?;
            upload.fields.insert(name, value);
            continue;
        };

        if name != file_field {
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                format!("Unexpected field: {}", name),
            ));
        }
        if upload.files.len() >= max_files {
            return Err(json_error(StatusCode::BAD_REQUEST, "Too many files"));
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(json_error(StatusCode::BAD_REQUEST, "Invalid file type"));
        }

        let path = state
            .upload_dir
            .join(uuid::Uuid::new_v4().simple().to_string());
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            tracing::error!("Failed to stage upload {}: {}", path.display(), e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;
        // Registered before writing so a partial file is cleaned up too
        upload.files.push(UploadedFile {
            path: path.clone(),
            original_name: Some(original_name),
            content_type: content_type.clone(),
            size: 0,
        });

        let mut size = 0usize;
        let mut head = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            tracing::warn!("Failed to read upload data: {}", e);
            json_error(StatusCode::BAD_REQUEST, "Failed to read upload")
        })? {
            size += chunk.len();
            if size > state.max_upload_bytes {
                return Err(json_error(StatusCode::PAYLOAD_TOO_LARGE, "File too large"));
            }
            if head.len() < 16 {
                head.extend_from_slice(&chunk[..chunk.len().min(16 - head.len())]);
            }
            file.write_all(&chunk).await.map_err(|e| {
                tracing::error!("Failed to write upload {}: {}", path.display(), e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            })?;
        }
        file.flush().await.map_err(|e| {
            tracing::error!("Failed to write upload {}: {}", path.display(), e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

        if content_type == "application/pdf" && !is_pdf(&head) {
            return Err(json_error(StatusCode::BAD_REQUEST, "Invalid file type"));
        }

        if let Some(staged) = upload.files.last_mut() {
            staged.size = size;
            tracing::debug!(
                "Staged {} upload {:?} ({} bytes, {}) at {}",
                name,
                staged.original_name,
                staged.size,
                staged.content_type,
                staged.path.display()
            );
        }
    }

    Ok(upload)
}

/// Check magic bytes for a PDF header.
fn is_pdf(head: &[u8]) -> bool {
    infer::get(head).is_some_and(|kind| kind.mime_type() == "application/pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.7\n%\xe2\xe3"));
        assert!(!is_pdf(b"<html></html>"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn test_upload_drop_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        std::fs::write(&path, b"x").unwrap();

        let upload = Upload {
            files: vec![UploadedFile {
                path: path.clone(),
                original_name: None,
                content_type: "application/pdf".to_string(),
                size: 1,
            }],
            fields: HashMap::new(),
        };
        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upload_drop_removes_files_off_runtime_worker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        std::fs::write(&path, b"x").unwrap();

        drop(Upload {
            files: vec![UploadedFile {
                path: path.clone(),
                original_name: None,
                content_type: "application/pdf".to_string(),
                size: 1,
            }],
            fields: HashMap::new(),
        });

        for _ in 0..100 {
            if !path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_blank_field_is_absent() {
        let mut upload = Upload::default();
        upload.fields.insert("watermarkText".into(), "  ".into());
        upload.fields.insert("filename".into(), " out.pdf ".into());
        assert_eq!(upload.field("watermarkText"), None);
        assert_eq!(upload.field("filename"), Some("out.pdf"));
    }
}
