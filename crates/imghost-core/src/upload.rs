//! File upload: pre-flight checks, the multipart request, and progress.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::api::{decode, ApiClient, ApiError, FilePart, HttpRequest, Reply};
use crate::config::ClientConfig;
use crate::format::{file_extension, format_file_size};

/// Multipart field every file is sent under.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileProblem {
    #[error("File is larger than {}", size_limit(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
}

fn size_limit(max: &u64) -> String {
    format_file_size(*max)
}

/// Limits applied to files before they are uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    /// MIME types (`image/png`), wildcards (`image/*`) or extensions
    /// (`.png` / `png`).
    pub allowed_types: Vec<String>,
}

impl UploadPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            allowed_types: config.allowed_upload_types.clone(),
        }
    }

    fn accepts_type(&self, file_name: &str, content_type: &str) -> bool {
        let extension = file_extension(file_name);
        self.allowed_types.iter().any(|allowed| {
            if allowed.contains('*') {
                let main = allowed.split('/').next().unwrap_or_default();
                content_type.starts_with(main)
            } else {
                content_type == allowed
                    || (!extension.is_empty() && extension == allowed.trim_start_matches('.'))
            }
        })
    }

    /// Every problem with the file; empty when it may be uploaded.
    pub fn check(&self, file_name: &str, content_type: &str, size: u64) -> Vec<FileProblem> {
        let mut problems = Vec::new();
        if size > self.max_bytes {
            problems.push(FileProblem::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if !self.accepts_type(file_name, content_type) {
            let shown = if content_type.is_empty() {
                file_name
            } else {
                content_type
            };
            problems.push(FileProblem::UnsupportedType(shown.to_string()));
        }
        problems
    }
}

pub fn file_part(file_name: &str, content_type: &str, bytes: Vec<u8>) -> FilePart {
    FilePart {
        field: UPLOAD_FIELD.to_string(),
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        bytes,
    }
}

/// One multipart request carrying all `files`.
pub fn upload_request(client: &ApiClient, files: Vec<FilePart>) -> HttpRequest {
    debug!(count = files.len(), "building upload request");
    client.upload(files)
}

/// The service's JSON reply to an upload.
pub fn finish_upload(reply: Reply) -> Result<Value, ApiError> {
    decode(reply)
}

/// Whole-number percentage of `loaded` over `total`, or `None` while the
/// total size is unknown.
pub fn progress_percent(loaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (loaded as f64 * 100.0 / total as f64).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Body, HttpResponse};
    use serde_json::json;

    fn policy() -> UploadPolicy {
        UploadPolicy::from_config(&ClientConfig::default())
    }

    #[test]
    fn test_default_policy_accepts_images() {
        assert!(policy().check("cat.png", "image/png", 1024).is_empty());
        assert!(policy().check("cat.webp", "image/webp", 10 * 1024 * 1024).is_empty());
    }

    #[test]
    fn test_reports_size_and_type_together() {
        let problems = policy().check("notes.pdf", "application/pdf", 11 * 1024 * 1024);
        assert_eq!(
            problems,
            vec![
                FileProblem::TooLarge {
                    size: 11 * 1024 * 1024,
                    max: 10 * 1024 * 1024
                },
                FileProblem::UnsupportedType("application/pdf".to_string()),
            ]
        );
        assert_eq!(problems[0].to_string(), "File is larger than 10 MB");
    }

    #[test]
    fn test_exact_type_and_extension_entries() {
        let policy = UploadPolicy {
            max_bytes: 100,
            allowed_types: vec!["image/png".to_string(), ".jpg".to_string()],
        };
        assert!(policy.check("a.png", "image/png", 1).is_empty());
        assert!(policy.check("a.JPG", "", 1).is_empty());
        assert_eq!(policy.check("a.gif", "image/gif", 1).len(), 1);
    }

    #[test]
    fn test_upload_request_parts() {
        let client = ApiClient::new(&ClientConfig::default()).with_token(Some("t"));
        let request = upload_request(
            &client,
            vec![
                file_part("a.png", "image/png", vec![1]),
                file_part("b.png", "image/png", vec![2]),
            ],
        );
        assert_eq!(request.url, "/upload");
        match request.body {
            Body::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(parts.iter().all(|p| p.field == "file"));
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_finish_upload() {
        let reply = Ok(HttpResponse::json(200, &json!({"files": [{"id": 1}]})));
        assert_eq!(finish_upload(reply).unwrap()["files"][0]["id"], json!(1));
        let reply = Ok(HttpResponse::json(413, &json!({"error": "Too big"})));
        assert_eq!(finish_upload(reply).unwrap_err().message_or("Upload failed"), "Too big");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(50, Some(200)), Some(25));
        assert_eq!(progress_percent(1, Some(3)), Some(33));
        assert_eq!(progress_percent(2, Some(3)), Some(67));
        assert_eq!(progress_percent(10, None), None);
        assert_eq!(progress_percent(10, Some(0)), None);
    }
}
