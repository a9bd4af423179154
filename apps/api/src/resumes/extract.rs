//! Text extraction and on-disk storage for uploaded resume files.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use uuid::Uuid;

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    PlainText,
    /// Stored as-is, no text extracted.
    Other,
}

/// Classifies by declared media type, then by file extension.
pub fn media_kind(mime_type: &str, filename: &str) -> MediaKind {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/pdf" => return MediaKind::Pdf,
        "text/plain" => return MediaKind::PlainText,
        "" | "application/octet-stream" => {}
        _ => return MediaKind::Other,
    }

    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        MediaKind::Pdf
    } else if lower.ends_with(".txt") {
        MediaKind::PlainText
    } else {
        MediaKind::Other
    }
}

/// Extracts text from `data`. `Ok(None)` for media kinds without an extractor.
pub async fn extract_text(kind: MediaKind, data: Vec<u8>) -> Result<Option<String>> {
    match kind {
        MediaKind::PlainText => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
        MediaKind::Pdf => {
            // pdf-extract is CPU-bound and may panic on malformed input.
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await
                .context("PDF extraction task failed")?
                .map_err(|e| anyhow!("PDF extraction failed: {e:?}"))?;
            Ok(Some(text))
        }
        MediaKind::Other => Ok(None),
    }
}

/// Keeps the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "resume".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes an upload as `<uuid>-<sanitized name>` under `dir`.
/// Returns the stored file name and its full path.
pub async fn store_upload(dir: &Path, original_name: &str, data: &[u8]) -> Result<(String, PathBuf)> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

    let stored_name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name));
    let path = dir.join(&stored_name);
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("Failed to write upload {}", path.display()))?;

    Ok((stored_name, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_prefers_declared_type() {
        assert_eq!(media_kind("application/pdf", "cv.txt"), MediaKind::Pdf);
        assert_eq!(media_kind("text/plain; charset=utf-8", "cv"), MediaKind::PlainText);
        assert_eq!(media_kind("application/msword", "cv.pdf"), MediaKind::Other);
    }

    #[test]
    fn test_media_kind_falls_back_to_extension() {
        assert_eq!(media_kind("application/octet-stream", "CV.PDF"), MediaKind::Pdf);
        assert_eq!(media_kind("", "notes.txt"), MediaKind::PlainText);
        assert_eq!(media_kind("", "cv.docx"), MediaKind::Other);
    }

    #[test]
    fn test_sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\jane\\My CV (1).pdf"), "My_CV__1_.pdf");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "resume");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), MAX_NAME_CHARS);
    }

    #[tokio::test]
    async fn test_plain_text_is_decoded_lossily() {
        let text = extract_text(MediaKind::PlainText, b"Jane \xFFDoe".to_vec())
            .await
            .unwrap()
            .unwrap();
        assert!(text.starts_with("Jane "));
        assert!(text.ends_with("Doe"));
    }

    #[tokio::test]
    async fn test_other_media_has_no_extractor() {
        assert_eq!(extract_text(MediaKind::Other, vec![1, 2, 3]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_an_error() {
        let result = extract_text(MediaKind::Pdf, b"definitely not a pdf".to_vec()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_store_upload_writes_prefixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");

        let (name, path) = store_upload(&nested, "my cv.txt", b"hello").await.unwrap();

        assert!(name.ends_with("-my_cv.txt"));
        assert_eq!(path, nested.join(&name));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
    }
}
