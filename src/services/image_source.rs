use std::time::Duration;

use anyhow::{Context, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// An in-memory image ready for the inference call.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Reads an image from disk. The mime type is inferred from the file
/// extension, defaulting to JPEG.
pub async fn load_file(path: &str) -> Result<ImagePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read image file: {}", path))?;

    log::debug!("📊 Loaded image file {} ({} bytes)", path, bytes.len());

    Ok(ImagePayload {
        bytes,
        mime_type: mime_for_path(path),
    })
}

/// Downloads an image over HTTP with a bounded wait. The mime type comes
/// from the Content-Type header when it names an image format, otherwise
/// from the URL's extension.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<ImagePayload> {
    log::info!("🌐 Downloading image from {}", url);

    let response = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .with_context(|| format!("could not download image from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("image download failed with status {}: {}", status, url);
    }

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(mime_from_content_type)
        .unwrap_or_else(|| mime_for_path(url));

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("could not read image body from {}", url))?
        .to_vec();

    log::debug!("📊 Downloaded {} bytes ({})", bytes.len(), mime_type);

    Ok(ImagePayload { bytes, mime_type })
}

fn mime_for_path(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        // jpg, jpeg, and anything unrecognized
        "image/jpeg"
    }
}

fn mime_from_content_type(value: &str) -> Option<&'static str> {
    if value.contains("image/png") {
        Some("image/png")
    } else if value.contains("image/webp") {
        Some("image/webp")
    } else if value.contains("image/jpeg") || value.contains("image/jpg") {
        Some("image/jpeg")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("food.png"), "image/png");
        assert_eq!(mime_for_path("Lunch.JPG"), "image/jpeg");
        assert_eq!(mime_for_path("dinner.jpeg"), "image/jpeg");
        assert_eq!(mime_for_path("snack.webp"), "image/webp");
        assert_eq!(mime_for_path("no_extension"), "image/jpeg");
    }

    #[test]
    fn test_mime_from_content_type() {
        assert_eq!(
            mime_from_content_type("image/png; charset=binary"),
            Some("image/png")
        );
        assert_eq!(mime_from_content_type("image/jpeg"), Some("image/jpeg"));
        assert_eq!(mime_from_content_type("text/html"), None);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_error() {
        let err = load_file("/definitely/not/here.jpg").await.unwrap_err();
        assert!(err.to_string().contains("could not read image file"));
    }
}
