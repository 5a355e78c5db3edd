use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use tokio::fs;

use crate::{
    constants::IMAGE_EXTENSIONS,
    error::{Error, HtmlError},
};

/// Raw image bytes pulled out of a recipe payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Accepts `data:image/<ext>;base64,<payload>` or bare base64 (taken as png).
pub fn decode_image(value: &str) -> Result<DecodedImage, &'static str> {
    let value = value.trim();

    let (extension, payload) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (media_type, payload) = rest
                .split_once(";base64,")
                .ok_or("Image must be a base64 data URI.")?;
            let extension = media_type
                .strip_prefix("image/")
                .ok_or("Uploaded file is not an image.")?;
            (extension.to_lowercase(), payload)
        }
        None => (String::from("png"), value),
    };

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err("Unsupported image format.");
    }

    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|_| "Image is not valid base64.")?;
    if bytes.is_empty() {
        return Err("The submitted image is empty.");
    }

    Ok(DecodedImage { bytes, extension })
}

/// Recipe images on local disk, published under a URL prefix.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };

        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save(&self, image: &DecodedImage) -> Result<String, Error> {
        let relative = format!("recipes/{}.{}", uuid::Uuid::new_v4(), image.extension);
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                log::error!("Could not create media directory {}: {e}", parent.display());
                HtmlError::InternalServerError.default()
            })?;
        }

        fs::write(&path, &image.bytes).await.map_err(|e| {
            log::error!("Could not write image {}: {e}", path.display());
            HtmlError::InternalServerError.default()
        })?;

        log::debug!("Stored image {relative}");
        Ok(relative)
    }

    /// Best effort, a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        if let Err(e) = fs::remove_file(self.root.join(relative)).await {
            log::warn!("Could not remove image {relative}: {e}");
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent gif
    const GIF: &str = "R0lGODlhAQABAAAAACH5BAEKAAEALAAAAAABAAEAAAICTAEAOw==";

    #[test]
    fn data_uri() {
        let image = decode_image(&format!("data:image/gif;base64,{GIF}")).unwrap();
        assert_eq!(image.extension, "gif");
        assert!(image.bytes.starts_with(b"GIF89a"));
    }

    #[test]
    fn bare_base64_is_png() {
        let image = decode_image(GIF).unwrap();
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(decode_image("data:image/bmp;base64,AAAA").is_err());
        assert!(decode_image("data:text/plain;base64,AAAA").is_err());
        assert!(decode_image("data:image/png;base64,!!!").is_err());
        assert!(decode_image("").is_err());
    }

    #[tokio::test]
    async fn save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "/media");

        let image = decode_image(GIF).unwrap();
        let relative = storage.save(&image).await.unwrap();

        assert!(relative.starts_with("recipes/"));
        assert!(relative.ends_with(".png"));
        assert_eq!(storage.url(&relative), format!("/media/{relative}"));
        assert!(dir.path().join(&relative).exists());

        storage.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());
    }
}
