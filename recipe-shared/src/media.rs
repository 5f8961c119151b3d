//! Recipe image validation and storage.
//!
//! Uploaded images are checked with the `image` crate, then written under
//! the media root as `uploads/recipe/<uuid>.<ext>`. The database stores the
//! relative path; [`MediaStore::url`] turns it into a public URL.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use image::{ImageFormat, ImageReader};
use tracing::{debug, warn};
use uuid::Uuid;

/// Allowed image formats for recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Default upload limit (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Directory under the media root holding recipe images.
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,

    #[error("Unsupported image format: {0:?}. Allowed: JPEG, PNG, GIF, WebP")]
    UnsupportedFormat(ImageFormat),

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks that `data` is a complete image in an allowed format.
///
/// The format is guessed from the bytes, never from the file name, and the
/// whole payload must decode.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat, MediaError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| MediaError::InvalidImage)?;

    let format = reader.format().ok_or(MediaError::InvalidImage)?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(MediaError::UnsupportedFormat(format));
    }

    reader.decode().map_err(|e| {
        debug!(error = %e, "Image failed to decode");
        MediaError::InvalidImage
    })?;

    Ok(format)
}

/// Builds a fresh relative path for a recipe image.
///
/// The extension is taken from the uploaded file name, lowercased. Names
/// without a usable extension fall back to the detected format's.
pub fn recipe_image_path(filename: Option<&str>, format: ImageFormat) -> String {
    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| {
            format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("img")
                .to_string()
        });

    format!("{}/{}.{}", RECIPE_IMAGE_DIR, Uuid::new_v4(), ext)
}

/// File storage rooted at `MEDIA_ROOT`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str, max_bytes: usize) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            root: root.into(),
            base_url,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Public URL of a stored file.
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.base_url, relative.trim_start_matches('/'))
    }

    /// Resolves a stored relative path under the root.
    ///
    /// Rejects absolute paths and `..` so a stored reference can never
    /// point outside the media root.
    pub fn absolute_path(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);

        if relative.is_empty()
            || !path.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }

        Ok(self.root.join(path))
    }

    /// Validates and stores an uploaded recipe image.
    ///
    /// Returns the relative path to persist on the recipe.
    pub async fn save_recipe_image(
        &self,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<String, MediaError> {
        if data.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                size: data.len(),
                max: self.max_bytes,
            });
        }

        let format = validate_image(data)?;
        let relative = recipe_image_path(filename, format);
        self.save(&relative, data).await?;

        Ok(relative)
    }

    /// Writes `data` at `relative`, creating parent directories.
    pub async fn save(&self, relative: &str, data: &[u8]) -> Result<(), MediaError> {
        let path = self.absolute_path(relative)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        debug!(path = %path.display(), bytes = data.len(), "Stored media file");
        Ok(())
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        let path = self.absolute_path(relative)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Media file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(10, 10, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_validate_png() {
        assert_eq!(validate_image(&png_bytes()).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_validate_invalid_format() {
        assert!(matches!(
            validate_image(b"not an image"),
            Err(MediaError::InvalidImage)
        ));
    }

    #[test]
    fn test_validate_truncated_image() {
        let data = png_bytes();
        assert!(matches!(
            validate_image(&data[..data.len() / 2]),
            Err(MediaError::InvalidImage)
        ));
    }

    #[test]
    fn test_recipe_image_path_extension() {
        let path = recipe_image_path(Some("Photo.JPG"), ImageFormat::Jpeg);
        assert!(path.starts_with("uploads/recipe/"));
        assert!(path.ends_with(".jpg"));

        let path = recipe_image_path(None, ImageFormat::Png);
        assert!(path.ends_with(".png"));

        let path = recipe_image_path(Some("noext"), ImageFormat::Jpeg);
        assert!(path.ends_with(".jpg"));
    }

    #[test]
    fn test_recipe_image_path_is_unique() {
        let a = recipe_image_path(Some("a.png"), ImageFormat::Png);
        let b = recipe_image_path(Some("a.png"), ImageFormat::Png);
        assert_ne!(a, b);
    }

    #[test]
    fn test_url_and_absolute_path() {
        let store = MediaStore::new("/srv/media", "/media", MAX_FILE_SIZE);

        assert_eq!(
            store.url("uploads/recipe/x.png"),
            "/media/uploads/recipe/x.png"
        );
        assert_eq!(
            store.absolute_path("uploads/recipe/x.png").unwrap(),
            PathBuf::from("/srv/media/uploads/recipe/x.png")
        );
        assert!(store.absolute_path("../etc/passwd").is_err());
        assert!(store.absolute_path("/etc/passwd").is_err());
        assert!(store.absolute_path("").is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media/", MAX_FILE_SIZE);

        let relative = store
            .save_recipe_image(Some("dish.png"), &png_bytes())
            .await
            .unwrap();
        let path = store.absolute_path(&relative).unwrap();
        assert!(path.exists());

        store.remove(&relative).await.unwrap();
        assert!(!path.exists());

        // Second removal is a no-op
        store.remove(&relative).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media/", 16);

        assert!(matches!(
            store.save_recipe_image(None, &png_bytes()).await,
            Err(MediaError::TooLarge { max: 16, .. })
        ));
    }
}
