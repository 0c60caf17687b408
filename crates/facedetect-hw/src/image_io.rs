//! Still-image loading and artifact output on the local filesystem.

use facedetect_core::{ImageIo, ImageIoError};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Reads images with the `image` crate and writes artifacts as `<name>.png`.
#[derive(Debug, Clone)]
pub struct FsImageIo {
    output_dir: PathBuf,
}

impl FsImageIo {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Default for FsImageIo {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ImageIo for FsImageIo {
    fn load_image(&self, path: &Path) -> Result<RgbImage, ImageIoError> {
        let image = image::open(path).map_err(|source| ImageIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(image.to_rgb8())
    }

    fn save_or_emit(&mut self, name: &str, image: &RgbImage) -> Result<(), ImageIoError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{name}.png"));
        image.save(&path).map_err(|source| ImageIoError::Write {
            name: name.to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), width = image.width(), height = image.height(), "artifact written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("facedetect-{tag}-{}", std::process::id()))
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch_dir("io");
        let mut io = FsImageIo::new(&dir);
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        io.save_or_emit("face-1", &image).unwrap();

        let loaded = io.load_image(&dir.join("face-1.png")).unwrap();
        assert_eq!(loaded, image);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_file() {
        let err = FsImageIo::default()
            .load_image(Path::new("/nonexistent/face.png"))
            .unwrap_err();
        assert!(matches!(err, ImageIoError::Open { .. }));
    }
}
