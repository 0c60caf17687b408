//! SeetaFace frontal-face cascade via the `rustface` crate.

use crate::embedding::thumbnail_embedding;
use facedetect_core::{Embedding, FaceModel, LandmarkSet, ModelError, Region};
use image::RgbImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

const MIN_FACE_SIZE_FLOOR: u32 = 20;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model file not found: {0} (download seeta_fd_frontal_v1.0.bin)")]
    ModelNotFound(String),
    #[error("cannot read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid detector setting: {0}")]
    InvalidSetting(String),
}

/// Cascade tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    /// Smallest face in pixels; at least 20.
    pub min_face_size: u32,
    pub score_thresh: f64,
    /// Pyramid step, strictly between 0 and 1.
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_face_size: MIN_FACE_SIZE_FLOOR,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

impl DetectorSettings {
    fn validate(&self) -> Result<(), ModelLoadError> {
        if self.min_face_size < MIN_FACE_SIZE_FLOOR {
            return Err(ModelLoadError::InvalidSetting(format!(
                "min_face_size {} is below {MIN_FACE_SIZE_FLOOR}",
                self.min_face_size
            )));
        }
        if self.score_thresh <= 0.0 {
            return Err(ModelLoadError::InvalidSetting("score_thresh must be positive".into()));
        }
        if !(0.01..=0.99).contains(&self.pyramid_scale_factor) {
            return Err(ModelLoadError::InvalidSetting(format!(
                "pyramid_scale_factor {} outside 0.01..=0.99",
                self.pyramid_scale_factor
            )));
        }
        if self.slide_window_step == 0 {
            return Err(ModelLoadError::InvalidSetting("slide_window_step must be non-zero".into()));
        }
        Ok(())
    }
}

/// Face model locating faces with SeetaFace and embedding them as thumbnails.
///
/// This backend has no landmark predictor.
pub struct SeetaFaceModel {
    detector: Box<dyn rustface::Detector>,
    warned_landmarks: bool,
}

impl SeetaFaceModel {
    /// Load the SeetaFace model file and configure the cascade.
    pub fn load(path: &Path, settings: DetectorSettings) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ModelNotFound(path.display().to_string()));
        }
        settings.validate()?;

        let model = rustface::read_model(BufReader::new(File::open(path)?))?;
        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(settings.min_face_size);
        detector.set_score_thresh(settings.score_thresh);
        detector.set_pyramid_scale_factor(settings.pyramid_scale_factor);
        detector.set_slide_window_step(settings.slide_window_step, settings.slide_window_step);

        tracing::info!(path = %path.display(), ?settings, "SeetaFace model loaded");
        Ok(Self {
            detector,
            warned_landmarks: false,
        })
    }
}

impl FaceModel for SeetaFaceModel {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<Region>, ModelError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let gray = image::imageops::grayscale(image);
        let mut data = rustface::ImageData::new(gray.as_raw(), width, height);
        let faces = self.detector.detect(&mut data);

        let regions: Vec<Region> = faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                let (x, y) = (bbox.x(), bbox.y());
                Region::new(y, x + bbox.width() as i32, y + bbox.height() as i32, x)
            })
            .collect();
        tracing::trace!(faces = regions.len(), width, height, "located faces");
        Ok(regions)
    }

    fn encode(&mut self, image: &RgbImage, regions: &[Region]) -> Result<Vec<Embedding>, ModelError> {
        regions
            .iter()
            .map(|region| {
                thumbnail_embedding(image, region).ok_or_else(|| {
                    ModelError::InferenceFailed(format!("region {region} lies outside the image"))
                })
            })
            .collect()
    }

    fn landmarks(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        if !self.warned_landmarks {
            tracing::warn!("SeetaFace backend has no landmark predictor; features will not be drawn");
            self.warned_landmarks = true;
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = SeetaFaceModel::load(Path::new("/nonexistent/seeta.bin"), DetectorSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, ModelLoadError::ModelNotFound(_)));
    }

    #[test]
    fn test_settings_validation() {
        assert!(DetectorSettings::default().validate().is_ok());

        let small = DetectorSettings {
            min_face_size: 10,
            ..DetectorSettings::default()
        };
        assert!(matches!(small.validate(), Err(ModelLoadError::InvalidSetting(_))));

        let scale = DetectorSettings {
            pyramid_scale_factor: 1.0,
            ..DetectorSettings::default()
        };
        assert!(scale.validate().is_err());

        let step = DetectorSettings {
            slide_window_step: 0,
            ..DetectorSettings::default()
        };
        assert!(step.validate().is_err());
    }
}
