//! Detection stage: normalize a frame, query the face model, restore coordinates.

use crate::model::{FaceModel, ModelError};
use crate::record::Detections;
use crate::types::{Embedding, LandmarkSet, Region};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Linear downscale applied to streamed frames before detection.
pub const STREAM_DOWNSCALE: u32 = 4;

/// How the working copy handed to the model relates to the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Full-resolution source; coordinates are used as returned.
    Native,
    /// Shrink by this linear factor, then scale coordinates back up by it.
    Downscale(u32),
}

/// Which optional outputs the downstream stages need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionRequest {
    pub embeddings: bool,
    pub landmarks: bool,
}

/// Everything one detection pass produced, in source-frame coordinates.
#[derive(Debug, Clone, Default)]
pub struct DetectionPass {
    /// Regions with provisional labels; `None` when no face was found.
    pub record: Option<Detections>,
    /// Empty unless requested.
    pub embeddings: Vec<Embedding>,
    /// Empty unless requested, or when the model has no landmark predictor.
    pub landmarks: Vec<LandmarkSet>,
}

/// Run one detection pass over an RGB frame.
pub fn detect<M: FaceModel + ?Sized>(
    model: &mut M,
    frame: &RgbImage,
    scaling: Scaling,
    request: DetectionRequest,
) -> Result<DetectionPass, ModelError> {
    let (working, factor) = working_copy(frame, scaling);
    let image = working.as_ref().unwrap_or(frame);

    let regions = model.locate(image)?;
    if regions.is_empty() {
        tracing::trace!("no faces in frame");
        return Ok(DetectionPass::default());
    }

    let embeddings = if request.embeddings {
        model.encode(image, &regions)?
    } else {
        Vec::new()
    };

    let landmarks = if request.landmarks {
        model
            .landmarks(image)?
            .iter()
            .map(|set| set.scaled(factor))
            .collect()
    } else {
        Vec::new()
    };

    let regions: Vec<Region> = regions.iter().map(|r| r.scaled(factor)).collect();
    tracing::debug!(faces = regions.len(), factor, "detection pass complete");

    Ok(DetectionPass {
        record: Detections::provisional(regions),
        embeddings,
        landmarks,
    })
}

/// Downscaled working copy (if any) and the factor restoring source coordinates.
fn working_copy(frame: &RgbImage, scaling: Scaling) -> (Option<RgbImage>, i32) {
    let Scaling::Downscale(factor) = scaling else {
        return (None, 1);
    };
    if factor <= 1 {
        return (None, 1);
    }

    let width = (frame.width() as f32 / factor as f32).round() as u32;
    let height = (frame.height() as f32 / factor as f32).round() as u32;
    if width == 0 || height == 0 {
        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            "frame too small to downscale; detecting at full size"
        );
        return (None, 1);
    }

    let small = imageops::resize(frame, width, height, FilterType::Triangle);
    (Some(small), factor as i32)
}
