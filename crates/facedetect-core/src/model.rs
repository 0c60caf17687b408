//! The face model capability consumed by the pipeline.

use crate::types::{Embedding, LandmarkSet, Region};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("operation not supported by this model: {0}")]
    Unsupported(&'static str),
}

/// Locates faces and computes per-face embeddings and landmarks.
///
/// All inputs are RGB. Results are in the coordinate space of the image passed in.
/// Calls are never overlapped by the pipeline.
pub trait FaceModel {
    /// Face regions, in model order.
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<Region>, ModelError>;

    /// One embedding per region, index-aligned with `regions`.
    fn encode(&mut self, image: &RgbImage, regions: &[Region]) -> Result<Vec<Embedding>, ModelError>;

    /// One landmark set per face, index-aligned with [`locate`](Self::locate).
    ///
    /// Models without a landmark predictor return an empty list.
    fn landmarks(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError>;
}

impl<M: FaceModel + ?Sized> FaceModel for Box<M> {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<Region>, ModelError> {
        (**self).locate(image)
    }

    fn encode(&mut self, image: &RgbImage, regions: &[Region]) -> Result<Vec<Embedding>, ModelError> {
        (**self).encode(image, regions)
    }

    fn landmarks(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        (**self).landmarks(image)
    }
}
