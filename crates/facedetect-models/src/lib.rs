//! facedetect-models — Concrete face model for the FaceDetect pipeline.
//!
//! Locates faces with the SeetaFace frontal cascade (`rustface`) and
//! embeds them as normalized grayscale thumbnails.

pub mod embedding;
pub mod seetaface;

pub use embedding::thumbnail_embedding;
pub use seetaface::{DetectorSettings, ModelLoadError, SeetaFaceModel};
