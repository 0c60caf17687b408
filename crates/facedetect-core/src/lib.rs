//! facedetect-core — per-frame face detection and recognition pipeline.
//!
//! The engine owns no hardware and no model. It drives a [`FaceModel`]
//! against frames from a [`Surface`] (or a still image from [`ImageIo`]),
//! labels faces against a preloaded [`Gallery`], and dispatches the enabled
//! outputs (print, draw, face extraction, landmark overlay, extension hook).

pub mod detection;
pub mod error;
pub mod gallery;
pub mod hooks;
pub mod media;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod recognizer;
pub mod record;
pub mod settings;
pub mod surface;
pub mod types;

#[cfg(test)]
mod fakes;

pub use error::{ConfigurationError, PipelineError, ProcessingError};
pub use gallery::Gallery;
pub use hooks::{Extensions, FrameHook, FrameView, HookError, Method};
pub use model::{FaceModel, ModelError};
pub use output::Overlay;
pub use pipeline::{Pipeline, RunSummary, State, Tuning};
pub use record::{Detections, Label};
pub use settings::{Mode, RawSettings, SettingValue, Settings};
pub use surface::{FrameRead, FrameSource, ImageIo, ImageIoError, MediaSource, Surface, SurfaceError};
pub use types::{ChannelOrder, Embedding, FaceFeature, Frame, LandmarkSet, Region};
