//! Fatal error kinds surfaced by the pipeline driver.

use crate::gallery::GalleryError;
use crate::hooks::HookError;
use crate::model::ModelError;
use crate::output::OutputError;
use crate::record::MisalignedRecord;
use crate::surface::{ImageIoError, SurfaceError};
use crate::types::FrameError;
use std::path::PathBuf;
use thiserror::Error;

/// Bad input or an unusable collaborator, detected before or while starting.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("provide a valid image file (got {0:?})")]
    InvalidImagePath(Option<PathBuf>),
    #[error("cannot load image: {0}")]
    ImageLoad(#[source] ImageIoError),
    #[error("the provided method does not exist: {0}")]
    UnknownMethod(String),
    #[error("no extension hook named '{0}'")]
    UnknownHook(String),
    #[error("known face '{label}' has a malformed entry")]
    MalformedKnownFace { label: String },
    #[error("cannot load reference image for '{label}': {source}")]
    ReferenceImage {
        label: String,
        #[source]
        source: ImageIoError,
    },
    #[error("unable to start: {0}")]
    SurfaceUnavailable(#[from] SurfaceError),
    #[error("unable to start: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error("pipeline has already run")]
    AlreadyStarted,
}

/// Failure while running the face model, a hook, or an output action.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("no face found in reference image for '{label}'")]
    NoFaceInReference { label: String },
    #[error("embedding extraction failed for '{label}': {source}")]
    ReferenceModel {
        label: String,
        #[source]
        source: ModelError,
    },
    #[error("face model: {0}")]
    Model(#[from] ModelError),
    #[error("hook '{hook}' failed: {source}")]
    Hook {
        hook: String,
        #[source]
        source: HookError,
    },
    #[error("output: {0}")]
    Output(#[from] OutputError),
    #[error(transparent)]
    Misaligned(#[from] MisalignedRecord),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),
}

impl From<GalleryError> for PipelineError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::MalformedEntry { label } => {
                ConfigurationError::MalformedKnownFace { label }.into()
            }
            GalleryError::ReferenceImage { label, source } => {
                ConfigurationError::ReferenceImage { label, source }.into()
            }
            GalleryError::NoFace { label } => ProcessingError::NoFaceInReference { label }.into(),
            GalleryError::Model { label, source } => {
                ProcessingError::ReferenceModel { label, source }.into()
            }
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        ProcessingError::Model(err).into()
    }
}

impl From<MisalignedRecord> for PipelineError {
    fn from(err: MisalignedRecord) -> Self {
        ProcessingError::Misaligned(err).into()
    }
}

impl From<OutputError> for PipelineError {
    fn from(err: OutputError) -> Self {
        ProcessingError::Output(err).into()
    }
}

impl From<SurfaceError> for PipelineError {
    fn from(err: SurfaceError) -> Self {
        ConfigurationError::SurfaceUnavailable(err).into()
    }
}

impl From<FrameError> for PipelineError {
    fn from(err: FrameError) -> Self {
        ConfigurationError::InvalidFrame(err).into()
    }
}
