//! Capture/display and image I/O collaborators.

use crate::types::Frame;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("unsupported media source: {0}")]
    Unsupported(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("display failed: {0}")]
    Display(String),
}

#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the streaming path reads frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    File(PathBuf),
    DefaultDevice,
}

/// Outcome of one frame read.
#[derive(Debug)]
pub enum FrameRead {
    Frame(Frame),
    /// Nothing available this time (warm-up, decoder hiccup). Not an error.
    NotReady,
    /// End of stream.
    Closed,
}

/// An opened stream of frames.
pub trait FrameSource {
    fn is_open(&self) -> bool;
    fn read_frame(&mut self) -> FrameRead;
    fn release(&mut self);
}

/// Opens frame sources, renders annotated frames and reports the quit signal.
pub trait Surface {
    type Source: FrameSource;

    fn open(&mut self, source: &MediaSource) -> Result<Self::Source, SurfaceError>;
    fn show(&mut self, frame: &RgbImage) -> Result<(), SurfaceError>;
    /// May block briefly. Returns true once the user asked to quit.
    fn poll_quit(&mut self) -> bool;
    /// Release display resources.
    fn close(&mut self);
}

/// Still-image loading and artifact output.
pub trait ImageIo {
    fn load_image(&self, path: &Path) -> Result<RgbImage, ImageIoError>;
    fn save_or_emit(&mut self, name: &str, image: &RgbImage) -> Result<(), ImageIoError>;
}
