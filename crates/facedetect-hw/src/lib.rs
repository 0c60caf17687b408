//! facedetect-hw — Capture, display and image-file collaborators.
//!
//! Provides V4L2-based camera access, raw pixel-format conversion and
//! filesystem image I/O for the core pipeline.

pub mod camera;
pub mod frame;
pub mod image_io;
pub mod surface;

pub use camera::{Camera, CameraError};
pub use frame::PixelFormat;
pub use image_io::FsImageIo;
pub use surface::{CameraSource, HwSurface, SurfaceConfig};
