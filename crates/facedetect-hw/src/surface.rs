//! Capture/display surface backed by a V4L2 camera and a preview file.

use crate::camera::{Camera, CameraError};
use facedetect_core::{FrameRead, FrameSource, MediaSource, Surface, SurfaceError};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Consecutive failed reads after which the camera is treated as gone.
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Explicit device; the first capture-capable device otherwise.
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Rendered frames are written here as PNG when set.
    pub preview: Option<PathBuf>,
    /// Time slept on each quit poll.
    pub poll_interval: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: 640,
            height: 480,
            preview: None,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Frames from an open camera. Failed dequeues read as "not ready".
pub struct CameraSource {
    camera: Option<Camera>,
    failures: u32,
}

impl FrameSource for CameraSource {
    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn read_frame(&mut self) -> FrameRead {
        let Some(camera) = self.camera.as_mut() else {
            return FrameRead::Closed;
        };
        match camera.capture_frame() {
            Ok(frame) => {
                self.failures = 0;
                FrameRead::Frame(frame)
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!(error = %e, failures = self.failures, "frame read failed");
                if self.failures >= MAX_CONSECUTIVE_FAILURES {
                    tracing::warn!("camera stopped delivering frames; closing");
                    self.release();
                    return FrameRead::Closed;
                }
                FrameRead::NotReady
            }
        }
    }

    fn release(&mut self) {
        if let Some(camera) = self.camera.take() {
            tracing::info!(device = %camera.device_path, "camera released");
        }
    }
}

/// Camera-backed surface. Quit is signalled through a shared flag.
pub struct HwSurface {
    config: SurfaceConfig,
    quit: Arc<AtomicBool>,
    frames_shown: u64,
}

impl HwSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            config,
            quit: Arc::new(AtomicBool::new(false)),
            frames_shown: 0,
        }
    }

    /// Setting this flag makes the next quit poll return true.
    pub fn quit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }
}

impl From<CameraError> for SurfaceError {
    fn from(err: CameraError) -> Self {
        match err {
            CameraError::DeviceNotFound(d) => SurfaceError::DeviceNotFound(d),
            other => SurfaceError::CaptureFailed(other.to_string()),
        }
    }
}

impl Surface for HwSurface {
    type Source = CameraSource;

    fn open(&mut self, source: &MediaSource) -> Result<CameraSource, SurfaceError> {
        match source {
            MediaSource::File(path) => Err(SurfaceError::Unsupported(format!(
                "{}: video file decoding is not available",
                path.display()
            ))),
            MediaSource::DefaultDevice => {
                let device = self.config.device.clone().unwrap_or_else(Camera::default_device);
                let camera = Camera::open(&device, self.config.width, self.config.height)?;
                Ok(CameraSource {
                    camera: Some(camera),
                    failures: 0,
                })
            }
        }
    }

    fn show(&mut self, frame: &RgbImage) -> Result<(), SurfaceError> {
        self.frames_shown += 1;
        let Some(path) = &self.config.preview else {
            return Ok(());
        };
        frame
            .save(path)
            .map_err(|e| SurfaceError::Display(format!("{}: {e}", path.display())))
    }

    fn poll_quit(&mut self) -> bool {
        if !self.config.poll_interval.is_zero() {
            std::thread::sleep(self.config.poll_interval);
        }
        self.quit.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        tracing::info!(frames = self.frames_shown, "display closed");
    }
}
