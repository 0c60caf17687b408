use anyhow::Context;
use facedetect_core::RawSettings;
use std::path::{Path, PathBuf};

/// Runtime environment, loaded from `FACEDETECT_*` variables with defaults.
///
/// Pipeline behaviour (mode, method, outputs) lives in the settings file and
/// flags instead.
pub struct Config {
    /// SeetaFace model file.
    pub model_path: PathBuf,
    /// V4L2 device path; the first capture device when unset.
    pub camera_device: Option<String>,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Directory receiving extracted face crops.
    pub output_dir: PathBuf,
    /// Rendered frames are written here when set.
    pub preview_path: Option<PathBuf>,
    /// TrueType font for label text.
    pub font_path: Option<PathBuf>,
    /// Euclidean match tolerance.
    pub tolerance: f32,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facedetect");

        Self {
            model_path: std::env::var("FACEDETECT_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("seeta_fd_frontal_v1.0.bin")),
            camera_device: std::env::var("FACEDETECT_CAMERA_DEVICE").ok(),
            capture_width: env_u32("FACEDETECT_CAPTURE_WIDTH", 640),
            capture_height: env_u32("FACEDETECT_CAPTURE_HEIGHT", 480),
            output_dir: std::env::var("FACEDETECT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            preview_path: std::env::var("FACEDETECT_PREVIEW").ok().map(PathBuf::from),
            font_path: std::env::var("FACEDETECT_FONT").ok().map(PathBuf::from),
            tolerance: env_f32("FACEDETECT_TOLERANCE", facedetect_core::recognizer::DEFAULT_TOLERANCE),
        }
    }
}

/// Read a TOML settings file into the raw option map.
pub fn load_settings_file(path: &Path) -> anyhow::Result<RawSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read settings file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid settings file {}", path.display()))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
