use ab_glyph::FontArc;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use facedetect_core::settings::{
    KEY_DRAW, KEY_FACE_EXTRACTION, KEY_FACE_FEATURES, KEY_KNOWN_FACES, KEY_METHOD, KEY_MODE, KEY_PRINT,
};
use facedetect_core::{
    Extensions, FrameView, HookError, Overlay, Pipeline, RawSettings, RunSummary, SettingValue, Settings, Tuning,
};
use facedetect_hw::{FsImageIo, HwSurface, SurfaceConfig};
use facedetect_models::{DetectorSettings, SeetaFaceModel};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

/// Name of the built-in extension hook that logs every processed frame.
const LOG_HOOK: &str = "log";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Image,
    Video,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Detect,
    Recognize,
}

#[derive(Parser, Debug)]
#[command(name = "facedetect", about = "Detect and recognize faces in images, video and the webcam")]
struct Cli {
    /// Image or video file; video mode falls back to the camera without one
    media: Option<PathBuf>,

    /// TOML settings file, overridden by the flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Run a named extension hook instead of a built-in method (available: log)
    #[arg(long, conflicts_with = "method")]
    hook: Option<String>,

    /// Draw boxes and labels (on by default)
    #[arg(long, action = ArgAction::SetTrue)]
    draw: bool,

    /// Disable drawing
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "draw")]
    no_draw: bool,

    /// Print detections to stdout
    #[arg(long)]
    print: bool,

    /// Save each face as a separate image (image mode only)
    #[arg(long)]
    extract_faces: bool,

    /// Landmark features to draw, comma separated ("face" for all)
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,

    /// Known identity as LABEL=PATH (repeatable)
    #[arg(long = "known-face", value_parser = parse_known_face)]
    known_faces: Vec<(String, PathBuf)>,

    /// SeetaFace model file (overrides FACEDETECT_MODEL)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Capture device (overrides FACEDETECT_CAMERA_DEVICE)
    #[arg(long)]
    device: Option<String>,

    /// Write rendered frames to this PNG file
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Directory for extracted faces
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Font used for label text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Match tolerance for recognition
    #[arg(long)]
    tolerance: Option<f32>,

    /// Print a JSON run summary on exit
    #[arg(long)]
    summary: bool,
}

fn parse_known_face(s: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, got '{s}'"))?;
    let (label, path) = (label.trim(), path.trim());
    if label.is_empty() || path.is_empty() {
        return Err(format!("expected LABEL=PATH, got '{s}'"));
    }
    Ok((label.to_string(), PathBuf::from(path)))
}

/// Layer command-line flags over the settings file.
fn raw_settings(cli: &Cli, mut raw: RawSettings) -> RawSettings {
    if let Some(mode) = cli.mode {
        let mode = match mode {
            ModeArg::Image => "image",
            ModeArg::Video => "video",
        };
        raw.insert(KEY_MODE.into(), mode.into());
    }
    if let Some(method) = cli.method {
        let method = match method {
            MethodArg::Detect => "detect",
            MethodArg::Recognize => "recognize",
        };
        raw.insert(KEY_METHOD.into(), method.into());
    }
    if cli.draw {
        raw.insert(KEY_DRAW.into(), true.into());
    }
    if cli.print {
        raw.insert(KEY_PRINT.into(), true.into());
    }
    if cli.extract_faces {
        raw.insert(KEY_FACE_EXTRACTION.into(), true.into());
    }
    if !cli.features.is_empty() {
        let features = cli.features.iter().map(|f| SettingValue::Text(f.clone())).collect();
        raw.insert(KEY_FACE_FEATURES.into(), SettingValue::List(features));
    }
    if !cli.known_faces.is_empty() {
        let faces: BTreeMap<String, SettingValue> = cli
            .known_faces
            .iter()
            .map(|(label, path)| (label.clone(), SettingValue::Text(path.display().to_string())))
            .collect();
        raw.insert(KEY_KNOWN_FACES.into(), SettingValue::Map(faces));
    }
    raw
}

/// Resolve settings, then apply what the truthiness merge cannot express.
fn build_settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => config::load_settings_file(path)?,
        None => RawSettings::new(),
    };
    let mut settings = Settings::resolve(&raw_settings(cli, file));

    if cli.no_draw {
        settings = settings.with_draw(false);
    }
    if let Some(hook) = &cli.hook {
        settings = settings.with_custom(true).with_method(hook);
    }
    Ok(settings)
}

fn extensions() -> Extensions {
    Extensions::new().register(LOG_HOOK, |view: &FrameView<'_>| -> Result<(), HookError> {
        tracing::info!(
            frame = view.index,
            mode = ?view.mode,
            faces = view.detections.map_or(0, |d| d.len()),
            detections = %view.detections.map(ToString::to_string).unwrap_or_default(),
            "frame processed"
        );
        Ok(())
    })
}

fn load_overlay(font: Option<&PathBuf>) -> Result<Overlay> {
    let Some(path) = font else {
        return Ok(Overlay::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("cannot read font {}", path.display()))?;
    let font = FontArc::try_from_vec(bytes).with_context(|| format!("invalid font {}", path.display()))?;
    Ok(Overlay::default().with_font(font))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(model) = &cli.model {
        config.model_path = model.clone();
    }
    if let Some(device) = &cli.device {
        config.camera_device = Some(device.clone());
    }
    if let Some(preview) = &cli.preview {
        config.preview_path = Some(preview.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(font) = &cli.font {
        config.font_path = Some(font.clone());
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }

    let settings = build_settings(&cli)?;
    let overlay = load_overlay(config.font_path.as_ref())?;
    let surface = HwSurface::new(SurfaceConfig {
        device: config.camera_device.clone(),
        width: config.capture_width,
        height: config.capture_height,
        preview: config.preview_path.clone(),
        ..SurfaceConfig::default()
    });
    let quit = surface.quit_handle();

    tracing::info!(mode = ?settings.mode, method = %settings.method, "facedetect starting");

    let media = cli.media.clone();
    let mut run = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
        let model = SeetaFaceModel::load(&config.model_path, DetectorSettings::default())?;
        let tuning = Tuning {
            tolerance: config.tolerance,
            ..Tuning::default()
        };
        let mut pipeline = Pipeline::new(settings, model, surface, FsImageIo::new(&config.output_dir))
            .with_extensions(extensions())
            .with_tuning(tuning)
            .with_overlay(overlay);
        Ok(pipeline.start(media.as_deref())?)
    });

    let summary = tokio::select! {
        res = &mut run => res??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; stopping after the current frame");
            quit.store(true, Ordering::SeqCst);
            run.await??
        }
    };

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    tracing::info!("facedetect finished");
    Ok(())
}
