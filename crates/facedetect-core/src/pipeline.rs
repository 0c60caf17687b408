//! Pipeline driver: `Idle → Preloading → (ImageOnce | Streaming) → Terminated`.
//!
//! One frame is captured, detected, recognized, dispatched and rendered at a
//! time. The only cancellation point is the quit poll between frames.

use crate::detection::{self, DetectionPass, DetectionRequest, Scaling, STREAM_DOWNSCALE};
use crate::error::{ConfigurationError, PipelineError, ProcessingError};
use crate::gallery::Gallery;
use crate::hooks::{Extensions, FrameView, Method};
use crate::media::{is_valid_media, MediaKind};
use crate::model::FaceModel;
use crate::output::{DispatchInput, DispatchSummary, OutputDispatcher, Overlay};
use crate::recognizer::{self, EuclideanMatcher, DEFAULT_TOLERANCE};
use crate::record::Detections;
use crate::settings::{Mode, Settings};
use crate::surface::{FrameRead, FrameSource, ImageIo, MediaSource, Surface};
use image::RgbImage;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Idle,
    Preloading,
    ImageOnce,
    Streaming,
    Terminated,
}

/// Numeric knobs of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Maximum Euclidean distance for a positive identity match.
    pub tolerance: f32,
    /// Linear downscale of streamed frames before detection.
    pub stream_downscale: u32,
    /// Linear downscale of still images; `None` detects at full resolution.
    pub image_downscale: Option<u32>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            stream_downscale: STREAM_DOWNSCALE,
            image_downscale: None,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames_read: u64,
    /// Reads that returned nothing (warm-up, decoder hiccups).
    pub frames_skipped: u64,
    /// Faces detected across all frames.
    pub detections: u64,
    pub outputs: DispatchSummary,
    pub final_state: State,
}

/// Read-only state shared by every iteration of a run.
struct RunContext {
    method: Method,
    gallery: Gallery,
    matcher: EuclideanMatcher,
    dispatcher: OutputDispatcher,
    request: DetectionRequest,
    mode: Mode,
}

/// Scratch state owned by one iteration and replaced on the next.
struct FrameContext {
    index: u64,
    frame: RgbImage,
    pass: DetectionPass,
    record: Option<Detections>,
}

pub struct Pipeline<M, S, I> {
    settings: Settings,
    model: M,
    surface: S,
    io: I,
    extensions: Extensions,
    tuning: Tuning,
    overlay: Overlay,
    print_sink: Option<Box<dyn Write>>,
    state: State,
}

impl<M, S, I> Pipeline<M, S, I>
where
    M: FaceModel,
    S: Surface,
    I: ImageIo,
{
    pub fn new(settings: Settings, model: M, surface: S, io: I) -> Self {
        Self {
            settings,
            model,
            surface,
            io,
            extensions: Extensions::new(),
            tuning: Tuning::default(),
            overlay: Overlay::default(),
            print_sink: None,
            state: State::Idle,
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Send printed records to `sink` instead of stdout.
    pub fn with_print_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.print_sink = Some(sink);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    /// Run to completion. A pipeline runs at most once.
    ///
    /// `media_path` is required in image mode. In video mode a missing or
    /// unaccepted path selects the default capture device.
    pub fn start(&mut self, media_path: Option<&Path>) -> Result<RunSummary, PipelineError> {
        if self.state != State::Idle {
            return Err(ConfigurationError::AlreadyStarted.into());
        }

        let mut summary = RunSummary::default();
        let result = self.run(media_path, &mut summary);

        self.surface.close();
        self.transition(State::Terminated);
        summary.final_state = self.state;

        match &result {
            Ok(()) => tracing::info!(
                frames = summary.frames_read,
                skipped = summary.frames_skipped,
                detections = summary.detections,
                "run finished"
            ),
            Err(e) => tracing::error!(error = %e, "run aborted"),
        }
        result.map(|()| summary)
    }

    fn transition(&mut self, next: State) {
        tracing::info!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn run(&mut self, media_path: Option<&Path>, summary: &mut RunSummary) -> Result<(), PipelineError> {
        self.transition(State::Preloading);
        tracing::info!(mode = ?self.settings.mode, method = %self.settings.method, "pipeline starting");

        let method = Method::bind(&self.settings, &self.extensions)?;
        let gallery = if method.recognizes() {
            self.settings.check_known_faces()?;
            Gallery::preload(&self.settings.known_faces, &mut self.model, &self.io)?
        } else {
            Gallery::default()
        };

        let mut dispatcher =
            OutputDispatcher::new(&self.settings, method).with_overlay(self.overlay.clone());
        if let Some(sink) = self.print_sink.take() {
            dispatcher = dispatcher.with_sink(sink);
        }

        let mut run = RunContext {
            method,
            gallery,
            matcher: EuclideanMatcher {
                tolerance: self.tuning.tolerance,
            },
            request: DetectionRequest {
                embeddings: method.recognizes(),
                landmarks: dispatcher.wants_landmarks(),
            },
            dispatcher,
            mode: self.settings.mode,
        };

        match run.mode {
            Mode::Image => self.run_image(media_path, &mut run, summary),
            Mode::Video => self.run_stream(media_path, &mut run, summary),
        }
    }

    fn run_image(
        &mut self,
        media_path: Option<&Path>,
        run: &mut RunContext,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let Some(path) = media_path.filter(|p| is_valid_media(MediaKind::Image, p)) else {
            return Err(ConfigurationError::InvalidImagePath(media_path.map(Path::to_path_buf)).into());
        };
        let image = self
            .io
            .load_image(path)
            .map_err(ConfigurationError::ImageLoad)?;
        tracing::info!(path = %path.display(), width = image.width(), height = image.height(), "image loaded");

        self.transition(State::ImageOnce);
        let scaling = self
            .tuning
            .image_downscale
            .map_or(Scaling::Native, Scaling::Downscale);

        summary.frames_read += 1;
        let ctx = self.process(run, 0, image, scaling, summary)?;
        self.surface.show(&ctx.frame)?;

        while !self.surface.poll_quit() {}
        tracing::info!("quit requested");
        Ok(())
    }

    fn run_stream(
        &mut self,
        media_path: Option<&Path>,
        run: &mut RunContext,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let media = match media_path {
            Some(p) if is_valid_media(MediaKind::Video, p) => MediaSource::File(p.to_path_buf()),
            Some(p) => {
                tracing::info!(path = %p.display(), "not an accepted video file; using default device");
                MediaSource::DefaultDevice
            }
            None => MediaSource::DefaultDevice,
        };

        let mut source = self.surface.open(&media)?;
        tracing::info!(source = ?media, "frame source opened");
        self.transition(State::Streaming);

        let result = self.stream_loop(&mut source, run, summary);
        source.release();
        tracing::info!("frame source released");
        result
    }

    fn stream_loop(
        &mut self,
        source: &mut S::Source,
        run: &mut RunContext,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let scaling = Scaling::Downscale(self.tuning.stream_downscale);

        while source.is_open() {
            match source.read_frame() {
                FrameRead::Frame(frame) => {
                    let rgb = frame.into_rgb()?;
                    let index = summary.frames_read;
                    summary.frames_read += 1;
                    let ctx = self.process(run, index, rgb, scaling, summary)?;
                    self.surface.show(&ctx.frame)?;
                }
                FrameRead::NotReady => {
                    summary.frames_skipped += 1;
                    tracing::trace!("frame not ready");
                }
                FrameRead::Closed => {
                    tracing::info!("end of stream");
                    break;
                }
            }

            if self.surface.poll_quit() {
                tracing::info!("quit requested");
                break;
            }
        }
        Ok(())
    }

    /// Detection → recognition → dispatch → hook for one frame.
    fn process(
        &mut self,
        run: &mut RunContext,
        index: u64,
        frame: RgbImage,
        scaling: Scaling,
        summary: &mut RunSummary,
    ) -> Result<FrameContext, PipelineError> {
        let pass = detection::detect(&mut self.model, &frame, scaling, run.request)?;
        let mut ctx = FrameContext {
            index,
            frame,
            record: None,
            pass,
        };

        ctx.record = match ctx.pass.record.take() {
            Some(record) if run.method.recognizes() && !ctx.pass.embeddings.is_empty() => {
                let labels = recognizer::recognize(&ctx.pass.embeddings, &run.gallery, &run.matcher);
                Some(record.relabel(labels)?)
            }
            other => other,
        };

        if let Some(record) = &ctx.record {
            summary.detections += record.len() as u64;
            tracing::debug!(frame = index, faces = record.len(), "faces detected");
            summary.outputs += run.dispatcher.dispatch(
                DispatchInput {
                    mode: run.mode,
                    detections: record,
                    landmarks: &ctx.pass.landmarks,
                },
                &mut ctx.frame,
                &mut self.io,
            )?;
        }

        if let Method::Custom(id) = run.method {
            let view = FrameView {
                index: ctx.index,
                mode: run.mode,
                frame: &ctx.frame,
                detections: ctx.record.as_ref(),
                landmarks: &ctx.pass.landmarks,
            };
            self.extensions
                .call(id, &view)
                .map_err(|source| ProcessingError::Hook {
                    hook: self.extensions.name(id).to_string(),
                    source,
                })?;
        }

        Ok(ctx)
    }
}
