//! Output dispatcher: print, draw, face extraction and landmark overlay.
//!
//! Actions are independent of each other. Crops are taken before anything is
//! drawn, so extracted faces never carry overlay pixels.

use crate::hooks::Method;
use crate::record::{Detections, Label};
use crate::settings::{Mode, Settings};
use crate::surface::{ImageIo, ImageIoError};
use crate::types::{FaceFeature, LandmarkSet};
use ab_glyph::{FontArc, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

/// Box colour for a recognized identity.
pub const MATCHED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
/// Box colour for a face recognition could not identify.
pub const UNKNOWN_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
/// Box colour when recognition is not active.
pub const DETECT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const LANDMARK_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

const LABEL_TAG_HEIGHT: u32 = 35;
const LABEL_TEXT_INSET: i32 = 6;
const LABEL_FONT_SIZE: f32 = 22.0;
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("print failed: {0}")]
    Print(#[from] std::io::Error),
    #[error("face extraction failed: {0}")]
    Extract(#[from] ImageIoError),
}

/// Counts of what one dispatch produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub printed: usize,
    pub boxes: usize,
    pub crops: usize,
    pub polylines: usize,
}

impl std::ops::AddAssign for DispatchSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.printed += rhs.printed;
        self.boxes += rhs.boxes;
        self.crops += rhs.crops;
        self.polylines += rhs.polylines;
    }
}

/// One landmark feature as a connected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polyline {
    pub feature: FaceFeature,
    pub points: Vec<(i32, i32)>,
    pub closed: bool,
}

/// Polylines for the requested features of every face, face by face.
pub fn feature_polylines(landmarks: &[LandmarkSet], features: &[FaceFeature]) -> Vec<Polyline> {
    landmarks
        .iter()
        .flat_map(|set| {
            features.iter().filter_map(move |&feature| {
                set.get(feature).map(|points| Polyline {
                    feature,
                    points: points.to_vec(),
                    closed: feature.is_closed(),
                })
            })
        })
        .collect()
}

/// Box and label-tag renderer.
#[derive(Clone)]
pub struct Overlay {
    font: Option<FontArc>,
    font_scale: PxScale,
    tag_height: u32,
    text_inset: i32,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: PxScale::from(LABEL_FONT_SIZE),
            tag_height: LABEL_TAG_HEIGHT,
            text_inset: LABEL_TEXT_INSET,
        }
    }
}

impl Overlay {
    /// Render label text with `font`. Without a font only the tag band is drawn.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn color_for(label: &Label, recognizing: bool) -> Rgb<u8> {
        match (recognizing, label) {
            (false, _) => DETECT_COLOR,
            (true, Label::Known(_)) => MATCHED_COLOR,
            (true, _) => UNKNOWN_COLOR,
        }
    }

    /// Draw every region with its label tag. Returns the number of boxes drawn.
    pub fn draw_detections(&self, image: &mut RgbImage, detections: &Detections, recognizing: bool) -> usize {
        let mut drawn = 0;
        for (region, label) in detections.iter() {
            let (w, h) = (region.width(), region.height());
            if w == 0 || h == 0 {
                continue;
            }
            let color = Self::color_for(label, recognizing);

            for t in 0..BOX_THICKNESS {
                let (tw, th) = (w as i32 - 2 * t, h as i32 - 2 * t);
                if tw > 0 && th > 0 {
                    let rect = Rect::at(region.left + t, region.top + t).of_size(tw as u32, th as u32);
                    draw_hollow_rect_mut(image, rect, color);
                }
            }

            let tag = Rect::at(region.left, region.bottom - self.tag_height as i32)
                .of_size(w, self.tag_height);
            draw_filled_rect_mut(image, tag, color);

            if let Some(font) = &self.font {
                draw_text_mut(
                    image,
                    LABEL_TEXT_COLOR,
                    region.left + self.text_inset,
                    region.bottom - self.tag_height as i32 + self.text_inset,
                    self.font_scale,
                    font,
                    &label.to_string(),
                );
            }
            drawn += 1;
        }
        drawn
    }
}

/// Draw polylines onto `image`; closed ones connect their last point back to the first.
pub fn draw_polylines(image: &mut RgbImage, polylines: &[Polyline], color: Rgb<u8>) {
    for line in polylines {
        let pts: Vec<(f32, f32)> = line.points.iter().map(|&(x, y)| (x as f32, y as f32)).collect();
        for pair in pts.windows(2) {
            draw_line_segment_mut(image, pair[0], pair[1], color);
        }
        if line.closed && pts.len() > 2 {
            draw_line_segment_mut(image, pts[pts.len() - 1], pts[0], color);
        }
    }
}

/// Inputs for one dispatch.
pub struct DispatchInput<'a> {
    pub mode: Mode,
    pub detections: &'a Detections,
    pub landmarks: &'a [LandmarkSet],
}

/// Runs the output actions enabled in the settings.
pub struct OutputDispatcher {
    print: bool,
    draw: bool,
    extract: bool,
    recognizing: bool,
    features: Vec<FaceFeature>,
    overlay: Overlay,
    sink: Box<dyn Write>,
}

impl OutputDispatcher {
    pub fn new(settings: &Settings, method: Method) -> Self {
        Self {
            print: settings.print,
            draw: settings.draw,
            extract: settings.face_extraction,
            recognizing: method.recognizes(),
            features: FaceFeature::expand(&settings.face_features),
            overlay: Overlay::default(),
            sink: Box::new(std::io::stdout()),
        }
    }

    /// Redirect printed records (stdout by default).
    pub fn with_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Whether the landmark stage has anything to draw.
    pub fn wants_landmarks(&self) -> bool {
        !self.features.is_empty()
    }

    pub fn dispatch<I: ImageIo + ?Sized>(
        &mut self,
        input: DispatchInput<'_>,
        frame: &mut RgbImage,
        io: &mut I,
    ) -> Result<DispatchSummary, OutputError> {
        let mut summary = DispatchSummary::default();

        if self.extract && input.mode == Mode::Image {
            for (n, region) in input.detections.regions().enumerate() {
                let Some(r) = region.clipped(frame.width(), frame.height()) else {
                    tracing::debug!(%region, "face outside frame; not extracted");
                    continue;
                };
                let crop = imageops::crop_imm(frame, r.left as u32, r.top as u32, r.width(), r.height())
                    .to_image();
                io.save_or_emit(&format!("face-{}", n + 1), &crop)?;
                summary.crops += 1;
            }
        }

        if self.print {
            writeln!(self.sink, "{}", input.detections)?;
            self.sink.flush()?;
            summary.printed += 1;
        }

        if self.draw {
            summary.boxes = self
                .overlay
                .draw_detections(frame, input.detections, self.recognizing);
        }

        if !self.features.is_empty() && !input.landmarks.is_empty() {
            let polylines = feature_polylines(input.landmarks, &self.features);
            draw_polylines(frame, &polylines, LANDMARK_COLOR);
            summary.polylines = polylines.len();
        }

        tracing::debug!(?summary, "outputs dispatched");
        Ok(summary)
    }
}
