use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Face bounding box as (top, right, bottom, left) in original-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Region {
    /// Build a region, swapping edges so that `top <= bottom` and `left <= right`.
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top: top.min(bottom),
            right: right.max(left),
            bottom: bottom.max(top),
            left: left.min(right),
        }
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: i32) -> Self {
        Self::new(
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
            self.left * factor,
        )
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// Clip the region to a `width` x `height` frame. Returns `None` when nothing is left.
    pub fn clipped(&self, width: u32, height: u32) -> Option<Self> {
        let top = self.top.clamp(0, height as i32);
        let bottom = self.bottom.clamp(0, height as i32);
        let left = self.left.clamp(0, width as i32);
        let right = self.right.clamp(0, width as i32);
        (bottom > top && right > left).then_some(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Face embedding produced by the face model for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// The fixed landmark vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceFeature {
    Chin,
    LeftEyebrow,
    RightEyebrow,
    NoseBridge,
    NoseTip,
    LeftEye,
    RightEye,
    TopLip,
    BottomLip,
}

impl FaceFeature {
    pub const ALL: [FaceFeature; 9] = [
        FaceFeature::Chin,
        FaceFeature::LeftEyebrow,
        FaceFeature::RightEyebrow,
        FaceFeature::NoseBridge,
        FaceFeature::NoseTip,
        FaceFeature::LeftEye,
        FaceFeature::RightEye,
        FaceFeature::TopLip,
        FaceFeature::BottomLip,
    ];

    /// Selection keyword that expands to every feature.
    pub const WHOLE_FACE: &'static str = "face";

    pub fn name(&self) -> &'static str {
        match self {
            FaceFeature::Chin => "chin",
            FaceFeature::LeftEyebrow => "left_eyebrow",
            FaceFeature::RightEyebrow => "right_eyebrow",
            FaceFeature::NoseBridge => "nose_bridge",
            FaceFeature::NoseTip => "nose_tip",
            FaceFeature::LeftEye => "left_eye",
            FaceFeature::RightEye => "right_eye",
            FaceFeature::TopLip => "top_lip",
            FaceFeature::BottomLip => "bottom_lip",
        }
    }

    /// The chin is an open contour; every other feature closes back on itself.
    pub fn is_closed(&self) -> bool {
        !matches!(self, FaceFeature::Chin)
    }

    /// Expand a list of requested feature names into features, in vocabulary order.
    ///
    /// `face` selects the whole vocabulary. Unknown names are skipped with a warning.
    pub fn expand<S: AsRef<str>>(names: &[S]) -> Vec<FaceFeature> {
        let mut selected = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name == Self::WHOLE_FACE {
                return Self::ALL.to_vec();
            }
            match name.parse::<FaceFeature>() {
                Ok(feature) => selected.push(feature),
                Err(e) => tracing::warn!(error = %e, "ignoring face feature"),
            }
        }
        selected.sort();
        selected.dedup();
        selected
    }
}

impl fmt::Display for FaceFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown face feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for FaceFeature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// Landmark points for one face, keyed by feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: BTreeMap<FaceFeature, Vec<(i32, i32)>>,
}

impl LandmarkSet {
    pub fn with_feature(mut self, feature: FaceFeature, points: Vec<(i32, i32)>) -> Self {
        self.points.insert(feature, points);
        self
    }

    pub fn get(&self, feature: FaceFeature) -> Option<&[(i32, i32)]> {
        self.points.get(&feature).map(Vec::as_slice)
    }

    pub fn scaled(&self, factor: i32) -> Self {
        let points = self
            .points
            .iter()
            .map(|(feature, pts)| {
                (
                    *feature,
                    pts.iter().map(|(x, y)| (x * factor, y * factor)).collect(),
                )
            })
            .collect();
        Self { points }
    }
}

/// Byte order of the three colour channels in a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A raw packed 8-bit three-channel frame as delivered by a frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl Frame {
    /// Convert to an RGB image, reordering channels if the source is BGR.
    pub fn into_rgb(self) -> Result<image::RgbImage, FrameError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: self.data.len(),
            });
        }

        let mut data = self.data;
        if self.order == ChannelOrder::Bgr {
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }

        image::RgbImage::from_raw(self.width, self.height, data).ok_or(
            FrameError::InvalidLength {
                expected,
                actual: 0,
            },
        )
    }
}
