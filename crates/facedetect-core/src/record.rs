//! The detections record: index-aligned (region, label) pairs for one pass.

use crate::types::Region;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Identity label attached to a detected region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Label {
    /// Placeholder `Face <n>`, 1-based.
    Provisional(usize),
    Known(String),
    Unknown,
}

impl Label {
    /// Provisional labels for `count` faces in detection order.
    pub fn provisional(count: usize) -> Vec<Label> {
        (1..=count).map(Label::Provisional).collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Provisional(n) => write!(f, "Face {n}"),
            Label::Known(name) => f.write_str(name),
            Label::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

#[derive(Error, Debug)]
#[error("detections record misaligned: {regions} regions, {labels} labels")]
pub struct MisalignedRecord {
    pub regions: usize,
    pub labels: usize,
}

/// Non-empty, index-aligned regions and labels.
///
/// Only ever built whole from both halves; there is no way to change one side alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detections {
    entries: Vec<(Region, Label)>,
}

impl Detections {
    /// Assemble a record. An empty detection set yields `Ok(None)`.
    pub fn assemble(
        regions: Vec<Region>,
        labels: Vec<Label>,
    ) -> Result<Option<Self>, MisalignedRecord> {
        if regions.len() != labels.len() {
            return Err(MisalignedRecord {
                regions: regions.len(),
                labels: labels.len(),
            });
        }
        if regions.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            entries: regions.into_iter().zip(labels).collect(),
        }))
    }

    /// Record with `Face <n>` labels in detection order; `None` for no regions.
    pub fn provisional(regions: Vec<Region>) -> Option<Self> {
        let labels = Label::provisional(regions.len());
        (!regions.is_empty()).then(|| Self {
            entries: regions.into_iter().zip(labels).collect(),
        })
    }

    /// Rebuild with replacement labels, keeping region order.
    pub fn relabel(self, labels: Vec<Label>) -> Result<Self, MisalignedRecord> {
        let regions: Vec<Region> = self.regions().collect();
        let labels_len = labels.len();
        Self::assemble(regions, labels)?.ok_or(MisalignedRecord {
            regions: 0,
            labels: labels_len,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Region, Label)> {
        self.entries.iter()
    }

    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.iter().map(|(_, l)| l)
    }
}

/// Renders as concatenated `(region, label)` pairs.
impl fmt::Display for Detections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (region, label) in &self.entries {
            write!(f, "({region}, {label})")?;
        }
        Ok(())
    }
}
