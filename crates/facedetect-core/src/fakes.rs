//! In-memory collaborators for unit and end-to-end tests.

use crate::model::{FaceModel, ModelError};
use crate::surface::{FrameRead, FrameSource, ImageIo, ImageIoError, MediaSource, Surface, SurfaceError};
use crate::types::{Embedding, LandmarkSet, Region};
use image::RgbImage;
use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Face model returning fixed results and recording what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    faces: Vec<Region>,
    embeddings: Vec<Embedding>,
    landmarks: Vec<LandmarkSet>,
    fail: bool,
    pub seen_sizes: Vec<(u32, u32)>,
    pub encode_calls: usize,
    pub landmark_calls: usize,
}

impl ScriptedModel {
    pub fn with_faces(mut self, faces: Vec<Region>) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Embedding>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn with_landmarks(mut self, landmarks: Vec<LandmarkSet>) -> Self {
        self.landmarks = landmarks;
        self
    }

    /// Every call fails with `InferenceFailed`.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn check(&self) -> Result<(), ModelError> {
        if self.fail {
            return Err(ModelError::InferenceFailed("scripted failure".into()));
        }
        Ok(())
    }
}

impl FaceModel for ScriptedModel {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<Region>, ModelError> {
        self.seen_sizes.push(image.dimensions());
        self.check()?;
        Ok(self.faces.clone())
    }

    fn encode(&mut self, _image: &RgbImage, _regions: &[Region]) -> Result<Vec<Embedding>, ModelError> {
        self.encode_calls += 1;
        self.check()?;
        Ok(self.embeddings.clone())
    }

    fn landmarks(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        self.landmark_calls += 1;
        self.check()?;
        Ok(self.landmarks.clone())
    }
}

/// Finds one face covering the middle half of whatever image it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentredFaceModel;

impl FaceModel for CentredFaceModel {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<Region>, ModelError> {
        let (w, h) = (image.width() as i32, image.height() as i32);
        Ok(vec![Region::new(h / 4, 3 * w / 4, 3 * h / 4, w / 4)])
    }

    fn encode(&mut self, _image: &RgbImage, regions: &[Region]) -> Result<Vec<Embedding>, ModelError> {
        Ok(regions.iter().map(|_| Embedding::new(vec![0.0])).collect())
    }

    fn landmarks(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, ModelError> {
        Ok(Vec::new())
    }
}

/// Image store keyed by path; saved artifacts are kept in order.
#[derive(Debug, Default)]
pub struct MemoryImageIo {
    images: BTreeMap<PathBuf, RgbImage>,
    pub saved: Vec<(String, RgbImage)>,
}

impl MemoryImageIo {
    /// Store a blank 64x64 image under each path.
    pub fn with_images(paths: &[&str]) -> Self {
        Self {
            images: paths
                .iter()
                .map(|p| (PathBuf::from(p), RgbImage::new(64, 64)))
                .collect(),
            saved: Vec::new(),
        }
    }

    pub fn with_image(mut self, path: &str, image: RgbImage) -> Self {
        self.images.insert(PathBuf::from(path), image);
        self
    }

    pub fn saved_names(&self) -> Vec<String> {
        self.saved.iter().map(|(n, _)| n.clone()).collect()
    }
}

impl ImageIo for MemoryImageIo {
    fn load_image(&self, path: &Path) -> Result<RgbImage, ImageIoError> {
        self.images.get(path).cloned().ok_or_else(|| {
            ImageIoError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        })
    }

    fn save_or_emit(&mut self, name: &str, image: &RgbImage) -> Result<(), ImageIoError> {
        self.saved.push((name.to_string(), image.clone()));
        Ok(())
    }
}

/// Cloneable in-memory text sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Frame source replaying a fixed list of reads, then closing.
#[derive(Debug)]
pub struct ScriptedSource {
    reads: VecDeque<FrameRead>,
    closed: bool,
    released: Rc<Cell<bool>>,
}

impl FrameSource for ScriptedSource {
    fn is_open(&self) -> bool {
        !self.closed
    }

    fn read_frame(&mut self) -> FrameRead {
        match self.reads.pop_front() {
            Some(FrameRead::Closed) | None => {
                self.closed = true;
                FrameRead::Closed
            }
            Some(read) => read,
        }
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

/// Surface handing out a [`ScriptedSource`] and answering quit polls from a script.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    reads: Vec<FrameRead>,
    /// Answer `true` from this poll (1-based) onwards.
    quit_on_poll: Option<usize>,
    open_error: Option<SurfaceError>,
    released: Rc<Cell<bool>>,
    pub opened: Vec<MediaSource>,
    pub shown: usize,
    pub last_shown: Option<RgbImage>,
    pub polls: usize,
    pub closed: bool,
}

impl ScriptedSurface {
    pub fn with_reads(mut self, reads: Vec<FrameRead>) -> Self {
        self.reads = reads;
        self
    }

    pub fn quit_on_poll(mut self, poll: usize) -> Self {
        self.quit_on_poll = Some(poll);
        self
    }

    pub fn failing_open(mut self, err: SurfaceError) -> Self {
        self.open_error = Some(err);
        self
    }

    pub fn source_released(&self) -> bool {
        self.released.get()
    }
}

impl Surface for ScriptedSurface {
    type Source = ScriptedSource;

    fn open(&mut self, source: &MediaSource) -> Result<ScriptedSource, SurfaceError> {
        if let Some(err) = self.open_error.take() {
            return Err(err);
        }
        self.opened.push(source.clone());
        Ok(ScriptedSource {
            reads: std::mem::take(&mut self.reads).into(),
            closed: false,
            released: Rc::clone(&self.released),
        })
    }

    fn show(&mut self, frame: &RgbImage) -> Result<(), SurfaceError> {
        self.shown += 1;
        self.last_shown = Some(frame.clone());
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.polls += 1;
        self.quit_on_poll.is_some_and(|n| self.polls >= n)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
