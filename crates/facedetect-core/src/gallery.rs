//! Known-face gallery, built once before a run.

use crate::model::{FaceModel, ModelError};
use crate::surface::{ImageIo, ImageIoError};
use crate::types::Embedding;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("known face '{label}' has a malformed entry")]
    MalformedEntry { label: String },
    #[error("cannot load reference image for '{label}': {source}")]
    ReferenceImage {
        label: String,
        #[source]
        source: ImageIoError,
    },
    #[error("no face found in reference image for '{label}'")]
    NoFace { label: String },
    #[error("embedding extraction failed for '{label}': {source}")]
    Model {
        label: String,
        #[source]
        source: ModelError,
    },
}

/// Parallel label/embedding sequences; `labels[i]` names `embeddings[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    labels: Vec<String>,
    embeddings: Vec<Embedding>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<(String, Embedding)>) -> Self {
        let (labels, embeddings) = entries.into_iter().unzip();
        Self { labels, embeddings }
    }

    /// Load every reference image and keep the first face embedding of each.
    ///
    /// Any failure aborts the whole preload.
    pub fn preload<M, I>(
        known_faces: &BTreeMap<String, PathBuf>,
        model: &mut M,
        io: &I,
    ) -> Result<Self, GalleryError>
    where
        M: FaceModel + ?Sized,
        I: ImageIo + ?Sized,
    {
        let mut entries = Vec::with_capacity(known_faces.len());

        for (label, path) in known_faces {
            if label.trim().is_empty() || path.as_os_str().is_empty() {
                return Err(GalleryError::MalformedEntry {
                    label: label.clone(),
                });
            }

            let image = io
                .load_image(path)
                .map_err(|source| GalleryError::ReferenceImage {
                    label: label.clone(),
                    source,
                })?;

            let model_err = |source| GalleryError::Model {
                label: label.clone(),
                source,
            };
            let regions = model.locate(&image).map_err(model_err)?;
            let Some(first) = regions.first() else {
                return Err(GalleryError::NoFace {
                    label: label.clone(),
                });
            };
            let embedding = model
                .encode(&image, std::slice::from_ref(first))
                .map_err(model_err)?
                .into_iter()
                .next()
                .ok_or_else(|| GalleryError::NoFace {
                    label: label.clone(),
                })?;

            tracing::debug!(label = %label, path = %path.display(), faces = regions.len(), "reference face encoded");
            entries.push((label.clone(), embedding));
        }

        tracing::info!(count = entries.len(), "known-face gallery loaded");
        Ok(Self::from_entries(entries))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryImageIo, ScriptedModel};
    use crate::types::Region;

    fn faces(entries: &[(&str, &str)]) -> BTreeMap<String, PathBuf> {
        entries
            .iter()
            .map(|(l, p)| (l.to_string(), PathBuf::from(p)))
            .collect()
    }

    #[test]
    fn test_preload_takes_first_embedding() {
        let io = MemoryImageIo::with_images(&["jane.png", "john.png"]);
        let mut model = ScriptedModel::default()
            .with_faces(vec![Region::new(0, 4, 4, 0), Region::new(4, 8, 8, 4)])
            .with_embeddings(vec![Embedding::new(vec![1.0]), Embedding::new(vec![2.0])]);

        let gallery = Gallery::preload(
            &faces(&[("Jane", "jane.png"), ("John", "john.png")]),
            &mut model,
            &io,
        )
        .unwrap();

        assert_eq!(gallery.labels(), &["Jane".to_string(), "John".to_string()]);
        assert_eq!(gallery.embeddings()[0], Embedding::new(vec![1.0]));
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn test_missing_reference_aborts() {
        let io = MemoryImageIo::with_images(&["jane.png"]);
        let mut model = ScriptedModel::default()
            .with_faces(vec![Region::new(0, 4, 4, 0)])
            .with_embeddings(vec![Embedding::new(vec![1.0])]);

        let err = Gallery::preload(
            &faces(&[("Jane", "jane.png"), ("Zed", "missing.png")]),
            &mut model,
            &io,
        )
        .unwrap_err();
        assert!(matches!(err, GalleryError::ReferenceImage { ref label, .. } if label == "Zed"));
    }

    #[test]
    fn test_reference_without_face() {
        let io = MemoryImageIo::with_images(&["empty.png"]);
        let mut model = ScriptedModel::default();
        let err = Gallery::preload(&faces(&[("Nobody", "empty.png")]), &mut model, &io).unwrap_err();
        assert!(matches!(err, GalleryError::NoFace { .. }));
    }

    #[test]
    fn test_malformed_entry() {
        let io = MemoryImageIo::default();
        let mut model = ScriptedModel::default();
        let err = Gallery::preload(&faces(&[(" ", "a.png")]), &mut model, &io).unwrap_err();
        assert!(matches!(err, GalleryError::MalformedEntry { .. }));
    }

    #[test]
    fn test_model_failure() {
        let io = MemoryImageIo::with_images(&["jane.png"]);
        let mut model = ScriptedModel::default().failing();
        let err = Gallery::preload(&faces(&[("Jane", "jane.png")]), &mut model, &io).unwrap_err();
        assert!(matches!(err, GalleryError::Model { .. }));
    }

    #[test]
    fn test_empty_known_faces() {
        let gallery =
            Gallery::preload(&BTreeMap::new(), &mut ScriptedModel::default(), &MemoryImageIo::default())
                .unwrap();
        assert!(gallery.is_empty());
    }
}
