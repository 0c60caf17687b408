//! Nearest-neighbour identity matching against the known-face gallery.

use crate::gallery::Gallery;
use crate::record::Label;
use crate::types::Embedding;

/// Conventional Euclidean tolerance for a positive match.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Result of matching one probe embedding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the nearest gallery entry (`f32::INFINITY` for an empty gallery).
    pub distance: f32,
    /// Index of the nearest gallery entry.
    pub index: Option<usize>,
}

/// Strategy for comparing a probe embedding against a gallery.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &Gallery) -> MatchResult;
}

/// Match booleans for every gallery entry: distance <= `tolerance`.
pub fn compare_faces(gallery: &[Embedding], probe: &Embedding, tolerance: f32) -> Vec<bool> {
    face_distances(gallery, probe)
        .into_iter()
        .map(|d| d <= tolerance)
        .collect()
}

/// Euclidean distance from `probe` to every gallery embedding.
pub fn face_distances(gallery: &[Embedding], probe: &Embedding) -> Vec<f32> {
    gallery.iter().map(|e| e.euclidean_distance(probe)).collect()
}

/// Euclidean matcher: nearest entry wins if it lies within `tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub tolerance: f32,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &Gallery) -> MatchResult {
        let matches = compare_faces(gallery.embeddings(), probe, self.tolerance);
        let distances = face_distances(gallery.embeddings(), probe);

        // Ties resolve to the first occurrence.
        let mut best: Option<(usize, f32)> = None;
        for (i, &d) in distances.iter().enumerate() {
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }

        match best {
            Some((idx, distance)) => MatchResult {
                matched: matches[idx],
                distance,
                index: Some(idx),
            },
            None => MatchResult {
                matched: false,
                distance: f32::INFINITY,
                index: None,
            },
        }
    }
}

/// Replacement labels for a frame's embeddings, in the same order.
pub fn recognize(embeddings: &[Embedding], gallery: &Gallery, matcher: &dyn Matcher) -> Vec<Label> {
    embeddings
        .iter()
        .map(|probe| {
            let result = matcher.compare(probe, gallery);
            match result.index {
                Some(idx) if result.matched => Label::Known(gallery.labels()[idx].clone()),
                _ => Label::Unknown,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    /// Gallery whose entries sit at the given distances from the origin probe.
    fn gallery_at(distances: &[f32]) -> Gallery {
        let entries = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| (format!("person{i}"), emb(&[d, 0.0])))
            .collect();
        Gallery::from_entries(entries)
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let gallery = gallery_at(&[0.9, 0.3, 0.5]);
        let result = EuclideanMatcher::default().compare(&emb(&[0.0, 0.0]), &gallery);
        assert_eq!(result.index, Some(1));
        assert!(result.matched);
        assert!((result.distance - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_all_beyond_tolerance_is_unknown() {
        let gallery = gallery_at(&[0.9, 0.7, 0.65]);
        let probe = emb(&[0.0, 0.0]);
        let result = EuclideanMatcher::default().compare(&probe, &gallery);
        assert_eq!(result.index, Some(2));
        assert!(!result.matched);
        let labels = recognize(&[probe], &gallery, &EuclideanMatcher::default());
        assert_eq!(labels, vec![Label::Unknown]);
    }

    #[test]
    fn test_tie_picks_first() {
        let gallery = gallery_at(&[0.4, 0.2, 0.2]);
        let result = EuclideanMatcher::default().compare(&emb(&[0.0, 0.0]), &gallery);
        assert_eq!(result.index, Some(1));
    }

    #[test]
    fn test_empty_gallery_short_circuits() {
        let gallery = Gallery::default();
        let result = EuclideanMatcher::default().compare(&emb(&[1.0]), &gallery);
        assert!(!result.matched);
        assert_eq!(result.index, None);
        let labels = recognize(&[emb(&[1.0]), emb(&[2.0])], &gallery, &EuclideanMatcher::default());
        assert_eq!(labels, vec![Label::Unknown, Label::Unknown]);
    }

    #[test]
    fn test_recognize_labels_in_order() {
        let gallery = gallery_at(&[0.0, 5.0]);
        let probes = [emb(&[5.1, 0.0]), emb(&[20.0, 0.0]), emb(&[0.1, 0.0])];
        let labels = recognize(&probes, &gallery, &EuclideanMatcher::default());
        assert_eq!(
            labels,
            vec![
                Label::Known("person1".into()),
                Label::Unknown,
                Label::Known("person0".into()),
            ]
        );
    }

    #[test]
    fn test_recognize_is_idempotent() {
        let gallery = gallery_at(&[0.9, 0.3, 0.5]);
        let probes = [emb(&[0.25, 0.0]), emb(&[3.0, 3.0])];
        let matcher = EuclideanMatcher::default();
        assert_eq!(
            recognize(&probes, &gallery, &matcher),
            recognize(&probes, &gallery, &matcher)
        );
    }

    #[test]
    fn test_compare_faces_boundary() {
        let gallery = [emb(&[0.5, 0.0]), emb(&[0.75, 0.0])];
        assert_eq!(compare_faces(&gallery, &emb(&[0.0, 0.0]), 0.5), vec![true, false]);
    }
}
