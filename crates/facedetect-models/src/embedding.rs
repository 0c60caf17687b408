//! Normalized-thumbnail face embeddings.
//!
//! A face crop is reduced to a small grayscale thumbnail, mean-centred and
//! L2-normalized. Distances between two such vectors lie in `[0, 2]`.

use facedetect_core::{Embedding, Region};
use image::imageops::{self, FilterType};
use image::RgbImage;

pub const THUMBNAIL_SIZE: u32 = 32;

/// Embedding of the part of `image` covered by `region`, or `None` if the
/// region lies entirely outside the image.
pub fn thumbnail_embedding(image: &RgbImage, region: &Region) -> Option<Embedding> {
    let r = region.clipped(image.width(), image.height())?;
    let crop = imageops::crop_imm(image, r.left as u32, r.top as u32, r.width(), r.height()).to_image();
    let gray = imageops::grayscale(&crop);
    let thumb = imageops::resize(&gray, THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);

    let mut values: Vec<f32> = thumb.into_raw().into_iter().map(|b| b as f32 / 255.0).collect();
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter_mut().for_each(|v| *v -= mean);

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    Some(Embedding::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let emb = thumbnail_embedding(&gradient(64, 64), &Region::new(0, 64, 64, 0)).unwrap();
        assert_eq!(emb.values.len(), (THUMBNAIL_SIZE * THUMBNAIL_SIZE) as usize);
        let norm: f32 = emb.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_same_crop_same_embedding() {
        let image = gradient(80, 80);
        let region = Region::new(10, 60, 60, 10);
        let a = thumbnail_embedding(&image, &region).unwrap();
        let b = thumbnail_embedding(&image, &region).unwrap();
        assert!(a.euclidean_distance(&b) < 1e-6);
    }

    #[test]
    fn test_brightness_shift_is_ignored() {
        let image = gradient(64, 64);
        let brighter = RgbImage::from_fn(64, 64, |x, y| {
            let p = image.get_pixel(x, y).0[0].saturating_add(20);
            Rgb([p, p, p])
        });
        // No wrap-around or saturation inside this corner.
        let region = Region::new(0, 16, 16, 0);
        let a = thumbnail_embedding(&image, &region).unwrap();
        let b = thumbnail_embedding(&brighter, &region).unwrap();
        assert!(a.euclidean_distance(&b) < 0.1);
    }

    #[test]
    fn test_flat_crop_is_zero_vector() {
        let emb = thumbnail_embedding(&RgbImage::new(16, 16), &Region::new(0, 16, 16, 0)).unwrap();
        assert!(emb.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_region_outside_image() {
        assert!(thumbnail_embedding(&gradient(16, 16), &Region::new(20, 40, 40, 20)).is_none());
    }
}
