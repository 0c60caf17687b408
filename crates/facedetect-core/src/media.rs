//! Media path validation by file extension.

use std::path::Path;

pub const ACCEPTED_VIDEO_FORMATS: [&str; 3] = ["avi", "mp4", "mov"];
pub const ACCEPTED_IMAGE_FORMATS: [&str; 4] = ["jpeg", "jpg", "gif", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn accepted(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &ACCEPTED_IMAGE_FORMATS,
            MediaKind::Video => &ACCEPTED_VIDEO_FORMATS,
        }
    }
}

/// Check whether `path` carries an accepted extension for `kind` (case-insensitive).
pub fn is_valid_media(kind: MediaKind, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    kind.accepted().contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert!(is_valid_media(MediaKind::Image, Path::new("people.jpg")));
        assert!(is_valid_media(MediaKind::Image, Path::new("dir/PEOPLE.JPEG")));
        assert!(is_valid_media(MediaKind::Image, Path::new("a.Png")));
        assert!(!is_valid_media(MediaKind::Image, Path::new("clip.mp4")));
        assert!(!is_valid_media(MediaKind::Image, Path::new("photo.bmp")));
    }

    #[test]
    fn test_video_extensions() {
        assert!(is_valid_media(MediaKind::Video, Path::new("clip.MOV")));
        assert!(is_valid_media(MediaKind::Video, Path::new("/tmp/clip.avi")));
        assert!(!is_valid_media(MediaKind::Video, Path::new("clip.mkv")));
    }

    #[test]
    fn test_missing_extension() {
        assert!(!is_valid_media(MediaKind::Image, Path::new("")));
        assert!(!is_valid_media(MediaKind::Video, Path::new("/dev/video0")));
        assert!(!is_valid_media(MediaKind::Image, Path::new(".png")));
    }
}
