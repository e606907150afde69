use image::RgbImage;

/// Which side of the comparison a camera is on. The reference camera is
/// always composited on the left so its position never moves on the
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reference,
    Target,
}

impl Role {
    /// Overlay/label prefix for this camera.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Reference => "Reference",
            Role::Target => "Target",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Reference => write!(f, "reference"),
            Role::Target => write!(f, "target"),
        }
    }
}

/// A decoded camera frame with capture metadata.
///
/// Owned transiently by the loop cycle that pulled it; nothing retains
/// frames across cycles.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub image: RgbImage,
    /// Unix millis at decode time.
    pub captured_at_ms: i64,
    /// Per-source sequence number, starting at 1.
    pub seq: u64,
}

impl CameraFrame {
    pub fn new(image: RgbImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image,
            captured_at_ms,
            seq,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn role_labels() {
        assert_eq!(Role::Reference.label(), "Reference");
        assert_eq!(Role::Target.label(), "Target");
        assert_eq!(Role::Reference.to_string(), "reference");
        assert_eq!(Role::Target.to_string(), "target");
    }

    #[test]
    fn frame_dimensions() {
        let image = RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]));
        let frame = CameraFrame::new(image, 1_708_300_000_000, 7);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.seq, 7);
    }
}
