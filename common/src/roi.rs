/// A rectangular region of interest inside a frame.
///
/// Always constructed through [`Roi::centered`], which guarantees the
/// region lies fully within the frame it was sized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Centered square ROI whose side is `fraction` of the smaller frame
    /// dimension, rounded, clamped to [1, min(w, h)].
    ///
    /// Each frame gets its ROI from its own dimensions, so two cameras
    /// with different resolutions are still measured over the same
    /// relative region.
    pub fn centered(frame_width: u32, frame_height: u32, fraction: f64) -> Result<Self, RoiError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(RoiError::InvalidFraction(fraction));
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(RoiError::EmptyFrame {
                width: frame_width,
                height: frame_height,
            });
        }

        let min_dim = frame_width.min(frame_height);
        let side = ((fraction * min_dim as f64).round() as u32).clamp(1, min_dim);

        Ok(Self {
            x: (frame_width - side) / 2,
            y: (frame_height - side) / 2,
            width: side,
            height: side,
        })
    }

    /// True if the region lies fully inside a `frame_width` x `frame_height`
    /// frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= frame_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= frame_height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoiError {
    #[error("roi fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
}
