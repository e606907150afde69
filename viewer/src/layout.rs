use aperture_match_common::frame::Role;

/// Target sizes for the side-by-side composite. The two cameras may run
/// at different resolutions; both sides are normalized to the smaller
/// height, preserving each side's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeLayout {
    pub height: u32,
    pub left_width: u32,
    pub right_width: u32,
}

impl CompositeLayout {
    pub fn total_width(&self) -> u32 {
        self.left_width + self.right_width
    }
}

/// Compute the composite geometry for a left frame of `left` (w, h) and a
/// right frame of `right` (w, h).
pub fn composite_layout(left: (u32, u32), right: (u32, u32)) -> CompositeLayout {
    let height = left.1.min(right.1);
    CompositeLayout {
        height,
        left_width: scaled_width(left, height),
        right_width: scaled_width(right, height),
    }
}

fn scaled_width((width, height): (u32, u32), target_height: u32) -> u32 {
    if height == target_height {
        width
    } else {
        ((width as f64 * target_height as f64 / height as f64).round() as u32).max(1)
    }
}

/// Top-of-frame label: which camera this is.
pub fn camera_label(role: Role, serial: &str) -> String {
    format!("{}: {serial}", role.label())
}

/// Bottom-of-frame intensity readout.
pub fn intensity_label(intensity: f64) -> String {
    format!("Intensity: {intensity:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_heights_pass_through() {
        let layout = composite_layout((640, 480), (800, 480));
        assert_eq!(
            layout,
            CompositeLayout { height: 480, left_width: 640, right_width: 800 }
        );
        assert_eq!(layout.total_width(), 1440);
    }

    #[test]
    fn taller_side_scales_down_preserving_aspect() {
        let layout = composite_layout((1280, 720), (640, 480));
        assert_eq!(layout.height, 480);
        assert_eq!(layout.right_width, 640);
        assert_eq!(layout.left_width, 853); // 1280 * 480/720, rounded

        let original_aspect = 1280.0 / 720.0;
        let scaled_aspect = layout.left_width as f64 / layout.height as f64;
        assert!((original_aspect - scaled_aspect).abs() < 0.01);
    }

    #[test]
    fn composite_width_is_sum_of_sides() {
        let layout = composite_layout((1920, 1080), (1280, 720));
        assert_eq!(layout.total_width(), layout.left_width + layout.right_width);
        assert_eq!(layout.height, 720);
        assert_eq!(layout.left_width, 1280); // 1920 * 720/1080
    }

    #[test]
    fn labels() {
        assert_eq!(camera_label(Role::Reference, "e3v8100"), "Reference: e3v8100");
        assert_eq!(camera_label(Role::Target, "e3v8101"), "Target: e3v8101");
        assert_eq!(intensity_label(180.0), "Intensity: 180.0");
        assert_eq!(intensity_label(149.96), "Intensity: 150.0");
    }
}
