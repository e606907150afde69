use image::{Pixel, RgbImage};

use crate::roi::Roi;

/// Mean 8-bit luma over `roi`.
///
/// Brightness is measured the way an operator expects: convert to
/// grayscale, then average. Stateless — no smoothing across frames, so
/// the number on screen always reflects the live aperture position.
///
/// The caller must pass a ROI produced from this image's dimensions
/// (see [`Roi::centered`]); that keeps indexing in bounds.
pub fn roi_mean_intensity(image: &RgbImage, roi: &Roi) -> f64 {
    debug_assert!(roi.fits_within(image.width(), image.height()));

    let mut sum: u64 = 0;
    for y in roi.y..roi.y + roi.height {
        for x in roi.x..roi.x + roi.width {
            sum += image.get_pixel(x, y).to_luma().0[0] as u64;
        }
    }
    sum as f64 / (roi.width as u64 * roi.height as u64) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn flat_gray_frame_is_exact() {
        let image = flat(100, 80, 180);
        let roi = Roi::centered(100, 80, 0.2).unwrap();
        assert_eq!(roi_mean_intensity(&image, &roi), 180.0);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let image = flat(64, 64, 150);
        let roi = Roi::centered(64, 64, 0.5).unwrap();
        let first = roi_mean_intensity(&image, &roi);
        for _ in 0..10 {
            assert_eq!(roi_mean_intensity(&image, &roi), first);
        }
        assert_eq!(first, 150.0);
    }

    #[test]
    fn only_roi_pixels_contribute() {
        // Bright center region, dark surround. Full-frame mean would be
        // pulled way down; the ROI mean must not be.
        let mut image = flat(100, 100, 0);
        let roi = Roi::centered(100, 100, 0.2).unwrap();
        for y in roi.y..roi.y + roi.height {
            for x in roi.x..roi.x + roi.width {
                image.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        assert_eq!(roi_mean_intensity(&image, &roi), 200.0);
    }

    #[test]
    fn mixed_region_averages() {
        // 2x2 ROI covering the whole frame: two black, two white pixels.
        let mut image = flat(2, 2, 0);
        image.put_pixel(0, 0, Rgb([255, 255, 255]));
        image.put_pixel(1, 1, Rgb([255, 255, 255]));
        let roi = Roi::centered(2, 2, 1.0).unwrap();
        assert_eq!(roi_mean_intensity(&image, &roi), 127.5);
    }
}
