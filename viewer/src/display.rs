use std::time::Duration;

use opencv::core::{self, Mat, Point, Rect, Scalar, Size};
use opencv::prelude::*;
use opencv::{highgui, imgproc};
use tracing::debug;

use aperture_match_common::frame::CameraFrame;

use crate::compare::{AnnotatedFrame, Presenter};
use crate::layout::{composite_layout, intensity_label};

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
    #[error("display window is closed")]
    WindowClosed,
}

// BGR overlay colors.
fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}
fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

/// The on-screen composite window. Created once at INIT, destroyed once
/// at SHUTDOWN (explicitly or on drop).
pub struct DisplayWindow {
    title: String,
    quit_key: char,
    open: bool,
}

impl DisplayWindow {
    pub fn open(title: &str, quit_key: char) -> Result<Self, DisplayError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        debug!(title, "display window opened");
        Ok(Self {
            title: title.to_string(),
            quit_key,
            open: true,
        })
    }

    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            let _ = highgui::destroy_window(&self.title);
            debug!(title = self.title, "display window closed");
        }
    }
}

impl Drop for DisplayWindow {
    fn drop(&mut self) {
        self.close();
    }
}

impl Presenter for DisplayWindow {
    fn present(
        &mut self,
        reference: &AnnotatedFrame,
        target: &AnnotatedFrame,
    ) -> Result<(), DisplayError> {
        if !self.open {
            return Err(DisplayError::WindowClosed);
        }

        let mut left = to_bgr_mat(&reference.frame)?;
        let mut right = to_bgr_mat(&target.frame)?;
        draw_annotations(&mut left, reference)?;
        draw_annotations(&mut right, target)?;

        // Annotate at native resolution, then normalize heights so the
        // two sides concatenate cleanly.
        let layout = composite_layout(
            (reference.frame.width(), reference.frame.height()),
            (target.frame.width(), target.frame.height()),
        );
        let left = resize_to(&left, layout.left_width, layout.height)?;
        let right = resize_to(&right, layout.right_width, layout.height)?;

        let mut composite = Mat::default();
        core::hconcat2(&left, &right, &mut composite)?;
        highgui::imshow(&self.title, &composite)?;
        Ok(())
    }

    fn poll_quit(&mut self, timeout: Duration) -> Result<bool, DisplayError> {
        let delay = timeout.as_millis().max(1) as i32;
        let key = highgui::wait_key(delay)?;
        Ok(key >= 0 && (key & 0xFF) as u8 as char == self.quit_key)
    }
}

/// Copy a decoded RGB frame into a BGR `Mat` for drawing and display.
fn to_bgr_mat(frame: &CameraFrame) -> Result<Mat, DisplayError> {
    let rgb = Mat::from_slice(frame.image.as_raw())?;
    let rgb = rgb.reshape(3, frame.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn draw_annotations(mat: &mut Mat, view: &AnnotatedFrame) -> Result<(), DisplayError> {
    let height = view.frame.height() as i32;

    // Camera label at the top
    imgproc::put_text(
        mat,
        &view.label,
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.8,
        white(),
        2,
        imgproc::LINE_AA,
        false,
    )?;

    // Intensity readout at the bottom
    imgproc::put_text(
        mat,
        &intensity_label(view.intensity),
        Point::new(10, height - 20),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        green(),
        2,
        imgproc::LINE_AA,
        false,
    )?;

    // ROI outline, so the operator can see what is being measured
    let rect = Rect::new(
        view.roi.x as i32,
        view.roi.y as i32,
        view.roi.width as i32,
        view.roi.height as i32,
    );
    imgproc::rectangle(mat, rect, green(), 2, imgproc::LINE_8, 0)?;
    Ok(())
}

fn resize_to(mat: &Mat, width: u32, height: u32) -> Result<Mat, DisplayError> {
    if mat.cols() == width as i32 && mat.rows() == height as i32 {
        return Ok(mat.clone());
    }
    let mut out = Mat::default();
    imgproc::resize(
        mat,
        &mut out,
        Size::new(width as i32, height as i32),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )?;
    Ok(out)
}
