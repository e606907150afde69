use std::time::Duration;

use aperture_match_common::frame::{CameraFrame, Role};
use aperture_match_common::intensity::roi_mean_intensity;
use aperture_match_common::roi::{Roi, RoiError};
use aperture_match_source::{FrameSource, SourceError};
use tracing::{debug, info, warn};

use crate::display::DisplayError;
use crate::layout::camera_label;

/// Warn once after this many consecutive cycles without a fresh pair.
const STARVATION_WARN_CYCLES: u64 = 100;

/// Loop tuning derived from the config in `main`.
pub struct CompareSettings {
    pub roi_fraction: f64,
    pub poll_timeout: Duration,
}

/// One camera's frame for the current cycle, with everything the
/// presenter needs to draw it.
pub struct AnnotatedFrame {
    pub frame: CameraFrame,
    pub roi: Roi,
    pub intensity: f64,
    pub label: String,
}

/// Output side of the loop. The real implementation is an OpenCV window;
/// tests substitute a recorder.
pub trait Presenter {
    /// Show the side-by-side composite for this cycle. Reference is
    /// always the left image.
    fn present(
        &mut self,
        reference: &AnnotatedFrame,
        target: &AnnotatedFrame,
    ) -> Result<(), DisplayError>;

    /// Bounded wait for the operator quit key. Returns `true` to stop.
    fn poll_quit(&mut self, timeout: Duration) -> Result<bool, DisplayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("{role} camera failed: {source}")]
    Source {
        role: Role,
        #[source]
        source: SourceError,
    },
    #[error("{role} camera produced an unusable frame: {source}")]
    Roi {
        role: Role,
        #[source]
        source: RoiError,
    },
    #[error("display failed: {0}")]
    Display(#[from] DisplayError),
}

/// Drive the compare-and-display cycle until the operator quits or a
/// stream dies. Both sources are released on every exit path.
pub fn run_compare_loop(
    reference: &mut dyn FrameSource,
    target: &mut dyn FrameSource,
    presenter: &mut dyn Presenter,
    settings: &CompareSettings,
) -> Result<(), CompareError> {
    let result = drive(reference, target, presenter, settings);
    reference.close();
    target.close();
    result
}

fn drive(
    reference: &mut dyn FrameSource,
    target: &mut dyn FrameSource,
    presenter: &mut dyn Presenter,
    settings: &CompareSettings,
) -> Result<(), CompareError> {
    let mut cycles: u64 = 0;
    let mut rendered: u64 = 0;
    let mut skip_streak: u64 = 0;

    loop {
        cycles += 1;
        let reference_pull = poll(reference)?;
        let target_pull = poll(target)?;

        match (reference_pull, target_pull) {
            // Only ever composite two frames pulled in the same cycle.
            (Some(reference_frame), Some(target_frame)) => {
                let left = annotate(reference_frame, reference, settings.roi_fraction)?;
                let right = annotate(target_frame, target, settings.roi_fraction)?;
                debug!(
                    cycle = cycles,
                    reference_intensity = left.intensity,
                    target_intensity = right.intensity,
                    "rendering comparison"
                );
                presenter.present(&left, &right)?;
                rendered += 1;
                skip_streak = 0;
            }
            // One side had nothing fresh: skip the render, keep the
            // previous composite on screen, try again next cycle.
            (reference_pull, target_pull) => {
                skip_streak += 1;
                if skip_streak == STARVATION_WARN_CYCLES {
                    warn!(
                        reference_waiting = reference_pull.is_none(),
                        target_waiting = target_pull.is_none(),
                        cycles = skip_streak,
                        "no fresh frame pair; still polling"
                    );
                }
            }
        }

        if presenter.poll_quit(settings.poll_timeout)? {
            info!(cycles, rendered, "operator requested exit");
            return Ok(());
        }
    }
}

fn poll(source: &mut dyn FrameSource) -> Result<Option<CameraFrame>, CompareError> {
    let role = source.role();
    source
        .poll_frame()
        .map_err(|e| CompareError::Source { role, source: e })
}

fn annotate(
    frame: CameraFrame,
    source: &dyn FrameSource,
    roi_fraction: f64,
) -> Result<AnnotatedFrame, CompareError> {
    let role = source.role();
    let roi = Roi::centered(frame.width(), frame.height(), roi_fraction)
        .map_err(|e| CompareError::Roi { role, source: e })?;
    let intensity = roi_mean_intensity(&frame.image, &roi);
    Ok(AnnotatedFrame {
        roi,
        intensity,
        label: camera_label(role, source.name()),
        frame,
    })
}
