mod mjpeg;
mod source;

pub use mjpeg::{boundary_from_content_type, MjpegParser, DEFAULT_BOUNDARY};
pub use source::{build_client, build_stream_url, CameraSource};

use aperture_match_common::frame::{CameraFrame, Role};

/// Latest-frame slot shared between a reader task and its adapter.
/// The reader overwrites it with every decoded frame; the loop only
/// ever sees the most recent one.
#[derive(Debug, Clone)]
pub enum SourceSlot {
    /// Stream not yet delivering frames.
    Waiting,
    Live(CameraFrame),
    /// The stream is gone. Terminal; the message says why.
    Failed { message: String },
}

/// Uniform "fetch latest frame" interface over one camera stream.
pub trait FrameSource {
    fn role(&self) -> Role;

    /// Camera serial, for overlays and logging.
    fn name(&self) -> &str;

    /// Non-blocking pull. `Ok(Some)` only when a frame newer than the
    /// previous pull is available; `Ok(None)` means nothing fresh this
    /// cycle. An error is terminal for this source.
    fn poll_frame(&mut self) -> Result<Option<CameraFrame>, SourceError>;

    /// Release the underlying stream. Idempotent.
    fn close(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to connect to camera stream: {0}")]
    Connect(reqwest::Error),
    #[error("camera stream returned HTTP status {0}")]
    Status(u16),
    #[error("camera stream transport error: {0}")]
    Stream(reqwest::Error),
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("frame part of {bytes} bytes exceeds the {max} byte limit")]
    FrameTooLarge { bytes: usize, max: usize },
    #[error("camera stream stopped: {0}")]
    StreamFailed(String),
}
