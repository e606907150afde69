use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use image::{ImageReader, RgbImage};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aperture_match_common::config::WatchtowerConfig;
use aperture_match_common::frame::{CameraFrame, Role};

use crate::mjpeg::{boundary_from_content_type, MjpegParser, DEFAULT_BOUNDARY};
use crate::{FrameSource, SourceError, SourceSlot};

/// MJPEG stream endpoint for a camera serial on the watchtower server.
pub fn build_stream_url(base: &str, serial: &str, fps: f64) -> String {
    format!("{}/cameras/{serial}/stream?fps={fps}", base.trim_end_matches('/'))
}

pub fn build_client(config: &WatchtowerConfig) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(SourceError::Connect)
}

/// Frame Source Adapter over one watchtower camera stream.
///
/// A background reader task owns the HTTP stream and keeps only the most
/// recent decoded frame in a watch slot; `poll_frame` never waits on the
/// network, so one stalled camera cannot freeze the comparison loop.
pub struct CameraSource {
    role: Role,
    serial: String,
    slot: watch::Receiver<SourceSlot>,
    last_seq: u64,
    reader: Option<JoinHandle<()>>,
}

impl CameraSource {
    pub fn open(
        runtime: &Handle,
        role: Role,
        serial: &str,
        url: String,
        client: reqwest::Client,
        max_frame_bytes: usize,
    ) -> Self {
        let (tx, rx) = watch::channel(SourceSlot::Waiting);
        let reader = runtime.spawn(run_reader(role, url, client, tx, max_frame_bytes));
        Self {
            role,
            serial: serial.to_string(),
            slot: rx,
            last_seq: 0,
            reader: Some(reader),
        }
    }
}

impl FrameSource for CameraSource {
    fn role(&self) -> Role {
        self.role
    }

    fn name(&self) -> &str {
        &self.serial
    }

    fn poll_frame(&mut self) -> Result<Option<CameraFrame>, SourceError> {
        let last_seq = self.last_seq;
        let fresh = {
            let slot = self.slot.borrow_and_update();
            match &*slot {
                SourceSlot::Waiting => None,
                SourceSlot::Live(frame) if frame.seq > last_seq => Some(frame.clone()),
                SourceSlot::Live(_) => None,
                SourceSlot::Failed { message } => {
                    return Err(SourceError::StreamFailed(message.clone()))
                }
            }
        };
        if let Some(frame) = &fresh {
            self.last_seq = frame.seq;
        }
        Ok(fresh)
    }

    fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
            debug!(role = %self.role, serial = self.serial, "camera source released");
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_reader(
    role: Role,
    url: String,
    client: reqwest::Client,
    tx: watch::Sender<SourceSlot>,
    max_frame_bytes: usize,
) {
    // A stream that ends cleanly is still a dead camera as far as the
    // operator is concerned; no reconnect, surface it and stop.
    let message = match stream_frames(role, &url, &client, &tx, max_frame_bytes).await {
        Ok(()) => "stream ended by server".to_string(),
        Err(e) => e.to_string(),
    };
    warn!(%role, message, "camera stream stopped");
    let _ = tx.send(SourceSlot::Failed { message });
}

async fn stream_frames(
    role: Role,
    url: &str,
    client: &reqwest::Client,
    tx: &watch::Sender<SourceSlot>,
    max_frame_bytes: usize,
) -> Result<(), SourceError> {
    let response = client.get(url).send().await.map_err(SourceError::Connect)?;
    if !response.status().is_success() {
        return Err(SourceError::Status(response.status().as_u16()));
    }

    let boundary = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(boundary_from_content_type)
        .unwrap_or_else(|| DEFAULT_BOUNDARY.to_string());
    info!(%role, status = %response.status(), boundary, "connected to camera stream");

    let parser = MjpegParser::new(&boundary, max_frame_bytes);
    let chunks = response.bytes_stream().map(|r| r.map_err(SourceError::Stream));
    pump_frames(role, chunks, parser, tx).await
}

/// Feed transport chunks through the multipart parser and publish each
/// decoded frame into the latest-frame slot.
async fn pump_frames<S>(
    role: Role,
    mut chunks: S,
    mut parser: MjpegParser,
    tx: &watch::Sender<SourceSlot>,
) -> Result<(), SourceError>
where
    S: Stream<Item = Result<Bytes, SourceError>> + Unpin,
{
    let mut seq: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        for payload in parser.push(&chunk)? {
            let image = decode_jpeg(&payload)?;
            seq += 1;
            debug!(
                %role,
                seq,
                bytes = payload.len(),
                width = image.width(),
                height = image.height(),
                "decoded frame"
            );
            let frame = CameraFrame::new(image, Utc::now().timestamp_millis(), seq);
            tx.send_replace(SourceSlot::Live(frame));
        }
    }
    Ok(())
}

fn decode_jpeg(data: &[u8]) -> Result<RgbImage, SourceError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SourceError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}
