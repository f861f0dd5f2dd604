use bytes::BytesMut;
use sync_logging::sync_warn;

use reelsync_core::{parse_event, StreamEvent};

/// Marker every event frame carries; anything else on a line is noise.
const FRAME_MARKER: &str = "data:";

/// Incremental decoder over the chunked job response.
///
/// Chunks split lines at arbitrary byte offsets; only a newline-terminated
/// line is decoded, and the unterminated tail is kept for the next chunk.
/// No frame is parsed twice and none is lost at a chunk boundary.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buf.iter().position(|byte| *byte == b'\n') {
            let line = self.buf.split_to(newline + 1);
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line the transport ended without terminating.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buf.is_empty() {
            return None;
        }
        let line = self.buf.split();
        decode_line(&line)
    }
}

/// Decode one complete line. Blank lines are keep-alive padding; a malformed
/// frame is logged and skipped so a single corrupt line never kills the job.
fn decode_line(raw: &[u8]) -> Option<StreamEvent> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(err) => {
            sync_warn!("Skipping non-utf8 stream line: {err}");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    let Some(payload) = text.strip_prefix(FRAME_MARKER) else {
        sync_warn!("Skipping unframed stream line ({} bytes)", text.len());
        return None;
    };
    match parse_event(payload.trim()) {
        Ok(event) => Some(event),
        Err(err) => {
            sync_warn!("Skipping malformed event frame: {err}");
            None
        }
    }
}
