//! Microphone abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Container format produced by an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Asks an acquired device to stop.
///
/// After `stop` the device delivers whatever it still has buffered and then
/// closes the chunk channel; the closed channel is the completion signal.
/// Dropping the control without calling `stop` also releases the device.
pub trait RecorderControl: Send {
    fn stop(&mut self);
}

/// A live acquisition: encoded chunks in arrival order plus its control.
pub struct RecordingSession {
    pub chunks: mpsc::UnboundedReceiver<Bytes>,
    pub control: Box<dyn RecorderControl>,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession").finish_non_exhaustive()
    }
}

/// An exclusive audio capture device.
#[async_trait]
pub trait AudioInput: Send + Sync {
    fn format(&self) -> AudioFormat;

    /// Acquire the device and start delivering chunks.
    async fn open(&self) -> Result<RecordingSession, CaptureError>;

    /// Turn the concatenated chunks into the final artifact bytes.
    fn finish(&self, data: Vec<u8>) -> Vec<u8> {
        data
    }
}
