//! Default-microphone input built on cpal.
//!
//! cpal streams are not `Send`, so each recording owns a dedicated thread
//! that builds the stream, keeps it alive until stopped, and drops it on
//! the same thread.  Chunks carry bare 16-bit little-endian PCM; the WAV
//! header is only added in [`AudioInput::finish`], so a recording with no
//! samples stays empty.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::device::{AudioFormat, AudioInput, RecorderControl, RecordingSession};
use crate::error::CaptureError;

const WAV_HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CpalInput {
    config: AudioConfig,
}

impl CpalInput {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

struct CpalControl {
    stop: Option<std::sync::mpsc::Sender<()>>,
}

impl RecorderControl for CpalControl {
    fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
    }
}

#[async_trait]
impl AudioInput for CpalInput {
    fn format(&self) -> AudioFormat {
        AudioFormat {
            mime_type: "audio/wav",
            extension: "wav",
        }
    }

    async fn open(&self) -> Result<RecordingSession, CaptureError> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let config = self.config.clone();

        std::thread::Builder::new()
            .name("capsule-mic".into())
            .spawn(move || capture_thread(config, chunk_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::DeviceError(e.to_string()))?;

        ready_rx
            .await
            .map_err(|_| CaptureError::DeviceError("capture thread exited early".into()))??;

        Ok(RecordingSession {
            chunks: chunk_rx,
            control: Box::new(CpalControl {
                stop: Some(stop_tx),
            }),
        })
    }

    fn finish(&self, pcm: Vec<u8>) -> Vec<u8> {
        let mut wav = wav_header(self.config.sample_rate, self.config.channels, pcm.len());
        wav.extend_from_slice(&pcm);
        wav
    }
}

fn capture_thread(
    config: AudioConfig,
    chunk_tx: mpsc::UnboundedSender<Bytes>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let stream = match build_stream(&config, chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    // Returns on stop() or when the control is dropped.
    let _ = stop_rx.recv();

    // Dropping the stream drops the callback and with it the last chunk
    // sender, which closes the channel.
    drop(stream);
    debug!("Microphone released");
}

fn build_stream(
    config: &AudioConfig,
    chunk_tx: mpsc::UnboundedSender<Bytes>,
) -> Result<cpal::Stream, CaptureError> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;

    info!(device = ?device.name(), "Using input device");

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mut pcm = Vec::with_capacity(data.len() * 2);
                for sample in data {
                    pcm.extend_from_slice(&sample_to_i16(*sample).to_le_bytes());
                }
                if chunk_tx.send(Bytes::from(pcm)).is_err() {
                    warn!("Recording channel closed, dropping audio");
                }
            },
            move |err| {
                error!("Audio input error: {err}");
            },
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoInputDevice,
            other => CaptureError::StreamError(other.to_string()),
        })?;

    stream
        .play()
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    debug!("Audio capture started");
    Ok(stream)
}

fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// RIFF/WAVE header for `data_len` bytes of PCM.
fn wav_header(sample_rate: u32, channels: u16, data_len: usize) -> Vec<u8> {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = u32::try_from(data_len).unwrap_or(u32::MAX);
    let riff_size = data_size.saturating_add((WAV_HEADER_LEN - 8) as u32);

    let mut header = Vec::with_capacity(WAV_HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&riff_size.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes()); // PCM
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_size.to_le_bytes());
    header
}
