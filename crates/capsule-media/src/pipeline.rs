//! The recording state machine.
//!
//! ```text
//! Idle --start--> Recording --stop--> Finalizing --(device done, upload)--> Idle
//! ```
//!
//! The user's stop and the device's completion are separate events: `stop`
//! only asks the device to stop and moves to `Finalizing`.  Chunks that
//! arrive after that still belong to the recording.  When the chunk channel
//! closes, the chunks are joined, handed to the sink, and the pipeline
//! returns to `Idle` whatever the sink's outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::device::{AudioInput, RecorderControl};
use crate::error::CaptureError;

/// A finished recording ready for upload.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub bytes: Bytes,
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub recorded_at: DateTime<Utc>,
}

/// Receives finished recordings.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn persist(&self, artifact: AudioArtifact) -> anyhow::Result<()>;
}

/// Observable phase of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Recording,
    Finalizing,
}

enum CaptureState {
    Idle,
    Recording {
        session: u64,
        started_at: DateTime<Utc>,
        chunks: Vec<Bytes>,
        control: Box<dyn RecorderControl>,
    },
    Finalizing {
        session: u64,
        started_at: DateTime<Utc>,
        chunks: Vec<Bytes>,
    },
}

struct Shared {
    input: Arc<dyn AudioInput>,
    sink: Arc<dyn ArtifactSink>,
    state: Mutex<CaptureState>,
    phase: watch::Sender<CapturePhase>,
    next_session: AtomicU64,
}

/// Cloneable handle to one capture pipeline.  Only one recording can be in
/// flight at a time.
#[derive(Clone)]
pub struct CapturePipeline {
    shared: Arc<Shared>,
}

impl CapturePipeline {
    pub fn new(input: Arc<dyn AudioInput>, sink: Arc<dyn ArtifactSink>) -> Self {
        let (phase, _) = watch::channel(CapturePhase::Idle);
        Self {
            shared: Arc::new(Shared {
                input,
                sink,
                state: Mutex::new(CaptureState::Idle),
                phase,
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        *self.shared.phase.borrow()
    }

    pub fn is_recording(&self) -> bool {
        self.phase() == CapturePhase::Recording
    }

    pub fn subscribe(&self) -> watch::Receiver<CapturePhase> {
        self.shared.phase.subscribe()
    }

    /// Acquire the microphone and begin a new recording.
    ///
    /// Fails with [`CaptureError::Busy`] unless idle; the device is not
    /// touched in that case.  If acquisition fails the pipeline stays idle
    /// and the device error is returned.
    pub async fn start(&self) -> Result<(), CaptureError> {
        // Held across open() so two starts cannot both acquire the device.
        let mut state = self.shared.state.lock().await;
        if !matches!(*state, CaptureState::Idle) {
            warn!("Start requested while a recording is in progress");
            return Err(CaptureError::Busy);
        }

        let recording = match self.shared.input.open().await {
            Ok(recording) => recording,
            Err(e) => {
                error!(error = %e, "Could not acquire microphone");
                return Err(e);
            }
        };

        let session = self.shared.next_session.fetch_add(1, Ordering::SeqCst);
        *state = CaptureState::Recording {
            session,
            started_at: Utc::now(),
            chunks: Vec::new(),
            control: recording.control,
        };
        // Published under the state lock so phase and state never disagree.
        self.shared.phase.send_replace(CapturePhase::Recording);
        drop(state);
        info!(session, "Recording started");

        tokio::spawn(collect(self.shared.clone(), session, recording.chunks));
        Ok(())
    }

    /// Ask the device to stop.  Returns `false` (and does nothing) unless
    /// a recording is in progress.
    pub async fn stop(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        match std::mem::replace(&mut *state, CaptureState::Idle) {
            CaptureState::Recording {
                session,
                started_at,
                chunks,
                mut control,
            } => {
                *state = CaptureState::Finalizing {
                    session,
                    started_at,
                    chunks,
                };
                self.shared.phase.send_replace(CapturePhase::Finalizing);
                control.stop();
                drop(state);
                debug!(session, "Stop requested, waiting for device");
                true
            }
            other => {
                *state = other;
                debug!("Stop requested while not recording");
                false
            }
        }
    }

    /// Resolve once the pipeline is idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|phase| *phase == CapturePhase::Idle).await;
    }
}

async fn collect(shared: Arc<Shared>, session: u64, mut chunks: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(chunk) = chunks.recv().await {
        let mut state = shared.state.lock().await;
        match &mut *state {
            CaptureState::Recording {
                session: s,
                chunks: buffer,
                ..
            }
            | CaptureState::Finalizing {
                session: s,
                chunks: buffer,
                ..
            } if *s == session => buffer.push(chunk),
            _ => {}
        }
    }

    finalize(&shared, session).await;
}

async fn finalize(shared: &Shared, session: u64) {
    let taken = {
        let mut state = shared.state.lock().await;
        match std::mem::replace(&mut *state, CaptureState::Idle) {
            CaptureState::Recording {
                session: s,
                started_at,
                chunks,
                ..
            } if s == session => {
                warn!(session, "Audio device ended the recording on its own");
                *state = CaptureState::Finalizing {
                    session,
                    started_at,
                    chunks: Vec::new(),
                };
                shared.phase.send_replace(CapturePhase::Finalizing);
                Some((started_at, chunks))
            }
            CaptureState::Finalizing {
                session: s,
                started_at,
                chunks,
            } if s == session => {
                *state = CaptureState::Finalizing {
                    session,
                    started_at,
                    chunks: Vec::new(),
                };
                Some((started_at, chunks))
            }
            other => {
                *state = other;
                None
            }
        }
    };

    let Some((recorded_at, chunks)) = taken else {
        return;
    };

    let total: usize = chunks.iter().map(Bytes::len).sum();
    if total == 0 {
        warn!(session, "Recording produced no audio, discarding");
    } else {
        let mut data = Vec::with_capacity(total);
        for chunk in &chunks {
            data.extend_from_slice(chunk);
        }
        let format = shared.input.format();
        let artifact = AudioArtifact {
            bytes: Bytes::from(shared.input.finish(data)),
            mime_type: format.mime_type,
            extension: format.extension,
            recorded_at,
        };

        match shared.sink.persist(artifact).await {
            Ok(()) => info!(session, size = total, "Recording saved"),
            Err(e) => warn!(session, error = %e, "Saving recording failed, discarding it"),
        }
    }

    let mut state = shared.state.lock().await;
    if matches!(*state, CaptureState::Finalizing { session: s, .. } if s == session) {
        *state = CaptureState::Idle;
        shared.phase.send_replace(CapturePhase::Idle);
    }
}
