//! Voice-note capture.
//!
//! [`CapturePipeline`] drives an [`AudioInput`] through an explicit
//! `Idle -> Recording -> Finalizing -> Idle` cycle and hands the finished
//! recording to an [`ArtifactSink`].

pub mod cpal_input;
pub mod device;
pub mod pipeline;

mod error;

pub use cpal_input::{AudioConfig, CpalInput};
pub use device::{AudioFormat, AudioInput, RecorderControl, RecordingSession};
pub use error::CaptureError;
pub use pipeline::{ArtifactSink, AudioArtifact, CapturePhase, CapturePipeline};
