#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use capsule_media::{AudioFormat, AudioInput, CaptureError, RecorderControl, RecordingSession};
use capsule_shared::models::{Bucket, Collection};
use capsule_store::{ContentStore, MemoryStore, Select};
use serde_json::Value;
use tokio::sync::mpsc;

/// In-memory store whose blob uploads take `delay`.
pub struct SlowUploads {
    pub inner: Arc<MemoryStore>,
    pub delay: Duration,
}

#[async_trait]
impl ContentStore for SlowUploads {
    async fn select(&self, query: &Select) -> capsule_store::Result<Vec<Value>> {
        self.inner.select(query).await
    }

    async fn insert(&self, collection: Collection, row: Value) -> capsule_store::Result<()> {
        self.inner.insert(collection, row).await
    }

    async fn upload_blob(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> capsule_store::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upload_blob(bucket, key, bytes, content_type).await
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        self.inner.public_url(bucket, key)
    }
}

/// Microphone stand-in.  Chunks pushed through [`FakeMic::speak`] go to
/// the live recording; stopping closes the channel.
#[derive(Default)]
pub struct FakeMic {
    live: Arc<Mutex<Option<mpsc::UnboundedSender<Bytes>>>>,
}

impl FakeMic {
    pub fn speak(&self, chunk: &'static [u8]) {
        if let Some(tx) = self.live.lock().unwrap().as_ref() {
            let _ = tx.send(Bytes::from_static(chunk));
        }
    }
}

struct FakeControl {
    live: Arc<Mutex<Option<mpsc::UnboundedSender<Bytes>>>>,
}

impl RecorderControl for FakeControl {
    fn stop(&mut self) {
        self.live.lock().unwrap().take();
    }
}

#[async_trait]
impl AudioInput for FakeMic {
    fn format(&self) -> AudioFormat {
        AudioFormat {
            mime_type: "audio/webm",
            extension: "webm",
        }
    }

    async fn open(&self) -> Result<RecordingSession, CaptureError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.live.lock().unwrap() = Some(tx);
        Ok(RecordingSession {
            chunks: rx,
            control: Box::new(FakeControl {
                live: self.live.clone(),
            }),
        })
    }
}
