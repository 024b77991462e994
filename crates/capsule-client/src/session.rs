//! A running client: gate, content sync, presence poller, voice capture
//! and view state wired together.

use std::sync::Arc;

use capsule_media::{AudioInput, CaptureError, CapturePipeline};
use capsule_presence::{PresenceBoard, PresencePoller, PresenceSource};
use capsule_shared::models::Folder;
use capsule_shared::IdentityPair;
use capsule_store::ContentStore;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::download::Downloader;
use crate::error::SyncError;
use crate::focus::{FocusState, View};
use crate::gate::Gate;
use crate::sync::ContentSync;

pub struct Capsule {
    config: ClientConfig,
    identities: IdentityPair,
    gate: Gate,
    sync: Arc<ContentSync>,
    poller: PresencePoller,
    capture: CapturePipeline,
    downloader: Downloader,
    focus: FocusState,
}

impl Capsule {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn ContentStore>,
        presence: Arc<dyn PresenceSource>,
        input: Arc<dyn AudioInput>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let sync = Arc::new(ContentSync::new(store));
        let capture = CapturePipeline::new(input, sync.clone());

        Ok(Self {
            gate: Gate::new(config.gate_secret.clone()),
            downloader: Downloader::new(http, config.download_dir.clone()),
            identities: IdentityPair::default(),
            poller: PresencePoller::new(presence),
            focus: FocusState::default(),
            sync,
            capture,
            config,
        })
    }

    pub fn with_identities(mut self, identities: IdentityPair) -> Self {
        self.identities = identities;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identities(&self) -> &IdentityPair {
        &self.identities
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn sync(&self) -> &Arc<ContentSync> {
        &self.sync
    }

    pub fn capture(&self) -> &CapturePipeline {
        &self.capture
    }

    pub fn presence(&self) -> PresenceBoard {
        self.poller.board()
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    pub fn focus_mut(&mut self) -> &mut FocusState {
        &mut self.focus
    }

    /// Check `attempt` against the gate.  On success presence polling
    /// starts and every collection is fetched.
    pub async fn unlock(&mut self, attempt: &str) -> bool {
        if !self.gate.try_unlock(attempt) {
            return false;
        }
        self.poller
            .start(self.identities.as_array(), self.config.poll_interval);
        let report = self.sync.refresh_all().await;
        if !report.is_complete() {
            warn!(failed = ?report.failed, "Initial load incomplete");
        }
        true
    }

    /// Return to the gate.  Polling stops; a recording in progress is
    /// stopped and still saved.
    pub async fn lock(&mut self) {
        self.gate.lock();
        self.poller.stop().await;
        self.stop_recording().await;
        self.sync.close_folder().await;
        self.focus = FocusState::default();
        info!("Locked");
    }

    /// Switch view.  Leaving the gallery (or entering it) closes any open
    /// folder.
    pub async fn navigate(&mut self, view: View) {
        self.focus.navigate(view);
        self.sync.close_folder().await;
    }

    pub async fn open_folder(&mut self, folder: Folder) -> Result<(), SyncError> {
        self.focus.close_lightbox();
        self.sync.open_folder(folder).await
    }

    pub async fn close_folder(&mut self) {
        self.focus.close_lightbox();
        self.sync.close_folder().await;
    }

    /// Start recording if idle, stop if recording.  Returns whether a
    /// recording is now in progress.
    pub async fn toggle_recording(&self) -> Result<bool, CaptureError> {
        if self.capture.is_recording() {
            self.capture.stop().await;
            Ok(false)
        } else {
            self.capture.start().await?;
            Ok(true)
        }
    }

    /// Stop a live recording and wait until any recording already being
    /// saved (including one stopped earlier) has finished.
    async fn stop_recording(&self) {
        self.capture.stop().await;
        self.capture.wait_idle().await;
    }

    /// Stop background work and wait for a pending recording to be saved.
    pub async fn shutdown(mut self) {
        self.poller.stop().await;
        self.stop_recording().await;
        info!("Shut down");
    }
}
