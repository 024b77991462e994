//! Content sync engine.
//!
//! Holds the last fetched snapshot of every collection and applies writes
//! as "persist, then re-fetch": nothing is inserted locally, the store is
//! the only source of truth.  A failed write or fetch is logged and leaves
//! the previous snapshot in place.
//!
//! Every fetch takes a ticket when issued.  A result is applied only if no
//! later ticket for the same collection has been applied already, so a
//! slow response never overwrites a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use capsule_media::{ArtifactSink, AudioArtifact};
use capsule_shared::models::{
    Bucket, Collection, Folder, Image, NewFolder, NewPost, NewRecord, NewVoicemail, Post, Record,
    RowId, Voicemail,
};
use capsule_store::{keys, records, ContentStore, StoreError};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{SyncError, ValidationError};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The folder currently open in the gallery and its images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryView {
    pub open: Option<Folder>,
    pub images: Vec<Image>,
}

/// Last fetched snapshot of each collection, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentState {
    pub posts: Vec<Post>,
    pub voicemails: Vec<Voicemail>,
    pub folders: Vec<Folder>,
    pub gallery: GalleryView,
}

/// Outcome of a [`ContentSync::refresh_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<Collection>,
    pub failed: Vec<Collection>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, collection: Collection, outcome: Option<bool>) {
        match outcome {
            Some(true) => self.refreshed.push(collection),
            Some(false) => self.failed.push(collection),
            None => {}
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub(crate) content: ContentState,
    applied: HashMap<Collection, u64>,
}

impl Inner {
    /// Marks `ticket` as applied for `collection` unless a newer one was.
    pub(crate) fn accept(&mut self, collection: Collection, ticket: u64) -> bool {
        let last = self.applied.entry(collection).or_insert(0);
        if ticket <= *last {
            return false;
        }
        *last = ticket;
        true
    }
}

// ---------------------------------------------------------------------------
// ContentSync
// ---------------------------------------------------------------------------

pub struct ContentSync {
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) inner: RwLock<Inner>,
    tickets: AtomicU64,
}

impl ContentSync {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            inner: RwLock::new(Inner::default()),
            tickets: AtomicU64::new(0),
        }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn snapshot(&self) -> ContentState {
        self.inner.read().await.content.clone()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.inner.read().await.content.posts.clone()
    }

    pub async fn voicemails(&self) -> Vec<Voicemail> {
        self.inner.read().await.content.voicemails.clone()
    }

    pub async fn folders(&self) -> Vec<Folder> {
        self.inner.read().await.content.folders.clone()
    }

    /// Re-fetch every collection concurrently.  Each snapshot is replaced
    /// as soon as its own fetch succeeds; a failure only affects that
    /// collection.  Images are fetched for the open folder, if any.
    pub async fn refresh_all(&self) -> RefreshReport {
        let (posts, voicemails, folders, images) = tokio::join!(
            self.refresh::<Post>(|c, rows| c.posts = rows),
            self.refresh::<Voicemail>(|c, rows| c.voicemails = rows),
            self.refresh::<Folder>(|c, rows| c.folders = rows),
            self.refresh_open_folder(),
        );

        let mut report = RefreshReport::default();
        report.record(Collection::Posts, Some(posts));
        report.record(Collection::Voicemails, Some(voicemails));
        report.record(Collection::Folders, Some(folders));
        report.record(Collection::Images, images);
        debug!(failed = report.failed.len(), "Refresh finished");
        report
    }

    async fn refresh<R: Record>(&self, apply: impl FnOnce(&mut ContentState, Vec<R>)) -> bool {
        let ticket = self.ticket();
        match records::fetch_all::<R>(self.store.as_ref()).await {
            Ok(rows) => {
                let mut inner = self.inner.write().await;
                if inner.accept(R::COLLECTION, ticket) {
                    apply(&mut inner.content, rows);
                } else {
                    debug!(collection = %R::COLLECTION, "Dropping superseded fetch");
                }
                true
            }
            Err(e) => {
                warn!(collection = %R::COLLECTION, error = %e, "Refresh failed, keeping previous snapshot");
                false
            }
        }
    }

    /// `None` when no folder is open.
    async fn refresh_open_folder(&self) -> Option<bool> {
        let folder_id = self.current_folder().await?.id;
        Some(self.refresh_folder_images(&folder_id).await.is_ok())
    }

    /// Fetch the images of `folder_id`.  The result is applied only if that
    /// folder is still the open one when it arrives.
    pub(crate) async fn refresh_folder_images(&self, folder_id: &RowId) -> Result<(), StoreError> {
        let ticket = self.ticket();
        let images = match records::fetch_where::<Image>(self.store.as_ref(), "folder_id", folder_id).await {
            Ok(images) => images,
            Err(e) => {
                warn!(folder = %folder_id, error = %e, "Image fetch failed");
                return Err(e);
            }
        };

        let mut inner = self.inner.write().await;
        let still_open = inner
            .content
            .gallery
            .open
            .as_ref()
            .is_some_and(|f| &f.id == folder_id);
        if !still_open {
            debug!(folder = %folder_id, "Folder no longer open, dropping its images");
            return Ok(());
        }
        if inner.accept(Collection::Images, ticket) {
            inner.content.gallery.images = images;
        }
        Ok(())
    }

    // -- Writes ------------------------------------------------------------

    /// Persist a post and re-fetch.  Blank text is rejected without a
    /// remote call.
    pub async fn create_post(&self, text: &str) -> Result<(), SyncError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        self.write(&NewPost {
            text: text.to_string(),
        })
        .await?;
        info!("Post created");
        self.refresh_all().await;
        Ok(())
    }

    pub async fn create_folder(&self, name: &str) -> Result<(), SyncError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.write(&NewFolder {
            name: name.to_string(),
        })
        .await?;
        info!(name, "Folder created");
        self.refresh_all().await;
        Ok(())
    }

    /// Upload a recording and record it as a voicemail.
    pub async fn create_voicemail(&self, artifact: AudioArtifact) -> Result<(), SyncError> {
        if artifact.bytes.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }
        let key = keys::voicemail_key(Utc::now(), artifact.extension);
        let size = artifact.bytes.len();
        let url = self
            .upload(Bucket::Voicemails, &key, artifact.bytes, artifact.mime_type)
            .await?;
        self.write(&NewVoicemail { url }).await?;
        info!(key = %key, size, "Voicemail saved");
        self.refresh_all().await;
        Ok(())
    }

    pub(crate) async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: bytes::Bytes,
        content_type: &str,
    ) -> Result<String, SyncError> {
        if let Err(e) = self.store.upload_blob(bucket, key, bytes, content_type).await {
            warn!(bucket = bucket.name(), key, error = %e, "Upload failed");
            return Err(e.into());
        }
        Ok(self.store.public_url(bucket, key))
    }

    pub(crate) async fn write<N: NewRecord>(&self, row: &N) -> Result<(), SyncError> {
        records::insert_row(self.store.as_ref(), row)
            .await
            .map_err(|e| {
                warn!(collection = %N::COLLECTION, error = %e, "Insert failed, nothing changed");
                e.into()
            })
    }
}

#[async_trait]
impl ArtifactSink for ContentSync {
    async fn persist(&self, artifact: AudioArtifact) -> anyhow::Result<()> {
        self.create_voicemail(artifact).await?;
        Ok(())
    }
}
