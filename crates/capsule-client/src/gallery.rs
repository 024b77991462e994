//! Folder navigation and image upload on top of [`ContentSync`].

use std::path::Path;

use bytes::Bytes;
use capsule_shared::models::{Bucket, Folder, Image, NewImage};
use capsule_store::keys;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::{SyncError, ValidationError};
use crate::sync::ContentSync;

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Bytes,
    pub content_type: String,
}

impl UploadFile {
    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, SyncError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            content_type: content_type_for(&name).to_string(),
            name,
            bytes: Bytes::from(bytes),
        })
    }
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

impl ContentSync {
    pub async fn current_folder(&self) -> Option<Folder> {
        self.inner.read().await.content.gallery.open.clone()
    }

    /// Images of the open folder, newest first.  Empty when none is open.
    pub async fn folder_images(&self) -> Vec<Image> {
        self.inner.read().await.content.gallery.images.clone()
    }

    /// Open `folder`, clear the previous folder's images and fetch its own.
    ///
    /// If another folder is opened (or this one closed) before the fetch
    /// returns, the result is discarded.
    pub async fn open_folder(&self, folder: Folder) -> Result<(), SyncError> {
        let folder_id = folder.id.clone();
        {
            let mut inner = self.inner.write().await;
            inner.content.gallery.open = Some(folder);
            inner.content.gallery.images.clear();
        }
        self.refresh_folder_images(&folder_id).await?;
        Ok(())
    }

    pub async fn close_folder(&self) {
        let mut inner = self.inner.write().await;
        inner.content.gallery.open = None;
        inner.content.gallery.images.clear();
    }

    /// Upload `file` into the open folder, then re-fetch that folder.
    pub async fn upload_image(&self, file: UploadFile) -> Result<(), SyncError> {
        let folder = self
            .current_folder()
            .await
            .ok_or(ValidationError::NoFolderOpen)?;
        if file.bytes.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }

        let key = keys::image_key(&folder.id, Utc::now(), &file.name);
        let url = self
            .upload(Bucket::Gallery, &key, file.bytes, &file.content_type)
            .await?;
        self.write(&NewImage {
            url,
            folder_id: folder.id.clone(),
        })
        .await?;
        info!(folder = %folder.id, key = %key, "Image uploaded");

        if let Err(e) = self.refresh_folder_images(&folder.id).await {
            warn!(folder = %folder.id, error = %e, "Image uploaded but folder refresh failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use capsule_store::MemoryStore;

    fn file(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
            content_type: "image/jpeg".to_string(),
        }
    }

    async fn with_folders(names: &[&str]) -> (Arc<MemoryStore>, ContentSync, Vec<Folder>) {
        let store = Arc::new(MemoryStore::new());
        let sync = ContentSync::new(store.clone());
        for name in names {
            sync.create_folder(name).await.unwrap();
        }
        let folders = sync.folders().await;
        (store, sync, folders)
    }

    #[tokio::test]
    async fn test_upload_requires_open_folder() {
        let (store, sync, _) = with_folders(&[]).await;
        let result = sync.upload_image(file("a.jpg")).await;
        assert!(matches!(
            result,
            Err(SyncError::Validation(ValidationError::NoFolderOpen))
        ));
        assert_eq!(store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_lands_in_open_folder() {
        let (store, sync, folders) = with_folders(&["Trip"]).await;
        sync.open_folder(folders[0].clone()).await.unwrap();
        sync.upload_image(file("beach.jpg")).await.unwrap();

        let images = sync.folder_images().await;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].folder_id, folders[0].id);

        let keys = store.blob_keys(Bucket::Gallery);
        assert!(keys[0].starts_with(&format!("{}/", folders[0].id)));
        assert!(keys[0].ends_with("-beach.jpg"));
    }

    #[tokio::test]
    async fn test_switching_folder_clears_images() {
        let (_store, sync, folders) = with_folders(&["Trip", "Empty"]).await;
        let trip = folders.iter().find(|f| f.name == "Trip").unwrap().clone();
        let empty = folders.iter().find(|f| f.name == "Empty").unwrap().clone();

        sync.open_folder(trip).await.unwrap();
        sync.upload_image(file("a.jpg")).await.unwrap();
        sync.open_folder(empty).await.unwrap();
        assert!(sync.folder_images().await.is_empty());

        sync.close_folder().await;
        assert!(sync.current_folder().await.is_none());
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for("IMG_1.JPG"), "image/jpeg");
        assert_eq!(content_type_for("clip.png"), "image/png");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }
}
