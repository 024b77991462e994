//! Typed rows of the four remote collections.
//!
//! Each collection has a read model (what `select` returns) and an insert
//! model (what the client writes).  Ids and `created_at` are assigned by the
//! remote store, so insert models never carry them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{GALLERY_BUCKET, VOICEMAIL_BUCKET};

// ---------------------------------------------------------------------------
// Collections and buckets
// ---------------------------------------------------------------------------

/// One of the four independent content collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Posts,
    Voicemails,
    Folders,
    Images,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Posts,
        Collection::Voicemails,
        Collection::Folders,
        Collection::Images,
    ];

    /// Remote table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Voicemails => "voicemails",
            Self::Folders => "folders",
            Self::Images => "images",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Blob-store bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Gallery,
    Voicemails,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gallery => GALLERY_BUCKET,
            Self::Voicemails => VOICEMAIL_BUCKET,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Row ids
// ---------------------------------------------------------------------------

/// Store-assigned primary key.  Kept in whatever JSON shape the store
/// returned (integer or text) so it can be written back unchanged as a
/// foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A row as read back from its collection.
pub trait Record: DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &RowId;
    fn created_at(&self) -> DateTime<Utc>;
}

/// A row as written into its collection.
pub trait NewRecord: Serialize + Send + Sync {
    const COLLECTION: Collection;
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A feed message.  Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: RowId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Voicemail
// ---------------------------------------------------------------------------

/// A recorded voice note.  `url` is the public blob URL assigned at upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voicemail {
    pub id: RowId,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewVoicemail {
    pub url: String,
}

/// Display number of the voicemail at `position` in a newest-first list of
/// `total` items.  The newest note gets the highest number.
pub fn note_number(total: usize, position: usize) -> usize {
    total.saturating_sub(position)
}

// ---------------------------------------------------------------------------
// Folder
// ---------------------------------------------------------------------------

/// A gallery folder, parent of [`Image`] rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: RowId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewFolder {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// A gallery image.  Belongs to exactly one folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub id: RowId,
    pub url: String,
    pub folder_id: RowId,
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Suggested file name when saving this image locally.
    pub fn download_name(&self) -> String {
        format!("memory-{}.jpg", self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub folder_id: RowId,
}

macro_rules! impl_record {
    ($row:ty, $new:ty, $collection:expr) => {
        impl Record for $row {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &RowId {
                &self.id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }

        impl NewRecord for $new {
            const COLLECTION: Collection = $collection;
        }
    };
}

impl_record!(Post, NewPost, Collection::Posts);
impl_record!(Voicemail, NewVoicemail, Collection::Voicemails);
impl_record!(Folder, NewFolder, Collection::Folders);
impl_record!(Image, NewImage, Collection::Images);
