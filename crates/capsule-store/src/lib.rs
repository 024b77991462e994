//! # capsule-store
//!
//! Access to the remote content store: four relational collections (posts,
//! voicemails, folders, images) and a blob store for binary payloads.
//!
//! [`ContentStore`] is the raw, object-safe interface (select / insert /
//! upload / public URL).  The helpers in [`records`] layer the typed row
//! models from `capsule-shared` on top of it.  Two backends are provided:
//! [`RestStore`] talks to a PostgREST + object-storage deployment over
//! HTTP, [`MemoryStore`] keeps everything in process.

pub mod keys;
pub mod memory;
pub mod records;
pub mod remote;
pub mod rest;

mod error;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use remote::{ContentStore, Filter, Select};
pub use rest::RestStore;
