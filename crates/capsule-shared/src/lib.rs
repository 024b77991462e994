//! # capsule-shared
//!
//! Types shared by every Capsule crate: the fixed identity pair, the typed
//! rows of the four content collections, the presence snapshot returned by
//! the presence service, and a handful of constants.  Nothing here performs
//! I/O.

pub mod constants;
pub mod elapsed;
pub mod models;
pub mod presence;
pub mod types;

pub use models::*;
pub use presence::{Activity, PresenceAccount, PresenceEnvelope, PresenceSnapshot, PresenceStatus, SpotifyTrack};
pub use types::{IdentityId, IdentityPair};
