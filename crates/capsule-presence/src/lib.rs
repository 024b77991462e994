// Presence polling for the two fixed identities.

pub mod board;
pub mod poller;
pub mod source;

mod error;

pub use board::{PresenceBoard, PresenceEntry};
pub use error::PresenceError;
pub use poller::{poll_once, PresencePoller, TickReport};
pub use source::{LanyardClient, PresenceSource};
