/// Application name
pub const APP_NAME: &str = "Capsule";

/// Presence identity of the first participant
pub const MY_ID: &str = "1264833597240643605";

/// Presence identity of the second participant
pub const PARTNER_ID: &str = "1208020426333102131";

/// Shared gate secret, compared case-insensitively.
/// Anyone holding the binary can read this; it is not a credential.
pub const GATE_SECRET: &str = "maurain";

/// How long the gate shows its failure cue after a rejected attempt
pub const GATE_FAILURE_CUE_MS: u64 = 500;

/// Presence service base URL
pub const PRESENCE_API_URL: &str = "https://api.lanyard.rest/v1";

/// Presence poll interval in milliseconds
pub const PRESENCE_POLL_INTERVAL_MS: u64 = 15_000;

/// Avatar CDN base URL
pub const AVATAR_CDN_URL: &str = "https://cdn.discordapp.com/avatars";

/// Activity type used for custom statuses
pub const CUSTOM_STATUS_ACTIVITY_TYPE: u8 = 4;

/// Activity name of a Spotify listening session
pub const SPOTIFY_ACTIVITY_NAME: &str = "Spotify";

/// Summary shown when nobody is doing anything in particular
pub const IDLE_SUMMARY: &str = "Chilling";

/// Blob bucket names
pub const GALLERY_BUCKET: &str = "gallery";
pub const VOICEMAIL_BUCKET: &str = "voicemails";

/// Fallback file name for downloads
pub const DEFAULT_DOWNLOAD_NAME: &str = "memory.jpg";

/// Remote call timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Local calendar date the relationship timer counts from (midnight)
pub const RELATIONSHIP_START_DATE: (i32, u32, u32) = (2026, 1, 28);
