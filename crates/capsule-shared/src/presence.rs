//! Presence snapshot as served by the presence service.
//!
//! A snapshot is replaced wholesale on every successful poll and never
//! patched field by field.

use serde::{Deserialize, Serialize};

use crate::constants::{CUSTOM_STATUS_ACTIVITY_TYPE, IDLE_SUMMARY, SPOTIFY_ACTIVITY_NAME};
use crate::types::IdentityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    #[default]
    #[serde(other)]
    Offline,
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Account record attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceAccount {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl Activity {
    /// Custom statuses and Spotify entries never show up as activities;
    /// Spotify is reported through [`PresenceSnapshot::spotify`] instead.
    pub fn is_displayed(&self) -> bool {
        self.kind != CUSTOM_STATUS_ACTIVITY_TYPE && self.name != SPOTIFY_ACTIVITY_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub song: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    pub album_art_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    #[serde(default)]
    pub discord_user: Option<PresenceAccount>,
    #[serde(default)]
    pub discord_status: PresenceStatus,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub spotify: Option<SpotifyTrack>,
}

impl PresenceSnapshot {
    pub fn status(&self) -> PresenceStatus {
        self.discord_status
    }

    /// Activities shown to the user, in service order.
    pub fn display_activities(&self) -> Vec<&Activity> {
        self.activities.iter().filter(|a| a.is_displayed()).collect()
    }

    /// A snapshot without an account record has nothing to render.
    pub fn is_displayable(&self) -> bool {
        self.discord_user.is_some()
    }

    pub fn display_name(&self) -> Option<&str> {
        let user = self.discord_user.as_ref()?;
        Some(user.global_name.as_deref().unwrap_or(&user.username))
    }

    pub fn avatar_url(&self, identity: &IdentityId) -> Option<String> {
        let hash = self.discord_user.as_ref()?.avatar.as_deref()?;
        Some(identity.avatar_url(hash))
    }

    /// One-line summary: displayed activities, then the Spotify track.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .display_activities()
            .iter()
            .map(|a| format!("Playing {}", a.name))
            .collect();
        if let Some(ref track) = self.spotify {
            parts.push(format!("Listening to {} by {}", track.song, track.artist));
        }
        if parts.is_empty() {
            IDLE_SUMMARY.to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Response body of `GET /users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<PresenceSnapshot>,
    #[serde(default)]
    pub error: Option<PresenceApiError>,
}

impl PresenceEnvelope {
    /// The snapshot, if and only if the service reported success.
    pub fn into_snapshot(self) -> Option<PresenceSnapshot> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}
