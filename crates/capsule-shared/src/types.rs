use serde::{Deserialize, Serialize};

use crate::constants::{AVATAR_CDN_URL, MY_ID, PARTNER_ID};

/// Opaque presence identity (a snowflake string on the presence service).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Avatar image URL for the given avatar hash.
    pub fn avatar_url(&self, avatar_hash: &str) -> String {
        format!("{AVATAR_CDN_URL}/{}/{avatar_hash}.png", self.0)
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two participants.  Fixed at compile time; never created or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPair {
    pub me: IdentityId,
    pub partner: IdentityId,
}

impl IdentityPair {
    pub fn as_array(&self) -> [IdentityId; 2] {
        [self.me.clone(), self.partner.clone()]
    }
}

impl Default for IdentityPair {
    fn default() -> Self {
        Self {
            me: IdentityId::new(MY_ID),
            partner: IdentityId::new(PARTNER_ID),
        }
    }
}
