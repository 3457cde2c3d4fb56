use serde::{Deserialize, Serialize};

use crate::MAX_NAME_LENGTH;

/// Display identity attached to a connection when it enters a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub avatar: String,
}

impl PlayerProfile {
    /// Clamp a raw client-supplied profile into something displayable.
    /// Empty names fall back to a placeholder rather than being rejected.
    pub fn sanitized(name: &str, avatar: &str) -> Self {
        let trimmed = name.trim();
        let name = if trimmed.is_empty() {
            "anonymous".to_string()
        } else {
            trimmed.chars().take(MAX_NAME_LENGTH).collect()
        };
        let avatar = avatar.chars().take(8).collect();
        Self { name, avatar }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_truncates_long_names() {
        let long = "x".repeat(MAX_NAME_LENGTH * 2);
        let profile = PlayerProfile::sanitized(&long, "🎲");
        assert_eq!(profile.name.chars().count(), MAX_NAME_LENGTH);
    }

    #[test]
    fn sanitized_defaults_empty_names() {
        let profile = PlayerProfile::sanitized("   ", "");
        assert_eq!(profile.name, "anonymous");
    }
}
