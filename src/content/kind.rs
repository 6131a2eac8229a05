use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform target for a generation request.
///
/// The kind determines prompt shaping and whether provider output is split
/// into thread segments or kept as a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Twitter thread (5 segments requested, split on blank lines).
    Twitter,
    /// Instagram caption, optionally describing an attached image.
    Instagram,
    /// LinkedIn post.
    Linkedin,
    /// YouTube video script with hook, timestamps, and call-to-action.
    Youtube,
}

impl ContentKind {
    /// All supported kinds, in presentation order.
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Twitter,
        ContentKind::Instagram,
        ContentKind::Linkedin,
        ContentKind::Youtube,
    ];

    /// Whether provider output for this kind is split into discrete units.
    pub fn is_threaded(&self) -> bool {
        matches!(self, ContentKind::Twitter)
    }

    /// Stable lowercase name used in prompts, logs, and export filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Twitter => "twitter",
            ContentKind::Instagram => "instagram",
            ContentKind::Linkedin => "linkedin",
            ContentKind::Youtube => "youtube",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ContentKind::Twitter).expect("serialize");
        assert_eq!(json, "\"twitter\"");

        let kind: ContentKind = serde_json::from_str("\"youtube\"").expect("deserialize");
        assert_eq!(kind, ContentKind::Youtube);
    }

    #[test]
    fn test_only_twitter_is_threaded() {
        assert!(ContentKind::Twitter.is_threaded());
        assert!(!ContentKind::Instagram.is_threaded());
        assert!(!ContentKind::Linkedin.is_threaded());
        assert!(!ContentKind::Youtube.is_threaded());
    }

    #[test]
    fn test_display_matches_as_str() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
