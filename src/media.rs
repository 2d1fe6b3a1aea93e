//! # Media Kinds and Stream Descriptors
//!
//! Shared vocabulary for the demuxer and its streams:
//! - `MediaKind` - closed set of elementary stream kinds
//! - `StreamDescriptor` - what the query surface reports per stream

use serde::{Deserialize, Serialize};

/// Kind of an elementary stream.
///
/// Closed enum on purpose: the dispatch branch in the demuxer matches
/// exhaustively, so adding a kind here forces every branch point to be
/// revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Unknown,
}

impl MediaKind {
    /// Short lowercase name, used for log lines and ignored-stream entries
    pub fn name(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this crate can build a decodable stream for the kind
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the stream listing exposed to callers.
///
/// `index` is the container-assigned stream identifier. Listings preserve
/// discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub kind: MediaKind,
    pub index: usize,
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_support() {
        assert!(MediaKind::Video.is_supported());
        assert!(!MediaKind::Audio.is_supported());
        assert!(!MediaKind::Subtitle.is_supported());
        assert!(!MediaKind::Unknown.is_supported());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MediaKind::Video.name(), "video");
        assert_eq!(MediaKind::Unknown.to_string(), "unknown");
    }
}
