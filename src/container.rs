//! # Container Abstraction
//!
//! Boundary between the demuxer core and whatever actually parses the
//! container format. A container is a strictly sequential, non-reentrant
//! read cursor plus the stream metadata discovered when it was opened.
//!
//! The demuxer owns its container exclusively and serializes every call
//! through one mutex domain; implementations never need internal locking.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaKind;
use crate::packet::Packet;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to open source: {0}")]
    Open(String),
    #[error("failed to read stream metadata: {0}")]
    Probe(String),
    #[error("packet read failed: {0}")]
    Read(String),
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("packet buffer allocation failed")]
    Allocation,
}

// ============================================================================
// Probe Metadata
// ============================================================================

/// Metadata for one elementary stream, as reported at open time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Container-assigned identifier (small non-negative integer, unique)
    pub index: usize,
    pub kind: MediaKind,
    /// Codec identifier string, e.g. "V_MPEG4/ISO/AVC"
    pub codec_id: String,
    pub language: Option<String>,
    /// Stream-level duration, when the container records one per stream
    pub duration: Option<Duration>,
}

impl StreamInfo {
    /// "kind/codec" description used for ignored-stream entries and logs
    pub fn describe(&self) -> String {
        format!("{}/{}", self.kind, self.codec_id)
    }
}

// ============================================================================
// Seeking
// ============================================================================

/// How a seek target timestamp is interpreted.
///
/// Both modes are backward seeks: the cursor lands at the nearest readable
/// point at or before the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Target is a presentation timestamp
    PresentationTime,
    /// Target is a decode timestamp (fallback for formats without pts seek)
    DecodeTime,
}

// ============================================================================
// Container Trait
// ============================================================================

/// An opened media container.
///
/// The cursor is strictly sequential: `read_packet` yields packets in
/// container order until end of file, and only `seek` moves it.
pub trait Container: Send {
    /// Streams discovered at open time, in container order
    fn streams(&self) -> &[StreamInfo];

    /// Container-level duration metadata, if present
    fn duration(&self) -> Option<Duration>;

    /// Start time of the earliest stream (microseconds), if known
    fn start_time_us(&self) -> Option<i64>;

    /// Whether this format seeks by presentation timestamp
    fn seeks_by_pts(&self) -> bool;

    /// Read the next packet from the cursor. `Ok(None)` means end of file.
    fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError>;

    /// Move the cursor backward to `target_us` interpreted per `mode`
    fn seek(&mut self, target_us: i64, mode: SeekMode) -> Result<(), ContainerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_info_describe() {
        let info = StreamInfo {
            index: 0,
            kind: MediaKind::Video,
            codec_id: "V_MPEG4/ISO/AVC".to_string(),
            language: None,
            duration: None,
        };
        assert_eq!(info.describe(), "video/V_MPEG4/ISO/AVC");
    }
}
