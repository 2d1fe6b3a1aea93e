//! # Compressed Packets
//!
//! One compressed, timestamped unit of data belonging to exactly one
//! elementary stream. Packets own their payload (`bytes::Bytes`), so they
//! stay valid after the container that produced them is closed.

use bytes::Bytes;

/// A compressed packet read from the container cursor
#[derive(Debug, Clone)]
pub struct Packet {
    /// Container-assigned stream identifier this packet belongs to
    pub stream_index: usize,
    /// Presentation timestamp (microseconds), if the container knows it
    pub pts_us: Option<i64>,
    /// Decode timestamp (microseconds), if distinct from pts
    pub dts_us: Option<i64>,
    /// Keyframe / random-access point
    pub keyframe: bool,
    /// Compressed payload
    pub data: Bytes,
}

impl Packet {
    pub fn new(stream_index: usize, pts_us: Option<i64>, data: Bytes) -> Self {
        Self {
            stream_index,
            pts_us,
            dts_us: None,
            keyframe: false,
            data,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
