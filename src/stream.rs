//! # Elementary Streams
//!
//! The `Stream` trait is the demuxer's view of one elementary stream: does
//! it want more compressed data, does a packet belong to it, is it passive,
//! and where do pushed packets go. Decoding itself is out of scope - a
//! `VideoStream` hands due packets to its `VideoDelegate`, which is the
//! decode/presentation pipeline's side of the boundary.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::container::StreamInfo;
use crate::media::MediaKind;
use crate::packet::Packet;

/// How many compressed packets a stream buffers ahead of the decoder
pub const DECODE_AHEAD_PACKETS: usize = 16;

/// A single stream failed to initialize. Caught per-stream during
/// discovery; the demuxer logs it and carries on without the stream.
#[derive(Debug, Error)]
#[error("cannot initialize {kind} stream {index}: {reason}")]
pub struct StreamInitError {
    pub index: usize,
    pub kind: MediaKind,
    pub reason: String,
}

// ============================================================================
// Stream Trait
// ============================================================================

/// One elementary stream as seen by the demuxer
pub trait Stream: Send + Sync {
    /// Container-assigned stream identifier
    fn index(&self) -> usize;

    fn kind(&self) -> MediaKind;

    fn language(&self) -> Option<String>;

    /// Whether the stream wants more compressed data right now
    fn needs_more_data(&self) -> bool;

    /// Matching predicate used against queued packets
    fn owns_packet(&self, packet: &Packet) -> bool {
        packet.stream_index == self.index()
    }

    /// Accept a packet. Only called by the demuxer's dispatch path.
    fn push_packet(&self, packet: Packet);

    /// Passive streams accept data even when they are not the requester
    fn is_passive(&self) -> bool {
        false
    }

    /// Become the active consumer of this stream's kind
    fn connect(&self);

    /// Stop being the active consumer; buffered data is dropped
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Drop all buffered compressed data (seek invalidation)
    fn flush(&self);

    /// Per-frame tick: release packets whose presentation time has passed
    fn update(&self, position: Duration);
}

// ============================================================================
// Video Delegate
// ============================================================================

/// Receiver for packets leaving a video stream's buffer.
///
/// This is where the decode pipeline plugs in; the demuxer core never sees
/// decoded frames.
pub trait VideoDelegate: Send + Sync {
    fn on_packet_due(&self, stream_index: usize, packet: Packet);
}

// ============================================================================
// Video Stream
// ============================================================================

struct VideoStreamBuffer {
    packets: VecDeque<Packet>,
    connected: bool,
}

/// Selectable video stream.
///
/// Buffers compressed packets up to `DECODE_AHEAD_PACKETS` and releases
/// them to the delegate in presentation order as the clock passes their
/// timestamps.
pub struct VideoStream {
    index: usize,
    codec_id: String,
    language: Option<String>,
    buffer: Mutex<VideoStreamBuffer>,
    delegate: Arc<dyn VideoDelegate>,
}

impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("index", &self.index)
            .field("codec_id", &self.codec_id)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl VideoStream {
    pub fn new(
        info: &StreamInfo,
        delegate: Arc<dyn VideoDelegate>,
    ) -> Result<Self, StreamInitError> {
        if info.codec_id.is_empty() {
            return Err(StreamInitError {
                index: info.index,
                kind: info.kind,
                reason: "missing codec identifier".to_string(),
            });
        }

        Ok(Self {
            index: info.index,
            codec_id: info.codec_id.clone(),
            language: info.language.clone(),
            buffer: Mutex::new(VideoStreamBuffer {
                packets: VecDeque::new(),
                connected: false,
            }),
            delegate,
        })
    }

    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    /// Number of packets currently buffered
    pub fn buffered_packets(&self) -> usize {
        self.buffer.lock().packets.len()
    }
}

impl Stream for VideoStream {
    fn index(&self) -> usize {
        self.index
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn needs_more_data(&self) -> bool {
        let buffer = self.buffer.lock();
        buffer.connected && buffer.packets.len() < DECODE_AHEAD_PACKETS
    }

    fn push_packet(&self, packet: Packet) {
        self.buffer.lock().packets.push_back(packet);
    }

    fn connect(&self) {
        self.buffer.lock().connected = true;
    }

    fn disconnect(&self) {
        let mut buffer = self.buffer.lock();
        buffer.connected = false;
        buffer.packets.clear();
    }

    fn is_connected(&self) -> bool {
        self.buffer.lock().connected
    }

    fn flush(&self) {
        self.buffer.lock().packets.clear();
    }

    fn update(&self, position: Duration) {
        // Pop due packets under the lock, hand them over outside it
        let due: Vec<Packet> = {
            let mut buffer = self.buffer.lock();
            if !buffer.connected {
                return;
            }
            let position_us = position.as_micros() as i64;
            let mut due = Vec::new();
            loop {
                let ready = match buffer.packets.front() {
                    Some(front) => match front.pts_us {
                        Some(pts) => pts <= position_us,
                        // Untimed packets go out in container order
                        None => true,
                    },
                    None => false,
                };
                if !ready {
                    break;
                }
                if let Some(packet) = buffer.packets.pop_front() {
                    due.push(packet);
                }
            }
            due
        };

        for packet in due {
            self.delegate.on_packet_due(self.index, packet);
        }
    }
}
