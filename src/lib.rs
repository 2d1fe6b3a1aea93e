//! # Reel Core
//!
//! Media demultiplexing and stream synchronization for playback.
//!
//! The demuxer owns a container's sequential read cursor, routes compressed
//! packets to the selected consumer stream, buffers packets destined for
//! streams that are not currently pulling, and keeps everything consistent
//! with a shared playback clock across seeks.

// ============================================================================
// Shared Types
// ============================================================================
pub mod media;
pub mod packet;

// ============================================================================
// Container Boundary
// ============================================================================
pub mod container;
pub mod mkv;

// ============================================================================
// Playback
// ============================================================================
pub mod clock;
pub mod stream;
pub mod demux;

pub use clock::{PlaybackClock, PlaybackStatus, TransportObserver};
pub use container::{Container, ContainerError, SeekMode, StreamInfo};
pub use demux::{DemuxError, Demuxer};
pub use media::{MediaKind, StreamDescriptor};
pub use packet::Packet;
pub use stream::{Stream, StreamInitError, VideoDelegate, VideoStream};

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
