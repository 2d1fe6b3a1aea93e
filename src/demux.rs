//! # Demuxer - Packet Routing and Stream Synchronization
//!
//! The demuxer owns the container's sequential read cursor and mediates all
//! packet flow:
//! - discovers elementary streams at construction and builds the stream table
//! - satisfies per-stream data requests, reading only as much as necessary
//! - queues packets read for streams that are not the current requester
//! - reacts to transport events by flushing and re-anchoring the cursor
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────┐  read_packet  ┌─────────┐  push_packet  ┌────────────┐
//! │Container │──────────────►│ Demuxer │──────────────►│ VideoStream│
//! │ (cursor) │               │         │               │ (selected) │
//! └──────────┘               └────┬────┘               └────────────┘
//!                                 │ queue/expire
//!                           ┌─────┴──────┐
//!                           │ pending    │
//!                           │ packets    │
//!                           └────────────┘
//! ```
//!
//! One mutex guards the container cursor, the pending queue, and the
//! end-of-file flag. The guard is scoped to a single read/dispatch/queue
//! step and is never held while a consumer ingests a delivered packet.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::clock::{PlaybackClock, PlaybackStatus, TransportObserver};
use crate::container::{Container, ContainerError, SeekMode};
use crate::media::{MediaKind, StreamDescriptor};
use crate::mkv::MkvContainer;
use crate::packet::Packet;
use crate::stream::{Stream, VideoDelegate, VideoStream};

/// Cap on queued packets per destination stream. Queueing past the cap
/// expires that stream's oldest queued packet, so a stream that is never
/// serviced cannot grow the pending queue without bound.
pub const PENDING_PACKETS_PER_STREAM: usize = 64;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DemuxError {
    /// Container open/probe/read/seek failure surfaced to the caller
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// Stream selection is only legal while the transport is stopped
    #[error("cannot change stream selection while transport is {status:?}")]
    SelectionNotStopped { status: PlaybackStatus },
    #[error("no stream with identifier {0}")]
    UnknownStream(usize),
}

// ============================================================================
// Demuxer
// ============================================================================

/// State under the single mutual-exclusion domain
struct DemuxState {
    container: Box<dyn Container>,
    /// Packets read but not yet deliverable, in read order
    pending: VecDeque<Packet>,
    eof: bool,
}

pub struct Demuxer {
    state: Mutex<DemuxState>,
    /// Stream table: container identifier -> stream. Membership is fixed
    /// at construction.
    streams: HashMap<usize, Arc<dyn Stream>>,
    /// Identifiers in discovery order, for the listing surface
    stream_order: Vec<usize>,
    /// Streams whose kind this crate cannot decode, with a description
    ignored: HashMap<usize, String>,
    /// At most one selected stream per kind; indices only, the table owns
    /// the streams
    selected: Mutex<HashMap<MediaKind, usize>>,
    clock: Arc<PlaybackClock>,
    duration: Duration,
    weak_self: Weak<Demuxer>,
}

impl Demuxer {
    /// Open a Matroska file and discover its streams
    pub fn open<P: AsRef<Path>>(
        path: P,
        clock: Arc<PlaybackClock>,
        delegate: Arc<dyn VideoDelegate>,
    ) -> Result<Arc<Self>, DemuxError> {
        let container = MkvContainer::open(path)?;
        Self::new(Box::new(container), clock, delegate)
    }

    /// Build a demuxer over an already-opened container.
    ///
    /// Every video stream the container reports becomes a table entry;
    /// unsupported kinds land in the ignored table; a per-stream init
    /// failure is logged and skipped. The demuxer subscribes to the clock
    /// before returning.
    pub fn new(
        container: Box<dyn Container>,
        clock: Arc<PlaybackClock>,
        delegate: Arc<dyn VideoDelegate>,
    ) -> Result<Arc<Self>, DemuxError> {
        let mut streams: HashMap<usize, Arc<dyn Stream>> = HashMap::new();
        let mut stream_order = Vec::new();
        let mut ignored = HashMap::new();

        // Container-level duration wins; fall back to the first video
        // stream that reports one.
        let mut duration = container.duration();

        for info in container.streams() {
            match info.kind {
                MediaKind::Video => match VideoStream::new(info, delegate.clone()) {
                    Ok(stream) => {
                        if duration.is_none() {
                            duration = info.duration;
                        }
                        tracing::debug!("loaded {} stream {}", info.describe(), info.index);
                        streams.insert(info.index, Arc::new(stream) as Arc<dyn Stream>);
                        stream_order.push(info.index);
                    }
                    Err(e) => {
                        tracing::error!("error while loading {} stream: {}", info.describe(), e);
                    }
                },
                MediaKind::Audio | MediaKind::Subtitle | MediaKind::Unknown => {
                    tracing::debug!("'{}' stream {} ignored", info.describe(), info.index);
                    ignored.insert(info.index, info.describe());
                }
            }
        }

        if duration.is_none() {
            tracing::warn!("the media duration could not be determined");
        }

        let demuxer = Arc::new_cyclic(|weak| Self {
            state: Mutex::new(DemuxState {
                container,
                pending: VecDeque::new(),
                eof: false,
            }),
            streams,
            stream_order,
            ignored,
            selected: Mutex::new(HashMap::new()),
            clock: clock.clone(),
            duration: duration.unwrap_or(Duration::ZERO),
            weak_self: weak.clone(),
        });

        let observer: Weak<dyn TransportObserver> = demuxer.weak_self.clone();
        clock.subscribe(observer);

        Ok(demuxer)
    }

    // ------------------------------------------------------------------------
    // Packet supply
    // ------------------------------------------------------------------------

    /// Data-starvation entry point for consumers pulling by identifier
    pub fn request_more_data(&self, stream_index: usize) -> Result<(), DemuxError> {
        let stream = self
            .streams
            .get(&stream_index)
            .cloned()
            .ok_or(DemuxError::UnknownStream(stream_index))?;
        self.feed(&stream)
    }

    /// Satisfy a stream's need for compressed data.
    ///
    /// Loops while end-of-file has not been reached and the stream still
    /// reports starvation: queued packets matching the stream are consumed
    /// first, then the container cursor, reading no further than the
    /// requester needs.
    fn feed(&self, stream: &Arc<dyn Stream>) -> Result<(), DemuxError> {
        // Only the selected stream of a kind (or a passive one) ever
        // receives data; anything else would loop re-queueing its own
        // packets.
        if !stream.is_passive() && self.selected_index(stream.kind()) != Some(stream.index()) {
            return Ok(());
        }

        loop {
            let delivery = {
                let mut state = self.state.lock();
                if state.eof || !stream.needs_more_data() {
                    return Ok(());
                }

                let packet = match take_queued(&mut state.pending, stream.as_ref()) {
                    Some(packet) => packet,
                    None => match state.container.read_packet() {
                        Ok(Some(packet)) => packet,
                        Ok(None) => {
                            state.eof = true;
                            return Ok(());
                        }
                        Err(ContainerError::Allocation) => {
                            // No degraded mode for allocation failure
                            return Err(ContainerError::Allocation.into());
                        }
                        Err(e) => {
                            tracing::error!("container read failed: {}", e);
                            state.eof = true;
                            return Ok(());
                        }
                    },
                };

                self.dispatch(&mut state, packet, stream.as_ref())
            };

            // Lock released; hand the packet to its consumer
            if let Some((target, packet)) = delivery {
                target.push_packet(packet);
            }
        }
    }

    /// Dispatch policy: deliver when the destination is the selected
    /// stream of its kind and is the requester (or passive); queue any
    /// other known destination; reject packets without a table entry so
    /// the caller frees them.
    fn dispatch(
        &self,
        state: &mut DemuxState,
        packet: Packet,
        requester: &dyn Stream,
    ) -> Option<(Arc<dyn Stream>, Packet)> {
        let Some(target) = self.streams.get(&packet.stream_index) else {
            let what = self
                .ignored
                .get(&packet.stream_index)
                .cloned()
                .unwrap_or_else(|| format!("stream {}", packet.stream_index));
            tracing::debug!("'{}' packet dropped", what);
            return None;
        };

        let selected = self.selected_index(target.kind()) == Some(packet.stream_index);
        if selected && (packet.stream_index == requester.index() || target.is_passive()) {
            return Some((target.clone(), packet));
        }

        self.queue_packet(state, packet);
        None
    }

    /// Queue a packet for later delivery, expiring the destination's
    /// oldest queued packet once its cap is reached
    fn queue_packet(&self, state: &mut DemuxState, packet: Packet) {
        let index = packet.stream_index;
        let queued = state
            .pending
            .iter()
            .filter(|p| p.stream_index == index)
            .count();
        if queued >= PENDING_PACKETS_PER_STREAM {
            if let Some(pos) = state.pending.iter().position(|p| p.stream_index == index) {
                state.pending.remove(pos);
                tracing::debug!("pending queue full for stream {}, expired oldest packet", index);
            }
        }
        state.pending.push_back(packet);
    }

    /// Per-frame tick: advance every stream against the clock and feed the
    /// ones that report starvation
    pub fn update(&self) {
        let position = self.clock.position();
        for index in &self.stream_order {
            if let Some(stream) = self.streams.get(index) {
                stream.update(position);
                if stream.needs_more_data() {
                    if let Err(e) = self.feed(stream) {
                        tracing::error!("feeding stream {} failed: {}", index, e);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Stream selection
    // ------------------------------------------------------------------------

    /// Make `stream_index` the active consumer of its kind.
    ///
    /// Legal only while the transport is stopped; the previously selected
    /// stream of that kind is disconnected first.
    pub fn select_stream(&self, stream_index: usize) -> Result<(), DemuxError> {
        let status = self.clock.status();
        if status != PlaybackStatus::Stopped {
            return Err(DemuxError::SelectionNotStopped { status });
        }

        let stream = self
            .streams
            .get(&stream_index)
            .cloned()
            .ok_or(DemuxError::UnknownStream(stream_index))?;
        let kind = stream.kind();

        let mut selected = self.selected.lock();
        if selected.get(&kind) == Some(&stream_index) {
            return Ok(());
        }
        if let Some(old) = selected.get(&kind).and_then(|i| self.streams.get(i)) {
            old.disconnect();
        }
        stream.connect();
        selected.insert(kind, stream_index);
        Ok(())
    }

    /// Select the first-discovered stream of `kind`, if any exists
    pub fn select_first_of_kind(&self, kind: MediaKind) -> Result<(), DemuxError> {
        let first = self
            .stream_order
            .iter()
            .copied()
            .find(|i| self.streams.get(i).map(|s| s.kind()) == Some(kind));
        match first {
            Some(index) => self.select_stream(index),
            None => Ok(()),
        }
    }

    /// Disconnect the selected stream of `kind`, leaving none selected
    pub fn deselect(&self, kind: MediaKind) -> Result<(), DemuxError> {
        let status = self.clock.status();
        if status != PlaybackStatus::Stopped {
            return Err(DemuxError::SelectionNotStopped { status });
        }
        if let Some(index) = self.selected.lock().remove(&kind) {
            if let Some(stream) = self.streams.get(&index) {
                stream.disconnect();
            }
        }
        Ok(())
    }

    pub fn selected_stream(&self, kind: MediaKind) -> Option<Arc<dyn Stream>> {
        let index = self.selected_index(kind)?;
        self.streams.get(&index).cloned()
    }

    fn selected_index(&self, kind: MediaKind) -> Option<usize> {
        self.selected.lock().get(&kind).copied()
    }

    // ------------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------------

    pub fn stream(&self, stream_index: usize) -> Option<Arc<dyn Stream>> {
        self.streams.get(&stream_index).cloned()
    }

    /// Descriptors of all streams of `kind`, in discovery order
    pub fn streams_of_kind(&self, kind: MediaKind) -> Vec<StreamDescriptor> {
        self.stream_order
            .iter()
            .filter_map(|i| self.streams.get(i))
            .filter(|s| s.kind() == kind)
            .map(|s| StreamDescriptor {
                kind: s.kind(),
                index: s.index(),
                language: s.language(),
            })
            .collect()
    }

    /// Streams the container reported but this crate cannot decode
    pub fn ignored_streams(&self) -> &HashMap<usize, String> {
        &self.ignored
    }

    /// Media duration; zero when neither the container nor any video
    /// stream reported one
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_eof(&self) -> bool {
        self.state.lock().eof
    }

    /// Packets currently buffered for streams other than their requester
    pub fn pending_packets(&self) -> usize {
        self.state.lock().pending.len()
    }
}

/// Remove and return the first queued packet owned by `stream`,
/// preserving queue order for every other entry
fn take_queued(pending: &mut VecDeque<Packet>, stream: &dyn Stream) -> Option<Packet> {
    let pos = pending.iter().position(|p| stream.owns_packet(p))?;
    pending.remove(pos)
}

// ============================================================================
// Transport Reactions
// ============================================================================

impl TransportObserver for Demuxer {
    /// A seek invalidates everything buffered: clear end-of-file, flush
    /// the pending queue and every stream, then re-anchor the container
    /// cursor with a backward seek. A failed seek is logged and playback
    /// continues from wherever the cursor landed.
    fn will_seek(&self, position: Duration) {
        let mut state = self.state.lock();
        state.eof = false;

        let flushed = state.pending.len();
        state.pending.clear();
        if flushed > 0 {
            tracing::debug!("flushed {} pending packets before seek", flushed);
        }
        for stream in self.streams.values() {
            stream.flush();
        }

        let (target_us, mode) = if state.container.seeks_by_pts() {
            (
                state.container.start_time_us().unwrap_or(0),
                SeekMode::PresentationTime,
            )
        } else {
            (0, SeekMode::DecodeTime)
        };

        match state.container.seek(target_us, mode) {
            Ok(()) => tracing::debug!("seek anchored at timestamp {}us", target_us),
            Err(e) => tracing::error!(
                "error while seeking at time {}ms: {}",
                position.as_millis(),
                e
            ),
        }
    }
}

impl Drop for Demuxer {
    fn drop(&mut self) {
        if self.clock.status() != PlaybackStatus::Stopped {
            self.clock.stop();
        }
        let observer: Weak<dyn TransportObserver> = self.weak_self.clone();
        self.clock.unsubscribe(&observer);

        // Packets own their payloads, so clearing the queue and dropping
        // the container handle can happen in either order.
        self.state.lock().pending.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::StreamInfo;
    use bytes::Bytes;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    // --- scripted container ---

    struct MockContainer {
        streams: Vec<StreamInfo>,
        script: Arc<PlMutex<VecDeque<Packet>>>,
        duration: Option<Duration>,
        start_time_us: Option<i64>,
        seeks_by_pts: bool,
        fail_seek: bool,
        seeks: Arc<PlMutex<Vec<(i64, SeekMode)>>>,
    }

    impl MockContainer {
        fn new(streams: Vec<StreamInfo>, packets: Vec<Packet>) -> Self {
            Self {
                streams,
                script: Arc::new(PlMutex::new(packets.into())),
                duration: None,
                start_time_us: None,
                seeks_by_pts: false,
                fail_seek: false,
                seeks: Arc::new(PlMutex::new(Vec::new())),
            }
        }
    }

    impl Container for MockContainer {
        fn streams(&self) -> &[StreamInfo] {
            &self.streams
        }
        fn duration(&self) -> Option<Duration> {
            self.duration
        }
        fn start_time_us(&self) -> Option<i64> {
            self.start_time_us
        }
        fn seeks_by_pts(&self) -> bool {
            self.seeks_by_pts
        }
        fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError> {
            Ok(self.script.lock().pop_front())
        }
        fn seek(&mut self, target_us: i64, mode: SeekMode) -> Result<(), ContainerError> {
            if self.fail_seek {
                return Err(ContainerError::Seek("scripted failure".to_string()));
            }
            self.seeks.lock().push((target_us, mode));
            Ok(())
        }
    }

    // --- recording delegate ---

    struct RecordingDelegate {
        delivered: PlMutex<Vec<(usize, Option<i64>)>>,
    }

    impl RecordingDelegate {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: PlMutex::new(Vec::new()),
            })
        }
    }

    impl VideoDelegate for RecordingDelegate {
        fn on_packet_due(&self, stream_index: usize, packet: Packet) {
            self.delivered.lock().push((stream_index, packet.pts_us));
        }
    }

    // --- helpers ---

    fn video_info(index: usize) -> StreamInfo {
        StreamInfo {
            index,
            kind: MediaKind::Video,
            codec_id: "V_MPEG4/ISO/AVC".to_string(),
            language: Some("eng".to_string()),
            duration: None,
        }
    }

    fn audio_info(index: usize) -> StreamInfo {
        StreamInfo {
            index,
            kind: MediaKind::Audio,
            codec_id: "A_AAC".to_string(),
            language: None,
            duration: None,
        }
    }

    fn packet(index: usize, pts_us: i64) -> Packet {
        Packet::new(index, Some(pts_us), Bytes::from_static(b"data"))
    }

    fn build(
        container: MockContainer,
    ) -> (Arc<Demuxer>, Arc<PlaybackClock>, Arc<RecordingDelegate>) {
        let clock = Arc::new(PlaybackClock::new());
        let delegate = RecordingDelegate::new();
        let demuxer = Demuxer::new(Box::new(container), clock.clone(), delegate.clone())
            .expect("construction");
        (demuxer, clock, delegate)
    }

    // --- construction & discovery ---

    #[test]
    fn test_discovery_splits_supported_and_ignored() {
        let container = MockContainer::new(vec![video_info(0), audio_info(1)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);

        let videos = demuxer.streams_of_kind(MediaKind::Video);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].index, 0);
        assert_eq!(videos[0].language.as_deref(), Some("eng"));

        assert_eq!(demuxer.ignored_streams().len(), 1);
        assert_eq!(demuxer.ignored_streams().get(&1).unwrap(), "audio/A_AAC");
    }

    #[test]
    fn test_failed_stream_init_is_not_fatal() {
        let mut broken = video_info(0);
        broken.codec_id.clear();
        let container = MockContainer::new(vec![broken, video_info(1)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);

        let videos = demuxer.streams_of_kind(MediaKind::Video);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].index, 1);
    }

    #[test]
    fn test_duration_resolution_order() {
        // Container-level metadata wins
        let mut container = MockContainer::new(vec![video_info(0)], vec![]);
        container.duration = Some(Duration::from_secs(90));
        let (demuxer, _c, _d) = build(container);
        assert_eq!(demuxer.duration(), Duration::from_secs(90));

        // Fall back to the stream's own metadata
        let mut info = video_info(0);
        info.duration = Some(Duration::from_secs(42));
        let (demuxer, _c, _d) = build(MockContainer::new(vec![info], vec![]));
        assert_eq!(demuxer.duration(), Duration::from_secs(42));

        // Zero when neither source knows
        let (demuxer, _c, _d) = build(MockContainer::new(vec![video_info(0)], vec![]));
        assert_eq!(demuxer.duration(), Duration::ZERO);
    }

    // --- feed & dispatch ---

    #[test]
    fn test_feed_delivers_to_selected_and_drops_unknown() {
        // id=1 has no table entry: its packet must be freed, not queued
        let container = MockContainer::new(
            vec![video_info(0), audio_info(1)],
            vec![packet(0, 0), packet(1, 0), packet(0, 40_000)],
        );
        let (demuxer, clock, delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.request_more_data(0).unwrap();

        // Script exhausted, so the loop stopped at end of file
        assert!(demuxer.is_eof());
        assert_eq!(demuxer.pending_packets(), 0);

        // Both id=0 packets reached the stream; the one due at position 0
        // goes to the delegate on the next tick
        clock.play();
        clock.pause();
        demuxer.update();
        let delivered = delegate.delivered.lock();
        assert_eq!(delivered[0], (0, Some(0)));
        assert!(delivered.iter().all(|(index, _)| *index == 0));
    }

    #[test]
    fn test_feed_stops_once_requester_is_satisfied() {
        let packets: Vec<Packet> = (0..40).map(|i| packet(0, i * 40_000)).collect();
        let container = MockContainer::new(vec![video_info(0)], packets);
        let script = container.script.clone();
        let (demuxer, _clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.request_more_data(0).unwrap();

        // Only as much as the stream's decode-ahead buffer required
        assert!(!demuxer.is_eof());
        assert!(!script.lock().is_empty());
    }

    #[test]
    fn test_unselected_requester_gets_nothing() {
        let container =
            MockContainer::new(vec![video_info(0)], vec![packet(0, 0), packet(0, 40_000)]);
        let script = container.script.clone();
        let (demuxer, _clock, _delegate) = build(container);

        // No stream selected: the cursor must not move
        demuxer.request_more_data(0).unwrap();
        assert_eq!(script.lock().len(), 2);
        assert_eq!(demuxer.pending_packets(), 0);
    }

    #[test]
    fn test_unknown_stream_request_is_rejected() {
        let container = MockContainer::new(vec![video_info(0)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);
        assert!(matches!(
            demuxer.request_more_data(7),
            Err(DemuxError::UnknownStream(7))
        ));
    }

    #[test]
    fn test_packet_for_unselected_sibling_is_queued_then_flushed() {
        // Two video streams, A=0 selected, B=1 not: B's packet is queued,
        // never delivered, and freed by the seek flush
        let container = MockContainer::new(
            vec![video_info(0), video_info(1)],
            vec![packet(1, 0), packet(0, 0)],
        );
        let seeks = container.seeks.clone();
        let (demuxer, clock, delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.request_more_data(0).unwrap();
        assert_eq!(demuxer.pending_packets(), 1);

        clock.seek_to(Duration::from_secs(10));
        assert_eq!(demuxer.pending_packets(), 0);
        assert!(!demuxer.is_eof());
        assert_eq!(seeks.lock().as_slice(), &[(0, SeekMode::DecodeTime)]);

        // Isolation: nothing for B ever reached a consumer
        demuxer.update();
        assert!(delegate.delivered.lock().iter().all(|(index, _)| *index != 1));
    }

    #[test]
    fn test_queued_packets_consumed_before_cursor_moves() {
        // Two stream-1 packets land in the queue while stream 0 is
        // selected; once 1 takes over, its feed must drain those before
        // touching the cursor again
        let mut packets = vec![packet(1, 0), packet(1, 40_000)];
        packets.extend((0..20).map(|i| packet(0, i * 40_000)));
        let container = MockContainer::new(vec![video_info(0), video_info(1)], packets);
        let (demuxer, _clock, delegate) = build(container);

        demuxer.select_stream(0).unwrap();
        demuxer.request_more_data(0).unwrap();
        assert!(!demuxer.is_eof());
        assert_eq!(demuxer.pending_packets(), 2);

        demuxer.select_stream(1).unwrap();
        demuxer.request_more_data(1).unwrap();

        // The two queued stream-1 packets were delivered, everything else
        // read while looking for more is queued for stream 0
        assert!(demuxer.is_eof());
        assert_eq!(demuxer.pending_packets(), 4);

        // And the first of them comes due on the next tick
        demuxer.update();
        assert_eq!(delegate.delivered.lock().first(), Some(&(1, Some(0))));
    }

    #[test]
    fn test_pending_queue_caps_per_stream() {
        let mut packets: Vec<Packet> = (0..(PENDING_PACKETS_PER_STREAM as i64 + 8))
            .map(|i| packet(1, i * 40_000))
            .collect();
        packets.push(packet(0, 0));
        let container = MockContainer::new(vec![video_info(0), video_info(1)], packets);
        let (demuxer, _clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.request_more_data(0).unwrap();
        assert_eq!(demuxer.pending_packets(), PENDING_PACKETS_PER_STREAM);
    }

    #[test]
    fn test_eof_cleared_by_seek() {
        let container = MockContainer::new(vec![video_info(0)], vec![]);
        let (demuxer, clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.request_more_data(0).unwrap();
        assert!(demuxer.is_eof());

        clock.seek_to(Duration::ZERO);
        assert!(!demuxer.is_eof());
    }

    #[test]
    fn test_failed_seek_is_not_fatal() {
        let mut container =
            MockContainer::new(vec![video_info(0), video_info(1)], vec![packet(1, 0)]);
        container.fail_seek = true;
        let (demuxer, clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();
        demuxer.request_more_data(0).unwrap();
        assert_eq!(demuxer.pending_packets(), 1);

        // Buffers are still flushed even though the cursor seek failed
        clock.seek_to(Duration::from_secs(3));
        assert_eq!(demuxer.pending_packets(), 0);
        assert!(!demuxer.is_eof());
    }

    #[test]
    fn test_pts_capable_container_seeks_from_start_time() {
        let mut container = MockContainer::new(vec![video_info(0)], vec![]);
        container.seeks_by_pts = true;
        container.start_time_us = Some(100);
        let seeks = container.seeks.clone();
        let (_demuxer, clock, _delegate) = build(container);

        clock.seek_to(Duration::from_secs(1));
        assert_eq!(seeks.lock().as_slice(), &[(100, SeekMode::PresentationTime)]);
    }

    // --- selection ---

    #[test]
    fn test_selection_rejected_unless_stopped() {
        let container = MockContainer::new(vec![video_info(0), video_info(1)], vec![]);
        let (demuxer, clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        clock.play();
        assert!(matches!(
            demuxer.select_stream(1),
            Err(DemuxError::SelectionNotStopped {
                status: PlaybackStatus::Playing
            })
        ));

        clock.pause();
        assert!(demuxer.select_stream(1).is_err());

        // Selection unchanged by the rejected calls
        let selected = demuxer.selected_stream(MediaKind::Video).unwrap();
        assert_eq!(selected.index(), 0);
    }

    #[test]
    fn test_select_swaps_connection() {
        let container = MockContainer::new(vec![video_info(0), video_info(1)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);

        demuxer.select_stream(0).unwrap();
        assert!(demuxer.stream(0).unwrap().is_connected());

        demuxer.select_stream(1).unwrap();
        assert!(!demuxer.stream(0).unwrap().is_connected());
        assert!(demuxer.stream(1).unwrap().is_connected());
        assert_eq!(
            demuxer.selected_stream(MediaKind::Video).unwrap().index(),
            1
        );
    }

    #[test]
    fn test_select_first_of_kind() {
        let container =
            MockContainer::new(vec![audio_info(0), video_info(3), video_info(5)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);

        demuxer.select_first_of_kind(MediaKind::Video).unwrap();
        assert_eq!(
            demuxer.selected_stream(MediaKind::Video).unwrap().index(),
            3
        );

        // No audio stream was built, so this is a no-op
        demuxer.select_first_of_kind(MediaKind::Audio).unwrap();
        assert!(demuxer.selected_stream(MediaKind::Audio).is_none());
    }

    #[test]
    fn test_deselect_disconnects() {
        let container = MockContainer::new(vec![video_info(0)], vec![]);
        let (demuxer, _clock, _delegate) = build(container);
        demuxer.select_stream(0).unwrap();

        demuxer.deselect(MediaKind::Video).unwrap();
        assert!(demuxer.selected_stream(MediaKind::Video).is_none());
        assert!(!demuxer.stream(0).unwrap().is_connected());
    }

    // --- teardown ---

    #[test]
    fn test_drop_stops_transport_and_unsubscribes() {
        let container = MockContainer::new(vec![video_info(0)], vec![]);
        let (demuxer, clock, _delegate) = build(container);
        clock.play();

        drop(demuxer);
        assert_eq!(clock.status(), PlaybackStatus::Stopped);

        // A later seek must not reach the dropped observer
        clock.seek_to(Duration::from_secs(1));
    }
}
