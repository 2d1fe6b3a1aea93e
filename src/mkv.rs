//! # MKV Container Backend
//!
//! `Container` implementation for Matroska/WebM files using the
//! matroska-demuxer crate. Track numbers double as the container-assigned
//! stream identifiers so packets and probe metadata line up.
//!
//! matroska-demuxer has no cue-based seeking, and the demuxer core only
//! ever requests backward seeks anchored at the earliest point, so `seek`
//! is realized by reopening the file and restarting the cursor.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use matroska_demuxer::{Frame, MatroskaFile, TrackEntry, TrackType};

use crate::container::{Container, ContainerError, SeekMode, StreamInfo};
use crate::media::MediaKind;
use crate::packet::Packet;

fn kind_of(track: &TrackEntry) -> MediaKind {
    match track.track_type() {
        TrackType::Video => MediaKind::Video,
        TrackType::Audio => MediaKind::Audio,
        TrackType::Subtitle => MediaKind::Subtitle,
        _ => MediaKind::Unknown,
    }
}

fn language_of(track: &TrackEntry) -> Option<String> {
    match track.language() {
        Some("und") | None => None,
        Some(lang) => Some(lang.to_string()),
    }
}

/// Matroska container with a sequential packet cursor
pub struct MkvContainer {
    path: PathBuf,
    mkv: MatroskaFile<File>,
    frame: Frame,
    streams: Vec<StreamInfo>,
    duration: Option<Duration>,
    /// Nanoseconds per timestamp tick
    timestamp_scale: u64,
}

impl std::fmt::Debug for MkvContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MkvContainer")
            .field("path", &self.path)
            .field("streams", &self.streams)
            .field("duration", &self.duration)
            .field("timestamp_scale", &self.timestamp_scale)
            .finish_non_exhaustive()
    }
}

impl MkvContainer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let file =
            File::open(&path).map_err(|e| ContainerError::Open(e.to_string()))?;
        let mkv = MatroskaFile::open(file)
            .map_err(|e| ContainerError::Probe(format!("{e:?}")))?;

        let timestamp_scale = mkv.info().timestamp_scale().get();
        let duration = mkv
            .info()
            .duration()
            .map(|ticks| Duration::from_nanos((ticks * timestamp_scale as f64) as u64));

        let streams = mkv
            .tracks()
            .iter()
            .map(|track| StreamInfo {
                index: track.track_number().get() as usize,
                kind: kind_of(track),
                codec_id: track.codec_id().to_string(),
                language: language_of(track),
                // Matroska records duration at segment level only
                duration: None,
            })
            .collect();

        Ok(Self {
            path,
            mkv,
            frame: Frame::default(),
            streams,
            duration,
            timestamp_scale,
        })
    }
}

impl Container for MkvContainer {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn start_time_us(&self) -> Option<i64> {
        None
    }

    fn seeks_by_pts(&self) -> bool {
        false
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError> {
        match self.mkv.next_frame(&mut self.frame) {
            Ok(true) => {
                let pts_ns = self.frame.timestamp.saturating_mul(self.timestamp_scale);
                Ok(Some(Packet {
                    stream_index: self.frame.track as usize,
                    pts_us: Some((pts_ns / 1_000) as i64),
                    dts_us: None,
                    keyframe: self.frame.is_keyframe.unwrap_or(false),
                    data: Bytes::copy_from_slice(&self.frame.data),
                }))
            }
            Ok(false) => Ok(None),
            Err(e) => Err(ContainerError::Read(format!("{e:?}"))),
        }
    }

    fn seek(&mut self, target_us: i64, _mode: SeekMode) -> Result<(), ContainerError> {
        // Restart the cursor from the top; the core always seeks backward
        // to the earliest point anyway.
        if target_us > 0 {
            tracing::debug!(
                "mkv seek to {}us lands at start of file (no cue index)",
                target_us
            );
        }
        let file =
            File::open(&self.path).map_err(|e| ContainerError::Seek(e.to_string()))?;
        self.mkv =
            MatroskaFile::open(file).map_err(|e| ContainerError::Seek(format!("{e:?}")))?;
        self.frame = Frame::default();
        Ok(())
    }
}
