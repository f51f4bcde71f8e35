#![doc = r#"
The file-level codec: the outer `MThd` header and the set of `MTrk` chunks.

A [`MidiFile`] is created either by parsing bytes or by explicit
construction. Parsing reads the header and records each track's raw byte
span without decoding it — decoding is a separate, explicitly invoked step
per track, so headers can be inspected cheaply. Once tracks are decoded the
file also carries the derived tempo and time-signature chains used by the
[`micros_at`](MidiFile::micros_at) and [`bar_at`](MidiFile::bar_at) queries.
"#]

mod format;
pub use format::*;

mod timing;
pub use timing::*;

mod track;
pub use track::*;

mod event;
pub use event::*;

mod meta;
pub use meta::*;

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{CodecError, CodecResult, ErrorKind, LoadError};
use crate::reader::Reader;
use crate::timeline::{self, BarTime, TempoChange, TimeSignatureChange};

const HEADER_CONTENT_LEN: u32 = 6;

#[doc = r#"
A Standard MIDI File: header fields, tracks, and the derived timeline.

# Consistency

The codec is synchronous and performs no locking. A decoded file published to
a reader thread must either be treated as an immutable snapshot (swapped by
reference when a new file is loaded) or be protected by a single-writer
discipline around in-place edits; interleaving edits with concurrent reads is
not safe without external synchronization.
"#]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiFile {
    pub(crate) format: FormatType,
    pub(crate) timing: Timing,
    pub(crate) tracks: Vec<Track>,
    pub(crate) tempo_chain: Vec<TempoChange>,
    pub(crate) time_signature_chain: Vec<TimeSignatureChange>,
}

impl MidiFile {
    /// A fresh single-track file: format 0, division 24, one decoded track
    /// holding a single end-of-track event, default timeline.
    pub fn new() -> Self {
        let mut file = Self {
            format: FormatType::SingleTrack,
            timing: Timing::metrical(24),
            tracks: vec![Track::end_of_track_only()],
            tempo_chain: Vec::new(),
            time_signature_chain: Vec::new(),
        };
        file.extend_timelines(0);
        file
    }

    /// Parse the header and record each track's raw span without decoding.
    ///
    /// Fails with `InvalidHeader` on a bad magic, a header content length
    /// other than 6, an unknown format word or a zero track count; with
    /// `InvalidTrack` on a bad track magic; and with `TruncatedInput` when
    /// the buffer ends early. No partially built file survives a failure.
    pub fn parse(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = Reader::new(bytes);
        if reader.read_array::<4>()? != *b"MThd" {
            return Err(CodecError::new(0, ErrorKind::InvalidHeader));
        }
        if reader.read_u32()? != HEADER_CONTENT_LEN {
            return Err(CodecError::new(4, ErrorKind::InvalidHeader));
        }
        let format_word = reader.read_u16()?;
        let format = FormatType::try_from(format_word)
            .map_err(|_| CodecError::new(8, ErrorKind::InvalidHeader))?;
        let declared_tracks = reader.read_u16()?;
        if declared_tracks == 0 {
            return Err(CodecError::new(10, ErrorKind::InvalidHeader));
        }
        let timing = Timing::from_division(reader.read_u16()?);

        let mut tracks: Vec<Track> = Vec::new();
        tracks
            .try_reserve(usize::from(declared_tracks))
            .map_err(|_| CodecError::new(reader.position(), ErrorKind::AllocationFailure))?;
        for _ in 0..declared_tracks {
            let tag_position = reader.position();
            if reader.read_array::<4>()? != *b"MTrk" {
                return Err(CodecError::new(tag_position, ErrorKind::InvalidTrack));
            }
            let length = reader.read_u32()?;
            let raw = reader.read_exact(length as usize)?;
            tracks.push(Track::from_raw(raw.to_vec()));
        }
        if !reader.at_end() {
            debug!(extra = reader.remaining(), "trailing bytes after the last track");
        }
        debug!(tracks = tracks.len(), ?format, "parsed file header");

        Ok(Self {
            format,
            timing,
            tracks,
            tempo_chain: Vec::new(),
            time_signature_chain: Vec::new(),
        })
    }

    /// Parse and decode every track, yielding a fully decoded file or an
    /// error — a partially decoded file never escapes.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut file = Self::parse(bytes)?;
        file.decode_all_tracks()?;
        Ok(file)
    }

    /// Read and fully decode a file from disk.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }

    /// Encode and write the file to disk.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        let bytes = self.encode()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Decode one track's raw span into its event list and extend the
    /// timeline chains with the change events it contributes. A no-op for a
    /// track that is already decoded.
    ///
    /// Error positions are offsets into the track's data bytes.
    pub fn decode_track(&mut self, index: usize) -> CodecResult<()> {
        if index >= self.tracks.len() {
            return Err(CodecError::new(0, ErrorKind::InvalidTrack));
        }
        if self.tracks[index].is_decoded() {
            return Ok(());
        }
        self.tracks[index].decode_events()?;
        self.extend_timelines(index);
        Ok(())
    }

    /// Decode every track in order, stopping at the first failure.
    pub fn decode_all_tracks(&mut self) -> CodecResult<()> {
        for index in 0..self.tracks.len() {
            self.decode_track(index)?;
        }
        Ok(())
    }

    /// Serialize the file back to bytes.
    ///
    /// Every track must be decoded (`InvalidTrack` otherwise): the event
    /// lists are authoritative, raw spans are parse-time input only.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let track_count = u16::try_from(self.tracks.len())
            .map_err(|_| CodecError::new(0, ErrorKind::InvalidTrack))?;

        let mut out = Vec::new();
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&HEADER_CONTENT_LEN.to_be_bytes());
        out.extend_from_slice(&u16::from(self.format).to_be_bytes());
        out.extend_from_slice(&track_count.to_be_bytes());
        out.extend_from_slice(&self.timing.to_division().to_be_bytes());

        for (index, track) in self.tracks.iter().enumerate() {
            if !track.is_decoded() {
                return Err(CodecError::new(index, ErrorKind::InvalidTrack));
            }
            let body = track.encode_events();
            let length = u32::try_from(body.len())
                .map_err(|_| CodecError::new(index, ErrorKind::InvalidTrack))?;
            out.extend_from_slice(b"MTrk");
            out.extend_from_slice(&length.to_be_bytes());
            out.extend_from_slice(&body);
        }
        Ok(out)
    }

    /// The format word of the header.
    pub const fn format(&self) -> FormatType {
        self.format
    }

    /// The division word of the header.
    pub const fn timing(&self) -> Timing {
        self.timing
    }

    /// The tracks, in file order. Always at least one.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The number of tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// The derived tempo chain, ascending by tick.
    pub fn tempo_chain(&self) -> &[TempoChange] {
        &self.tempo_chain
    }

    /// The derived time-signature chain, ascending by tick.
    pub fn time_signature_chain(&self) -> &[TimeSignatureChange] {
        &self.time_signature_chain
    }

    /// Wall-clock microseconds elapsed at a tick position.
    ///
    /// Tick 0 is always 0. The chain must not be empty — guaranteed after
    /// any decode or edit; queried empty anyway, the call falls back to the
    /// 120 BPM default in release builds.
    pub fn micros_at(&self, ticks: u32) -> u64 {
        debug_assert!(
            !self.tempo_chain.is_empty() || ticks == 0,
            "tempo chain queried while empty"
        );
        timeline::micros_at(&self.tempo_chain, self.timing, ticks)
    }

    /// The musical bar:beat position of a tick.
    ///
    /// Same emptiness contract as [`micros_at`](Self::micros_at), with 4/4
    /// as the release fallback.
    pub fn bar_at(&self, ticks: u32) -> BarTime {
        debug_assert!(
            !self.time_signature_chain.is_empty() || ticks == 0,
            "time-signature chain queried while empty"
        );
        timeline::bar_at(&self.time_signature_chain, ticks)
    }

    /// Rebuild the tempo chain from every decoded track.
    pub fn rebuild_tempo_chain(&mut self) {
        timeline::rebuild_tempo_chain(&self.tracks, self.timing, &mut self.tempo_chain);
    }

    /// Rebuild the time-signature chain from every decoded track.
    pub fn rebuild_time_signature_chain(&mut self) {
        timeline::rebuild_signature_chain(&self.tracks, &mut self.time_signature_chain);
    }

    /// Append one track's contribution to both chains, inserting the
    /// defaults if a chain is still empty afterwards.
    fn extend_timelines(&mut self, index: usize) {
        let Self {
            tracks,
            timing,
            tempo_chain,
            time_signature_chain,
            ..
        } = self;
        timeline::extend_from_events(
            tracks[index].events(),
            *timing,
            tempo_chain,
            time_signature_chain,
        );
        timeline::ensure_defaults(*timing, tempo_chain, time_signature_chain);
    }
}

impl Default for MidiFile {
    fn default() -> Self {
        Self::new()
    }
}
