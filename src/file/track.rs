//! A single `MTrk` chunk and its event-level codec.

use tracing::debug;

use crate::error::{CodecError, CodecResult, ErrorKind};
use crate::file::event::{TrackEvent, TrackMessage};
use crate::file::meta::MetaEvent;
use crate::reader::Reader;

#[doc = r#"
One track of a file.

A track is in one of two states: *raw* (only the undecoded byte span is
known, as read from the file) or *decoded* (the event list is populated,
ordered by non-decreasing absolute tick). Decoding is a separate, explicitly
invoked step so a caller may inspect file headers without paying for event
parsing.
"#]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    raw: Vec<u8>,
    decoded: bool,
    events: Vec<TrackEvent>,
}

impl Track {
    /// A raw, undecoded track owning a copy of its byte span.
    pub(crate) fn from_raw(raw: Vec<u8>) -> Self {
        Self {
            raw,
            decoded: false,
            events: Vec::new(),
        }
    }

    /// A decoded track built directly from events.
    pub(crate) fn from_events(mut events: Vec<TrackEvent>) -> Self {
        recompute_times(&mut events);
        Self {
            raw: Vec::new(),
            decoded: true,
            events,
        }
    }

    /// The minimal valid track: a single end-of-track event at tick 0.
    pub(crate) fn end_of_track_only() -> Self {
        Self::from_events(vec![TrackEvent::new(0, TrackMessage::Meta(MetaEvent::EndOfTrack))])
    }

    /// Whether the event list has been populated.
    pub const fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// The length in bytes of the undecoded span read from the file.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// The decoded events; empty while the track is still raw.
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut Vec<TrackEvent> {
        &mut self.events
    }

    /// Decode the raw span into the event list.
    ///
    /// Any failure aborts the whole track: events decoded so far are
    /// discarded and the track stays raw. On success the raw span has served
    /// its purpose; `decoded` flips and the events become authoritative.
    /// Positions in errors are offsets into this track's data bytes.
    pub(crate) fn decode_events(&mut self) -> CodecResult<()> {
        if self.decoded {
            return Ok(());
        }
        let mut events: Vec<TrackEvent> = Vec::new();
        // Events average out at a little over three bytes each.
        events
            .try_reserve(self.raw.len() * 2 / 7)
            .map_err(|_| CodecError::new(0, ErrorKind::AllocationFailure))?;

        let mut reader = Reader::new(&self.raw);
        let mut running_status = None;
        let mut ticks = 0u32;
        while !reader.at_end() {
            let mut event = TrackEvent::read(&mut reader, &mut running_status)?;
            ticks = ticks.wrapping_add(event.delta_ticks());
            event.set_ticks(ticks);
            events.push(event);
        }
        debug!(events = events.len(), bytes = self.raw.len(), "decoded track");
        self.events = events;
        self.decoded = true;
        Ok(())
    }

    /// Serialize the event list to the byte layout of an `MTrk` body (without
    /// the tag and length prefix).
    pub(crate) fn encode_events(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.events.len() * 4);
        for event in &self.events {
            event.write(&mut out);
        }
        out
    }

    /// Re-derive every absolute tick as the running delta sum. Mandatory
    /// after any edit, before the timeline or any query is trusted.
    pub(crate) fn recompute_times(&mut self) {
        recompute_times(&mut self.events);
    }

    /// True if any event of this track feeds the tempo chain.
    pub(crate) fn has_tempo_events(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.message(), TrackMessage::Meta(MetaEvent::SetTempo(_))))
    }

    /// True if any event of this track feeds the time-signature chain.
    pub(crate) fn has_time_signature_events(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e.message(), TrackMessage::Meta(MetaEvent::TimeSignature(_))))
    }
}

fn recompute_times(events: &mut [TrackEvent]) {
    let mut ticks = 0u32;
    for event in events {
        ticks = ticks.wrapping_add(event.delta_ticks());
        event.set_ticks(ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChannelVoiceMessage, VoiceEvent};

    fn note_on(delta: u32, key: u8) -> TrackEvent {
        TrackEvent::new(
            delta,
            TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
                0,
                VoiceEvent::NoteOn { key, velocity: 100 },
            )),
        )
    }

    #[test]
    fn decode_accumulates_absolute_ticks() {
        let mut track = Track::from_raw(vec![
            0x00, 0x90, 0x3C, 0x64, // tick 0
            0x60, 0x3C, 0x00, // running status, tick 96
            0x81, 0x40, 0xFF, 0x2F, 0x00, // end of track at tick 96 + 192
        ]);
        track.decode_events().unwrap();
        assert!(track.is_decoded());
        let ticks: Vec<u32> = track.events().iter().map(TrackEvent::ticks).collect();
        assert_eq!(ticks, [0, 96, 288]);
    }

    #[test]
    fn failed_decode_keeps_track_raw() {
        let mut track = Track::from_raw(vec![0x00, 0x90, 0x3C]);
        let err = track.decode_events().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedEvent);
        assert!(!track.is_decoded());
        assert!(track.events().is_empty());
    }

    #[test]
    fn recompute_times_follows_delta_edits() {
        let mut track =
            Track::from_events(vec![note_on(0, 60), note_on(96, 62), note_on(96, 64)]);
        track.events_mut()[1].set_delta_ticks(48);
        track.recompute_times();
        let ticks: Vec<u32> = track.events().iter().map(TrackEvent::ticks).collect();
        assert_eq!(ticks, [0, 48, 144]);
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let track = Track::from_events(vec![
            note_on(0, 60),
            note_on(96, 62),
            TrackEvent::new(0, TrackMessage::Meta(MetaEvent::EndOfTrack)),
        ]);
        let mut reparsed = Track::from_raw(track.encode_events());
        reparsed.decode_events().unwrap();
        assert_eq!(reparsed.events(), track.events());
    }
}
