//! In-place mutation of a decoded file.
//!
//! Every mutation re-derives the mutated track's absolute ticks before any
//! timeline or query is trusted, and rebuilds the affected file-global
//! chain(s) whenever a tempo or time-signature event is involved. Chains are
//! file-global because tempo and time signature apply across all tracks of a
//! multi-track file; rebuilding them wholesale on every relevant edit trades
//! efficiency for correctness at editor-scale file sizes.

use tracing::debug;

use crate::error::EditError;
use crate::file::{FormatType, MetaEvent, MidiFile, Timing, Track, TrackEvent, TrackMessage};
use crate::varlen::VARLEN_MAX;

/// Which chains an edit touched.
#[derive(Debug, Clone, Copy, Default)]
struct ChainTouch {
    tempo: bool,
    signature: bool,
}

impl ChainTouch {
    fn of(message: &TrackMessage) -> Self {
        Self {
            tempo: matches!(message, TrackMessage::Meta(MetaEvent::SetTempo(_))),
            signature: matches!(message, TrackMessage::Meta(MetaEvent::TimeSignature(_))),
        }
    }

    const BOTH: Self = Self {
        tempo: true,
        signature: true,
    };
}

impl MidiFile {
    /// Insert an event at `position` of a decoded track.
    pub fn insert_event(
        &mut self,
        track: usize,
        position: usize,
        event: TrackEvent,
    ) -> Result<(), EditError> {
        let target = self.decoded_track_mut(track)?;
        if position > target.events().len() {
            return Err(EditError::PositionOutOfRange(position));
        }
        let touch = ChainTouch::of(event.message());
        target.events_mut().insert(position, event);
        target.recompute_times();
        self.rebuild_touched(touch);
        debug!(track, position, "inserted event");
        Ok(())
    }

    /// Remove and return the event at `position` of a decoded track.
    pub fn remove_event(&mut self, track: usize, position: usize) -> Result<TrackEvent, EditError> {
        let target = self.decoded_track_mut(track)?;
        if position >= target.events().len() {
            return Err(EditError::PositionOutOfRange(position));
        }
        let event = target.events_mut().remove(position);
        target.recompute_times();
        self.rebuild_touched(ChainTouch::of(event.message()));
        debug!(track, position, "removed event");
        Ok(event)
    }

    /// Change the delta-time of an event, shifting everything after it.
    ///
    /// The delta is capped at the var-len maximum of 28 bits. Chains are
    /// rebuilt when any shifted event feeds them.
    pub fn set_event_delta(
        &mut self,
        track: usize,
        position: usize,
        delta_ticks: u32,
    ) -> Result<(), EditError> {
        let target = self.decoded_track_mut(track)?;
        if position >= target.events().len() {
            return Err(EditError::PositionOutOfRange(position));
        }
        let touch = target.events()[position..]
            .iter()
            .map(|event| ChainTouch::of(event.message()))
            .fold(ChainTouch::default(), |acc, t| ChainTouch {
                tempo: acc.tempo || t.tempo,
                signature: acc.signature || t.signature,
            });
        target.events_mut()[position].set_delta_ticks(delta_ticks.min(VARLEN_MAX));
        target.recompute_times();
        self.rebuild_touched(touch);
        Ok(())
    }

    /// Insert an empty track (a lone end-of-track event) at `index`.
    pub fn add_track(&mut self, index: usize) -> Result<(), EditError> {
        if index > self.tracks.len() {
            return Err(EditError::TrackOutOfRange(index));
        }
        self.tracks.insert(index, Track::end_of_track_only());
        debug!(index, total = self.tracks.len(), "added track");
        Ok(())
    }

    /// Remove and return the track at `index`.
    ///
    /// Refuses to remove the last remaining track: a file always owns at
    /// least one.
    pub fn remove_track(&mut self, index: usize) -> Result<Track, EditError> {
        if index >= self.tracks.len() {
            return Err(EditError::TrackOutOfRange(index));
        }
        if self.tracks.len() == 1 {
            return Err(EditError::LastTrack);
        }
        let track = self.tracks.remove(index);
        self.rebuild_touched(ChainTouch {
            tempo: track.has_tempo_events(),
            signature: track.has_time_signature_events(),
        });
        debug!(index, total = self.tracks.len(), "removed track");
        Ok(track)
    }

    /// Exchange two tracks' positions in the file.
    pub fn swap_tracks(&mut self, a: usize, b: usize) -> Result<(), EditError> {
        let out_of_range = [a, b].into_iter().find(|&i| i >= self.tracks.len());
        if let Some(index) = out_of_range {
            return Err(EditError::TrackOutOfRange(index));
        }
        self.tracks.swap(a, b);
        self.rebuild_touched(ChainTouch::BOTH);
        Ok(())
    }

    /// Change the format word.
    pub fn set_format(&mut self, format: FormatType) {
        self.format = format;
    }

    /// Change the division word. The tempo chain depends on it, so it is
    /// rebuilt.
    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
        self.rebuild_tempo_chain();
    }

    fn decoded_track_mut(&mut self, index: usize) -> Result<&mut Track, EditError> {
        let track = self
            .tracks
            .get_mut(index)
            .ok_or(EditError::TrackOutOfRange(index))?;
        if !track.is_decoded() {
            return Err(EditError::Undecoded(index));
        }
        Ok(track)
    }

    fn rebuild_touched(&mut self, touch: ChainTouch) {
        if touch.tempo {
            self.rebuild_tempo_chain();
        }
        if touch.signature {
            self.rebuild_time_signature_chain();
        }
    }
}
