#![doc = r#"
The derived timeline: two ascending chains of change points that project
tick positions into wall-clock microseconds and musical bar:beat positions.

Both chains are derived data, rebuilt from the decoded event lists and never
persisted. They are extended track by track while a file is decoded and
rebuilt from scratch (change events gathered across every decoded track,
sorted by tick) whenever an edit touches a tempo or time-signature event.

A chain must never be empty once built: when a file declares no tempo or no
time signature, a synthetic default (120 BPM, 4/4) stands in at tick 0.
"#]

use crate::file::{MetaEvent, TimeSignature, Timing, Track, TrackEvent, TrackMessage};

/// Tempo assumed when a file declares none: 500 000 µs per quarter note,
/// 120 beats per minute.
pub const DEFAULT_MICROS_PER_QUARTER_NOTE: u32 = 500_000;

/// A point on the tempo chain: from `ticks` onward, one tick lasts
/// `micros_per_tick` microseconds, and `micros` of wall-clock time have
/// elapsed at `ticks` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TempoChange {
    ticks: u32,
    micros: u64,
    micros_per_tick: f64,
}

impl TempoChange {
    /// The tick at which this tempo takes effect.
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Microseconds elapsed from tick 0 to this point.
    pub const fn micros(&self) -> u64 {
        self.micros
    }

    /// Tick length under this tempo.
    pub const fn micros_per_tick(&self) -> f64 {
        self.micros_per_tick
    }

    /// Project this point's rate forward to an at-or-after tick position.
    pub(crate) fn project(&self, ticks: u32) -> u64 {
        let elapsed = ticks.saturating_sub(self.ticks);
        self.micros + (f64::from(elapsed) * self.micros_per_tick) as u64
    }

    /// The synthetic 120 BPM point standing in for an absent tempo map.
    pub(crate) fn default_point(timing: Timing) -> Self {
        Self {
            ticks: 0,
            micros: 0,
            micros_per_tick: timing.micros_per_tick(DEFAULT_MICROS_PER_QUARTER_NOTE),
        }
    }
}

/// A point on the time-signature chain: `signature` is in effect from
/// `ticks` onward, and `bar` whole bars have elapsed at `ticks` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSignatureChange {
    ticks: u32,
    bar: u16,
    signature: TimeSignature,
}

impl TimeSignatureChange {
    /// The tick at which this signature takes effect.
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Bars elapsed from tick 0 to this point, counted under the signatures
    /// previously in effect.
    pub const fn bar(&self) -> u16 {
        self.bar
    }

    /// The signature in effect from this point on.
    pub const fn signature(&self) -> TimeSignature {
        self.signature
    }

    /// The synthetic 4/4 point standing in for an absent signature map.
    pub(crate) fn default_point() -> Self {
        Self {
            ticks: 0,
            bar: 0,
            signature: TimeSignature::default(),
        }
    }
}

/// A musical position: a whole bar count plus the quarter-note-relative
/// offset into the bar.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarTime {
    /// Whole bars elapsed (bar 0 is the first).
    pub bar: u16,
    /// Position within the bar, in quarter notes.
    pub beat: f64,
}

pub(crate) trait ChainPoint {
    fn chain_ticks(&self) -> u32;
}

impl ChainPoint for TempoChange {
    fn chain_ticks(&self) -> u32 {
        self.ticks
    }
}

impl ChainPoint for TimeSignatureChange {
    fn chain_ticks(&self) -> u32 {
        self.ticks
    }
}

/// The last point at or before `ticks`, clamped to the first point when
/// every point lies after it. `None` only for an empty chain.
pub(crate) fn last_at_or_before<P: ChainPoint>(chain: &[P], ticks: u32) -> Option<&P> {
    if chain.is_empty() {
        return None;
    }
    match chain.partition_point(|point| point.chain_ticks() <= ticks) {
        0 => chain.first(),
        index => Some(&chain[index - 1]),
    }
}

/// Microseconds elapsed at `ticks`, projected from the governing chain
/// point. An empty chain projects from the synthetic default.
pub(crate) fn micros_at(chain: &[TempoChange], timing: Timing, ticks: u32) -> u64 {
    if ticks == 0 {
        return 0;
    }
    match last_at_or_before(chain, ticks) {
        Some(point) => point.project(ticks),
        None => TempoChange::default_point(timing).project(ticks),
    }
}

/// Bar and beat position of `ticks` under the governing chain point. An
/// empty chain falls back to 4/4 from tick 0.
pub(crate) fn bar_at(chain: &[TimeSignatureChange], ticks: u32) -> BarTime {
    if ticks == 0 {
        return BarTime { bar: 0, beat: 0.0 };
    }
    let fallback;
    let point = match last_at_or_before(chain, ticks) {
        Some(point) => point,
        None => {
            fallback = TimeSignatureChange::default_point();
            &fallback
        }
    };
    let sig = point.signature;
    let beat_unit = 2f64.powi(i32::from(sig.denominator));
    // Ticks per bar under a signature: clocks_per_metronome * numerator * 16
    // divided by the beat unit.
    let bar = f64::from(point.bar)
        + f64::from(ticks.saturating_sub(point.ticks)) * beat_unit
            / f64::from(sig.clocks_per_metronome)
            / f64::from(sig.numerator)
            / 16.0;
    let whole = bar as u16;
    BarTime {
        bar: whole,
        beat: (bar - f64::from(whole)) * f64::from(sig.numerator) / beat_unit * 4.0,
    }
}

/// Append the chain points contributed by one track's events, in order.
///
/// Each tempo point's elapsed-micros anchor and each signature point's bar
/// anchor are computed against the chain as built so far, so a point always
/// reflects the rates in effect before it.
pub(crate) fn extend_from_events(
    events: &[TrackEvent],
    timing: Timing,
    tempo_chain: &mut Vec<TempoChange>,
    signature_chain: &mut Vec<TimeSignatureChange>,
) {
    for event in events {
        match event.message() {
            TrackMessage::Meta(MetaEvent::SetTempo(mpq)) => {
                push_tempo(tempo_chain, timing, event.ticks(), *mpq);
            }
            TrackMessage::Meta(MetaEvent::TimeSignature(signature)) => {
                push_signature(signature_chain, event.ticks(), *signature);
            }
            _ => {}
        }
    }
}

/// Insert the synthetic defaults into whichever chains are still empty.
pub(crate) fn ensure_defaults(
    timing: Timing,
    tempo_chain: &mut Vec<TempoChange>,
    signature_chain: &mut Vec<TimeSignatureChange>,
) {
    if tempo_chain.is_empty() {
        tempo_chain.push(TempoChange::default_point(timing));
    }
    if signature_chain.is_empty() {
        signature_chain.push(TimeSignatureChange::default_point());
    }
}

fn push_tempo(chain: &mut Vec<TempoChange>, timing: Timing, ticks: u32, mpq: u32) {
    let micros = micros_at(chain, timing, ticks);
    chain.push(TempoChange {
        ticks,
        micros,
        micros_per_tick: timing.micros_per_tick(mpq),
    });
}

fn push_signature(chain: &mut Vec<TimeSignatureChange>, ticks: u32, signature: TimeSignature) {
    let bar = bar_at(chain, ticks).bar;
    chain.push(TimeSignatureChange {
        ticks,
        bar,
        signature,
    });
}

/// Rebuild the tempo chain from scratch: gather every set-tempo event across
/// the decoded tracks, sort by tick, fold, and default if nothing was found.
pub(crate) fn rebuild_tempo_chain(
    tracks: &[Track],
    timing: Timing,
    chain: &mut Vec<TempoChange>,
) {
    chain.clear();
    let mut changes: Vec<(u32, u32)> = Vec::new();
    for track in tracks.iter().filter(|track| track.is_decoded()) {
        for event in track.events() {
            if let TrackMessage::Meta(MetaEvent::SetTempo(mpq)) = event.message() {
                changes.push((event.ticks(), *mpq));
            }
        }
    }
    changes.sort_by_key(|(ticks, _)| *ticks);
    for (ticks, mpq) in changes {
        push_tempo(chain, timing, ticks, mpq);
    }
    if chain.is_empty() {
        chain.push(TempoChange::default_point(timing));
    }
}

/// Rebuild the time-signature chain from scratch, like
/// [`rebuild_tempo_chain`].
pub(crate) fn rebuild_signature_chain(tracks: &[Track], chain: &mut Vec<TimeSignatureChange>) {
    chain.clear();
    let mut changes: Vec<(u32, TimeSignature)> = Vec::new();
    for track in tracks.iter().filter(|track| track.is_decoded()) {
        for event in track.events() {
            if let TrackMessage::Meta(MetaEvent::TimeSignature(signature)) = event.message() {
                changes.push((event.ticks(), *signature));
            }
        }
    }
    changes.sort_by_key(|(ticks, _)| *ticks);
    for (ticks, signature) in changes {
        push_signature(chain, ticks, signature);
    }
    if chain.is_empty() {
        chain.push(TimeSignatureChange::default_point());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: Timing = Timing::Metrical {
        ticks_per_quarter_note: 96,
    };

    fn tempo_chain(points: &[(u32, u32)]) -> Vec<TempoChange> {
        let mut chain = Vec::new();
        for (ticks, mpq) in points {
            push_tempo(&mut chain, TIMING, *ticks, *mpq);
        }
        chain
    }

    #[test]
    fn tempo_points_anchor_on_the_previous_rate() {
        // 120 BPM for one quarter note, then 60 BPM.
        let chain = tempo_chain(&[(0, 500_000), (96, 1_000_000)]);
        assert_eq!(chain[1].micros(), 500_000);

        assert_eq!(micros_at(&chain, TIMING, 96), 500_000);
        // One more quarter note at the slower rate.
        assert_eq!(micros_at(&chain, TIMING, 192), 1_500_000);
    }

    #[test]
    fn first_tempo_point_past_tick_zero_projects_from_the_default() {
        let chain = tempo_chain(&[(96, 1_000_000)]);
        // The first quarter note ran at the default 120 BPM.
        assert_eq!(chain[0].micros(), 500_000);
    }

    #[test]
    fn queries_before_the_first_point_clamp_to_it() {
        let chain = tempo_chain(&[(96, 1_000_000)]);
        // Clamped to the first point's rate, saturating the tick delta.
        assert_eq!(micros_at(&chain, TIMING, 48), 500_000);
        assert_eq!(micros_at(&chain, TIMING, 0), 0);
    }

    #[test]
    fn bar_math_in_common_time() {
        let chain = vec![TimeSignatureChange::default_point()];
        // 96 ticks per quarter, 4 quarters per bar.
        assert_eq!(bar_at(&chain, 0), BarTime { bar: 0, beat: 0.0 });
        let half = bar_at(&chain, 192);
        assert_eq!(half.bar, 0);
        assert!((half.beat - 2.0).abs() < 1e-9);
        assert_eq!(bar_at(&chain, 384).bar, 1);
        assert_eq!(bar_at(&chain, 3840).bar, 10);
    }

    #[test]
    fn signature_change_keeps_the_accumulated_bar_count() {
        let mut chain = Vec::new();
        // Two bars of 4/4, then 3/4.
        push_signature(&mut chain, 768, TimeSignature {
            numerator: 3,
            denominator: 2,
            clocks_per_metronome: 24,
            thirty_seconds_per_quarter: 8,
        });
        assert_eq!(chain[0].bar(), 2);
        // One 3/4 bar is 288 ticks at this tick rate.
        assert_eq!(bar_at(&chain, 768 + 288).bar, 3);
    }

    #[test]
    fn queries_are_monotonic() {
        let chain = tempo_chain(&[(0, 500_000), (96, 250_000), (192, 1_000_000)]);
        let mut last = 0;
        for ticks in (0..512).step_by(7) {
            let micros = micros_at(&chain, TIMING, ticks);
            assert!(micros >= last);
            last = micros;
        }
    }
}
