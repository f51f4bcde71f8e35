//! The division word of the file header and the tick-length math built on it.

/// How the file's delta times are to be interpreted.
///
/// The top bit of the header's division word selects the interpretation:
/// clear means ticks per quarter note, set means SMPTE — the high byte holds
/// the frame rate negated and the low byte the ticks per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Timing {
    /// Delta times count fractions of a quarter note.
    Metrical {
        /// Ticks per quarter note (1-32767).
        ticks_per_quarter_note: u16,
    },
    /// Delta times count fractions of an SMPTE frame.
    Smpte {
        /// Frames per second, recovered from the negated high byte. Any
        /// value is accepted, not only the four standard rates.
        frames_per_second: u8,
        /// Ticks per frame.
        ticks_per_frame: u8,
    },
}

impl Timing {
    /// Metrical timing with the given tick rate (top bit is dropped).
    pub const fn metrical(ticks_per_quarter_note: u16) -> Self {
        Self::Metrical {
            ticks_per_quarter_note: ticks_per_quarter_note & 0x7FFF,
        }
    }

    /// SMPTE timing from a frame rate and tick subdivision.
    pub const fn smpte(frames_per_second: u8, ticks_per_frame: u8) -> Self {
        Self::Smpte {
            frames_per_second,
            ticks_per_frame,
        }
    }

    /// Decode the raw division word.
    pub(crate) fn from_division(raw: u16) -> Self {
        if raw & 0x8000 == 0 {
            Self::Metrical {
                ticks_per_quarter_note: raw,
            }
        } else {
            Self::Smpte {
                frames_per_second: ((raw >> 8) as u8 as i8).wrapping_neg() as u8,
                ticks_per_frame: (raw & 0xFF) as u8,
            }
        }
    }

    /// Re-encode the division word bit-exactly.
    pub(crate) fn to_division(self) -> u16 {
        match self {
            Self::Metrical {
                ticks_per_quarter_note,
            } => ticks_per_quarter_note & 0x7FFF,
            Self::Smpte {
                frames_per_second,
                ticks_per_frame,
            } => {
                let fps = (frames_per_second as i8).wrapping_neg() as u8;
                u16::from(fps) << 8 | u16::from(ticks_per_frame)
            }
        }
    }

    /// The length of one tick in microseconds, given the current tempo in
    /// microseconds per quarter note. SMPTE timing fixes the tick length
    /// independently of tempo.
    pub fn micros_per_tick(&self, micros_per_quarter_note: u32) -> f64 {
        match self {
            Self::Metrical {
                ticks_per_quarter_note,
            } => f64::from(micros_per_quarter_note) / f64::from(*ticks_per_quarter_note),
            Self::Smpte {
                frames_per_second,
                ticks_per_frame,
            } => 1_000_000.0 / (f64::from(*frames_per_second) * f64::from(*ticks_per_frame)),
        }
    }

    /// The tick rate per quarter note, if the timing is metrical.
    pub const fn ticks_per_quarter_note(&self) -> Option<u16> {
        match self {
            Self::Metrical {
                ticks_per_quarter_note,
            } => Some(*ticks_per_quarter_note),
            Self::Smpte { .. } => None,
        }
    }
}

#[test]
fn metrical_division_round_trip() {
    let timing = Timing::from_division(96);
    assert_eq!(
        timing,
        Timing::Metrical {
            ticks_per_quarter_note: 96
        }
    );
    assert_eq!(timing.to_division(), 96);
}

#[test]
fn smpte_division_round_trip() {
    // -30 fps in the high byte, 40 ticks per frame in the low byte.
    let raw = 0xE2_28;
    let timing = Timing::from_division(raw);
    assert_eq!(
        timing,
        Timing::Smpte {
            frames_per_second: 30,
            ticks_per_frame: 40
        }
    );
    assert_eq!(timing.to_division(), raw);
}

#[test]
fn tick_length_follows_tempo_only_when_metrical() {
    let metrical = Timing::metrical(96);
    assert_eq!(metrical.micros_per_tick(500_000), 500_000.0 / 96.0);

    let smpte = Timing::smpte(30, 40);
    assert_eq!(smpte.micros_per_tick(500_000), 1_000_000.0 / 1200.0);
    assert_eq!(smpte.micros_per_tick(250_000), 1_000_000.0 / 1200.0);
}
