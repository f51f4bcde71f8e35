#![doc = r#"
Meta events: the `0xFF`-tagged, non-audio events carrying file metadata.

Every meta event is laid out as `FF <subtype> <var-len length> <payload>`.
The subtype selects either a fixed-width payload (tempo, time signature, key
signature, SMPTE offset, channel prefix, sequence number, end-of-track) or a
variable-length byte buffer (the text family and vendor-specific data).
Unknown subtypes are preserved untouched so they survive a round trip.
"#]

use core::fmt;

use num_enum::FromPrimitive;

use crate::error::{CodecResult, ErrorKind};
use crate::reader::Reader;
use crate::varlen;

/// Meta event subtype byte. The catch-all keeps unrecognized subtypes intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub(crate) enum MetaKind {
    SequenceNumber = 0x00,
    Text = 0x01,
    Copyright = 0x02,
    TrackName = 0x03,
    InstrumentName = 0x04,
    Lyric = 0x05,
    Marker = 0x06,
    CuePoint = 0x07,
    DeviceName = 0x09,
    ChannelPrefix = 0x20,
    EndOfTrack = 0x2F,
    SetTempo = 0x51,
    SmpteOffset = 0x54,
    TimeSignature = 0x58,
    KeySignature = 0x59,
    VendorSpecific = 0x7F,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// A parsed meta event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaEvent {
    /// `0x00`: the number of this sequence. Zero when the payload omits it.
    SequenceNumber(u16),
    /// `0x01`: arbitrary text.
    Text(Vec<u8>),
    /// `0x02`: a copyright notice.
    Copyright(Vec<u8>),
    /// `0x03`: the name of the track.
    TrackName(Vec<u8>),
    /// `0x04`: the name of the instrument.
    InstrumentName(Vec<u8>),
    /// `0x05`: a lyric fragment.
    Lyric(Vec<u8>),
    /// `0x06`: a section marker ("first verse", "second chorus", ...).
    Marker(Vec<u8>),
    /// `0x07`: a cue describing something happening on stage.
    CuePoint(Vec<u8>),
    /// `0x09`: the name of the intended playback device.
    DeviceName(Vec<u8>),
    /// `0x20`: the channel the following meta events refer to.
    ChannelPrefix(u8),
    /// `0x2F`: obligatory at the end of every track.
    EndOfTrack,
    /// `0x51`: tempo as microseconds per quarter note (24-bit).
    SetTempo(u32),
    /// `0x54`: the SMPTE time at which the track starts.
    SmpteOffset(SmpteOffset),
    /// `0x58`: the time signature in effect from this point on.
    TimeSignature(TimeSignature),
    /// `0x59`: the key signature in effect from this point on.
    KeySignature(KeySignature),
    /// `0x7F`: vendor-specific data.
    VendorSpecific(Vec<u8>),
    /// Any unrecognized subtype, re-encoded verbatim.
    Unknown {
        /// The raw subtype byte.
        kind: u8,
        /// The raw payload.
        data: Vec<u8>,
    },
}

impl MetaEvent {
    /// Read a meta event; the reader sits just past the `0xFF` status byte.
    pub(crate) fn read(reader: &mut Reader) -> CodecResult<Self> {
        let kind_byte = reader.read_u8()?;
        if kind_byte >= 0x80 {
            return Err(reader.err(ErrorKind::InvalidEvent));
        }
        let len = varlen::read_varlen(reader)? as usize;
        if reader.remaining() < len {
            return Err(reader.err(ErrorKind::TruncatedEvent));
        }
        let data = reader.read_exact(len)?;

        let require = |n: usize| {
            if data.len() < n {
                Err(reader.err(ErrorKind::TruncatedEvent))
            } else {
                Ok(())
            }
        };

        Ok(match MetaKind::from(kind_byte) {
            MetaKind::SequenceNumber => {
                // A short or empty payload means "use the track's index".
                if data.len() >= 2 {
                    Self::SequenceNumber(u16::from_be_bytes([data[0], data[1]]))
                } else {
                    Self::SequenceNumber(0)
                }
            }
            MetaKind::Text => Self::Text(data.to_vec()),
            MetaKind::Copyright => Self::Copyright(data.to_vec()),
            MetaKind::TrackName => Self::TrackName(data.to_vec()),
            MetaKind::InstrumentName => Self::InstrumentName(data.to_vec()),
            MetaKind::Lyric => Self::Lyric(data.to_vec()),
            MetaKind::Marker => Self::Marker(data.to_vec()),
            MetaKind::CuePoint => Self::CuePoint(data.to_vec()),
            MetaKind::DeviceName => Self::DeviceName(data.to_vec()),
            MetaKind::ChannelPrefix => {
                require(1)?;
                Self::ChannelPrefix(data[0])
            }
            MetaKind::EndOfTrack => Self::EndOfTrack,
            MetaKind::SetTempo => {
                require(3)?;
                Self::SetTempo(u32::from(data[0]) << 16 | u32::from(data[1]) << 8 | u32::from(data[2]))
            }
            MetaKind::SmpteOffset => {
                require(5)?;
                Self::SmpteOffset(SmpteOffset {
                    hours: data[0],
                    minutes: data[1],
                    seconds: data[2],
                    frames: data[3],
                    subframes: data[4],
                })
            }
            MetaKind::TimeSignature => {
                require(4)?;
                Self::TimeSignature(TimeSignature {
                    numerator: data[0],
                    denominator: data[1],
                    clocks_per_metronome: data[2],
                    thirty_seconds_per_quarter: data[3],
                })
            }
            MetaKind::KeySignature => {
                require(2)?;
                Self::KeySignature(KeySignature {
                    sharps: data[0] as i8,
                    minor: data[1] != 0,
                })
            }
            MetaKind::VendorSpecific => Self::VendorSpecific(data.to_vec()),
            MetaKind::Unknown(kind) => Self::Unknown {
                kind,
                data: data.to_vec(),
            },
        })
    }

    /// Write `FF <subtype> <var-len length> <payload>`.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(0xFF);
        out.push(self.kind_byte());
        match self {
            Self::SequenceNumber(number) => {
                varlen::write_varlen(2, out);
                out.extend_from_slice(&number.to_be_bytes());
            }
            Self::Text(data)
            | Self::Copyright(data)
            | Self::TrackName(data)
            | Self::InstrumentName(data)
            | Self::Lyric(data)
            | Self::Marker(data)
            | Self::CuePoint(data)
            | Self::DeviceName(data)
            | Self::VendorSpecific(data)
            | Self::Unknown { data, .. } => {
                varlen::write_varlen(data.len() as u32, out);
                out.extend_from_slice(data);
            }
            Self::ChannelPrefix(channel) => {
                varlen::write_varlen(1, out);
                out.push(*channel);
            }
            Self::EndOfTrack => varlen::write_varlen(0, out),
            Self::SetTempo(mpq) => {
                varlen::write_varlen(3, out);
                out.extend_from_slice(&[(mpq >> 16) as u8, (mpq >> 8) as u8, *mpq as u8]);
            }
            Self::SmpteOffset(offset) => {
                varlen::write_varlen(5, out);
                out.extend_from_slice(&[
                    offset.hours,
                    offset.minutes,
                    offset.seconds,
                    offset.frames,
                    offset.subframes,
                ]);
            }
            Self::TimeSignature(sig) => {
                varlen::write_varlen(4, out);
                out.extend_from_slice(&[
                    sig.numerator,
                    sig.denominator,
                    sig.clocks_per_metronome,
                    sig.thirty_seconds_per_quarter,
                ]);
            }
            Self::KeySignature(key) => {
                varlen::write_varlen(2, out);
                out.extend_from_slice(&[key.sharps as u8, u8::from(key.minor)]);
            }
        }
    }

    pub(crate) const fn kind_byte(&self) -> u8 {
        match self {
            Self::SequenceNumber(_) => 0x00,
            Self::Text(_) => 0x01,
            Self::Copyright(_) => 0x02,
            Self::TrackName(_) => 0x03,
            Self::InstrumentName(_) => 0x04,
            Self::Lyric(_) => 0x05,
            Self::Marker(_) => 0x06,
            Self::CuePoint(_) => 0x07,
            Self::DeviceName(_) => 0x09,
            Self::ChannelPrefix(_) => 0x20,
            Self::EndOfTrack => 0x2F,
            Self::SetTempo(_) => 0x51,
            Self::SmpteOffset(_) => 0x54,
            Self::TimeSignature(_) => 0x58,
            Self::KeySignature(_) => 0x59,
            Self::VendorSpecific(_) => 0x7F,
            Self::Unknown { kind, .. } => *kind,
        }
    }
}

/// A time signature: numerator over `2^denominator`, plus the metronome and
/// notation hints the format carries along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSignature {
    /// Beats per bar.
    pub numerator: u8,
    /// The beat unit as a power of two (2 means quarter notes).
    pub denominator: u8,
    /// MIDI clocks per metronome tick.
    pub clocks_per_metronome: u8,
    /// Notated 32nd notes per quarter note.
    pub thirty_seconds_per_quarter: u8,
}

impl Default for TimeSignature {
    /// Common time, the signature assumed when a file declares none.
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 2,
            clocks_per_metronome: 24,
            thirty_seconds_per_quarter: 8,
        }
    }
}

/// A key signature: sharps count (negative for flats) and scale mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeySignature {
    /// Number of sharps; negative values count flats.
    pub sharps: i8,
    /// True for a minor scale.
    pub minor: bool,
}

/// The SMPTE time at which a track is meant to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmpteOffset {
    /// Hour component.
    pub hours: u8,
    /// Minute component.
    pub minutes: u8,
    /// Second component.
    pub seconds: u8,
    /// Frame within the second.
    pub frames: u8,
    /// Hundredths of a frame.
    pub subframes: u8,
}

impl fmt::Display for MetaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = |f: &mut fmt::Formatter<'_>, label: &str, data: &[u8]| {
            write!(f, "{label} \"{}\"", String::from_utf8_lossy(data))
        };
        match self {
            Self::SequenceNumber(number) => write!(f, "sequence number {number}"),
            Self::Text(data) => text(f, "text", data),
            Self::Copyright(data) => text(f, "copyright", data),
            Self::TrackName(data) => text(f, "name", data),
            Self::InstrumentName(data) => text(f, "instrument name", data),
            Self::Lyric(data) => text(f, "lyric", data),
            Self::Marker(data) => text(f, "marker", data),
            Self::CuePoint(data) => text(f, "cue", data),
            Self::DeviceName(data) => text(f, "device name", data),
            Self::ChannelPrefix(channel) => write!(f, "channel prefix {channel}"),
            Self::EndOfTrack => f.write_str("end of track"),
            Self::SetTempo(mpq) => write!(f, "set tempo mpq={mpq}"),
            Self::SmpteOffset(o) => write!(
                f,
                "smpte offset {}:{}:{} {}:{}",
                o.hours, o.minutes, o.seconds, o.frames, o.subframes
            ),
            Self::TimeSignature(sig) => write!(
                f,
                "time signature {}/{}",
                sig.numerator,
                2u32.saturating_pow(sig.denominator.into())
            ),
            Self::KeySignature(key) => write!(
                f,
                "key signature sharps={} {}",
                key.sharps,
                if key.minor { "minor" } else { "major" }
            ),
            Self::VendorSpecific(data) => write!(f, "vendor specific ({} bytes)", data.len()),
            Self::Unknown { kind, data } => {
                write!(f, "meta {kind:#04X} ({} bytes)", data.len())
            }
        }
    }
}

#[test]
fn set_tempo_round_trip() {
    // FF 51 03 07 A1 20 = 500 000 microseconds per quarter note
    let mut reader = Reader::new(&[0x51, 0x03, 0x07, 0xA1, 0x20]);
    let event = MetaEvent::read(&mut reader).unwrap();
    assert_eq!(event, MetaEvent::SetTempo(500_000));

    let mut bytes = Vec::new();
    event.write(&mut bytes);
    assert_eq!(bytes, [0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
}

#[test]
fn unknown_subtype_survives_round_trip() {
    let mut reader = Reader::new(&[0x60, 0x02, 0xAA, 0xBB]);
    let event = MetaEvent::read(&mut reader).unwrap();
    assert_eq!(
        event,
        MetaEvent::Unknown {
            kind: 0x60,
            data: vec![0xAA, 0xBB],
        }
    );

    let mut bytes = Vec::new();
    event.write(&mut bytes);
    assert_eq!(bytes, [0xFF, 0x60, 0x02, 0xAA, 0xBB]);
}

#[test]
fn text_event_owns_its_payload() {
    let mut reader = Reader::new(&[0x03, 0x05, b'p', b'i', b'a', b'n', b'o']);
    let event = MetaEvent::read(&mut reader).unwrap();
    assert_eq!(event, MetaEvent::TrackName(b"piano".to_vec()));
    assert_eq!(event.to_string(), "name \"piano\"");
}

#[test]
fn fixed_payload_shorter_than_required_fails() {
    // Tempo declares two bytes where three are needed.
    let mut reader = Reader::new(&[0x51, 0x02, 0x07, 0xA1]);
    let err = MetaEvent::read(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedEvent);
}

#[test]
fn meta_subtype_with_high_bit_is_invalid() {
    let mut reader = Reader::new(&[0x80, 0x00]);
    let err = MetaEvent::read(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEvent);
}

#[test]
fn declared_length_past_buffer_end_fails() {
    let mut reader = Reader::new(&[0x01, 0x10, b'a']);
    let err = MetaEvent::read(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedEvent);
}
