#![doc = r#"
Channel voice and system messages.

# Hierarchy

```text
      |---------------|
      | Track message |
      |---------------|
       /      |      \
|-------|  |------|  |------------|
| Voice |  | Meta |  | Sys/SysEx  |
|-------|  |------|  |------------|
```

Channel voice messages carry the musical data of a track; system messages are
the small family of status bytes between `0xF1` and `0xFE` that a Standard
MIDI File may technically embed even though most never do.
"#]

use core::fmt;

use num_enum::TryFromPrimitive;

use crate::error::{CodecResult, ErrorKind};
use crate::reader::Reader;
use crate::varlen;

/// The high nibble of a channel voice status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum VoiceKind {
    NoteOff = 0x8,
    NoteOn = 0x9,
    PolyAftertouch = 0xA,
    ControlChange = 0xB,
    ProgramChange = 0xC,
    Aftertouch = 0xD,
    PitchWheel = 0xE,
}

#[doc = r#"
A musical message addressed to one of the sixteen MIDI channels.

The status byte's high nibble selects the event kind and its low nibble the
channel; note-off/on, polyphonic aftertouch, control change and pitch wheel
carry two data bytes, program change and channel aftertouch carry one.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelVoiceMessage {
    channel: u8,
    event: VoiceEvent,
}

impl ChannelVoiceMessage {
    /// Create a message for a channel (0-15; higher bits are dropped).
    pub const fn new(channel: u8, event: VoiceEvent) -> Self {
        Self {
            channel: channel & 0x0F,
            event,
        }
    }

    /// The channel this message is addressed to (0-15).
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// The event kind and its data.
    pub const fn event(&self) -> VoiceEvent {
        self.event
    }

    /// The explicit status byte for this message.
    pub(crate) const fn status(&self) -> u8 {
        (self.event.kind() as u8) << 4 | self.channel
    }

    /// Read the data bytes following `status` (which the caller has already
    /// consumed or resolved through running status).
    pub(crate) fn read(status: u8, reader: &mut Reader) -> CodecResult<Self> {
        let kind = VoiceKind::try_from(status >> 4)
            .map_err(|_| reader.err(ErrorKind::InvalidEvent))?;
        let channel = status & 0x0F;
        if reader.remaining() < data_len(kind) {
            return Err(reader.err(ErrorKind::TruncatedEvent));
        }
        let event = match kind {
            VoiceKind::NoteOff => VoiceEvent::NoteOff {
                key: reader.read_u8()? & 0x7F,
                velocity: reader.read_u8()? & 0x7F,
            },
            VoiceKind::NoteOn => VoiceEvent::NoteOn {
                key: reader.read_u8()? & 0x7F,
                velocity: reader.read_u8()? & 0x7F,
            },
            VoiceKind::PolyAftertouch => VoiceEvent::PolyAftertouch {
                key: reader.read_u8()? & 0x7F,
                pressure: reader.read_u8()? & 0x7F,
            },
            VoiceKind::ControlChange => VoiceEvent::ControlChange {
                controller: reader.read_u8()? & 0x7F,
                value: reader.read_u8()? & 0x7F,
            },
            VoiceKind::ProgramChange => VoiceEvent::ProgramChange {
                program: reader.read_u8()? & 0x7F,
            },
            VoiceKind::Aftertouch => VoiceEvent::Aftertouch {
                pressure: reader.read_u8()? & 0x7F,
            },
            VoiceKind::PitchWheel => VoiceEvent::PitchWheel {
                lsb: reader.read_u8()? & 0x7F,
                msb: reader.read_u8()? & 0x7F,
            },
        };
        Ok(Self { channel, event })
    }

    /// Write status byte plus data bytes.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(self.status());
        match self.event {
            VoiceEvent::NoteOff { key, velocity } | VoiceEvent::NoteOn { key, velocity } => {
                out.extend_from_slice(&[key, velocity]);
            }
            VoiceEvent::PolyAftertouch { key, pressure } => {
                out.extend_from_slice(&[key, pressure]);
            }
            VoiceEvent::ControlChange { controller, value } => {
                out.extend_from_slice(&[controller, value]);
            }
            VoiceEvent::ProgramChange { program } => out.push(program),
            VoiceEvent::Aftertouch { pressure } => out.push(pressure),
            VoiceEvent::PitchWheel { lsb, msb } => out.extend_from_slice(&[lsb, msb]),
        }
    }
}

const fn data_len(kind: VoiceKind) -> usize {
    match kind {
        VoiceKind::ProgramChange | VoiceKind::Aftertouch => 1,
        _ => 2,
    }
}

/// A channel voice event kind with its data bytes (each 0-127).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoiceEvent {
    /// Stop playing a note.
    NoteOff {
        /// The key to release.
        key: u8,
        /// The release velocity.
        velocity: u8,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to press.
        key: u8,
        /// The press velocity. By convention velocity 0 means note-off.
        velocity: u8,
    },
    /// Change the pressure on a single held key.
    PolyAftertouch {
        /// The held key.
        key: u8,
        /// The new pressure.
        pressure: u8,
    },
    /// Change the value of a controller.
    ControlChange {
        /// The controller index.
        controller: u8,
        /// The new value.
        value: u8,
    },
    /// Change the instrument of the channel.
    ProgramChange {
        /// The new program (instrument) number.
        program: u8,
    },
    /// Change the pressure of the whole channel.
    Aftertouch {
        /// The new pressure.
        pressure: u8,
    },
    /// Bend the pitch of the whole channel.
    PitchWheel {
        /// Low 7 bits of the bend value.
        lsb: u8,
        /// High 7 bits of the bend value.
        msb: u8,
    },
}

impl VoiceEvent {
    pub(crate) const fn kind(&self) -> VoiceKind {
        match self {
            Self::NoteOff { .. } => VoiceKind::NoteOff,
            Self::NoteOn { .. } => VoiceKind::NoteOn,
            Self::PolyAftertouch { .. } => VoiceKind::PolyAftertouch,
            Self::ControlChange { .. } => VoiceKind::ControlChange,
            Self::ProgramChange { .. } => VoiceKind::ProgramChange,
            Self::Aftertouch { .. } => VoiceKind::Aftertouch,
            Self::PitchWheel { .. } => VoiceKind::PitchWheel,
        }
    }

    /// The combined 14-bit value of a pitch wheel event, `None` otherwise.
    pub const fn pitch_wheel_value(&self) -> Option<u16> {
        match self {
            Self::PitchWheel { lsb, msb } => Some(*lsb as u16 | (*msb as u16) << 7),
            _ => None,
        }
    }
}

#[doc = r#"
A system common or real-time message.

These rarely appear inside files, but the format permits them; each status has
a fixed number of data bytes (song position two, song select one, everything
else none). The `0xF7` escape carries a length-prefixed block of raw bytes.

Undefined statuses are preserved so they re-encode verbatim.
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SystemMessage {
    /// `0xF2`: song position pointer, in MIDI beats.
    SongPosition {
        /// Low 7 bits of the position.
        lsb: u8,
        /// High 7 bits of the position.
        msb: u8,
    },
    /// `0xF3`: select a song or sequence.
    SongSelect(u8),
    /// `0xF6`: tune request.
    TuneRequest,
    /// `0xF7`: an escape block of raw bytes with an explicit length prefix,
    /// usually the continuation of a split system-exclusive transfer.
    Escape(Vec<u8>),
    /// `0xF8`: timing clock.
    TimingClock,
    /// `0xFA`: start playback.
    Start,
    /// `0xFB`: continue playback.
    Continue,
    /// `0xFC`: stop playback.
    Stop,
    /// `0xFE`: active sensing.
    ActiveSensing,
    /// One of the undefined statuses (`0xF1`, `0xF4`, `0xF5`, `0xF9`, `0xFD`),
    /// kept as-is.
    Undefined(u8),
}

impl SystemMessage {
    /// Read the data bytes following `status` (already consumed).
    pub(crate) fn read(status: u8, reader: &mut Reader) -> CodecResult<Self> {
        Ok(match status {
            0xF2 => {
                if reader.remaining() < 2 {
                    return Err(reader.err(ErrorKind::TruncatedEvent));
                }
                Self::SongPosition {
                    lsb: reader.read_u8()? & 0x7F,
                    msb: reader.read_u8()? & 0x7F,
                }
            }
            0xF3 => {
                if reader.remaining() < 1 {
                    return Err(reader.err(ErrorKind::TruncatedEvent));
                }
                Self::SongSelect(reader.read_u8()? & 0x7F)
            }
            0xF6 => Self::TuneRequest,
            0xF7 => {
                let len = varlen::read_varlen(reader)? as usize;
                if reader.remaining() < len {
                    return Err(reader.err(ErrorKind::TruncatedEvent));
                }
                Self::Escape(reader.read_exact(len)?.to_vec())
            }
            0xF8 => Self::TimingClock,
            0xFA => Self::Start,
            0xFB => Self::Continue,
            0xFC => Self::Stop,
            0xFE => Self::ActiveSensing,
            other => Self::Undefined(other),
        })
    }

    pub(crate) const fn status(&self) -> u8 {
        match self {
            Self::SongPosition { .. } => 0xF2,
            Self::SongSelect(_) => 0xF3,
            Self::TuneRequest => 0xF6,
            Self::Escape(_) => 0xF7,
            Self::TimingClock => 0xF8,
            Self::Start => 0xFA,
            Self::Continue => 0xFB,
            Self::Stop => 0xFC,
            Self::ActiveSensing => 0xFE,
            Self::Undefined(status) => *status,
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(self.status());
        match self {
            Self::SongPosition { lsb, msb } => out.extend_from_slice(&[*lsb, *msb]),
            Self::SongSelect(song) => out.push(*song),
            Self::Escape(data) => {
                varlen::write_varlen(data.len() as u32, out);
                out.extend_from_slice(data);
            }
            _ => {}
        }
    }
}

impl fmt::Display for ChannelVoiceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel;
        match self.event {
            VoiceEvent::NoteOff { key, velocity } => {
                write!(f, "note off channel={ch} key={key} velocity={velocity}")
            }
            VoiceEvent::NoteOn { key, velocity } => {
                write!(f, "note on channel={ch} key={key} velocity={velocity}")
            }
            VoiceEvent::PolyAftertouch { key, pressure } => {
                write!(f, "poly aftertouch channel={ch} key={key} pressure={pressure}")
            }
            VoiceEvent::ControlChange { controller, value } => {
                write!(f, "control change channel={ch} controller={controller} value={value}")
            }
            VoiceEvent::ProgramChange { program } => {
                write!(f, "program change channel={ch} program={program}")
            }
            VoiceEvent::Aftertouch { pressure } => {
                write!(f, "aftertouch channel={ch} pressure={pressure}")
            }
            VoiceEvent::PitchWheel { lsb, msb } => {
                write!(
                    f,
                    "pitch wheel channel={ch} value={}",
                    u16::from(lsb) | u16::from(msb) << 7
                )
            }
        }
    }
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SongPosition { lsb, msb } => {
                write!(f, "song position {}", u16::from(*lsb) | u16::from(*msb) << 7)
            }
            Self::SongSelect(song) => write!(f, "song select {song}"),
            Self::TuneRequest => f.write_str("tune request"),
            Self::Escape(data) => write!(f, "escape ({} bytes)", data.len()),
            Self::TimingClock => f.write_str("timing clock"),
            Self::Start => f.write_str("start"),
            Self::Continue => f.write_str("continue"),
            Self::Stop => f.write_str("stop"),
            Self::ActiveSensing => f.write_str("active sensing"),
            Self::Undefined(status) => write!(f, "system {status:#04X}"),
        }
    }
}

#[test]
fn voice_message_round_trip() {
    let message = ChannelVoiceMessage::new(
        3,
        VoiceEvent::NoteOn {
            key: 60,
            velocity: 100,
        },
    );
    let mut bytes = Vec::new();
    message.write(&mut bytes);
    assert_eq!(bytes, [0x93, 60, 100]);

    let mut reader = Reader::new(&bytes[1..]);
    let parsed = ChannelVoiceMessage::read(bytes[0], &mut reader).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn one_byte_messages_consume_one_byte() {
    let mut reader = Reader::new(&[0x05, 0x42]);
    let parsed = ChannelVoiceMessage::read(0xC2, &mut reader).unwrap();
    assert_eq!(
        parsed.event(),
        VoiceEvent::ProgramChange { program: 5 }
    );
    assert_eq!(parsed.channel(), 2);
    assert_eq!(reader.remaining(), 1);
}

#[test]
fn truncated_voice_message_fails() {
    let mut reader = Reader::new(&[60]);
    let err = ChannelVoiceMessage::read(0x90, &mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedEvent);
}

#[test]
fn pitch_wheel_value_combines_both_bytes() {
    let event = VoiceEvent::PitchWheel { lsb: 0x00, msb: 0x40 };
    assert_eq!(event.pitch_wheel_value(), Some(0x2000));
}

#[test]
fn escape_round_trip() {
    let message = SystemMessage::Escape(vec![0x01, 0x02, 0x03]);
    let mut bytes = Vec::new();
    message.write(&mut bytes);
    assert_eq!(bytes, [0xF7, 0x03, 0x01, 0x02, 0x03]);

    let mut reader = Reader::new(&bytes[1..]);
    assert_eq!(SystemMessage::read(0xF7, &mut reader).unwrap(), message);
}
