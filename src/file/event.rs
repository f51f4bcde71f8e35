#![doc = r#"
Track events and the event-level codec.

A track event pairs a delta-time (ticks since the previous event) with a
payload: a channel voice message, a system message, a meta event or a
system-exclusive block. The decoder also tracks the absolute tick position of
every event, which is the running sum of all deltas up to and including it.
"#]

use core::fmt;

use tracing::warn;

use crate::error::{CodecResult, ErrorKind};
use crate::file::meta::MetaEvent;
use crate::message::{ChannelVoiceMessage, SystemMessage};
use crate::reader::Reader;
use crate::varlen;

/// One event of a track, stamped with both relative and absolute time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackEvent {
    delta_ticks: u32,
    ticks: u32,
    message: TrackMessage,
}

impl TrackEvent {
    /// Create an event. Its absolute tick position is derived from the
    /// surrounding track and starts out as the delta alone.
    pub const fn new(delta_ticks: u32, message: TrackMessage) -> Self {
        Self {
            delta_ticks,
            ticks: delta_ticks,
            message,
        }
    }

    /// Ticks elapsed since the previous event in the same track.
    pub const fn delta_ticks(&self) -> u32 {
        self.delta_ticks
    }

    /// Absolute tick position: the running delta sum up to this event.
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// The event payload.
    pub const fn message(&self) -> &TrackMessage {
        &self.message
    }

    pub(crate) fn set_delta_ticks(&mut self, delta_ticks: u32) {
        self.delta_ticks = delta_ticks;
    }

    pub(crate) fn set_ticks(&mut self, ticks: u32) {
        self.ticks = ticks;
    }

    /// Read one delta-time/payload pair, resolving running status through
    /// `running_status`.
    pub(crate) fn read(
        reader: &mut Reader,
        running_status: &mut Option<u8>,
    ) -> CodecResult<Self> {
        let delta_ticks = varlen::read_varlen(reader)?;
        let message = TrackMessage::read(reader, running_status)?;
        Ok(Self::new(delta_ticks, message))
    }

    /// Write the delta-time followed by the payload with an explicit status
    /// byte. Running status compression is never applied on write.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        varlen::write_varlen(self.delta_ticks, out);
        self.message.write(out);
    }
}

/// The payload of a [`TrackEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackMessage {
    /// A channel voice message.
    ChannelVoice(ChannelVoiceMessage),
    /// A system common or real-time message.
    System(SystemMessage),
    /// A meta event.
    Meta(MetaEvent),
    /// A system-exclusive block.
    SysEx(SysExEvent),
}

impl TrackMessage {
    /// Dispatch on the status byte.
    ///
    /// A byte with the high bit clear is a data byte: the event is
    /// reinterpreted under the previous status without consuming it, which
    /// fails with `InvalidEvent` when no status has been seen yet. Channel
    /// voice and system messages update the carried status; meta and sysex
    /// blocks leave it untouched.
    pub(crate) fn read(
        reader: &mut Reader,
        running_status: &mut Option<u8>,
    ) -> CodecResult<Self> {
        let mut status = reader.peek_u8()?;
        if status & 0x80 == 0 {
            status = match *running_status {
                Some(status) => status,
                None => return Err(reader.err(ErrorKind::InvalidEvent)),
            };
        } else {
            reader.skip(1)?;
        }

        match status {
            0x80..=0xEF => {
                *running_status = Some(status);
                Ok(Self::ChannelVoice(ChannelVoiceMessage::read(status, reader)?))
            }
            0xFF => Ok(Self::Meta(MetaEvent::read(reader)?)),
            0xF0 => Ok(Self::SysEx(SysExEvent::read(reader)?)),
            0xF7 => Ok(Self::System(SystemMessage::read(status, reader)?)),
            0xF1..=0xF6 | 0xF8..=0xFE => {
                *running_status = Some(status);
                Ok(Self::System(SystemMessage::read(status, reader)?))
            }
            // Unreachable through running status, which only ever holds
            // bytes with the high bit set.
            _ => Err(reader.err(ErrorKind::InvalidEvent)),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::ChannelVoice(message) => message.write(out),
            Self::System(message) => message.write(out),
            Self::Meta(event) => event.write(out),
            Self::SysEx(event) => event.write(out),
        }
    }
}

#[doc = r#"
A system-exclusive block.

On decode, the bytes after the leading `0xF0` are scanned up to the first
byte with its high bit set; that terminator (conventionally `0xF7`) is kept
as part of the payload, so encoding writes `0xF0` plus the payload verbatim.
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SysExEvent {
    data: Vec<u8>,
}

impl SysExEvent {
    /// Create a block from its payload, terminator included.
    pub const fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The payload, terminator included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Scan for the terminator; the reader sits just past the `0xF0`.
    pub(crate) fn read(reader: &mut Reader) -> CodecResult<Self> {
        match reader.rest().iter().position(|byte| byte & 0x80 != 0) {
            Some(index) => {
                let data = reader.read_exact(index + 1)?.to_vec();
                if data[index] != 0xF7 {
                    warn!(
                        terminator = data[index],
                        "system-exclusive block terminated by a byte other than F7"
                    );
                }
                Ok(Self { data })
            }
            None => Err(reader.err(ErrorKind::TruncatedSysEx)),
        }
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(0xF0);
        out.extend_from_slice(&self.data);
    }
}

impl fmt::Display for TrackMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelVoice(message) => message.fmt(f),
            Self::System(message) => message.fmt(f),
            Self::Meta(event) => event.fmt(f),
            Self::SysEx(event) => write!(f, "sysex ({} bytes)", event.data.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::VoiceEvent;

    fn read_one(bytes: &[u8], running_status: &mut Option<u8>) -> CodecResult<TrackEvent> {
        let mut reader = Reader::new(bytes);
        TrackEvent::read(&mut reader, running_status)
    }

    #[test]
    fn note_on_with_delta() {
        let event = read_one(&[0x60, 0x90, 0x3C, 0x64], &mut None).unwrap();
        assert_eq!(event.delta_ticks(), 96);
        assert_eq!(
            *event.message(),
            TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
                0,
                VoiceEvent::NoteOn {
                    key: 60,
                    velocity: 100,
                },
            ))
        );
    }

    #[test]
    fn running_status_reuses_previous_status() {
        let bytes = [
            0x00, 0x90, 0x3C, 0x64, // explicit note on
            0x10, 0x3E, 0x64, // running status note on
        ];
        let mut reader = Reader::new(&bytes);
        let mut running_status = None;
        let first = TrackEvent::read(&mut reader, &mut running_status).unwrap();
        let second = TrackEvent::read(&mut reader, &mut running_status).unwrap();
        assert!(reader.at_end());
        assert_eq!(first.delta_ticks(), 0);
        assert_eq!(second.delta_ticks(), 0x10);
        assert_eq!(
            *second.message(),
            TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
                0,
                VoiceEvent::NoteOn {
                    key: 62,
                    velocity: 100,
                },
            ))
        );
    }

    #[test]
    fn data_byte_without_running_status_is_invalid() {
        let err = read_one(&[0x00, 0x3C, 0x64], &mut None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEvent);
    }

    #[test]
    fn meta_event_leaves_running_status_untouched() {
        let bytes = [
            0x00, 0x90, 0x3C, 0x64, // note on sets running status
            0x00, 0xFF, 0x06, 0x02, b'h', b'i', // marker
            0x00, 0x3C, 0x00, // running status still note on
        ];
        let mut reader = Reader::new(&bytes);
        let mut running_status = None;
        TrackEvent::read(&mut reader, &mut running_status).unwrap();
        TrackEvent::read(&mut reader, &mut running_status).unwrap();
        let third = TrackEvent::read(&mut reader, &mut running_status).unwrap();
        assert_eq!(
            *third.message(),
            TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
                0,
                VoiceEvent::NoteOn {
                    key: 60,
                    velocity: 0,
                },
            ))
        );
    }

    #[test]
    fn sysex_scan_keeps_terminator() {
        let event = read_one(&[0x00, 0xF0, 0x43, 0x12, 0x00, 0xF7], &mut None).unwrap();
        let TrackMessage::SysEx(sysex) = event.message() else {
            panic!("expected sysex");
        };
        assert_eq!(sysex.data(), &[0x43, 0x12, 0x00, 0xF7]);
    }

    #[test]
    fn sysex_accepts_any_high_bit_terminator() {
        let event = read_one(&[0x00, 0xF0, 0x01, 0x02, 0x83], &mut None).unwrap();
        let TrackMessage::SysEx(sysex) = event.message() else {
            panic!("expected sysex");
        };
        assert_eq!(sysex.data(), &[0x01, 0x02, 0x83]);
    }

    #[test]
    fn unterminated_sysex_fails() {
        let err = read_one(&[0x00, 0xF0, 0x01, 0x02, 0x03], &mut None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedSysEx);
    }

    #[test]
    fn encode_always_writes_explicit_status() {
        let mut running_status = None;
        let bytes = [
            0x00, 0x90, 0x3C, 0x64, // explicit
            0x10, 0x3E, 0x64, // running status
        ];
        let mut reader = Reader::new(&bytes);
        let first = TrackEvent::read(&mut reader, &mut running_status).unwrap();
        let second = TrackEvent::read(&mut reader, &mut running_status).unwrap();

        let mut out = Vec::new();
        first.write(&mut out);
        second.write(&mut out);
        assert_eq!(out, [0x00, 0x90, 0x3C, 0x64, 0x10, 0x90, 0x3E, 0x64]);
    }

    #[test]
    fn display_matches_table_text() {
        let event = read_one(&[0x00, 0x90, 0x3C, 0x64], &mut None).unwrap();
        assert_eq!(
            event.message().to_string(),
            "note on channel=0 key=60 velocity=100"
        );
    }
}
