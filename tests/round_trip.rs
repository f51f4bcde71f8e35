use midihex::prelude::*;
use pretty_assertions::assert_eq;

/// The minimal valid file: format 0, one track, division 96, a lone
/// end-of-track event.
fn minimal_file() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd"); // header tag
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x06]); // content length 6
    bytes.extend_from_slice(&[0x00, 0x00]); // format 0
    bytes.extend_from_slice(&[0x00, 0x01]); // one track
    bytes.extend_from_slice(&[0x00, 0x60]); // division 96
    bytes.extend_from_slice(b"MTrk"); // track tag
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]); // track length 4
    bytes.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]); // delta 0, end of track
    bytes
}

/// Format 1, two tracks, division 96: a tempo-map track and a note track
/// exercising running status, a name event and a sysex block.
fn two_track_file() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x06]);
    bytes.extend_from_slice(&[0x00, 0x01]); // format 1
    bytes.extend_from_slice(&[0x00, 0x02]); // two tracks
    bytes.extend_from_slice(&[0x00, 0x60]); // division 96

    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x1B]); // 27 bytes
    bytes.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]); // tempo 500000
    bytes.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]); // 4/4
    bytes.extend_from_slice(&[0x83, 0x60, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]); // tempo 250000 at 480
    bytes.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x21]); // 33 bytes
    bytes.extend_from_slice(&[0x00, 0xFF, 0x03, 0x05]); // track name, 5 bytes
    bytes.extend_from_slice(b"piano");
    bytes.extend_from_slice(&[0x00, 0x90, 0x3C, 0x64]); // note on C4
    bytes.extend_from_slice(&[0x60, 0x3E, 0x64]); // running status: note on D4 at +96
    bytes.extend_from_slice(&[0x60, 0x80, 0x3C, 0x40]); // note off C4 at +96
    bytes.extend_from_slice(&[0x00, 0x3E, 0x40]); // running status: note off D4
    bytes.extend_from_slice(&[0x00, 0xF0, 0x43, 0x12, 0xF7]); // sysex
    bytes.extend_from_slice(&[0x81, 0x40, 0xFF, 0x2F, 0x00]); // end of track at +192
    bytes
}

#[test]
fn minimal_file_parses_to_one_end_of_track() {
    let bytes = minimal_file();
    assert_eq!(bytes.len(), 14 + 12);

    let mut file = MidiFile::parse(&bytes).unwrap();
    file.decode_all_tracks().unwrap();

    assert_eq!(file.format(), FormatType::SingleTrack);
    assert_eq!(file.timing(), Timing::metrical(96));
    assert_eq!(file.track_count(), 1);

    let events = file.tracks()[0].events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ticks(), 0);
    assert_eq!(
        *events[0].message(),
        TrackMessage::Meta(MetaEvent::EndOfTrack)
    );
}

#[test]
fn minimal_file_encodes_byte_for_byte() {
    let bytes = minimal_file();
    let file = MidiFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.encode().unwrap(), bytes);
}

#[test]
fn decoded_events_survive_encode_and_reparse() {
    let file = MidiFile::from_bytes(&two_track_file()).unwrap();
    let reparsed = MidiFile::from_bytes(&file.encode().unwrap()).unwrap();

    assert_eq!(reparsed.format(), file.format());
    assert_eq!(reparsed.timing(), file.timing());
    assert_eq!(reparsed.track_count(), file.track_count());
    for (a, b) in reparsed.tracks().iter().zip(file.tracks()) {
        assert_eq!(a.events(), b.events());
    }
    assert_eq!(reparsed.tempo_chain(), file.tempo_chain());
    assert_eq!(reparsed.time_signature_chain(), file.time_signature_chain());
}

#[test]
fn running_status_events_carry_accumulated_ticks() {
    let file = MidiFile::from_bytes(&two_track_file()).unwrap();
    let events = file.tracks()[1].events();

    let ticks: Vec<u32> = events.iter().map(TrackEvent::ticks).collect();
    assert_eq!(ticks, [0, 0, 96, 192, 192, 192, 384]);

    assert_eq!(
        *events[2].message(),
        TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
            0,
            VoiceEvent::NoteOn {
                key: 62,
                velocity: 100,
            },
        ))
    );
    assert_eq!(
        *events[4].message(),
        TrackMessage::ChannelVoice(ChannelVoiceMessage::new(
            0,
            VoiceEvent::NoteOff {
                key: 62,
                velocity: 64,
            },
        ))
    );
}

#[test]
fn sysex_and_name_payloads_are_owned_buffers() {
    let file = MidiFile::from_bytes(&two_track_file()).unwrap();
    let events = file.tracks()[1].events();

    assert_eq!(
        *events[0].message(),
        TrackMessage::Meta(MetaEvent::TrackName(b"piano".to_vec()))
    );
    let TrackMessage::SysEx(sysex) = events[5].message() else {
        panic!("expected a sysex block");
    };
    assert_eq!(sysex.data(), &[0x43, 0x12, 0xF7]);
}

#[test]
fn truncated_track_aborts_the_whole_decode() {
    let mut bytes = two_track_file();
    // Drop the last byte of the final track: its declared length now
    // overruns the buffer.
    bytes.pop();
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedInput);
}

#[test]
fn corrupt_event_keeps_the_file_from_loading() {
    let mut bytes = minimal_file();
    // Replace the end-of-track payload with a data byte and no status.
    let body = bytes.len() - 4;
    bytes[body..].copy_from_slice(&[0x00, 0x3C, 0x64, 0x00]);
    let err = MidiFile::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEvent);
}
