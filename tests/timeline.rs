use midihex::prelude::*;

/// Build a format-0 file around one track body.
fn file_with_track(division: [u8; 2], body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x06]);
    bytes.extend_from_slice(&[0x00, 0x00]); // format 0
    bytes.extend_from_slice(&[0x00, 0x01]); // one track
    bytes.extend_from_slice(&division);
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

#[test]
fn files_without_tempo_events_get_the_default_chains() {
    let bytes = file_with_track([0x00, 0x60], &[0x00, 0xFF, 0x2F, 0x00]);
    let file = MidiFile::from_bytes(&bytes).unwrap();

    let tempo = file.tempo_chain();
    assert_eq!(tempo.len(), 1);
    assert_eq!(tempo[0].ticks(), 0);
    assert_eq!(tempo[0].micros(), 0);
    // 500 000 microseconds per quarter note across 96 ticks.
    assert_eq!(tempo[0].micros_per_tick(), 500_000.0 / 96.0);

    let signatures = file.time_signature_chain();
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0].ticks(), 0);
    assert_eq!(signatures[0].bar(), 0);
    assert_eq!(signatures[0].signature(), TimeSignature::default());
}

#[test]
fn explicit_tempo_governs_the_projection() {
    // Tempo 500 000 at tick 0, then a note-on 96 ticks later.
    let body = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // set tempo
        0x60, 0x90, 0x3C, 0x64, // note on at tick 96
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::from_bytes(&file_with_track([0x00, 0x60], &body)).unwrap();
    assert_eq!(file.micros_at(0), 0);
    assert_eq!(file.micros_at(96), 500_000);
    assert_eq!(file.micros_at(192), 1_000_000);
}

#[test]
fn tempo_changes_compound_across_the_chain() {
    // One quarter note at 120 BPM, then 60 BPM.
    let body = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // 500 000
        0x60, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // 1 000 000 at tick 96
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::from_bytes(&file_with_track([0x00, 0x60], &body)).unwrap();

    let chain = file.tempo_chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].ticks(), 96);
    assert_eq!(chain[1].micros(), 500_000);

    assert_eq!(file.micros_at(96), 500_000);
    assert_eq!(file.micros_at(192), 1_500_000);

    let mut last = 0;
    for ticks in (0..400).step_by(3) {
        let micros = file.micros_at(ticks);
        assert!(micros >= last, "micros_at must be monotonic");
        last = micros;
    }
}

#[test]
fn smpte_division_fixes_the_tick_length() {
    // -30 fps, 40 ticks per frame: 1200 ticks per second, tempo-independent.
    let body = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo is irrelevant here
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::from_bytes(&file_with_track([0xE2, 0x28], &body)).unwrap();
    assert_eq!(file.timing(), Timing::smpte(30, 40));
    assert_eq!(file.micros_at(1200), 1_000_000);
    assert_eq!(file.micros_at(1800), 1_500_000);
}

#[test]
fn bars_count_under_the_governing_signature() {
    // 4/4 from tick 0, 3/4 from tick 768 (two bars in).
    let body = [
        0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4
        0x86, 0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08, // 3/4 at tick 768
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::from_bytes(&file_with_track([0x00, 0x60], &body)).unwrap();

    let chain = file.time_signature_chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].ticks(), 768);
    assert_eq!(chain[1].bar(), 2);

    assert_eq!(file.bar_at(0).bar, 0);
    assert_eq!(file.bar_at(384).bar, 1);
    assert_eq!(file.bar_at(768).bar, 2);
    // A 3/4 bar is 288 ticks at 96 ticks per quarter.
    assert_eq!(file.bar_at(768 + 288).bar, 3);
    assert_eq!(file.bar_at(768 + 2 * 288).bar, 4);

    let mid = file.bar_at(768 + 144);
    assert_eq!(mid.bar, 2);
    assert!((mid.beat - 1.5).abs() < 1e-9);
}

#[test]
fn bar_queries_are_monotonic() {
    let body = [
        0x00, 0xFF, 0x58, 0x04, 0x06, 0x03, 0x18, 0x08, // 6/8
        0x83, 0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4 at tick 384
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::from_bytes(&file_with_track([0x00, 0x60], &body)).unwrap();
    let mut last = 0;
    for ticks in (0..2000).step_by(5) {
        let bar = file.bar_at(ticks).bar;
        assert!(bar >= last, "bar_at must be monotonic");
        last = bar;
    }
}

#[test]
fn tempo_on_a_later_track_still_reaches_the_chain() {
    // Format 1: an empty tempo-less first track, tempo on the second.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x06]);
    bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x60]);
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
    bytes.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x0B]);
    bytes.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90]); // 250 000
    bytes.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let file = MidiFile::from_bytes(&bytes).unwrap();
    // The first track contributed the default; the second appended its own.
    assert_eq!(file.tempo_chain().len(), 2);
    assert_eq!(file.micros_at(96), 250_000);
}
