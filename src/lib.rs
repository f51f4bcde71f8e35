#![doc = r#"
Standard MIDI File codec and musical-timeline core for the Midihex editor.

The crate has two layers:

- A binary codec: [`MidiFile::parse`](file::MidiFile::parse) turns raw bytes
  into a structured file whose tracks decode on demand into time-stamped
  event sequences, and [`MidiFile::encode`](file::MidiFile::encode) performs
  the inverse (always with explicit status bytes — running status is read
  but never written).
- A derived timeline: tempo and time-signature change chains maintained from
  the decoded events, answering tick→microsecond and tick→bar:beat queries
  and kept current through the editing operations.

# Example

```
use midihex::prelude::*;

// Format 0, one track, 96 ticks per quarter note, a lone end-of-track.
let mut bytes = b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x00\x60".to_vec();
bytes.extend_from_slice(b"MTrk\x00\x00\x00\x04\x00\xFF\x2F\x00");

let mut file = MidiFile::parse(&bytes)?;
file.decode_all_tracks()?;

assert_eq!(file.track_count(), 1);
// No tempo map in the file, so the default 120 BPM applies.
assert_eq!(file.micros_at(96), 500_000);
assert_eq!(file.encode()?, bytes);
# Ok::<(), midihex::error::CodecError>(())
```

Real-time device I/O and playback are out of scope; the crate is the
file-model half of an editor, not a sequencer.
"#]

pub mod error;
pub mod file;
pub mod message;
pub mod timeline;

mod edit;
mod reader;
mod varlen;

/// Everything a typical consumer needs in one import.
pub mod prelude {
    pub use crate::error::*;
    pub use crate::file::*;
    pub use crate::message::*;
    pub use crate::timeline::*;
}
