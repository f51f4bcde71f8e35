use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The format word of the file header, selecting how tracks relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatType {
    /// Format 0: a single track carrying all sixteen channels.
    SingleTrack = 0,
    /// Format 1: multiple tracks played simultaneously; the first usually
    /// carries tempo and other song metadata.
    MultiTrack = 1,
    /// Format 2: multiple independent single-song tracks. Parsed, but no
    /// per-track timeline semantics are applied beyond the header field.
    IndependentTracks = 2,
}
