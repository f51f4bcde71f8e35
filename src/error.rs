use thiserror::Error;

#[doc = r#"
A decode or encode failure, tagged with the byte position at which it occurred.

For file-level operations the position is an offset into the file buffer; for
track-level operations it is an offset into that track's data bytes.
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("at byte {position}: {kind}")]
pub struct CodecError {
    position: usize,
    pub(crate) kind: ErrorKind,
}

/// A kind of error the codec can produce.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A variable-length quantity ran past the conventional 4-byte limit.
    #[error("malformed variable-length quantity")]
    MalformedVarLen,
    /// The input ended in the middle of a structure.
    #[error("unexpected end of input")]
    TruncatedInput,
    /// Bad file magic, or a header content length other than 6.
    #[error("invalid file header")]
    InvalidHeader,
    /// Bad track magic, or a track that is not in the right state.
    #[error("invalid track chunk")]
    InvalidTrack,
    /// An event body does not fit in the bytes that remain.
    #[error("truncated event body")]
    TruncatedEvent,
    /// A system-exclusive block with no terminating byte before the end of
    /// the track.
    #[error("unterminated system-exclusive block")]
    TruncatedSysEx,
    /// An undecodable status byte, or a data byte with no running status
    /// active.
    #[error("invalid event")]
    InvalidEvent,
    /// The allocator refused a buffer reservation.
    #[error("buffer allocation refused")]
    AllocationFailure,
}

impl CodecError {
    /// Create an error from a position and kind.
    pub const fn new(position: usize, kind: ErrorKind) -> Self {
        Self { position, kind }
    }

    /// The byte offset at which decoding or encoding failed.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The kind of failure.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// True for any of the input-ended-too-early kinds.
    pub const fn is_truncation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::TruncatedInput | ErrorKind::TruncatedEvent | ErrorKind::TruncatedSysEx
        )
    }
}

/// The codec result type (see [`CodecError`]).
pub type CodecResult<T> = Result<T, CodecError>;

/// A refused mutation of a [`MidiFile`](crate::file::MidiFile).
///
/// Edit operations validate their arguments up front and leave the file
/// untouched when they fail.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    /// The track index does not name a track of the file.
    #[error("track index {0} is out of range")]
    TrackOutOfRange(usize),
    /// The event position does not name an event of the track.
    #[error("event position {0} is out of range")]
    PositionOutOfRange(usize),
    /// Every file owns at least one track.
    #[error("cannot remove the last remaining track")]
    LastTrack,
    /// The operation needs the track's event list, which has not been
    /// decoded yet.
    #[error("track {0} has not been decoded")]
    Undecoded(usize),
}

/// An error produced by the path-based convenience API.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The bytes could not be decoded or the file could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
