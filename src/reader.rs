//! Byte cursor used by every decode path.

use crate::error::{CodecError, CodecResult, ErrorKind};

/// A cursor over an in-memory buffer, tracking the current byte position so
/// errors can report where decoding stopped.
///
/// All multi-byte integers in a Standard MIDI File are big-endian.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub(crate) const fn position(&self) -> usize {
        self.position
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub(crate) const fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// The bytes not yet consumed.
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// An error at the current position.
    pub(crate) const fn err(&self, kind: ErrorKind) -> CodecError {
        CodecError::new(self.position, kind)
    }

    pub(crate) fn peek_u8(&self) -> CodecResult<u8> {
        match self.data.get(self.position) {
            Some(byte) => Ok(*byte),
            None => Err(self.err(ErrorKind::TruncatedInput)),
        }
    }

    pub(crate) fn read_u8(&mut self) -> CodecResult<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn read_exact(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(self.err(ErrorKind::TruncatedInput));
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    /// Consume `count` bytes without looking at them.
    pub(crate) fn skip(&mut self, count: usize) -> CodecResult<()> {
        self.read_exact(count).map(|_| ())
    }
}

#[test]
fn big_endian_reads() {
    let mut reader = Reader::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    assert_eq!(reader.read_u16().unwrap(), 0x0102);
    assert_eq!(reader.read_u32().unwrap(), 0x0304_0506);
    assert!(reader.at_end());
}

#[test]
fn truncated_read_reports_position() {
    let mut reader = Reader::new(&[0x01, 0x02]);
    reader.read_u8().unwrap();
    let err = reader.read_u32().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    assert_eq!(err.position(), 1);
}
