//! Circular buffer plumbing shared by the streaming readers

use std::io::Read;

use circular::Buffer;
use nom::{IResult, Needed};

use crate::error::PcapError;

/// A `Read` input seen through a circular buffer
///
/// Tracks the number of bytes consumed since the start of the input, and whether the
/// input is exhausted. Exhaustion is only detected by a `refill` reading nothing.
pub(crate) struct StreamBuffer<R: Read> {
    reader: R,
    buffer: Buffer,
    consumed: usize,
    exhausted: bool,
}

impl<R: Read> StreamBuffer<R> {
    /// Wrap `buffer` (which may already hold the beginning of the input) and read once
    pub(crate) fn open<I>(mut buffer: Buffer, mut reader: R) -> Result<Self, PcapError<I>> {
        let sz = reader.read(buffer.space()).or(Err(PcapError::ReadError))?;
        buffer.fill(sz);
        Ok(StreamBuffer {
            reader,
            buffer,
            consumed: 0,
            exhausted: false,
        })
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    /// All data was read and consumed
    pub(crate) fn at_end(&self) -> bool {
        self.exhausted && self.buffer.available_data() == 0 && self.buffer.position() == 0
    }

    /// Error for a parser asking for more bytes
    ///
    /// `UnexpectedEof` once the input is exhausted, `BufferTooSmall` if the missing bytes
    /// cannot fit, `Incomplete` otherwise.
    pub(crate) fn incomplete<I>(&self, needed: Needed) -> PcapError<I> {
        if self.exhausted {
            return PcapError::UnexpectedEof;
        }
        match needed {
            Needed::Size(n) => {
                if self.buffer.available_data() + usize::from(n) >= self.buffer.capacity() {
                    PcapError::BufferTooSmall
                } else {
                    PcapError::Incomplete(n.into())
                }
            }
            Needed::Unknown => PcapError::Incomplete(0),
        }
    }

    pub(crate) fn consume(&mut self, offset: usize) {
        self.consumed += offset;
        self.buffer.consume(offset);
    }

    #[inline]
    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    /// Shift the buffer and read as much as fits
    pub(crate) fn refill<I>(&mut self) -> Result<(), PcapError<I>> {
        self.buffer.shift();
        let space = self.buffer.space();
        // a full buffer would read 0 bytes without being at the end of the input
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space).or(Err(PcapError::ReadError))?;
        self.exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }

    pub(crate) fn grow(&mut self, new_size: usize) -> bool {
        self.buffer.grow(new_size)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    #[inline]
    pub(crate) fn exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Result of a file header parser, detached from the buffer
pub(crate) fn detach_header<'a, T>(
    res: IResult<&'a [u8], T, PcapError<&'a [u8]>>,
) -> Result<T, PcapError<&'static [u8]>> {
    match res {
        Ok((_, header)) => Ok(header),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e.to_owned_vec()),
        Err(nom::Err::Incomplete(Needed::Size(n))) => Err(PcapError::Incomplete(n.into())),
        Err(nom::Err::Incomplete(Needed::Unknown)) => Err(PcapError::Incomplete(0)),
    }
}
