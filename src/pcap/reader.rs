use std::io::Read;

use circular::Buffer;
use nom::{IResult, Offset};

use crate::blocks::PcapBlockOwned;
use crate::error::PcapError;
use crate::pcap::{parse_pcap_frame, parse_pcap_frame_be, parse_pcap_header, LegacyPcapBlock, PcapHeader};
use crate::stream::{detach_header, StreamBuffer};
use crate::traits::PcapReaderIterator;

type RecordParser = fn(&[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError<&[u8]>>;

/// Streaming reader of legacy pcap files
///
/// The global header is validated when the reader is created, and handed out by the first
/// call to `next` (as [`PcapBlockOwned::LegacyHeader`]). Every following call returns one
/// record ([`PcapBlockOwned::Legacy`]), parsed in the byte order of the header.
///
/// The buffer must be large enough to hold the largest record. [`PcapError::BufferTooSmall`]
/// is returned otherwise, and the caller may [`grow`](PcapReaderIterator::grow) it.
///
/// ```rust
/// use pcap_ingest::*;
/// use pcap_ingest::traits::PcapReaderIterator;
///
/// # let data: &[u8] = &[
/// #     0xd4, 0xc3, 0xb2, 0xa1, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0, 0, 1, 0, 0, 0,
/// # ];
/// let mut reader = LegacyPcapReader::new(65536, data).expect("LegacyPcapReader");
/// let thiszone = reader.header().thiszone;
/// let mut timestamps = Vec::new();
/// loop {
///     match reader.next() {
///         Ok((offset, block)) => {
///             if let PcapBlockOwned::Legacy(b) = block {
///                 timestamps.push(b.timestamp_millis(thiszone));
///             }
///             reader.consume(offset);
///         }
///         Err(PcapError::Eof) => break,
///         Err(PcapError::Incomplete(_)) => reader.refill().expect("refill"),
///         Err(e) => panic!("error while reading: {:?}", e),
///     }
/// }
/// assert!(timestamps.is_empty());
/// ```
pub struct LegacyPcapReader<R: Read> {
    header: PcapHeader,
    header_sent: bool,
    stream: StreamBuffer<R>,
    parse_record: RecordParser,
}

impl<R: Read> LegacyPcapReader<R> {
    pub fn new(capacity: usize, reader: R) -> Result<LegacyPcapReader<R>, PcapError<&'static [u8]>> {
        Self::from_buffer(Buffer::with_capacity(capacity), reader)
    }

    /// Create a reader from a buffer which may already hold the beginning of the file
    pub fn from_buffer(buffer: Buffer, reader: R) -> Result<LegacyPcapReader<R>, PcapError<&'static [u8]>> {
        let stream = StreamBuffer::open(buffer, reader)?;
        let header = detach_header(parse_pcap_header(stream.data()))?;
        let parse_record: RecordParser = if header.is_bigendian() {
            parse_pcap_frame_be
        } else {
            parse_pcap_frame
        };
        // the header stays in the buffer, it is consumed like any other block
        Ok(LegacyPcapReader {
            header,
            header_sent: false,
            stream,
            parse_record,
        })
    }

    pub fn header(&self) -> &PcapHeader {
        &self.header
    }
}

impl<R: Read> PcapReaderIterator for LegacyPcapReader<R> {
    fn next(&mut self) -> Result<(usize, PcapBlockOwned), PcapError<&[u8]>> {
        if !self.header_sent {
            self.header_sent = true;
            return Ok((self.header.size(), PcapBlockOwned::from(self.header.clone())));
        }
        if self.stream.at_end() {
            return Err(PcapError::Eof);
        }
        let data = self.stream.data();
        match (self.parse_record)(data) {
            Ok((rem, b)) => Ok((data.offset(rem), PcapBlockOwned::from(b))),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
            Err(nom::Err::Incomplete(needed)) => Err(self.stream.incomplete(needed)),
        }
    }

    fn consume(&mut self, offset: usize) {
        self.stream.consume(offset);
    }

    fn consumed(&self) -> usize {
        self.stream.consumed()
    }

    fn refill(&mut self) -> Result<(), PcapError<&[u8]>> {
        self.stream.refill()
    }

    fn grow(&mut self, new_size: usize) -> bool {
        self.stream.grow(new_size)
    }

    fn capacity(&self) -> usize {
        self.stream.capacity()
    }

    fn reader_exhausted(&self) -> bool {
        self.stream.exhausted()
    }
}
