use std::io::Read;

use circular::Buffer;
use nom::Offset;

use crate::blocks::PcapBlockOwned;
use crate::error::PcapError;
use crate::pcapng::*;
use crate::stream::{detach_header, StreamBuffer};
use crate::traits::PcapReaderIterator;

/// Streaming reader of pcap-ng files
///
/// Blocks are returned in file order, starting with the Section Header Block. The reader
/// follows the byte order of the current section: each new SHB switches it. Keeping the
/// interfaces of a section (link type, timestamp resolution and offset) is left to the
/// caller, which must forget them whenever a new SHB shows up.
///
/// Blocks which do not matter for packet decoding, including local-use and unknown types,
/// are returned as [`Block::Skipped`] so that their size can still be accounted for.
///
/// ```rust
/// use pcap_ingest::*;
/// use pcap_ingest::traits::PcapReaderIterator;
///
/// # let data: &[u8] = &[
/// #     0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0, 0, 0, 0x4d, 0x3c, 0x2b, 0x1a, 1, 0, 0, 0,
/// #     0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x1c, 0, 0, 0,
/// # ];
/// let mut reader = PcapNGReader::new(65536, data).expect("PcapNGReader");
/// let mut sections = 0;
/// let mut interfaces = Vec::new();
/// loop {
///     match reader.next() {
///         Ok((offset, block)) => {
///             match block {
///                 PcapBlockOwned::NG(Block::SectionHeader(_)) => {
///                     sections += 1;
///                     interfaces.clear();
///                 }
///                 PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
///                     interfaces.push(idb.linktype);
///                 }
///                 _ => (),
///             }
///             reader.consume(offset);
///         }
///         Err(PcapError::Eof) => break,
///         Err(PcapError::Incomplete(_)) => reader.refill().expect("refill"),
///         Err(e) => panic!("error while reading: {:?}", e),
///     }
/// }
/// assert_eq!(sections, 1);
/// assert!(interfaces.is_empty());
/// ```
pub struct PcapNGReader<R: Read> {
    big_endian: bool,
    stream: StreamBuffer<R>,
}

impl<R: Read> PcapNGReader<R> {
    pub fn new(capacity: usize, reader: R) -> Result<PcapNGReader<R>, PcapError<&'static [u8]>> {
        Self::from_buffer(Buffer::with_capacity(capacity), reader)
    }

    /// Create a reader from a buffer which may already hold the beginning of the file
    ///
    /// The input must start with a valid Section Header Block, which is left in the buffer.
    pub fn from_buffer(buffer: Buffer, reader: R) -> Result<PcapNGReader<R>, PcapError<&'static [u8]>> {
        let stream = StreamBuffer::open(buffer, reader)?;
        let big_endian = detach_header(
            parse_sectionheaderblock(stream.data()).map(|(rem, shb)| (rem, shb.big_endian())),
        )?;
        Ok(PcapNGReader { big_endian, stream })
    }

    /// Byte order of the current section
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }
}

impl<R: Read> PcapReaderIterator for PcapNGReader<R> {
    fn next(&mut self) -> Result<(usize, PcapBlockOwned), PcapError<&[u8]>> {
        if self.stream.at_end() {
            return Err(PcapError::Eof);
        }
        let data = self.stream.data();
        // the SHB magic reads the same in both byte orders
        let res = if self.big_endian {
            parse_block_be(data)
        } else {
            parse_block_le(data)
        };
        match res {
            Ok((rem, block)) => {
                if let Block::SectionHeader(ref shb) = block {
                    self.big_endian = shb.big_endian();
                }
                Ok((data.offset(rem), PcapBlockOwned::from(block)))
            }
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
