use crate::blocks::PcapBlockOwned;
use crate::error::PcapError;

/// Frame held by a pcap-ng packet block (EPB, SPB or PB)
pub trait PcapNGPacketBlock {
    /// Byte order of the section holding the block
    fn big_endian(&self) -> bool;
    /// Length of the frame on the wire
    fn orig_len(&self) -> u32;
    /// Captured bytes, without the block padding
    fn packet_data(&self) -> &[u8];

    /// The capture kept fewer bytes than the frame had
    fn truncated(&self) -> bool {
        (self.packet_data().len() as u64) < u64::from(self.orig_len())
    }
}

/// Block-by-block reader over a capture file held in a bounded buffer
///
/// A block returned by `next` borrows the buffer. The caller handles it, drops it, and then
/// calls `consume` with the returned size. `PcapError::Incomplete` asks for a `refill`,
/// `PcapError::BufferTooSmall` for a `grow`, and `PcapError::Eof` ends the input.
pub trait PcapReaderIterator {
    /// Get the next pcap block, if possible. Returns the number of bytes read and the block.
    ///
    /// The returned object is valid until `consume` or `refill` is called.
    fn next(&mut self) -> Result<(usize, PcapBlockOwned), PcapError<&[u8]>>;
    /// Consume data, and shift buffer if needed.
    ///
    /// **The blocks already read, and underlying data, must be discarded before calling
    /// this function.**
    fn consume(&mut self, offset: usize);
    /// Get the number of consumed bytes
    fn consumed(&self) -> usize;
    /// Refill the internal buffer, shifting it if necessary.
    ///
    /// **The blocks already read, and underlying data, must be discarded before calling
    /// this function.**
    fn refill(&mut self) -> Result<(), PcapError<&[u8]>>;
    /// Grow size of the internal buffer.
    fn grow(&mut self, new_size: usize) -> bool;
    /// Capacity of the internal buffer
    fn capacity(&self) -> usize;
    /// Returns true if underlying reader is exhausted
    ///
    /// Note that exhausted reader only means that next `refill` will not
    /// add any data, but there can still be data not consumed in the current buffer.
    fn reader_exhausted(&self) -> bool;
}
