use nom::error::{ErrorKind, ParseError};
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::traits::PcapNGPacketBlock;
use crate::utils::{array_ref2, array_ref4};
use crate::PcapError;

use super::*;

/// The Packet Block is obsolete, and replaced by the Enhanced Packet Block.
///
/// Old writers still produce it. Its layout is the one of an EPB, with a 16-bits
/// interface ID followed by a drops counter.
#[derive(Debug)]
pub struct PacketBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u16,
    pub drops: u16,
    pub ts_high: u32,
    pub ts_low: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> PacketBlock<'a> {
    /// Decode the packet timestamp, in milliseconds since epoch
    #[inline]
    pub fn timestamp_millis(&self, ts_offset: i64, resolution: u64) -> i64 {
        ts_to_millis(self.ts_high, self.ts_low, ts_offset, resolution)
    }
}

impl<'a> PcapNGPacketBlock for PacketBlock<'a> {
    fn big_endian(&self) -> bool {
        self.block_type != PB_MAGIC
    }
    fn orig_len(&self) -> u32 {
        self.origlen
    }
    fn packet_data(&self) -> &[u8] {
        unpadded(self.data, self.caplen)
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, PacketBlock<'a>> for PacketBlock<'a> {
    const HDR_SZ: usize = 32;
    const MAGIC: u32 = PB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], PacketBlock<'a>, E> {
        let (b_hdr, packet_data) = i.split_at(20);
        let if_id = En::u16_from_bytes(array_ref2(b_hdr, 0));
        let drops = En::u16_from_bytes(array_ref2(b_hdr, 2));
        let ts_high = En::u32_from_bytes(array_ref4(b_hdr, 4));
        let ts_low = En::u32_from_bytes(array_ref4(b_hdr, 8));
        let caplen = En::u32_from_bytes(array_ref4(b_hdr, 12));
        let origlen = En::u32_from_bytes(array_ref4(b_hdr, 16));
        if block_len2 != block_len1 {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        let (i, (data, options)) = packet_body::<En, E>(packet_data, block_len1, caplen)?;
        let block = PacketBlock {
            block_type,
            block_len1,
            if_id,
            drops,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Packet Block (little-endian)
pub fn parse_packetblock_le(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<PacketBlock, PcapLE, _, _>()(i)
}

/// Parse a Packet Block (big-endian)
pub fn parse_packetblock_be(i: &[u8]) -> IResult<&[u8], PacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<PacketBlock, PcapBE, _, _>()(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_packet_block() {
        // interface 1, 2 drops, 3 bytes of data
        let data = hex!(
            "
00 00 00 02 00 00 00 24 00 01 00 02 00 00 00 00
00 0F 42 40 00 00 00 03 00 00 00 05 AA BB CC 00
00 00 00 24"
        );
        let (rem, pb) = parse_packetblock_be(&data).expect("packet block");
        assert!(rem.is_empty());
        assert!(pb.big_endian());
        assert_eq!(pb.if_id, 1);
        assert_eq!(pb.drops, 2);
        assert!(pb.truncated());
        assert_eq!(pb.packet_data(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(pb.timestamp_millis(0, DEFAULT_RESOLUTION), 1000);
    }
}
