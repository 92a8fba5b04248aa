use nom::bytes::streaming::take;
use nom::error::{ErrorKind, ParseError};
use nom::{Err, IResult};
use rusticata_macros::align32;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::traits::PcapNGPacketBlock;
use crate::utils::array_ref4;
use crate::PcapError;

use super::*;

/// Enhanced Packet Block (EPB)
///
/// Fields are decoded in the section byte order. `data` keeps the padding to 32 bits,
/// [`PcapNGPacketBlock::packet_data`] strips it.
#[derive(Debug)]
pub struct EnhancedPacketBlock<'a> {
    /// Raw block type, byte-swapped in big-endian sections
    pub block_type: u32,
    pub block_len1: u32,
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> EnhancedPacketBlock<'a> {
    /// Timestamp in milliseconds since epoch, using the resolution and offset of the
    /// [`InterfaceDescriptionBlock`] numbered `if_id`
    #[inline]
    pub fn timestamp_millis(&self, ts_offset: i64, resolution: u64) -> i64 {
        ts_to_millis(self.ts_high, self.ts_low, ts_offset, resolution)
    }
}

impl<'a> PcapNGPacketBlock for EnhancedPacketBlock<'a> {
    fn big_endian(&self) -> bool {
        self.block_type != EPB_MAGIC
    }
    fn orig_len(&self) -> u32 {
        self.origlen
    }
    fn packet_data(&self) -> &[u8] {
        unpadded(self.data, self.caplen)
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, EnhancedPacketBlock<'a>>
    for EnhancedPacketBlock<'a>
{
    const HDR_SZ: usize = 32;
    const MAGIC: u32 = EPB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], EnhancedPacketBlock<'a>, E> {
        let (b_hdr, packet_data) = i.split_at(20);
        let if_id = En::u32_from_bytes(array_ref4(b_hdr, 0));
        let ts_high = En::u32_from_bytes(array_ref4(b_hdr, 4));
        let ts_low = En::u32_from_bytes(array_ref4(b_hdr, 8));
        let caplen = En::u32_from_bytes(array_ref4(b_hdr, 12));
        let origlen = En::u32_from_bytes(array_ref4(b_hdr, 16));
        if block_len2 != block_len1 {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        let (i, (data, options)) = packet_body::<En, E>(packet_data, block_len1, caplen)?;
        let block = EnhancedPacketBlock {
            block_type,
            block_len1,
            if_id,
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

/// Padded packet data and options following the fixed fields of an EPB or PB
///
/// The captured length must fit in the block.
pub(crate) fn packet_body<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
    block_len: u32,
    caplen: u32,
) -> IResult<&'a [u8], (&'a [u8], Vec<PcapNGOption<'a>>), E> {
    if caplen >= u32::MAX - 4 {
        return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
    }
    let padded = align32!(caplen);
    let (rem, data) = take::<_, _, E>(padded)(i)
        .map_err(|_| Err::Error(E::from_error_kind(i, ErrorKind::Verify)))?;
    let (rem, options) = opt_parse_options::<En, E>(rem, block_len as usize, 32 + padded as usize)?;
    Ok((rem, (data, options)))
}

/// Parse an Enhanced Packet Block (little-endian)
pub fn parse_enhancedpacketblock_le(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<EnhancedPacketBlock, PcapLE, _, _>()(i)
}

/// Parse an Enhanced Packet Block (big-endian)
pub fn parse_enhancedpacketblock_be(
    i: &[u8],
) -> IResult<&[u8], EnhancedPacketBlock, PcapError<&[u8]>> {
    ng_block_parser::<EnhancedPacketBlock, PcapBE, _, _>()(i)
}
