use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::error::*;
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::PcapError;

use super::*;

/// A block from a PcapNG file
#[derive(Debug)]
pub enum Block<'a> {
    SectionHeader(SectionHeaderBlock<'a>),
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    EnhancedPacket(EnhancedPacketBlock<'a>),
    SimplePacket(SimplePacketBlock<'a>),
    Packet(PacketBlock<'a>),
    /// Custom block (`0x00000BAD` or `0x40000BAD`)
    Custom(OpaqueBlock<'a>),
    /// Known block type, not needed to decode packets
    Skipped(OpaqueBlock<'a>),
}

impl<'a> Block<'a> {
    /// Returns true if blocks contains a network packet
    pub fn is_data_block(&self) -> bool {
        matches!(
            self,
            &Block::EnhancedPacket(_) | &Block::SimplePacket(_) | &Block::Packet(_)
        )
    }

    /// Return the normalized magic number of the block
    pub fn magic(&self) -> u32 {
        match self {
            Block::SectionHeader(_) => SHB_MAGIC,
            Block::InterfaceDescription(_) => IDB_MAGIC,
            Block::EnhancedPacket(_) => EPB_MAGIC,
            Block::SimplePacket(_) => SPB_MAGIC,
            Block::Packet(_) => PB_MAGIC,
            Block::Custom(b) | Block::Skipped(b) => b.block_type,
        }
    }
}

/// A block whose content is not interpreted
#[derive(Debug)]
pub struct OpaqueBlock<'a> {
    /// Block type, in the section byte order
    pub block_type: u32,
    pub block_len1: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, OpaqueBlock<'a>> for OpaqueBlock<'a> {
    const HDR_SZ: usize = BLOCK_OVERHEAD;
    const MAGIC: u32 = 0;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], OpaqueBlock<'a>, E> {
        let block = OpaqueBlock {
            block_type: En::native_u32(block_type),
            block_len1,
            data: i,
            block_len2,
        };
        Ok((i, block))
    }
}

fn parse_block_e<En: PcapEndianness>(i: &[u8]) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    let (_, id) = En::parse_u32(i)?;
    match id {
        SHB_MAGIC => map(parse_sectionheaderblock, Block::SectionHeader)(i),
        IDB_MAGIC => map(
            ng_block_parser::<InterfaceDescriptionBlock, En, _, _>(),
            Block::InterfaceDescription,
        )(i),
        EPB_MAGIC => map(
            ng_block_parser::<EnhancedPacketBlock, En, _, _>(),
            Block::EnhancedPacket,
        )(i),
        SPB_MAGIC => map(
            ng_block_parser::<SimplePacketBlock, En, _, _>(),
            Block::SimplePacket,
        )(i),
        PB_MAGIC => map(ng_block_parser::<PacketBlock, En, _, _>(), Block::Packet)(i),
        CB_MAGIC | DCB_MAGIC => map(ng_block_parser::<OpaqueBlock, En, _, _>(), Block::Custom)(i),
        NRB_MAGIC | ISB_MAGIC | IRIG_MAGIC | ARINC_MAGIC => {
            map(ng_block_parser::<OpaqueBlock, En, _, _>(), Block::Skipped)(i)
        }
        id if id & LOCAL_USE_MASK != 0 => {
            map(ng_block_parser::<OpaqueBlock, En, _, _>(), Block::Skipped)(i)
        }
        _ => Err(Err::Error(PcapError::from_error_kind(i, ErrorKind::Tag))),
    }
}

/// Parse a block of a little-endian section
///
/// The byte order comes from the last Section Header Block, see
/// [`parse_sectionheaderblock`]. A new SHB is recognized in either order.
pub fn parse_block_le(i: &[u8]) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    parse_block_e::<PcapLE>(i)
}

/// Parse a block of a big-endian section
pub fn parse_block_be(i: &[u8]) -> IResult<&[u8], Block, PcapError<&[u8]>> {
    parse_block_e::<PcapBE>(i)
}

/// Body parser of one block type
pub(crate) trait PcapNGBlockParser<'a, En: PcapEndianness, O: 'a> {
    /// Smallest valid block length, header and trailer included
    const HDR_SZ: usize;
    /// Block type, 0 to accept any
    const MAGIC: u32;

    /// Parse the block body. Type and length were already checked.
    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], O, E>;
}

/// Build the parser of a whole block (header, body and trailer) from its body parser
///
/// The declared length must be a multiple of 4 and at least `P::HDR_SZ`. The remaining
/// input always starts right after the declared length.
pub(crate) fn ng_block_parser<'a, P, En, O, E>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O, E>
where
    P: PcapNGBlockParser<'a, En, O>,
    En: PcapEndianness,
    O: 'a,
    E: ParseError<&'a [u8]>,
{
    move |i: &'a [u8]| {
        if i.len() < 8 {
            return Err(Err::Incomplete(nom::Needed::new(8 - i.len())));
        }
        let (rem, block_type) = nom::number::streaming::le_u32(i)?;
        let (rem, block_len1) = En::parse_u32(rem)?;
        let bad_len = block_len1 < P::HDR_SZ as u32 || block_len1 % 4 != 0;
        let bad_type = P::MAGIC != 0 && En::native_u32(block_type) != P::MAGIC;
        if bad_len || bad_type {
            return Err(Err::Error(E::from_error_kind(rem, ErrorKind::Verify)));
        }
        let (rem, body) = take(block_len1 as usize - BLOCK_OVERHEAD)(rem)?;
        let (rem, block_len2) = En::parse_u32(rem)?;
        let (_, block) = P::inner_parse(block_type, block_len1, body, block_len2)?;
        Ok((rem, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcapng::tests::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_local_use_block() {
        let mut data = LOCAL_USE_LE.to_vec();
        data.extend_from_slice(EPB_LE);
        let (rem, block) = parse_block_le(&data).expect("local-use block");
        match block {
            Block::Skipped(ref b) => {
                assert_eq!(b.block_type, 0xffff_fff0);
                assert_eq!(b.block_len1, 40);
                assert_eq!(b.data.len(), 28);
            }
            ref b => panic!("unexpected block {:?}", b),
        }
        assert_eq!(rem, EPB_LE);
        let (rem, block) = parse_block_le(rem).expect("epb");
        assert!(rem.is_empty());
        assert!(block.is_data_block());
    }

    #[test]
    fn test_parse_skipped_and_custom() {
        // interface statistics, 12 bytes (no content)
        let isb = hex!("05 00 00 00 0C 00 00 00 0C 00 00 00");
        let (_, block) = parse_block_le(&isb).expect("isb");
        assert!(matches!(block, Block::Skipped(_)));
        assert_eq!(block.magic(), ISB_MAGIC);
        let cb = hex!("00 00 0B AD 00 00 00 10 00 00 00 01 00 00 00 10");
        let (_, block) = parse_block_be(&cb).expect("custom block");
        assert!(matches!(block, Block::Custom(_)));
        assert_eq!(block.magic(), CB_MAGIC);
    }

    #[test]
    fn test_invalid_blocks() {
        // block type 0
        let data = hex!("00 00 00 00 0C 00 00 00 0C 00 00 00");
        assert!(matches!(
            parse_block_le(&data),
            Err(Err::Error(PcapError::NomError(_, ErrorKind::Tag)))
        ));
        // length not a multiple of 4
        let data = hex!("05 00 00 00 0D 00 00 00 00 0D 00 00 00");
        assert!(matches!(
            parse_block_le(&data),
            Err(Err::Error(PcapError::NomError(_, ErrorKind::Verify)))
        ));
        // length below the generic overhead
        let data = hex!("05 00 00 00 08 00 00 00 08 00 00 00");
        assert!(matches!(
            parse_block_le(&data),
            Err(Err::Error(PcapError::NomError(_, ErrorKind::Verify)))
        ));
        // unsupported but well-formed block type
        let data = hex!("09 00 00 00 0C 00 00 00 0C 00 00 00");
        assert!(parse_block_le(&data).is_err());
    }

    #[test]
    fn test_incomplete_block() {
        assert!(matches!(
            parse_block_le(&EPB_LE[..20]),
            Err(Err::Incomplete(_))
        ));
    }
}
