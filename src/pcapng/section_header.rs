use nom::error::ParseError;
use nom::number::streaming::le_u32;
use nom::{Err, IResult};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::utils::array_ref4;
use crate::PcapError;

use super::*;

/// Section Header Block (SHB)
///
/// Starts a section. Interfaces declared before it are forgotten, and the byte order of
/// the following blocks is the one of its byte-order magic.
#[derive(Debug)]
pub struct SectionHeaderBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Byte-order magic, as read little-endian
    pub bom: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Length of the section, -1 if unknown
    pub section_len: i64,
    pub options: Vec<PcapNGOption<'a>>,
    pub block_len2: u32,
}

impl<'a> SectionHeaderBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.bom != BOM_MAGIC
    }
}

impl<'a, En: PcapEndianness> PcapNGBlockParser<'a, En, SectionHeaderBlock<'a>>
    for SectionHeaderBlock<'a>
{
    const HDR_SZ: usize = 28;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, E> {
        let (i, bom) = En::parse_u32(i)?;
        let (i, major_version) = En::parse_u16(i)?;
        let (i, minor_version) = En::parse_u16(i)?;
        let (i, section_len) = En::parse_i64(i)?;
        let (i, options) = opt_parse_options::<En, E>(i, block_len1 as usize, 28)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom: if En::BIG_ENDIAN { bom.swap_bytes() } else { bom },
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a little-endian Section Header Block
pub fn parse_sectionheaderblock_le(
    i: &[u8],
) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    ng_block_parser::<SectionHeaderBlock, PcapLE, _, _>()(i)
}

/// Parse a big-endian Section Header Block
pub fn parse_sectionheaderblock_be(
    i: &[u8],
) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    ng_block_parser::<SectionHeaderBlock, PcapBE, _, _>()(i)
}

/// Parse a Section Header Block in either byte order
///
/// Anything other than the SHB type followed by a valid byte-order magic at offset 8 is
/// `HeaderNotRecognized`.
pub fn parse_sectionheaderblock(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, PcapError<&[u8]>> {
    if i.len() < 12 {
        return Err(Err::Incomplete(nom::Needed::new(12 - i.len())));
    }
    let (_, block_type) = le_u32(i)?;
    if block_type != SHB_MAGIC {
        return Err(Err::Error(PcapError::HeaderNotRecognized));
    }
    let bom = u32::from_le_bytes(array_ref4(i, 8));
    if bom == BOM_MAGIC {
        parse_sectionheaderblock_le(i)
    } else if bom == BOM_MAGIC.swap_bytes() {
        parse_sectionheaderblock_be(i)
    } else {
        Err(Err::Error(PcapError::HeaderNotRecognized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcapng::tests::{SHB_BE, SHB_LE};

    #[test]
    fn test_parse_shb() {
        let (rem, shb) = parse_sectionheaderblock(SHB_LE).expect("shb le");
        assert!(rem.is_empty());
        assert!(!shb.big_endian());
        assert_eq!(shb.major_version, 1);
        assert_eq!(shb.minor_version, 0);
        assert_eq!(shb.section_len, -1);
        assert!(shb.options.is_empty());

        let (rem, shb) = parse_sectionheaderblock(SHB_BE).expect("shb be");
        assert!(rem.is_empty());
        assert!(shb.big_endian());
        assert_eq!(shb.block_len1, 28);
        assert_eq!(shb.major_version, 1);
    }

    #[test]
    fn test_shb_bad_magic() {
        let mut data = SHB_LE.to_vec();
        data[8] = 0;
        assert!(matches!(
            parse_sectionheaderblock(&data),
            Err(Err::Error(PcapError::HeaderNotRecognized))
        ));
        // an EPB is not a section header
        let data = crate::pcapng::tests::EPB_LE;
        assert!(parse_sectionheaderblock(data).is_err());
    }
}
