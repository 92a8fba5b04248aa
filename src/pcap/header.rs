use nom::error::ParseError;
use nom::number::streaming::le_u32;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::linktype::Linktype;
use crate::PcapError;

/// Magic number of a little-endian file, as read little-endian
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
/// Magic number of a big-endian file, as read little-endian
pub const PCAP_MAGIC_SWAPPED: u32 = 0xd4c3_b2a1;

/// Size of the PCAP global header
pub const PCAP_HEADER_LEN: usize = 24;

/// PCAP global header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcapHeader {
    /// File format and byte ordering. If equal to `0xa1b2c3d4` then the rest of the file is
    /// little-endian. If `0xd4c3b2a1`, then all following fields are big-endian.
    pub magic_number: u32,
    /// Version major number (currently 2)
    pub version_major: u16,
    /// Version minor number (currently 4)
    pub version_minor: u16,
    /// The correction time in seconds between GMT (UTC) and the local timezone of the following packet header timestamps
    pub thiszone: i32,
    /// In theory, the accuracy of time stamps in the capture; in practice, all tools set it to 0
    pub sigfigs: u32,
    /// max len of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
}

impl PcapHeader {
    pub const fn size(&self) -> usize {
        PCAP_HEADER_LEN
    }

    pub fn is_bigendian(&self) -> bool {
        self.magic_number == PCAP_MAGIC_SWAPPED
    }
}

fn parse_header_fields<'a, En: PcapEndianness, E: ParseError<&'a [u8]>>(
    magic_number: u32,
    i: &'a [u8],
) -> IResult<&'a [u8], PcapHeader, E> {
    let (i, version_major) = En::parse_u16(i)?;
    let (i, version_minor) = En::parse_u16(i)?;
    let (i, thiszone) = En::parse_u32(i)?;
    let (i, sigfigs) = En::parse_u32(i)?;
    let (i, snaplen) = En::parse_u32(i)?;
    let (i, network) = En::parse_u32(i)?;
    let header = PcapHeader {
        magic_number,
        version_major,
        version_minor,
        thiszone: thiszone as i32,
        sigfigs,
        snaplen,
        network: Linktype(network as i32),
    };
    Ok((i, header))
}

/// Read the PCAP global header
///
/// The magic number is read little-endian and selects the byte order of the remaining
/// fields. Nanosecond and "modified" variants are not recognized.
pub fn parse_pcap_header(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError<&[u8]>> {
    let (i, magic_number) = le_u32(i)?;
    match magic_number {
        PCAP_MAGIC => parse_header_fields::<PcapLE, _>(magic_number, i),
        PCAP_MAGIC_SWAPPED => parse_header_fields::<PcapBE, _>(magic_number, i),
        _ => Err(nom::Err::Error(PcapError::HeaderNotRecognized)),
    }
}
