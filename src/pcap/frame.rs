use nom::bytes::streaming::take;
use nom::IResult;

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::utils::array_ref4;
use crate::PcapError;

/// Size of a record header
pub const PCAP_FRAME_HEADER_LEN: usize = 16;

/// Container for network data in legacy Pcap files
#[derive(Debug)]
pub struct LegacyPcapBlock<'a> {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
}

impl<'a> LegacyPcapBlock<'a> {
    /// Capture time in milliseconds since epoch, after applying the file GMT offset
    pub fn timestamp_millis(&self, thiszone: i32) -> i64 {
        (i64::from(self.ts_sec) + i64::from(thiszone)) * 1000 + i64::from(self.ts_usec) / 1000
    }

    /// Number of bytes used by this record in the file
    #[inline]
    pub fn record_len(&self) -> usize {
        PCAP_FRAME_HEADER_LEN + self.data.len()
    }
}

fn parse_pcap_frame_e<En: PcapEndianness>(
    i: &[u8],
) -> IResult<&[u8], LegacyPcapBlock, PcapError<&[u8]>> {
    if i.len() < PCAP_FRAME_HEADER_LEN {
        return Err(nom::Err::Incomplete(nom::Needed::new(
            PCAP_FRAME_HEADER_LEN - i.len(),
        )));
    }
    let ts_sec = En::u32_from_bytes(array_ref4(i, 0));
    let ts_usec = En::u32_from_bytes(array_ref4(i, 4));
    let caplen = En::u32_from_bytes(array_ref4(i, 8));
    let origlen = En::u32_from_bytes(array_ref4(i, 12));
    let (i, data) = take(caplen as usize)(&i[PCAP_FRAME_HEADER_LEN..])?;
    let block = LegacyPcapBlock {
        ts_sec,
        ts_usec,
        caplen,
        origlen,
        data,
    };
    Ok((i, block))
}

/// Read a PCAP record header and data
///
/// Each PCAP record starts with a small header, and is followed by packet data.
/// The packet data format depends on the LinkType.
pub fn parse_pcap_frame(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError<&[u8]>> {
    parse_pcap_frame_e::<PcapLE>(i)
}

/// Read a PCAP record header and data (big-endian)
pub fn parse_pcap_frame_be(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError<&[u8]>> {
    parse_pcap_frame_e::<PcapBE>(i)
}
