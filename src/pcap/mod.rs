//! PCAP file format
//!
//! See <https://wiki.wireshark.org/Development/LibpcapFileFormat> for details.
//!
//! A legacy pcap file is a 24-bytes global header, followed by records. Each record is a
//! 16-bytes header (timestamp, captured and original lengths) followed by the frame data.
//! The byte order of the whole file is given by the magic number of the global header.
//!
//! Parse the header using [`parse_pcap_header`], then loop over [`parse_pcap_frame`] (or
//! [`parse_pcap_frame_be`]) to get the data, or let a [`LegacyPcapReader`] do it on any
//! `Read` input.

mod frame;
mod header;
mod reader;

pub use frame::*;
pub use header::*;
pub use reader::*;

#[cfg(test)]
pub mod tests {
    use hex_literal::hex;

    // little-endian header: version 2.4, GMT offset 0, snaplen 65535, linktype Ethernet
    pub const PCAP_HDR_LE: &[u8] = &hex!(
        "
D4 C3 B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
FF FF 00 00 01 00 00 00"
    );

    // same header, big-endian, GMT offset +3600
    pub const PCAP_HDR_BE: &[u8] = &hex!(
        "
A1 B2 C3 D4 00 02 00 04 00 00 0E 10 00 00 00 00
00 00 FF FF 00 00 00 01"
    );

    // record header: 1515933236.562913, caplen 4, origlen 60, followed by 4 bytes
    pub const FRAME_LE: &[u8] = &hex!(
        "
34 E4 5B 5A E1 96 08 00 04 00 00 00 3C 00 00 00
DE AD BE EF"
    );
}
