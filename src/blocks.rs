use crate::pcap::{LegacyPcapBlock, PcapHeader};
use crate::pcapng::Block;

/// One unit returned by a streaming reader: a legacy record, the legacy global header,
/// or any pcap-ng block
#[derive(Debug)]
pub enum PcapBlockOwned<'a> {
    Legacy(LegacyPcapBlock<'a>),
    LegacyHeader(PcapHeader),
    NG(Block<'a>),
}

impl<'a> PcapBlockOwned<'a> {
    /// Short name of the block, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            PcapBlockOwned::Legacy(_) => "record",
            PcapBlockOwned::LegacyHeader(_) => "header",
            PcapBlockOwned::NG(Block::SectionHeader(_)) => "SHB",
            PcapBlockOwned::NG(Block::InterfaceDescription(_)) => "IDB",
            PcapBlockOwned::NG(Block::EnhancedPacket(_)) => "EPB",
            PcapBlockOwned::NG(Block::SimplePacket(_)) => "SPB",
            PcapBlockOwned::NG(Block::Packet(_)) => "PB",
            PcapBlockOwned::NG(Block::Custom(_)) => "custom",
            PcapBlockOwned::NG(Block::Skipped(_)) => "skipped",
        }
    }
}

impl<'a> From<LegacyPcapBlock<'a>> for PcapBlockOwned<'a> {
    fn from(b: LegacyPcapBlock<'a>) -> PcapBlockOwned<'a> {
        PcapBlockOwned::Legacy(b)
    }
}

impl<'a> From<PcapHeader> for PcapBlockOwned<'a> {
    fn from(h: PcapHeader) -> PcapBlockOwned<'a> {
        PcapBlockOwned::LegacyHeader(h)
    }
}

impl<'a> From<Block<'a>> for PcapBlockOwned<'a> {
    fn from(b: Block<'a>) -> PcapBlockOwned<'a> {
        PcapBlockOwned::NG(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::{parse_pcap_frame, parse_pcap_header};
    use crate::pcap::tests::{FRAME_LE, PCAP_HDR_LE};
    use crate::pcapng::parse_block_le;
    use crate::pcapng::tests::SHB_LE;

    #[test]
    fn test_block_kind() {
        let (_, header) = parse_pcap_header(PCAP_HDR_LE).expect("header");
        let header = PcapBlockOwned::from(header);
        assert_eq!(header.kind(), "header");
        let (_, frame) = parse_pcap_frame(FRAME_LE).expect("frame");
        let frame = PcapBlockOwned::from(frame);
        assert_eq!(frame.kind(), "record");
        let (_, shb) = parse_block_le(SHB_LE).expect("shb");
        let shb = PcapBlockOwned::from(shb);
        assert_eq!(shb.kind(), "SHB");
    }
}
