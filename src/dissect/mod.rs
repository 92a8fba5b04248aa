//! Ethernet / IPv4 / transport dissection
//!
//! The [`Dissector`] turns one Ethernet frame into zero or more [`Record`]s:
//!
//! 1. Ethernet header (only IPv4 is handled, other EtherTypes are skipped)
//! 2. IPv4 header, with fragment reassembly
//! 3. a [`HostSighting`] for the source and the destination address
//! 4. a [`PacketData`] record for TCP, UDP, ICMP echo replies and other IP protocols
//!    (plus a [`MeshSighting`](crate::records::MeshSighting) for ZEP traffic)
//!
//! A frame which cannot be decoded is dropped; this never interrupts the import.

pub mod fragment;

use std::borrow::Cow;
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::cursor::{ByteCursor, ByteOrder, Field};
use crate::error::FrameError;
use crate::protocol::{decode_mesh_sighting, zep};
use crate::records::*;

use self::fragment::{FragmentInfo, FragmentKey, Reassembler, Reassembly};

pub const ETHERNET_HEADER_LEN: usize = 14;

mod ethernet {
    use crate::cursor::Field;

    pub const DST_MAC: Field = Field::new("eth_dst", 0, 6);
    pub const SRC_MAC: Field = Field::new("eth_src", 6, 6);
    pub const ETHERTYPE: Field = Field::new("ethertype", 12, 2);
}

mod ipv4 {
    use crate::cursor::Field;

    pub const VERSION_IHL: Field = Field::new("ip_version_ihl", 0, 1);
    pub const TOTAL_LEN: Field = Field::new("ip_total_len", 2, 2);
    pub const IDENT: Field = Field::new("ip_id", 4, 2);
    pub const FRAGMENT: Field = Field::new("ip_fragment", 6, 2);
    pub const TTL: Field = Field::new("ip_ttl", 8, 1);
    pub const PROTOCOL: Field = Field::new("ip_protocol", 9, 1);
    pub const SRC: Field = Field::new("ip_src", 12, 4);
    pub const DST: Field = Field::new("ip_dst", 16, 4);

    pub const MIN_HEADER_LEN: usize = 20;
}

mod tcp {
    use crate::cursor::Field;

    pub const SRC_PORT: Field = Field::new("tcp_src_port", 0, 2);
    pub const DST_PORT: Field = Field::new("tcp_dst_port", 2, 2);
    pub const SEQ: Field = Field::new("tcp_seq", 4, 4);
    pub const ACK: Field = Field::new("tcp_ack", 8, 4);
    pub const OFFSET_FLAGS: Field = Field::new("tcp_offset_flags", 12, 2);
    pub const WINDOW: Field = Field::new("tcp_window", 14, 2);

    pub const MIN_HEADER_LEN: usize = 20;
    pub const OPTION_EOL: u8 = 0;
    pub const OPTION_NOP: u8 = 1;
    pub const OPTION_MSS: u8 = 2;
}

mod udp {
    use crate::cursor::Field;

    pub const SRC_PORT: Field = Field::new("udp_src_port", 0, 2);
    pub const DST_PORT: Field = Field::new("udp_dst_port", 2, 2);
    pub const LENGTH: Field = Field::new("udp_length", 4, 2);

    pub const HEADER_LEN: usize = 8;
}

mod icmp {
    use crate::cursor::Field;

    pub const TYPE: Field = Field::new("icmp_type", 0, 1);

    pub const ECHO_REPLY: u8 = 0;
}

/// Link and network layer values shared by all records of a frame
struct FrameContext {
    timestamp: i64,
    index: u64,
    frame_len: usize,
    src_mac: MacAddr,
    dst_mac: MacAddr,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    protocol: u8,
}

/// Stateful frame dissector. One instance is used per imported file.
#[derive(Debug)]
pub struct Dissector {
    source: CaptureSource,
    reassembler: Reassembler,
    dropped: u64,
}

impl Dissector {
    pub fn new(source: CaptureSource, max_fragment_sets: usize) -> Dissector {
        Dissector {
            source,
            reassembler: Reassembler::new(max_fragment_sets),
            dropped: 0,
        }
    }

    pub fn source(&self) -> &CaptureSource {
        &self.source
    }

    /// Number of frames dropped because they were malformed
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Dissect an Ethernet frame, appending records to `out`
    ///
    /// Returns the number of bytes accounted for by the emitted records: the frame length
    /// if a packet record was emitted, 0 otherwise (skipped protocol, pending fragment,
    /// malformed frame).
    pub fn dissect(&mut self, frame: &RawFrame, out: &mut Vec<Record>) -> usize {
        match self.dissect_frame(frame, out) {
            Ok(n) => n,
            Err(e) => {
                self.dropped += 1;
                debug!("frame {}: dropped: {}", frame.index, e);
                0
            }
        }
    }

    fn dissect_frame(&mut self, frame: &RawFrame, out: &mut Vec<Record>) -> Result<usize, FrameError> {
        let eth = ByteCursor::new(frame.data, ByteOrder::Big);
        let dst_mac = MacAddr::from_slice(eth.bytes(ethernet::DST_MAC)?);
        let src_mac = MacAddr::from_slice(eth.bytes(ethernet::SRC_MAC)?);
        let ethertype = eth.u16(ethernet::ETHERTYPE)?;
        if ethertype != ETHERTYPE_IPV4 {
            trace!("frame {}: skipping ethertype {:#06x}", frame.index, ethertype);
            return Ok(0);
        }
        let (dst_mac, src_mac) = match (dst_mac, src_mac) {
            (Some(d), Some(s)) => (d, s),
            _ => return Err(FrameError::Malformed { what: "MAC address" }),
        };

        let ip = eth.advance(ETHERNET_HEADER_LEN)?;
        let version_ihl = ip.u8(ipv4::VERSION_IHL)?;
        if version_ihl >> 4 != 4 {
            trace!("frame {}: skipping IP version {}", frame.index, version_ihl >> 4);
            return Ok(0);
        }
        let header_len = usize::from(version_ihl & 0x0f) * 4;
        if header_len < ipv4::MIN_HEADER_LEN {
            return Err(FrameError::Malformed {
                what: "IPv4 header length",
            });
        }
        let total_len = usize::from(ip.u16(ipv4::TOTAL_LEN)?);
        let ident = ip.u16(ipv4::IDENT)?;
        let fragment = FragmentInfo::from_word(ip.u16(ipv4::FRAGMENT)?);
        let ttl = ip.u8(ipv4::TTL)?;
        let protocol = ip.u8(ipv4::PROTOCOL)?;
        let src = Ipv4Addr::from(ip.u32(ipv4::SRC)?);
        let dst = Ipv4Addr::from(ip.u32(ipv4::DST)?);

        // Heuristic: with TCP segmentation offload, captures may hold a zero total length.
        // Trust the captured bytes in that case.
        let ip_end = if total_len == 0 {
            ip.len()
        } else {
            total_len.min(ip.len())
        };
        if header_len > ip_end {
            return Err(FrameError::OutOfBounds {
                field: "ip_payload",
                offset: header_len,
                len: 0,
                available: ip_end,
            });
        }
        let ip_payload = &ip.tail(0)?[header_len..ip_end];

        let key = FragmentKey { src, id: ident };
        let l4: Cow<[u8]> = match self.reassembler.push(key, fragment, ip_payload) {
            Reassembly::Unfragmented(p) => Cow::Borrowed(p),
            Reassembly::Pending => return Ok(0),
            Reassembly::Complete(datagram) => Cow::Owned(datagram),
        };

        out.push(Record::Host(HostSighting::with_mac(
            Cidr::host(src),
            src_mac,
            self.source.clone(),
        )));
        out.push(Record::Host(HostSighting::with_mac(
            Cidr::host(dst),
            dst_mac,
            self.source.clone(),
        )));

        let ctx = FrameContext {
            timestamp: frame.timestamp,
            index: frame.index,
            frame_len: frame.data.len(),
            src_mac,
            dst_mac,
            src,
            dst,
            ttl,
            protocol,
        };
        match protocol {
            IPPROTO_TCP => self.dissect_tcp(&ctx, &l4, out),
            IPPROTO_UDP => self.dissect_udp(&ctx, &l4, out),
            IPPROTO_ICMP => self.dissect_icmp(&ctx, &l4, out),
            _ => {
                let meta = self.metadata(&ctx, l4.len());
                Ok(self.emit(&ctx, meta, None, out))
            }
        }
    }

    fn metadata(&self, ctx: &FrameContext, payload_size: usize) -> PacketMetadata {
        PacketMetadata {
            source: self.source.clone(),
            timestamp: ctx.timestamp,
            frame: ctx.index,
            src_port: None,
            dst_port: None,
            protocol: ctx.protocol,
            src_addr: Cidr::host(ctx.src),
            dst_addr: Cidr::host(ctx.dst),
            src_mac: Some(ctx.src_mac),
            dst_mac: Some(ctx.dst_mac),
            ack: None,
            payload_size: payload_size as u64,
            ethertype: Some(ETHERTYPE_IPV4),
            mss: None,
            seq: None,
            ttl: Some(ctx.ttl),
            window: None,
            tcp_flags: None,
        }
    }

    fn emit(
        &self,
        ctx: &FrameContext,
        meta: PacketMetadata,
        payload: Option<Vec<u8>>,
        out: &mut Vec<Record>,
    ) -> usize {
        out.push(Record::Packet(PacketData {
            meta,
            progress_units: ctx.frame_len as u64,
            payload,
        }));
        ctx.frame_len
    }

    fn dissect_tcp(
        &self,
        ctx: &FrameContext,
        l4: &[u8],
        out: &mut Vec<Record>,
    ) -> Result<usize, FrameError> {
        let c = ByteCursor::new(l4, ByteOrder::Big);
        let src_port = c.u16(tcp::SRC_PORT)?;
        let dst_port = c.u16(tcp::DST_PORT)?;
        let seq = c.u32(tcp::SEQ)?;
        let ack = c.u32(tcp::ACK)?;
        let offset_flags = c.u16(tcp::OFFSET_FLAGS)?;
        let window = c.u16(tcp::WINDOW)?;
        let header_len = usize::from(offset_flags >> 12) * 4;
        if header_len < tcp::MIN_HEADER_LEN {
            return Err(FrameError::Malformed {
                what: "TCP data offset",
            });
        }
        let options = l4.get(tcp::MIN_HEADER_LEN..header_len.min(l4.len()));
        let mss = options.and_then(parse_mss_option);
        // Heuristic: a segment without data still carries an (empty) payload, so that
        // zero-length segments are recorded like any other.
        let payload = l4.get(header_len..).unwrap_or(&[]).to_vec();

        let mut meta = self.metadata(ctx, payload.len());
        meta.src_port = Some(src_port);
        meta.dst_port = Some(dst_port);
        meta.seq = Some(seq);
        meta.ack = Some(ack);
        meta.window = Some(window);
        meta.mss = mss;
        meta.tcp_flags = Some(TcpFlags::from_bits_truncate(offset_flags & 0x01ff));
        Ok(self.emit(ctx, meta, Some(payload), out))
    }

    fn dissect_udp(
        &self,
        ctx: &FrameContext,
        l4: &[u8],
        out: &mut Vec<Record>,
    ) -> Result<usize, FrameError> {
        let c = ByteCursor::new(l4, ByteOrder::Big);
        let src_port = c.u16(udp::SRC_PORT)?;
        let dst_port = c.u16(udp::DST_PORT)?;
        let udp_len = usize::from(c.u16(udp::LENGTH)?);
        let end = udp_len.min(l4.len());
        if end < udp::HEADER_LEN {
            return Err(FrameError::Malformed { what: "UDP length" });
        }
        let payload = &l4[udp::HEADER_LEN..end];

        if zep::is_zep(src_port, dst_port) {
            match decode_mesh_sighting(payload, &self.source) {
                Ok(mesh) => out.push(Record::Mesh(mesh)),
                Err(e) => debug!("frame {}: ZEP payload not decoded: {}", ctx.index, e),
            }
        }

        let mut meta = self.metadata(ctx, payload.len());
        meta.src_port = Some(src_port);
        meta.dst_port = Some(dst_port);
        let payload = if payload.is_empty() {
            None
        } else {
            Some(payload.to_vec())
        };
        Ok(self.emit(ctx, meta, payload, out))
    }

    fn dissect_icmp(
        &self,
        ctx: &FrameContext,
        l4: &[u8],
        out: &mut Vec<Record>,
    ) -> Result<usize, FrameError> {
        let c = ByteCursor::new(l4, ByteOrder::Big);
        // only replies confirm that a host exists
        if c.u8(icmp::TYPE)? != icmp::ECHO_REPLY {
            return Ok(0);
        }
        let meta = self.metadata(ctx, l4.len());
        Ok(self.emit(ctx, meta, None, out))
    }
}

/// Find the Maximum Segment Size in TCP options
fn parse_mss_option(options: &[u8]) -> Option<u16> {
    let mut i = options;
    while let Some((&kind, rem)) = i.split_first() {
        match kind {
            tcp::OPTION_EOL => return None,
            tcp::OPTION_NOP => i = rem,
            _ => {
                let len = usize::from(*rem.first()?);
                if len < 2 || len > i.len() {
                    return None;
                }
                if kind == tcp::OPTION_MSS && len == 4 {
                    let c = ByteCursor::new(i, ByteOrder::Big);
                    return c.u16(Field::new("tcp_mss", 2, 2)).ok();
                }
                i = &i[len..];
            }
        }
    }
    None
}
