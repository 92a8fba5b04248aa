//! Records produced by an import
//!
//! An import turns a capture file into a sequence of [`Record`] values:
//!
//! - [`HostSighting`]: an address was seen on the wire, with its MAC address;
//! - [`PacketData`]: one classified packet (or one direction of a Bro connection);
//! - [`MeshSighting`]: an IEEE 802.15.4 frame tunnelled through ZEP.
//!
//! Records own their data. The frame bytes they were decoded from are not retained.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use bitflags::bitflags;

/// Origin of the records: the file (or stream) being imported
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CaptureSource {
    name: Arc<str>,
}

impl CaptureSource {
    pub fn new<S: AsRef<str>>(name: S) -> CaptureSource {
        CaptureSource {
            name: Arc::from(name.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One captured frame, as handed from a file reader to the dissector
#[derive(Debug)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    /// Capture time, in milliseconds since epoch
    pub timestamp: i64,
    /// Frame index in the file, starting at 1
    pub index: u64,
}

/// An IPv4 network (address and prefix length)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cidr {
    addr: Ipv4Addr,
    bits: u8,
}

impl Cidr {
    /// Creates a network, masking host bits. Prefix lengths above 32 are clamped.
    pub fn new(addr: Ipv4Addr, bits: u8) -> Cidr {
        let bits = bits.min(32);
        let mask = if bits == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(bits))
        };
        Cidr {
            addr: Ipv4Addr::from(u32::from(addr) & mask),
            bits,
        }
    }

    /// A single host (`/32`)
    pub fn host(addr: Ipv4Addr) -> Cidr {
        Cidr::new(addr, 32)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

impl From<Ipv4Addr> for Cidr {
    fn from(addr: Ipv4Addr) -> Cidr {
        Cidr::host(addr)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.bits == 32 {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}/{}", self.addr, self.bits)
        }
    }
}

/// Ethernet hardware address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn from_slice(b: &[u8]) -> Option<MacAddr> {
        if b.len() != 6 {
            return None;
        }
        let mut a = [0u8; 6];
        a.copy_from_slice(b);
        Some(MacAddr(a))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

bitflags! {
    /// TCP control flags (low 9 bits of the data offset / flags word)
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TcpFlags: u16 {
        const FIN = 0x001;
        const SYN = 0x002;
        const RST = 0x004;
        const PSH = 0x008;
        const ACK = 0x010;
        const URG = 0x020;
        const ECE = 0x040;
        const CWR = 0x080;
        const NS  = 0x100;
    }
}

pub const ETHERTYPE_IPV4: u16 = 0x0800;

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// Metadata of a classified packet
///
/// Fields which do not apply to a packet (ports for ICMP, sequence numbers for UDP, MAC
/// addresses for Bro logs, ...) are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketMetadata {
    pub source: CaptureSource,
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub frame: u64,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// IP protocol number
    pub protocol: u8,
    pub src_addr: Cidr,
    pub dst_addr: Cidr,
    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    pub ack: Option<u32>,
    pub payload_size: u64,
    pub ethertype: Option<u16>,
    pub mss: Option<u16>,
    pub seq: Option<u32>,
    pub ttl: Option<u8>,
    pub window: Option<u16>,
    pub tcp_flags: Option<TcpFlags>,
}

/// A classified packet, with its progress units and optional payload
#[derive(Clone, Debug, PartialEq)]
pub struct PacketData {
    pub meta: PacketMetadata,
    /// Import progress accounted for by this record
    pub progress_units: u64,
    pub payload: Option<Vec<u8>>,
}

/// Property key used to attach a MAC address to a [`HostSighting`]
pub const PROPERTY_MAC: &str = "MAC";

/// An address observed on the wire
#[derive(Clone, Debug, PartialEq)]
pub struct HostSighting {
    pub addr: Cidr,
    pub properties: BTreeMap<String, String>,
    pub source: CaptureSource,
}

impl HostSighting {
    pub fn with_mac(addr: Cidr, mac: MacAddr, source: CaptureSource) -> HostSighting {
        let mut properties = BTreeMap::new();
        properties.insert(PROPERTY_MAC.to_owned(), mac.to_string());
        HostSighting {
            addr,
            properties,
            source,
        }
    }

    pub fn mac(&self) -> Option<&str> {
        self.properties.get(PROPERTY_MAC).map(String::as_str)
    }
}

/// IEEE 802.15.4 device address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceAddr {
    Short(u16),
    Extended(u64),
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceAddr::Short(a) => write!(f, "{:04x}", a),
            DeviceAddr::Extended(a) => {
                let b = a.to_be_bytes();
                write!(
                    f,
                    "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
                )
            }
        }
    }
}

/// An IEEE 802.15.4 frame carried over ZEP
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSighting {
    pub channel: Option<u8>,
    /// Destination device id from the ZEP header (hex)
    pub zep_dst_device: Option<String>,
    /// Source device id from the ZEP header (hex)
    pub zep_src_device: Option<String>,
    pub dst_device: Option<DeviceAddr>,
    pub src_device: Option<DeviceAddr>,
    pub target_pan: Option<u16>,
    /// Same as `target_pan` for intra-PAN frames, unknown otherwise
    pub source_pan: Option<u16>,
    pub intra_pan: bool,
    pub source: CaptureSource,
}

/// A record produced by an import
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Host(HostSighting),
    Packet(PacketData),
    Mesh(MeshSighting),
}

impl Record {
    /// Import progress accounted for by this record
    pub fn progress_units(&self) -> u64 {
        match self {
            Record::Packet(p) => p.progress_units,
            Record::Host(_) | Record::Mesh(_) => 0,
        }
    }

    pub fn as_packet(&self) -> Option<&PacketData> {
        match self {
            Record::Packet(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostSighting> {
        match self {
            Record::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshSighting> {
        match self {
            Record::Mesh(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_display() {
        let c = Cidr::new(Ipv4Addr::new(192, 168, 1, 77), 24);
        assert_eq!(c.addr(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(c.bits(), 24);
        assert_eq!(c.to_string(), "192.168.1.0/24");
        let h = Cidr::host(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(h.bits(), 32);
        assert_eq!(h.to_string(), "10.0.0.1");
        assert_eq!(Cidr::new(Ipv4Addr::new(10, 0, 0, 1), 40), h);
    }

    #[test]
    fn mac_and_device_display() {
        let mac = MacAddr([0x00, 0x1b, 0x21, 0xaa, 0x0f, 0xff]);
        assert_eq!(mac.to_string(), "00:1b:21:aa:0f:ff");
        assert_eq!(DeviceAddr::Short(0x1a2b).to_string(), "1a2b");
        assert_eq!(
            DeviceAddr::Extended(0x0011_2233_4455_6677).to_string(),
            "00:11:22:33:44:55:66:77"
        );
    }

    #[test]
    fn host_sighting_mac_property() {
        let h = HostSighting::with_mac(
            Cidr::host(Ipv4Addr::new(10, 1, 2, 3)),
            MacAddr([1, 2, 3, 4, 5, 6]),
            CaptureSource::new("test.pcap"),
        );
        assert_eq!(h.mac(), Some("01:02:03:04:05:06"));
        assert_eq!(Record::Host(h).progress_units(), 0);
    }
}
