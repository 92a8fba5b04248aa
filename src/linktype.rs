use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of the packet. Only Ethernet frames are dissected; other link types are reported
/// and then decoded as Ethernet.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,
    RAW = 101,
    LINUX_SLL = 113,
    IEEE802_15_4_WITHFCS = 195,
    IPV4 = 228,
    IPV6 = 229,
    IEEE802_15_4_NOFCS = 230,
}
}

impl Linktype {
    /// Returns true if frames of this link type start with an Ethernet header
    pub fn is_ethernet(self) -> bool {
        self == Linktype::ETHERNET
    }
}
