//! Bro/Zeek connection logs
//!
//! A `conn.log` describes connections, not packets. Each line is turned into one packet
//! record per direction which carried data, so that the downstream graph sees the same
//! kind of records as for a capture file. These records have no MAC address, TTL or
//! TCP flags.
//!
//! Two encodings are supported: the tab-separated format with `#` directives
//! ([`conn_log`]) and the JSON format, one object per line ([`json`]).

pub mod conn_log;
pub mod json;

use std::net::Ipv4Addr;

use crate::records::*;

/// Milliseconds since epoch from a `seconds.fraction` timestamp
///
/// Only the first 3 digits of the fraction are used.
pub fn parse_ts_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    let (secs, frac) = match s.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (s, ""),
    };
    let secs: i64 = secs.parse().ok()?;
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut millis = 0;
    for i in 0..3 {
        let digit = frac.as_bytes().get(i).map_or(0, |b| i64::from(b - b'0'));
        millis = millis * 10 + digit;
    }
    // the fraction has the sign of the whole value, including "-0.5"
    if s.starts_with('-') {
        millis = -millis;
    }
    secs.checked_mul(1000)?.checked_add(millis)
}

/// IP protocol number from a Bro protocol name (0 if unknown)
pub fn protocol_number(name: &str) -> u8 {
    if name.eq_ignore_ascii_case("tcp") {
        IPPROTO_TCP
    } else if name.eq_ignore_ascii_case("udp") {
        IPPROTO_UDP
    } else if name.eq_ignore_ascii_case("icmp") {
        IPPROTO_ICMP
    } else {
        0
    }
}

/// One direction of a connection
pub(crate) struct Flow {
    pub src: Ipv4Addr,
    pub src_port: Option<u16>,
    pub dst: Ipv4Addr,
    pub dst_port: Option<u16>,
}

impl Flow {
    pub(crate) fn reversed(&self) -> Flow {
        Flow {
            src: self.dst,
            src_port: self.dst_port,
            dst: self.src,
            dst_port: self.src_port,
        }
    }
}

pub(crate) fn connection_record(
    source: &CaptureSource,
    timestamp: i64,
    line: u64,
    flow: &Flow,
    protocol: u8,
    payload_size: u64,
    progress_units: u64,
) -> Record {
    let meta = PacketMetadata {
        source: source.clone(),
        timestamp,
        frame: line,
        src_port: flow.src_port,
        dst_port: flow.dst_port,
        protocol,
        src_addr: Cidr::host(flow.src),
        dst_addr: Cidr::host(flow.dst),
        src_mac: None,
        dst_mac: None,
        ack: None,
        payload_size,
        ethertype: Some(ETHERTYPE_IPV4),
        mss: None,
        seq: None,
        ttl: None,
        window: None,
        tcp_flags: None,
    };
    Record::Packet(PacketData {
        meta,
        progress_units,
        payload: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps() {
        assert_eq!(parse_ts_millis("1331901000.000000"), Some(1_331_901_000_000));
        assert_eq!(parse_ts_millis("1331901000.1"), Some(1_331_901_000_100));
        assert_eq!(parse_ts_millis("1331901000.987654"), Some(1_331_901_000_987));
        assert_eq!(parse_ts_millis("1331901000"), Some(1_331_901_000_000));
        assert_eq!(parse_ts_millis("-"), None);
        assert_eq!(parse_ts_millis("12.3e4"), None);
    }

    #[test]
    fn negative_timestamps() {
        assert_eq!(parse_ts_millis("-1.5"), Some(-1_500));
        assert_eq!(parse_ts_millis("-0.25"), Some(-250));
        assert_eq!(parse_ts_millis("-2"), Some(-2_000));
    }

    #[test]
    fn protocols() {
        assert_eq!(protocol_number("tcp"), 6);
        assert_eq!(protocol_number("UDP"), 17);
        assert_eq!(protocol_number("icmp"), 1);
        assert_eq!(protocol_number("sctp"), 0);
    }
}
