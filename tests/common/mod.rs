//! Builders for synthetic captures
#![allow(dead_code)]

use pcap_ingest::channel::RecordSink;
use pcap_ingest::import::{import_reader, CaptureFormat, ImportControl, ImportSummary};
use pcap_ingest::{CaptureSource, ImportConfig, ImportError, Record};

pub const MAC_A: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
pub const MAC_B: [u8; 6] = [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb];

pub const ETHERTYPE_ARP: u16 = 0x0806;

/// IPv4 header fields of a test datagram
#[derive(Clone, Copy, Debug)]
pub struct Ip {
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub protocol: u8,
    pub ident: u16,
    /// flags (3 bits) and fragment offset in 8-bytes units
    pub fragment: u16,
    pub ttl: u8,
}

impl Ip {
    pub fn new(src: [u8; 4], dst: [u8; 4], protocol: u8) -> Ip {
        Ip {
            src,
            dst,
            protocol,
            ident: 1,
            fragment: 0,
            ttl: 64,
        }
    }
}

pub fn ethernet(dst: [u8; 6], src: [u8; 6], ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(14 + payload.len());
    v.extend_from_slice(&dst);
    v.extend_from_slice(&src);
    v.extend_from_slice(&ethertype.to_be_bytes());
    v.extend_from_slice(payload);
    v
}

pub fn ipv4(ip: &Ip, payload: &[u8]) -> Vec<u8> {
    let total_len = (20 + payload.len()) as u16;
    let mut v = Vec::with_capacity(total_len as usize);
    v.extend_from_slice(&[0x45, 0x00]);
    v.extend_from_slice(&total_len.to_be_bytes());
    v.extend_from_slice(&ip.ident.to_be_bytes());
    v.extend_from_slice(&ip.fragment.to_be_bytes());
    v.extend_from_slice(&[ip.ttl, ip.protocol, 0, 0]);
    v.extend_from_slice(&ip.src);
    v.extend_from_slice(&ip.dst);
    v.extend_from_slice(payload);
    v
}

/// TCP segment without options
pub fn tcp(src_port: u16, dst_port: u16, seq: u32, ack: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(20 + payload.len());
    v.extend_from_slice(&src_port.to_be_bytes());
    v.extend_from_slice(&dst_port.to_be_bytes());
    v.extend_from_slice(&seq.to_be_bytes());
    v.extend_from_slice(&ack.to_be_bytes());
    v.extend_from_slice(&[0x50, flags]);
    v.extend_from_slice(&8192u16.to_be_bytes());
    v.extend_from_slice(&[0, 0, 0, 0]);
    v.extend_from_slice(payload);
    v
}

pub fn udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + payload.len());
    v.extend_from_slice(&src_port.to_be_bytes());
    v.extend_from_slice(&dst_port.to_be_bytes());
    v.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    v.extend_from_slice(&[0, 0]);
    v.extend_from_slice(payload);
    v
}

/// Ethernet frame from MAC_A to MAC_B holding an IPv4 datagram
pub fn ip_frame(ip: &Ip, l4: &[u8]) -> Vec<u8> {
    ethernet(MAC_B, MAC_A, 0x0800, &ipv4(ip, l4))
}

/// A captured frame: seconds, microseconds (or sub-second units), data
pub struct Frame {
    pub ts_sec: u32,
    pub ts_frac: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(ts_sec: u32, ts_frac: u32, data: Vec<u8>) -> Frame {
        Frame {
            ts_sec,
            ts_frac,
            data,
        }
    }
}

fn put_u16(v: &mut Vec<u8>, n: u16, big_endian: bool) {
    if big_endian {
        v.extend_from_slice(&n.to_be_bytes());
    } else {
        v.extend_from_slice(&n.to_le_bytes());
    }
}

fn put_u32(v: &mut Vec<u8>, n: u32, big_endian: bool) {
    if big_endian {
        v.extend_from_slice(&n.to_be_bytes());
    } else {
        v.extend_from_slice(&n.to_le_bytes());
    }
}

/// Legacy pcap file, Ethernet linktype, microsecond timestamps
pub fn pcap_file(big_endian: bool, frames: &[Frame]) -> Vec<u8> {
    let mut v = Vec::new();
    put_u32(&mut v, 0xa1b2_c3d4, big_endian);
    put_u16(&mut v, 2, big_endian);
    put_u16(&mut v, 4, big_endian);
    put_u32(&mut v, 0, big_endian);
    put_u32(&mut v, 0, big_endian);
    put_u32(&mut v, 65535, big_endian);
    put_u32(&mut v, 1, big_endian);
    for f in frames {
        put_u32(&mut v, f.ts_sec, big_endian);
        put_u32(&mut v, f.ts_frac, big_endian);
        put_u32(&mut v, f.data.len() as u32, big_endian);
        put_u32(&mut v, f.data.len() as u32, big_endian);
        v.extend_from_slice(&f.data);
    }
    v
}

/// Generic pcapng block: type, length, body (padded to 32 bits), length
pub fn pcapng_block(big_endian: bool, block_type: u32, body: &[u8]) -> Vec<u8> {
    let padded = (body.len() + 3) & !3;
    let len = (12 + padded) as u32;
    let mut v = Vec::with_capacity(len as usize);
    put_u32(&mut v, block_type, big_endian);
    put_u32(&mut v, len, big_endian);
    v.extend_from_slice(body);
    v.resize(8 + padded, 0);
    put_u32(&mut v, len, big_endian);
    v
}

pub fn pcapng_shb(big_endian: bool) -> Vec<u8> {
    let mut body = Vec::new();
    put_u32(&mut body, 0x1a2b_3c4d, big_endian);
    put_u16(&mut body, 1, big_endian);
    put_u16(&mut body, 0, big_endian);
    body.extend_from_slice(&[0xff; 8]);
    pcapng_block(big_endian, 0x0a0d_0d0a, &body)
}

/// Interface description block, Ethernet linktype, with an optional `if_tsresol`
pub fn pcapng_idb(big_endian: bool, tsresol: Option<u8>) -> Vec<u8> {
    let mut body = Vec::new();
    put_u16(&mut body, 1, big_endian);
    put_u16(&mut body, 0, big_endian);
    put_u32(&mut body, 0, big_endian);
    if let Some(r) = tsresol {
        put_u16(&mut body, 9, big_endian);
        put_u16(&mut body, 1, big_endian);
        body.extend_from_slice(&[r, 0, 0, 0]);
        // opt_endofopt
        body.extend_from_slice(&[0, 0, 0, 0]);
    }
    pcapng_block(big_endian, 1, &body)
}

/// Enhanced packet block, `ts` in units of the interface resolution
pub fn pcapng_epb(big_endian: bool, if_id: u32, ts: u64, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    put_u32(&mut body, if_id, big_endian);
    put_u32(&mut body, (ts >> 32) as u32, big_endian);
    put_u32(&mut body, ts as u32, big_endian);
    put_u32(&mut body, data.len() as u32, big_endian);
    put_u32(&mut body, data.len() as u32, big_endian);
    body.extend_from_slice(data);
    pcapng_block(big_endian, 6, &body)
}

/// Synchronous import into a vector
pub fn import_bytes(
    data: &[u8],
    format: CaptureFormat,
) -> (Result<ImportSummary, ImportError>, Vec<Record>) {
    let mut records: Vec<Record> = Vec::new();
    let ctl = ImportControl::new();
    let res = import_into(data, format, &mut records, &ctl);
    (res, records)
}

pub fn import_into<S: RecordSink>(
    data: &[u8],
    format: CaptureFormat,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    import_reader(
        CaptureSource::new("test"),
        data,
        format,
        &ImportConfig::default(),
        sink,
        ctl,
    )
}

pub fn packets(records: &[Record]) -> Vec<&pcap_ingest::PacketData> {
    records.iter().filter_map(Record::as_packet).collect()
}

/// Write `data` to a new file in the temporary directory
pub fn temp_file(name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("pcap-ingest-{}-{}", std::process::id(), name));
    std::fs::write(&path, data).expect("write temporary file");
    path
}
