mod common;

use common::*;
use pcap_ingest::import::{CaptureFormat, ImportControl, ImportEnd};
use pcap_ingest::{ImportError, Record, IPPROTO_UDP};

fn udp_frame(payload: &[u8]) -> Vec<u8> {
    let ip = Ip::new([172, 16, 0, 1], [172, 16, 0, 2], IPPROTO_UDP);
    ip_frame(&ip, &udp(5000, 5001, payload))
}

fn section(big_endian: bool, tsresol: Option<u8>, packets: &[(u32, u64)]) -> Vec<u8> {
    let mut v = pcapng_shb(big_endian);
    v.extend_from_slice(&pcapng_idb(big_endian, tsresol));
    for &(if_id, ts) in packets {
        v.extend_from_slice(&pcapng_epb(big_endian, if_id, ts, &udp_frame(b"ping")));
    }
    v
}

fn timestamps(records: &[Record]) -> Vec<i64> {
    packets(records).iter().map(|p| p.meta.timestamp).collect()
}

#[test]
fn test_pcapng_default_resolution() {
    let data = section(false, None, &[(0, 1_500_000_000_123_456)]);
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    let summary = res.expect("import");
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.end, ImportEnd::Completed);
    assert_eq!(timestamps(&records), vec![1_500_000_000_123]);
}

#[test]
fn test_pcapng_power_of_two_resolution() {
    // 0x86: 2^-6 s
    let data = section(false, Some(0x86), &[(0, 64 * 10 + 32)]);
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    res.expect("import");
    assert_eq!(timestamps(&records), vec![10_500]);
}

#[test]
fn test_pcapng_nanosecond_resolution_be() {
    let data = section(true, Some(9), &[(0, 1_000_000_123_456_789)]);
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    res.expect("import");
    assert_eq!(timestamps(&records), vec![1_000_000_123]);
}

#[test]
fn test_pcapng_byte_order_invariance() {
    let packets = [(0, 1_000_000), (0, 2_500_000)];
    let (res_le, records_le) = import_bytes(&section(false, None, &packets), CaptureFormat::PcapNg);
    let (res_be, records_be) = import_bytes(&section(true, None, &packets), CaptureFormat::PcapNg);
    assert_eq!(res_le.expect("LE").frames, 2);
    assert_eq!(res_be.expect("BE").frames, 2);
    assert_eq!(records_le, records_be);
    assert_eq!(timestamps(&records_le), vec![1_000, 2_500]);
}

#[test]
fn test_pcapng_sections_reset_interfaces() {
    // millisecond interface in the first section, default one in the second
    let mut data = section(false, Some(3), &[(0, 42)]);
    data.extend_from_slice(&section(true, None, &[(0, 42_000)]));
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    let summary = res.expect("import");
    assert_eq!(summary.frames, 2);
    assert_eq!(timestamps(&records), vec![42, 42]);
    let frames: Vec<u64> = packets(&records).iter().map(|p| p.meta.frame).collect();
    assert_eq!(frames, vec![1, 2]);
}

#[test]
fn test_pcapng_unknown_interface_uses_default_resolution() {
    let data = section(false, Some(3), &[(7, 5_000_000)]);
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    res.expect("import");
    assert_eq!(timestamps(&records), vec![5_000]);
}

#[test]
fn test_pcapng_local_use_block_is_skipped() {
    let mut data = pcapng_shb(false);
    data.extend_from_slice(&pcapng_idb(false, None));
    data.extend_from_slice(&pcapng_block(false, 0xffff_fff0, &[1, 2, 3, 4, 5]));
    data.extend_from_slice(&pcapng_epb(false, 0, 1_000_000, &udp_frame(b"after")));
    let mut records: Vec<Record> = Vec::new();
    let ctl = ImportControl::new();
    let summary = import_into(&data, CaptureFormat::PcapNg, &mut records, &ctl).expect("import");
    assert_eq!(summary.skipped_blocks, 1);
    assert_eq!(summary.frames, 1);
    let p = packets(&records);
    assert_eq!(p.len(), 1);
    assert_eq!(p[0].payload.as_deref(), Some(&b"after"[..]));
    let carried: u64 = records.iter().map(Record::progress_units).sum();
    assert_eq!(ctl.progress() + carried, data.len() as u64);
}

#[test]
fn test_pcapng_zero_magic_is_invalid() {
    let mut data = vec![0u8; 4];
    data.extend_from_slice(&section(false, None, &[(0, 1)])[4..]);
    let (res, records) = import_bytes(&data, CaptureFormat::PcapNg);
    match res {
        Err(ImportError::FormatInvalid { format, .. }) => assert_eq!(format, "pcapng"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(records.is_empty());
}

#[test]
fn test_pcapng_given_as_pcap() {
    let data = section(false, None, &[(0, 1)]);
    let (res, records) = import_bytes(&data, CaptureFormat::Pcap);
    assert!(matches!(
        res,
        Err(ImportError::FormatMismatch {
            expected: "pcap",
            found: "pcapng"
        })
    ));
    assert!(records.is_empty());
}

#[test]
fn test_pcapng_cancelled() {
    let data = section(false, None, &[(0, 1), (0, 2)]);
    let mut records: Vec<Record> = Vec::new();
    let ctl = ImportControl::new();
    ctl.cancel();
    let summary = import_into(&data, CaptureFormat::PcapNg, &mut records, &ctl).expect("import");
    assert_eq!(summary.end, ImportEnd::Cancelled);
    assert!(records.is_empty());
}

#[test]
fn test_pcapng_large_block_grows_buffer() {
    let big = udp_frame(&[0x5a; 1400]);
    let mut data = pcapng_shb(false);
    data.extend_from_slice(&pcapng_idb(false, None));
    data.extend_from_slice(&pcapng_epb(false, 0, 0, &big));
    let mut config = pcap_ingest::ImportConfig::default();
    config.buffer_capacity = 256;
    let mut records: Vec<Record> = Vec::new();
    let ctl = ImportControl::new();
    let summary = pcap_ingest::import::import_reader(
        pcap_ingest::CaptureSource::new("big"),
        &data[..],
        CaptureFormat::PcapNg,
        &config,
        &mut records,
        &ctl,
    )
    .expect("import");
    assert_eq!(summary.end, ImportEnd::Completed);
    assert_eq!(packets(&records)[0].meta.payload_size, 1400);
}
