mod common;

use common::*;
use pcap_ingest::channel::Poll;
use pcap_ingest::import::{detect_format, CaptureFormat, ImportTask};
use pcap_ingest::{ImportConfig, ImportError, Record, IPPROTO_TCP, IPPROTO_UDP};

const CONN_LOG: &str = "#separator \\x09
#set_separator\t,
#empty_field\t(empty)
#unset_field\t-
#path\tconn
#open\t2012-03-16-12-30-00
#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tservice\tduration\torig_bytes\tresp_bytes\tconn_state
#types\ttime\tstring\taddr\tport\taddr\tport\tenum\tstring\tinterval\tcount\tcount\tstring
1331901000.000000\tCCUIP21wTjqkj8ZqX5\t192.168.202.79\t50463\t192.168.229.251\t80\ttcp\thttp\t0.010000\t166\t214\tSF
1331901000.020000\tCsssjd3tX0yOTPDpng\t192.168.202.76\t137\t192.168.202.255\t137\tudp\tdns\t-\t350\t0\tS0
1331901001.500000\tC9kfkn1WnuqKAXhB6e\t192.168.202.79\t-\t192.168.229.254\t-\ticmp\t-\t-\t-\t-\tOTH
#close\t2012-03-16-12-40-00
";

const CONN_JSON: &str = r#"{"ts":1331901000.0,"uid":"CCUIP21wTjqkj8ZqX5","id.orig_h":"192.168.202.79","id.orig_p":50463,"id.resp_h":"192.168.229.251","id.resp_p":80,"proto":"tcp","orig_bytes":166,"resp_bytes":214}
{"ts":1331901000.02,"uid":"Csssjd3tX0yOTPDpng","id.orig_h":"192.168.202.76","id.orig_p":137,"id.resp_h":"192.168.202.255","id.resp_p":137,"proto":"udp"}
{"ts":1331901001.5,"uid":"broken"
"#;

#[test]
fn test_bro_detection() {
    assert_eq!(detect_format(CONN_LOG.as_bytes()), Some(CaptureFormat::BroTsv));
    assert_eq!(detect_format(CONN_JSON.as_bytes()), Some(CaptureFormat::BroJson));
}

#[test]
fn test_bro_conn_log() {
    let (res, records) = import_bytes(CONN_LOG.as_bytes(), CaptureFormat::BroTsv);
    let summary = res.expect("import");
    assert_eq!(summary.format, CaptureFormat::BroTsv);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.records, 3);
    let p = packets(&records);
    assert_eq!(p.len(), 3);

    // originator and responder directions of the same connection
    assert_eq!(p[0].meta.protocol, IPPROTO_TCP);
    assert_eq!(p[0].meta.src_addr.to_string(), "192.168.202.79");
    assert_eq!(p[0].meta.payload_size, 166);
    assert_eq!(p[1].meta.src_addr.to_string(), "192.168.229.251");
    assert_eq!(p[1].meta.src_port, Some(80));
    assert_eq!(p[1].meta.dst_port, Some(50463));
    assert_eq!(p[1].meta.payload_size, 214);
    assert_eq!(p[0].meta.frame, p[1].meta.frame);
    assert_eq!(p[0].meta.timestamp, 1_331_901_000_000);

    assert_eq!(p[2].meta.protocol, IPPROTO_UDP);
    assert_eq!(p[2].meta.timestamp, 1_331_901_000_020);
    assert_eq!(p[2].meta.payload_size, 350);
    assert!(p.iter().all(|p| p.meta.src_mac.is_none() && p.meta.ttl.is_none()));
}

#[test]
fn test_bro_conn_json() {
    let (res, records) = import_bytes(CONN_JSON.as_bytes(), CaptureFormat::BroJson);
    let summary = res.expect("import");
    assert_eq!(summary.frames, 3);
    let p = packets(&records);
    assert_eq!(p.len(), 2);
    assert_eq!(p[0].meta.dst_port, Some(80));
    assert_eq!(p[0].meta.payload_size, 166);
    assert_eq!(p[1].meta.timestamp, 1_331_901_000_020);
}

#[test]
fn test_bro_missing_column() {
    let log = "#separator \\x09\n#fields\tts\tid.orig_h\tid.orig_p\n1.0\t10.0.0.1\t1\n";
    let (res, records) = import_bytes(log.as_bytes(), CaptureFormat::BroTsv);
    match res {
        Err(ImportError::Bro { line, reason }) => {
            assert_eq!(line, 2);
            assert_eq!(reason, "missing field 'id.resp_h'");
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(records.is_empty());
}

fn drain(path: &std::path::Path) -> (Vec<Record>, u64, u64) {
    let handle = ImportTask::spawn(path, ImportConfig::default());
    let mut records = Vec::new();
    loop {
        match handle.poll() {
            Poll::Item(r) => records.push(r),
            Poll::Pending => std::thread::yield_now(),
            Poll::Done => break,
        }
    }
    let ctl = handle.control().clone();
    handle.join().expect("import");
    (records, ctl.progress(), ctl.total())
}

#[test]
fn test_bro_spawned_progress() {
    let path = temp_file("conn.log", CONN_LOG.as_bytes());
    let (records, progress, total) = drain(&path);
    assert_eq!(records.len(), 3);
    assert_eq!(total, 6);
    assert_eq!(progress, total);
    let _ = std::fs::remove_file(path);

    let path = temp_file("conn.json", CONN_JSON.as_bytes());
    let (records, progress, total) = drain(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(total, 3);
    assert_eq!(progress, total);
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_spawned_unsupported_file() {
    // too short for a magic number, and not a log
    let path = temp_file("garbage.bin", &[0x42; 3]);
    let handle = ImportTask::spawn(&path, ImportConfig::default());
    loop {
        match handle.poll() {
            Poll::Done => break,
            Poll::Item(r) => panic!("unexpected record {:?}", r),
            Poll::Pending => std::thread::yield_now(),
        }
    }
    assert!(matches!(handle.join(), Err(ImportError::UnsupportedFormat)));
    let _ = std::fs::remove_file(path);
}
