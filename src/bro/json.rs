//! JSON `conn.log`, one object per line
//!
//! ```text
//! {"ts":1331901000.123,"uid":"C1","id.orig_h":"10.0.0.1","id.orig_p":50463,"id.resp_h":"10.0.0.2","id.resp_p":80,"proto":"tcp","orig_bytes":166}
//! ```
//!
//! Numbers may also be written as strings.

use std::fmt;
use std::io::BufRead;
use std::net::Ipv4Addr;

use serde::Deserialize;
use tracing::warn;

use super::{connection_record, parse_ts_millis, protocol_number, Flow};
use crate::channel::{Disconnected, RecordSink};
use crate::error::ImportError;
use crate::import::{push_all, CaptureFormat, ImportControl, ImportEnd, ImportSummary};
use crate::records::CaptureSource;

/// Progress units of one line
pub const UNITS_PER_LINE: u64 = 1;

/// A JSON number, or a string holding one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumberOrText::Number(n) => write!(f, "{}", n),
            NumberOrText::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConnEntry {
    ts: NumberOrText,
    #[serde(rename = "id.orig_h")]
    orig_h: String,
    #[serde(rename = "id.orig_p")]
    orig_p: NumberOrText,
    #[serde(rename = "id.resp_h")]
    resp_h: String,
    #[serde(rename = "id.resp_p")]
    resp_p: NumberOrText,
    proto: String,
    #[serde(default)]
    orig_bytes: Option<NumberOrText>,
}

fn parse_number<T: std::str::FromStr>(what: &str, v: &NumberOrText) -> Result<T, String> {
    let s = v.to_string();
    s.trim().parse().map_err(|_| format!("invalid {} '{}'", what, s))
}

fn parse_entry(text: &str) -> Result<(i64, Flow, u8, u64), String> {
    let entry: ConnEntry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let ts = entry.ts.to_string();
    let timestamp = parse_ts_millis(&ts).ok_or_else(|| format!("invalid timestamp '{}'", ts))?;
    let addr = |s: &str| -> Result<Ipv4Addr, String> {
        s.parse().map_err(|_| format!("invalid IPv4 address '{}'", s))
    };
    let flow = Flow {
        src: addr(&entry.orig_h)?,
        src_port: Some(parse_number("port", &entry.orig_p)?),
        dst: addr(&entry.resp_h)?,
        dst_port: Some(parse_number("port", &entry.resp_p)?),
    };
    let payload_size = match entry.orig_bytes {
        Some(ref n) => parse_number("byte count", n)?,
        None => 0,
    };
    Ok((timestamp, flow, protocol_number(&entry.proto), payload_size))
}

/// Import a JSON connection log
///
/// Each line gives one record, for the originator direction. Malformed lines are logged
/// and skipped.
pub fn import_conn_json<R: BufRead, S: RecordSink>(
    source: CaptureSource,
    input: R,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::new(CaptureFormat::BroJson);
    let mut records = Vec::with_capacity(1);
    for (idx, line) in input.lines().enumerate() {
        if ctl.is_cancelled() {
            summary.end = ImportEnd::Cancelled;
            return Ok(summary);
        }
        let line_no = idx as u64 + 1;
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        summary.frames += 1;
        match parse_entry(text) {
            Ok((timestamp, flow, protocol, payload_size)) => records.push(connection_record(
                &source,
                timestamp,
                line_no,
                &flow,
                protocol,
                payload_size,
                UNITS_PER_LINE,
            )),
            Err(reason) => {
                warn!("{} line {}: {}", source, line_no, reason);
                ctl.add_progress(UNITS_PER_LINE);
            }
        }
        if let Err(Disconnected) = push_all(sink, &mut records, &mut summary) {
            summary.end = ImportEnd::ConsumerGone;
            return Ok(summary);
        }
    }
    Ok(summary)
}
