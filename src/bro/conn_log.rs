//! Tab-separated `conn.log`
//!
//! ```text
//! #separator \x09
//! #set_separator	,
//! #empty_field	(empty)
//! #unset_field	-
//! #fields	ts	uid	id.orig_h	id.orig_p	id.resp_h	id.resp_p	proto	...	orig_bytes	resp_bytes
//! 1331901000.000000	CCUIP21wTjqkj8ZqX5	192.168.202.79	50463	192.168.229.251	80	tcp	...	166	214
//! ```

use std::io::BufRead;
use std::net::Ipv4Addr;

use tracing::{debug, warn};

use super::{connection_record, parse_ts_millis, protocol_number, Flow};
use crate::channel::{Disconnected, RecordSink};
use crate::error::ImportError;
use crate::import::{push_all, CaptureFormat, ImportControl, ImportEnd, ImportSummary};
use crate::records::{CaptureSource, Record};

/// Progress units of one data line
pub const UNITS_PER_LINE: u64 = 2;

/// Layout of a log, as declared by its `#` directives
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnLogFormat {
    pub separator: String,
    pub set_separator: String,
    pub empty_field: String,
    pub unset_field: String,
    pub fields: Vec<String>,
    pub types: Vec<String>,
}

impl Default for ConnLogFormat {
    fn default() -> Self {
        ConnLogFormat {
            separator: "\t".to_owned(),
            set_separator: ",".to_owned(),
            empty_field: "(empty)".to_owned(),
            unset_field: "-".to_owned(),
            fields: Vec::new(),
            types: Vec::new(),
        }
    }
}

/// Decode `\xHH` escapes
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(b) => {
                out.push(char::from(b));
                rest = &rest[pos + 4..];
            }
            None => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

impl ConnLogFormat {
    /// Apply a `#` directive. Returns false if `line` is not a directive.
    pub fn apply_directive(&mut self, line: &str) -> bool {
        let directive = match line.strip_prefix('#') {
            Some(d) => d,
            None => return false,
        };
        if let Some(value) = directive.strip_prefix("separator") {
            let value = value.trim();
            if !value.is_empty() {
                self.separator = unescape(value);
            }
            return true;
        }
        let mut tokens = directive.split(self.separator.as_str());
        let name = tokens.next().unwrap_or("");
        match name {
            "set_separator" => {
                if let Some(v) = tokens.next() {
                    self.set_separator = unescape(v);
                }
            }
            "empty_field" => {
                if let Some(v) = tokens.next() {
                    self.empty_field = v.to_owned();
                }
            }
            "unset_field" => {
                if let Some(v) = tokens.next() {
                    self.unset_field = v.to_owned();
                }
            }
            "fields" => self.fields = tokens.map(str::to_owned).collect(),
            "types" => self.types = tokens.map(str::to_owned).collect(),
            // path, open, close
            _ => (),
        }
        true
    }

    /// Index of a column in the `#fields` list
    pub fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    fn is_unset(&self, value: &str) -> bool {
        value.is_empty() || value == self.unset_field || value == self.empty_field
    }
}

/// Columns used to build records
#[derive(Debug)]
struct ConnColumns {
    ts: usize,
    orig_h: usize,
    orig_p: usize,
    resp_h: usize,
    resp_p: usize,
    proto: usize,
    orig_bytes: Option<usize>,
    resp_bytes: Option<usize>,
}

impl ConnColumns {
    fn resolve(format: &ConnLogFormat, line: u64) -> Result<ConnColumns, ImportError> {
        let required = |name: &str| {
            format.column(name).ok_or_else(|| ImportError::Bro {
                line: line as usize,
                reason: format!("missing field '{}'", name),
            })
        };
        Ok(ConnColumns {
            ts: required("ts")?,
            orig_h: required("id.orig_h")?,
            orig_p: required("id.orig_p")?,
            resp_h: required("id.resp_h")?,
            resp_p: required("id.resp_p")?,
            proto: required("proto")?,
            orig_bytes: format.column("orig_bytes"),
            resp_bytes: format.column("resp_bytes"),
        })
    }
}

/// Decode one data line into 0, 1 or 2 records
///
/// Returns an error message for malformed values.
fn parse_line(
    format: &ConnLogFormat,
    columns: &ConnColumns,
    source: &CaptureSource,
    line_no: u64,
    line: &str,
    out: &mut Vec<Record>,
) -> Result<(), String> {
    let values: Vec<&str> = line.split(format.separator.as_str()).collect();
    let get = |idx: usize| {
        values
            .get(idx)
            .copied()
            .ok_or_else(|| format!("{} columns, expected {}", values.len(), format.fields.len()))
    };
    let port = |idx: usize| -> Result<Option<u16>, String> {
        let v = get(idx)?;
        if format.is_unset(v) {
            return Ok(None);
        }
        v.parse().map(Some).map_err(|_| format!("invalid port '{}'", v))
    };
    let bytes = |idx: Option<usize>| -> Result<u64, String> {
        let v = match idx {
            Some(idx) => get(idx)?,
            None => return Ok(0),
        };
        if format.is_unset(v) {
            return Ok(0);
        }
        v.parse().map_err(|_| format!("invalid byte count '{}'", v))
    };
    let addr = |idx: usize| -> Result<Ipv4Addr, String> {
        let v = get(idx)?;
        v.parse().map_err(|_| format!("invalid IPv4 address '{}'", v))
    };

    let ts = get(columns.ts)?;
    let timestamp = parse_ts_millis(ts).ok_or_else(|| format!("invalid timestamp '{}'", ts))?;
    let flow = Flow {
        src: addr(columns.orig_h)?,
        src_port: port(columns.orig_p)?,
        dst: addr(columns.resp_h)?,
        dst_port: port(columns.resp_p)?,
    };
    let protocol = protocol_number(get(columns.proto)?);
    let sent = bytes(columns.orig_bytes)?;
    let received = bytes(columns.resp_bytes)?;

    // both directions share the line's units
    let units = if sent > 0 && received > 0 {
        UNITS_PER_LINE / 2
    } else {
        UNITS_PER_LINE
    };
    if sent > 0 {
        out.push(connection_record(source, timestamp, line_no, &flow, protocol, sent, units));
    }
    if received > 0 {
        let flow = flow.reversed();
        out.push(connection_record(source, timestamp, line_no, &flow, protocol, received, units));
    }
    Ok(())
}

/// Import a tab-separated connection log
pub fn import_conn_log<R: BufRead, S: RecordSink>(
    source: CaptureSource,
    input: R,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::new(CaptureFormat::BroTsv);
    let mut format = ConnLogFormat::default();
    let mut columns: Option<ConnColumns> = None;
    let mut records = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        if ctl.is_cancelled() {
            summary.end = ImportEnd::Cancelled;
            return Ok(summary);
        }
        let line_no = idx as u64 + 1;
        let line = line?;
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        if line.trim().is_empty() {
            continue;
        }
        if format.apply_directive(line) {
            if line.starts_with("#fields") {
                columns = Some(ConnColumns::resolve(&format, line_no)?);
                debug!("{}: {} fields", source, format.fields.len());
            }
            continue;
        }
        let cols = columns.as_ref().ok_or_else(|| ImportError::Bro {
            line: line_no as usize,
            reason: "data line before #fields".to_owned(),
        })?;
        summary.frames += 1;
        if let Err(reason) = parse_line(&format, cols, &source, line_no, line, &mut records) {
            warn!("{} line {}: {}", source, line_no, reason);
        }
        let accounted: u64 = records.iter().map(Record::progress_units).sum();
        ctl.add_progress(UNITS_PER_LINE - accounted);
        if let Err(Disconnected) = push_all(sink, &mut records, &mut summary) {
            summary.end = ImportEnd::ConsumerGone;
            return Ok(summary);
        }
    }
    Ok(summary)
}
