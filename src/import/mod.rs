//! Import orchestration
//!
//! An import reads one capture file or connection log and pushes the decoded [`Record`]s
//! to a [`RecordSink`]:
//!
//! - [`import_reader`] runs synchronously on any `Read` input, in the calling thread;
//! - [`ImportTask::spawn`] opens a file and runs the same driver on a worker thread,
//!   handing records to the consumer through a bounded channel.
//!
//! The run can be cancelled at any block boundary with [`ImportControl::cancel`], and
//! reports its progress (bytes for captures, units for logs) to the shared control.

mod pcap;
mod pcapng;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use circular::Buffer;
use nom::error::ErrorKind;
use tracing::{debug, error, info, trace};

use crate::bro;
use crate::channel::{bounded, Disconnected, Poll, RecordReceiver, RecordSink};
use crate::config::ImportConfig;
use crate::dissect::Dissector;
use crate::error::{ImportError, PcapError};
use crate::pcap::{PCAP_HEADER_LEN, PCAP_MAGIC, PCAP_MAGIC_SWAPPED};
use crate::pcapng::SHB_MAGIC;
use crate::records::{CaptureSource, RawFrame, Record};
use crate::traits::PcapReaderIterator;
use crate::PcapBlockOwned;

/// Largest circular buffer an import may grow to
pub const MAX_BUFFER_CAPACITY: usize = 64 * 1024 * 1024;

/// Input file formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureFormat {
    Pcap,
    PcapNg,
    /// Bro/Zeek `conn.log`, tab-separated with `#` directives
    BroTsv,
    /// Bro/Zeek `conn.log`, one JSON object per line
    BroJson,
}

impl CaptureFormat {
    pub fn name(self) -> &'static str {
        match self {
            CaptureFormat::Pcap => "pcap",
            CaptureFormat::PcapNg => "pcapng",
            CaptureFormat::BroTsv => "bro",
            CaptureFormat::BroJson => "bro-json",
        }
    }
}

/// Detect the file format from the first bytes of a file
pub fn detect_format(data: &[u8]) -> Option<CaptureFormat> {
    if data.len() >= 4 {
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        match magic {
            PCAP_MAGIC | PCAP_MAGIC_SWAPPED => return Some(CaptureFormat::Pcap),
            SHB_MAGIC => return Some(CaptureFormat::PcapNg),
            _ => (),
        }
    }
    if data.starts_with(b"#separator") {
        return Some(CaptureFormat::BroTsv);
    }
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Some(CaptureFormat::BroJson),
        _ => None,
    }
}

/// Cancellation flag and progress counters, shared between an import and its observers
#[derive(Debug, Default)]
pub struct ImportControl {
    cancelled: AtomicBool,
    progress: AtomicU64,
    total: AtomicU64,
}

impl ImportControl {
    pub fn new() -> ImportControl {
        ImportControl::default()
    }

    /// Request the import to stop at the next block boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn add_progress(&self, n: u64) {
        if n > 0 {
            self.progress.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Progress accounted for so far
    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn set_total(&self, n: u64) {
        self.total.store(n, Ordering::Relaxed);
    }

    /// Expected progress at the end of the import (0 if unknown)
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// How an import ended, when it did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportEnd {
    /// The whole input was read
    Completed,
    /// The input ended in the middle of a block or record
    Truncated,
    Cancelled,
    /// The consumer dropped its side of the channel
    ConsumerGone,
}

/// Statistics of a finished import
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub format: CaptureFormat,
    /// Packet records (or blocks) or log lines read
    pub frames: u64,
    /// Records pushed to the sink
    pub records: u64,
    /// Blocks skipped without being decoded
    pub skipped_blocks: u64,
    /// Frames dropped because they were malformed
    pub dropped_frames: u64,
    /// Fragmented datagrams never completed (evicted or still missing bytes at the end)
    pub incomplete_datagrams: u64,
    pub end: ImportEnd,
}

impl ImportSummary {
    pub(crate) fn new(format: CaptureFormat) -> ImportSummary {
        ImportSummary {
            format,
            frames: 0,
            records: 0,
            skipped_blocks: 0,
            dropped_frames: 0,
            incomplete_datagrams: 0,
            end: ImportEnd::Completed,
        }
    }
}

/// Import a capture or log from any reader, in the calling thread
///
/// The beginning of the input is checked against `format`: a pcapng file given as pcap (or
/// the opposite) is reported as [`ImportError::FormatMismatch`], an unknown magic as
/// [`ImportError::FormatInvalid`].
pub fn import_reader<R: Read, S: RecordSink>(
    source: CaptureSource,
    mut reader: R,
    format: CaptureFormat,
    config: &ImportConfig,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let capacity = config.buffer_capacity.max(PCAP_HEADER_LEN);
    let mut buffer = Buffer::with_capacity(capacity);
    fill_prefix(&mut buffer, &mut reader, PCAP_HEADER_LEN)?;
    let detected = detect_format(buffer.data());
    info!(
        "importing {} as {} (detected {:?})",
        source,
        format.name(),
        detected.map(CaptureFormat::name)
    );
    let summary = match format {
        CaptureFormat::Pcap | CaptureFormat::PcapNg => {
            check_capture_format(format, detected, buffer.data())?;
            if format == CaptureFormat::Pcap {
                pcap::import_pcap(source, buffer, reader, config, sink, ctl)?
            } else {
                pcapng::import_pcapng(source, buffer, reader, config, sink, ctl)?
            }
        }
        CaptureFormat::BroTsv | CaptureFormat::BroJson => {
            // put the bytes read for detection back in front of the stream
            let prefix = io::Cursor::new(buffer.data().to_vec());
            let input = BufReader::new(prefix.chain(reader));
            if format == CaptureFormat::BroTsv {
                bro::conn_log::import_conn_log(source, input, sink, ctl)?
            } else {
                bro::json::import_conn_json(source, input, sink, ctl)?
            }
        }
    };
    info!(
        "import finished: {} frames, {} records, {} dropped, {:?}",
        summary.frames, summary.records, summary.dropped_frames, summary.end
    );
    Ok(summary)
}

fn check_capture_format(
    format: CaptureFormat,
    detected: Option<CaptureFormat>,
    data: &[u8],
) -> Result<(), ImportError> {
    match detected {
        Some(d) if d == format => Ok(()),
        Some(d @ CaptureFormat::Pcap) | Some(d @ CaptureFormat::PcapNg) => {
            Err(ImportError::FormatMismatch {
                expected: format.name(),
                found: d.name(),
            })
        }
        _ => {
            let reason = if data.len() < 4 {
                "file too short".to_owned()
            } else {
                format!(
                    "bad magic {:#010x}",
                    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
                )
            };
            Err(ImportError::FormatInvalid {
                format: format.name(),
                reason,
            })
        }
    }
}

/// Read until the buffer holds `min` bytes, or the input is exhausted
fn fill_prefix<R: Read>(buffer: &mut Buffer, reader: &mut R, min: usize) -> io::Result<()> {
    while buffer.available_data() < min {
        let sz = match reader.read(buffer.space()) {
            Ok(sz) => sz,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if sz == 0 {
            break;
        }
        buffer.fill(sz);
    }
    Ok(())
}

/// What the block handler did with a block
pub(crate) enum BlockOutcome {
    /// Block handled; the records emitted account for this many bytes
    Accounted(u64),
    /// The consumer is gone
    Stop,
}

/// Describe a block parsing error, without the input bytes
fn parse_error_reason(e: &PcapError<&[u8]>) -> String {
    match e {
        PcapError::NomError(_, ErrorKind::Tag) | PcapError::OwnedNomError(_, ErrorKind::Tag) => {
            "unknown block type".to_owned()
        }
        PcapError::NomError(_, ErrorKind::Verify)
        | PcapError::OwnedNomError(_, ErrorKind::Verify) => "invalid block length".to_owned(),
        PcapError::NomError(_, kind) | PcapError::OwnedNomError(_, kind) => {
            format!("parse error ({:?})", kind)
        }
        other => other.to_string(),
    }
}

/// Drive a streaming reader until the end of the input, passing each block to `handle`
///
/// Progress is reported for every block: its size minus what its records account for.
/// A truncated last block ends the run gracefully. A block larger than the buffer grows
/// it (up to [`MAX_BUFFER_CAPACITY`]).
pub(crate) fn run_blocks<P, F>(
    reader: &mut P,
    format: &'static str,
    ctl: &ImportControl,
    mut handle: F,
) -> Result<ImportEnd, ImportError>
where
    P: PcapReaderIterator,
    F: FnMut(PcapBlockOwned) -> Result<BlockOutcome, ImportError>,
{
    loop {
        if ctl.is_cancelled() {
            info!("{} import cancelled after {} bytes", format, reader.consumed());
            return Ok(ImportEnd::Cancelled);
        }
        let position = reader.consumed();
        match reader.next() {
            Ok((offset, block)) => {
                trace!("{} {} block at offset {} ({} bytes)", format, block.kind(), position, offset);
                let accounted = match handle(block)? {
                    BlockOutcome::Accounted(n) => n,
                    BlockOutcome::Stop => {
                        debug!("{} import: consumer gone", format);
                        return Ok(ImportEnd::ConsumerGone);
                    }
                };
                ctl.add_progress((offset as u64).saturating_sub(accounted));
                reader.consume(offset);
            }
            Err(PcapError::Eof) => return Ok(ImportEnd::Completed),
            Err(PcapError::Incomplete(_)) => {
                reader.refill().map_err(|_| read_error())?;
            }
            Err(PcapError::UnexpectedEof) => {
                debug!("{} import: truncated block at offset {}", format, position);
                return Ok(ImportEnd::Truncated);
            }
            Err(PcapError::BufferTooSmall) => {
                let capacity = reader.capacity();
                if capacity >= MAX_BUFFER_CAPACITY || !reader.grow(capacity * 2) {
                    return Err(ImportError::FormatInvalid {
                        format,
                        reason: format!("block at offset {} larger than {} bytes", position, capacity),
                    });
                }
                debug!("{} import: buffer grown to {} bytes", format, capacity * 2);
            }
            Err(PcapError::ReadError) => return Err(read_error()),
            Err(e) => {
                let reason = parse_error_reason(&e);
                return Err(ImportError::FormatInvalid {
                    format,
                    reason: format!("{} at offset {}", reason, position),
                });
            }
        }
    }
}

fn read_error() -> ImportError {
    ImportError::Io(io::Error::new(io::ErrorKind::Other, "read failed"))
}

/// Convert the error of a reader constructor (header validation)
pub(crate) fn header_error(format: &'static str, e: PcapError<&'static [u8]>) -> ImportError {
    match e {
        PcapError::ReadError => read_error(),
        PcapError::Incomplete(_) => ImportError::FormatInvalid {
            format,
            reason: "file header truncated".to_owned(),
        },
        e => ImportError::FormatInvalid {
            format,
            reason: parse_error_reason(&e),
        },
    }
}

/// Frame dissection shared by the capture drivers
pub(crate) struct FrameEmitter<'s, S: RecordSink> {
    dissector: Dissector,
    scratch: Vec<Record>,
    sink: &'s mut S,
    summary: ImportSummary,
}

impl<'s, S: RecordSink> FrameEmitter<'s, S> {
    pub(crate) fn new(
        format: CaptureFormat,
        source: CaptureSource,
        config: &ImportConfig,
        sink: &'s mut S,
    ) -> Self {
        FrameEmitter {
            dissector: Dissector::new(source, config.max_fragment_sets),
            scratch: Vec::new(),
            sink,
            summary: ImportSummary::new(format),
        }
    }

    /// Dissect a frame and push its records
    pub(crate) fn emit(&mut self, frame: &RawFrame) -> BlockOutcome {
        self.summary.frames += 1;
        let accounted = self.dissector.dissect(frame, &mut self.scratch);
        match push_all(self.sink, &mut self.scratch, &mut self.summary) {
            Ok(()) => BlockOutcome::Accounted(accounted as u64),
            Err(Disconnected) => BlockOutcome::Stop,
        }
    }

    pub(crate) fn skip_block(&mut self) {
        self.summary.skipped_blocks += 1;
    }

    pub(crate) fn finish(mut self, end: ImportEnd) -> ImportSummary {
        self.summary.dropped_frames = self.dissector.dropped_frames();
        let reassembler = self.dissector.reassembler();
        self.summary.incomplete_datagrams = reassembler.evicted() + reassembler.in_flight() as u64;
        if self.summary.incomplete_datagrams > 0 {
            debug!(
                "{}: {} fragmented datagrams left incomplete",
                self.dissector.source(),
                self.summary.incomplete_datagrams
            );
        }
        self.summary.end = end;
        self.summary
    }
}

pub(crate) fn push_all<S: RecordSink>(
    sink: &mut S,
    records: &mut Vec<Record>,
    summary: &mut ImportSummary,
) -> Result<(), Disconnected> {
    for record in records.drain(..) {
        sink.push(record)?;
        summary.records += 1;
    }
    Ok(())
}

/// An import running on a worker thread
pub struct ImportTask;

impl ImportTask {
    /// Open `path`, detect its format, and import it on a new thread
    ///
    /// Errors (including I/O errors on open) are logged, and returned by
    /// [`ImportHandle::join`]. The consumer only sees the end of the record stream.
    pub fn spawn<P: AsRef<Path>>(path: P, config: ImportConfig) -> ImportHandle {
        let path = path.as_ref().to_path_buf();
        let ctl = Arc::new(ImportControl::new());
        let (sender, receiver) = bounded(config.channel_capacity);
        let worker_ctl = Arc::clone(&ctl);
        let worker = thread::spawn(move || {
            let mut sender = sender;
            let res = run_file(&path, &config, &mut sender, &worker_ctl);
            if let Err(ref e) = res {
                error!("import of {} failed: {}", path.display(), e);
            }
            res
        });
        ImportHandle {
            receiver,
            ctl,
            worker: Some(worker),
        }
    }
}

fn run_file<S: RecordSink>(
    path: &Path,
    config: &ImportConfig,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let mut file = File::open(path)?;
    let mut prefix = [0u8; PCAP_HEADER_LEN];
    let n = read_prefix(&mut file, &mut prefix)?;
    let format = match detect_format(&prefix[..n]) {
        Some(format) => format,
        // an unknown magic is reported by the pcap header check
        None if n >= 4 => CaptureFormat::Pcap,
        None => return Err(ImportError::UnsupportedFormat),
    };
    let total = match format {
        CaptureFormat::Pcap | CaptureFormat::PcapNg => file.metadata()?.len(),
        CaptureFormat::BroTsv => 2 * count_data_lines(File::open(path)?)?,
        CaptureFormat::BroJson => count_data_lines(File::open(path)?)?,
    };
    ctl.set_total(total);
    let reader = io::Cursor::new(prefix[..n].to_vec()).chain(file);
    let source = CaptureSource::new(path.to_string_lossy());
    import_reader(source, reader, format, config, sink, ctl)
}

fn read_prefix(file: &mut File, prefix: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < prefix.len() {
        match file.read(&mut prefix[n..]) {
            Ok(0) => break,
            Ok(sz) => n += sz,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

fn count_data_lines<R: Read>(reader: R) -> io::Result<u64> {
    let mut count = 0;
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            count += 1;
        }
    }
    Ok(count)
}

/// Consumer side of a spawned import
#[derive(Debug)]
pub struct ImportHandle {
    receiver: RecordReceiver,
    ctl: Arc<ImportControl>,
    worker: Option<JoinHandle<Result<ImportSummary, ImportError>>>,
}

impl ImportHandle {
    /// Take the next record, if any, without blocking
    ///
    /// The progress units of packet records are added to the progress counter.
    pub fn poll(&self) -> Poll {
        let poll = self.receiver.poll();
        if let Poll::Item(ref record) = poll {
            self.ctl.add_progress(record.progress_units());
        }
        poll
    }

    /// Stop the import at the next block boundary
    pub fn cancel(&self) {
        self.ctl.cancel();
    }

    pub fn progress(&self) -> u64 {
        self.ctl.progress()
    }

    /// Expected final progress: file size for captures, units for logs
    pub fn total(&self) -> u64 {
        self.ctl.total()
    }

    pub fn control(&self) -> &Arc<ImportControl> {
        &self.ctl
    }

    /// Wait for the worker to exit, and return its result
    ///
    /// Records not polled yet are discarded, which also unblocks a worker waiting on a
    /// full channel.
    pub fn join(mut self) -> Result<ImportSummary, ImportError> {
        let worker = match self.worker.take() {
            Some(w) => w,
            None => return Err(ImportError::WorkerPanicked),
        };
        drop(self.receiver);
        worker.join().unwrap_or(Err(ImportError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::tests::{PCAP_HDR_BE, PCAP_HDR_LE};
    use crate::pcapng::tests::SHB_LE;

    #[test]
    fn detect() {
        assert_eq!(detect_format(PCAP_HDR_LE), Some(CaptureFormat::Pcap));
        assert_eq!(detect_format(PCAP_HDR_BE), Some(CaptureFormat::Pcap));
        assert_eq!(detect_format(SHB_LE), Some(CaptureFormat::PcapNg));
        assert_eq!(
            detect_format(b"#separator \\x09\n#fields\tts"),
            Some(CaptureFormat::BroTsv)
        );
        assert_eq!(
            detect_format(b"  {\"ts\":1.5}"),
            Some(CaptureFormat::BroJson)
        );
        assert_eq!(detect_format(&[0u8; 24]), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn format_mismatch() {
        let mut records: Vec<Record> = Vec::new();
        let ctl = ImportControl::new();
        let res = import_reader(
            CaptureSource::new("mismatch"),
            SHB_LE,
            CaptureFormat::Pcap,
            &ImportConfig::default(),
            &mut records,
            &ctl,
        );
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
    fn zero_magic_is_invalid() {
        let mut records: Vec<Record> = Vec::new();
        let ctl = ImportControl::new();
        let res = import_reader(
            CaptureSource::new("zero"),
            &[0u8; 40][..],
            CaptureFormat::PcapNg,
            &ImportConfig::default(),
            &mut records,
            &ctl,
        );
        match res {
            Err(ImportError::FormatInvalid { format, reason }) => {
                assert_eq!(format, "pcapng");
                assert_eq!(reason, "bad magic 0x00000000");
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(records.is_empty());
    }

    #[test]
    fn control_counters() {
        let ctl = ImportControl::new();
        ctl.add_progress(24);
        ctl.add_progress(0);
        ctl.set_total(100);
        assert_eq!(ctl.progress(), 24);
        assert_eq!(ctl.total(), 100);
        assert!(!ctl.is_cancelled());
        ctl.cancel();
        assert!(ctl.is_cancelled());
    }
}
