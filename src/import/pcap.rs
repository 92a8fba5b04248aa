use std::io::Read;

use circular::Buffer;
use tracing::{debug, warn};

use super::{header_error, run_blocks, BlockOutcome, CaptureFormat, FrameEmitter, ImportControl, ImportSummary};
use crate::channel::RecordSink;
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::pcap::LegacyPcapReader;
use crate::records::{CaptureSource, RawFrame};
use crate::PcapBlockOwned;

/// Import a legacy pcap file. `buffer` may already hold the beginning of the file.
pub(crate) fn import_pcap<R: Read, S: RecordSink>(
    source: CaptureSource,
    buffer: Buffer,
    reader: R,
    config: &ImportConfig,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let mut reader =
        LegacyPcapReader::from_buffer(buffer, reader).map_err(|e| header_error("pcap", e))?;
    let header = reader.header().clone();
    debug!(
        "pcap {}.{}, {} endian, linktype {}, snaplen {}, GMT offset {}",
        header.version_major,
        header.version_minor,
        if header.is_bigendian() { "big" } else { "little" },
        header.network,
        header.snaplen,
        header.thiszone
    );
    if !header.network.is_ethernet() {
        warn!(
            "{}: linktype {} is not Ethernet, decoding frames as Ethernet anyway",
            source, header.network
        );
    }
    let mut emitter = FrameEmitter::new(CaptureFormat::Pcap, source, config, sink);
    let mut index = 0;
    let end = run_blocks(&mut reader, "pcap", ctl, |block| match block {
        PcapBlockOwned::LegacyHeader(_) => Ok(BlockOutcome::Accounted(0)),
        PcapBlockOwned::Legacy(b) => {
            index += 1;
            let frame = RawFrame {
                data: b.data,
                timestamp: b.timestamp_millis(header.thiszone),
                index,
            };
            Ok(emitter.emit(&frame))
        }
        PcapBlockOwned::NG(_) => Err(ImportError::pcap_invalid("unexpected pcapng block")),
    })?;
    Ok(emitter.finish(end))
}

#[cfg(test)]
mod tests {
    use crate::config::ImportConfig;
    use crate::import::{import_reader, CaptureFormat, ImportControl, ImportEnd};
    use crate::pcap::tests::{FRAME_LE, PCAP_HDR_LE};
    use crate::records::{CaptureSource, Record};

    #[test]
    fn short_frames_are_dropped_and_accounted() {
        let mut data = PCAP_HDR_LE.to_vec();
        data.extend_from_slice(FRAME_LE);
        data.extend_from_slice(FRAME_LE);
        let mut records: Vec<Record> = Vec::new();
        let ctl = ImportControl::new();
        let summary = import_reader(
            CaptureSource::new("short.pcap"),
            &data[..],
            CaptureFormat::Pcap,
            &ImportConfig::default(),
            &mut records,
            &ctl,
        )
        .expect("import");
        assert!(records.is_empty());
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.dropped_frames, 2);
        assert_eq!(summary.end, ImportEnd::Completed);
        // nothing emitted: the driver accounts for the whole file
        assert_eq!(ctl.progress(), data.len() as u64);
    }

    #[test]
    fn cancelled_before_start() {
        let mut data = PCAP_HDR_LE.to_vec();
        data.extend_from_slice(FRAME_LE);
        let mut records: Vec<Record> = Vec::new();
        let ctl = ImportControl::new();
        ctl.cancel();
        let summary = import_reader(
            CaptureSource::new("cancel.pcap"),
            &data[..],
            CaptureFormat::Pcap,
            &ImportConfig::default(),
            &mut records,
            &ctl,
        )
        .expect("import");
        assert_eq!(summary.end, ImportEnd::Cancelled);
        assert_eq!(summary.frames, 0);
        assert_eq!(ctl.progress(), 0);
    }
}
