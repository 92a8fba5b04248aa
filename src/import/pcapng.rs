use std::io::Read;

use circular::Buffer;
use tracing::{debug, trace, warn};

use super::{header_error, run_blocks, BlockOutcome, CaptureFormat, FrameEmitter, ImportControl, ImportSummary};
use crate::channel::RecordSink;
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::pcapng::*;
use crate::records::{CaptureSource, RawFrame};
use crate::traits::PcapNGPacketBlock;
use crate::utils::now_millis;
use crate::PcapBlockOwned;

/// Interface of the current section
#[derive(Debug)]
struct Interface {
    /// Timestamp units per second
    resolution: u64,
    /// Seconds added to the timestamps
    ts_offset: i64,
}

/// Interfaces of the current section, indexed by interface id
#[derive(Debug, Default)]
struct InterfaceTable {
    interfaces: Vec<Interface>,
    warned_unknown: bool,
    warned_linktype: bool,
}

impl InterfaceTable {
    fn reset(&mut self) {
        self.interfaces.clear();
        self.warned_unknown = false;
    }

    fn add(&mut self, source: &CaptureSource, idb: &InterfaceDescriptionBlock) -> Result<(), ImportError> {
        let resolution = idb.ts_resolution().ok_or_else(|| {
            ImportError::pcapng_invalid(format!(
                "interface {}: invalid timestamp resolution {:#04x}",
                self.interfaces.len(),
                idb.if_tsresol
            ))
        })?;
        if !idb.linktype.is_ethernet() && !self.warned_linktype {
            self.warned_linktype = true;
            warn!(
                "{}: linktype {} is not Ethernet, decoding frames as Ethernet anyway",
                source, idb.linktype
            );
        }
        debug!(
            "interface {}: {:?}, linktype {}, resolution {}/s, offset {}s",
            self.interfaces.len(),
            idb.if_name(),
            idb.linktype,
            resolution,
            idb.ts_offset()
        );
        self.interfaces.push(Interface {
            resolution,
            ts_offset: idb.ts_offset(),
        });
        Ok(())
    }

    /// Timestamp resolution and offset of an interface, or the defaults for an unknown id
    fn timing(&mut self, if_id: usize) -> (u64, i64) {
        match self.interfaces.get(if_id) {
            Some(interface) => (interface.resolution, interface.ts_offset),
            None => {
                if !self.warned_unknown {
                    self.warned_unknown = true;
                    warn!(
                        "packet on unknown interface {} ({} declared), using default resolution",
                        if_id,
                        self.interfaces.len()
                    );
                }
                (DEFAULT_RESOLUTION, 0)
            }
        }
    }
}

/// Import a pcapng file. `buffer` may already hold the beginning of the file.
pub(crate) fn import_pcapng<R: Read, S: RecordSink>(
    source: CaptureSource,
    buffer: Buffer,
    reader: R,
    config: &ImportConfig,
    sink: &mut S,
    ctl: &ImportControl,
) -> Result<ImportSummary, ImportError> {
    let mut reader =
        PcapNGReader::from_buffer(buffer, reader).map_err(|e| header_error("pcapng", e))?;
    let mut interfaces = InterfaceTable::default();
    let mut emitter = FrameEmitter::new(CaptureFormat::PcapNg, source.clone(), config, sink);
    let mut index = 0;
    let end = run_blocks(&mut reader, "pcapng", ctl, |block| {
        let block = match block {
            PcapBlockOwned::NG(b) => b,
            _ => return Err(ImportError::pcapng_invalid("unexpected legacy pcap block")),
        };
        let (data, timestamp) = match block {
            Block::SectionHeader(ref shb) => {
                debug!(
                    "section {}.{}, {} endian, length {}",
                    shb.major_version,
                    shb.minor_version,
                    if shb.big_endian() { "big" } else { "little" },
                    shb.section_len
                );
                interfaces.reset();
                return Ok(BlockOutcome::Accounted(0));
            }
            Block::InterfaceDescription(ref idb) => {
                interfaces.add(&source, idb)?;
                return Ok(BlockOutcome::Accounted(0));
            }
            Block::EnhancedPacket(ref epb) => {
                let (resolution, ts_offset) = interfaces.timing(epb.if_id as usize);
                (epb.packet_data(), epb.timestamp_millis(ts_offset, resolution))
            }
            Block::Packet(ref pb) => {
                let (resolution, ts_offset) = interfaces.timing(usize::from(pb.if_id));
                (pb.packet_data(), pb.timestamp_millis(ts_offset, resolution))
            }
            // no timestamp in simple packets
            Block::SimplePacket(ref spb) => (spb.packet_data(), now_millis()),
            Block::Custom(ref b) => {
                warn!(
                    "skipping custom block {:#010x} ({} bytes)",
                    b.block_type, b.block_len1
                );
                emitter.skip_block();
                return Ok(BlockOutcome::Accounted(0));
            }
            Block::Skipped(ref b) => {
                trace!("skipping block {:#010x} ({} bytes)", b.block_type, b.block_len1);
                emitter.skip_block();
                return Ok(BlockOutcome::Accounted(0));
            }
        };
        index += 1;
        let frame = RawFrame {
            data,
            timestamp,
            index,
        };
        Ok(emitter.emit(&frame))
    })?;
    Ok(emitter.finish(end))
}
