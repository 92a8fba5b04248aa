//! # Capture file importer
//!
//! This crate reads offline network captures (legacy pcap and pcapng) and Bro/Zeek
//! connection logs, and turns them into a stream of records describing the network:
//!
//! - [`HostSighting`]: an IPv4 address seen on the wire, with its MAC address;
//! - [`PacketData`]: a classified packet (TCP, UDP, ICMP echo reply or other IP protocol);
//! - [`MeshSighting`]: an IEEE 802.15.4 frame tunnelled over ZEP.
//!
//! The file formats are parsed with streaming, zero-copy parsers based on a circular buffer
//! ([`LegacyPcapReader`], [`PcapNGReader`]), so that memory usage does not depend on the
//! file size. Frames are then decoded by a [`Dissector`](dissect::Dissector), which also
//! reassembles fragmented IPv4 datagrams.
//!
//! # Example: importing a file on a worker thread
//!
//! ```rust,no_run
//! use pcap_ingest::channel::Poll;
//! use pcap_ingest::import::ImportTask;
//! use pcap_ingest::{ImportConfig, Record};
//!
//! let handle = ImportTask::spawn("capture.pcapng", ImportConfig::default());
//! loop {
//!     match handle.poll() {
//!         Poll::Item(Record::Packet(p)) => println!("{} -> {}", p.meta.src_addr, p.meta.dst_addr),
//!         Poll::Item(_) => (),
//!         Poll::Pending => std::thread::yield_now(),
//!         Poll::Done => break,
//!     }
//!     println!("{}/{}", handle.progress(), handle.total());
//! }
//! let summary = handle.join();
//! ```
//!
//! # Example: synchronous import
//!
//! [`import_reader`](import::import_reader) runs the same code in the calling thread, on
//! any `Read` input, and pushes records to any [`RecordSink`](channel::RecordSink) (for ex.
//! a `Vec<Record>`).
//!
//! ```rust
//! use pcap_ingest::import::{import_reader, CaptureFormat, ImportControl};
//! use pcap_ingest::{CaptureSource, ImportConfig, Record};
//!
//! # let data: &[u8] = &[
//! #     0xd4, 0xc3, 0xb2, 0xa1, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0, 0, 1, 0, 0, 0,
//! # ];
//! let mut records: Vec<Record> = Vec::new();
//! let ctl = ImportControl::new();
//! let summary = import_reader(
//!     CaptureSource::new("memory"),
//!     data,
//!     CaptureFormat::Pcap,
//!     &ImportConfig::default(),
//!     &mut records,
//!     &ctl,
//! )
//! .expect("import failed");
//! assert_eq!(summary.frames, 0);
//! ```

mod stream;
mod utils;

mod blocks;
mod endianness;
mod error;
mod linktype;
pub use blocks::*;
pub use error::*;
pub use linktype::*;

pub mod pcap;
pub mod pcapng;
pub use pcap::*;
pub use pcapng::*;

pub mod traits;

pub mod cursor;
pub mod dissect;
pub mod protocol;
pub mod records;
pub use records::*;

pub mod bro;
pub mod channel;
pub mod config;
pub mod import;
pub use config::ImportConfig;
