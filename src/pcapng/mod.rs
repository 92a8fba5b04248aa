//! PCAPNG file format
//!
//! See <https://github.com/pcapng/pcapng> for details.
//!
//! The preferred way to read a file is to use a [`PcapNGReader`], or to manually read the
//! blocks using [`parse_sectionheaderblock`], [`parse_block_le`] and/or [`parse_block_be`].
//!
//! ## File format and parsing
//!
//! A capture file is organized in blocks. Blocks are organized in sections, each section
//! starting with a Section Header Block (SHB), and followed by blocks (interface description,
//! statistics, packets, etc.).
//! A file is usually composed of one section, but can contain multiple sections. When a SHB is
//! encountered, this means a new section starts (and all information about previous section has to
//! be flushed, like interfaces).
//!
//! Only the blocks carrying packets (and the blocks needed to decode them) are parsed.
//! Name resolution, statistics, IRIG/ARINC and local-use blocks are returned as
//! [`Block::Skipped`], custom blocks as [`Block::Custom`]. Any other block type is an error.
//!
//! ## Endianness
//!
//! The endianness of a block is indicated by the Section Header Block that started the section
//! containing this block. Since a file can contain several sections, a single file can contain
//! both endianness variants.

mod block;
mod enhanced_packet;
mod interface_description;
mod option;
mod packet;
mod reader;
mod section_header;
mod simple_packet;
mod time;

pub use block::*;
pub use enhanced_packet::*;
pub use interface_description::*;
pub use option::*;
pub use packet::*;
pub use reader::*;
pub use section_header::*;
pub use simple_packet::*;
pub use time::*;

/// Section Header Block magic
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block magic
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Packet Block (obsolete) magic
pub const PB_MAGIC: u32 = 0x0000_0002;
/// Simple Packet Block magic
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Name Resolution Block magic
pub const NRB_MAGIC: u32 = 0x0000_0004;
/// Interface Statistic Block magic
pub const ISB_MAGIC: u32 = 0x0000_0005;
/// Enhanced Packet Block magic
pub const EPB_MAGIC: u32 = 0x0000_0006;
/// IRIG Timestamp Block magic
pub const IRIG_MAGIC: u32 = 0x0000_0007;
/// ARINC 429 in AFDX Encapsulation Information Block magic
pub const ARINC_MAGIC: u32 = 0x0000_0008;

/// Custom Block magic
pub const CB_MAGIC: u32 = 0x0000_0BAD;
/// Do-not-copy Custom Block magic
pub const DCB_MAGIC: u32 = 0x4000_0BAD;

/// Byte Order magic
pub const BOM_MAGIC: u32 = 0x1A2B_3C4D;

/// Size of the generic block header (type, length) and trailer (length)
pub const BLOCK_OVERHEAD: usize = 12;

/// Block types with this bit set are reserved for local use, and are skipped
pub const LOCAL_USE_MASK: u32 = 0x8000_0000;

/// Captured bytes of a packet block, without the padding to 32 bits
pub(crate) fn unpadded(data: &[u8], caplen: u32) -> &[u8] {
    data.get(..caplen as usize).unwrap_or(data)
}
