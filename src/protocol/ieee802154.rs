//! IEEE 802.15.4 MAC frame header

use crate::cursor::{ByteCursor, ByteOrder, Field};
use crate::error::FrameError;
use crate::records::DeviceAddr;

const FCF: Field = Field::new("fcf", 0, 2);
const SEQ_NUMBER: Field = Field::new("seq_number", 2, 1);
const ADDRESSING_START: usize = 3;

/// Addressing mode of a source or destination field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrMode {
    None,
    Reserved,
    Short,
    Extended,
}

impl AddrMode {
    fn from_bits(b: u16) -> AddrMode {
        match b & 0b11 {
            0 => AddrMode::None,
            1 => AddrMode::Reserved,
            2 => AddrMode::Short,
            _ => AddrMode::Extended,
        }
    }

    /// Width of the address field, in bytes
    pub fn width(self) -> usize {
        match self {
            AddrMode::Short => 2,
            AddrMode::Extended => 8,
            AddrMode::None | AddrMode::Reserved => 0,
        }
    }

    pub fn is_present(self) -> bool {
        self.width() > 0
    }
}

/// Frame Control Field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameControl(pub u16);

impl FrameControl {
    const MASK_TYPE: u16 = 0x0007;
    const MASK_SECURITY: u16 = 0x0008;
    const MASK_PENDING: u16 = 0x0010;
    const MASK_ACK_REQUEST: u16 = 0x0020;
    const MASK_INTRA_PAN: u16 = 0x0040;

    pub fn frame_type(self) -> u8 {
        (self.0 & Self::MASK_TYPE) as u8
    }
    pub fn security_enabled(self) -> bool {
        self.0 & Self::MASK_SECURITY != 0
    }
    pub fn frame_pending(self) -> bool {
        self.0 & Self::MASK_PENDING != 0
    }
    pub fn ack_request(self) -> bool {
        self.0 & Self::MASK_ACK_REQUEST != 0
    }
    pub fn intra_pan(self) -> bool {
        self.0 & Self::MASK_INTRA_PAN != 0
    }
    pub fn dst_mode(self) -> AddrMode {
        AddrMode::from_bits(self.0 >> 10)
    }
    pub fn version(self) -> u8 {
        ((self.0 >> 12) & 0b11) as u8
    }
    pub fn src_mode(self) -> AddrMode {
        AddrMode::from_bits(self.0 >> 14)
    }
    /// A destination PAN id follows the sequence number
    pub fn has_pan_id(self) -> bool {
        self.dst_mode().is_present()
    }
}

/// Decoded MAC header fields
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacHeader {
    pub fcf: FrameControl,
    pub seq: u8,
    pub dst_pan: Option<u16>,
    pub dst_addr: Option<DeviceAddr>,
    pub src_pan: Option<u16>,
    pub src_addr: Option<DeviceAddr>,
    /// Header length, in bytes
    pub header_len: usize,
}

impl MacHeader {
    /// PAN of the source device: only known when intra-PAN compression is used
    pub fn source_pan(&self) -> Option<u16> {
        if self.fcf.intra_pan() {
            self.dst_pan
        } else {
            self.src_pan
        }
    }
}

fn read_addr(
    c: &ByteCursor,
    name: &'static str,
    offset: usize,
    mode: AddrMode,
) -> Result<Option<DeviceAddr>, FrameError> {
    match mode {
        AddrMode::Short => c
            .u16(Field::new(name, offset, 2))
            .map(|a| Some(DeviceAddr::Short(a))),
        AddrMode::Extended => c
            .u64(Field::new(name, offset, 8))
            .map(|a| Some(DeviceAddr::Extended(a))),
        AddrMode::None | AddrMode::Reserved => Ok(None),
    }
}

/// Parse the MAC header of an 802.15.4 frame
///
/// Field offsets depend on the addressing modes: each PAN id present shifts the following
/// fields by 2 bytes, and each address is 2 or 8 bytes wide.
pub fn parse_mac_header(data: &[u8]) -> Result<MacHeader, FrameError> {
    let c = ByteCursor::new(data, ByteOrder::Little);
    let fcf = FrameControl(c.u16(FCF)?);
    let seq = c.u8(SEQ_NUMBER)?;
    let mut pos = ADDRESSING_START;

    let dst_mode = fcf.dst_mode();
    let (dst_pan, dst_addr) = if dst_mode.is_present() {
        let pan = c.u16(Field::new("dst_pan", pos, 2))?;
        pos += 2;
        let addr = read_addr(&c, "dst_addr", pos, dst_mode)?;
        pos += dst_mode.width();
        (Some(pan), addr)
    } else {
        (None, None)
    };

    let src_mode = fcf.src_mode();
    let (src_pan, src_addr) = if src_mode.is_present() {
        let pan = if fcf.intra_pan() {
            None
        } else {
            let pan = c.u16(Field::new("src_pan", pos, 2))?;
            pos += 2;
            Some(pan)
        };
        let addr = read_addr(&c, "src_addr", pos, src_mode)?;
        pos += src_mode.width();
        (pan, addr)
    } else {
        (None, None)
    };

    Ok(MacHeader {
        fcf,
        seq,
        dst_pan,
        dst_addr,
        src_pan,
        src_addr,
        header_len: pos,
    })
}
