//! ZigBee Encapsulation Protocol (ZEP)
//!
//! ZEP tunnels raw IEEE 802.15.4 frames over UDP (port 17754 on both ends). Two header
//! versions exist: v1 (16 bytes) and v2 (32 bytes). Version 2 has a `data` and an `ack`
//! variant, with different layouts. All multi-byte fields are read as little-endian.

use crate::cursor::{ByteCursor, ByteOrder, Field, HexStyle};
use crate::error::FrameError;

pub const ZEP_PORT: u16 = 17754;

pub const PREAMBLE: &[u8; 2] = b"EX";

pub const HEADER_LEN_V1: usize = 16;
pub const HEADER_LEN_V2: usize = 32;

pub const TYPE_DATA: u8 = 1;
pub const TYPE_ACK: u8 = 2;

const F_PREAMBLE: Field = Field::new("zep_preamble", 0, 2);
const F_VERSION: Field = Field::new("zep_version", 2, 1);

mod v1 {
    use crate::cursor::Field;

    pub const CHANNEL: Field = Field::new("zep_channel", 3, 1);
    pub const DEVICE_ID: Field = Field::new("zep_device_id", 4, 2);
    pub const CRC_LQI_MODE: Field = Field::new("zep_mode", 6, 1);
    pub const LQI: Field = Field::new("zep_lqi", 7, 1);
    pub const LENGTH: Field = Field::new("zep_length", 15, 1);
}

mod v2 {
    use crate::cursor::Field;

    pub const TYPE: Field = Field::new("zep_type", 3, 1);

    pub const CHANNEL: Field = Field::new("zep_channel", 4, 1);
    pub const DEVICE_ID: Field = Field::new("zep_device_id", 5, 2);
    pub const CRC_LQI_MODE: Field = Field::new("zep_mode", 7, 1);
    pub const LQI: Field = Field::new("zep_lqi", 8, 1);
    pub const NTP_TIMESTAMP: Field = Field::new("zep_timestamp", 9, 8);
    pub const SEQ: Field = Field::new("zep_seq", 17, 4);
    pub const LENGTH: Field = Field::new("zep_length", 31, 1);

    pub const ACK_SEQ: Field = Field::new("zep_ack_seq", 5, 4);
}

/// Width of the ZEP-level destination and source device ids
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFormat {
    LongDestLongSource,
    ShortDestLongSource,
    LongDestShortSource,
    ShortDestShortSource,
}

impl AddressFormat {
    /// Look up the address format byte (high byte of the embedded frame control field)
    pub fn from_byte(b: u8) -> Option<AddressFormat> {
        match b {
            0xdc | 0xcc => Some(AddressFormat::LongDestLongSource),
            0xd8 | 0xc8 => Some(AddressFormat::ShortDestLongSource),
            0x9c | 0x8c => Some(AddressFormat::LongDestShortSource),
            0x98 | 0x88 => Some(AddressFormat::ShortDestShortSource),
            _ => None,
        }
    }

    /// (destination, source) widths in bytes
    pub fn widths(self) -> (usize, usize) {
        match self {
            AddressFormat::LongDestLongSource => (8, 8),
            AddressFormat::ShortDestLongSource => (2, 8),
            AddressFormat::LongDestShortSource => (8, 2),
            AddressFormat::ShortDestShortSource => (2, 2),
        }
    }
}

/// Header variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZepKind {
    V1 {
        channel: u8,
        device_id: u16,
        crc_mode: bool,
        lqi: u8,
        length: u8,
    },
    V2Data {
        channel: u8,
        device_id: u16,
        crc_mode: bool,
        lqi: u8,
        ntp_timestamp: u64,
        seq: u32,
        length: u8,
    },
    V2Ack {
        seq: u32,
    },
}

/// A decoded ZEP packet, borrowing the embedded 802.15.4 frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZepPacket<'a> {
    pub version: u8,
    pub kind: ZepKind,
    pub dst_device: Option<String>,
    pub src_device: Option<String>,
    /// Embedded IEEE 802.15.4 frame
    pub payload: &'a [u8],
}

impl<'a> ZepPacket<'a> {
    pub fn channel(&self) -> Option<u8> {
        match self.kind {
            ZepKind::V1 { channel, .. } | ZepKind::V2Data { channel, .. } => Some(channel),
            ZepKind::V2Ack { .. } => None,
        }
    }

    pub fn header_len(&self) -> usize {
        if self.version == 1 {
            HEADER_LEN_V1
        } else {
            HEADER_LEN_V2
        }
    }
}

/// Returns true if a UDP datagram with these ports carries ZEP
#[inline]
pub fn is_zep(src_port: u16, dst_port: u16) -> bool {
    src_port == ZEP_PORT && dst_port == ZEP_PORT
}

const DEVICE_ID_HEX: HexStyle = HexStyle {
    reversed: true,
    group: None,
    uppercase: true,
};

const DEVICE_ID_HEX_LONG: HexStyle = HexStyle {
    reversed: true,
    group: Some(2),
    uppercase: true,
};

fn device_id(c: &ByteCursor, name: &'static str, offset: usize, width: usize) -> Option<String> {
    let style = if width == 2 {
        DEVICE_ID_HEX
    } else {
        DEVICE_ID_HEX_LONG
    };
    c.hex(Field::new(name, offset, width), style).ok()
}

/// Decode a ZEP header from a UDP payload
///
/// The device ids are read at fixed positions inside the embedded frame, selected by the
/// address format byte. They are rendered as hex, last byte first (2-byte ids as 4 hex
/// characters, 8-byte ids as 8 `:`-separated pairs). Ids that do not fit in the buffer are
/// left unset.
pub fn parse_zep(data: &[u8]) -> Result<ZepPacket, FrameError> {
    let c = ByteCursor::new(data, ByteOrder::Little);
    if c.bytes(F_PREAMBLE)? != PREAMBLE {
        return Err(FrameError::Malformed {
            what: "ZEP preamble",
        });
    }
    let version = c.u8(F_VERSION)?;
    let (kind, header_len) = match version {
        1 => {
            let kind = ZepKind::V1 {
                channel: c.u8(v1::CHANNEL)?,
                device_id: c.u16(v1::DEVICE_ID)?,
                crc_mode: c.u8(v1::CRC_LQI_MODE)? == 1,
                lqi: c.u8(v1::LQI)?,
                length: c.u8(v1::LENGTH)?,
            };
            (kind, HEADER_LEN_V1)
        }
        2 => {
            let kind = if c.u8(v2::TYPE)? == TYPE_ACK {
                ZepKind::V2Ack {
                    seq: c.u32(v2::ACK_SEQ)?,
                }
            } else {
                ZepKind::V2Data {
                    channel: c.u8(v2::CHANNEL)?,
                    device_id: c.u16(v2::DEVICE_ID)?,
                    crc_mode: c.u8(v2::CRC_LQI_MODE)? == 1,
                    lqi: c.u8(v2::LQI)?,
                    ntp_timestamp: c.u64(v2::NTP_TIMESTAMP)?,
                    seq: c.u32(v2::SEQ)?,
                    length: c.u8(v2::LENGTH)?,
                }
            };
            (kind, HEADER_LEN_V2)
        }
        _ => {
            return Err(FrameError::Malformed {
                what: "ZEP version",
            })
        }
    };
    let payload = c.tail(header_len)?;

    // address format is the second byte of the 802.15.4 frame control field;
    // ids start after FCF (2), sequence (1) and destination PAN (2)
    let format = c
        .u8(Field::new("zep_address_format", header_len + 1, 1))
        .ok()
        .and_then(AddressFormat::from_byte);
    let (dst_device, src_device) = match format {
        Some(format) => {
            let (dst_w, src_w) = format.widths();
            let dst_off = header_len + 5;
            (
                device_id(&c, "zep_dst_device", dst_off, dst_w),
                device_id(&c, "zep_src_device", dst_off + dst_w, src_w),
            )
        }
        None => (None, None),
    };

    Ok(ZepPacket {
        version,
        kind,
        dst_device,
        src_device,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // ZEP v2 data, channel 11, device 0x0003, seq 0x10, followed by an 802.15.4 data frame
    // with short destination 0xffff and extended source 0x0011223344556677
    const ZEP_V2_SHORT_LONG: &[u8] = &hex!(
        "45 58 02 01 0b 03 00 01 ff"
        "00 00 00 00 00 00 00 00"
        "10 00 00 00"
        "00 00 00 00 00 00 00 00 00 00"
        "10"
        "41 c8 2c aa 1a ff ff 77 66 55 44 33 22 11 00 09 12"
    );

    const ZEP_V2_ACK: &[u8] = &hex!(
        "45 58 02 02 00 2a 00 00 00"
        "00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00"
    );

    #[test]
    fn v2_data_short_dest_long_source() {
        let zep = parse_zep(ZEP_V2_SHORT_LONG).expect("zep");
        assert_eq!(zep.version, 2);
        assert_eq!(zep.channel(), Some(11));
        match zep.kind {
            ZepKind::V2Data {
                device_id,
                crc_mode,
                lqi,
                seq,
                length,
                ..
            } => {
                assert_eq!(device_id, 3);
                assert!(crc_mode);
                assert_eq!(lqi, 0xff);
                assert_eq!(seq, 0x10);
                assert_eq!(length, 0x10);
            }
            ref k => panic!("unexpected kind {:?}", k),
        }
        let dst = zep.dst_device.expect("destination id");
        let src = zep.src_device.expect("source id");
        assert_eq!(dst, "FFFF");
        assert_eq!(src, "00:11:22:33:44:55:66:77");
        assert_eq!(src.chars().filter(|c| *c != ':').count(), 16);
        assert_eq!(zep.payload.len(), 17);
        assert_eq!(zep.payload[0], 0x41);
    }

    #[test]
    fn v2_ack() {
        let zep = parse_zep(ZEP_V2_ACK).expect("zep ack");
        assert_eq!(zep.kind, ZepKind::V2Ack { seq: 0x2a });
        assert_eq!(zep.channel(), None);
        assert!(zep.payload.is_empty());
        assert_eq!(zep.dst_device, None);
    }

    #[test]
    fn v1_header() {
        let mut data = hex!("45 58 01 0f 34 12 00 80 00 00 00 00 00 00 00 05").to_vec();
        data.extend_from_slice(&hex!("41 88 01 cd ab 02 00 03 00"));
        let zep = parse_zep(&data).expect("zep v1");
        assert_eq!(zep.header_len(), HEADER_LEN_V1);
        assert_eq!(zep.channel(), Some(15));
        assert_eq!(
            zep.kind,
            ZepKind::V1 {
                channel: 15,
                device_id: 0x1234,
                crc_mode: false,
                lqi: 0x80,
                length: 5,
            }
        );
        assert_eq!(zep.dst_device.as_deref(), Some("0002"));
        assert_eq!(zep.src_device.as_deref(), Some("0003"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_zep(&hex!("00 00 02")).is_err());
        assert!(parse_zep(&hex!("45 58 07 00")).is_err());
        assert!(parse_zep(&hex!("45 58")).is_err());
        assert!(is_zep(17754, 17754));
        assert!(!is_zep(17754, 53));
    }
}
