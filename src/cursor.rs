//! Fixed-layout field accessor
//!
//! Protocol layouts are described as tables of [`Field`] values (name, offset, length).
//! A [`ByteCursor`] reads these fields from a buffer, using the byte order chosen when the
//! cursor was created. Any read past the end of the buffer returns
//! [`FrameError::OutOfBounds`], which the dissector treats as a malformed frame.

use std::fmt::Write;

use crate::error::FrameError;

/// Byte order of multi-byte fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Description of a field: byte offset and length in bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, len: usize) -> Field {
        Field { name, offset, len }
    }
}

/// Rendering options for [`ByteCursor::hex`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HexStyle {
    /// Render bytes from last to first
    pub reversed: bool,
    /// Insert `:` every N hex characters
    pub group: Option<usize>,
    pub uppercase: bool,
}

impl HexStyle {
    pub const PLAIN: HexStyle = HexStyle {
        reversed: false,
        group: None,
        uppercase: false,
    };
    pub const REVERSED: HexStyle = HexStyle {
        reversed: true,
        group: None,
        uppercase: false,
    };
    pub const REVERSED_COLON: HexStyle = HexStyle {
        reversed: true,
        group: Some(2),
        uppercase: false,
    };
}

/// Read-only view over a buffer, with a fixed byte order
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> ByteCursor<'a> {
        ByteCursor { data, order }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of a field
    pub fn bytes(&self, field: Field) -> Result<&'a [u8], FrameError> {
        let end = field.offset.checked_add(field.len);
        match end {
            Some(end) if end <= self.data.len() => Ok(&self.data[field.offset..end]),
            _ => Err(FrameError::OutOfBounds {
                field: field.name,
                offset: field.offset,
                len: field.len,
                available: self.data.len(),
            }),
        }
    }

    /// All bytes starting at `offset`
    pub fn tail(&self, offset: usize) -> Result<&'a [u8], FrameError> {
        self.data.get(offset..).ok_or(FrameError::OutOfBounds {
            field: "tail",
            offset,
            len: 0,
            available: self.data.len(),
        })
    }

    /// A cursor over the bytes starting at `offset`, keeping the byte order
    pub fn advance(&self, offset: usize) -> Result<ByteCursor<'a>, FrameError> {
        self.tail(offset).map(|data| ByteCursor::new(data, self.order))
    }

    pub fn u8(&self, field: Field) -> Result<u8, FrameError> {
        let b = self.bytes(Field { len: 1, ..field })?;
        Ok(b[0])
    }

    pub fn u16(&self, field: Field) -> Result<u16, FrameError> {
        let mut a = [0u8; 2];
        a.copy_from_slice(self.bytes(Field { len: 2, ..field })?);
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(a),
            ByteOrder::Big => u16::from_be_bytes(a),
        })
    }

    pub fn u32(&self, field: Field) -> Result<u32, FrameError> {
        let mut a = [0u8; 4];
        a.copy_from_slice(self.bytes(Field { len: 4, ..field })?);
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(a),
            ByteOrder::Big => u32::from_be_bytes(a),
        })
    }

    pub fn u64(&self, field: Field) -> Result<u64, FrameError> {
        let mut a = [0u8; 8];
        a.copy_from_slice(self.bytes(Field { len: 8, ..field })?);
        Ok(match self.order {
            ByteOrder::Little => u64::from_le_bytes(a),
            ByteOrder::Big => u64::from_be_bytes(a),
        })
    }

    /// Render a field as hex
    pub fn hex(&self, field: Field, style: HexStyle) -> Result<String, FrameError> {
        let b = self.bytes(field)?;
        Ok(to_hex(b, style))
    }
}

pub(crate) fn to_hex(b: &[u8], style: HexStyle) -> String {
    let mut digits = String::with_capacity(b.len() * 2);
    let mut push = |byte: &u8| {
        let _ = if style.uppercase {
            write!(digits, "{:02X}", byte)
        } else {
            write!(digits, "{:02x}", byte)
        };
    };
    if style.reversed {
        b.iter().rev().for_each(&mut push);
    } else {
        b.iter().for_each(&mut push);
    }
    match style.group {
        Some(n) if n > 0 => {
            let mut out = String::with_capacity(digits.len() + digits.len() / n);
            for (idx, c) in digits.chars().enumerate() {
                if idx > 0 && idx % n == 0 {
                    out.push(':');
                }
                out.push(c);
            }
            out
        }
        _ => digits,
    }
}
