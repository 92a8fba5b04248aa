use nom::bytes::streaming::take;
use nom::combinator::{complete, map_parser};
use nom::error::ParseError;
use nom::multi::many0;
use nom::IResult;
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::PcapEndianness;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    IfName = 2,
    IfTsresol = 9,
    IfTsoffset = 14,
}
}

/// A block option: code, declared length and value (with padding)
#[derive(Debug)]
pub struct PcapNGOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    pub value: &'a [u8],
}

impl<'a> PcapNGOption<'a> {
    /// Return the option value, using the `len` field to limit it, or None if length is invalid
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        self.value.get(..usize::from(self.len))
    }
}

pub(crate) fn parse_option<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
) -> IResult<&'i [u8], PcapNGOption, E> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    let (i, value) = take(align32!(len as u32))(i)?;
    let option = PcapNGOption {
        code: OptionCode(code),
        len,
        value,
    };
    Ok((i, option))
}

/// Parse the options of a block of `len` bytes
///
/// `opt_offset` is the size of the block without options (fixed fields, generic header
/// and trailer). Parsing stops at the first option which does not fit.
pub(crate) fn opt_parse_options<'i, En: PcapEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
    len: usize,
    opt_offset: usize,
) -> IResult<&'i [u8], Vec<PcapNGOption>, E> {
    if len > opt_offset {
        map_parser(
            take(len - opt_offset),
            many0(complete(parse_option::<En, E>)),
        )(i)
    } else {
        Ok((i, Vec::new()))
    }
}
