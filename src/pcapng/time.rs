use crate::endianness::PcapEndianness;

use super::{OptionCode, PcapNGOption};

/// Default `if_tsresol` value (microseconds)
pub const DEFAULT_TSRESOL: u8 = 6;

/// Default timestamp resolution, in units per second
pub const DEFAULT_RESOLUTION: u64 = 1_000_000;

/// Compute the timestamp resolution, in units per second
///
/// If the most significant bit is set, the resolution is a negative power of 2, otherwise a
/// negative power of 10.
///
/// Return the resolution, or `None` if the resolution is invalid (for ex. greater than `2^64`)
pub fn build_ts_resolution(ts_resol: u8) -> Option<u64> {
    let ts_mode = ts_resol & 0x80;
    let exp = u32::from(ts_resol & 0x7f);
    if ts_mode == 0 {
        // 10^19 is the largest power of 10 to fit in a u64
        10u64.checked_pow(exp)
    } else {
        1u64.checked_shl(exp)
    }
}

/// Convert a raw timestamp (in resolution units) to milliseconds since epoch
///
/// `ts_offset` is the `if_tsoffset` value, in seconds.
pub fn ts_to_millis(ts_high: u32, ts_low: u32, ts_offset: i64, resolution: u64) -> i64 {
    let ticks = (u128::from(ts_high) << 32) | u128::from(ts_low);
    let millis = ticks * 1000 / u128::from(resolution.max(1));
    (millis as i64).saturating_add(ts_offset.saturating_mul(1000))
}

/// Read the `if_tsresol` and `if_tsoffset` options, with their default values
pub(crate) fn if_extract_tsoffset_and_tsresol<En: PcapEndianness>(
    options: &[PcapNGOption],
) -> (u8, i64) {
    let mut if_tsresol: u8 = DEFAULT_TSRESOL;
    let mut if_tsoffset: i64 = 0;
    for opt in options {
        match opt.code {
            OptionCode::IfTsresol => {
                if let Some(&v) = opt.value.first() {
                    if_tsresol = v;
                }
            }
            OptionCode::IfTsoffset => {
                if let Ok((_, v)) = En::parse_i64::<(&[u8], nom::error::ErrorKind)>(opt.value) {
                    if_tsoffset = v;
                }
            }
            _ => (),
        }
    }
    (if_tsresol, if_tsoffset)
}
