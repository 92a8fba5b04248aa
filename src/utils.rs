/// Copy 2 bytes at `offset`
///
/// Caller must have checked that `offset + 2 <= i.len()`, otherwise this function panics.
#[inline]
pub(crate) fn array_ref2(i: &[u8], offset: usize) -> [u8; 2] {
    let mut a = [0u8; 2];
    a.copy_from_slice(&i[offset..offset + 2]);
    a
}

/// Copy 4 bytes at `offset`
///
/// Caller must have checked that `offset + 4 <= i.len()`, otherwise this function panics.
#[inline]
pub(crate) fn array_ref4(i: &[u8], offset: usize) -> [u8; 4] {
    let mut a = [0u8; 4];
    a.copy_from_slice(&i[offset..offset + 4]);
    a
}

/// Current wall-clock time, in milliseconds since epoch
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
