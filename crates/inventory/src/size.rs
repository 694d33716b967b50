use clonenux_core::RawDeviceRecord;

pub const OPTICAL_PREFIX: &str = "sr";
pub const DEFAULT_LOGICAL_BLOCK_SIZE: u32 = 512;
pub const BYTES_PER_GIGABYTE: u128 = 1_000_000_000;

/// Capacity in whole SI gigabytes, rounded down.
///
/// Optical drives (`sr*`) return `None`: their reported size says nothing
/// useful about the medium. Missing sector counts count as zero and a missing
/// or zero block size falls back to 512 bytes.
pub fn compute_display_size(record: &RawDeviceRecord) -> Option<u64> {
    if record.short_name.starts_with(OPTICAL_PREFIX) {
        return None;
    }
    let sectors = record.raw_size_sectors.unwrap_or(0);
    let block_size = record
        .logical_block_size_bytes
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_LOGICAL_BLOCK_SIZE);
    let gigabytes = u128::from(sectors) * u128::from(block_size) / BYTES_PER_GIGABYTE;
    Some(u64::try_from(gigabytes).unwrap_or(u64::MAX))
}
