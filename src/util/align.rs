//! Utilities for aligning memory

use anyhow::Result;

use crate::Error;

/// Whether `value` is a non-zero power of two.
pub fn is_power_of_two(value: u64) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Round `value` up to the next multiple of `alignment`, which must be a non-zero power of two.
/// Values that are already aligned are returned unchanged.
/// # Errors
/// * [`Error::InvalidAlignment`] if `alignment` is not a non-zero power of two.
/// # Example
/// ```
/// use deimos::util::align::align_up;
/// assert_eq!(align_up(64, 256).unwrap(), 256);
/// assert_eq!(align_up(256, 256).unwrap(), 256);
/// assert_eq!(align_up(257, 256).unwrap(), 512);
/// assert!(align_up(16, 24).is_err());
/// ```
pub fn align_up(value: u64, alignment: u64) -> Result<u64> {
    if !is_power_of_two(alignment) {
        return Err(Error::InvalidAlignment(alignment).into());
    }
    let mask = alignment - 1;
    value
        .checked_add(mask)
        .map(|v| v & !mask)
        .ok_or_else(|| Error::Uncategorized("aligned size overflows").into())
}

