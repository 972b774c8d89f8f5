//! Mirror boundary handling.
//!
//! Out-of-range indices reflect about the edge samples without repeating them
//! (`-1 → 1`, `len → len - 2`), i.e. the reflect-101 convention. The mapping is
//! periodic with period `2·len − 2`, so taps further away than one image
//! length still land inside the grid.

/// Map a possibly out-of-range index onto `0..len` by mirroring.
///
/// `len` must be non-zero; a single-sample axis maps everything to 0.
#[inline]
pub fn mirror_index(i: isize, len: usize) -> usize {
    debug_assert!(len > 0, "mirror_index on an empty axis");
    if len <= 1 {
        return 0;
    }
    if i >= 0 && (i as usize) < len {
        return i as usize;
    }
    let period = (2 * len - 2) as isize;
    let r = i.rem_euclid(period) as usize;
    if r < len {
        r
    } else {
        (2 * len - 2) - r
    }
}
