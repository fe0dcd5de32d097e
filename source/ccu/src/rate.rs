//! Rate arithmetic shared by the node types.
//!
//! Rates are integer Hz. Ratios are kept as integer pairs; nothing here uses
//! floating point.

/// `parent * mul / div`, computed in 128 bits so that multi-GHz parents with
/// large multipliers cannot overflow. A zero divisor yields 0.
#[must_use]
pub const fn child_rate(parent: u64, mul: u32, div: u32) -> u64 {
    if div == 0 {
        return 0;
    }
    (parent as u128 * mul as u128 / div as u128) as u64
}

/// Integer division rounded to the nearest integer (halves round up).
#[must_use]
pub const fn div_round_closest(n: u64, d: u64) -> u64 {
    if d == 0 {
        return 0;
    }
    (n + d / 2) / d
}

/// Picks the divisor from `candidates` whose resulting rate is closest to
/// `target`.
///
/// When two candidates are equally close (they straddle `target`), the one
/// whose rate does not exceed `target` wins. Zero divisors are ignored.
/// Returns `None` only if no usable candidate was given.
#[must_use]
pub fn find_best_divisor(parent: u64, target: u64, candidates: &[u32]) -> Option<u32> {
    let mut best: Option<(u32, u64, bool)> = None;
    for &div in candidates {
        if div == 0 {
            continue;
        }
        let rate = parent / div as u64;
        let diff = rate.abs_diff(target);
        let under = rate <= target;
        let better = match best {
            None => true,
            Some((_, best_diff, best_under)) => {
                diff < best_diff || (diff == best_diff && under && !best_under)
            }
        };
        if better {
            best = Some((div, diff, under));
        }
    }
    best.map(|(div, _, _)| div)
}

/// Rate of a fractional (numerator/denominator) divider.
///
/// `parent * den / (num * factor)`, dividing the parent down by 10^4 first
/// and scaling back up at the end. The truncation this introduces is part
/// of the hardware model: table rates such as 14.74 MHz are exactly what
/// this formula produces.
#[must_use]
pub const fn ddn_rate(parent: u64, num: u32, den: u32, factor: u32) -> u64 {
    let divisor = num as u64 * factor as u64;
    if divisor == 0 {
        return 0;
    }
    ((parent / 10_000) * den as u64 / divisor) * 10_000
}
