//! Coordinate value generators for axis and lookup tests.
//!
//! These generators create predictable, verifiable midpoint sequences
//! that can be used across the test suite and benchmarks.

/// Creates regularly spaced midpoints.
///
/// # Example
///
/// ```
/// use test_utils::regular_midpoints;
///
/// let mids = regular_midpoints(5.0, 10.0, 4);
/// assert_eq!(mids, vec![5.0, 15.0, 25.0, 35.0]);
/// ```
pub fn regular_midpoints(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Creates strictly monotonic midpoints with deterministic irregular spacing.
///
/// Each spacing is `step` scaled by a factor in `[0.5, 1.5)`, so the
/// sequence keeps the sign of `step`.
pub fn irregular_midpoints(start: f64, step: f64, n: usize, seed: u32) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    let mut value = start;
    for i in 0..n {
        out.push(value);
        let factor = 0.5 + (simple_hash(i as u32, seed) % 1000) as f64 / 1000.0;
        value += step * factor;
    }
    out
}

/// Creates a global longitude axis of cell centers in `[0, 360)`.
///
/// `n` cells of width `360 / n`, starting half a cell east of 0.
pub fn global_longitudes(n: usize) -> Vec<f64> {
    let step = 360.0 / n.max(1) as f64;
    regular_midpoints(step / 2.0, step, n)
}

/// Creates deterministic lookup positions spread over `[min, max]`.
pub fn lookup_positions(min: f64, max: f64, count: usize, seed: u32) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let frac = (simple_hash(i as u32, seed) % 1_000_000) as f64 / 1_000_000.0;
            min + (max - min) * frac
        })
        .collect()
}

/// Creates a row-major data array where each value encodes its flat index.
pub fn create_index_data(len: usize) -> Vec<f32> {
    (0..len).map(|i| i as f32).collect()
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_midpoints() {
        assert_eq!(regular_midpoints(0.0, -1.0, 3), vec![0.0, -1.0, -2.0]);
        assert!(regular_midpoints(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_irregular_midpoints_are_monotonic() {
        let up = irregular_midpoints(0.0, 2.0, 50, 7);
        assert!(up.windows(2).all(|w| w[1] > w[0]));

        let down = irregular_midpoints(100.0, -3.0, 50, 7);
        assert!(down.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_irregular_midpoints_deterministic() {
        assert_eq!(irregular_midpoints(0.0, 1.0, 10, 42), irregular_midpoints(0.0, 1.0, 10, 42));
    }

    #[test]
    fn test_global_longitudes() {
        let lons = global_longitudes(4);
        assert_eq!(lons, vec![45.0, 135.0, 225.0, 315.0]);
    }

    #[test]
    fn test_lookup_positions_in_range() {
        let pos = lookup_positions(-10.0, 10.0, 100, 3);
        assert_eq!(pos.len(), 100);
        assert!(pos.iter().all(|p| (-10.0..=10.0).contains(p)));
    }
}
