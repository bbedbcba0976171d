//! Edges, regularity and position lookup for 1-D numeric coordinate axes.
//!
//! Edges are derived from midpoints:
//!
//! ```text
//! edge[i] = (mid[i-1] + mid[i]) / 2          1 <= i < n
//! edge[0] = mid[0] - (edge[1] - mid[0])
//! edge[n] = mid[n-1] + (mid[n-1] - edge[n-1])
//! ```
//!
//! A single midpoint gets edges `mid - 0.5` and `mid + 0.5`.

use std::sync::OnceLock;
use thiserror::Error;

/// Absolute tolerance of the regularity check.
pub const REGULAR_TOLERANCE: f64 = 1.0e-4;

/// Why an index could not be built from a midpoint sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AxisIndexError {
    #[error("axis has no values")]
    Empty,

    #[error("axis value {index} is not finite")]
    NonFinite { index: usize },

    #[error("axis values are not strictly monotonic at index {index}")]
    NotMonotonic { index: usize },
}

/// Lookup structure over a strictly monotonic midpoint sequence.
///
/// Immutable after construction except for the regularity cache, which is
/// a pure function of the midpoints.
#[derive(Debug, Clone)]
pub struct MonotonicAxisIndex {
    midpoints: Vec<f64>,
    edges: Vec<f64>,
    ascending: bool,
    longitude: bool,
    regular: OnceLock<Option<(f64, f64)>>,
}

fn make_edges(mids: &[f64]) -> Vec<f64> {
    let n = mids.len();
    if n == 1 {
        return vec![mids[0] - 0.5, mids[0] + 0.5];
    }
    let mut edges = vec![0.0; n + 1];
    for i in 1..n {
        edges[i] = (mids[i - 1] + mids[i]) / 2.0;
    }
    edges[0] = mids[0] - (edges[1] - mids[0]);
    edges[n] = mids[n - 1] + (mids[n - 1] - edges[n - 1]);
    edges
}

/// Normalize `lon` into `[base, base + 360)`.
fn lon_normalize(lon: f64, base: f64) -> f64 {
    base + (lon - base).rem_euclid(360.0)
}

/// Shortest angular distance in degrees.
fn lon_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

impl MonotonicAxisIndex {
    /// Build an index from decoded midpoints.
    pub fn new(midpoints: Vec<f64>) -> Result<Self, AxisIndexError> {
        if midpoints.is_empty() {
            return Err(AxisIndexError::Empty);
        }
        if let Some(index) = midpoints.iter().position(|v| !v.is_finite()) {
            return Err(AxisIndexError::NonFinite { index });
        }

        let ascending = midpoints.len() < 2 || midpoints[0] < midpoints[1];
        for (i, w) in midpoints.windows(2).enumerate() {
            let ok = if ascending { w[0] < w[1] } else { w[0] > w[1] };
            if !ok {
                return Err(AxisIndexError::NotMonotonic { index: i + 1 });
            }
        }

        let edges = make_edges(&midpoints);
        Ok(Self {
            midpoints,
            edges,
            ascending,
            longitude: false,
            regular: OnceLock::new(),
        })
    }

    /// Treat positions as longitudes (wrap-aware lookups).
    pub fn into_longitude(mut self) -> Self {
        self.longitude = true;
        self
    }

    pub fn len(&self) -> usize {
        self.midpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.midpoints.is_empty()
    }

    pub fn midpoints(&self) -> &[f64] {
        &self.midpoints
    }

    /// The `n + 1` cell edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn is_longitude(&self) -> bool {
        self.longitude
    }

    pub fn coord_value(&self, i: usize) -> Option<f64> {
        self.midpoints.get(i).copied()
    }

    /// Lower and upper edge of cell `i`, in axis order.
    pub fn coord_edges(&self, i: usize) -> Option<(f64, f64)> {
        Some((*self.edges.get(i)?, *self.edges.get(i + 1)?))
    }

    /// Smallest and largest edge.
    pub fn edge_range(&self) -> (f64, f64) {
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        if self.ascending {
            (first, last)
        } else {
            (last, first)
        }
    }

    // === Regularity ===

    fn regularity(&self) -> Option<(f64, f64)> {
        *self.regular.get_or_init(|| {
            let start = self.midpoints[0];
            if self.midpoints.len() < 2 {
                return Some((start, 0.0));
            }
            let increment = self.midpoints[1] - self.midpoints[0];
            let regular = self
                .midpoints
                .windows(2)
                .all(|w| ((w[1] - w[0]) - increment).abs() <= REGULAR_TOLERANCE);
            regular.then_some((start, increment))
        })
    }

    /// Check if successive midpoint differences are constant within
    /// [`REGULAR_TOLERANCE`].
    pub fn is_regular(&self) -> bool {
        self.regularity().is_some()
    }

    pub fn start(&self) -> f64 {
        self.midpoints[0]
    }

    /// Spacing of a regular axis.
    pub fn increment(&self) -> Option<f64> {
        self.regularity().map(|(_, inc)| inc)
    }

    // === Lookup ===

    /// Index of the cell containing `pos`, or `None` if outside the axis.
    ///
    /// The walk starts at `hint` (default `n / 2`); passing the previous
    /// result makes sequential lookups cheap. Longitude axes use a
    /// wrap-aware scan instead.
    pub fn find_coord_element(&self, pos: f64, hint: Option<usize>) -> Option<usize> {
        if pos.is_nan() {
            return None;
        }
        if self.longitude {
            return self.find_longitude(pos);
        }

        let n = self.len();
        let (first, last) = (self.edges[0], self.edges[n]);
        let inside = if self.ascending {
            first <= pos && pos <= last
        } else {
            last <= pos && pos <= first
        };
        if !inside {
            return None;
        }

        let mut i = hint.unwrap_or(n / 2).min(n - 1);
        loop {
            let (lo, hi) = (self.edges[i], self.edges[i + 1]);
            let (below, above) = if self.ascending {
                (pos < lo, pos >= hi)
            } else {
                (pos > lo, pos <= hi)
            };
            if below {
                i -= 1;
            } else if above {
                if i == n - 1 {
                    return Some(i);
                }
                i += 1;
            } else {
                return Some(i);
            }
        }
    }

    /// Like [`find_coord_element`](Self::find_coord_element) but clamps
    /// out-of-range positions to the first or last cell.
    pub fn find_coord_element_bounded(&self, pos: f64, hint: Option<usize>) -> usize {
        if let Some(i) = self.find_coord_element(pos, hint) {
            return i;
        }
        let n = self.len();
        if self.longitude {
            let to_first = lon_distance(pos, self.edges[0]);
            let to_last = lon_distance(pos, self.edges[n]);
            return if to_first <= to_last { 0 } else { n - 1 };
        }
        let before_first = if self.ascending {
            pos < self.edges[0]
        } else {
            pos > self.edges[0]
        };
        if before_first || pos.is_nan() {
            0
        } else {
            n - 1
        }
    }

    fn find_longitude(&self, pos: f64) -> Option<usize> {
        let n = self.len();
        for i in 0..n {
            let (a, b) = (self.edges[i], self.edges[i + 1]);
            let hit = if self.ascending {
                lon_normalize(pos, a) < b
            } else {
                lon_normalize(pos, b) > b && lon_normalize(pos, b) <= a
            };
            if hit {
                return Some(i);
            }
        }
        // closed upper end of the last cell
        if lon_distance(pos, self.edges[n]) == 0.0 {
            return Some(n - 1);
        }
        None
    }

    /// Cursor that remembers the last hit for sequential lookups.
    pub fn cursor(&self) -> AxisCursor<'_> {
        AxisCursor {
            index: self,
            last: None,
        }
    }
}

/// Per-caller lookup state over a shared index.
#[derive(Debug, Clone)]
pub struct AxisCursor<'a> {
    index: &'a MonotonicAxisIndex,
    last: Option<usize>,
}

impl AxisCursor<'_> {
    pub fn find(&mut self, pos: f64) -> Option<usize> {
        let found = self.index.find_coord_element(pos, self.last);
        if found.is_some() {
            self.last = found;
        }
        found
    }

    pub fn find_bounded(&mut self, pos: f64) -> usize {
        let found = self.index.find_coord_element_bounded(pos, self.last);
        self.last = Some(found);
        found
    }

    /// Index found by the previous successful lookup.
    pub fn last(&self) -> Option<usize> {
        self.last
    }
}
