//! Missing-data policy and classification.

use serde::{Deserialize, Serialize};

/// Which attribute-derived conditions count as "missing".
///
/// All three conditions are enabled by default. `use_nans` replaces missing
/// values by NaN at decode time; it is lossy, since the cause of a missing
/// value can no longer be recovered from the decoded array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPolicy {
    /// Values equal to `_FillValue` are missing.
    pub fill_value_is_missing: bool,
    /// Values outside `valid_min`/`valid_max`/`valid_range` are missing.
    pub invalid_data_is_missing: bool,
    /// Values equal to any `missing_value` are missing.
    pub missing_data_is_missing: bool,
    /// Encode missing values as NaN in decoded output.
    pub use_nans: bool,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        Self {
            fill_value_is_missing: true,
            invalid_data_is_missing: true,
            missing_data_is_missing: true,
            use_nans: false,
        }
    }
}

impl MissingPolicy {
    /// Policy where nothing but NaN counts as missing.
    pub fn none() -> Self {
        Self {
            fill_value_is_missing: false,
            invalid_data_is_missing: false,
            missing_data_is_missing: false,
            use_nans: false,
        }
    }

    /// Same policy with NaN encoding switched on or off.
    pub fn with_nans(self, use_nans: bool) -> Self {
        Self { use_nans, ..self }
    }

    /// Check if any attribute-derived condition is enabled.
    pub fn any_enabled(&self) -> bool {
        self.fill_value_is_missing || self.invalid_data_is_missing || self.missing_data_is_missing
    }
}

/// Why a decoded value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingKind {
    /// The value itself is NaN.
    NaN,
    /// Equal to `_FillValue`.
    Fill,
    /// Outside the valid range.
    Invalid,
    /// Equal to one of the `missing_value` entries.
    MissingValue,
}

impl MissingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NaN => "nan",
            Self::Fill => "fill",
            Self::Invalid => "invalid",
            Self::MissingValue => "missing_value",
        }
    }
}

impl std::fmt::Display for MissingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative comparison used for `missing_value` matching.
pub(crate) fn close_enough(a: f64, b: f64) -> bool {
    const MAX_RELATIVE_ERROR: f64 = 1.0e-5;
    if a == b {
        return true;
    }
    let diff = if b == 0.0 { a.abs() } else { (a / b - 1.0).abs() };
    diff < MAX_RELATIVE_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let p = MissingPolicy::default();
        assert!(p.any_enabled());
        assert!(!p.use_nans);
        assert!(!MissingPolicy::none().any_enabled());
        assert!(MissingPolicy::default().with_nans(true).use_nans);
    }

    #[test]
    fn test_close_enough() {
        assert!(close_enough(-999.0, -999.0));
        assert!(close_enough(-999.0, -999.000_001));
        assert!(!close_enough(-999.0, -998.9));
        assert!(close_enough(1.0e-6, 0.0));
        assert!(!close_enough(1.0e-3, 0.0));
    }
}
