//! Configuration for dataset enhancement.

use cdm_enhance::MissingPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the coordinate system builder and value decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Run the maximal coordinate system heuristic.
    pub use_maximal_coord_sys: bool,

    /// Values equal to `_FillValue` are missing.
    pub fill_value_is_missing: bool,

    /// Values outside the valid range are missing.
    pub invalid_data_is_missing: bool,

    /// Values equal to a `missing_value` are missing.
    pub missing_data_is_missing: bool,

    /// Replace missing values by NaN when decoding.
    pub use_nans: bool,

    /// Read 1-D axis values and build lookup indexes.
    pub read_axis_values: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            use_maximal_coord_sys: true,
            fill_value_is_missing: true,
            invalid_data_is_missing: true,
            missing_data_is_missing: true,
            use_nans: false,
            read_axis_values: true,
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl EnhanceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CDM_USE_MAXIMAL_COORD_SYS") {
            config.use_maximal_coord_sys = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CDM_FILL_VALUE_IS_MISSING") {
            config.fill_value_is_missing = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CDM_INVALID_DATA_IS_MISSING") {
            config.invalid_data_is_missing = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CDM_MISSING_DATA_IS_MISSING") {
            config.missing_data_is_missing = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CDM_USE_NANS") {
            config.use_nans = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CDM_READ_AXIS_VALUES") {
            config.read_axis_values = parse_flag(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.use_nans && !self.missing_policy().any_enabled() {
            return Err("use_nans requires at least one missing-data policy".to_string());
        }

        Ok(())
    }

    /// Missing-data policy handed to the decoder.
    pub fn missing_policy(&self) -> MissingPolicy {
        MissingPolicy {
            fill_value_is_missing: self.fill_value_is_missing,
            invalid_data_is_missing: self.invalid_data_is_missing,
            missing_data_is_missing: self.missing_data_is_missing,
            use_nans: self.use_nans,
        }
    }
}
