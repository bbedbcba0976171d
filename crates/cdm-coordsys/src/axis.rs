//! Coordinate axes and the axis-type taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use cdm_common::{DataType, DimId, TimeUnits};
use cdm_enhance::DecodePolicy;

use crate::index::MonotonicAxisIndex;

/// Physical role of a coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisType {
    Time,
    GeoX,
    GeoY,
    GeoZ,
    Lat,
    Lon,
    Height,
    Pressure,
    RadialAzimuth,
    RadialDistance,
    RadialElevation,
}

impl AxisType {
    pub const ALL: [AxisType; 11] = [
        AxisType::Time,
        AxisType::GeoX,
        AxisType::GeoY,
        AxisType::GeoZ,
        AxisType::Lat,
        AxisType::Lon,
        AxisType::Height,
        AxisType::Pressure,
        AxisType::RadialAzimuth,
        AxisType::RadialDistance,
        AxisType::RadialElevation,
    ];

    /// Sort key for canonical coordinate system names.
    pub fn rank(self) -> u8 {
        match self {
            AxisType::Time => 0,
            AxisType::GeoZ | AxisType::Height | AxisType::Pressure => 1,
            AxisType::GeoY | AxisType::Lat => 2,
            AxisType::GeoX | AxisType::Lon => 3,
            AxisType::RadialDistance => 4,
            AxisType::RadialAzimuth => 5,
            AxisType::RadialElevation => 6,
        }
    }

    /// Parse an axis type name, ignoring case.
    pub fn from_name(name: &str) -> Option<AxisType> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AxisType::Time => "Time",
            AxisType::GeoX => "GeoX",
            AxisType::GeoY => "GeoY",
            AxisType::GeoZ => "GeoZ",
            AxisType::Lat => "Lat",
            AxisType::Lon => "Lon",
            AxisType::Height => "Height",
            AxisType::Pressure => "Pressure",
            AxisType::RadialAzimuth => "RadialAzimuth",
            AxisType::RadialDistance => "RadialDistance",
            AxisType::RadialElevation => "RadialElevation",
        }
    }

    /// GeoZ, Height and Pressure.
    pub fn is_vertical(self) -> bool {
        matches!(self, AxisType::GeoZ | AxisType::Height | AxisType::Pressure)
    }
}

impl fmt::Display for AxisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of increasing values on a vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Positive {
    Up,
    Down,
}

impl Positive {
    pub fn parse(s: &str) -> Option<Positive> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("up") {
            Some(Positive::Up)
        } else if s.eq_ignore_ascii_case("down") {
            Some(Positive::Down)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Positive::Up => "up",
            Positive::Down => "down",
        }
    }
}

/// A variable promoted to a coordinate axis.
///
/// `index` is present for 1-D numeric axes whose values could be read and
/// form a strictly monotonic sequence.
#[derive(Debug, Clone)]
pub struct CoordinateAxis {
    pub name: String,
    pub data_type: DataType,
    pub dims: Vec<DimId>,
    pub axis_type: Option<AxisType>,
    pub positive: Option<Positive>,
    pub units: Option<String>,
    /// 1-D with a dimension of the same name (or a valid alias).
    pub is_coordinate_variable: bool,
    pub decode: DecodePolicy,
    pub index: Option<MonotonicAxisIndex>,
}

impl CoordinateAxis {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type.is_numeric()
    }

    /// Dimensions that index values, leaving out the string length of
    /// character axes.
    pub fn value_dims(&self) -> &[DimId] {
        if self.data_type == DataType::Char && !self.dims.is_empty() {
            &self.dims[..self.dims.len() - 1]
        } else {
            &self.dims
        }
    }

    /// Parsed `"<period> since <reference>"` units of a time axis.
    pub fn time_units(&self) -> Option<TimeUnits> {
        self.units.as_deref().and_then(TimeUnits::parse)
    }

    /// Midpoints of a time axis as absolute times.
    ///
    /// `None` unless the axis has date units and an index; values that
    /// overflow the calendar map to `None` individually.
    pub fn times(&self) -> Option<Vec<Option<DateTime<Utc>>>> {
        let units = self.time_units()?;
        let mids = self.midpoints()?;
        Some(mids.iter().map(|&v| units.to_datetime(v)).collect())
    }

    pub fn index(&self) -> Option<&MonotonicAxisIndex> {
        self.index.as_ref()
    }

    /// Decoded midpoints of a 1-D axis.
    pub fn midpoints(&self) -> Option<&[f64]> {
        self.index.as_ref().map(MonotonicAxisIndex::midpoints)
    }

    /// Cell edges of a 1-D axis (`n + 1` values).
    pub fn edges(&self) -> Option<&[f64]> {
        self.index.as_ref().map(MonotonicAxisIndex::edges)
    }

    pub fn is_regular(&self) -> bool {
        self.index.as_ref().is_some_and(MonotonicAxisIndex::is_regular)
    }
}
