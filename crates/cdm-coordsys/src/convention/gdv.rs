//! GDV: the fallback convention for files without recognised metadata.

use cdm_common::units::{is_date_unit, is_length_unit};
use cdm_common::{Dataset, Variable};

use super::coards::axis_type_from_units;
use super::Convention;
use crate::axis::AxisType;

#[derive(Debug, Clone, Copy, Default)]
pub struct GdvConvention;

/// Axis type implied by a conventional variable name.
pub fn axis_type_from_name(var: &Variable) -> Option<AxisType> {
    let name = var.name.to_ascii_lowercase();
    let units = var.units().unwrap_or("");

    match name.as_str() {
        "x" => Some(AxisType::GeoX),
        "y" => Some(AxisType::GeoY),
        "lat" | "latitude" => Some(AxisType::Lat),
        "lon" | "longitude" => Some(AxisType::Lon),
        "time" | "t" if is_date_unit(units) => Some(AxisType::Time),
        "lev" | "level" => Some(AxisType::GeoZ),
        "z" | "height" | "altitude" | "depth" | "elev" | "elevation" => {
            if is_length_unit(units) {
                Some(AxisType::Height)
            } else {
                Some(AxisType::GeoZ)
            }
        }
        "pressure" | "pres" => Some(AxisType::Pressure),
        _ => None,
    }
}

impl Convention for GdvConvention {
    fn name(&self) -> &str {
        "GDV"
    }

    /// Variable name first, then COARDS units.
    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        axis_type_from_name(var).or_else(|| axis_type_from_units(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::DataType;

    fn var(name: &str, units: Option<&str>) -> Variable {
        let v = Variable::new(name, DataType::Float, vec![]);
        match units {
            Some(u) => v.with_attribute("units", u),
            None => v,
        }
    }

    #[test]
    fn test_name_heuristic() {
        let ds = Dataset::new("memory://gdv");
        assert_eq!(GdvConvention.axis_type(&ds, &var("Lat", None)), Some(AxisType::Lat));
        assert_eq!(GdvConvention.axis_type(&ds, &var("x", None)), Some(AxisType::GeoX));
        assert_eq!(GdvConvention.axis_type(&ds, &var("z", Some("m"))), Some(AxisType::Height));
        assert_eq!(GdvConvention.axis_type(&ds, &var("lev", None)), Some(AxisType::GeoZ));
        assert_eq!(
            GdvConvention.axis_type(&ds, &var("time", Some("hours since 2024-01-01"))),
            Some(AxisType::Time)
        );
        // a "time" without date units is not trusted
        assert_eq!(GdvConvention.axis_type(&ds, &var("time", Some("s"))), None);
    }

    #[test]
    fn test_units_after_name() {
        let ds = Dataset::new("memory://gdv");
        assert_eq!(
            GdvConvention.axis_type(&ds, &var("nav_lat", Some("degrees_north"))),
            Some(AxisType::Lat)
        );
        assert_eq!(GdvConvention.axis_type(&ds, &var("foo", None)), None);
    }
}
