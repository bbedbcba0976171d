//! COARDS: axis types from units.

use cdm_common::units::{
    is_date_unit, is_latitude_unit, is_length_unit, is_longitude_unit, is_pressure_unit,
};
use cdm_common::{Dataset, Variable};

use super::convention_attribute;
use super::Convention;
use crate::axis::AxisType;
use crate::classify::attrs;

#[derive(Debug, Clone, Copy, Default)]
pub struct CoardsConvention;

/// Axis type implied by the `units` attribute.
///
/// Vertical axes need a `positive` attribute unless their units name a
/// level or layer.
pub fn axis_type_from_units(var: &Variable) -> Option<AxisType> {
    let units = var.units()?;

    if is_date_unit(units) {
        return Some(AxisType::Time);
    }
    if is_latitude_unit(units) {
        return Some(AxisType::Lat);
    }
    if is_longitude_unit(units) {
        return Some(AxisType::Lon);
    }
    if is_pressure_unit(units) {
        return Some(AxisType::Pressure);
    }
    if var.attribute_string(attrs::POSITIVE).is_some() {
        return if is_length_unit(units) {
            Some(AxisType::Height)
        } else {
            Some(AxisType::GeoZ)
        };
    }
    if ["level", "layer", "sigma_level"]
        .iter()
        .any(|u| units.eq_ignore_ascii_case(u))
    {
        return Some(AxisType::GeoZ);
    }
    None
}

impl Convention for CoardsConvention {
    fn name(&self) -> &str {
        "COARDS"
    }

    fn is_mine(&self, dataset: &Dataset) -> bool {
        convention_attribute(dataset)
            .is_some_and(|c| c.to_ascii_uppercase().starts_with("COARDS"))
    }

    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        axis_type_from_units(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::{Attribute, DataType};

    fn var(units: &str) -> Variable {
        Variable::new("v", DataType::Float, vec![]).with_attribute("units", units)
    }

    #[test]
    fn test_units_heuristic() {
        assert_eq!(axis_type_from_units(&var("days since 2000-01-01")), Some(AxisType::Time));
        assert_eq!(axis_type_from_units(&var("degrees_north")), Some(AxisType::Lat));
        assert_eq!(axis_type_from_units(&var("degreesE")), Some(AxisType::Lon));
        assert_eq!(axis_type_from_units(&var("hPa")), Some(AxisType::Pressure));
        assert_eq!(axis_type_from_units(&var("m")), None);
        assert_eq!(
            axis_type_from_units(&var("m").with_attribute("positive", "up")),
            Some(AxisType::Height)
        );
        assert_eq!(
            axis_type_from_units(&var("1").with_attribute("positive", "down")),
            Some(AxisType::GeoZ)
        );
        assert_eq!(axis_type_from_units(&var("Level")), Some(AxisType::GeoZ));
        assert_eq!(axis_type_from_units(&Variable::new("v", DataType::Float, vec![])), None);
    }

    #[test]
    fn test_is_mine() {
        let mut ds = Dataset::new("memory://coards");
        assert!(!CoardsConvention.is_mine(&ds));
        ds.set_global_attribute(Attribute::new("Conventions", "coards-1.0"));
        assert!(CoardsConvention.is_mine(&ds));
    }
}
