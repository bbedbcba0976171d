//! Climate and Forecast (CF-1.x) convention.
//!
//! Augmentation turns CF's indirect references into `_Coordinate`
//! attributes:
//!
//! - the target of every `grid_mapping` becomes a projection transform
//!   declaration applying to `GeoX GeoY` (or `Lat Lon` for
//!   `latitude_longitude`);
//! - every variable with `formula_terms` becomes a vertical transform
//!   declaration applying to itself.

use cdm_common::units::{is_latitude_unit, is_longitude_unit, is_pressure_unit};
use cdm_common::{Attribute, Dataset, Variable};
use tracing::debug;

use super::coards::axis_type_from_units;
use super::{convention_attribute, Convention};
use crate::axis::AxisType;
use crate::cancel::{self, CancelTask};
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;
use crate::transform::vertical::FORMULA_TERMS;

pub const GRID_MAPPING: &str = "grid_mapping";
pub const GRID_MAPPING_NAME: &str = "grid_mapping_name";
pub const STANDARD_NAME: &str = "standard_name";
pub const AXIS: &str = "axis";

/// Standard names of parameterized vertical coordinates.
pub const VERTICAL_COORDS: [&str; 8] = [
    "atmosphere_ln_pressure_coordinate",
    "atmosphere_sigma_coordinate",
    "atmosphere_hybrid_sigma_pressure_coordinate",
    "atmosphere_hybrid_height_coordinate",
    "atmosphere_sleve_coordinate",
    "ocean_sigma_coordinate",
    "ocean_s_coordinate",
    "ocean_double_sigma_coordinate",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CfConvention;

fn axis_type_from_standard_name(name: &str) -> Option<AxisType> {
    let name = name.to_ascii_lowercase();
    let t = match name.as_str() {
        "time" | "forecast_reference_time" => AxisType::Time,
        "latitude" | "grid_latitude" => AxisType::Lat,
        "longitude" | "grid_longitude" => AxisType::Lon,
        "projection_x_coordinate" => AxisType::GeoX,
        "projection_y_coordinate" => AxisType::GeoY,
        "air_pressure" => AxisType::Pressure,
        "height" | "altitude" | "height_above_geopotential_datum" => AxisType::Height,
        "depth" | "model_level_number" => AxisType::GeoZ,
        n if VERTICAL_COORDS.contains(&n) => AxisType::GeoZ,
        _ => return None,
    };
    Some(t)
}

fn axis_type_from_axis_attribute(var: &Variable, axis: &str) -> Option<AxisType> {
    let units = var.units().unwrap_or("");
    match axis.to_ascii_uppercase().as_str() {
        "X" if is_longitude_unit(units) => Some(AxisType::Lon),
        "X" => Some(AxisType::GeoX),
        "Y" if is_latitude_unit(units) => Some(AxisType::Lat),
        "Y" => Some(AxisType::GeoY),
        "Z" if is_pressure_unit(units) => Some(AxisType::Pressure),
        "Z" => Some(AxisType::GeoZ),
        "T" => Some(AxisType::Time),
        _ => None,
    }
}

impl Convention for CfConvention {
    fn name(&self) -> &str {
        "CF-1.0"
    }

    fn is_mine(&self, dataset: &Dataset) -> bool {
        convention_attribute(dataset).is_some_and(|c| c.starts_with("CF-1"))
    }

    fn augment(
        &self,
        dataset: &mut Dataset,
        cancel: &dyn CancelTask,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        let mut projections = Vec::new();
        let mut verticals = Vec::new();

        for var in dataset.variables() {
            cancel::check(cancel)?;

            if let Some(target) = var.attribute_string(GRID_MAPPING) {
                if !projections.iter().any(|p: &String| p == target) {
                    projections.push(target.to_string());
                }
            }
            if var.find_attribute_ignore_case(FORMULA_TERMS).is_some() {
                verticals.push(var.name.clone());
            }
        }

        for name in projections {
            let Some(var) = dataset.find_variable_mut(&name) else {
                diag.advise(
                    Pass::Convention,
                    format!("**Cant find grid_mapping variable {}", name),
                );
                continue;
            };
            let lat_lon = var
                .attribute_string(GRID_MAPPING_NAME)
                .is_some_and(|g| g.eq_ignore_ascii_case("latitude_longitude"));
            var.set_attribute(Attribute::new(attrs::TRANSFORM_TYPE, "Projection"));
            var.set_attribute(Attribute::new(
                attrs::AXIS_TYPES,
                if lat_lon { "Lat Lon" } else { "GeoX GeoY" },
            ));
            debug!(variable = %name, "Marked grid_mapping as projection transform");
            diag.trace(
                Pass::Convention,
                format!(" grid_mapping {} is a Projection transform", name),
            );
        }

        for name in verticals {
            if let Some(var) = dataset.find_variable_mut(&name) {
                var.set_attribute(Attribute::new(attrs::TRANSFORM_TYPE, "Vertical"));
                var.set_attribute(Attribute::new(attrs::AXES, name.as_str()));
                diag.trace(
                    Pass::Convention,
                    format!(" {} with formula_terms is a Vertical transform", name),
                );
            }
        }

        Ok(())
    }

    /// `standard_name`, then `axis`, then COARDS units.
    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        var.attribute_string(STANDARD_NAME)
            .and_then(axis_type_from_standard_name)
            .or_else(|| {
                var.attribute_string(AXIS)
                    .and_then(|a| axis_type_from_axis_attribute(var, a))
            })
            .or_else(|| axis_type_from_units(var))
    }
}
