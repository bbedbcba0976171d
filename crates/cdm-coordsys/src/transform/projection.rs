//! Map projection builders.
//!
//! Each builder is a parameter table: required numeric attributes must be
//! present on the declaration variable, optional ones are copied when they
//! are.

use cdm_common::{AttrValues, Attribute, Dataset, Variable};

use super::{CoordTransBuilder, CoordinateTransform, ParamValue, TransformParameter, TransformType};
use crate::diagnostics::{Diagnostics, Pass};

const AUTHORITY: &str = "FGDC";

const EARTH_SHAPE: [&str; 4] = [
    "earth_radius",
    "semi_major_axis",
    "semi_minor_axis",
    "inverse_flattening",
];

/// Table-driven builder for one projection.
#[derive(Debug, Clone)]
pub struct ProjectionBuilder {
    name: &'static str,
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

impl ProjectionBuilder {
    pub const fn new(
        name: &'static str,
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            required,
            optional,
        }
    }

    pub fn required(&self) -> &[&'static str] {
        self.required
    }
}

/// The built-in projections.
pub fn builtins() -> Vec<ProjectionBuilder> {
    vec![
        ProjectionBuilder::new(
            "lambert_conformal_conic",
            &[
                "standard_parallel",
                "longitude_of_central_meridian",
                "latitude_of_projection_origin",
            ],
            &["false_easting", "false_northing"],
        ),
        ProjectionBuilder::new(
            "polar_stereographic",
            &[
                "straight_vertical_longitude_from_pole",
                "latitude_of_projection_origin",
            ],
            &[
                "scale_factor_at_projection_origin",
                "standard_parallel",
                "false_easting",
                "false_northing",
            ],
        ),
        ProjectionBuilder::new(
            "stereographic",
            &[
                "longitude_of_projection_origin",
                "latitude_of_projection_origin",
            ],
            &[
                "scale_factor_at_projection_origin",
                "false_easting",
                "false_northing",
            ],
        ),
        ProjectionBuilder::new(
            "mercator",
            &["longitude_of_projection_origin"],
            &[
                "standard_parallel",
                "scale_factor_at_projection_origin",
                "false_easting",
                "false_northing",
            ],
        ),
        ProjectionBuilder::new(
            "transverse_mercator",
            &[
                "scale_factor_at_central_meridian",
                "longitude_of_central_meridian",
                "latitude_of_projection_origin",
            ],
            &["false_easting", "false_northing"],
        ),
        ProjectionBuilder::new(
            "albers_conical_equal_area",
            &[
                "standard_parallel",
                "longitude_of_central_meridian",
                "latitude_of_projection_origin",
            ],
            &["false_easting", "false_northing"],
        ),
        ProjectionBuilder::new(
            "rotated_latitude_longitude",
            &["grid_north_pole_latitude", "grid_north_pole_longitude"],
            &["north_pole_grid_longitude"],
        ),
        ProjectionBuilder::new(
            "vertical_perspective",
            &[
                "latitude_of_projection_origin",
                "longitude_of_projection_origin",
                "perspective_point_height",
            ],
            &["false_easting", "false_northing"],
        ),
        ProjectionBuilder::new(
            "flat_earth",
            &[
                "latitude_of_projection_origin",
                "longitude_of_projection_origin",
            ],
            &["rotation_angle"],
        ),
        ProjectionBuilder::new(
            "geostationary",
            &["longitude_of_projection_origin", "perspective_point_height"],
            &[
                "latitude_of_projection_origin",
                "sweep_angle_axis",
                "fixed_angle_axis",
                "false_easting",
                "false_northing",
            ],
        ),
    ]
}

fn param_value(att: &Attribute) -> Option<ParamValue> {
    match &att.values {
        AttrValues::String(s) => Some(ParamValue::Text(s.trim().to_string())),
        _ => match att.len() {
            0 => None,
            1 => att.numeric_value().map(ParamValue::Number),
            _ => Some(ParamValue::Numbers(att.numeric_values())),
        },
    }
}

impl CoordTransBuilder for ProjectionBuilder {
    fn transform_name(&self) -> &str {
        self.name
    }

    fn transform_type(&self) -> TransformType {
        TransformType::Projection
    }

    fn build(
        &self,
        _dataset: &Dataset,
        ctv: &Variable,
        diag: &mut Diagnostics,
    ) -> Option<CoordinateTransform> {
        let mut parameters = Vec::new();

        for &name in self.required {
            let value = ctv
                .find_attribute_ignore_case(name)
                .and_then(param_value)
                .filter(|v| !matches!(v, ParamValue::Text(_)));
            match value {
                Some(value) => parameters.push(TransformParameter::new(name, value)),
                None => {
                    diag.advise(
                        Pass::Transforms,
                        format!(
                            "**{} projection {} missing numeric parameter {}",
                            self.name, ctv.name, name
                        ),
                    );
                    return None;
                }
            }
        }

        for &name in self.optional.iter().chain(EARTH_SHAPE.iter()) {
            if let Some(value) = ctv.find_attribute_ignore_case(name).and_then(param_value) {
                parameters.push(TransformParameter::new(name, value));
            }
        }

        Some(CoordinateTransform {
            name: ctv.name.clone(),
            authority: AUTHORITY.to_string(),
            transform_type: TransformType::Projection,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::DataType;

    fn builder(name: &str) -> ProjectionBuilder {
        builtins()
            .into_iter()
            .find(|b| b.transform_name() == name)
            .unwrap()
    }

    #[test]
    fn test_lambert_parameters() {
        let ctv = Variable::new("LambertProjection", DataType::Char, vec![])
            .with_attribute("standard_parallel", vec![25.0f64, 25.0])
            .with_attribute("longitude_of_central_meridian", -95.0f64)
            .with_attribute("latitude_of_projection_origin", 25.0f64)
            .with_attribute("false_easting", 0.0f32)
            .with_attribute("earth_radius", 6_371_229.0f64);

        let mut diag = Diagnostics::new();
        let ct = builder("lambert_conformal_conic")
            .build(&Dataset::new("memory://t"), &ctv, &mut diag)
            .unwrap();

        assert_eq!(ct.name, "LambertProjection");
        assert_eq!(ct.authority, "FGDC");
        assert_eq!(
            ct.find_parameter("standard_parallel").map(|p| p.value.clone()),
            Some(ParamValue::Numbers(vec![25.0, 25.0]))
        );
        assert_eq!(
            ct.find_parameter("longitude_of_central_meridian").and_then(|p| p.number()),
            Some(-95.0)
        );
        assert!(ct.find_parameter("false_easting").is_some());
        assert!(ct.find_parameter("earth_radius").is_some());
        assert!(ct.find_parameter("false_northing").is_none());
        assert!(diag.advisories().next().is_none());
    }

    #[test]
    fn test_missing_required_parameter() {
        let ctv = Variable::new("ps", DataType::Int, vec![])
            .with_attribute("latitude_of_projection_origin", 90.0f64);
        let mut diag = Diagnostics::new();
        let ct = builder("polar_stereographic").build(&Dataset::new("memory://t"), &ctv, &mut diag);
        assert!(ct.is_none());
        assert!(diag.has_advice("straight_vertical_longitude_from_pole"));
    }

    #[test]
    fn test_geostationary_text_parameter() {
        let ctv = Variable::new("goes_imager_projection", DataType::Int, vec![])
            .with_attribute("longitude_of_projection_origin", -75.0f64)
            .with_attribute("perspective_point_height", 35_786_023.0f64)
            .with_attribute("sweep_angle_axis", "x");
        let mut diag = Diagnostics::new();
        let ct = builder("geostationary")
            .build(&Dataset::new("memory://t"), &ctv, &mut diag)
            .unwrap();
        assert_eq!(
            ct.find_parameter("sweep_angle_axis").and_then(|p| p.text()),
            Some("x")
        );
    }

    #[test]
    fn test_every_builtin_has_required_parameters() {
        for b in builtins() {
            assert!(!b.required().is_empty(), "{}", b.transform_name());
        }
    }
}
