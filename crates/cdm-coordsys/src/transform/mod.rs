//! Coordinate transforms and the transform builder registry.
//!
//! A transform declaration variable names its builder through one of
//! `transform_name`, `grid_mapping_name` or `standard_name` (first present
//! wins). The registry maps that name to a [`CoordTransBuilder`], which
//! reads the declaration's parameters and produces a
//! [`CoordinateTransform`].

pub mod forward;
pub mod projection;
pub mod vertical;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cdm_common::{Dataset, Variable};

use crate::diagnostics::{Diagnostics, Pass};

pub use forward::MapProjection;
pub use projection::ProjectionBuilder;
pub use vertical::VerticalBuilder;

/// Attributes consulted, in order, for the builder name.
pub const TRANSFORM_NAME_ATTRIBUTES: [&str; 3] =
    ["transform_name", "grid_mapping_name", "standard_name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformType {
    Projection,
    Vertical,
}

impl TransformType {
    pub fn from_name(name: &str) -> Option<TransformType> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("projection") {
            Some(TransformType::Projection)
        } else if name.eq_ignore_ascii_case("vertical") {
            Some(TransformType::Vertical)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransformType::Projection => "Projection",
            TransformType::Vertical => "Vertical",
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformParameter {
    pub name: String,
    pub value: ParamValue,
}

impl TransformParameter {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match &self.value {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Numbers(v) => v.first().copied(),
            ParamValue::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A projection or vertical transform attached to coordinate systems.
///
/// Equality is structural over name, authority, type and parameter names
/// in order; parameter values do not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateTransform {
    pub name: String,
    pub authority: String,
    pub transform_type: TransformType,
    pub parameters: Vec<TransformParameter>,
}

impl PartialEq for CoordinateTransform {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.authority == other.authority
            && self.transform_type == other.transform_type
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.name == b.name)
    }
}

impl CoordinateTransform {
    pub fn find_parameter(&self, name: &str) -> Option<&TransformParameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.transform_type, self.authority)
    }
}

/// Builds one kind of transform from its declaration variable.
pub trait CoordTransBuilder: Send + Sync {
    /// Name matched against the declaration's transform-name attribute.
    fn transform_name(&self) -> &str;

    fn transform_type(&self) -> TransformType;

    /// Build the transform, or record an advisory and return `None`.
    fn build(
        &self,
        dataset: &Dataset,
        ctv: &Variable,
        diag: &mut Diagnostics,
    ) -> Option<CoordinateTransform>;
}

/// Ordered transform builders with a name index.
///
/// Built-ins are appended; user registrations are prepended and replace any
/// builder of the same name in the index.
#[derive(Clone, Default)]
pub struct CoordTransBuilderRegistry {
    builders: Vec<Arc<dyn CoordTransBuilder>>,
    by_name: HashMap<String, Arc<dyn CoordTransBuilder>>,
}

impl fmt::Debug for CoordTransBuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordTransBuilderRegistry")
            .field("builders", &self.names())
            .finish()
    }
}

impl CoordTransBuilderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in projection and vertical builder.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builder in projection::builtins() {
            registry.append(Arc::new(builder));
        }
        for builder in vertical::builtins() {
            registry.append(Arc::new(builder));
        }
        registry
    }

    fn append(&mut self, builder: Arc<dyn CoordTransBuilder>) {
        self.by_name
            .insert(builder.transform_name().to_lowercase(), builder.clone());
        self.builders.push(builder);
    }

    /// Register a user builder ahead of the existing ones.
    pub fn register(&mut self, builder: Arc<dyn CoordTransBuilder>) {
        self.by_name
            .insert(builder.transform_name().to_lowercase(), builder.clone());
        self.builders.insert(0, builder);
    }

    /// Builder for a transform name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn CoordTransBuilder>> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    /// Registered names in lookup order.
    pub fn names(&self) -> Vec<&str> {
        self.builders.iter().map(|b| b.transform_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Build the transform declared by `ctv`.
    pub fn make_transform(
        &self,
        dataset: &Dataset,
        ctv: &Variable,
        diag: &mut Diagnostics,
    ) -> Option<CoordinateTransform> {
        let Some(name) = TRANSFORM_NAME_ATTRIBUTES
            .iter()
            .find_map(|att| ctv.attribute_string(att))
        else {
            diag.advise(
                Pass::Transforms,
                format!(
                    "**Failed to find Coordinate Transform name from Variable= {}",
                    ctv.name
                ),
            );
            return None;
        };

        let Some(builder) = self.find(name) else {
            diag.advise(
                Pass::Transforms,
                format!(
                    "**Failed to find CoordTransBuilder name= {} from Variable= {}",
                    name, ctv.name
                ),
            );
            return None;
        };

        let ct = builder.build(dataset, ctv, diag)?;
        diag.trace(
            Pass::Transforms,
            format!(
                " Made Coordinate transform {} type {} from variable {}",
                name, ct.transform_type, ctv.name
            ),
        );
        Some(ct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::DataType;

    struct Identity;

    impl CoordTransBuilder for Identity {
        fn transform_name(&self) -> &str {
            "lambert_conformal_conic"
        }

        fn transform_type(&self) -> TransformType {
            TransformType::Projection
        }

        fn build(
            &self,
            _dataset: &Dataset,
            ctv: &Variable,
            _diag: &mut Diagnostics,
        ) -> Option<CoordinateTransform> {
            Some(CoordinateTransform {
                name: ctv.name.clone(),
                authority: "user".to_string(),
                transform_type: TransformType::Projection,
                parameters: vec![],
            })
        }
    }

    fn lambert_var() -> Variable {
        Variable::new("proj", DataType::Int, vec![])
            .with_attribute("grid_mapping_name", "lambert_conformal_conic")
            .with_attribute("standard_parallel", 25.0f64)
            .with_attribute("longitude_of_central_meridian", 265.0f64)
            .with_attribute("latitude_of_projection_origin", 25.0f64)
    }

    #[test]
    fn test_builtins_registered() {
        let registry = CoordTransBuilderRegistry::with_builtins();
        assert!(registry.find("Lambert_Conformal_Conic").is_some());
        assert!(registry.find("atmosphere_hybrid_sigma_pressure_coordinate").is_some());
        assert!(registry.find("unknown").is_none());
        assert_eq!(registry.names()[0], "lambert_conformal_conic");
    }

    #[test]
    fn test_user_builder_overrides_builtin() {
        let mut registry = CoordTransBuilderRegistry::with_builtins();
        let before = registry.len();
        registry.register(Arc::new(Identity));
        assert_eq!(registry.len(), before + 1);

        let ds = Dataset::new("memory://t");
        let mut diag = Diagnostics::new();
        let ct = registry.make_transform(&ds, &lambert_var(), &mut diag).unwrap();
        assert_eq!(ct.authority, "user");
    }

    #[test]
    fn test_missing_name_is_advisory() {
        let registry = CoordTransBuilderRegistry::with_builtins();
        let ds = Dataset::new("memory://t");
        let mut diag = Diagnostics::new();

        let anonymous = Variable::new("p", DataType::Int, vec![]);
        assert!(registry.make_transform(&ds, &anonymous, &mut diag).is_none());
        assert!(diag.has_advice("Failed to find Coordinate Transform name"));

        let unknown = Variable::new("p", DataType::Int, vec![])
            .with_attribute("grid_mapping_name", "sinusoidal_whatever");
        assert!(registry.make_transform(&ds, &unknown, &mut diag).is_none());
        assert!(diag.has_advice("sinusoidal_whatever"));
    }

    #[test]
    fn test_structural_equality_ignores_values() {
        let make = |v: f64| CoordinateTransform {
            name: "proj".to_string(),
            authority: "FGDC".to_string(),
            transform_type: TransformType::Projection,
            parameters: vec![TransformParameter::new("false_easting", ParamValue::Number(v))],
        };
        assert_eq!(make(0.0), make(10.0));

        let mut other = make(0.0);
        other.parameters[0].name = "false_northing".to_string();
        assert_ne!(make(0.0), other);
    }
}
