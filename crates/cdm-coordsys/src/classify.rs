//! Per-variable coordinate role classification.
//!
//! Classification looks at one variable at a time and records which
//! coordinate roles its own attributes claim, together with the raw
//! reference lists the later passes resolve across variables.

use serde::{Deserialize, Serialize};

use cdm_common::{DataType, Dataset, DimId, Variable};
use cdm_enhance::{DecodePolicy, MissingPolicy};

use crate::axis::AxisType;
use crate::cancel::{self, CancelTask};
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;

/// Reserved coordinate attribute names.
pub mod attrs {
    pub const AXIS_TYPE: &str = "_CoordinateAxisType";
    pub const AXES: &str = "_CoordinateAxes";
    pub const SYSTEMS: &str = "_CoordinateSystems";
    pub const TRANSFORMS: &str = "_CoordinateTransforms";
    pub const AXIS_TYPES: &str = "_CoordinateAxisTypes";
    pub const TRANSFORM_TYPE: &str = "_CoordinateTransformType";
    pub const ALIAS_FOR_DIMENSION: &str = "_CoordinateAliasForDimension";
    pub const Z_IS_POSITIVE: &str = "_CoordinateZisPositive";
    pub const POSITIVE: &str = "positive";
    /// CF partial axis list.
    pub const COORDINATES: &str = "coordinates";
}

/// Coordinate role of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisRole {
    None,
    CoordinateVariable,
    CoordinateAxis,
    CoordinateSystemDecl,
    CoordinateTransformDecl,
}

/// Independent role flags; a coordinate variable is usually an axis too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    pub coordinate_variable: bool,
    pub axis: bool,
    pub system: bool,
    pub transform: bool,
}

impl RoleFlags {
    /// A variable with no coordinate role.
    pub fn is_data(&self) -> bool {
        !self.coordinate_variable && !self.axis && !self.system && !self.transform
    }

    /// All roles held, most specific first.
    pub fn roles(&self) -> Vec<AxisRole> {
        let mut roles = Vec::new();
        if self.coordinate_variable {
            roles.push(AxisRole::CoordinateVariable);
        }
        if self.axis {
            roles.push(AxisRole::CoordinateAxis);
        }
        if self.system {
            roles.push(AxisRole::CoordinateSystemDecl);
        }
        if self.transform {
            roles.push(AxisRole::CoordinateTransformDecl);
        }
        if roles.is_empty() {
            roles.push(AxisRole::None);
        }
        roles
    }
}

/// Whitespace-separated names of a reference attribute.
pub fn tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Raw reference attributes of one variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordRefs {
    pub axes: Option<Vec<String>>,
    pub coordinates: Option<Vec<String>>,
    pub systems: Option<Vec<String>>,
    pub transforms: Option<Vec<String>>,
    pub axis_types: Option<Vec<String>>,
    pub transform_type: Option<String>,
    pub positive: Option<String>,
}

impl CoordRefs {
    fn from_variable(var: &Variable) -> Self {
        let list = |name: &str| var.attribute_string(name).map(tokens);
        Self {
            axes: list(attrs::AXES),
            coordinates: list(attrs::COORDINATES),
            systems: list(attrs::SYSTEMS),
            transforms: list(attrs::TRANSFORMS),
            axis_types: list(attrs::AXIS_TYPES),
            transform_type: var.attribute_string(attrs::TRANSFORM_TYPE).map(str::to_string),
            positive: var
                .attribute_string(attrs::Z_IS_POSITIVE)
                .or_else(|| var.attribute_string(attrs::POSITIVE))
                .map(str::to_string),
        }
    }

    /// Explicit axes, or the CF partial list when there are none.
    pub fn axis_names(&self) -> &[String] {
        self.axes
            .as_deref()
            .or(self.coordinates.as_deref())
            .unwrap_or(&[])
    }
}

/// Classification of one variable.
#[derive(Debug, Clone)]
pub struct VariableClass {
    pub name: String,
    pub data_type: DataType,
    pub dims: Vec<DimId>,
    pub flags: RoleFlags,
    /// Parsed `_CoordinateAxisType`.
    pub explicit_axis_type: Option<AxisType>,
    /// Dimension this variable is a coordinate variable (or alias) for.
    pub coordinate_dim: Option<DimId>,
    pub refs: CoordRefs,
    pub decode: DecodePolicy,
}

impl VariableClass {
    pub fn is_data(&self) -> bool {
        self.flags.is_data()
    }

    pub fn roles(&self) -> Vec<AxisRole> {
        self.flags.roles()
    }

    /// The most specific role.
    pub fn role(&self) -> AxisRole {
        self.roles()[0]
    }
}

/// Check if every dimension of `axis` (leaving out the string length of a
/// character axis) is also a dimension of `var`.
pub fn is_axis_for_variable(axis: &Variable, var: &Variable) -> bool {
    dims_fit(&axis.dims, axis.data_type, &var.dims)
}

pub(crate) fn dims_fit(axis_dims: &[DimId], axis_type: DataType, var_dims: &[DimId]) -> bool {
    let check = if axis_type == DataType::Char {
        axis_dims.len().saturating_sub(1)
    } else {
        axis_dims.len()
    };
    axis_dims[..check].iter().all(|d| var_dims.contains(d))
}

/// Classify one variable from its own attributes.
pub fn classify_variable(
    dataset: &Dataset,
    var: &Variable,
    policy: MissingPolicy,
    diag: &mut Diagnostics,
) -> VariableClass {
    let mut flags = RoleFlags::default();
    let mut coordinate_dim = None;

    if dataset.is_coordinate_variable(var) {
        flags.coordinate_variable = true;
        coordinate_dim = Some(var.dims[0]);
        diag.trace(
            Pass::Classify,
            format!(
                " Coordinate Variable added = {} for dimension {}",
                var.name,
                dataset.dimension_name(var.dims[0])
            ),
        );
    }

    let mut explicit_axis_type = None;
    if let Some(type_name) = var.attribute_string(attrs::AXIS_TYPE) {
        flags.axis = true;
        explicit_axis_type = AxisType::from_name(type_name);
        if explicit_axis_type.is_none() {
            diag.advise(
                Pass::Classify,
                format!("Unknown {} '{}' on {}", attrs::AXIS_TYPE, type_name, var.name),
            );
        }
        diag.trace(
            Pass::Classify,
            format!(" Coordinate Axis added = {} type= {}", var.name, type_name),
        );
    }

    if let Some(alias) = var.attribute_string(attrs::ALIAS_FOR_DIMENSION) {
        if var.rank() != 1 {
            diag.advise(
                Pass::Classify,
                format!(
                    "**ERROR Coordinate Variable Alias {} has rank {}",
                    var.name,
                    var.rank()
                ),
            );
        } else if dataset.find_dimension(alias) != Some(var.dims[0]) {
            diag.advise(
                Pass::Classify,
                format!(
                    "**ERROR Coordinate Variable Alias {} names wrong dimension {}",
                    var.name, alias
                ),
            );
        } else {
            flags.axis = true;
            coordinate_dim = Some(var.dims[0]);
            diag.trace(
                Pass::Classify,
                format!(
                    " Coordinate Variable Alias added = {} for dimension {}",
                    var.name, alias
                ),
            );
        }
    }

    if var.find_attribute_ignore_case(attrs::Z_IS_POSITIVE).is_some() {
        flags.axis = true;
    }

    let refs = CoordRefs::from_variable(var);
    flags.system = refs.transforms.is_some();
    flags.transform = refs.transform_type.is_some() || refs.axis_types.is_some();

    // An axis list naming a variable that cannot be an axis of this one
    // marks a coordinate system declaration, not a data variable.
    if !flags.system && !flags.transform && !flags.axis {
        if let Some(axes) = &refs.axes {
            let declares_system = axes.iter().any(|name| {
                dataset
                    .find_variable(name)
                    .is_some_and(|axis| !is_axis_for_variable(axis, var))
            });
            if declares_system {
                flags.system = true;
                diag.trace(
                    Pass::Classify,
                    format!(" {} lists axes outside its shape; treated as Coordinate System", var.name),
                );
            }
        }
    }

    VariableClass {
        name: var.name.clone(),
        data_type: var.data_type,
        dims: var.dims.clone(),
        flags,
        explicit_axis_type,
        coordinate_dim,
        refs,
        decode: DecodePolicy::from_variable(var, policy),
    }
}

/// Classify every variable of a dataset, in dataset order.
pub fn classify_dataset(
    dataset: &Dataset,
    policy: MissingPolicy,
    cancel: &dyn CancelTask,
    diag: &mut Diagnostics,
) -> CoordSysResult<Vec<VariableClass>> {
    let mut out = Vec::with_capacity(dataset.variables().len());
    for var in dataset.variables() {
        cancel::check(cancel)?;
        out.push(classify_variable(dataset, var, policy, diag));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdm_common::Dimension;
    use test_utils::{coordinates_projection, legacy_2d_latlon};

    fn classify(ds: &Dataset, name: &str) -> (VariableClass, Diagnostics) {
        let mut diag = Diagnostics::new();
        let var = ds.find_variable(name).unwrap();
        let class = classify_variable(ds, var, MissingPolicy::default(), &mut diag);
        (class, diag)
    }

    #[test]
    fn test_coordinates_projection_roles() {
        let ds = coordinates_projection();

        let (time, _) = classify(&ds, "time");
        assert_eq!(time.roles(), vec![AxisRole::CoordinateVariable, AxisRole::CoordinateAxis]);
        assert_eq!(time.explicit_axis_type, Some(AxisType::Time));

        let (system, _) = classify(&ds, "ProjectionSystem");
        assert_eq!(system.role(), AxisRole::CoordinateSystemDecl);

        let (transform, _) = classify(&ds, "LambertProjection");
        assert_eq!(transform.role(), AxisRole::CoordinateTransformDecl);

        let (temperature, _) = classify(&ds, "temperature");
        assert!(temperature.is_data());
        assert_eq!(temperature.refs.systems, Some(vec!["ProjectionSystem".to_string()]));

        let (reflectivity, _) = classify(&ds, "reflectivity");
        assert!(reflectivity.is_data());
        assert!(reflectivity.decode.has_missing());
    }

    #[test]
    fn test_coordinates_attribute_is_not_a_system() {
        let ds = legacy_2d_latlon();
        let (temperature, _) = classify(&ds, "temperature");
        assert!(temperature.is_data());
        assert_eq!(temperature.refs.axis_names(), ["lat", "lon"]);

        let (lat, _) = classify(&ds, "lat");
        assert_eq!(lat.role(), AxisRole::None);
    }

    #[test]
    fn test_axis_list_outside_shape_declares_system() {
        let mut ds = Dataset::new("memory://nogaps");
        let lat = ds.add_dimension(Dimension::new("lat", 2));
        let lon = ds.add_dimension(Dimension::new("lon", 2));
        ds.add_variable(Variable::new("lat", DataType::Float, vec![lat]));
        ds.add_variable(Variable::new("lon", DataType::Float, vec![lon]));
        ds.add_variable(
            Variable::new("grid", DataType::Char, vec![]).with_attribute(attrs::AXES, "lat lon"),
        );
        ds.add_variable(
            Variable::new("t", DataType::Float, vec![lat, lon]).with_attribute(attrs::AXES, "lat lon"),
        );

        let (grid, _) = classify(&ds, "grid");
        assert_eq!(grid.role(), AxisRole::CoordinateSystemDecl);
        let (t, _) = classify(&ds, "t");
        assert!(t.is_data());
    }

    #[test]
    fn test_alias_checks() {
        let mut ds = Dataset::new("memory://alias");
        let time = ds.add_dimension(Dimension::new("time", 3));
        let record = ds.add_dimension(Dimension::new("record", 3));
        ds.add_variable(
            Variable::new("valtime", DataType::Double, vec![record])
                .with_attribute(attrs::ALIAS_FOR_DIMENSION, "record"),
        );
        ds.add_variable(
            Variable::new("reftime", DataType::Double, vec![record])
                .with_attribute(attrs::ALIAS_FOR_DIMENSION, "time"),
        );
        ds.add_variable(
            Variable::new("grid", DataType::Double, vec![time, record])
                .with_attribute(attrs::ALIAS_FOR_DIMENSION, "time"),
        );

        let (valtime, _) = classify(&ds, "valtime");
        assert!(valtime.flags.axis);
        assert_eq!(valtime.coordinate_dim, Some(record));

        let (reftime, diag) = classify(&ds, "reftime");
        assert!(!reftime.flags.axis);
        assert!(diag.has_advice("names wrong dimension time"));

        let (grid, diag) = classify(&ds, "grid");
        assert!(!grid.flags.axis);
        assert!(diag.has_advice("has rank 2"));
    }

    #[test]
    fn test_z_is_positive_marks_axis() {
        let mut ds = Dataset::new("memory://z");
        let k = ds.add_dimension(Dimension::new("k", 2));
        ds.add_variable(
            Variable::new("depth_below", DataType::Float, vec![k])
                .with_attribute(attrs::Z_IS_POSITIVE, "down"),
        );
        let (depth, _) = classify(&ds, "depth_below");
        assert!(depth.flags.axis);
        assert_eq!(depth.refs.positive.as_deref(), Some("down"));
    }

    #[test]
    fn test_char_axis_drops_string_length() {
        let mut ds = Dataset::new("memory://char");
        let station = ds.add_dimension(Dimension::new("station", 2));
        let strlen = ds.add_dimension(Dimension::new("strlen", 8));
        let names = Variable::new("names", DataType::Char, vec![station, strlen]);
        let obs = Variable::new("obs", DataType::Float, vec![station]);
        assert!(is_axis_for_variable(&names, &obs));

        let numeric = Variable::new("codes", DataType::Int, vec![station, strlen]);
        assert!(!is_axis_for_variable(&numeric, &obs));
    }

    #[test]
    fn test_classify_dataset_cancel() {
        let ds = legacy_2d_latlon();
        let mut diag = Diagnostics::new();
        let all = classify_dataset(&ds, MissingPolicy::default(), &crate::cancel::NeverCancel, &mut diag)
            .unwrap();
        assert_eq!(all.len(), ds.variables().len());
        assert!(classify_dataset(&ds, MissingPolicy::default(), &|| true, &mut diag).is_err());
    }
}
