//! Coordinate systems: named sets of axes with optional transforms.

use std::cmp::Ordering;
use std::sync::Arc;

use cdm_common::DimId;

use crate::axis::{AxisType, CoordinateAxis};
use crate::transform::{CoordinateTransform, TransformType};

/// A set of coordinate axes spanning part of a variable's dimensions.
#[derive(Debug, Clone)]
pub struct CoordinateSystem {
    name: String,
    axes: Vec<Arc<CoordinateAxis>>,
    domain: Vec<DimId>,
    transforms: Vec<Arc<CoordinateTransform>>,
    implicit: bool,
}

/// Canonical ordering: untyped axes first, then by axis-type rank, then by
/// name.
///
/// An axis with no axis type sorts before every typed axis whatever its
/// name, so a system over `(record, lat, lon)` with an untyped `record`
/// is named `record-lat-lon`.
fn axis_order(a: &CoordinateAxis, b: &CoordinateAxis) -> Ordering {
    let key = |axis: &CoordinateAxis| axis.axis_type.map(|t| t.rank());
    match (key(a), key(b)) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (ra, rb) => ra.cmp(&rb).then_with(|| a.name.cmp(&b.name)),
    }
}

impl CoordinateSystem {
    /// Build a system from axes. Duplicate axes (by name) are dropped and
    /// the remaining axes are stored in canonical order.
    pub fn new(axes: Vec<Arc<CoordinateAxis>>, implicit: bool) -> Self {
        let mut unique: Vec<Arc<CoordinateAxis>> = Vec::with_capacity(axes.len());
        for axis in axes {
            if !unique.iter().any(|a| a.name == axis.name) {
                unique.push(axis);
            }
        }
        unique.sort_by(|a, b| axis_order(a, b));

        let mut domain = Vec::new();
        for axis in &unique {
            for &dim in &axis.dims {
                if !domain.contains(&dim) {
                    domain.push(dim);
                }
            }
        }

        let name = Self::make_name(&unique);
        Self {
            name,
            axes: unique,
            domain,
            transforms: Vec::new(),
            implicit,
        }
    }

    /// Canonical name of an axis set, independent of the order given.
    pub fn make_name(axes: &[Arc<CoordinateAxis>]) -> String {
        let mut sorted: Vec<&CoordinateAxis> = axes.iter().map(|a| a.as_ref()).collect();
        sorted.sort_by(|a, b| axis_order(a, b));
        sorted.dedup_by(|a, b| a.name == b.name);
        sorted
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axes in canonical order.
    pub fn axes(&self) -> &[Arc<CoordinateAxis>] {
        &self.axes
    }

    /// Union of the axes' dimensions.
    pub fn domain(&self) -> &[DimId] {
        &self.domain
    }

    pub fn transforms(&self) -> &[Arc<CoordinateTransform>] {
        &self.transforms
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Number of dimensions in the domain.
    pub fn rank_range(&self) -> usize {
        self.domain.len()
    }

    /// Attach a transform unless an equal one is already attached.
    pub fn add_transform(&mut self, transform: Arc<CoordinateTransform>) -> bool {
        if self.transforms.iter().any(|t| **t == *transform) {
            return false;
        }
        self.transforms.push(transform);
        true
    }

    // === Queries ===

    /// First axis of the given type.
    pub fn find_axis(&self, axis_type: AxisType) -> Option<&Arc<CoordinateAxis>> {
        self.axes.iter().find(|a| a.axis_type == Some(axis_type))
    }

    pub fn has_axis_type(&self, axis_type: AxisType) -> bool {
        self.find_axis(axis_type).is_some()
    }

    pub fn is_lat_lon(&self) -> bool {
        self.has_axis_type(AxisType::Lat) && self.has_axis_type(AxisType::Lon)
    }

    /// GeoX and GeoY axes plus a projection transform.
    pub fn is_geo_xy(&self) -> bool {
        self.has_axis_type(AxisType::GeoX)
            && self.has_axis_type(AxisType::GeoY)
            && self.projection().is_some()
    }

    pub fn is_geo_referencing(&self) -> bool {
        self.is_lat_lon() || self.is_geo_xy()
    }

    pub fn has_time_axis(&self) -> bool {
        self.has_axis_type(AxisType::Time)
    }

    pub fn has_vertical_axis(&self) -> bool {
        self.axes
            .iter()
            .any(|a| a.axis_type.is_some_and(AxisType::is_vertical))
    }

    /// First projection transform.
    pub fn projection(&self) -> Option<&Arc<CoordinateTransform>> {
        self.transforms
            .iter()
            .find(|t| t.transform_type == TransformType::Projection)
    }

    /// First vertical transform.
    pub fn vertical_transform(&self) -> Option<&Arc<CoordinateTransform>> {
        self.transforms
            .iter()
            .find(|t| t.transform_type == TransformType::Vertical)
    }

    pub fn contains_axis(&self, name: &str) -> bool {
        self.axes.iter().any(|a| a.name == name)
    }

    /// Check if every named axis is part of this system.
    pub fn contains_axes<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.contains_axis(n.as_ref()))
    }

    /// Check if the system has an axis of every listed type.
    pub fn contains_axis_types(&self, types: &[AxisType]) -> bool {
        types.iter().all(|&t| self.has_axis_type(t))
    }

    /// Check if every domain dimension is one of `dims`.
    pub fn is_subset_of(&self, dims: &[DimId]) -> bool {
        self.domain.iter().all(|d| dims.contains(d))
    }
}
