//! Building blocks for conventions that synthesize axes from global
//! metadata.

use cdm_common::{DataType, Dataset, DimId, RawArray, Variable};

use crate::axis::AxisType;
use crate::classify::attrs;
use crate::error::{CoordSysError, CoordSysResult};

pub(crate) fn global_f64(dataset: &Dataset, name: &str) -> Option<f64> {
    dataset
        .find_global_attribute(name)
        .and_then(|a| a.numeric_value())
}

pub(crate) fn global_i64(dataset: &Dataset, name: &str) -> Option<i64> {
    global_f64(dataset, name).map(|v| v as i64)
}

pub(crate) fn global_str<'a>(dataset: &'a Dataset, name: &str) -> Option<&'a str> {
    dataset
        .find_global_attribute(name)
        .and_then(|a| a.string_value())
        .map(str::trim)
}

pub(crate) fn dim_len(dataset: &Dataset, dim: DimId) -> usize {
    dataset.dimension(dim).map_or(0, |d| d.length)
}

/// `n` values `start + i * step`.
pub(crate) fn ramp(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// A 1-D axis variable over `dim` holding `values`.
///
/// Axes named differently from their dimension are marked as aliases of
/// it.
pub(crate) fn axis_variable(
    dataset: &Dataset,
    name: &str,
    dim: DimId,
    values: impl Into<RawArray>,
    units: &str,
    axis_type: AxisType,
    long_name: &str,
) -> Variable {
    let values = values.into();
    let mut v = Variable::new(name, values.data_type(), vec![dim])
        .with_attribute("units", units)
        .with_attribute("long_name", long_name)
        .with_attribute(attrs::AXIS_TYPE, axis_type.as_str())
        .with_values(values);
    let dim_name = dataset.dimension_name(dim);
    if dim_name != name {
        v = v.with_attribute(attrs::ALIAS_FOR_DIMENSION, dim_name);
    }
    v
}

/// Numeric values of a variable.
pub(crate) fn read_f64(dataset: &Dataset, name: &str) -> CoordSysResult<Vec<f64>> {
    let var = dataset
        .find_variable(name)
        .ok_or_else(|| CoordSysError::augment("synthesis", format!("no variable {}", name)))?;
    let raw = dataset
        .read(var)
        .map_err(|e| CoordSysError::read(name, e))?;
    raw.to_f64_vec(var.is_unsigned())
        .ok_or_else(|| CoordSysError::augment("synthesis", format!("{} is not numeric", name)))
}

/// String values of a character or string variable, one per row.
pub(crate) fn read_strings(dataset: &Dataset, name: &str) -> CoordSysResult<Vec<String>> {
    let var = dataset
        .find_variable(name)
        .ok_or_else(|| CoordSysError::augment("synthesis", format!("no variable {}", name)))?;
    let raw = dataset
        .read(var)
        .map_err(|e| CoordSysError::read(name, e))?;
    let strlen = match var.data_type {
        DataType::Char => dataset.shape(var).last().copied().unwrap_or(1),
        _ => 0,
    };
    raw.to_strings(strlen)
        .ok_or_else(|| CoordSysError::augment("synthesis", format!("{} is not text", name)))
}

/// An empty scalar variable used as a coordinate system or transform
/// declaration.
pub(crate) fn declaration(name: &str) -> Variable {
    Variable::new(name, DataType::Char, vec![])
}
