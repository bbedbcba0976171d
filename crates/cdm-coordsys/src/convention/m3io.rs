//! Models-3 I/O API gridded files with vertical grid information.
//!
//! The grid lives entirely in global attributes: `GDTYP` and `P_ALP`,
//! `P_BET`, `P_GAM` select the projection; `XORIG`/`XCELL` and
//! `YORIG`/`YCELL` lay out the columns and rows; `VGTYP`, `VGTOP` and
//! `VGLVLS` describe the layers; `SDATE`, `STIME` and `TSTEP` the time steps.

use chrono::NaiveDate;
use cdm_common::units::is_length_unit;
use cdm_common::{Attribute, DataType, Dataset, Variable};

use super::synth::{axis_variable, dim_len, global_f64, global_i64, ramp};
use super::{default_positive, Convention};
use crate::axis::{AxisType, Positive};
use crate::cancel::{self, CancelTask};
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;
use crate::transform::MapProjection;

/// File types: gridded, id-referenced and profile.
const FILE_TYPES: [i64; 3] = [1, 3, 8];
const MAX_LAYERS: i64 = 100;
const MAX_VARIABLES: i64 = 120;

/// Horizontal grid types.
const LAT_LON_GRID: i64 = 1;
const LAMBERT_GRID: i64 = 2;
const MERCATOR_GRID: i64 = 3;
const STEREOGRAPHIC_GRID: i64 = 4;
const UTM_GRID: i64 = 5;

/// Vertical grid types.
const SIGMA_P_HYDROSTATIC: i64 = 1;
const SIGMA_P_NONHYDROSTATIC: i64 = 2;
const SIGMA_Z: i64 = 3;
const PRESSURE: i64 = 4;
const HEIGHT_ABOVE_SEA_LEVEL: i64 = 5;
const HEIGHT_ABOVE_GROUND: i64 = 6;

/// Missing value of Models-3 real data.
pub const BAD_VALUE: f64 = -9.999e36;
const SURFACE_PRESSURE_MB: f64 = 1012.5;
const DIMENSIONS: [&str; 6] = ["TSTEP", "DATE-TIME", "LAY", "VAR", "ROW", "COL"];

#[derive(Debug, Clone, Copy, Default)]
pub struct M3ioConvention;

fn int_attribute(dataset: &Dataset, name: &str) -> Option<i64> {
    dataset
        .find_global_attribute(name)
        .filter(|a| a.data_type() == DataType::Int)
        .and_then(|a| a.numeric_value())
        .map(|v| v as i64)
}

fn int_in_range(dataset: &Dataset, name: &str, min: i64, max: i64) -> bool {
    int_attribute(dataset, name).is_some_and(|v| (min..=max).contains(&v))
}

fn real_in_range(dataset: &Dataset, name: &str, min: f64, max: f64) -> bool {
    dataset
        .find_global_attribute(name)
        .filter(|a| matches!(a.data_type(), DataType::Float | DataType::Double))
        .and_then(|a| a.numeric_value())
        .is_some_and(|v| v >= min && v <= max)
}

fn in_range(x: f64, min: f64, max: f64) -> bool {
    x >= min && x <= max
}

/// `(hh, mm, ss)` of an `HHMMSS` integer.
fn split_hhmmss(hhmmss: i64) -> (i64, i64, i64) {
    (hhmmss / 10000, hhmmss % 10000 / 100, hhmmss % 100)
}

fn is_hhmmss(dataset: &Dataset, name: &str) -> bool {
    int_attribute(dataset, name).is_some_and(|v| {
        let (hh, mm, ss) = split_hhmmss(v);
        (0..=235959).contains(&v) && (0..=23).contains(&hh) && mm < 60 && ss < 60
    })
}

fn is_yyyyddd(dataset: &Dataset, name: &str) -> bool {
    int_attribute(dataset, name)
        .is_some_and(|v| (1001..=9_999_366).contains(&v) && (1..=366).contains(&(v % 1000)))
}

/// The file's dimensions are a prefix of the Models-3 dimension order.
fn has_dimension_order(dataset: &Dataset) -> bool {
    let dims = dataset.dimensions();
    dims.len() <= DIMENSIONS.len()
        && dims.iter().zip(DIMENSIONS).all(|(d, name)| d.name == name)
}

fn is_valid_projection(dataset: &Dataset) -> bool {
    let att = |name| global_f64(dataset, name).unwrap_or(0.0);
    let (p_alp, p_bet, p_gam) = (att("P_ALP"), att("P_BET"), att("P_GAM"));
    let bet_max = if p_alp > 0.0 { 90.0 } else { 0.0 };

    match global_i64(dataset, "GDTYP").unwrap_or(0) {
        LAT_LON_GRID => {
            let (xorig, yorig) = (att("XORIG"), att("YORIG"));
            let (xcell, ycell) = (att("XCELL"), att("YCELL"));
            let ncols = att("NCOLS");
            let nrows = att("NROWS");
            in_range(xorig, -180.0, 180.0)
                && in_range(yorig, -90.0, 90.0)
                && in_range(xcell, 0.0, 360.0)
                && in_range(ycell, 0.0, 180.0)
                && in_range(xorig + ncols * xcell, -180.0, 540.0)
                && in_range(yorig + nrows * ycell, -90.0, 90.0)
        }
        LAMBERT_GRID => {
            in_range(p_alp, -90.0, 90.0)
                && in_range(p_bet, p_alp, bet_max)
                && in_range(p_gam, -180.0, 180.0)
                && in_range(att("XCENT"), -180.0, 180.0)
                && in_range(att("YCENT"), -90.0, 90.0)
        }
        MERCATOR_GRID | STEREOGRAPHIC_GRID => {
            in_range(p_alp, -90.0, 90.0)
                && in_range(p_bet, p_alp, bet_max)
                && in_range(p_gam, -180.0, 180.0)
        }
        UTM_GRID => in_range(p_alp, 1.0, 60.0),
        _ => false,
    }
}

/// Levels run from `first` towards `last` without reversing.
fn ordered_from_to(a: &[f64], first: f64, last: f64) -> bool {
    let (Some(&head), Some(&tail)) = (a.first(), a.last()) else {
        return false;
    };
    if first <= last {
        head >= first && tail <= last && a.windows(2).all(|w| in_range(w[1], w[0], last))
    } else {
        head >= last && tail <= first && a.windows(2).all(|w| in_range(w[1], last, w[0]))
    }
}

/// Strictly increasing levels inside the open interval `(low, high)`.
fn ordered_within(a: &[f64], low: f64, high: f64) -> bool {
    a.first().is_some_and(|&h| h > low)
        && a.iter().all(|&v| v < high)
        && a.windows(2).all(|w| w[1] > w[0])
}

fn is_valid_vertical_grid(vgtyp: i64, vgtop: f64, levels: &[f64]) -> bool {
    match vgtyp {
        SIGMA_P_HYDROSTATIC | SIGMA_P_NONHYDROSTATIC | SIGMA_Z => {
            ordered_from_to(levels, 1.0, 0.0)
        }
        PRESSURE => levels.windows(2).all(|w| in_range(w[1], vgtop, w[0])),
        HEIGHT_ABOVE_SEA_LEVEL => ordered_within(levels, -200.0, 100_000.0),
        HEIGHT_ABOVE_GROUND => ordered_within(levels, 0.0, 100_000.0),
        _ => false,
    }
}

/// Full structural check of a Models-3 gridded header.
pub fn is_valid_m3io(dataset: &Dataset) -> bool {
    let header = has_dimension_order(dataset)
        && int_attribute(dataset, "FTYPE").is_some_and(|t| FILE_TYPES.contains(&t))
        && is_yyyyddd(dataset, "CDATE")
        && is_hhmmss(dataset, "CTIME")
        && is_yyyyddd(dataset, "SDATE")
        && is_hhmmss(dataset, "STIME")
        && is_hhmmss(dataset, "TSTEP")
        && int_in_range(dataset, "NTHIK", 1, i32::MAX as i64)
        && int_in_range(dataset, "NCOLS", 1, i32::MAX as i64)
        && int_in_range(dataset, "NROWS", 1, i32::MAX as i64)
        && int_in_range(dataset, "NLAYS", 1, MAX_LAYERS)
        && int_in_range(dataset, "NVARS", 1, MAX_VARIABLES)
        && dataset
            .find_dimension("TSTEP")
            .is_some_and(|d| dim_len(dataset, d) >= 1);
    if !header {
        return false;
    }

    let nrows = int_attribute(dataset, "NROWS").unwrap_or(1);
    let ncols = int_attribute(dataset, "NCOLS").unwrap_or(1);
    let nthik = int_attribute(dataset, "NTHIK").unwrap_or(1);
    if nthik > nrows.min(ncols) || ncols > i32::MAX as i64 / MAX_LAYERS / nrows {
        return false;
    }

    let horizontal = int_attribute(dataset, "GDTYP")
        .is_some_and(|g| (LAT_LON_GRID..=UTM_GRID).contains(&g))
        && real_in_range(dataset, "P_ALP", -90.0, 90.0)
        && real_in_range(dataset, "P_BET", -90.0, 90.0)
        && real_in_range(dataset, "P_GAM", -180.0, 180.0)
        && real_in_range(dataset, "XCENT", -180.0, 180.0)
        && real_in_range(dataset, "YCENT", -90.0, 90.0)
        && real_in_range(dataset, "XORIG", -f32::MAX as f64, f32::MAX as f64)
        && real_in_range(dataset, "YORIG", -f32::MAX as f64, f32::MAX as f64)
        && real_in_range(dataset, "XCELL", f32::MIN_POSITIVE as f64, f32::MAX as f64)
        && real_in_range(dataset, "YCELL", f32::MIN_POSITIVE as f64, f32::MAX as f64)
        && is_valid_projection(dataset);
    if !horizontal {
        return false;
    }

    let vgtyp = int_attribute(dataset, "VGTYP").unwrap_or(0);
    let vertical = (SIGMA_P_HYDROSTATIC..=HEIGHT_ABOVE_GROUND).contains(&vgtyp)
        && real_in_range(dataset, "VGTOP", 0.0, f32::MAX as f64)
        && dataset.find_global_attribute("VGLVLS").is_some_and(|a| {
            let levels = a.numeric_values();
            let nlays = int_attribute(dataset, "NLAYS").unwrap_or(0) as usize;
            let vgtop = global_f64(dataset, "VGTOP").unwrap_or(0.0);
            levels.len() == nlays + 1 && is_valid_vertical_grid(vgtyp, vgtop, &levels)
        });

    vertical
        && dataset.find_global_attribute("FILEDESC").is_some()
        && dataset.find_global_attribute("HISTORY").is_some()
}

fn height_at_pressure(pressure_mb: f64) -> f64 {
    -7200.0 * (pressure_mb / SURFACE_PRESSURE_MB).ln()
}

/// Layer-midpoint heights in metres.
fn layer_heights(vgtyp: i64, vgtop: f64, levels: &[f64]) -> Vec<f64> {
    levels
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let mid = (w[0] + w[1]) * 0.5;
            match vgtyp {
                SIGMA_P_HYDROSTATIC | SIGMA_P_NONHYDROSTATIC => {
                    let top = vgtop * 0.01;
                    height_at_pressure(top + mid * (SURFACE_PRESSURE_MB - top))
                }
                SIGMA_Z => mid * vgtop,
                PRESSURE => height_at_pressure(mid * 0.01),
                HEIGHT_ABOVE_SEA_LEVEL | HEIGHT_ABOVE_GROUND => mid,
                _ => i as f64,
            }
        })
        .collect()
}

/// `"seconds since <SDATE STIME> UTC"`.
fn time_units(dataset: &Dataset) -> Option<String> {
    let yyyyddd = global_i64(dataset, "SDATE")?;
    let (hh, mm, ss) = split_hhmmss(global_i64(dataset, "STIME")?);
    let date = NaiveDate::from_yo_opt((yyyyddd / 1000) as i32, (yyyyddd % 1000) as u32)?;
    let start = date.and_hms_opt(hh as u32, mm as u32, ss as u32)?;
    Some(format!(
        "seconds since {} UTC",
        start.format("%Y-%m-%d %H:%M:%S")
    ))
}

impl M3ioConvention {
    fn projection(dataset: &Dataset) -> Option<(MapProjection, &'static str)> {
        let att = |name| global_f64(dataset, name).unwrap_or(0.0);
        let (p_alp, p_bet) = (att("P_ALP"), att("P_BET"));
        match global_i64(dataset, "GDTYP")? {
            LAMBERT_GRID => Some((
                MapProjection::LambertConformal {
                    lat0: att("YCENT"),
                    lon0: att("P_GAM"),
                    par1: p_alp,
                    par2: p_bet,
                },
                "LambertConformal",
            )),
            MERCATOR_GRID => Some((
                MapProjection::TransverseMercator {
                    lat0: p_alp,
                    lon0: p_bet,
                    scale: 1.0,
                },
                "TransverseMercator",
            )),
            STEREOGRAPHIC_GRID => Some((
                MapProjection::Stereographic {
                    lat0: p_alp,
                    lon0: p_bet,
                    scale: 1.0,
                },
                "Stereographic",
            )),
            _ => None,
        }
    }

    fn horizontal_axes(dataset: &mut Dataset) {
        let lat_lon = global_i64(dataset, "GDTYP") == Some(LAT_LON_GRID);
        // projected grids are laid out in metres and served in km
        let scale = if lat_lon { 1.0 } else { 0.001 };

        for (axis, dim, axis_type, origin, cell, units) in [
            ("x", "COL", AxisType::GeoX, "XORIG", "XCELL", "degrees east"),
            ("y", "ROW", AxisType::GeoY, "YORIG", "YCELL", "degrees north"),
        ] {
            let Some(dim) = dataset.find_dimension(dim) else {
                continue;
            };
            let start = global_f64(dataset, origin).unwrap_or(0.0) * scale;
            let step = global_f64(dataset, cell).unwrap_or(0.0) * scale;
            let v = axis_variable(
                dataset,
                axis,
                dim,
                ramp(start, step, dim_len(dataset, dim)),
                if lat_lon { units } else { "km" },
                axis_type,
                &format!(
                    "synthesized {} coordinate from {}, {} global attributes",
                    axis, origin, cell
                ),
            );
            dataset.add_variable(v);
        }
    }

    fn vertical_axis(dataset: &mut Dataset) {
        let Some(lay) = dataset.find_dimension("LAY") else {
            return;
        };
        let vgtyp = global_i64(dataset, "VGTYP").unwrap_or(0);
        let vgtop = global_f64(dataset, "VGTOP").unwrap_or(0.0);
        let levels = dataset
            .find_global_attribute("VGLVLS")
            .map(|a| a.numeric_values())
            .unwrap_or_default();

        let mut km: Vec<f64> = layer_heights(vgtyp, vgtop, &levels)
            .into_iter()
            .map(|m| m * 0.001)
            .collect();
        km.resize(dim_len(dataset, lay), f64::NAN);
        let v = axis_variable(
            dataset,
            "z",
            lay,
            km,
            "km",
            AxisType::Height,
            "synthesized z coordinate from VGTYP, VGTOP, VGLVLS global attributes",
        );
        dataset.add_variable(v);
    }

    fn time_axis(dataset: &mut Dataset, diag: &mut Diagnostics) {
        let Some(tstep) = dataset.find_dimension("TSTEP") else {
            return;
        };
        let Some(units) = time_units(dataset) else {
            diag.advise(Pass::Convention, "M3IO: cannot read SDATE/STIME");
            return;
        };
        let (hh, mm, ss) = split_hhmmss(global_i64(dataset, "TSTEP").unwrap_or(0));
        let step = (hh * 3600 + mm * 60 + ss) as i32;
        let values: Vec<i32> = (0..dim_len(dataset, tstep) as i32)
            .map(|i| i * step)
            .collect();

        let v = axis_variable(
            dataset,
            "time",
            tstep,
            values,
            &units,
            AxisType::Time,
            "synthesized time coordinate from SDATE, STIME, STEP global attributes",
        );
        dataset.add_variable(v);
    }

    /// Real-valued data without a declared fill gets the Models-3 bad value.
    fn mark_missing(dataset: &mut Dataset) {
        let names: Vec<String> = dataset
            .variables()
            .iter()
            .filter(|v| matches!(v.data_type, DataType::Float | DataType::Double))
            .filter(|v| v.rank() > 0 && v.find_attribute(attrs::AXIS_TYPE).is_none())
            .filter(|v| {
                v.find_attribute("_FillValue").is_none()
                    && v.find_attribute("missing_value").is_none()
            })
            .map(|v| v.name.clone())
            .collect();

        for name in names {
            if let Some(v) = dataset.find_variable_mut(&name) {
                let missing = if v.data_type == DataType::Float {
                    Attribute::new("missing_value", BAD_VALUE as f32)
                } else {
                    Attribute::new("missing_value", BAD_VALUE)
                };
                v.set_attribute(missing);
            }
        }
    }
}

impl Convention for M3ioConvention {
    fn name(&self) -> &str {
        "M3IOVGGrid"
    }

    fn is_mine(&self, dataset: &Dataset) -> bool {
        dataset.find_global_attribute("VGLVLS").is_some() && is_valid_m3io(dataset)
    }

    fn augment(
        &self,
        dataset: &mut Dataset,
        cancel: &dyn CancelTask,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        if dataset.find_variable("x").is_some() {
            return Ok(());
        }

        if let Some((projection, name)) = Self::projection(dataset) {
            dataset.add_variable(
                projection
                    .declaration(name)
                    .with_attribute(attrs::AXIS_TYPES, "GeoX GeoY"),
            );
        }
        cancel::check(cancel)?;

        Self::horizontal_axes(dataset);
        Self::vertical_axis(dataset);
        Self::time_axis(dataset, diag);
        Self::mark_missing(dataset);
        diag.trace(Pass::Convention, "M3IO axes synthesized from global attributes");
        Ok(())
    }

    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        let t = match var.name.to_ascii_lowercase().as_str() {
            "x" => AxisType::GeoX,
            "lon" => AxisType::Lon,
            "y" => AxisType::GeoY,
            "lat" => AxisType::Lat,
            "time" => AxisType::Time,
            "z" => AxisType::Height,
            _ => return None,
        };
        Some(t)
    }

    fn positive(&self, var: &Variable, axis_type: AxisType) -> Option<Positive> {
        if axis_type.is_vertical() && var.units().is_some_and(is_length_unit) {
            return Some(Positive::Up);
        }
        default_positive(var, axis_type)
    }
}
