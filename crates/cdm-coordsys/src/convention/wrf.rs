//! WRF model output.
//!
//! WRF files carry no coordinate variables. The horizontal grid is
//! described by `MAP_PROJ`, `DX`/`DY` and the grid centre, so augmentation
//! synthesizes projected `x`/`y` axes (and their staggered twins) centred on
//! `CEN_LAT`/`CEN_LON`, eta `z` axes from `ZNU`/`ZNW`, a time axis parsed
//! from the `Times` strings and a soil depth axis from `ZS`.

use chrono::{NaiveDateTime, TimeZone, Utc};
use cdm_common::units::{is_length_unit, is_pressure_unit};
use cdm_common::{Attribute, DataType, Dataset, DimId, Variable};
use tracing::debug;

use super::synth::{
    axis_variable, declaration, dim_len, global_f64, global_i64, global_str, ramp, read_f64,
    read_strings,
};
use super::Convention;
use crate::axis::{AxisType, Positive};
use crate::cancel::{self, CancelTask};
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;
use crate::transform::vertical::FORMULA_TERMS;
use crate::transform::MapProjection;

const TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// `MAP_PROJ` of a grid given as per-point latitude and longitude.
const LAT_LON_GRID: i64 = 203;

#[derive(Debug, Clone, Copy, Default)]
pub struct WrfConvention;

/// WRF's non-standard unit spellings.
fn normalize_units(units: &str) -> String {
    match units {
        "fraction" | "dimensionless" | "NA" | "-" => String::new(),
        _ => units.replace("**", "^").replace(['{', '}'], ""),
    }
}

fn parse_time(s: &str) -> Option<f64> {
    NaiveDateTime::parse_from_str(s.trim(), TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp() as f64)
}

/// The projection named by `MAP_PROJ`, or `None` for an unknown code.
fn projection(dataset: &Dataset, map_proj: i64) -> Option<(MapProjection, &'static str)> {
    let att = |name| global_f64(dataset, name).unwrap_or(f64::NAN);
    let lat1 = att("TRUELAT1");
    let lat2 = att("TRUELAT2");
    let central_lon = att("CEN_LON");
    let stand_lon = att("STAND_LON");
    let stand_lat = att("MOAD_CEN_LAT");

    let p = match map_proj {
        // diagnostic runs without georeferencing
        0 => (MapProjection::FlatEarth { lat0: 0.0, lon0: 0.0 }, "flat_earth"),
        1 => (
            MapProjection::LambertConformal {
                lat0: stand_lat,
                lon0: stand_lon,
                par1: lat1,
                par2: lat2,
            },
            "Lambert",
        ),
        2 => (
            MapProjection::Stereographic {
                lat0: lat2,
                lon0: if stand_lon.is_nan() { central_lon } else { stand_lon },
                scale: (1.0 + lat1.to_radians().sin().abs()) / 2.0,
            },
            "Stereographic",
        ),
        3 => (
            MapProjection::Mercator {
                lon0: stand_lon,
                par: stand_lat,
            },
            "Mercator",
        ),
        _ => return None,
    };
    Some(p)
}

impl WrfConvention {
    fn normalize_all_units(dataset: &mut Dataset) {
        let changes: Vec<(String, String)> = dataset
            .variables()
            .iter()
            .filter_map(|v| {
                let units = v.units()?;
                let normalized = normalize_units(units);
                (normalized != units).then(|| (v.name.clone(), normalized))
            })
            .collect();

        for (name, units) in changes {
            if let Some(v) = dataset.find_variable_mut(&name) {
                v.set_attribute(Attribute::new("units", units));
            }
        }
    }

    /// GLAT/GLON in radians become 2-D latitude/longitude axes in degrees.
    fn lat_lon_grid(dataset: &mut Dataset, diag: &mut Diagnostics) -> CoordSysResult<()> {
        let sn = dataset.find_dimension("south_north");
        let we = dataset.find_dimension("west_east");

        for (name, axis_type, units) in [
            ("GLAT", AxisType::Lat, "degrees_north"),
            ("GLON", AxisType::Lon, "degrees_east"),
        ] {
            if dataset.find_variable(name).is_none() {
                diag.advise(
                    Pass::Convention,
                    format!("Projection type 203 - expected {} variable not found", name),
                );
                continue;
            }
            let degrees: Vec<f64> = read_f64(dataset, name)?
                .into_iter()
                .map(f64::to_degrees)
                .collect();
            let grid_dims = match (sn, we) {
                (Some(sn), Some(we))
                    if dim_len(dataset, sn) * dim_len(dataset, we) == degrees.len() =>
                {
                    Some(vec![sn, we])
                }
                _ => None,
            };

            if let Some(v) = dataset.find_variable_mut(name) {
                if let Some(dims) = grid_dims {
                    v.dims = dims;
                }
                v.data_type = DataType::Double;
                v.values = Some(degrees.into());
                v.set_attribute(Attribute::new(attrs::AXIS_TYPE, axis_type.as_str()));
                v.set_attribute(Attribute::new("units", units));
            }
        }

        dataset.add_variable(
            declaration("LatLonCoordSys").with_attribute(attrs::AXES, "GLAT GLON Time"),
        );
        if let Some(v) = dataset.find_variable_mut("LANDMASK") {
            v.set_attribute(Attribute::new(attrs::SYSTEMS, "LatLonCoordSys"));
        }
        Ok(())
    }

    fn projected_grid(
        dataset: &mut Dataset,
        map_proj: i64,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        let proj = projection(dataset, map_proj);
        if proj.is_none() {
            diag.advise(
                Pass::Convention,
                format!("ERROR: unknown projection type = {}", map_proj),
            );
        }

        let (center_x, center_y) = match proj {
            Some((p, _)) => {
                let lat = global_f64(dataset, "CEN_LAT").unwrap_or(f64::NAN);
                let lon = global_f64(dataset, "CEN_LON").unwrap_or(f64::NAN);
                p.forward(lat, lon)
            }
            None => (0.0, 0.0),
        };
        debug!(center_x, center_y, "WRF grid centre");

        let dx = global_f64(dataset, "DX").unwrap_or(f64::NAN) / 1000.0;
        let dy = global_f64(dataset, "DY").unwrap_or(f64::NAN) / 1000.0;
        for (axis, dim, center, step, axis_type, source) in [
            ("x", "west_east", center_x, dx, AxisType::GeoX, "DX"),
            ("x_stag", "west_east_stag", center_x, dx, AxisType::GeoX, "DX"),
            ("y", "south_north", center_y, dy, AxisType::GeoY, "DY"),
            ("y_stag", "south_north_stag", center_y, dy, AxisType::GeoY, "DY"),
        ] {
            let Some(dim) = dataset.find_dimension(dim) else {
                continue;
            };
            let n = dim_len(dataset, dim);
            let start = center - step * (n as f64 - 1.0) / 2.0;
            let v = axis_variable(
                dataset,
                axis,
                dim,
                ramp(start, step, n),
                "km",
                axis_type,
                &format!("synthesized {} coordinate from {} attribute", axis_type, source),
            );
            dataset.add_variable(v);
        }

        for (axis, dim, source) in [
            ("z", "bottom_top", "ZNU"),
            ("z_stag", "bottom_top_stag", "ZNW"),
        ] {
            if let Some(dim) = dataset.find_dimension(dim) {
                let v = Self::eta_axis(dataset, axis, dim, source)?;
                dataset.add_variable(v);
            }
        }

        if let Some((p, name)) = proj {
            dataset.add_variable(
                p.declaration(name)
                    .with_attribute(attrs::AXIS_TYPES, "GeoX GeoY"),
            );
        }
        Ok(())
    }

    /// Eta levels from the first time of `source`, or an index axis when
    /// `source` is absent or does not fit the dimension.
    fn eta_axis(
        dataset: &Dataset,
        axis: &str,
        dim: DimId,
        source: &str,
    ) -> CoordSysResult<Variable> {
        let n = dim_len(dataset, dim);
        if let Some(var) = dataset.find_variable(source) {
            let levels = dataset.shape(var).last().copied().unwrap_or(0);
            if levels == n {
                let mut values = read_f64(dataset, source)?;
                values.truncate(n);
                return Ok(axis_variable(
                    dataset,
                    axis,
                    dim,
                    values,
                    "",
                    AxisType::GeoZ,
                    &format!("eta values from variable {}", source),
                ));
            }
        }
        let index: Vec<i16> = (0..n).map(|i| i as i16).collect();
        Ok(axis_variable(
            dataset,
            axis,
            dim,
            index,
            "",
            AxisType::GeoZ,
            "synthesized coordinate: only an index",
        ))
    }

    fn time_axis(dataset: &mut Dataset, diag: &mut Diagnostics) -> CoordSysResult<()> {
        if dataset.find_variable("Time").is_some() || dataset.find_variable("Times").is_none() {
            return Ok(());
        }
        let Some(dim) = dataset
            .find_dimension("Time")
            .or_else(|| dataset.find_dimension("Times"))
        else {
            return Ok(());
        };
        let nt = dim_len(dataset, dim);

        let mut values = Vec::with_capacity(nt);
        for s in read_strings(dataset, "Times")? {
            match parse_time(&s) {
                Some(t) => values.push(t),
                None => {
                    diag.advise(
                        Pass::Convention,
                        format!("ERROR: cant parse Time string = <{}>", s),
                    );
                    let start = global_str(dataset, "START_DATE").and_then(parse_time);
                    values.push(match start {
                        Some(t) if nt == 1 => t,
                        _ => f64::NAN,
                    });
                }
            }
        }
        values.resize(nt, f64::NAN);

        let v = axis_variable(
            dataset,
            "Time",
            dim,
            values,
            "secs since 1970-01-01 00:00:00",
            AxisType::Time,
            "synthesized time coordinate from Times(time)",
        );
        dataset.add_variable(v);
        Ok(())
    }

    fn soil_depth_axis(dataset: &mut Dataset) -> CoordSysResult<()> {
        let Some(zs) = dataset.find_variable("ZS") else {
            return Ok(());
        };
        let Some(&soil) = zs
            .dims
            .iter()
            .rev()
            .find(|&&d| dataset.dimension_name(d).starts_with("soil_layers"))
        else {
            return Ok(());
        };
        let soil_name = dataset.dimension_name(soil).to_string();

        if zs.rank() == 1 {
            if let Some(zs) = dataset.find_variable_mut("ZS") {
                zs.set_attribute(Attribute::new(attrs::AXIS_TYPE, AxisType::GeoZ.as_str()));
                zs.set_attribute(Attribute::new(attrs::ALIAS_FOR_DIMENSION, soil_name));
            }
            return Ok(());
        }

        let units = zs.units().unwrap_or("").to_string();
        let n = dim_len(dataset, soil);
        let mut depths = read_f64(dataset, "ZS")?;
        depths.truncate(n);
        let v = axis_variable(
            dataset,
            "soilDepth",
            soil,
            depths,
            &units,
            AxisType::GeoZ,
            "soil depth",
        );
        dataset.add_variable(v);
        Ok(())
    }

    /// Eta pressure transforms for the unstaggered and staggered levels.
    fn eta_transforms(dataset: &mut Dataset) {
        let terms = ["PH", "PHB", "P", "PB"];
        if !terms.iter().all(|t| dataset.find_variable(t).is_some()) {
            return;
        }
        for (name, axis) in [("WRF_Eta", "z"), ("WRF_Eta_stag", "z_stag")] {
            if dataset.find_variable(axis).is_none() {
                continue;
            }
            dataset.add_variable(
                declaration(name)
                    .with_attribute(attrs::TRANSFORM_TYPE, "Vertical")
                    .with_attribute("transform_name", "wrf_eta")
                    .with_attribute(attrs::AXES, axis)
                    .with_attribute(
                        FORMULA_TERMS,
                        "perturbation_geopotential: PH base_geopotential: PHB \
                         perturbation_pressure: P base_pressure: PB",
                    ),
            );
        }
    }
}

impl Convention for WrfConvention {
    fn name(&self) -> &str {
        "WRF"
    }

    fn is_mine(&self, dataset: &Dataset) -> bool {
        dataset.find_global_attribute("MAP_PROJ").is_some()
            && dataset.find_dimension("south_north").is_some()
    }

    fn augment(
        &self,
        dataset: &mut Dataset,
        cancel: &dyn CancelTask,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        // already augmented, e.g. an aggregation of enhanced files
        if dataset.find_variable("x").is_some() {
            return Ok(());
        }

        Self::normalize_all_units(dataset);
        cancel::check(cancel)?;

        let map_proj = global_i64(dataset, "MAP_PROJ").unwrap_or(-1);
        if map_proj == LAT_LON_GRID {
            Self::lat_lon_grid(dataset, diag)?;
        } else {
            Self::projected_grid(dataset, map_proj, diag)?;
        }
        cancel::check(cancel)?;

        Self::time_axis(dataset, diag)?;
        Self::soil_depth_axis(dataset)?;
        Self::eta_transforms(dataset);
        diag.trace(Pass::Convention, format!("WRF grid MAP_PROJ = {}", map_proj));
        Ok(())
    }

    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        let name = var.name.to_ascii_lowercase();
        let t = match name.as_str() {
            "x" | "x_stag" => AxisType::GeoX,
            "lon" => AxisType::Lon,
            "y" | "y_stag" => AxisType::GeoY,
            "lat" => AxisType::Lat,
            "z" | "z_stag" => AxisType::GeoZ,
            "time" | "times" => AxisType::Time,
            _ => {
                let units = var.units()?;
                if is_pressure_unit(units) {
                    AxisType::Pressure
                } else if is_length_unit(units) {
                    AxisType::Height
                } else {
                    return None;
                }
            }
        };
        Some(t)
    }

    /// Eta decreases upward.
    fn positive(&self, _var: &Variable, axis_type: AxisType) -> Option<Positive> {
        axis_type.is_vertical().then_some(Positive::Down)
    }
}
