//! NUWG: ad hoc NetCDF conventions of the Unidata Weather Group.
//!
//! Grid navigation is stored as scalar variables along a `nav` dimension
//! rather than as coordinate variables. Augmentation reads that navigation,
//! synthesizes the missing x/y axes, resolves "referential" dimensions
//! (a global attribute named after a dimension listing its coordinate
//! variables) and declares the grid's projection.

use std::collections::BTreeMap;

use cdm_common::units::{is_date_unit, is_length_unit, is_pressure_unit, is_time_period_unit};
use cdm_common::{Attribute, DataType, Dataset, DimId, Variable};
use tracing::{debug, warn};

use super::synth::{axis_variable, dim_len, ramp, read_f64, read_strings};
use super::Convention;
use crate::axis::{AxisType, Positive};
use crate::cancel::{self, CancelTask};
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::CoordSysResult;
use crate::transform::MapProjection;

/// Global attribute marking a dataset this convention already augmented.
const ENHANCED: &str = "_enhanced";
const NAV_DIM: &str = "nav";
const RECORD_DIM: &str = "record";

/// Grid type codes.
const LAT_LON: i64 = 0;
const LAMBERT_CONFORMAL: i64 = 3;
const POLAR_STEREOGRAPHIC: i64 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct NuwgConvention;

#[derive(Debug, Clone, PartialEq)]
enum NavValue {
    Text(String),
    Number(f64),
}

/// Navigation values keyed by lowercased variable name.
#[derive(Debug, Default)]
struct NavInfo {
    values: BTreeMap<String, NavValue>,
}

impl NavInfo {
    fn read(dataset: &Dataset) -> CoordSysResult<Self> {
        let mut values = BTreeMap::new();
        let Some(nav) = dataset.find_dimension(NAV_DIM) else {
            return Ok(Self { values });
        };

        for var in dataset.variables().iter().filter(|v| v.dims.contains(&nav)) {
            let value = match var.data_type {
                DataType::Char | DataType::String => read_strings(dataset, &var.name)?
                    .into_iter()
                    .next()
                    .map(|s| NavValue::Text(s.trim().to_string())),
                _ => read_f64(dataset, &var.name)?
                    .first()
                    .map(|&v| NavValue::Number(v)),
            };
            if let Some(value) = value {
                values.insert(var.name.to_lowercase(), value);
            }
        }
        Ok(Self { values })
    }

    fn number(&self, name: &str) -> Result<f64, String> {
        match self.values.get(&name.to_lowercase()) {
            Some(NavValue::Number(v)) => Ok(*v),
            Some(NavValue::Text(_)) => Err(format!("nav {} is not numeric", name)),
            None => Err(format!("no nav {}", name)),
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(&name.to_lowercase()) {
            Some(NavValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn grid_code(&self) -> i64 {
        self.number("grid_type_code").map_or(LAMBERT_CONFORMAL, |v| v as i64)
    }

    /// Names of the x and y axes.
    fn axis_names(&self) -> (String, String) {
        let (x, y) = if self.grid_code() == LAT_LON {
            ("i_dim", "j_dim")
        } else {
            ("x_dim", "y_dim")
        };
        (
            self.text(x).unwrap_or_default().to_string(),
            self.text(y).unwrap_or_default().to_string(),
        )
    }
}

/// Regular grid layout derived from navigation.
#[derive(Debug, Clone, PartialEq)]
struct Grid {
    code: i64,
    nx: usize,
    ny: usize,
    start_x: f64,
    start_y: f64,
    dx: f64,
    dy: f64,
    projection: Option<MapProjection>,
}

impl Grid {
    fn from_nav(nav: &NavInfo) -> Result<Self, String> {
        let code = nav.grid_code();
        let count = |name| nav.number(name).map(|v| v.max(0.0) as usize);

        if code == LAT_LON {
            return Ok(Self {
                code,
                nx: count("Ni")?,
                ny: count("Nj")?,
                start_x: nav.number("Lo1")?,
                start_y: nav.number("La1")?,
                dx: nav.number("Di")?,
                dy: nav.number("Dj")?,
                projection: None,
            });
        }

        let lov = nav.number("Lov")?;
        let projection = match code {
            LAMBERT_CONFORMAL => {
                let latin1 = nav.number("Latin1")?;
                MapProjection::LambertConformal {
                    lat0: latin1,
                    lon0: lov,
                    par1: latin1,
                    par2: nav.number("Latin2")?,
                }
            }
            POLAR_STEREOGRAPHIC => MapProjection::Stereographic {
                lat0: 90.0,
                lon0: lov,
                scale: 0.933,
            },
            _ => return Err(format!("unknown grid_code= {}", code)),
        };
        let (start_x, start_y) = projection.forward(nav.number("La1")?, nav.number("Lo1")?);

        Ok(Self {
            code,
            nx: count("Nx")?,
            ny: count("Ny")?,
            start_x,
            start_y,
            dx: nav.number("Dx")? / 1000.0,
            dy: nav.number("Dy")? / 1000.0,
            projection: Some(projection),
        })
    }

    fn x_axis(&self, dataset: &Dataset, name: &str, dim: DimId) -> Variable {
        let (units, axis_type) = if self.code == LAT_LON {
            ("degrees_east", AxisType::Lon)
        } else {
            ("km", AxisType::GeoX)
        };
        let n = self.nx.min(dim_len(dataset, dim));
        let values = ramp(self.start_x, self.dx, n);
        axis_variable(dataset, name, dim, values, units, axis_type, "synthesized X coord")
    }

    fn y_axis(&self, dataset: &Dataset, name: &str, dim: DimId) -> Variable {
        let (units, axis_type) = if self.code == LAT_LON {
            ("degrees_north", AxisType::Lat)
        } else {
            ("km", AxisType::GeoY)
        };
        let n = self.ny.min(dim_len(dataset, dim));
        let values = ramp(self.start_y, self.dy, n);
        axis_variable(dataset, name, dim, values, units, axis_type, "synthesized Y coord")
    }
}

/// Values never change direction.
fn is_monotonic(values: &[f64]) -> bool {
    let mut steps = values.windows(2).map(|w| w[0] > w[1]);
    match steps.next() {
        Some(first) => steps.all(|s| s == first),
        None => true,
    }
}

/// Rank-1 variables over `dim` listed in the global attribute named after it.
fn aliased_variables(dataset: &Dataset, dim: DimId) -> Vec<String> {
    let dim_name = dataset.dimension_name(dim);
    let Some(alias) = dataset
        .find_global_attribute(dim_name)
        .and_then(|a| a.string_value())
    else {
        return Vec::new();
    };
    alias
        .split([' ', ','])
        .filter(|t| !t.is_empty())
        .filter(|t| {
            dataset
                .find_variable(t)
                .is_some_and(|v| v.dims.as_slice() == [dim])
        })
        .map(str::to_string)
        .collect()
}

impl NuwgConvention {
    fn synthesize_axes(
        dataset: &mut Dataset,
        nav: &NavInfo,
        grid: &Grid,
        diag: &mut Diagnostics,
    ) {
        let (x_name, y_name) = nav.axis_names();

        let regen_x = match dataset.find_variable(&x_name) {
            None => true,
            Some(_) if x_name.eq_ignore_ascii_case("lon") => {
                let ok = read_f64(dataset, &x_name).is_ok_and(|v| is_monotonic(&v));
                if !ok {
                    diag.advise(
                        Pass::Convention,
                        "ERROR lon axis is not monotonic, regen from nav",
                    );
                }
                !ok
            }
            Some(_) => false,
        };

        if regen_x {
            match dataset.find_dimension(&x_name) {
                Some(dim) => {
                    let v = grid.x_axis(dataset, &x_name, dim);
                    dataset.add_variable(v);
                    diag.trace(
                        Pass::Convention,
                        format!("Generated x axis from NUWG nav= {}", x_name),
                    );
                }
                None => diag.advise(
                    Pass::Convention,
                    format!("NUWG nav names x axis '{}' but there is no such dimension", x_name),
                ),
            }
        }

        if dataset.find_variable(&y_name).is_none() {
            match dataset.find_dimension(&y_name) {
                Some(dim) => {
                    let v = grid.y_axis(dataset, &y_name, dim);
                    dataset.add_variable(v);
                    diag.trace(
                        Pass::Convention,
                        format!("Generated y axis from NUWG nav= {}", y_name),
                    );
                }
                None => diag.advise(
                    Pass::Convention,
                    format!("NUWG nav names y axis '{}' but there is no such dimension", y_name),
                ),
            }
        }

        if let Some(projection) = grid.projection {
            dataset.add_variable(
                projection
                    .declaration("Projection")
                    .with_attribute(attrs::AXES, format!("{} {}", x_name, y_name)),
            );
        }
    }

    /// Dimensions without a coordinate variable whose global attribute names one.
    fn referential_axes(dataset: &mut Dataset, diag: &mut Diagnostics) {
        let dims: Vec<DimId> = (0..dataset.dimensions().len()).map(DimId).collect();

        for dim in dims {
            let dim_name = dataset.dimension_name(dim).to_string();
            if dataset.find_variable(&dim_name).is_some() {
                continue;
            }
            let candidates = aliased_variables(dataset, dim);
            let chosen = match candidates.as_slice() {
                [only] => only.clone(),
                [first, second] if dim_name == RECORD_DIM => {
                    if first.eq_ignore_ascii_case("valtime") {
                        first.clone()
                    } else {
                        second.clone()
                    }
                }
                // lower bound of a bounded pair
                [first, _] => first.clone(),
                _ => continue,
            };

            if let Some(v) = dataset.find_variable_mut(&chosen) {
                v.set_attribute(Attribute::new(attrs::ALIAS_FOR_DIMENSION, dim_name.as_str()));
                if candidates.len() == 2 && dim_name == RECORD_DIM {
                    if let Some(units) = v.units().map(|u| u.replace(['(', ')'], "")) {
                        v.set_attribute(Attribute::new("units", units));
                    }
                }
            }
            debug!(dimension = %dim_name, variable = %chosen, "referential coordinate axis");
            diag.trace(
                Pass::Convention,
                format!("Added referential coordAxis = {}({})", chosen, dim_name),
            );
        }
    }
}

impl Convention for NuwgConvention {
    fn name(&self) -> &str {
        "NUWG"
    }

    fn augment(
        &self,
        dataset: &mut Dataset,
        cancel: &dyn CancelTask,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        if dataset.find_global_attribute(ENHANCED).is_some() {
            return Ok(());
        }
        dataset.set_global_attribute(Attribute::new(ENHANCED, ""));

        let nav = NavInfo::read(dataset)?;
        cancel::check(cancel)?;

        match Grid::from_nav(&nav) {
            Ok(grid) => Self::synthesize_axes(dataset, &nav, &grid, diag),
            Err(e) => {
                warn!(error = %e, "NUWG navigation incomplete");
                diag.advise(Pass::Convention, format!("NUWG navigation: {}", e));
            }
        }
        cancel::check(cancel)?;

        Self::referential_axes(dataset, diag);
        Ok(())
    }

    fn axis_type(&self, dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        let name = var.name.as_str();
        if name.eq_ignore_ascii_case("lat") {
            return Some(AxisType::Lat);
        }
        if name.eq_ignore_ascii_case("lon") {
            return Some(AxisType::Lon);
        }

        let (x_name, y_name) = NavInfo::read(dataset)
            .map(|nav| nav.axis_names())
            .unwrap_or_default();
        if !x_name.is_empty() && name.eq_ignore_ascii_case(&x_name) {
            return Some(AxisType::GeoX);
        }
        if !y_name.is_empty() && name.eq_ignore_ascii_case(&y_name) {
            return Some(AxisType::GeoY);
        }

        if name.eq_ignore_ascii_case(RECORD_DIM)
            || var
                .dims
                .first()
                .is_some_and(|&d| dataset.dimension_name(d).eq_ignore_ascii_case(RECORD_DIM))
        {
            return Some(AxisType::Time);
        }

        if let Some(units) = var.units() {
            if is_pressure_unit(units) {
                return Some(AxisType::Pressure);
            }
            if is_length_unit(units) {
                return Some(AxisType::Height);
            }
            if is_time_period_unit(units) || is_date_unit(units) {
                return None;
            }
        }
        Some(AxisType::GeoZ)
    }

    /// Up for heights, down for everything else.
    fn positive(&self, var: &Variable, axis_type: AxisType) -> Option<Positive> {
        if !axis_type.is_vertical() {
            return None;
        }
        if var.units().is_some_and(is_length_unit) {
            Some(Positive::Up)
        } else {
            Some(Positive::Down)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use cdm_common::{Dimension, RawArray};
    use test_utils::nuwg_lambert;

    fn augmented() -> (Dataset, Diagnostics) {
        let mut ds = nuwg_lambert();
        let mut diag = Diagnostics::new();
        NuwgConvention.augment(&mut ds, &NeverCancel, &mut diag).unwrap();
        (ds, diag)
    }

    #[test]
    fn test_nav_info_from_nav_variables() {
        let nav = NavInfo::read(&nuwg_lambert()).unwrap();
        assert_eq!(nav.grid_code(), LAMBERT_CONFORMAL);
        assert_eq!(nav.axis_names(), ("x".to_string(), "y".to_string()));
        assert_eq!(nav.number("lov"), Ok(-95.0));
        assert!(nav.number("Di").is_err());
    }

    #[test]
    fn test_lambert_axes_start_at_first_point() {
        let (ds, diag) = augmented();
        assert!(diag.advisories().next().is_none());

        let lc = MapProjection::LambertConformal {
            lat0: 25.0,
            lon0: -95.0,
            par1: 25.0,
            par2: 25.0,
        };
        let (x0, y0) = lc.forward(20.0, -120.0);

        let x = ds.read_by_name("x").unwrap().to_f64_vec(false).unwrap();
        assert_eq!(x.len(), 3);
        assert!((x[0] - x0).abs() < 1e-9);
        assert!((x[1] - x[0] - 40.635).abs() < 1e-6);
        let y = ds.read_by_name("y").unwrap().to_f64_vec(false).unwrap();
        assert!((y[0] - y0).abs() < 1e-9);

        let x = ds.find_variable("x").unwrap();
        assert_eq!(x.attribute_string(attrs::AXIS_TYPE), Some("GeoX"));
        assert!(x.find_attribute(attrs::ALIAS_FOR_DIMENSION).is_none());

        let proj = ds.find_variable("Projection").unwrap();
        assert_eq!(proj.attribute_string(attrs::AXES), Some("x y"));
        assert_eq!(proj.attribute_string(attrs::TRANSFORM_TYPE), Some("Projection"));
    }

    #[test]
    fn test_record_dimension_prefers_valtime() {
        let (ds, _) = augmented();
        let valtime = ds.find_variable("valtime").unwrap();
        assert_eq!(valtime.attribute_string(attrs::ALIAS_FOR_DIMENSION), Some("record"));
        assert_eq!(valtime.units(), Some("hours since 1992-01-01 00:00:00"));
        assert!(ds
            .find_variable("reftime")
            .unwrap()
            .find_attribute(attrs::ALIAS_FOR_DIMENSION)
            .is_none());
    }

    #[test]
    fn test_augment_runs_once() {
        let (mut ds, _) = augmented();
        ds.find_variable_mut("x").unwrap().values = Some(vec![1.0, 2.0, 3.0].into());
        let mut diag = Diagnostics::new();
        NuwgConvention.augment(&mut ds, &NeverCancel, &mut diag).unwrap();
        assert_eq!(
            ds.read_by_name("x").unwrap().to_f64_vec(false),
            Some(vec![1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn test_missing_navigation_is_advisory() {
        let mut ds = Dataset::new("memory://nuwg");
        ds.add_dimension(Dimension::new("x", 2));
        let mut diag = Diagnostics::new();
        NuwgConvention.augment(&mut ds, &NeverCancel, &mut diag).unwrap();
        assert!(diag.has_advice("NUWG navigation: no nav Lov"));
        assert!(ds.find_variable("x").is_none());
    }

    #[test]
    fn test_lat_lon_grid_and_non_monotonic_lon() {
        let mut ds = Dataset::new("memory://nuwg");
        let lon = ds.add_dimension(Dimension::new("lon", 3));
        ds.add_dimension(Dimension::new("lat", 2));
        let nav = ds.add_dimension(Dimension::new("nav", 1));
        let nav_len = ds.add_dimension(Dimension::new("nav_len", 3));
        ds.add_variable(
            Variable::new("grid_type_code", DataType::Int, vec![nav]).with_values(vec![0i32]),
        );
        for (name, value) in [("i_dim", "lon"), ("j_dim", "lat")] {
            let mut bytes = value.as_bytes().to_vec();
            bytes.resize(3, 0);
            ds.add_variable(
                Variable::new(name, DataType::Char, vec![nav, nav_len])
                    .with_values(RawArray::Char(bytes)),
            );
        }
        for (name, value) in [
            ("Ni", 3.0f32),
            ("Nj", 2.0),
            ("La1", 10.0),
            ("Lo1", 100.0),
            ("Di", 2.5),
            ("Dj", 5.0),
        ] {
            ds.add_variable(Variable::new(name, DataType::Float, vec![nav]).with_values(vec![value]));
        }
        ds.add_variable(
            Variable::new("lon", DataType::Float, vec![lon]).with_values(vec![100.0f32, 90.0, 110.0]),
        );

        let mut diag = Diagnostics::new();
        NuwgConvention.augment(&mut ds, &NeverCancel, &mut diag).unwrap();

        assert!(diag.has_advice("lon axis is not monotonic"));
        let lon_values = ds.read_by_name("lon").unwrap().to_f64_vec(false).unwrap();
        assert_eq!(lon_values, vec![100.0, 102.5, 105.0]);
        assert_eq!(ds.find_variable("lon").unwrap().units(), Some("degrees_east"));
        let lat_values = ds.read_by_name("lat").unwrap().to_f64_vec(false).unwrap();
        assert_eq!(lat_values, vec![10.0, 15.0]);
        // a lat/lon grid has no projection
        assert!(ds.find_variable("Projection").is_none());
    }

    #[test]
    fn test_is_monotonic() {
        assert!(is_monotonic(&[1.0, 2.0, 3.0]));
        assert!(is_monotonic(&[3.0, 2.0, 1.0]));
        assert!(is_monotonic(&[1.0]));
        assert!(!is_monotonic(&[1.0, 3.0, 2.0]));
    }

    #[test]
    fn test_axis_type_heuristic() {
        let ds = nuwg_lambert();
        let t = ds.find_variable("T").unwrap();
        let named = |n: &str| Variable::new(n, DataType::Float, vec![]);

        assert_eq!(NuwgConvention.axis_type(&ds, &named("X")), Some(AxisType::GeoX));
        assert_eq!(NuwgConvention.axis_type(&ds, &named("y")), Some(AxisType::GeoY));
        assert_eq!(NuwgConvention.axis_type(&ds, t), Some(AxisType::Time));
        assert_eq!(
            NuwgConvention.axis_type(&ds, ds.find_variable("level").unwrap()),
            Some(AxisType::Pressure)
        );
        assert_eq!(
            NuwgConvention.axis_type(&ds, &named("dt").with_attribute("units", "hours")),
            None
        );
        assert_eq!(NuwgConvention.axis_type(&ds, &named("sigma")), Some(AxisType::GeoZ));
    }

    #[test]
    fn test_positive_by_units() {
        let h = Variable::new("h", DataType::Float, vec![]).with_attribute("units", "m");
        let p = Variable::new("p", DataType::Float, vec![]).with_attribute("units", "hPa");
        assert_eq!(NuwgConvention.positive(&h, AxisType::Height), Some(Positive::Up));
        assert_eq!(NuwgConvention.positive(&p, AxisType::Pressure), Some(Positive::Down));
        assert_eq!(NuwgConvention.positive(&h, AxisType::GeoX), None);
    }
}
