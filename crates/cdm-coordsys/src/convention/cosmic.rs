//! COSMIC radio occultation profiles from UCAR/CDAAC.
//!
//! Atmospheric profiles carry no time coordinate; one is laid out linearly
//! between `start_time` and `stop_time` along the altitude dimension. Files
//! with a `leoId` hold inertial LEO satellite positions instead, which are
//! rotated to earth-fixed coordinates and converted to latitude, longitude
//! and height.

use std::f64::consts::PI;

use cdm_common::{Attribute, DataType, Dataset, Variable};

use super::synth::{dim_len, global_f64, global_i64, global_str, read_f64};
use super::Convention;
use crate::axis::AxisType;
use crate::cancel::{self, CancelTask};
use crate::classify::attrs;
use crate::diagnostics::{Diagnostics, Pass};
use crate::error::{CoordSysError, CoordSysResult};

const CENTER: &str = "UCAR/CDAAC";
const TIME_UNITS: &str = "seconds since 1980-01-06 00:00:00";

/// WGS-84 semi-axes in km.
const SEMI_MAJOR_KM: f64 = 6378.1370;
const SEMI_MINOR_KM: f64 = 6356.7523142;

#[derive(Debug, Clone, Copy, Default)]
pub struct Cosmic1Convention;

/// Julian day at 00:00 UT of a calendar date.
pub fn julian_day(month: i64, day: i64, year: i64) -> f64 {
    let iy = (year - (12 - month) / 10) as f64;
    let im = (month + 1 + 12 * ((12 - month) / 10)) as f64;
    let i = iy / 100.0;
    let j = 2.0 - i + i / 4.0 + (365.25 * iy).round() + (30.6001 * im).round();
    j + day as f64 + 1_720_994.50
}

/// Greenwich hour angle in radians for an epoch plus `offset` seconds.
pub fn greenwich_hour_angle(
    (year, month, day): (i64, i64, i64),
    (hour, minute, second): (i64, i64, f64),
    offset: f64,
) -> f64 {
    let tu = (julian_day(month, day, year) - 2_451_545.0) / 36525.0;
    let mut gmst =
        24110.548410 + 8640184.8128660 * tu + 0.093104 * tu * tu - 6.2e-6 * tu.powi(3);
    let utc = (hour * 3600 + minute * 60) as f64 + second;

    gmst += (utc + offset) * 1.0027379093;
    gmst = gmst.rem_euclid(86400.0);
    gmst * 2.0 * PI / 86400.0
}

/// Rotate `v` by `angle` radians about the axis `axis`.
pub fn spin(v: [f64; 3], axis: [f64; 3], angle: f64) -> [f64; 3] {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    let [x, y, z] = axis.map(|c| c / norm);
    let (a1, a3) = (angle.cos(), angle.sin());
    let a2 = 1.0 - a1;

    let s = [
        [a2 * x * x + a1, a2 * x * y - a3 * z, a2 * x * z + a3 * y],
        [a2 * y * x + a3 * z, a2 * y * y + a1, a2 * y * z - a3 * x],
        [a2 * z * x - a3 * y, a2 * z * y + a3 * x, a2 * z * z + a1],
    ];
    s.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

/// Ellipsoidal `(lat°, lon°, height)` of cartesian `xyz`, with `a`, `b` and
/// `xyz` in the same length unit.
///
/// Returns `-999` in every component when the iteration does not converge.
pub fn cartesian_to_ellipsoidal(a: f64, b: f64, xyz: [f64; 3]) -> (f64, f64, f64) {
    let e2 = (a * a - b * b) / (a * a);
    let s = (xyz[0] * xyz[0] + xyz[1] * xyz[1]).sqrt();
    let lam = xyz[1].atan2(xyz[0]);
    let zps = xyz[2] / s;
    let mut h = (xyz[0] * xyz[0] + xyz[1] * xyz[1] + xyz[2] * xyz[2]).sqrt() - a;
    let mut phi = (zps / (1.0 - e2 * a / (a + h))).atan();

    for _ in 0..10 {
        let n = a / (1.0 - e2 * phi.sin() * phi.sin()).sqrt();
        let (hp, phip) = (h, phi);
        h = s / phi.cos() - n;
        phi = (zps / (1.0 - e2 * n / (n + h))).atan();
        if (phip - phi).abs() <= 1e-11 && (hp - h).abs() <= 1e-5 {
            return (phi.to_degrees(), lam.to_degrees(), h);
        }
    }
    (-999.0, -999.0, -999.0)
}

impl Cosmic1Convention {
    /// Linear time along `MSL_alt` between the profile's start and stop.
    fn profile_time(dataset: &mut Dataset, diag: &mut Diagnostics) -> CoordSysResult<()> {
        let mut start = global_f64(dataset, "start_time").unwrap_or(f64::NAN);
        let mut stop = global_f64(dataset, "stop_time").unwrap_or(f64::NAN);
        if start.is_nan() && stop.is_nan() {
            let top = global_f64(dataset, "toptime").unwrap_or(f64::NAN);
            let bottom = global_f64(dataset, "bottime").unwrap_or(f64::NAN);
            (start, stop) = if top > bottom { (bottom, top) } else { (top, bottom) };
            diag.trace(Pass::Convention, "Cosmic2 profile: time from toptime/bottime");
        }

        let Some(dim) = dataset.find_dimension("MSL_alt") else {
            diag.advise(Pass::Convention, "Cosmic profile has no MSL_alt dimension");
            return Ok(());
        };
        let altitudes = read_f64(dataset, "MSL_alt")?;
        let ascending = matches!(altitudes.as_slice(), [a0, a1, ..] if a1 - a0 > 0.0);
        let n = dim_len(dataset, dim);
        let incr = (stop - start) / n as f64;
        let direction = global_i64(dataset, "irs").unwrap_or(1);

        let values: Vec<f64> = (0..n)
            .map(|i| {
                if !ascending && direction == 1 {
                    start + i as f64 * incr
                } else {
                    stop - i as f64 * incr
                }
            })
            .collect();

        dataset.add_variable(
            Variable::new("time", DataType::Double, vec![dim])
                .with_attribute("units", TIME_UNITS)
                .with_attribute(attrs::AXIS_TYPE, AxisType::Time.as_str())
                .with_values(values),
        );
        Ok(())
    }

    fn tag_lat_lon(dataset: &mut Dataset, diag: &mut Diagnostics) {
        for (names, axis_type) in [
            (["Lat", "GEO_lat"], AxisType::Lat),
            (["Lon", "GEO_lon"], AxisType::Lon),
        ] {
            let found = names
                .iter()
                .find(|n| dataset.find_variable(n).is_some())
                .copied();
            match found.and_then(|n| dataset.find_variable_mut(n)) {
                Some(v) => v.set_attribute(Attribute::new(attrs::AXIS_TYPE, axis_type.as_str())),
                None => diag.advise(
                    Pass::Convention,
                    format!("Cosmic profile has no {} variable", names.join(" or ")),
                ),
            }
        }
    }

    /// LEO positions to latitude, longitude and height along `time`.
    fn occultation(dataset: &mut Dataset, diag: &mut Diagnostics) -> CoordSysResult<()> {
        let dim = dataset
            .find_dimension("time")
            .ok_or_else(|| CoordSysError::augment("Cosmic1", "no time dimension"))?;
        if dataset.find_variable("time").is_none() {
            return Err(CoordSysError::augment("Cosmic1", "no time variable"));
        }
        let n = dim_len(dataset, dim);
        let int = |name, default| global_i64(dataset, name).unwrap_or(default);
        let epoch = (int("year", 2009), int("month", 0), int("day", 0));
        let clock = (int("hour", 0), int("minute", 0), int("second", 0) as f64);
        let start = global_f64(dataset, "startTime").unwrap_or(f64::NAN);
        let stop = global_f64(dataset, "stopTime").unwrap_or(f64::NAN);
        let incr = (stop - start) / n as f64;
        let dtheta = greenwich_hour_angle(epoch, clock, 0.0);

        let x = read_f64(dataset, "xLeo")?;
        let y = read_f64(dataset, "yLeo")?;
        let z = read_f64(dataset, "zLeo")?;

        let mut lat = Vec::with_capacity(n);
        let mut lon = Vec::with_capacity(n);
        let mut alt = Vec::with_capacity(n);
        for ((&xi, &yi), &zi) in x.iter().zip(&y).zip(&z).take(n) {
            let ecf = spin([xi, yi, zi], [0.0, 0.0, 1.0], -dtheta);
            let (la, lo, h) = cartesian_to_ellipsoidal(SEMI_MAJOR_KM, SEMI_MINOR_KM, ecf);
            lat.push(la as f32);
            lon.push(lo as f32);
            alt.push(h as f32);
        }
        lat.resize(n, f32::NAN);
        lon.resize(n, f32::NAN);
        alt.resize(n, f32::NAN);

        for (name, units, axis_type, values) in [
            ("Lat", "degree", AxisType::Lat, lat),
            ("Lon", "degree", AxisType::Lon, lon),
            ("MSL_alt", "meter", AxisType::Height, alt),
        ] {
            dataset.add_variable(
                Variable::new(name, DataType::Float, vec![dim])
                    .with_attribute("units", units)
                    .with_attribute(attrs::AXIS_TYPE, axis_type.as_str())
                    .with_values(values),
            );
        }

        if let Some(time) = dataset.find_variable_mut("time") {
            time.attributes.remove("valid_range");
            time.set_attribute(Attribute::new("units", TIME_UNITS));
            time.set_attribute(Attribute::new(attrs::AXIS_TYPE, AxisType::Time.as_str()));
            time.data_type = DataType::Double;
            time.values = Some((0..n).map(|i| start + i as f64 * incr).collect::<Vec<_>>().into());
        }
        diag.trace(Pass::Convention, "Cosmic3 occultation: positions from LEO orbit");
        Ok(())
    }
}

impl Convention for Cosmic1Convention {
    fn name(&self) -> &str {
        "Cosmic1"
    }

    fn is_mine(&self, dataset: &Dataset) -> bool {
        (dataset.find_dimension("MSL_alt").is_some() || dataset.find_dimension("time").is_some())
            && global_str(dataset, "center") == Some(CENTER)
    }

    fn augment(
        &self,
        dataset: &mut Dataset,
        cancel: &dyn CancelTask,
        diag: &mut Diagnostics,
    ) -> CoordSysResult<()> {
        cancel::check(cancel)?;
        if dataset.find_global_attribute("leoId").is_some() {
            return Self::occultation(dataset, diag);
        }
        if dataset.find_variable("time").is_none() {
            Self::profile_time(dataset, diag)?;
        }
        Self::tag_lat_lon(dataset, diag);
        Ok(())
    }

    fn axis_type(&self, _dataset: &Dataset, var: &Variable) -> Option<AxisType> {
        match var.name.as_str() {
            "time" => Some(AxisType::Time),
            "Lat" | "GEO_lat" => Some(AxisType::Lat),
            "Lon" | "GEO_lon" => Some(AxisType::Lon),
            "MSL_alt" => Some(AxisType::Height),
            _ => None,
        }
    }
}
