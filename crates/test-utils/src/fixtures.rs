//! Common in-memory datasets for coordinate system tests.
//!
//! Each fixture carries its coordinate values in memory, so no reader is
//! needed to build it.

use cdm_common::{AttrValues, Attribute, DataType, Dataset, Dimension, RawArray, Variable};

use crate::generators::{create_index_data, regular_midpoints};

/// Common unit strings.
pub mod units {
    pub const DAYS_SINCE_2000: &str = "days since 2000-01-01";
    pub const HOURS_SINCE_2024: &str = "hours since 2024-01-15 12:00:00";
    pub const DEGREES_NORTH: &str = "degrees_north";
    pub const DEGREES_EAST: &str = "degrees_east";
    pub const KELVIN: &str = "K";
}

/// Build attribute values of the given storage type from a number.
///
/// Integral types truncate; `String` produces the decimal text.
pub fn attr_of_type(dt: DataType, value: f64) -> AttrValues {
    match dt {
        DataType::Byte => AttrValues::Byte(vec![value as i8]),
        DataType::UByte => AttrValues::UByte(vec![value as u8]),
        DataType::Short => AttrValues::Short(vec![value as i16]),
        DataType::UShort => AttrValues::UShort(vec![value as u16]),
        DataType::Int => AttrValues::Int(vec![value as i32]),
        DataType::UInt => AttrValues::UInt(vec![value as u32]),
        DataType::Long => AttrValues::Long(vec![value as i64]),
        DataType::ULong => AttrValues::ULong(vec![value as u64]),
        DataType::Float => AttrValues::Float(vec![value as f32]),
        DataType::Double => AttrValues::Double(vec![value]),
        DataType::Char | DataType::String => AttrValues::String(value.to_string()),
    }
}

/// CF-1.0 dataset with `time(time)`, `lat(lat)`, `lon(lon)` and
/// `temp(time, lat, lon)`.
///
/// `lat` and `lon` carry no units, so no axis type can be inferred for them.
pub fn cf_time_lat_lon() -> Dataset {
    let mut ds = Dataset::new("memory://cf_time_lat_lon");
    ds.set_global_attribute(Attribute::new("Conventions", "CF-1.0"));

    let time = ds.add_dimension(Dimension::unlimited("time", 3));
    let lat = ds.add_dimension(Dimension::new("lat", 4));
    let lon = ds.add_dimension(Dimension::new("lon", 5));

    ds.add_variable(
        Variable::new("time", DataType::Double, vec![time])
            .with_attribute("units", units::DAYS_SINCE_2000)
            .with_values(vec![0.0, 1.0, 2.0]),
    );
    ds.add_variable(
        Variable::new("lat", DataType::Float, vec![lat])
            .with_values(vec![-30.0f32, -10.0, 10.0, 30.0]),
    );
    ds.add_variable(
        Variable::new("lon", DataType::Float, vec![lon])
            .with_values(vec![5.0f32, 15.0, 25.0, 35.0, 45.0]),
    );
    ds.add_variable(
        Variable::new("temp", DataType::Float, vec![time, lat, lon])
            .with_attribute("units", units::KELVIN)
            .with_values(create_index_data(3 * 4 * 5)),
    );
    ds
}

/// Same as [`cf_time_lat_lon`] with latitude/longitude units on the axes.
pub fn cf_time_lat_lon_with_units() -> Dataset {
    let mut ds = cf_time_lat_lon();
    if let Some(lat) = ds.find_variable_mut("lat") {
        lat.set_attribute(Attribute::new("units", units::DEGREES_NORTH));
    }
    if let Some(lon) = ds.find_variable_mut("lon") {
        lon.set_attribute(Attribute::new("units", units::DEGREES_EAST));
    }
    ds
}

/// `_Coordinates` dataset with an explicit coordinate system variable and a
/// Lambert conformal projection transform.
///
/// Variables: `time(time)`, `y(y)`, `x(x)` typed via `_CoordinateAxisType`;
/// `ProjectionSystem` (axes `time y x`, transform `LambertProjection`);
/// `LambertProjection`; `temperature(time, y, x)` pointing at
/// `ProjectionSystem`; `reflectivity(y, x)` listing its axes directly.
pub fn coordinates_projection() -> Dataset {
    let mut ds = Dataset::new("memory://coordinates_projection");
    ds.set_global_attribute(Attribute::new("Conventions", "_Coordinates"));

    let time = ds.add_dimension(Dimension::new("time", 2));
    let y = ds.add_dimension(Dimension::new("y", 3));
    let x = ds.add_dimension(Dimension::new("x", 4));

    ds.add_variable(
        Variable::new("time", DataType::Int, vec![time])
            .with_attribute("units", units::HOURS_SINCE_2024)
            .with_attribute("_CoordinateAxisType", "Time")
            .with_values(vec![0i32, 6]),
    );
    ds.add_variable(
        Variable::new("y", DataType::Float, vec![y])
            .with_attribute("units", "km")
            .with_attribute("_CoordinateAxisType", "GeoY")
            .with_values(vec![-3.0f32, 0.0, 3.0]),
    );
    ds.add_variable(
        Variable::new("x", DataType::Float, vec![x])
            .with_attribute("units", "km")
            .with_attribute("_CoordinateAxisType", "GeoX")
            .with_values(vec![-4.5f32, -1.5, 1.5, 4.5]),
    );
    ds.add_variable(
        Variable::new("ProjectionSystem", DataType::Char, vec![])
            .with_attribute("_CoordinateAxes", "time y x")
            .with_attribute("_CoordinateTransforms", "LambertProjection"),
    );
    ds.add_variable(
        Variable::new("LambertProjection", DataType::Char, vec![])
            .with_attribute("_CoordinateTransformType", "Projection")
            .with_attribute("transform_name", "lambert_conformal_conic")
            .with_attribute("standard_parallel", vec![25.0f64, 25.0])
            .with_attribute("longitude_of_central_meridian", -95.0f64)
            .with_attribute("latitude_of_projection_origin", 25.0f64),
    );
    ds.add_variable(
        Variable::new("temperature", DataType::Float, vec![time, y, x])
            .with_attribute("_CoordinateSystems", "ProjectionSystem")
            .with_values(create_index_data(2 * 3 * 4)),
    );
    ds.add_variable(
        Variable::new("reflectivity", DataType::Short, vec![y, x])
            .with_attribute("_CoordinateAxes", "y x")
            .with_attribute("scale_factor", 0.5f32)
            .with_attribute("_FillValue", -32768i16),
    );
    ds
}

/// Legacy file without a `Conventions` attribute.
///
/// `time(time)` is a coordinate variable; 2-D `lat(y, x)` and `lon(y, x)`
/// are only referenced by `temperature`'s `coordinates` attribute, while
/// `humidity(time, y, x)` carries no coordinate metadata at all.
pub fn legacy_2d_latlon() -> Dataset {
    let mut ds = Dataset::new("memory://legacy_2d_latlon");
    ds.set_global_attribute(Attribute::new("title", "legacy model output"));

    let time = ds.add_dimension(Dimension::unlimited("time", 2));
    let y = ds.add_dimension(Dimension::new("y", 2));
    let x = ds.add_dimension(Dimension::new("x", 3));

    ds.add_variable(
        Variable::new("time", DataType::Double, vec![time])
            .with_attribute("units", units::HOURS_SINCE_2024)
            .with_values(vec![0.0, 1.0]),
    );
    ds.add_variable(
        Variable::new("lat", DataType::Float, vec![y, x])
            .with_attribute("units", units::DEGREES_NORTH)
            .with_values(vec![40.0f32, 40.0, 40.0, 41.0, 41.0, 41.0]),
    );
    ds.add_variable(
        Variable::new("lon", DataType::Float, vec![y, x])
            .with_attribute("units", units::DEGREES_EAST)
            .with_values(vec![-100.0f32, -99.0, -98.0, -100.0, -99.0, -98.0]),
    );
    ds.add_variable(
        Variable::new("temperature", DataType::Float, vec![time, y, x])
            .with_attribute("coordinates", "lat lon")
            .with_values(create_index_data(2 * 2 * 3)),
    );
    ds.add_variable(
        Variable::new("humidity", DataType::Float, vec![time, y, x])
            .with_values(create_index_data(2 * 2 * 3)),
    );
    ds
}

/// CF dataset with a hybrid sigma-pressure vertical coordinate and a
/// Lambert conformal `grid_mapping`.
pub fn cf_hybrid_lambert() -> Dataset {
    let mut ds = Dataset::new("memory://cf_hybrid_lambert");
    ds.set_global_attribute(Attribute::new("Conventions", "CF-1.6"));

    let time = ds.add_dimension(Dimension::new("time", 1));
    let lev = ds.add_dimension(Dimension::new("lev", 3));
    let y = ds.add_dimension(Dimension::new("y", 2));
    let x = ds.add_dimension(Dimension::new("x", 2));

    ds.add_variable(
        Variable::new("time", DataType::Double, vec![time])
            .with_attribute("units", units::DAYS_SINCE_2000)
            .with_values(vec![10.0]),
    );
    ds.add_variable(
        Variable::new("lev", DataType::Double, vec![lev])
            .with_attribute("standard_name", "atmosphere_hybrid_sigma_pressure_coordinate")
            .with_attribute("positive", "down")
            .with_attribute("formula_terms", "a: hyam b: hybm ps: PS p0: P0")
            .with_values(regular_midpoints(0.9, -0.3, 3)),
    );
    for coef in ["hyam", "hybm"] {
        ds.add_variable(
            Variable::new(coef, DataType::Double, vec![lev]).with_values(vec![0.1, 0.2, 0.3]),
        );
    }
    ds.add_variable(Variable::new("P0", DataType::Double, vec![]).with_values(vec![100_000.0]));
    ds.add_variable(
        Variable::new("PS", DataType::Float, vec![time, y, x])
            .with_attribute("units", "Pa")
            .with_values(vec![101_325.0f32; 4]),
    );
    ds.add_variable(
        Variable::new("y", DataType::Double, vec![y])
            .with_attribute("standard_name", "projection_y_coordinate")
            .with_attribute("units", "km")
            .with_values(vec![0.0, 3.0]),
    );
    ds.add_variable(
        Variable::new("x", DataType::Double, vec![x])
            .with_attribute("standard_name", "projection_x_coordinate")
            .with_attribute("units", "km")
            .with_values(vec![0.0, 3.0]),
    );
    ds.add_variable(
        Variable::new("Lambert_Conformal", DataType::Int, vec![])
            .with_attribute("grid_mapping_name", "lambert_conformal_conic")
            .with_attribute("standard_parallel", 25.0f64)
            .with_attribute("longitude_of_central_meridian", 265.0f64)
            .with_attribute("latitude_of_projection_origin", 25.0f64),
    );
    ds.add_variable(
        Variable::new("T", DataType::Float, vec![time, lev, y, x])
            .with_attribute("grid_mapping", "Lambert_Conformal")
            .with_attribute("units", units::KELVIN)
            .with_values(create_index_data(12)),
    );
    ds
}

/// Fixed-width character rows, NUL padded to `width`.
fn char_rows(rows: &[&str], width: usize) -> RawArray {
    let mut bytes = Vec::with_capacity(rows.len() * width);
    for row in rows {
        let mut b = row.as_bytes().to_vec();
        b.resize(width, 0);
        bytes.extend(b);
    }
    RawArray::Char(bytes)
}

/// WRF ARW output on a Lambert conformal grid.
///
/// No coordinate variables: the grid is described by `MAP_PROJ`, `DX`,
/// `DY` and the centre attributes. Carries `Times`, eta levels `ZNU`/`ZNW`,
/// a 2-D soil depth `ZS` and the geopotential/pressure fields of the eta
/// vertical transform.
pub fn wrf_lambert() -> Dataset {
    let mut ds = Dataset::new("memory://wrfout_d01");
    for (name, value) in [
        ("DX", 12000.0f32),
        ("DY", 12000.0),
        ("TRUELAT1", 30.0),
        ("TRUELAT2", 60.0),
        ("CEN_LAT", 40.0),
        ("CEN_LON", -100.0),
        ("STAND_LON", -100.0),
        ("MOAD_CEN_LAT", 40.0),
    ] {
        ds.set_global_attribute(Attribute::new(name, value));
    }
    ds.set_global_attribute(Attribute::new("TITLE", " OUTPUT FROM WRF V3.4 MODEL"));
    ds.set_global_attribute(Attribute::new("MAP_PROJ", 1i32));
    ds.set_global_attribute(Attribute::new("DYN_OPT", 2i32));
    ds.set_global_attribute(Attribute::new("GRIDTYPE", "C"));
    ds.set_global_attribute(Attribute::new("START_DATE", "2024-01-15_12:00:00"));

    let time = ds.add_dimension(Dimension::unlimited("Time", 2));
    let strlen = ds.add_dimension(Dimension::new("DateStrLen", 19));
    let we = ds.add_dimension(Dimension::new("west_east", 4));
    let sn = ds.add_dimension(Dimension::new("south_north", 3));
    let bt = ds.add_dimension(Dimension::new("bottom_top", 2));
    let bt_stag = ds.add_dimension(Dimension::new("bottom_top_stag", 3));
    let we_stag = ds.add_dimension(Dimension::new("west_east_stag", 5));
    let soil = ds.add_dimension(Dimension::new("soil_layers_stag", 2));

    ds.add_variable(
        Variable::new("Times", DataType::Char, vec![time, strlen])
            .with_values(char_rows(&["2024-01-15_12:00:00", "2024-01-15_13:00:00"], 19)),
    );
    ds.add_variable(
        Variable::new("ZNU", DataType::Float, vec![time, bt])
            .with_attribute("units", "")
            .with_values(vec![0.9f32, 0.7, 0.9, 0.7]),
    );
    ds.add_variable(
        Variable::new("ZNW", DataType::Float, vec![time, bt_stag])
            .with_attribute("units", "")
            .with_values(vec![1.0f32, 0.8, 0.6, 1.0, 0.8, 0.6]),
    );
    ds.add_variable(
        Variable::new("ZS", DataType::Float, vec![time, soil])
            .with_attribute("units", "m")
            .with_values(vec![0.05f32, 0.25, 0.05, 0.25]),
    );
    ds.add_variable(
        Variable::new("T", DataType::Float, vec![time, bt, sn, we])
            .with_attribute("units", units::KELVIN)
            .with_values(create_index_data(2 * 2 * 3 * 4)),
    );
    ds.add_variable(
        Variable::new("U", DataType::Float, vec![time, bt, sn, we_stag])
            .with_attribute("units", "m s-1"),
    );
    ds.add_variable(
        Variable::new("QVAPOR", DataType::Float, vec![time, bt, sn, we])
            .with_attribute("units", "kg kg-1"),
    );
    ds.add_variable(
        Variable::new("SEAICE", DataType::Float, vec![time, sn, we])
            .with_attribute("units", "fraction"),
    );
    for name in ["PH", "PHB"] {
        ds.add_variable(
            Variable::new(name, DataType::Float, vec![time, bt_stag, sn, we])
                .with_attribute("units", "m2 s-2"),
        );
    }
    for name in ["P", "PB"] {
        ds.add_variable(
            Variable::new(name, DataType::Float, vec![time, bt, sn, we])
                .with_attribute("units", "Pa"),
        );
    }
    ds
}

/// NUWG model output on a Lambert conformal grid.
///
/// Grid navigation lives in scalar variables along the `nav` dimension;
/// there are no `x`/`y` variables. The global `record` attribute lists the
/// two time variables of the record dimension.
pub fn nuwg_lambert() -> Dataset {
    let mut ds = Dataset::new("memory://nuwg_eta");
    ds.set_global_attribute(Attribute::new("Conventions", "NUWG"));
    ds.set_global_attribute(Attribute::new("record", "reftime, valtime"));

    let record = ds.add_dimension(Dimension::unlimited("record", 2));
    let level = ds.add_dimension(Dimension::new("level", 2));
    let y = ds.add_dimension(Dimension::new("y", 2));
    let x = ds.add_dimension(Dimension::new("x", 3));
    let nav = ds.add_dimension(Dimension::new("nav", 1));
    let nav_len = ds.add_dimension(Dimension::new("nav_len", 10));

    ds.add_variable(
        Variable::new("grid_type_code", DataType::Int, vec![nav]).with_values(vec![3i32]),
    );
    for (name, value) in [("x_dim", "x"), ("y_dim", "y")] {
        ds.add_variable(
            Variable::new(name, DataType::Char, vec![nav, nav_len])
                .with_values(char_rows(&[value], 10)),
        );
    }
    ds.add_variable(Variable::new("Nx", DataType::Int, vec![nav]).with_values(vec![3i32]));
    ds.add_variable(Variable::new("Ny", DataType::Int, vec![nav]).with_values(vec![2i32]));
    for (name, value) in [
        ("La1", 20.0f32),
        ("Lo1", -120.0),
        ("Lov", -95.0),
        ("Latin1", 25.0),
        ("Latin2", 25.0),
        ("Dx", 40635.0),
        ("Dy", 40635.0),
    ] {
        ds.add_variable(Variable::new(name, DataType::Float, vec![nav]).with_values(vec![value]));
    }

    ds.add_variable(
        Variable::new("reftime", DataType::Double, vec![record])
            .with_attribute("units", "hours since 1992-01-01 00:00:00")
            .with_values(vec![0.0, 0.0]),
    );
    ds.add_variable(
        Variable::new("valtime", DataType::Double, vec![record])
            .with_attribute("units", "(hours since 1992-01-01 00:00:00)")
            .with_values(vec![0.0, 6.0]),
    );
    ds.add_variable(
        Variable::new("level", DataType::Float, vec![level])
            .with_attribute("units", "hPa")
            .with_values(vec![850.0f32, 500.0]),
    );
    ds.add_variable(
        Variable::new("T", DataType::Float, vec![record, level, y, x])
            .with_attribute("units", units::KELVIN)
            .with_values(create_index_data(2 * 2 * 2 * 3)),
    );
    ds
}

/// Models-3 I/O API gridded file on a Lambert conformal grid with
/// non-hydrostatic sigma-pressure layers.
pub fn m3io_lambert() -> Dataset {
    let mut ds = Dataset::new("memory://CCTM_ACONC");

    let tstep = ds.add_dimension(Dimension::unlimited("TSTEP", 2));
    let date_time = ds.add_dimension(Dimension::new("DATE-TIME", 2));
    let lay = ds.add_dimension(Dimension::new("LAY", 2));
    let var = ds.add_dimension(Dimension::new("VAR", 1));
    let row = ds.add_dimension(Dimension::new("ROW", 3));
    let col = ds.add_dimension(Dimension::new("COL", 4));

    for (name, value) in [
        ("FTYPE", 1i32),
        ("CDATE", 2024016),
        ("CTIME", 93000),
        ("SDATE", 2024015),
        ("STIME", 120000),
        ("TSTEP", 10000),
        ("NTHIK", 1),
        ("NCOLS", 4),
        ("NROWS", 3),
        ("NLAYS", 2),
        ("NVARS", 1),
        ("GDTYP", 2),
        ("VGTYP", 2),
    ] {
        ds.set_global_attribute(Attribute::new(name, value));
    }
    for (name, value) in [
        ("P_ALP", 30.0f64),
        ("P_BET", 60.0),
        ("P_GAM", -100.0),
        ("XCENT", -100.0),
        ("YCENT", 40.0),
        ("XORIG", -24000.0),
        ("YORIG", -18000.0),
        ("XCELL", 12000.0),
        ("YCELL", 12000.0),
    ] {
        ds.set_global_attribute(Attribute::new(name, value));
    }
    ds.set_global_attribute(Attribute::new("VGTOP", 10000.0f32));
    ds.set_global_attribute(Attribute::new("VGLVLS", vec![1.0f32, 0.9, 0.8]));
    ds.set_global_attribute(Attribute::new("GDNAM", "US12_4X3       "));
    ds.set_global_attribute(Attribute::new("VAR-LIST", "O3              "));
    ds.set_global_attribute(Attribute::new("FILEDESC", "hourly average concentrations"));
    ds.set_global_attribute(Attribute::new("HISTORY", ""));

    ds.add_variable(
        Variable::new("TFLAG", DataType::Int, vec![tstep, var, date_time])
            .with_attribute("units", "<YYYYDDD,HHMMSS>"),
    );
    ds.add_variable(
        Variable::new("O3", DataType::Float, vec![tstep, lay, row, col])
            .with_attribute("units", "ppmV")
            .with_values(create_index_data(2 * 2 * 3 * 4)),
    );
    ds
}

/// COSMIC radio occultation profile without a time variable.
///
/// Time runs from `start_time` to `stop_time` along the `MSL_alt`
/// dimension; `Lat`/`Lon` carry no usable units.
pub fn cosmic_profile() -> Dataset {
    let mut ds = Dataset::new("memory://atmPrf_C001");
    ds.set_global_attribute(Attribute::new("center", "UCAR/CDAAC"));
    ds.set_global_attribute(Attribute::new("start_time", 946_728_000.0f64));
    ds.set_global_attribute(Attribute::new("stop_time", 946_728_080.0f64));
    ds.set_global_attribute(Attribute::new("irs", 1i32));

    let alt = ds.add_dimension(Dimension::new("MSL_alt", 4));
    ds.add_variable(
        Variable::new("MSL_alt", DataType::Float, vec![alt])
            .with_attribute("units", "km")
            .with_values(vec![0.1f32, 0.2, 0.3, 0.4]),
    );
    ds.add_variable(
        Variable::new("Lat", DataType::Float, vec![alt])
            .with_attribute("units", "deg")
            .with_values(vec![10.0f32, 10.1, 10.2, 10.3]),
    );
    ds.add_variable(
        Variable::new("Lon", DataType::Float, vec![alt])
            .with_attribute("units", "deg")
            .with_values(vec![50.0f32, 50.1, 50.2, 50.3]),
    );
    ds.add_variable(
        Variable::new("Temp", DataType::Float, vec![alt])
            .with_attribute("units", "C")
            .with_values(vec![25.0f32, 24.0, 23.0, 22.0]),
    );
    ds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_of_type() {
        assert_eq!(attr_of_type(DataType::Short, 3.0).data_type(), DataType::Short);
        assert_eq!(attr_of_type(DataType::Double, 0.5).numeric(0), Some(0.5));
        assert_eq!(attr_of_type(DataType::String, 1.0).data_type(), DataType::String);
    }

    #[test]
    fn test_fixture_shapes_match_values() {
        for ds in [
            cf_time_lat_lon(),
            coordinates_projection(),
            legacy_2d_latlon(),
            cf_hybrid_lambert(),
            wrf_lambert(),
            nuwg_lambert(),
            m3io_lambert(),
            cosmic_profile(),
        ] {
            for var in ds.variables() {
                if let Some(values) = &var.values {
                    assert_eq!(values.len(), ds.size(var), "{}", var.name);
                }
            }
        }
    }
}
