//! Forward map projections for placing synthesized grid axes.
//!
//! Conventions that describe a grid by its projection parameters and a
//! known geographic point need projected coordinates to lay out x/y axes.
//! Coordinates are kilometres on a sphere of radius [`EARTH_RADIUS_KM`],
//! without false easting or northing.

use std::f64::consts::{FRAC_PI_4, PI};

use cdm_common::{DataType, Variable};

use crate::classify::attrs;

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.229;

/// Projection parameters, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapProjection {
    /// Local tangent plane at the origin.
    FlatEarth { lat0: f64, lon0: f64 },
    LambertConformal {
        lat0: f64,
        lon0: f64,
        par1: f64,
        par2: f64,
    },
    /// Oblique stereographic tangent at `(lat0, lon0)`.
    Stereographic { lat0: f64, lon0: f64, scale: f64 },
    /// Mercator true at latitude `par`.
    Mercator { lon0: f64, par: f64 },
    TransverseMercator { lat0: f64, lon0: f64, scale: f64 },
}

/// Normalize a longitude difference to [-π, π].
fn wrap(mut dlon: f64) -> f64 {
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    dlon
}

impl MapProjection {
    /// Name of the transform builder that reads this projection back.
    pub fn grid_mapping_name(&self) -> &'static str {
        match self {
            MapProjection::FlatEarth { .. } => "flat_earth",
            MapProjection::LambertConformal { .. } => "lambert_conformal_conic",
            MapProjection::Stereographic { .. } => "stereographic",
            MapProjection::Mercator { .. } => "mercator",
            MapProjection::TransverseMercator { .. } => "transverse_mercator",
        }
    }

    /// Project a geographic point to `(x, y)` in km.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let lam = lon_deg.to_radians();
        let r = EARTH_RADIUS_KM;

        match *self {
            MapProjection::FlatEarth { lat0, lon0 } => {
                let phi0 = lat0.to_radians();
                let dlam = wrap(lam - lon0.to_radians());
                (r * phi0.cos() * dlam, r * (phi - phi0))
            }
            MapProjection::LambertConformal {
                lat0,
                lon0,
                par1,
                par2,
            } => {
                let phi0 = lat0.to_radians();
                let p1 = par1.to_radians();
                let p2 = par2.to_radians();

                // tangent cone when the standard parallels coincide
                let n = if (p1 - p2).abs() < 1e-10 {
                    p1.sin()
                } else {
                    let ln_ratio = (p1.cos() / p2.cos()).ln();
                    let tan_ratio =
                        ((FRAC_PI_4 + p2 / 2.0).tan() / (FRAC_PI_4 + p1 / 2.0).tan()).ln();
                    ln_ratio / tan_ratio
                };
                let f = p1.cos() * (FRAC_PI_4 + p1 / 2.0).tan().powf(n) / n;
                let rho = |lat: f64| r * f / (FRAC_PI_4 + lat / 2.0).tan().powf(n);

                let theta = n * wrap(lam - lon0.to_radians());
                let rho_p = rho(phi);
                (rho_p * theta.sin(), rho(phi0) - rho_p * theta.cos())
            }
            MapProjection::Stereographic { lat0, lon0, scale } => {
                let phi0 = lat0.to_radians();
                let dlam = wrap(lam - lon0.to_radians());
                let k = 2.0 * scale
                    / (1.0 + phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dlam.cos());
                (
                    r * k * phi.cos() * dlam.sin(),
                    r * k * (phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dlam.cos()),
                )
            }
            MapProjection::Mercator { lon0, par } => {
                let a = r * par.to_radians().cos();
                let dlam = wrap(lam - lon0.to_radians());
                (a * dlam, a * (FRAC_PI_4 + phi / 2.0).tan().ln())
            }
            MapProjection::TransverseMercator { lat0, lon0, scale } => {
                let dlam = wrap(lam - lon0.to_radians());
                let b = phi.cos() * dlam.sin();
                (
                    0.5 * scale * r * ((1.0 + b) / (1.0 - b)).ln(),
                    scale * r * (phi.tan().atan2(dlam.cos()) - lat0.to_radians()),
                )
            }
        }
    }

    /// A projection transform declaration variable carrying this
    /// projection's parameters.
    ///
    /// The caller decides which systems it applies to.
    pub fn declaration(&self, name: &str) -> Variable {
        let v = Variable::new(name, DataType::Char, vec![])
            .with_attribute(attrs::TRANSFORM_TYPE, "Projection")
            .with_attribute("grid_mapping_name", self.grid_mapping_name())
            .with_attribute("earth_radius", EARTH_RADIUS_KM * 1000.0);

        match *self {
            MapProjection::FlatEarth { lat0, lon0 } => v
                .with_attribute("latitude_of_projection_origin", lat0)
                .with_attribute("longitude_of_projection_origin", lon0),
            MapProjection::LambertConformal {
                lat0,
                lon0,
                par1,
                par2,
            } => v
                .with_attribute("standard_parallel", vec![par1, par2])
                .with_attribute("longitude_of_central_meridian", lon0)
                .with_attribute("latitude_of_projection_origin", lat0),
            MapProjection::Stereographic { lat0, lon0, scale } => v
                .with_attribute("longitude_of_projection_origin", lon0)
                .with_attribute("latitude_of_projection_origin", lat0)
                .with_attribute("scale_factor_at_projection_origin", scale),
            MapProjection::Mercator { lon0, par } => v
                .with_attribute("longitude_of_projection_origin", lon0)
                .with_attribute("standard_parallel", par),
            MapProjection::TransverseMercator { lat0, lon0, scale } => v
                .with_attribute("scale_factor_at_central_meridian", scale)
                .with_attribute("longitude_of_central_meridian", lon0)
                .with_attribute("latitude_of_projection_origin", lat0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::transform::CoordTransBuilderRegistry;
    use cdm_common::Dataset;

    fn close(a: (f64, f64), b: (f64, f64), tol: f64) -> bool {
        (a.0 - b.0).abs() < tol && (a.1 - b.1).abs() < tol
    }

    fn all() -> Vec<MapProjection> {
        vec![
            MapProjection::FlatEarth { lat0: 40.0, lon0: -100.0 },
            MapProjection::LambertConformal {
                lat0: 40.0,
                lon0: -100.0,
                par1: 30.0,
                par2: 60.0,
            },
            MapProjection::Stereographic {
                lat0: 40.0,
                lon0: -100.0,
                scale: 1.0,
            },
            MapProjection::TransverseMercator {
                lat0: 40.0,
                lon0: -100.0,
                scale: 1.0,
            },
        ]
    }

    #[test]
    fn test_origin_maps_to_zero() {
        for p in all() {
            assert!(close(p.forward(40.0, -100.0), (0.0, 0.0), 1e-6), "{p:?}");
        }
        let merc = MapProjection::Mercator { lon0: -100.0, par: 0.0 };
        assert!(close(merc.forward(0.0, -100.0), (0.0, 0.0), 1e-9));
    }

    #[test]
    fn test_east_and_north_increase() {
        for p in all() {
            let (x0, y0) = p.forward(40.0, -100.0);
            let (xe, _) = p.forward(40.0, -99.0);
            let (_, yn) = p.forward(41.0, -100.0);
            assert!(xe > x0, "{p:?}");
            assert!(yn > y0, "{p:?}");
        }
    }

    #[test]
    fn test_mercator_scale_at_true_latitude() {
        let merc = MapProjection::Mercator { lon0: 0.0, par: 60.0 };
        let (x, _) = merc.forward(0.0, 1.0);
        let expected = EARTH_RADIUS_KM * 0.5 * 1f64.to_radians();
        assert!((x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_polar_stereographic_pole_is_origin() {
        let ps = MapProjection::Stereographic {
            lat0: 90.0,
            lon0: -105.0,
            scale: 0.933,
        };
        assert!(close(ps.forward(90.0, 0.0), (0.0, 0.0), 1e-6));
        // along the central meridian points south of the pole have y < 0
        let (x, y) = ps.forward(60.0, -105.0);
        assert!(x.abs() < 1e-6);
        assert!(y < 0.0);
    }

    #[test]
    fn test_declarations_build_with_registry() {
        let registry = CoordTransBuilderRegistry::with_builtins();
        let ds = Dataset::new("memory://forward");
        let mut projections = all();
        projections.push(MapProjection::Mercator { lon0: 0.0, par: 20.0 });

        for p in projections {
            let ctv = p.declaration("Projection");
            let mut diag = Diagnostics::new();
            let ct = registry.make_transform(&ds, &ctv, &mut diag);
            assert!(ct.is_some(), "{p:?}: {:?}", diag.entries());
            assert!(ct.unwrap().find_parameter("earth_radius").is_some());
        }
    }
}
