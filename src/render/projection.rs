// src/render/projection.rs

//! Lambert Conformal Conic projection, forward direction only.
//!
//! Spherical earth, secant cone through two standard parallels (or tangent
//! when they coincide). Geographic degrees in, planar meters out; x grows
//! east of the central meridian, y grows north.

use std::f64::consts::PI;

use crate::config::ProjectionParams;

const EARTH_RADIUS_M: f64 = 6_371_229.0;

/// tan(π/4 + lat/2) blows up at the poles; clamp just short.
const MAX_LAT_DEG: f64 = 89.999;

#[derive(Debug, Clone)]
pub struct LambertConformal {
    lon0: f64,
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformal {
    pub fn new(params: &ProjectionParams) -> Self {
        let to_rad = PI / 180.0;
        let lon0 = params.central_longitude * to_rad;
        let lat0 = params.central_latitude * to_rad;
        let latin1 = params.standard_parallels[0] * to_rad;
        let latin2 = params.standard_parallels[1] * to_rad;

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };
        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = EARTH_RADIUS_M * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        Self { lon0, n, f, rho0 }
    }

    /// Project (lon, lat) degrees to planar meters.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg.clamp(-MAX_LAT_DEG, MAX_LAT_DEG) * to_rad;
        let lon = lon_deg * to_rad;

        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = EARTH_RADIUS_M * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }
}
