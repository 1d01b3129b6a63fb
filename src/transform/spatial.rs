//! State-plane to geographic reprojection
//!
//! Inverse Lambert Conformal Conic (two standard parallels) on the GRS 1980
//! ellipsoid. NAD83 and WGS84 are treated as coincident, which is the
//! null datum shift standard cartographic libraries apply for this pair.

use crate::record::{RawValue, WktPoint};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// US survey foot in meters
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

const MAX_ITERATIONS: usize = 15;
const CONVERGENCE: f64 = 1e-12;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters
    pub semi_major_axis: f64,
    /// Inverse flattening
    pub inverse_flattening: f64,
}

/// GRS 1980, the NAD83 ellipsoid
pub const GRS80: Ellipsoid = Ellipsoid {
    semi_major_axis: 6_378_137.0,
    inverse_flattening: 298.257_222_101,
};

/// Defining parameters of a two-parallel Lambert Conformal Conic projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LccParameters {
    pub ellipsoid: Ellipsoid,
    /// First standard parallel, degrees
    pub standard_parallel_1: f64,
    /// Second standard parallel, degrees
    pub standard_parallel_2: f64,
    /// Latitude of origin, degrees
    pub latitude_of_origin: f64,
    /// Central meridian, degrees
    pub central_meridian: f64,
    /// False easting in projection units
    pub false_easting: f64,
    /// False northing in projection units
    pub false_northing: f64,
    /// Meters per projection unit
    pub unit_to_meter: f64,
}

/// State-plane zones the pipeline knows how to reproject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatePlaneZone {
    /// NAD 1983 StatePlane Texas Central FIPS 4203, US feet (ESRI:102739)
    #[default]
    TexasCentralFeet,
}

impl StatePlaneZone {
    /// Authority code of the zone
    pub fn code(self) -> &'static str {
        match self {
            StatePlaneZone::TexasCentralFeet => "ESRI:102739",
        }
    }

    /// Projection parameters of the zone
    pub fn parameters(self) -> LccParameters {
        match self {
            StatePlaneZone::TexasCentralFeet => LccParameters {
                ellipsoid: GRS80,
                standard_parallel_1: 30.0 + 7.0 / 60.0,
                standard_parallel_2: 31.0 + 53.0 / 60.0,
                latitude_of_origin: 29.0 + 40.0 / 60.0,
                central_meridian: -(100.0 + 20.0 / 60.0),
                false_easting: 2_296_583.333_333_333,
                false_northing: 9_842_500.0,
                unit_to_meter: US_SURVEY_FOOT,
            },
        }
    }

    /// Build the projection for this zone
    pub fn projection(self) -> LambertConformalConic {
        LambertConformalConic::new(&self.parameters())
    }
}

/// Precomputed Lambert Conformal Conic projection
#[derive(Debug, Clone, Copy)]
pub struct LambertConformalConic {
    a: f64,
    e: f64,
    n: f64,
    big_f: f64,
    rho_origin: f64,
    lambda_origin: f64,
    false_easting_m: f64,
    false_northing_m: f64,
    unit_to_meter: f64,
}

impl LambertConformalConic {
    /// Derive the projection constants
    pub fn new(params: &LccParameters) -> Self {
        let a = params.ellipsoid.semi_major_axis;
        let f = 1.0 / params.ellipsoid.inverse_flattening;
        let e = (2.0 * f - f * f).sqrt();

        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        let phi0 = params.latitude_of_origin.to_radians();

        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let rho_origin = a * big_f * t(phi0, e).powf(n);

        Self {
            a,
            e,
            n,
            big_f,
            rho_origin,
            lambda_origin: params.central_meridian.to_radians(),
            false_easting_m: params.false_easting * params.unit_to_meter,
            false_northing_m: params.false_northing * params.unit_to_meter,
            unit_to_meter: params.unit_to_meter,
        }
    }

    /// Projected (x, y) in projection units to (longitude, latitude) degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x * self.unit_to_meter - self.false_easting_m;
        let dy = self.rho_origin - (y * self.unit_to_meter - self.false_northing_m);

        let rho = dx.hypot(dy).copysign(self.n);
        let t_prime = (rho / (self.a * self.big_f)).powf(1.0 / self.n);
        let theta = if self.n < 0.0 {
            (-dx).atan2(-dy)
        } else {
            dx.atan2(dy)
        };

        let lambda = theta / self.n + self.lambda_origin;

        let half_e = self.e / 2.0;
        let mut phi = FRAC_PI_2 - 2.0 * t_prime.atan();
        for _ in 0..MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t_prime * ((1.0 - es) / (1.0 + es)).powf(half_e)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < CONVERGENCE {
                break;
            }
        }

        (lambda.to_degrees(), phi.to_degrees())
    }

    /// (longitude, latitude) degrees to projected (x, y) in projection units
    pub fn forward(&self, longitude: f64, latitude: f64) -> (f64, f64) {
        let phi = latitude.to_radians();
        let rho = self.a * self.big_f * t(phi, self.e).powf(self.n);
        let theta = self.n * (longitude.to_radians() - self.lambda_origin);

        let easting = self.false_easting_m + rho * theta.sin();
        let northing = self.false_northing_m + self.rho_origin - rho * theta.cos();

        (easting / self.unit_to_meter, northing / self.unit_to_meter)
    }
}

fn m(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Reprojects state-plane coordinate pairs into WKT points
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    zone: StatePlaneZone,
    projection: LambertConformalConic,
}

impl Reprojector {
    /// Create a reprojector for a zone
    pub fn new(zone: StatePlaneZone) -> Self {
        Self {
            zone,
            projection: zone.projection(),
        }
    }

    /// Source zone
    pub fn zone(&self) -> StatePlaneZone {
        self.zone
    }

    /// Reproject a raw (x, y) pair
    ///
    /// If either coordinate is missing or blank the point is `Ok(None)`,
    /// whatever the other one holds. Otherwise a coordinate that is not
    /// numeric, or a result that is not finite, is an error message for the
    /// caller to attach to the row.
    pub fn reproject(&self, x: &RawValue, y: &RawValue) -> Result<Option<WktPoint>, String> {
        if x.is_blank() || y.is_blank() {
            return Ok(None);
        }

        let x = x
            .to_f64()
            .map_err(|v| format!("x coordinate '{v}' is not numeric"))?;
        let y = y
            .to_f64()
            .map_err(|v| format!("y coordinate '{v}' is not numeric"))?;

        let (Some(x), Some(y)) = (x, y) else {
            return Ok(None);
        };

        let (longitude, latitude) = self.projection.inverse(x, y);
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(format!(
                "({x}, {y}) does not reproject from {}",
                self.zone.code()
            ));
        }

        Ok(Some(WktPoint::new(longitude, latitude)))
    }
}
