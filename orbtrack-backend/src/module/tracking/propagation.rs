//! Element set -> geodetic position
//!
//! The orbital model sits behind [`Propagator`] so the tick loop can be
//! driven by scripted positions in tests. [`Sgp4Propagator`] is the
//! production model.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};

use super::error::PropagationError;
use super::types::{Catalog, ElementLines, PositionEntry, Snapshot, TickReport};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
/// 2000-01-01T12:00:00Z
const J2000_UNIX_MILLIS: i64 = 946_728_000_000;
const GMST_BASE_DEG: f64 = 280.460_618_37;
const GMST_ROTATION_PER_DAY: f64 = 360.985_647_366_29;
const GMST_CORRECTION: f64 = 0.000_387_933;

/// WGS-84 equatorial radius, km
const EARTH_RADIUS_KM: f64 = 6378.137;
/// WGS-84 polar radius, km
const EARTH_POLAR_RADIUS_KM: f64 = 6356.752_314_2;
const GEODETIC_ITERATIONS: usize = 20;

/// Inertial-frame state, km and km/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

impl StateVector {
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(&self.velocity).all(|v| v.is_finite())
    }

    pub fn speed(&self) -> f64 {
        norm(&self.velocity)
    }
}

/// Degrees, plus height above the ellipsoid in km
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

pub trait Propagator: Send + Sync {
    /// Inertial state of the object described by `lines` at `at`
    fn propagate(&self, lines: &ElementLines, at: DateTime<Utc>)
        -> Result<StateVector, PropagationError>;

    /// Greenwich mean sidereal time in radians
    fn sidereal_time(&self, at: DateTime<Utc>) -> f64 {
        greenwich_mean_sidereal_time(at)
    }

    fn eci_to_geodetic(&self, position: [f64; 3], gmst: f64) -> Geodetic {
        eci_to_geodetic(position, gmst)
    }
}

/// Parsed element set with its SGP4 constants
struct Sgp4Model {
    elements: sgp4::Elements,
    constants: sgp4::Constants,
}

impl Sgp4Model {
    fn from_lines(lines: &ElementLines) -> Result<Self, PropagationError> {
        let elements =
            sgp4::Elements::from_tle(None, lines.line1.as_bytes(), lines.line2.as_bytes())
                .map_err(|e| PropagationError::Elements(e.to_string()))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| PropagationError::Elements(e.to_string()))?;
        Ok(Self {
            elements,
            constants,
        })
    }
}

type CachedModel = Result<Arc<Sgp4Model>, PropagationError>;

/// SGP4/SDP4 via the `sgp4` crate.
///
/// Element sets are parsed once and their constants kept for later ticks;
/// the catalog is static, so the cache only grows until every record has
/// been seen.
#[derive(Default)]
pub struct Sgp4Propagator {
    models: Mutex<HashMap<ElementLines, CachedModel>>,
}

impl Sgp4Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of element sets parsed so far
    pub fn cached_models(&self) -> usize {
        self.lock_models().len()
    }

    fn lock_models(&self) -> MutexGuard<'_, HashMap<ElementLines, CachedModel>> {
        self.models.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn model(&self, lines: &ElementLines) -> CachedModel {
        if let Some(cached) = self.lock_models().get(lines) {
            return cached.clone();
        }

        let model = Sgp4Model::from_lines(lines).map(Arc::new);
        self.lock_models().insert(lines.clone(), model.clone());
        model
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        lines: &ElementLines,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let model = self.model(lines)?;
        let minutes = model
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| PropagationError::Elements(e.to_string()))?;
        let prediction = model
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationError::Diverged(e.to_string()))?;

        let state = StateVector {
            position: prediction.position,
            velocity: prediction.velocity,
        };
        if !state.is_finite() {
            return Err(PropagationError::NonFinite);
        }
        Ok(state)
    }
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// IAU-82 GMST polynomial, radians in [0, 2π)
pub fn greenwich_mean_sidereal_time(at: DateTime<Utc>) -> f64 {
    let days_since_j2000 =
        (at.timestamp_millis() - J2000_UNIX_MILLIS) as f64 / (1000.0 * SECONDS_PER_DAY);
    let centuries = days_since_j2000 / DAYS_PER_JULIAN_CENTURY;
    let gmst_degrees = GMST_BASE_DEG
        + GMST_ROTATION_PER_DAY * days_since_j2000
        + GMST_CORRECTION * centuries * centuries
        - centuries * centuries * centuries / 38_710_000.0;
    gmst_degrees.rem_euclid(360.0).to_radians()
}

/// Inertial position (km) to geodetic latitude/longitude in degrees.
///
/// Longitude is normalised to [-180, 180). Latitude is solved iteratively
/// on the WGS-84 ellipsoid.
pub fn eci_to_geodetic(position: [f64; 3], gmst: f64) -> Geodetic {
    let [x, y, z] = position;
    let a = EARTH_RADIUS_KM;
    let f = (EARTH_RADIUS_KM - EARTH_POLAR_RADIUS_KM) / EARTH_RADIUS_KM;
    let e2 = 2.0 * f - f * f;
    let r = (x * x + y * y).sqrt();

    let longitude = (y.atan2(x) - gmst + PI).rem_euclid(2.0 * PI) - PI;

    let mut latitude = z.atan2(r);
    let mut c = 1.0;
    for _ in 0..GEODETIC_ITERATIONS {
        let sin_lat = latitude.sin();
        c = 1.0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        latitude = (z + a * c * e2 * sin_lat).atan2(r);
    }
    let altitude = r / latitude.cos() - a * c;

    Geodetic {
        latitude: latitude.to_degrees(),
        longitude: longitude.to_degrees(),
        altitude,
    }
}

/// Propagate every catalog record to `at`.
///
/// All records share the instant and the sidereal time derived from it.
/// Records that fail, or land on a non-finite position, are left out.
pub fn compute_snapshot(
    catalog: &Catalog,
    propagator: &dyn Propagator,
    at: DateTime<Utc>,
    tick: u64,
) -> (Snapshot, TickReport) {
    let started = Instant::now();
    let gmst = propagator.sidereal_time(at);

    let mut report = TickReport {
        tick,
        catalog_size: catalog.len(),
        ..Default::default()
    };
    let mut entries = Vec::with_capacity(catalog.len());

    for record in catalog.iter() {
        let state = match propagator.propagate(&record.lines, at) {
            Ok(state) if state.is_finite() => state,
            Ok(_) => {
                report.non_finite += 1;
                continue;
            }
            Err(e) => {
                tracing::trace!("Propagation failed for {}: {}", record.catalog_id, e);
                report.failed += 1;
                continue;
            }
        };

        let geodetic = propagator.eci_to_geodetic(state.position, gmst);
        let speed = state.speed();
        if !(geodetic.latitude.is_finite() && geodetic.longitude.is_finite() && speed.is_finite()) {
            report.non_finite += 1;
            continue;
        }

        entries.push(PositionEntry {
            record: record.clone(),
            latitude: geodetic.latitude,
            longitude: geodetic.longitude,
            speed,
        });
    }

    report.propagated = entries.len();
    report.duration_seconds = started.elapsed().as_secs_f64();

    let snapshot = Snapshot {
        tick,
        computed_at: Some(at),
        entries,
    };
    (snapshot, report)
}
