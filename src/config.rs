//! External configuration surface, mirroring `rtypes.h: Par`.
//!
//! Every tunable the isochrone engine reads lives here so a run is fully
//! reproducible from one serializable value. Defaults mirror the
//! original's `par` initialisation where the original states one.

use serde::{Deserialize, Serialize};

/// Sector-pruning scoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptMode {
    /// No pruning; every candidate survives (bounded by `MAX_SIZE_ISOC`).
    None,
    /// Smallest distance-to-destination wins the sector.
    Distance,
    /// Largest VMC wins the sector.
    Vmc,
    /// `jFactor * vmc - kFactor * dd` wins the sector.
    Weighted,
}

impl OptMode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => OptMode::None,
            1 => OptMode::Distance,
            2 => OptMode::Vmc,
            _ => OptMode::Weighted,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub origin: LatLon,
    pub destination: LatLon,
    #[serde(default)]
    pub waypoints: Vec<LatLon>,

    #[serde(default)]
    pub start_time_in_hours: f64,
    /// Isochrone interval in hours; also the departure-time increment used
    /// by `best_departure_sweep` (spec.md §4.5/§6 name `tStep` for both).
    #[serde(default = "default_t_step")]
    pub t_step: f64,

    #[serde(default = "default_cog_step")]
    pub cog_step: f64,
    #[serde(default = "default_range_cog")]
    pub range_cog: f64,

    #[serde(default = "default_n_sectors")]
    pub n_sectors: usize,
    #[serde(default)]
    pub opt: OptMode,

    #[serde(default = "default_j_factor")]
    pub j_factor: f64,
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,

    #[serde(default)]
    pub penalty0_minutes: f64,
    #[serde(default)]
    pub penalty1_minutes: f64,
    #[serde(default)]
    pub penalty2_minutes: f64,

    #[serde(default)]
    pub motor_speed: f64,
    #[serde(default)]
    pub motor_threshold: f64,

    #[serde(default = "default_x_wind")]
    pub x_wind: f64,
    #[serde(default = "default_max_wind")]
    pub max_wind: f64,

    #[serde(default)]
    pub const_wind_tws: f64,
    #[serde(default)]
    pub const_wind_twd: f64,
    #[serde(default)]
    pub const_current_s: f64,
    #[serde(default)]
    pub const_current_d: f64,
    #[serde(default)]
    pub const_wave: f64,

    #[serde(default = "default_day_efficiency")]
    pub day_efficiency: f64,
    #[serde(default = "default_night_efficiency")]
    pub night_efficiency: f64,

    #[serde(default)]
    pub always_sea: bool,

    #[serde(default)]
    pub forbid_zones: Vec<Vec<LatLon>>,
    #[serde(default)]
    pub competitors: Vec<LatLon>,

    #[serde(default)]
    pub t_begin: f64,
    #[serde(default)]
    pub t_end: f64,
    #[serde(default)]
    pub best_departure_sweep: bool,
}

impl Default for OptMode {
    fn default() -> Self {
        OptMode::Weighted
    }
}

fn default_t_step() -> f64 {
    1.0
}
fn default_cog_step() -> f64 {
    5.0
}
fn default_range_cog() -> f64 {
    90.0
}
fn default_n_sectors() -> usize {
    180
}
fn default_j_factor() -> f64 {
    1.0
}
fn default_k_factor() -> f64 {
    1.0
}
fn default_x_wind() -> f64 {
    1.0
}
fn default_max_wind() -> f64 {
    50.0
}
fn default_day_efficiency() -> f64 {
    1.0
}
fn default_night_efficiency() -> f64 {
    1.0
}

impl Config {
    /// Builds the forbid-zone polygon set this config's `forbid_zones`
    /// field describes, ready to hand to `IsochroneEngine::new`.
    pub fn forbid_zones_mask(&self) -> crate::mask::ForbidZones {
        crate::mask::ForbidZones::from_polygons(
            self.forbid_zones
                .iter()
                .map(|poly| poly.iter().map(|p| (p.lat, p.lon)).collect::<Vec<_>>()),
        )
    }

    pub fn new(origin: LatLon, destination: LatLon) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
            start_time_in_hours: 0.0,
            t_step: default_t_step(),
            cog_step: default_cog_step(),
            range_cog: default_range_cog(),
            n_sectors: default_n_sectors(),
            opt: OptMode::default(),
            j_factor: default_j_factor(),
            k_factor: default_k_factor(),
            penalty0_minutes: 0.0,
            penalty1_minutes: 0.0,
            penalty2_minutes: 0.0,
            motor_speed: 0.0,
            motor_threshold: 0.0,
            x_wind: default_x_wind(),
            max_wind: default_max_wind(),
            const_wind_tws: 0.0,
            const_wind_twd: 0.0,
            const_current_s: 0.0,
            const_current_d: 0.0,
            const_wave: 0.0,
            day_efficiency: default_day_efficiency(),
            night_efficiency: default_night_efficiency(),
            always_sea: false,
            forbid_zones: Vec::new(),
            competitors: Vec::new(),
            t_begin: 0.0,
            t_end: 0.0,
            best_departure_sweep: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_mode_from_code_matches_spec_table() {
        assert_eq!(OptMode::from_code(0), OptMode::None);
        assert_eq!(OptMode::from_code(1), OptMode::Distance);
        assert_eq!(OptMode::from_code(2), OptMode::Vmc);
        assert_eq!(OptMode::from_code(7), OptMode::Weighted);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = Config::new(LatLon::new(45.0, -10.0), LatLon::new(45.0, -9.0));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.origin.lat, cfg.origin.lat);
        assert_eq!(back.t_step, cfg.t_step);
    }

    #[test]
    fn forbid_zones_mask_builds_from_raw_polygon_vertices() {
        let mut cfg = Config::new(LatLon::new(45.0, -10.0), LatLon::new(45.0, -9.0));
        cfg.forbid_zones = vec![vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 2.0),
            LatLon::new(2.0, 2.0),
            LatLon::new(2.0, 0.0),
        ]];
        let mask = cfg.forbid_zones_mask();
        assert!(mask.is_forbidden(1.0, 1.0));
        assert!(!mask.is_forbidden(10.0, 10.0));
    }
}
