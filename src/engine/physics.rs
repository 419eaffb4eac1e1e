//! Propulsion model: TWA/TWS from grib samples, polar lookup with
//! day/night efficiency and wave scaling, motor fallback, and the
//! tack/gybe/sail-change time penalties applied during successor
//! generation.

use crate::config::Config;
use crate::engine::models::Amure;
use crate::geo::{f_twa, f_twd, f_tws};
use crate::grib::FlowSample;
use crate::polar::PolarMatrix;

/// Result of evaluating one candidate heading at one grid point.
#[derive(Debug, Clone, Copy)]
pub struct PropulsionResult {
    pub speed_kn: f64,
    pub twa: f64,
    pub twd: f64,
    pub tws: f64,
    pub sail: u32,
    pub motor: bool,
}

pub struct PhysicsModel<'a> {
    pub polar: &'a PolarMatrix,
    pub sail_polar: Option<&'a PolarMatrix>,
    pub wave_polar: Option<&'a PolarMatrix>,
    pub config: &'a Config,
}

impl<'a> PhysicsModel<'a> {
    pub fn new(
        polar: &'a PolarMatrix,
        sail_polar: Option<&'a PolarMatrix>,
        wave_polar: Option<&'a PolarMatrix>,
        config: &'a Config,
    ) -> Self {
        Self { polar, sail_polar, wave_polar, config }
    }

    /// True if `(lat, lon)` at absolute hour `t` is in daytime, by a coarse
    /// local-solar-time approximation (06:00-18:00 local). The original
    /// engine's day/night test lives in GUI/dashboard code excluded from
    /// this crate's scope; this reproduces only the efficiency-multiplier effect
    /// (a day/night efficiency multiplier), not a specific sunrise model.
    pub fn is_daytime(lon: f64, t_hours: f64) -> bool {
        let local_hour = (t_hours + lon / 15.0).rem_euclid(24.0);
        (6.0..18.0).contains(&local_hour)
    }

    fn efficiency(&self, lon: f64, t_hours: f64) -> f64 {
        if Self::is_daytime(lon, t_hours) {
            self.config.day_efficiency
        } else {
            self.config.night_efficiency
        }
    }

    /// Evaluates propulsion for one candidate course `c` (degrees) at a
    /// grid point sampled by `flow`, applying efficiency, wave scaling and
    /// motor fallback.
    pub fn propulsion_at(
        &self,
        lon: f64,
        t_hours: f64,
        course_deg: f64,
        flow: &FlowSample,
    ) -> PropulsionResult {
        let twd = f_twd(flow.u, flow.v);
        let tws = f_tws(flow.u, flow.v);
        let twa = f_twa(course_deg, twd);

        let (mut speed, mut sail) = self.polar.speed_and_sail(twa, tws, self.sail_polar);
        speed *= self.efficiency(lon, t_hours);
        speed *= self.config.x_wind;

        if let Some(wave_polar) = self.wave_polar {
            let coeff = wave_polar.speed(0.0, flow.wave_height);
            if coeff > 0.0 {
                speed *= coeff;
            }
        }

        let mut motor = false;
        if speed < self.config.motor_threshold && self.config.motor_speed > 0.0 {
            speed = self.config.motor_speed;
            motor = true;
            sail = 0;
        }

        PropulsionResult { speed_kn: speed, twa, twd, tws, sail, motor }
    }

    pub fn amure_of(twa: f64) -> Amure {
        if twa < 0.0 { Amure::Starboard } else { Amure::Port }
    }

    /// Time penalty (hours) for the transition from `(prev_amure, prev_sail)`
    /// to `(amure, sail)`, applying tack/gybe/sail-change penalties
    /// (minutes, converted to hours).
    pub fn transition_penalty_hours(
        &self,
        prev_amure: Amure,
        prev_sail: u32,
        amure: Amure,
        sail: u32,
        prev_twa: f64,
        twa: f64,
    ) -> f64 {
        let mut minutes = 0.0;
        if prev_amure != amure {
            // tack (bow through the wind, both TWA small) vs gybe (stern
            // through the wind, both TWA large) distinguished by whether
            // the boat was pointed upwind or downwind before the flip.
            if prev_twa.abs() < 90.0 && twa.abs() < 90.0 {
                minutes += self.config.penalty0_minutes;
            } else {
                minutes += self.config.penalty1_minutes;
            }
        }
        if prev_sail != sail {
            minutes += self.config.penalty2_minutes;
        }
        minutes / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LatLon};

    fn flat_polar() -> PolarMatrix {
        PolarMatrix::parse("0;6;12\n40;4.0;6.0\n90;5.0;7.5\n150;3.5;6.5\n").unwrap()
    }

    fn base_config() -> Config {
        Config::new(LatLon::new(45.0, -10.0), LatLon::new(45.0, -9.0))
    }

    #[test]
    fn is_daytime_flags_midday_and_midnight_correctly() {
        assert!(PhysicsModel::is_daytime(0.0, 12.0));
        assert!(!PhysicsModel::is_daytime(0.0, 0.0));
    }

    #[test]
    fn propulsion_applies_day_night_efficiency() {
        let polar = flat_polar();
        let mut cfg = base_config();
        cfg.night_efficiency = 0.5;
        let model = PhysicsModel::new(&polar, None, None, &cfg);
        let flow = FlowSample { u: 0.0, v: -10.0, gust: 0.0, wave_height: 0.0, msl: 0.0, prate: 0.0 };

        let day = model.propulsion_at(0.0, 12.0, 90.0, &flow);
        let night = model.propulsion_at(0.0, 0.0, 90.0, &flow);
        assert!(night.speed_kn < day.speed_kn);
    }

    #[test]
    fn propulsion_falls_back_to_motor_below_threshold() {
        let polar = flat_polar();
        let mut cfg = base_config();
        cfg.motor_threshold = 100.0;
        cfg.motor_speed = 4.0;
        let model = PhysicsModel::new(&polar, None, None, &cfg);
        let flow = FlowSample { u: 0.0, v: -1.0, gust: 0.0, wave_height: 0.0, msl: 0.0, prate: 0.0 };
        let r = model.propulsion_at(0.0, 12.0, 90.0, &flow);
        assert!(r.motor);
        assert!((r.speed_kn - 4.0).abs() < 1e-9);
    }

    #[test]
    fn transition_penalty_distinguishes_tack_from_gybe() {
        let polar = flat_polar();
        let mut cfg = base_config();
        cfg.penalty0_minutes = 2.0;
        cfg.penalty1_minutes = 5.0;
        let model = PhysicsModel::new(&polar, None, None, &cfg);

        let tack = model.transition_penalty_hours(Amure::Port, 0, Amure::Starboard, 0, 40.0, -40.0);
        let gybe = model.transition_penalty_hours(Amure::Port, 0, Amure::Starboard, 0, 150.0, -150.0);
        assert!((tack - 2.0 / 60.0).abs() < 1e-9);
        assert!((gybe - 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn transition_penalty_adds_sail_change_cost() {
        let polar = flat_polar();
        let mut cfg = base_config();
        cfg.penalty2_minutes = 3.0;
        let model = PhysicsModel::new(&polar, None, None, &cfg);
        let p = model.transition_penalty_hours(Amure::Port, 0, Amure::Port, 1, 40.0, 40.0);
        assert!((p - 3.0 / 60.0).abs() < 1e-9);
    }
}
