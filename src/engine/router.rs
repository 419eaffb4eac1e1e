//! The isochrone-expansion routing engine itself - the
//! hardest and largest component. Expands one frontier at a time, prunes
//! each frontier to one survivor per angular sector, detects destination
//! reach, and implements the engine's cancellable state machine plus the
//! best-departure-time sweep.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use rayon::prelude::*;

use crate::config::{Config, OptMode};
use crate::engine::models::{Amure, IsoDesc, Isochrone, Pp};
use crate::engine::physics::PhysicsModel;
use crate::error::{Result, RoutingError};
use crate::geo::{f_twd, f_tws, lon_canonize, ortho_cap2, ortho_dist};
use crate::grib::{FlowSample, GribField};
use crate::mask::{ForbidZones, LandMask};
use crate::polar::PolarMatrix;

/// Frontier size bound; `opt = 0` (no pruning) aborts with
/// `CapacityExceeded` rather than growing past this.
pub const MAX_SIZE_ISOC: usize = 2_000;
/// Isochrone-count bound; crossing it without reaching the destination is
/// an `Exhausted` termination.
pub const MAX_N_ISOC: usize = 500;
/// Sector-pruning width cap (`nSectors <= MAX_N_SECTORS`).
pub const MAX_N_SECTORS: usize = 360;

/// Engine state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Reached,
    Exhausted,
    Failed,
    Stopped,
}

/// Everything one `route_leg` invocation produces: the full isochrone
/// history plus the handle (isochrone index, point index) of the node the
/// route builder should walk back from.
#[derive(Debug, Clone)]
pub struct IsochroneRun {
    pub isochrones: Vec<Isochrone>,
    pub iso_desc: Vec<IsoDesc>,
    pub state: EngineState,
    pub destination_node: Option<(usize, usize)>,
    /// Duration (hours) of the terminal partial step; only meaningful when
    /// `state == Reached`; the last segment uses the stored
    /// `last_step_duration`, not the uniform `dt`.
    pub last_step_duration: f64,
    pub start_time_hours: f64,
}

impl IsochroneRun {
    /// `NoSolution`/`Unreached`/`Stopped` carry partial isochrone state, so
    /// the engine itself never returns them as a bare `Err`
    /// (that would lose the isochrones already built). Callers that want a
    /// hard error out of a terminal non-`Reached` state (e.g. a CLI picking
    /// an exit code) call this.
    pub fn to_error(&self) -> Option<RoutingError> {
        match self.state {
            EngineState::Reached | EngineState::Running | EngineState::Idle => None,
            EngineState::Failed => Some(RoutingError::NoSolution),
            EngineState::Exhausted => Some(RoutingError::Unreached(format!(
                "exhausted after {} isochrones without reaching destination",
                self.isochrones.len()
            ))),
            EngineState::Stopped => Some(RoutingError::Stopped),
        }
    }

    pub fn destination_reached(&self) -> bool {
        self.state == EngineState::Reached
    }
}

struct Candidate {
    pp: Pp,
    reaching: bool,
    speed_kn: f64,
}

/// Owns references to every immutable provider a routing run needs -
/// providers are shared and immutable; only the isochrone
/// buffers below are owned per-run.
pub struct IsochroneEngine<'a> {
    pub polar: &'a PolarMatrix,
    pub sail_polar: Option<&'a PolarMatrix>,
    pub wave_polar: Option<&'a PolarMatrix>,
    pub wind: &'a GribField,
    pub current: Option<&'a GribField>,
    pub land_mask: &'a LandMask,
    pub forbid_zones: &'a ForbidZones,
    pub config: &'a Config,
}

impl<'a> IsochroneEngine<'a> {
    pub fn new(
        polar: &'a PolarMatrix,
        sail_polar: Option<&'a PolarMatrix>,
        wave_polar: Option<&'a PolarMatrix>,
        wind: &'a GribField,
        current: Option<&'a GribField>,
        land_mask: &'a LandMask,
        forbid_zones: &'a ForbidZones,
        config: &'a Config,
    ) -> Self {
        Self {
            polar,
            sail_polar,
            wave_polar,
            wind,
            current,
            land_mask,
            forbid_zones,
            config,
        }
    }

    fn physics(&self) -> PhysicsModel<'_> {
        PhysicsModel::new(self.polar, self.sail_polar, self.wave_polar, self.config)
    }

    fn has_const_wind(&self) -> bool {
        self.config.const_wind_tws != 0.0
    }

    /// Samples wind at `(lat, lon, t)`, honouring the constant-wind
    /// override that bypasses the grid entirely.
    pub(crate) fn sample_wind(&self, lat: f64, lon: f64, t: f64) -> Option<FlowSample> {
        if self.has_const_wind() {
            let (u, v) = from_direction_and_speed(self.config.const_wind_twd, self.config.const_wind_tws);
            Some(FlowSample { u, v, gust: 0.0, wave_height: self.config.const_wave, msl: 0.0, prate: 0.0 })
        } else {
            self.wind.sample(lat, lon, t)
        }
    }

    /// Displacement `(dlat, dlon)` contributed by the current over `dt`
    /// hours, or `(0,0)` if no current source is configured. Current
    /// direction is the "set" convention (direction flowed *toward*), so
    /// unlike wind it is not offset by 180 degrees.
    fn current_drift(&self, lat: f64, lon: f64, t: f64, dt: f64) -> (f64, f64) {
        let (cu, cv) = if self.config.const_current_s != 0.0 {
            to_direction_and_speed_components(self.config.const_current_d, self.config.const_current_s)
        } else if let Some(current) = self.current {
            match current.sample(lat, lon, t) {
                Some(s) => (s.u, s.v),
                None => return (0.0, 0.0),
            }
        } else {
            return (0.0, 0.0);
        };

        let speed_kn = f_tws(cu, cv);
        if speed_kn <= 0.0 {
            return (0.0, 0.0);
        }
        let dir_rad = cu.atan2(cv); // "to" bearing, no wind-style offset
        let dlat = speed_kn * dt * dir_rad.cos() / 60.0;
        let dlon = speed_kn * dt * dir_rad.sin() / (60.0 * lat.to_radians().cos().max(1e-6));
        (dlat, dlon)
    }

    /// Generates every surviving successor candidate of every node in
    /// `frontier`.
    /// Parent nodes are processed in id order (parallelised per-parent with
    /// `rayon`, collected back in order) and, within one parent, candidate
    /// courses are emitted in increasing course order - both orderings a
    /// caller can rely on being observable.
    fn generate_successors(
        &self,
        frontier: &Isochrone,
        t_hours: f64,
        dt: f64,
        target: (f64, f64),
    ) -> Vec<Candidate> {
        frontier
            .points
            .par_iter()
            .enumerate()
            .map(|(parent_id, parent)| self.candidates_for_node(parent, parent_id, t_hours, dt, target))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn candidates_for_node(
        &self,
        parent: &Pp,
        parent_id: usize,
        t_hours: f64,
        dt: f64,
        target: (f64, f64),
    ) -> Vec<Candidate> {
        let flow = match self.sample_wind(parent.lat, parent.lon, t_hours) {
            Some(f) => f,
            None => return Vec::new(),
        };
        let twd = f_twd(flow.u, flow.v);
        let physics = self.physics();

        let mut seen = HashSet::new();
        let mut courses: Vec<i64> = Vec::new();
        let steps = if self.config.cog_step > 0.0 {
            (2.0 * self.config.range_cog / self.config.cog_step).round() as i64
        } else {
            0
        };
        for i in 0..=steps {
            let c = twd - self.config.range_cog + i as f64 * self.config.cog_step;
            let key = (c.rem_euclid(360.0) * 1_000.0).round() as i64;
            if seen.insert(key) {
                courses.push(key);
            }
        }
        courses.sort_unstable();

        let mut out = Vec::with_capacity(courses.len());
        for key in courses {
            let course_deg = key as f64 / 1_000.0;
            let prop = physics.propulsion_at(parent.lon, t_hours, course_deg, &flow);
            if prop.tws > self.config.max_wind || prop.speed_kn <= 0.0 {
                continue;
            }
            let amure = PhysicsModel::amure_of(prop.twa);

            let penalty_hours = if parent.father.is_none() {
                // isochrone 0's singleton origin has no incoming heading.
                0.0
            } else {
                physics.transition_penalty_hours(parent.amure, parent.sail, amure, prop.sail, parent.twa, prop.twa)
            };
            let effective_dt = (dt - penalty_hours).max(0.0);

            let course_rad = course_deg.to_radians();
            let mut lat2 = parent.lat + prop.speed_kn * effective_dt * course_rad.cos() / 60.0;
            let mut lon2 = parent.lon
                + prop.speed_kn * effective_dt * course_rad.sin() / (60.0 * parent.lat.to_radians().cos().max(1e-6));

            let (dlat, dlon) = self.current_drift(parent.lat, parent.lon, t_hours, dt);
            lat2 += dlat;
            lon2 += dlon;
            lon2 = lon_canonize(lon2);

            if !self.config.always_sea && !self.land_mask.is_sea(lat2, lon2) {
                continue;
            }
            if self.forbid_zones.is_forbidden(lat2, lon2) {
                continue;
            }

            let dd = ortho_dist(lat2, lon2, target.0, target.1);
            let vmc = (parent.dd - dd) / dt;
            let reaching = parent.dd <= prop.speed_kn * effective_dt;

            out.push(Candidate {
                pp: Pp {
                    id: 0,
                    father: Some(parent_id),
                    amure,
                    sail: prop.sail,
                    motor: prop.motor,
                    sector: 0,
                    target_waypoint: parent.target_waypoint,
                    lat: lat2,
                    lon: lon2,
                    twa: prop.twa,
                    dd,
                    vmc,
                },
                reaching,
                speed_kn: prop.speed_kn,
            });
        }
        out
    }

    /// Keeps at most one survivor per angular sector around `target`.
    /// Sectors are written out in increasing sector-index order, as the
    /// ordering guarantees require.
    fn prune_sectors(&self, raw: Vec<Candidate>, target: (f64, f64), n_sectors: usize) -> Vec<Pp> {
        let sector_width = 360.0 / n_sectors as f64;
        // (best_key, original_order, candidate)
        let mut winners: Vec<Option<(f64, usize, Pp)>> = vec![None; n_sectors];

        for (order, cand) in raw.into_iter().enumerate() {
            let bearing = ortho_cap2(target.0, target.1, cand.pp.lat, cand.pp.lon);
            let sector = ((bearing / sector_width).floor() as i64).clamp(0, n_sectors as i64 - 1) as usize;
            let key = match self.config.opt {
                OptMode::Distance => -cand.pp.dd,
                OptMode::Vmc => cand.pp.vmc,
                OptMode::Weighted => self.config.j_factor * cand.pp.vmc - self.config.k_factor * cand.pp.dd,
                OptMode::None => unreachable!("prune_sectors is never called with OptMode::None"),
            };
            let better = match &winners[sector] {
                None => true,
                Some((best_key, best_order, _)) => key > *best_key || (key == *best_key && order < *best_order),
            };
            if better {
                let mut pp = cand.pp;
                pp.sector = sector as i32;
                winners[sector] = Some((key, order, pp));
            }
        }

        winners
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(new_id, (_, _, mut pp))| {
                pp.id = new_id;
                pp
            })
            .collect()
    }

    fn describe(isochrone: &Isochrone, target_waypoint: usize) -> IsoDesc {
        let n = isochrone.points.len().max(1) as f64;
        let mut closest_index = 0usize;
        let mut best_vmc_index = 0usize;
        let mut closest_dd = f64::MAX;
        let mut best_vmc = f64::MIN;
        let mut sum_lat = 0.0;
        let mut sum_lon = 0.0;
        for (i, p) in isochrone.points.iter().enumerate() {
            if p.dd < closest_dd {
                closest_dd = p.dd;
                closest_index = i;
            }
            if p.vmc > best_vmc {
                best_vmc = p.vmc;
                best_vmc_index = i;
            }
            sum_lat += p.lat;
            sum_lon += p.lon;
        }
        IsoDesc {
            closest_index,
            best_vmc_index,
            first_point_index: 0,
            size: isochrone.points.len(),
            focal_lat: sum_lat / n,
            focal_lon: sum_lon / n,
            target_waypoint,
        }
    }

    /// Routes one leg from `origin` to `destination`, starting at absolute
    /// hour `start_time_hours`, polling `stop` between isochrones.
    /// `target_waypoint` is stamped onto every produced node so
    /// the orchestration layer can tell legs apart after concatenation.
    pub fn route_leg(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
        start_time_hours: f64,
        target_waypoint: usize,
        stop: &AtomicBool,
    ) -> Result<IsochroneRun> {
        if !self.has_const_wind() {
            if !self.wind.zone.is_in_zone(origin.0, origin.1) {
                return Err(RoutingError::GridOutOfBounds { lat: origin.0, lon: origin.1 });
            }
            if !self.wind.zone.is_in_zone(destination.0, destination.1) {
                return Err(RoutingError::GridOutOfBounds { lat: destination.0, lon: destination.1 });
            }
        }

        let dt = self.config.t_step;
        let n_sectors = self.config.n_sectors.clamp(1, MAX_N_SECTORS);

        let origin_dd = ortho_dist(origin.0, origin.1, destination.0, destination.1);
        let origin_pp = Pp {
            id: 0,
            father: None,
            amure: Amure::Starboard,
            sail: 0,
            motor: false,
            sector: 0,
            target_waypoint,
            lat: origin.0,
            lon: origin.1,
            twa: 0.0,
            dd: origin_dd,
            vmc: 0.0,
        };
        let mut isochrones = vec![Isochrone { points: vec![origin_pp] }];
        let mut iso_desc = vec![Self::describe(&isochrones[0], target_waypoint)];
        let mut t = start_time_hours;
        let mut global_closest = (0usize, 0usize, origin_dd);

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("routing stopped by external request after {} isochrones", isochrones.len());
                return Ok(IsochroneRun {
                    isochrones,
                    iso_desc,
                    state: EngineState::Stopped,
                    destination_node: Some((global_closest.0, global_closest.1)),
                    last_step_duration: 0.0,
                    start_time_hours,
                });
            }
            if isochrones.len() > MAX_N_ISOC {
                warn!("isochrone count exceeded {MAX_N_ISOC}, returning closest point reached");
                return Ok(self.finish_exhausted(isochrones, iso_desc, global_closest, start_time_hours));
            }
            if !self.has_const_wind() {
                if let Some(&last_ts) = self.wind.zone.time_stamp.last() {
                    if t + dt > last_ts {
                        return Ok(self.finish_exhausted(isochrones, iso_desc, global_closest, start_time_hours));
                    }
                }
            }

            let parent_iso = isochrones.last().expect("isochrones is never empty");
            let raw = self.generate_successors(parent_iso, t, dt, destination);

            if raw.is_empty() {
                if isochrones.len() == 1 {
                    info!("first successor generation produced no candidates");
                    return Ok(IsochroneRun {
                        isochrones,
                        iso_desc,
                        state: EngineState::Failed,
                        destination_node: None,
                        last_step_duration: 0.0,
                        start_time_hours,
                    });
                }
                return Ok(self.finish_exhausted(isochrones, iso_desc, global_closest, start_time_hours));
            }

            if let Some(reach) = raw
                .iter()
                .enumerate()
                .filter(|(_, c)| c.reaching)
                .max_by(|(ia, a), (ib, b)| a.speed_kn.partial_cmp(&b.speed_kn).unwrap().then(ib.cmp(ia)))
                .map(|(_, c)| c)
            {
                let parent = &parent_iso.points[reach.pp.father.unwrap()];
                let last_step_duration = parent.dd / reach.speed_kn;
                let mut node = reach.pp;
                node.lat = destination.0;
                node.lon = destination.1;
                node.dd = 0.0;
                node.id = 0;
                isochrones.push(Isochrone { points: vec![node] });
                iso_desc.push(Self::describe(isochrones.last().unwrap(), target_waypoint));
                let dest_idx = (isochrones.len() - 1, 0);
                info!(
                    "destination reached after {} isochrones, last step {:.3}h",
                    isochrones.len(),
                    last_step_duration
                );
                return Ok(IsochroneRun {
                    isochrones,
                    iso_desc,
                    state: EngineState::Reached,
                    destination_node: Some(dest_idx),
                    last_step_duration,
                    start_time_hours,
                });
            }

            let pruned = if self.config.opt == OptMode::None {
                if raw.len() > MAX_SIZE_ISOC {
                    return Err(RoutingError::CapacityExceeded(format!(
                        "isochrone would hold {} points, limit is {MAX_SIZE_ISOC}",
                        raw.len()
                    )));
                }
                raw.into_iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let mut p = c.pp;
                        p.id = i;
                        p
                    })
                    .collect()
            } else {
                self.prune_sectors(raw, destination, n_sectors)
            };

            let new_iso = Isochrone { points: pruned };
            let iso_index = isochrones.len();
            for (pi, p) in new_iso.points.iter().enumerate() {
                if p.dd < global_closest.2 {
                    global_closest = (iso_index, pi, p.dd);
                }
            }
            iso_desc.push(Self::describe(&new_iso, target_waypoint));
            isochrones.push(new_iso);
            t += dt;
        }
    }

    fn finish_exhausted(
        &self,
        isochrones: Vec<Isochrone>,
        iso_desc: Vec<IsoDesc>,
        global_closest: (usize, usize, f64),
        start_time_hours: f64,
    ) -> IsochroneRun {
        IsochroneRun {
            isochrones,
            iso_desc,
            state: EngineState::Exhausted,
            destination_node: Some((global_closest.0, global_closest.1)),
            last_step_duration: 0.0,
            start_time_hours,
        }
    }

    /// Sweeps the start time from `t_begin` to `t_end` in `t_step`
    /// increments, keeping the run with the smallest duration. Returns the best run seen so far even
    /// when cancelled mid-sweep.
    pub fn best_departure_sweep(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
        t_begin: f64,
        t_end: f64,
        t_step: f64,
        stop: &AtomicBool,
    ) -> Result<IsochroneRun> {
        let dt = self.config.t_step;
        let duration_of = |run: &IsochroneRun| -> f64 {
            if run.isochrones.len() <= 1 {
                return f64::MAX;
            }
            (run.isochrones.len() as f64 - 2.0).max(0.0) * dt + run.last_step_duration
        };

        let mut best: Option<IsochroneRun> = None;
        let mut t = t_begin;
        while t <= t_end {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let run = self.route_leg(origin, destination, t, 0, stop)?;
            let is_better = match &best {
                None => true,
                Some(b) => {
                    run.destination_reached() && (!b.destination_reached() || duration_of(&run) < duration_of(b))
                }
            };
            if is_better {
                best = Some(run);
            }
            t += t_step;
        }
        best.ok_or(RoutingError::NoSolution)
    }
}

fn from_direction_and_speed(twd_deg: f64, tws_kn: f64) -> (f64, f64) {
    let theta = (twd_deg - 180.0).to_radians();
    let mag = tws_kn * crate::geo::KN_TO_MS;
    (mag * theta.sin(), mag * theta.cos())
}

fn to_direction_and_speed_components(dir_deg: f64, speed_kn: f64) -> (f64, f64) {
    let theta = dir_deg.to_radians();
    let mag = speed_kn * crate::geo::KN_TO_MS;
    (mag * theta.sin(), mag * theta.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LatLon};
    use crate::grib::Zone;

    fn flat_polar() -> PolarMatrix {
        PolarMatrix::parse("0;6;12;20\n40;4.0;6.0;6.0\n90;5.0;6.0;6.0\n150;3.5;6.0;6.0\n").unwrap()
    }

    fn dummy_wind_field() -> GribField {
        let zone = Zone {
            lat_min: 30.0,
            lat_max: 50.0,
            lon_left: -20.0,
            lon_right: 0.0,
            lat_step: 1.0,
            lon_step: 1.0,
            ante_meridian: false,
            nb_lat: 21,
            nb_lon: 21,
            time_stamp: vec![0.0, 100.0],
            reference_time: None,
        };
        let n = zone.time_stamp.len() * zone.nb_lat * zone.nb_lon;
        GribField {
            zone,
            cells: vec![crate::grib::FlowCell::default(); n],
        }
    }

    fn base_config(origin: LatLon, destination: LatLon) -> Config {
        let mut cfg = Config::new(origin, destination);
        cfg.const_wind_tws = 15.0;
        cfg.const_wind_twd = 270.0;
        cfg.t_step = 1.0;
        cfg.cog_step = 5.0;
        cfg.range_cog = 90.0;
        cfg.opt = OptMode::Distance;
        cfg
    }

    #[test]
    fn scenario_s1_constant_wind_straight_shot() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let cfg = base_config(origin, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let stop = AtomicBool::new(false);
        let run = engine
            .route_leg((origin.lat, origin.lon), (destination.lat, destination.lon), 0.0, 0, &stop)
            .unwrap();

        assert!(run.destination_reached());
        let hours = (run.isochrones.len() as f64 - 2.0) * cfg.t_step + run.last_step_duration;
        assert!((hours - 10.0).abs() < 2.0, "expected ~10h, got {hours}");
    }

    #[test]
    fn scenario_s2_no_wind_no_grib_yields_no_solution() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = base_config(origin, destination);
        cfg.const_wind_tws = 0.0;
        let polar = flat_polar();
        let wind = dummy_wind_field(); // all-zero u/v -> zero wind everywhere
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let stop = AtomicBool::new(false);
        let run = engine
            .route_leg((origin.lat, origin.lon), (destination.lat, destination.lon), 0.0, 0, &stop)
            .unwrap();

        assert_eq!(run.state, EngineState::Failed);
        assert_eq!(run.to_error().unwrap().to_string(), RoutingError::NoSolution.to_string());
    }

    #[test]
    fn cancellation_returns_partial_state_at_next_boundary() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = base_config(origin, destination);
        cfg.opt = OptMode::None;
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let stop = AtomicBool::new(true);
        let run = engine
            .route_leg((origin.lat, origin.lon), (destination.lat, destination.lon), 0.0, 0, &stop)
            .unwrap();

        assert_eq!(run.state, EngineState::Stopped);
        assert_eq!(run.isochrones.len(), 1);
    }

    #[test]
    fn sector_pruning_keeps_at_most_one_node_per_sector() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = base_config(origin, destination);
        cfg.n_sectors = 8;
        cfg.opt = OptMode::Weighted;
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let stop = AtomicBool::new(false);
        let run = engine
            .route_leg((origin.lat, origin.lon), (destination.lat, destination.lon), 0.0, 0, &stop)
            .unwrap();

        for iso in &run.isochrones[1..] {
            assert!(iso.points.len() <= 8);
        }
    }

    #[test]
    fn current_drift_is_zero_without_a_current_source() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let cfg = base_config(origin, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        assert_eq!(engine.current_drift(45.0, -10.0, 0.0, 1.0), (0.0, 0.0));
    }

    #[test]
    fn constant_current_drift_pushes_toward_its_set_direction() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = base_config(origin, destination);
        cfg.const_current_s = 2.0;
        cfg.const_current_d = 90.0; // due east
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let (dlat, dlon) = engine.current_drift(45.0, -10.0, 0.0, 1.0);
        assert!(dlat.abs() < 1e-6, "an eastward set should not move latitude, got {dlat}");
        assert!(dlon > 0.0, "an eastward set should increase longitude, got {dlon}");
    }

    #[test]
    fn current_drift_samples_a_current_grib_field_when_no_constant_override() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let cfg = base_config(origin, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let mut current = dummy_wind_field();
        for cell in &mut current.cells {
            cell.u = 1.0;
            cell.v = 0.0;
        }
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, Some(&current), &land_mask, &forbid, &cfg);
        let (dlat, dlon) = engine.current_drift(45.0, -10.0, 0.0, 1.0);
        assert!(dlat.abs() < 1e-6, "an eastward grib current should not move latitude, got {dlat}");
        assert!(dlon > 0.0, "an eastward grib current should increase longitude, got {dlon}");
    }

    #[test]
    fn grid_out_of_bounds_without_override_is_rejected() {
        let origin = LatLon::new(70.0, 40.0); // far outside dummy_wind_field's zone
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = base_config(origin, destination);
        cfg.const_wind_tws = 0.0;
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();

        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);
        let stop = AtomicBool::new(false);
        let err = engine
            .route_leg((origin.lat, origin.lon), (destination.lat, destination.lon), 0.0, 0, &stop)
            .unwrap_err();
        assert!(matches!(err, RoutingError::GridOutOfBounds { .. }));
    }
}
