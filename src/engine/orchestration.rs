//! Waypoint chaining and multi-competitor orchestration.
//!
//! A passage is one or more legs (`origin -> wp0 -> wp1 -> ... -> destination`)
//! routed back to back, each leg's departure time picked up where the
//! previous leg's route left off. A competitor roster runs the same passage
//! once per competitor, filling in `CompetitorsList` entries as each finishes
//! and leaving `run_index` pointing at whoever is still in flight so a
//! cancelled sweep can be resumed or reported on as-is.

use std::sync::atomic::AtomicBool;

use crate::config::LatLon;
use crate::engine::models::{Competitor, CompetitorsList, SailRoute};
use crate::engine::route_builder::build_route;
use crate::engine::router::{IsochroneEngine, IsochroneRun};
use crate::error::Result;
use crate::geo::ortho_dist;

/// One leg's engine run and the finalised route built from it.
#[derive(Debug, Clone)]
pub struct Leg {
    pub run: IsochroneRun,
    pub route: SailRoute,
}

/// Full passage result: one `Leg` per origin/waypoint/destination hop, in
/// travel order. A leg that failed to reach its target is the last entry.
#[derive(Debug, Clone, Default)]
pub struct Passage {
    pub legs: Vec<Leg>,
}

impl Passage {
    /// True only if every leg reached its target.
    pub fn fully_reached(&self) -> bool {
        !self.legs.is_empty() && self.legs.iter().all(|l| l.run.destination_reached())
    }

    pub fn total_duration_hours(&self) -> f64 {
        self.legs.iter().map(|l| l.route.duration_hours).sum()
    }
}

/// Routes `origin -> waypoints[0] -> ... -> waypoints[n-1] -> destination`
/// as a sequence of legs, each one's `target_waypoint` tag advancing by one
/// (`toIndexWp`) and each one's departure time continuing from
/// where the previous leg's route finished.
///
/// Stops chaining (returning whatever legs completed) as soon as `stop` is
/// observed, or as soon as one leg fails to reach its target - there is no
/// point routing leg k+1 from a waypoint leg k never arrived at.
pub fn route_waypoint_legs(
    engine: &IsochroneEngine,
    origin: LatLon,
    waypoints: &[LatLon],
    destination: LatLon,
    start_time_hours: f64,
    stop: &AtomicBool,
) -> Result<Passage> {
    let targets: Vec<LatLon> = waypoints.iter().copied().chain(std::iter::once(destination)).collect();

    let mut passage = Passage::default();
    let mut leg_origin = (origin.lat, origin.lon);
    let mut t = start_time_hours;

    for (wp_index, target) in targets.iter().enumerate() {
        if stop.load(std::sync::atomic::Ordering::Relaxed) {
            break;
        }
        let run = engine.route_leg(leg_origin, (target.lat, target.lon), t, wp_index, stop)?;
        let reached = run.destination_reached();
        let route = build_route(engine, &run)?;
        t += route.duration_hours;
        leg_origin = (target.lat, target.lon);
        passage.legs.push(Leg { run, route });
        if !reached {
            break;
        }
    }
    Ok(passage)
}

/// Runs the same origin/waypoints/destination passage once per competitor,
/// updating `roster` in place as each finishes (`rtypes.h: CompetitorsList`'s
/// `runIndex` convention: `Some(i)` is the competitor currently in flight,
/// `None` once the whole roster has finished or been stopped). A cancelled
/// sweep leaves already-finished competitors filled in and the rest
/// untouched, rather than losing the partial roster.
///
/// Returns each competitor's passage, in roster order, with every leg's
/// route stamped with that competitor's index (`rtypes.h: SailRoute`'s
/// `competitorIndex`). A stopped sweep returns the passages completed so far.
pub fn run_competitors(
    engine: &IsochroneEngine,
    waypoints: &[LatLon],
    destination: LatLon,
    start_time_hours: f64,
    roster: &mut CompetitorsList,
    stop: &AtomicBool,
) -> Result<Vec<Passage>> {
    let mut passages = Vec::with_capacity(roster.competitors.len());
    for i in 0..roster.competitors.len() {
        if stop.load(std::sync::atomic::Ordering::Relaxed) {
            roster.run_index = Some(i);
            return Ok(passages);
        }
        roster.run_index = Some(i);
        let origin = LatLon::new(roster.competitors[i].lat, roster.competitors[i].lon);
        let mut passage = route_waypoint_legs(engine, origin, waypoints, destination, start_time_hours, stop)?;
        for leg in &mut passage.legs {
            leg.route.competitor_index = Some(i);
        }

        let competitor = &mut roster.competitors[i];
        competitor.duration_hours = passage.total_duration_hours();
        competitor.eta_hours = start_time_hours + competitor.duration_hours;
        competitor.dist_to_destination = passage
            .legs
            .last()
            .and_then(|l| l.route.points.last())
            .map(|p| ortho_dist(p.lat, p.lon, destination.lat, destination.lon))
            .unwrap_or_else(|| ortho_dist(origin.lat, origin.lon, destination.lat, destination.lon));
        passages.push(passage);
    }
    roster.run_index = None;
    Ok(passages)
}

#[derive(Debug, Clone, Copy)]
pub struct CompetitorSeed {
    pub color_index: u32,
    pub name_index: usize,
    pub lat: f64,
    pub lon: f64,
}

/// Builds a fresh `CompetitorsList` from start positions, ready for
/// `run_competitors` runs several competitors' passages side by side.
pub fn new_roster(seeds: &[CompetitorSeed], names: &[String]) -> CompetitorsList {
    let competitors = seeds
        .iter()
        .map(|seed| Competitor {
            color_index: seed.color_index,
            lat: seed.lat,
            lon: seed.lon,
            name: names.get(seed.name_index).cloned().unwrap_or_default(),
            dist_to_destination: 0.0,
            duration_hours: 0.0,
            eta_hours: 0.0,
        })
        .collect();
    CompetitorsList { competitors, run_index: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OptMode};
    use crate::grib::{FlowCell, GribField, Zone};
    use crate::mask::{ForbidZones, LandMask};
    use crate::polar::PolarMatrix;
    use std::sync::atomic::AtomicBool;

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
        GribField { zone, cells: vec![FlowCell::default(); n] }
    }

    fn base_config(origin: LatLon, destination: LatLon) -> Config {
        let mut cfg = Config::new(origin, destination);
        cfg.const_wind_tws = 15.0;
        cfg.const_wind_twd = 270.0;
        cfg.t_step = 1.0;
        cfg.cog_step = 10.0;
        cfg.range_cog = 90.0;
        cfg.opt = OptMode::Distance;
        cfg
    }

    #[test]
    fn waypoint_legs_chain_departure_times_across_legs() {
        let origin = LatLon::new(45.0, -10.0);
        let waypoint = LatLon::new(45.0, -9.5);
        let destination = LatLon::new(45.0, -9.0);
        let cfg = base_config(origin, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();
        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);

        let stop = AtomicBool::new(false);
        let passage = route_waypoint_legs(&engine, origin, &[waypoint], destination, 0.0, &stop).unwrap();

        assert_eq!(passage.legs.len(), 2);
        assert!(passage.fully_reached());
        assert_eq!(passage.legs[0].route.points.last().unwrap().target_waypoint, 0);
        assert_eq!(passage.legs[1].route.points.last().unwrap().target_waypoint, 1);
    }

    #[test]
    fn run_competitors_fills_roster_and_clears_run_index_when_done() {
        let destination = LatLon::new(45.0, -9.0);
        let c0 = LatLon::new(45.0, -10.0);
        let c1 = LatLon::new(45.1, -10.0);
        let cfg = base_config(c0, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();
        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);

        let mut roster = new_roster(
            &[
                CompetitorSeed { color_index: 0, name_index: 0, lat: c0.lat, lon: c0.lon },
                CompetitorSeed { color_index: 1, name_index: 1, lat: c1.lat, lon: c1.lon },
            ],
            &["Alpha".to_string(), "Bravo".to_string()],
        );

        let stop = AtomicBool::new(false);
        let passages = run_competitors(&engine, &[], destination, 0.0, &mut roster, &stop).unwrap();

        assert!(roster.run_index.is_none());
        assert!(roster.competitors[0].duration_hours > 0.0);
        assert!(roster.competitors[1].duration_hours > 0.0);
        assert_eq!(roster.competitors[0].name, "Alpha");
        assert!(roster.competitors[0].dist_to_destination.abs() < 1e-6);

        assert_eq!(passages.len(), 2);
        for (i, passage) in passages.iter().enumerate() {
            for leg in &passage.legs {
                assert_eq!(leg.route.competitor_index, Some(i));
            }
        }
    }

    #[test]
    fn run_competitors_stops_mid_roster_leaving_run_index_set() {
        let destination = LatLon::new(45.0, -9.0);
        let c0 = LatLon::new(45.0, -10.0);
        let c1 = LatLon::new(45.1, -10.0);
        let cfg = base_config(c0, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();
        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);

        let mut roster = new_roster(
            &[
                CompetitorSeed { color_index: 0, name_index: 0, lat: c0.lat, lon: c0.lon },
                CompetitorSeed { color_index: 1, name_index: 1, lat: c1.lat, lon: c1.lon },
            ],
            &["Alpha".to_string(), "Bravo".to_string()],
        );

        let stop = AtomicBool::new(true);
        let passages = run_competitors(&engine, &[], destination, 0.0, &mut roster, &stop).unwrap();

        assert_eq!(roster.run_index, Some(0));
        assert_eq!(roster.competitors[0].duration_hours, 0.0);
        assert!(passages.is_empty());
    }
}
