//! Finalised route construction: walks the father chain of
//! one reached isochrone node back to the origin, turns it into forward
//! order, and re-samples wind at every retained point so the returned
//! `SailRoute` stands on its own without the isochrone history.

use crate::engine::models::{SailPoint, SailRoute};
use crate::engine::router::{IsochroneEngine, IsochroneRun};
use crate::error::{Result, RoutingError};
use crate::geo::{direct_cap, f_twd, f_tws, loxo_dist, ortho_cap2, ortho_dist};

/// Builds a `SailRoute` from `run`'s recorded destination (or closest-reach)
/// node. The final leg uses `run.last_step_duration` rather than the
/// uniform `dt`, matching the engine's own handling of the partial last
/// step.
pub fn build_route(engine: &IsochroneEngine, run: &IsochroneRun) -> Result<SailRoute> {
    let (dest_iso, dest_pt) = run
        .destination_node
        .ok_or_else(|| RoutingError::Unreached("no node recorded to build a route from".into()))?;

    let mut path = Vec::new();
    let mut iso_idx = dest_iso;
    let mut pt_idx = dest_pt;
    loop {
        let pp = run.isochrones[iso_idx].points[pt_idx];
        path.push(pp);
        match pp.father {
            Some(father_idx) => {
                pt_idx = father_idx;
                iso_idx -= 1;
            }
            None => break,
        }
    }
    path.reverse();

    let dt = engine.config.t_step;
    let n = path.len();
    let mut points = Vec::with_capacity(n);
    // `elapsed` is relative to this leg's own start, so `SailRoute::duration_hours`
    // (the last point's `time_since_start`) reads as a leg duration; wind is
    // still sampled at the absolute hour the grib field expects.
    let mut elapsed = 0.0;

    for i in 0..n {
        let node = path[i];
        let has_next = i + 1 < n;
        let is_final_segment = i + 2 == n;

        let (ortho_cap_to_next, ortho_dist_to_next, loxo_cap_to_next, loxo_dist_to_next, duration) =
            if has_next {
                let next = path[i + 1];
                let duration = if is_final_segment { run.last_step_duration } else { dt };
                (
                    ortho_cap2(node.lat, node.lon, next.lat, next.lon),
                    ortho_dist(node.lat, node.lon, next.lat, next.lon),
                    direct_cap(node.lat, node.lon, next.lat, next.lon),
                    loxo_dist(node.lat, node.lon, next.lat, next.lon),
                    duration,
                )
            } else {
                (0.0, 0.0, 0.0, 0.0, 0.0)
            };

        let flow = engine
            .sample_wind(node.lat, node.lon, run.start_time_hours + elapsed)
            .unwrap_or_default();
        let sog = if duration > 0.0 { ortho_dist_to_next / duration } else { 0.0 };

        points.push(SailPoint {
            time_since_start: elapsed,
            lat: node.lat,
            lon: node.lon,
            ortho_cap_to_next,
            ortho_dist_to_next,
            loxo_cap_to_next,
            loxo_dist_to_next,
            sog,
            u: flow.u,
            v: flow.v,
            gust: flow.gust,
            wave_height: flow.wave_height,
            twd: f_twd(flow.u, flow.v),
            tws: f_tws(flow.u, flow.v),
            sail: node.sail,
            amure: node.amure,
            motor: node.motor,
            target_waypoint: node.target_waypoint,
        });

        elapsed += duration;
    }

    let mut route = SailRoute { points, ..Default::default() };
    route.destination_reached = run.destination_reached();
    route.recompute_aggregates();
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LatLon, OptMode};
    use crate::engine::models::{Amure, Isochrone, Pp};
    use crate::engine::router::EngineState;
    use crate::grib::{FlowCell, GribField, Zone};
    use crate::mask::{ForbidZones, LandMask};
    use crate::polar::PolarMatrix;

    fn flat_polar() -> PolarMatrix {
        PolarMatrix::parse("0;6;12\n40;4.0;6.0\n90;5.0;7.5\n150;3.5;6.5\n").unwrap()
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

    fn node(id: usize, father: Option<usize>, lat: f64, lon: f64, dd: f64) -> Pp {
        Pp {
            id,
            father,
            amure: Amure::Starboard,
            sail: 0,
            motor: false,
            sector: 0,
            target_waypoint: 0,
            lat,
            lon,
            twa: 40.0,
            dd,
            vmc: 0.0,
        }
    }

    #[test]
    fn build_route_walks_father_chain_into_forward_order() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let mut cfg = Config::new(origin, destination);
        cfg.const_wind_tws = 10.0;
        cfg.const_wind_twd = 270.0;
        cfg.t_step = 2.0;
        cfg.opt = OptMode::Distance;
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();
        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);

        let iso0 = Isochrone { points: vec![node(0, None, 45.0, -10.0, 60.0)] };
        let iso1 = Isochrone { points: vec![node(0, Some(0), 45.0, -9.5, 30.0)] };
        let mut dest_node = node(0, Some(0), destination.lat, destination.lon, 0.0);
        dest_node.id = 0;
        let iso2 = Isochrone { points: vec![dest_node] };

        let run = IsochroneRun {
            isochrones: vec![iso0, iso1, iso2],
            iso_desc: Vec::new(),
            state: EngineState::Reached,
            destination_node: Some((2, 0)),
            last_step_duration: 1.5,
            start_time_hours: 0.0,
        };

        let route = build_route(&engine, &run).unwrap();
        assert_eq!(route.points.len(), 3);
        assert!(route.destination_reached);
        assert!((route.points[0].lat - 45.0).abs() < 1e-9);
        assert!((route.points[2].lat - destination.lat).abs() < 1e-9);
        assert!((route.duration_hours - (2.0 + 1.5)).abs() < 1e-9);
        assert!((route.points[2].ortho_dist_to_next).abs() < 1e-9);
    }

    #[test]
    fn build_route_rejects_run_without_destination_node() {
        let origin = LatLon::new(45.0, -10.0);
        let destination = LatLon::new(45.0, -9.0);
        let cfg = Config::new(origin, destination);
        let polar = flat_polar();
        let wind = dummy_wind_field();
        let land_mask = LandMask::new();
        let forbid = ForbidZones::default();
        let engine = IsochroneEngine::new(&polar, None, None, &wind, None, &land_mask, &forbid, &cfg);

        let run = IsochroneRun {
            isochrones: vec![Isochrone { points: vec![node(0, None, 45.0, -10.0, 60.0)] }],
            iso_desc: Vec::new(),
            state: EngineState::Failed,
            destination_node: None,
            last_step_duration: 0.0,
            start_time_hours: 0.0,
        };
        assert!(build_route(&engine, &run).is_err());
    }
}
