//! Core isochrone data model: `Pp`, `Isochrone`, `IsoDesc`, `SailPoint`,
//! `SailRoute`, `Competitor`/`CompetitorsList`, `WayPointList` — grounded in
//! `rtypes.h`'s struct definitions, adapted to owned Rust containers per
//! the engine's no-module-statics design note.

use crate::geo::Point;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Amure {
    Port,
    Starboard,
}

/// A single isochrone-frontier node (`rtypes.h: Pp` minus bit-packed flags).
#[derive(Debug, Clone, Copy)]
pub struct Pp {
    pub id: usize,
    /// Index of the producing node in the previous isochrone; `None` only
    /// for the origin node of isochrone 0.
    pub father: Option<usize>,
    pub amure: Amure,
    pub sail: u32,
    pub motor: bool,
    pub sector: i32,
    pub target_waypoint: usize,
    pub lat: f64,
    pub lon: f64,
    /// True wind angle this node was reached on, degrees signed; used by
    /// the next successor-generation pass to detect tack/gybe transitions.
    pub twa: f64,
    /// Orthodromic distance to the current target (destination or
    /// waypoint), nautical miles.
    pub dd: f64,
    /// Velocity made on course: closing speed toward the target, knots.
    pub vmc: f64,
}

impl Pp {
    pub fn position(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// One frontier of retained nodes.
#[derive(Debug, Clone, Default)]
pub struct Isochrone {
    pub points: Vec<Pp>,
}

impl Isochrone {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-isochrone metadata (`rtypes.h: IsoDesc`).
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoDesc {
    pub closest_index: usize,
    pub best_vmc_index: usize,
    pub first_point_index: usize,
    pub size: usize,
    pub focal_lat: f64,
    pub focal_lon: f64,
    pub target_waypoint: usize,
}

/// One retained step of a finalised route (`rtypes.h: SailPoint`).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SailPoint {
    pub time_since_start: f64,
    pub lat: f64,
    pub lon: f64,
    pub ortho_cap_to_next: f64,
    pub ortho_dist_to_next: f64,
    pub loxo_cap_to_next: f64,
    pub loxo_dist_to_next: f64,
    pub sog: f64,
    pub u: f64,
    pub v: f64,
    pub gust: f64,
    pub wave_height: f64,
    pub twd: f64,
    pub tws: f64,
    pub sail: u32,
    pub amure: Amure,
    pub motor: bool,
    pub target_waypoint: usize,
}

/// A finalised route (`rtypes.h: SailRoute`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SailRoute {
    pub points: Vec<SailPoint>,
    pub total_distance: f64,
    pub motor_distance: f64,
    pub port_tack_distance: f64,
    pub starboard_tack_distance: f64,
    pub avg_tws: f64,
    pub max_tws: f64,
    pub avg_gust: f64,
    pub max_gust: f64,
    pub avg_wave: f64,
    pub max_wave: f64,
    pub avg_sog: f64,
    pub max_sog: f64,
    pub sail_changes: usize,
    pub destination_reached: bool,
    pub competitor_index: Option<usize>,
    pub duration_hours: f64,
}

impl SailRoute {
    /// Recomputes every aggregate from `points`; call after the route
    /// builder finishes appending steps.
    pub fn recompute_aggregates(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let mut total = 0.0;
        let mut motor = 0.0;
        let mut port = 0.0;
        let mut starboard = 0.0;
        let mut sum_tws = 0.0;
        let mut max_tws = f64::MIN;
        let mut sum_gust = 0.0;
        let mut max_gust = f64::MIN;
        let mut sum_wave = 0.0;
        let mut max_wave = f64::MIN;
        let mut sum_sog = 0.0;
        let mut max_sog = f64::MIN;
        let mut sail_changes = 0usize;
        let mut last_sail: Option<u32> = None;

        for p in &self.points {
            total += p.ortho_dist_to_next;
            if p.motor {
                motor += p.ortho_dist_to_next;
            } else {
                match p.amure {
                    Amure::Port => port += p.ortho_dist_to_next,
                    Amure::Starboard => starboard += p.ortho_dist_to_next,
                }
            }
            sum_tws += p.tws;
            max_tws = max_tws.max(p.tws);
            sum_gust += p.gust;
            max_gust = max_gust.max(p.gust);
            sum_wave += p.wave_height;
            max_wave = max_wave.max(p.wave_height);
            sum_sog += p.sog;
            max_sog = max_sog.max(p.sog);
            if let Some(prev) = last_sail {
                if prev != p.sail {
                    sail_changes += 1;
                }
            }
            last_sail = Some(p.sail);
        }

        let n = self.points.len() as f64;
        self.total_distance = total;
        self.motor_distance = motor;
        self.port_tack_distance = port;
        self.starboard_tack_distance = starboard;
        self.avg_tws = sum_tws / n;
        self.max_tws = max_tws;
        self.avg_gust = sum_gust / n;
        self.max_gust = max_gust;
        self.avg_wave = sum_wave / n;
        self.max_wave = max_wave;
        self.avg_sog = sum_sog / n;
        self.max_sog = max_sog;
        self.sail_changes = sail_changes;
        self.duration_hours = self
            .points
            .last()
            .map(|p| p.time_since_start)
            .unwrap_or(0.0);
    }
}

/// One competing boat (`rtypes.h: Competitor`).
#[derive(Debug, Clone, Serialize)]
pub struct Competitor {
    pub color_index: u32,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub dist_to_destination: f64,
    pub duration_hours: f64,
    pub eta_hours: f64,
}

/// Competitor roster with a `runIndex` marker (`rtypes.h: CompetitorsList`).
#[derive(Debug, Clone, Default)]
pub struct CompetitorsList {
    pub competitors: Vec<Competitor>,
    /// Index of the last competitor still running; `None` once all have
    /// finished (the original's `runIndex == -1`).
    pub run_index: Option<usize>,
}

/// Ordered intermediate points between origin and destination
/// (`rtypes.h: WayPointList`).
#[derive(Debug, Clone, Default)]
pub struct WayPointList {
    pub points: Vec<Point>,
    pub total_ortho_dist: f64,
    pub total_loxo_dist: f64,
}

impl WayPointList {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            total_ortho_dist: 0.0,
            total_loxo_dist: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_at(t: f64, dist: f64, amure: Amure, sail: u32, motor: bool) -> SailPoint {
        SailPoint {
            time_since_start: t,
            lat: 0.0,
            lon: 0.0,
            ortho_cap_to_next: 0.0,
            ortho_dist_to_next: dist,
            loxo_cap_to_next: 0.0,
            loxo_dist_to_next: dist,
            sog: 6.0,
            u: 0.0,
            v: 0.0,
            gust: 0.0,
            wave_height: 0.0,
            twd: 0.0,
            tws: 10.0,
            sail,
            amure,
            motor,
            target_waypoint: 0,
        }
    }

    #[test]
    fn aggregates_split_distance_by_tack_and_motor() {
        let mut route = SailRoute::default();
        route.points.push(point_at(1.0, 10.0, Amure::Port, 0, false));
        route.points.push(point_at(2.0, 5.0, Amure::Starboard, 0, false));
        route.points.push(point_at(3.0, 2.0, Amure::Port, 0, true));
        route.recompute_aggregates();

        assert!((route.total_distance - 17.0).abs() < 1e-9);
        assert!((route.port_tack_distance - 10.0).abs() < 1e-9);
        assert!((route.starboard_tack_distance - 5.0).abs() < 1e-9);
        assert!((route.motor_distance - 2.0).abs() < 1e-9);
        assert!((route.duration_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn sail_changes_count_transitions_not_steps() {
        let mut route = SailRoute::default();
        route.points.push(point_at(1.0, 1.0, Amure::Port, 0, false));
        route.points.push(point_at(2.0, 1.0, Amure::Port, 0, false));
        route.points.push(point_at(3.0, 1.0, Amure::Port, 1, false));
        route.points.push(point_at(4.0, 1.0, Amure::Port, 1, false));
        route.recompute_aggregates();
        assert_eq!(route.sail_changes, 1);
    }

    #[test]
    fn isochrone_reports_length_and_emptiness() {
        let mut iso = Isochrone::new();
        assert!(iso.is_empty());
        iso.points.push(Pp {
            id: 0,
            father: None,
            amure: Amure::Starboard,
            sail: 0,
            motor: false,
            sector: 0,
            target_waypoint: 0,
            lat: 45.0,
            lon: -10.0,
            twa: 0.0,
            dd: 100.0,
            vmc: 0.0,
        });
        assert_eq!(iso.len(), 1);
        assert!(!iso.is_empty());
    }
}
