//! Land/sea bitmap mask and forbidden-zone polygon checks.
//!
//! The land mask follows the original engine's affine transform exactly:
//! a 3601x1801 grid at 0.1 degree resolution, indexed by
//! `iLon = round(lon*10 + 1800)`, `iLat = round(-lat*10 + 900)`
//! (`inline.h:isSea`, `rtypes.h: SIZE_T_IS_SEA`). Forbidden zones are
//! arbitrary polygons checked with the `geo` crate's point-in-polygon test.

use crate::geo::Point;
use geo::algorithm::Contains;
use geo::{Coord as GeoCoord, LineString, Polygon};
use roaring::RoaringBitmap;

pub const GRID_LON: u32 = 3601;
pub const GRID_LAT: u32 = 1801;

/// Land/sea bitmap: bit set means the cell is sea.
#[derive(Debug, Clone, Default)]
pub struct LandMask {
    sea: RoaringBitmap,
}

fn grid_index(lat: f64, lon: f64) -> u32 {
    let i_lon = (lon * 10.0 + 1800.0).round() as i64;
    let i_lat = (-lat * 10.0 + 900.0).round() as i64;
    let i_lon = i_lon.clamp(0, GRID_LON as i64 - 1) as u32;
    let i_lat = i_lat.clamp(0, GRID_LAT as i64 - 1) as u32;
    i_lat * GRID_LON + i_lon
}

impl LandMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mask from a flat `is_sea` bitmap already laid out as
    /// `GRID_LAT x GRID_LON`, e.g. deserialized from a roaring bitmap file.
    pub fn from_bitmap(sea: RoaringBitmap) -> Self {
        Self { sea }
    }

    /// Marks every cell covered by a lat/lon box as sea (test helper and
    /// incremental construction aid).
    pub fn mark_sea_box(&mut self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) {
        let steps_lat = ((max_lat - min_lat) / 0.1).round() as i64;
        let steps_lon = ((max_lon - min_lon) / 0.1).round() as i64;
        for i in 0..=steps_lat.max(0) {
            let lat = min_lat + i as f64 * 0.1;
            for j in 0..=steps_lon.max(0) {
                let lon = min_lon + j as f64 * 0.1;
                self.sea.insert(grid_index(lat, lon));
            }
        }
    }

    /// True if no mask data has been loaded at all — callers should treat
    /// an empty mask as "everywhere is sea" (matches `isSea` returning
    /// `true` when `isSeaArray == NULL`).
    pub fn is_empty(&self) -> bool {
        self.sea.is_empty()
    }

    pub fn is_sea(&self, lat: f64, lon: f64) -> bool {
        if self.is_empty() {
            return true;
        }
        self.sea.contains(grid_index(lat, lon))
    }

    pub fn is_land(&self, lat: f64, lon: f64) -> bool {
        !self.is_sea(lat, lon)
    }
}

/// A forbidden polygon zone; a route point inside any forbidden zone is
/// rejected during successor generation, matching the original `isInZone`
/// style of course-point filtering but at polygon rather than bounding-box
/// granularity.
#[derive(Debug, Clone)]
pub struct ForbidZone {
    polygon: Polygon<f64>,
}

impl ForbidZone {
    pub fn new(points: Vec<Point>) -> Self {
        let coords: Vec<GeoCoord<f64>> = points
            .iter()
            .map(|p| GeoCoord { x: p.lon, y: p.lat })
            .collect();
        let ring = LineString(coords);
        Self {
            polygon: Polygon::new(ring, vec![]),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let pt = geo::Point::new(lon, lat);
        self.polygon.contains(&pt)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForbidZones {
    zones: Vec<ForbidZone>,
}

impl ForbidZones {
    pub fn new(zones: Vec<ForbidZone>) -> Self {
        Self { zones }
    }

    /// Builds a roster from `Config::forbid_zones`'s raw polygon vertex
    /// lists (`(lat, lon)` pairs), up to `MAX_N_FORBID_ZONE` polygons
    /// (spec.md §3); extra polygons are dropped rather than rejected,
    /// matching the non-fatal posture of the rest of the config surface.
    pub fn from_polygons<I, P>(polygons: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = (f64, f64)>,
    {
        let zones = polygons
            .into_iter()
            .take(MAX_N_FORBID_ZONE)
            .map(|poly| ForbidZone::new(poly.into_iter().map(|(lat, lon)| Point::new(lat, lon)).collect()))
            .collect();
        Self { zones }
    }

    pub fn is_forbidden(&self, lat: f64, lon: f64) -> bool {
        self.zones.iter().any(|z| z.contains(lat, lon))
    }
}

/// Forbidden-zone polygon cap (spec.md §3).
pub const MAX_N_FORBID_ZONE: usize = 32;
