//! Gridded meteorological field: zone description, flow samples and
//! bilinear/time interpolation, grounded in `grib.c`'s `findFlow` family.

pub mod decode;

use crate::error::{Result, RoutingError};
use crate::geo::{interpolate, lon_canonize};

/// Missing-value sentinel used throughout the original engine
/// (`rtypes.h: MISSING`). A field holding exactly this value is treated as
/// present-but-near-zero unless a bitmap flag marked it missing, in which
/// case it is substituted with zero before interpolation (`grib.c` read
/// path).
pub const MISSING: f64 = 0.001;

/// One decoded grid point at a single timestamp: wind u/v, gust, wave
/// height, mean-sea-level pressure and precipitation rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowCell {
    pub u: f64,
    pub v: f64,
    pub g: f64,
    pub w: f64,
    pub msl: f64,
    pub prate: f64,
}

/// Geographic + temporal extent and cadence of a decoded grib field,
/// mirroring `rtypes.h: Zone`.
#[derive(Debug, Clone)]
pub struct Zone {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_left: f64,
    pub lon_right: f64,
    pub lat_step: f64,
    pub lon_step: f64,
    pub ante_meridian: bool,
    pub nb_lat: usize,
    pub nb_lon: usize,
    /// Timestamps in hours relative to the field's reference time.
    pub time_stamp: Vec<f64>,
    /// The grib's `dataDate`/`dataTime` reference instant, when the decoder
    /// could read it. A field only ever has one such instant; multi-date
    /// files are rejected at decode time rather than carrying more than
    /// one.
    pub reference_time: Option<chrono::NaiveDateTime>,
}

impl Zone {
    pub fn is_in_zone(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_left && lon <= self.lon_right
    }

    fn ind_lat(&self, lat: f64) -> usize {
        (((lat - self.lat_min) / self.lat_step).round() as i64).clamp(0, self.nb_lat as i64 - 1)
            as usize
    }

    fn ind_lon(&self, lon: f64) -> usize {
        let mut lon = lon;
        if lon < self.lon_left {
            lon += 360.0;
        }
        (((lon - self.lon_left) / self.lon_step).round() as i64).clamp(0, self.nb_lon as i64 - 1)
            as usize
    }

    fn grid_lat(&self, i: usize) -> f64 {
        self.lat_min + i as f64 * self.lat_step
    }

    fn grid_lon(&self, j: usize) -> f64 {
        let lon = self.lon_left + j as f64 * self.lon_step;
        if self.ante_meridian { lon } else { lon_canonize(lon) }
    }

    /// Brackets `t` between two known timestamps, as `findTimeAround` does:
    /// clamps to the first/last timestamp outside the range.
    fn find_time_around(&self, t: f64) -> (usize, usize) {
        if self.time_stamp.is_empty() {
            return (0, 0);
        }
        if t <= self.time_stamp[0] {
            return (0, 0);
        }
        for (k, &ts) in self.time_stamp.iter().enumerate() {
            if (t - ts).abs() < f64::EPSILON {
                return (k, k);
            }
            if t < ts {
                return (k - 1, k);
            }
        }
        let last = self.time_stamp.len() - 1;
        (last, last)
    }

    fn arrondi_min(v: f64, step: f64) -> f64 {
        (v / step).floor() * step
    }

    fn arrondi_max(v: f64, step: f64) -> f64 {
        (v / step).ceil() * step
    }

    /// Four grid corners bracketing `(lat, lon)`, clamped to the zone's
    /// bounds.
    fn find4_points_around(&self, lat: f64, lon: f64) -> (f64, f64, f64, f64) {
        let mut lat_min = Self::arrondi_min(lat, self.lat_step);
        let mut lat_max = Self::arrondi_max(lat, self.lat_step);
        let mut lon_min = Self::arrondi_min(lon, self.lon_step);
        let mut lon_max = Self::arrondi_max(lon, self.lon_step);

        if self.lat_min > lat_min {
            lat_min = self.lat_min;
        }
        if self.lat_max < lat_max {
            lat_max = self.lat_max;
        }
        if self.lon_left > lon_min {
            lon_min = self.lon_left;
        }
        if self.lon_right < lon_max {
            lon_max = self.lon_right;
        }
        if self.lat_max < lat_min {
            lat_min = self.lat_max;
        }
        if self.lat_min > lat_max {
            lat_max = self.lat_min;
        }
        if self.lon_right < lon_min {
            lon_min = self.lon_right;
        }
        if self.lon_left > lon_max {
            lon_max = self.lon_left;
        }
        (lat_min, lat_max, lon_min, lon_max)
    }
}

/// A fully decoded meteo field over one zone across all its timestamps.
#[derive(Debug, Clone)]
pub struct GribField {
    pub zone: Zone,
    /// Flattened `[time][lat][lon]` cells, row-major: index =
    /// `t*nbLat*nbLon + i*nbLon + j`.
    pub cells: Vec<FlowCell>,
}

/// A point-sample of the field, returned by [`GribField::sample`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowSample {
    pub u: f64,
    pub v: f64,
    pub gust: f64,
    pub wave_height: f64,
    pub msl: f64,
    pub prate: f64,
}

impl GribField {
    fn cell(&self, t: usize, i: usize, j: usize) -> FlowCell {
        self.cells[t * self.zone.nb_lat * self.zone.nb_lon + i * self.zone.nb_lon + j]
    }

    /// Bilinear (space) + linear (time) interpolation of the flow at
    /// `(lat, lon, t)`. `t` is expressed in the same hour units as
    /// `zone.time_stamp`. Returns `None` if the point or time falls outside
    /// the zone, mirroring `findFlow`'s `false` return.
    pub fn sample(&self, lat: f64, lon: f64, t: f64) -> Option<FlowSample> {
        if self.zone.nb_lat == 0 || !self.zone.is_in_zone(lat, lon) || t < 0.0 {
            return None;
        }

        let (i_t0, i_t1) = self.zone.find_time_around(t);
        let (lat_min, lat_max, lon_min, lon_max) = self.zone.find4_points_around(lat, lon);

        let i_lat_max = self.zone.ind_lat(lat_max);
        let i_lat_min = self.zone.ind_lat(lat_min);
        let j_lon_min = self.zone.ind_lon(lon_min);
        let j_lon_max = self.zone.ind_lon(lon_max);

        let sample_at_time = |t_idx: usize| -> (f64, f64, f64, f64, f64, f64) {
            let p00 = self.cell(t_idx, i_lat_max, j_lon_min);
            let p01 = self.cell(t_idx, i_lat_max, j_lon_max);
            let p10 = self.cell(t_idx, i_lat_min, j_lon_max);
            let p11 = self.cell(t_idx, i_lat_min, j_lon_min);

            let lat00 = self.zone.grid_lat(i_lat_max);
            let lat10 = self.zone.grid_lat(i_lat_min);
            let lon00 = self.zone.grid_lon(j_lon_min);
            let lon01 = self.zone.grid_lon(j_lon_max);
            let lon10 = lon01;
            let lon11 = lon00;

            let bilinear = |v00: f64, v01: f64, v10: f64, v11: f64| -> f64 {
                let a = interpolate(lon, lon00, lon01, v00, v01);
                let b = interpolate(lon, lon10, lon11, v10, v11);
                interpolate(lat, lat00, lat10, a, b)
            };

            (
                bilinear(p00.u, p01.u, p10.u, p11.u),
                bilinear(p00.v, p01.v, p10.v, p11.v),
                bilinear(p00.g, p01.g, p10.g, p11.g),
                bilinear(p00.w, p01.w, p10.w, p11.w),
                bilinear(p00.msl, p01.msl, p10.msl, p11.msl),
                bilinear(p00.prate, p01.prate, p10.prate, p11.prate),
            )
        };

        let (u0, v0, g0, w0, msl0, prate0) = sample_at_time(i_t0);
        let (u1, v1, g1, w1, msl1, prate1) = sample_at_time(i_t1);

        let t0 = self.zone.time_stamp[i_t0];
        let t1 = self.zone.time_stamp[i_t1];

        Some(FlowSample {
            u: interpolate(t, t0, t1, u0, u1),
            v: interpolate(t, t0, t1, v0, v1),
            gust: interpolate(t, t0, t1, g0, g1),
            wave_height: interpolate(t, t0, t1, w0, w1),
            msl: interpolate(t, t0, t1, msl0, msl1),
            prate: interpolate(t, t0, t1, prate0, prate1),
        })
    }
}

/// Non-fatal data-quality report produced while decoding a grib file,
/// grounded in `grib.c:checkGrib`/`consistentGrib`.
#[derive(Debug, Clone, Default)]
pub struct GribDiagnostics {
    pub u_missing: usize,
    pub v_missing: usize,
    pub g_missing: usize,
    pub w_missing: usize,
    pub u_strange: usize,
    pub v_strange: usize,
    pub w_strange: usize,
    pub g_strange: usize,
    pub out_zone: usize,
    pub regular_time_step: bool,
}

impl GribDiagnostics {
    /// Maximum plausible wind/gust speed (m/s) before a value is flagged
    /// strange, and maximum plausible wave height (m).
    const MAX_UV: f64 = 100.0;
    const MAX_W: f64 = 20.0;

    pub fn compute(field: &GribField) -> Self {
        let mut diag = GribDiagnostics {
            regular_time_step: Self::time_step_regular(&field.zone),
            ..Default::default()
        };

        for k in 0..field.zone.time_stamp.len() {
            for i in 0..field.zone.nb_lat {
                for j in 0..field.zone.nb_lon {
                    let cell = field.cell(k, i, j);
                    if cell.u == MISSING {
                        diag.u_missing += 1;
                    } else if cell.u.abs() > Self::MAX_UV {
                        diag.u_strange += 1;
                    }
                    if cell.v == MISSING {
                        diag.v_missing += 1;
                    } else if cell.v.abs() > Self::MAX_UV {
                        diag.v_strange += 1;
                    }
                    if cell.w == MISSING {
                        diag.w_missing += 1;
                    } else if !(0.0..=Self::MAX_W).contains(&cell.w) {
                        diag.w_strange += 1;
                    }
                    if cell.g == MISSING {
                        diag.g_missing += 1;
                    } else if !(0.0..=Self::MAX_UV).contains(&cell.g) {
                        diag.g_strange += 1;
                    }
                    let lat = field.zone.grid_lat(i);
                    let lon = field.zone.grid_lon(j);
                    if !field.zone.is_in_zone(lat, lon) {
                        diag.out_zone += 1;
                    }
                }
            }
        }
        diag
    }

    fn time_step_regular(zone: &Zone) -> bool {
        if zone.time_stamp.len() < 2 {
            return true;
        }
        let step = zone.time_stamp[1] - zone.time_stamp[0];
        zone.time_stamp.windows(2).all(|w| (w[1] - w[0] - step).abs() < f64::EPSILON)
    }

    pub fn is_clean(&self) -> bool {
        self.u_missing == 0
            && self.v_missing == 0
            && self.g_missing == 0
            && self.u_strange == 0
            && self.v_strange == 0
            && self.w_strange == 0
            && self.g_strange == 0
            && self.out_zone == 0
    }
}

pub fn check_uv_present(short_names: &[String]) -> Result<()> {
    let u = short_names.iter().any(|s| s == "10u" || s == "u" || s == "ucurr");
    let v = short_names.iter().any(|s| s == "10v" || s == "v" || s == "vcurr");
    if u && v {
        Ok(())
    } else {
        Err(RoutingError::InvalidGrib("missing u or v component".into()))
    }
}
