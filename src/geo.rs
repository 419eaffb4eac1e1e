//! Geo primitives: bearings, distances, wind-angle conversions.
//!
//! Every function here is a direct port of one of the small inlines the
//! original engine relies on (longitude canonicalisation, Givry-corrected
//! orthodromic bearing, rhumb/great-circle distance, true/apparent wind
//! angle conversions). Kept free of any engine state so it can be unit
//! tested in isolation.

pub const EARTH_RADIUS_NM: f64 = 3440.065;
pub const MS_TO_KN: f64 = 3600.0 / 1852.0;
pub const KN_TO_MS: f64 = 1852.0 / 3600.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// A lat/lon point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Canonicalise a longitude to `]-180, 180]`.
pub fn lon_canonize(lon: f64) -> f64 {
    // `f64::rem_euclid` doesn't give the signed remainder C's `remainder()`
    // does; libm's IEEE remainder is what the original relies on for the
    // boundary to land on 180 rather than -180.
    ieee_remainder(lon, 360.0)
}

fn ieee_remainder(x: f64, y: f64) -> f64 {
    let n = (x / y).round();
    x - n * y
}

/// Normalize longitude, optionally into `]-180, 360[` for ante-meridian zones.
pub fn lon_normalize(lon: f64, ante_meridian: bool) -> f64 {
    let lon = lon_canonize(lon);
    if ante_meridian && lon < 0.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// True wind direction (navigational "from" convention) from u,v components.
pub fn f_twd(u: f64, v: f64) -> f64 {
    let val = 180.0 + RAD_TO_DEG * u.atan2(v);
    if val > 180.0 { val - 360.0 } else { val }
}

/// True wind speed in knots from u,v components in m/s.
pub fn f_tws(u: f64, v: f64) -> f64 {
    MS_TO_KN * u.hypot(v)
}

/// True wind angle in `[-180, 180]`; negative means starboard tack.
pub fn f_twa(heading: f64, twd: f64) -> f64 {
    let val = (twd - heading).rem_euclid(360.0);
    if val > 180.0 {
        val - 360.0
    } else if val < -180.0 {
        val + 360.0
    } else {
        val
    }
}

/// Apparent wind angle and speed given TWA, TWS (kn) and SOG (kn).
pub fn f_awa_aws(twa: f64, tws: f64, sog: f64) -> (f64, f64) {
    let a = tws * (DEG_TO_RAD * twa).sin();
    let b = tws * (DEG_TO_RAD * twa).cos() + sog;
    let awa = RAD_TO_DEG * a.atan2(b);
    let aws = a.hypot(b);
    (awa, aws)
}

/// Linear interpolation of `fx` at `x` between `(x0, fx0)` and `(x1, fx1)`.
pub fn interpolate(x: f64, x0: f64, x1: f64, fx0: f64, fx1: f64) -> f64 {
    if x1 == x0 {
        fx0
    } else {
        fx0 + (x - x0) * (fx1 - fx0) / (x1 - x0)
    }
}

/// Givry correction to apply to a loxodromic/direct bearing to obtain the
/// orthodromic initial bearing.
pub fn givry(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    (0.5 * (lon1 - lon2)) * (0.5 * (lat1 + lat2) * DEG_TO_RAD).sin()
}

/// Loxodromic (rhumb-line) initial bearing from origin to destination, degrees.
pub fn direct_cap(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    RAD_TO_DEG
        * ((lon2 - lon1) * (DEG_TO_RAD * 0.5 * (lat1 + lat2)).cos()).atan2(lat2 - lat1)
}

/// Orthodromic (great-circle) initial bearing, Givry-corrected.
///
/// Equivalent to `direct_cap(..) + givry(..)`, inlined to match the
/// original's sign convention exactly: the correction is *subtracted*.
pub fn ortho_cap(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let avg_lat = 0.5 * (lat1 + lat2);
    let delta_lat = lat2 - lat1;
    let delta_lon = lon2 - lon1;
    let avg_lat_rad = avg_lat * DEG_TO_RAD;

    let cap = RAD_TO_DEG * (delta_lon * avg_lat_rad.cos()).atan2(delta_lat);
    let givry_correction = -0.5 * delta_lon * avg_lat_rad.sin();
    cap + givry_correction
}

/// Orthodromic initial bearing via the exact spherical formula, no Givry
/// approximation; returned in `[0, 360)`.
pub fn ortho_cap2(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1 * DEG_TO_RAD;
    let lat2 = lat2 * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (RAD_TO_DEG * y.atan2(x) + 360.0).rem_euclid(360.0)
}

/// Rhumb-line distance in nautical miles.
pub fn loxo_dist(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = DEG_TO_RAD * lat1;
    let lon1_rad = DEG_TO_RAD * lon1;
    let lat2_rad = DEG_TO_RAD * lat2;
    let lon2_rad = DEG_TO_RAD * lon2;

    let delta_lon = lon2_rad - lon1_rad;
    let delta_lat = lat2_rad - lat1_rad;
    let mean_lat = (lat1_rad + lat2_rad) / 2.0;

    let q_num = delta_lat;
    let q_den =
        (std::f64::consts::FRAC_PI_4 + lat2_rad / 2.0).tan()
            / (std::f64::consts::FRAC_PI_4 + lat1_rad / 2.0).tan();
    let mut q = q_num / q_den.ln();
    if q.is_nan() {
        q = mean_lat.cos();
    }

    delta_lat.hypot(q * delta_lon) * EARTH_RADIUS_NM
}

/// Great-circle distance in nautical miles, spherical law of cosines.
pub fn ortho_dist(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1 * DEG_TO_RAD;
    let lat2 = lat2 * DEG_TO_RAD;
    let theta = (lon1 - lon2) * DEG_TO_RAD;

    let cos_dist = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * theta.cos();
    let cos_dist = cos_dist.clamp(-1.0, 1.0);

    let dist_rad = cos_dist.acos();
    60.0 * RAD_TO_DEG * dist_rad
}

/// Great-circle distance in nautical miles, haversine formula. More
/// numerically stable for very short legs than [`ortho_dist`], but costs an
/// extra `sqrt`+`atan2`; kept for parity with the original, not used on the
/// engine's hot path.
pub fn ortho_dist2(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1 * DEG_TO_RAD;
    let lat2 = lat2 * DEG_TO_RAD;
    let d_lat = lat2 - lat1;
    let d_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    60.0 * RAD_TO_DEG * c
}

/// Destination point given a start point, initial bearing (degrees) and
/// distance (nautical miles), following the great-circle forward geodesic.
pub fn destination_point(start: Point, bearing_deg: f64, distance_nm: f64) -> Point {
    let ang_dist = distance_nm / EARTH_RADIUS_NM;
    let lat1 = start.lat * DEG_TO_RAD;
    let lon1 = start.lon * DEG_TO_RAD;
    let brng = bearing_deg * DEG_TO_RAD;

    let lat2 = (lat1.sin() * ang_dist.cos() + lat1.cos() * ang_dist.sin() * brng.cos()).asin();
    let lon2 = lon1
        + (brng.sin() * ang_dist.sin() * lat1.cos())
            .atan2(ang_dist.cos() - lat1.sin() * lat2.sin());

    Point::new(lat2 * RAD_TO_DEG, lon_canonize(lon2 * RAD_TO_DEG))
}
