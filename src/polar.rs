//! Boat polar table: TWA x TWS -> boat speed, with optional sail matrix,
//! VMG extraction and a load-time diagnostic report.
//!
//! Layout mirrors the original `PolMat`: row 0 (from column 1) holds the
//! TWS breakpoints, column 0 (from row 1) holds the TWA breakpoints, and
//! `t[0][0]` is unused (set to -1 by the reader, kept for parity).

use crate::error::{Result, RoutingError};
use std::path::Path;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Row/column caps a polar table load must not exceed.
pub const MAX_N_POL_MAT_LINES: usize = 64;
pub const MAX_N_POL_MAT_COLS: usize = 48;

/// A polar (or sail) matrix: `t[0][1..]` = TWS breakpoints, `t[1..][0]` =
/// TWA breakpoints, `t[i][j]` (i,j >= 1) = boat speed (or sail index).
#[derive(Debug, Clone)]
pub struct PolarMatrix {
    pub t: Vec<Vec<f64>>,
    pub n_line: usize,
    pub n_col: usize,
}

impl PolarMatrix {
    fn tws_row(&self) -> &[f64] {
        &self.t[0]
    }

    fn twa_at(&self, row: usize) -> f64 {
        self.t[row][0]
    }
}

/// Human-readable non-rejecting diagnostic produced by [`PolarMatrix::check`].
#[derive(Debug, Clone, Default)]
pub struct PolarDiagnostics {
    pub report: String,
}

impl PolarDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.report.is_empty()
    }
}

/// Accept both `.` and `,` as the decimal separator, as the original
/// `strtodNew` does for locale-insensitive polar files.
pub fn parse_cell(s: &str) -> Option<f64> {
    let normalized = s.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok()
}

impl PolarMatrix {
    /// Parse a `;`/tab separated polar CSV. Lines starting with `#` and
    /// lines without a recognised separator are ignored, exactly as
    /// `polar.c:readPolar` does.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut n_col = 0usize;

        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            if !line.contains(';') && !line.contains('\t') {
                continue;
            }
            let tokens: Vec<&str> = line
                .split(|c: char| c == ';' || c == '\t')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            let values: Vec<f64> = tokens.iter().filter_map(|t| parse_cell(t)).collect();
            if values.len() <= 2 {
                continue;
            }
            if rows.is_empty() {
                n_col = values.len();
            }
            rows.push(values);
        }

        if rows.is_empty() {
            return Err(RoutingError::PolarInvalid("empty polar table".into()));
        }
        if rows.len() > MAX_N_POL_MAT_LINES {
            return Err(RoutingError::CapacityExceeded(format!(
                "polar table has {} rows, limit is {MAX_N_POL_MAT_LINES}",
                rows.len()
            )));
        }
        if n_col > MAX_N_POL_MAT_COLS {
            return Err(RoutingError::CapacityExceeded(format!(
                "polar table has {n_col} cols, limit is {MAX_N_POL_MAT_COLS}"
            )));
        }
        if rows.len() < 2 {
            return Err(RoutingError::PolarInvalid("fewer than 2 TWA rows".into()));
        }
        if n_col < 3 {
            return Err(RoutingError::PolarInvalid("fewer than 2 TWS columns".into()));
        }

        let n_line = rows.len();
        let mut t = vec![vec![0.0; n_col]; n_line];
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().take(n_col).enumerate() {
                t[i][j] = v;
            }
        }
        t[0][0] = -1.0;

        Ok(PolarMatrix {
            t,
            n_line,
            n_col,
        })
    }

    /// Non-rejecting sanity report: TWS breakpoints should be
    /// non-decreasing, TWA breakpoints should be non-decreasing, and every
    /// row/column should rise to a single maximum and then fall.
    pub fn check(&self) -> PolarDiagnostics {
        let mut report = String::new();

        for c in 1..self.n_col {
            if self.t[0][c] < self.t[0][c - 1] {
                report.push_str(&format!(
                    "values in row 0 should progress, col: {c}\n"
                ));
            }
        }
        for row in 1..self.n_line {
            if self.t[row][0] < self.t[row - 1][0] {
                report.push_str(&format!(
                    "values in col 0 should progress, row: {row}\n"
                ));
            }
        }
        for row in 1..self.n_line {
            let mut max_in_row = -1.0;
            let mut c_max = 0usize;
            for c in 1..self.n_col {
                if self.t[row][c] > max_in_row {
                    max_in_row = self.t[row][c];
                    c_max = c;
                }
            }
            for c in 2..=c_max {
                if self.t[row][c] < self.t[row][c - 1] {
                    report.push_str(&format!(
                        "values in row {row} should progress at col {c} up to max {max_in_row:.2}\n"
                    ));
                }
            }
            for c in (c_max + 1)..self.n_col {
                if self.t[row][c] > self.t[row][c - 1] {
                    report.push_str(&format!(
                        "values in row {row} should regress at col {c} after max {max_in_row:.2}\n"
                    ));
                }
            }
        }
        for c in 1..self.n_col {
            let mut max_in_col = -1.0;
            let mut row_max = 0usize;
            for row in 1..self.n_line {
                if self.t[row][c] > max_in_col {
                    max_in_col = self.t[row][c];
                    row_max = row;
                }
            }
            for row in 2..=row_max {
                if self.t[row][c] < self.t[row - 1][c] {
                    report.push_str(&format!(
                        "values in col {c} should progress at row {row} up to max {max_in_col:.2}\n"
                    ));
                }
            }
            for row in (row_max + 1)..self.n_line {
                if self.t[row][c] > self.t[row - 1][c] {
                    report.push_str(&format!(
                        "values in col {c} should regress at row {row} after max {max_in_col:.2}\n"
                    ));
                }
            }
        }

        PolarDiagnostics { report }
    }

    pub fn max_value(&self) -> f64 {
        let mut max = 0.0;
        for row in self.t.iter().skip(1) {
            for &v in row.iter().skip(1) {
                if v > max {
                    max = v;
                }
            }
        }
        max
    }

    /// Boat speed at `twa` (signed degrees, folded to `[0,180]`) and `tws`
    /// (knots), with optional sail matrix of identical shape for sail
    /// selection. Mirrors `inline.h:findPolar` exactly: linear scan on TWA,
    /// binary search on TWS, bilinear interpolation, nearest-corner sail.
    pub fn speed_and_sail(&self, twa: f64, tws: f64, sail_mat: Option<&PolarMatrix>) -> (f64, u32) {
        let twa = if twa > 180.0 {
            360.0 - twa
        } else if twa < 0.0 {
            -twa
        } else {
            twa
        };

        let n_line = self.n_line;
        let n_col = self.n_col;

        let mut l = 1usize;
        while l < n_line {
            if self.t[l][0] > twa {
                break;
            }
            l += 1;
        }
        let l_sup = if l < n_line - 1 { l } else { n_line - 1 };
        let l_inf = if l == 1 { 1 } else { l - 1 };

        let c = binary_search(self.tws_row(), n_col - 1, tws);
        let c_sup = if c < n_col - 1 { c } else { n_col - 1 };
        let c_inf = if c == 1 { 1 } else { c - 1 };

        let sail = match sail_mat {
            Some(sm) if sm.n_line == n_line && sm.n_col == n_col => {
                let best_l = if (twa - self.t[l_inf][0]) < (self.t[l_inf][0] - twa) {
                    l_inf
                } else {
                    l_sup
                };
                let best_c = if (tws - self.t[0][c_inf]) < (self.t[0][c_sup] - twa) {
                    c_inf
                } else {
                    c_sup
                };
                sm.t[best_l][best_c] as u32
            }
            _ => 0,
        };

        let l_inf0 = self.twa_at(l_inf);
        let l_sup0 = self.twa_at(l_sup);

        let (s0, s1) = if l_sup0 == l_inf0 {
            (self.t[l_inf][c_inf], self.t[l_inf][c_inf])
        } else {
            let inv_range_l = 1.0 / (l_sup0 - l_inf0);
            let s0 = self.t[l_inf][c_inf]
                + (twa - l_inf0) * (self.t[l_sup][c_inf] - self.t[l_inf][c_inf]) * inv_range_l;
            let s1 = self.t[l_inf][c_sup]
                + (twa - l_inf0) * (self.t[l_sup][c_sup] - self.t[l_inf][c_sup]) * inv_range_l;
            (s0, s1)
        };

        let speed = if self.t[0][c_inf] == self.t[0][c_sup] {
            s0
        } else {
            s0 + (tws - self.t[0][c_inf]) * (s1 - s0) / (self.t[0][c_sup] - self.t[0][c_inf])
        };

        (speed, sail)
    }

    /// Boat speed without sail selection.
    pub fn speed(&self, twa: f64, tws: f64) -> f64 {
        self.speed_and_sail(twa, tws, None).0
    }

    /// Max boat speed across all TWA rows at a given TWS.
    pub fn max_speed_at(&self, tws: f64) -> f64 {
        let n_col = self.n_col;
        let c = binary_search(self.tws_row(), n_col - 1, tws);
        let c_sup = if c < n_col - 1 { c } else { n_col - 1 };
        let c_inf = if c == 1 { 1 } else { c - 1 };

        let mut max = 0.0;
        for l in 1..self.n_line {
            let s0 = self.t[l][c_inf];
            let s1 = self.t[l][c_sup];
            let speed = if self.t[0][c_sup] == self.t[0][c_inf] {
                s0
            } else {
                s0 + (tws - self.t[0][c_inf]) * (s1 - s0) / (self.t[0][c_sup] - self.t[0][c_inf])
            };
            if speed > max {
                max = speed;
            }
        }
        max
    }

    /// Best VMG upwind (TWA <= 90deg): returns (angle, speed).
    pub fn best_vmg_upwind(&self, tws: f64) -> (f64, f64) {
        let mut vmg_speed = -1.0;
        let mut vmg_angle = 0.0;
        for i in 1..self.n_line {
            let twa = self.twa_at(i);
            if twa > 90.0 {
                break;
            }
            let vmg = self.speed(twa, tws) * (DEG_TO_RAD * twa).cos();
            if vmg > vmg_speed {
                vmg_speed = vmg;
                vmg_angle = twa;
            }
        }
        (vmg_angle, vmg_speed)
    }

    /// Best VMG downwind (TWA >= 90deg): returns (angle, speed).
    pub fn best_vmg_downwind(&self, tws: f64) -> (f64, f64) {
        let mut vmg_speed = -1.0;
        let mut vmg_angle = 0.0;
        for i in 1..self.n_line {
            let twa = self.twa_at(i);
            if twa < 90.0 {
                continue;
            }
            let vmg = (self.speed(twa, tws) * (DEG_TO_RAD * twa).cos()).abs();
            if vmg > vmg_speed {
                vmg_speed = vmg;
                vmg_angle = twa;
            }
        }
        (vmg_angle, vmg_speed)
    }
}

/// Dichotomic search over a row whose entries `1..=size` are sorted
/// ascending; returns the first index whose value is strictly greater than
/// `val`, matching `inline.h:binarySearch`.
fn binary_search(row: &[f64], size: usize, val: f64) -> usize {
    let mut low = 1usize;
    let mut high = size;
    while low < high {
        let mid = (low + high) / 2;
        if row[mid] == val {
            return mid + 1;
        }
        if row[mid] > val {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_polar() -> PolarMatrix {
        // TWS breakpoints: 6, 12, 20 kn. TWA breakpoints: 40, 90, 150 deg.
        let text = "\
#comment line ignored
0;6;12;20
40;4.0;6.0;7.0
90;5.0;7.5;8.5
150;3.5;6.5;7.8
";
        PolarMatrix::parse(text).expect("valid polar")
    }

    #[test]
    fn parse_skips_comments_and_keeps_shape() {
        let mat = sample_polar();
        assert_eq!(mat.n_line, 4);
        assert_eq!(mat.n_col, 4);
        assert_eq!(mat.t[1][0], 40.0);
        assert_eq!(mat.t[0][2], 12.0);
    }

    #[test]
    fn parse_accepts_comma_decimal_separator() {
        let text = "0;6;12\n40;4,0;6,0\n90;5,0;7,5\n";
        let mat = PolarMatrix::parse(text).unwrap();
        assert!((mat.t[1][1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn speed_at_breakpoint_matches_table_value() {
        let mat = sample_polar();
        let s = mat.speed(90.0, 12.0);
        assert!((s - 7.5).abs() < 1e-9);
    }

    #[test]
    fn speed_interpolates_between_breakpoints() {
        let mat = sample_polar();
        let s = mat.speed(65.0, 12.0);
        // between 40deg(6.0) and 90deg(7.5) at tws=12
        assert!(s > 6.0 && s < 7.5);
    }

    #[test]
    fn speed_folds_negative_and_over_180_twa() {
        let mat = sample_polar();
        let pos = mat.speed(40.0, 12.0);
        let neg = mat.speed(-40.0, 12.0);
        let wrapped = mat.speed(320.0, 12.0); // 360-320=40
        assert!((pos - neg).abs() < 1e-9);
        assert!((pos - wrapped).abs() < 1e-9);
    }

    #[test]
    fn best_vmg_upwind_stays_within_90_degrees() {
        let mat = sample_polar();
        let (angle, speed) = mat.best_vmg_upwind(12.0);
        assert!(angle <= 90.0);
        assert!(speed > 0.0);
    }

    #[test]
    fn best_vmg_downwind_stays_at_or_above_90_degrees() {
        let mat = sample_polar();
        let (angle, speed) = mat.best_vmg_downwind(12.0);
        assert!(angle >= 90.0);
        assert!(speed > 0.0);
    }

    #[test]
    fn check_flags_non_monotonic_row() {
        let text = "0;6;12\n40;8.0;6.0\n90;5.0;7.5\n";
        let mat = PolarMatrix::parse(text).unwrap();
        let diag = mat.check();
        assert!(!diag.is_clean());
    }

    #[test]
    fn check_is_clean_for_well_formed_table() {
        let mat = sample_polar();
        let diag = mat.check();
        assert!(diag.is_clean(), "unexpected report: {}", diag.report);
    }

    #[test]
    fn sail_selection_uses_nearest_corner() {
        let speeds = "0;6;12\n40;4.0;6.0\n90;5.0;7.5\n";
        let sails = "0;6;12\n40;1;2\n90;3;4\n";
        let speed_mat = PolarMatrix::parse(speeds).unwrap();
        let sail_mat = PolarMatrix::parse(sails).unwrap();
        let (_, sail) = speed_mat.speed_and_sail(40.0, 6.0, Some(&sail_mat));
        assert_eq!(sail, 1);
    }
}
