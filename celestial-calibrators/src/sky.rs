//! Sky positions, angular separation and sexagesimal formatting.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

pub const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// ICRS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Angular distance to `other`, in degrees.
    pub fn separation_deg(&self, other: &SkyPosition) -> f64 {
        angular_separation_deg(self.ra_deg, self.dec_deg, other.ra_deg, other.dec_deg)
    }

    /// Angular distance to `other`, in arcseconds.
    pub fn separation_arcsec(&self, other: &SkyPosition) -> f64 {
        self.separation_deg(other) * ARCSEC_PER_DEGREE
    }

    /// Right ascension as `HH MM SS.ss`.
    pub fn ra_hms(&self) -> String {
        format_hms(self.ra_deg, 2)
    }

    /// Declination as `±DD MM SS.ss`.
    pub fn dec_dms(&self) -> String {
        format_dms(self.dec_deg, 2)
    }
}

/// Compute angular distance between two points on the sphere using the Vincenty formula.
///
/// Accurate at all angular separations, including the near-zero separations
/// typical of cross-match radii.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let (d1_sin, d1_cos) = (dec1_deg * DEG_TO_RAD).sin_cos();
    let (d2_sin, d2_cos) = (dec2_deg * DEG_TO_RAD).sin_cos();
    let (dl_sin, dl_cos) = ((ra2_deg - ra1_deg) * DEG_TO_RAD).sin_cos();

    let num1 = d2_cos * dl_sin;
    let num2 = d1_cos * d2_sin - d1_sin * d2_cos * dl_cos;
    let den = d1_sin * d2_sin + d1_cos * d2_cos * dl_cos;

    (num1 * num1 + num2 * num2).sqrt().atan2(den) * RAD_TO_DEG
}

/// Format an angle given in degrees as hours-minutes-seconds, wrapping into [0, 24h).
pub fn format_hms(deg: f64, frac_digits: usize) -> String {
    let hours = deg.rem_euclid(360.0) / 15.0;
    let (h, m, s) = split_sexagesimal(hours, frac_digits);
    let h = h % 24;
    format!(
        "{:02} {:02} {:0width$.prec$}",
        h,
        m,
        s,
        width = seconds_width(frac_digits),
        prec = frac_digits
    )
}

/// Format an angle given in degrees as signed degrees-arcminutes-arcseconds.
pub fn format_dms(deg: f64, frac_digits: usize) -> String {
    let sign = if deg < 0.0 { '-' } else { '+' };
    let (d, m, s) = split_sexagesimal(deg.abs(), frac_digits);
    format!(
        "{}{:02} {:02} {:0width$.prec$}",
        sign,
        d,
        m,
        s,
        width = seconds_width(frac_digits),
        prec = frac_digits
    )
}

fn seconds_width(frac_digits: usize) -> usize {
    if frac_digits == 0 {
        2
    } else {
        3 + frac_digits
    }
}

// Rounds on the smallest displayed unit first so 59.999s carries into the minute.
fn split_sexagesimal(value: f64, frac_digits: usize) -> (u64, u64, f64) {
    let scale = 10f64.powi(frac_digits as i32);
    let ticks = (value * 3600.0 * scale).round() as u64;
    let ticks_per_minute = (60.0 * scale) as u64;
    let ticks_per_unit = ticks_per_minute * 60;

    let whole = ticks / ticks_per_unit;
    let rem = ticks % ticks_per_unit;
    let minutes = rem / ticks_per_minute;
    let seconds = (rem % ticks_per_minute) as f64 / scale;
    (whole, minutes, seconds)
}
