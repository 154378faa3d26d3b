//! Run configuration: viability thresholds, service endpoints and search defaults.
//!
//! [`Settings`] is built once at startup (defaults, optionally overlaid by a
//! TOML file), validated, and then passed by reference to the verifier and
//! the candidate search. Nothing reads configuration from globals.
//!
//! ```toml
//! [thresholds]
//! h_mag_max = 6.0
//! ruwe_max = 1.2
//!
//! [service]
//! alternate_vizier_url = "https://vizier.cfa.harvard.edu"
//! ```

use crate::errors::{CalibError, CalibResult};
use crate::model::StarIdentity;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_VIZIER_URL: &str = "https://vizier.cds.unistra.fr";
pub const DEFAULT_ALTERNATE_VIZIER_URL: &str = "https://vizier.nao.ac.jp";
pub const DEFAULT_SIMBAD_TAP_URL: &str = "https://simbad.cds.unistra.fr/simbad/sim-tap/sync";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub thresholds: Thresholds,
    pub service: ServiceSettings,
    pub search: SearchDefaults,
}

/// Numeric viability criteria. Upper bounds are strict unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// JSDC V magnitude must be brighter (smaller) than this.
    pub v_mag_max: f64,
    /// Inclusive lower edge of the H band. `None` leaves the band open below.
    pub h_mag_min: Option<f64>,
    /// Inclusive upper edge of the H band.
    pub h_mag_max: f64,
    /// JSDC H-band uniform-disk diameter limit, in mas.
    pub udd_h_max: f64,
    /// Gaia `ipd_frac_multi_peak` limit, in percent.
    pub ipd_frac_multi_peak_max: f64,
    pub ruwe_max: f64,
    /// Gaia line-broadening velocity limit, in km/s.
    pub vbroad_max: f64,
    /// Stars at or south of this declination (degrees) are unobservable.
    pub declination_limit_deg: f64,
    /// Only Gaia neighbours at least this bright (Gmag) count as companions.
    pub companion_g_mag_max: Option<f64>,
    /// MDFC `Diam-GAIA` must agree with JSDC `UDDH` and `UDDK` to within this, in mas.
    pub diameter_tolerance_mas: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            v_mag_max: 9.0,
            h_mag_min: None,
            h_mag_max: 6.4,
            udd_h_max: 0.4,
            ipd_frac_multi_peak_max: 2.0,
            ruwe_max: 1.4,
            vbroad_max: 100.0,
            declination_limit_deg: -25.0,
            companion_g_mag_max: None,
            diameter_tolerance_mas: 0.075,
        }
    }
}

impl Thresholds {
    pub fn h_band_contains(&self, h_mag: f64) -> bool {
        self.h_mag_min.map_or(true, |min| h_mag >= min) && h_mag <= self.h_mag_max
    }

    pub fn is_observable(&self, dec_deg: f64) -> bool {
        dec_deg > self.declination_limit_deg
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSettings {
    pub vizier_url: String,
    /// Mirror tried once when a query against `vizier_url` fails.
    pub alternate_vizier_url: Option<String>,
    pub simbad_url: String,
    pub timeout_secs: u64,
    /// Maximum distance, in arcseconds, for a row to count as the queried star.
    pub match_radius_arcsec: f64,
    /// Row cap for cone searches.
    pub row_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            vizier_url: DEFAULT_VIZIER_URL.to_string(),
            alternate_vizier_url: Some(DEFAULT_ALTERNATE_VIZIER_URL.to_string()),
            simbad_url: DEFAULT_SIMBAD_TAP_URL.to_string(),
            timeout_secs: 60,
            match_radius_arcsec: 5.0,
            row_limit: 100,
        }
    }
}

impl ServiceSettings {
    /// Swap the primary and alternate VizieR endpoints.
    pub fn prefer_alternate(&mut self) {
        if let Some(alternate) = self.alternate_vizier_url.take() {
            let primary = std::mem::replace(&mut self.vizier_url, alternate);
            self.alternate_vizier_url = Some(primary);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchDefaults {
    /// Cone radius for candidate enumeration, in degrees.
    pub cone_radius_deg: f64,
    /// Companion-exclusion radius used when the check is enabled without an explicit radius.
    pub companion_radius_arcsec: f64,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            cone_radius_deg: 10.0,
            companion_radius_arcsec: 10.0,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file and validate them.
    pub fn load(path: Option<&Path>) -> CalibResult<Self> {
        let settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    CalibError::configuration(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> CalibResult<Self> {
        toml::from_str(text).map_err(|e| CalibError::configuration(e.to_string()))
    }

    pub fn validate(&self) -> CalibResult<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("v_mag_max", t.v_mag_max),
            ("h_mag_max", t.h_mag_max),
            ("udd_h_max", t.udd_h_max),
            ("ipd_frac_multi_peak_max", t.ipd_frac_multi_peak_max),
            ("ruwe_max", t.ruwe_max),
            ("vbroad_max", t.vbroad_max),
        ] {
            require_finite(name, value)?;
        }
        for (name, value) in [
            ("udd_h_max", t.udd_h_max),
            ("ipd_frac_multi_peak_max", t.ipd_frac_multi_peak_max),
            ("ruwe_max", t.ruwe_max),
            ("vbroad_max", t.vbroad_max),
            ("diameter_tolerance_mas", t.diameter_tolerance_mas),
        ] {
            require_positive(name, value)?;
        }
        if let Some(min) = t.h_mag_min {
            require_finite("h_mag_min", min)?;
            if min > t.h_mag_max {
                return Err(CalibError::configuration(format!(
                    "H band is empty: h_mag_min {} > h_mag_max {}",
                    min, t.h_mag_max
                )));
            }
        }
        if let Some(g) = t.companion_g_mag_max {
            require_finite("companion_g_mag_max", g)?;
        }
        require_finite("declination_limit_deg", t.declination_limit_deg)?;
        if !(-90.0..=90.0).contains(&t.declination_limit_deg) {
            return Err(CalibError::configuration(format!(
                "declination_limit_deg {} is outside [-90, 90]",
                t.declination_limit_deg
            )));
        }

        let s = &self.service;
        require_http("vizier_url", &s.vizier_url)?;
        if let Some(alternate) = &s.alternate_vizier_url {
            require_http("alternate_vizier_url", alternate)?;
        }
        require_http("simbad_url", &s.simbad_url)?;
        if s.timeout_secs == 0 {
            return Err(CalibError::configuration("timeout_secs must be at least 1"));
        }
        if s.row_limit == 0 {
            return Err(CalibError::configuration("row_limit must be at least 1"));
        }
        require_positive("match_radius_arcsec", s.match_radius_arcsec)?;

        validate_cone_radius(self.search.cone_radius_deg)?;
        validate_companion_radius(self.search.companion_radius_arcsec)?;
        Ok(())
    }
}

pub fn validate_cone_radius(radius_deg: f64) -> CalibResult<()> {
    require_positive("cone radius", radius_deg)?;
    if radius_deg > 180.0 {
        return Err(CalibError::configuration(format!(
            "cone radius {} deg exceeds 180",
            radius_deg
        )));
    }
    Ok(())
}

pub fn validate_companion_radius(radius_arcsec: f64) -> CalibResult<()> {
    require_positive("companion radius", radius_arcsec)
}

fn require_finite(name: &str, value: f64) -> CalibResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalibError::configuration(format!("{} must be finite", name)))
    }
}

fn require_positive(name: &str, value: f64) -> CalibResult<()> {
    require_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(CalibError::configuration(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

fn require_http(name: &str, url: &str) -> CalibResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(CalibError::configuration(format!(
            "{} must be an http(s) URL, got '{}'",
            name, url
        )))
    }
}

/// Per-run options for target-search mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfiguration {
    pub target: StarIdentity,
    /// Companion-exclusion radius in arcseconds; `None` disables the check.
    pub companion_radius_arcsec: Option<f64>,
    pub declination_limit_deg: f64,
    pub cone_radius_deg: f64,
}

impl SearchConfiguration {
    /// Build a search configuration, validating operator-supplied radii.
    pub fn new(
        target: StarIdentity,
        settings: &Settings,
        companion_radius_arcsec: Option<f64>,
        cone_radius_deg: Option<f64>,
    ) -> CalibResult<Self> {
        if let Some(radius) = companion_radius_arcsec {
            validate_companion_radius(radius)?;
        }
        let cone_radius_deg = cone_radius_deg.unwrap_or(settings.search.cone_radius_deg);
        validate_cone_radius(cone_radius_deg)?;
        Ok(Self {
            target,
            companion_radius_arcsec,
            declination_limit_deg: settings.thresholds.declination_limit_deg,
            cone_radius_deg,
        })
    }
}
