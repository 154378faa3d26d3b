//! Criterion evaluators.
//!
//! Each evaluator is a pure function of one catalogue row and the
//! thresholds. Every sub-check is evaluated even after one fails, so the
//! outcome carries all measured values and every reason. A field that is
//! absent or null fails its sub-check with a reason naming the field.
//!
//! | Criterion | Fields | Pass condition |
//! |-----------|--------|----------------|
//! | [`DiameterBrightness`](Criterion::DiameterBrightness) | `Vmag`, `Hmag`, `UDDH` | `Vmag < v_mag_max`, `Hmag` in the H band, `UDDH < udd_h_max` |
//! | [`AstrometricMultiplicity`](Criterion::AstrometricMultiplicity) | `IPDfmp`, `RUWE`, `Vbroad` | each below its limit |
//! | [`Binarity`](Criterion::Binarity) | `DMS`, `W`, `BinH`, `BinG2` | all zero |
//! | [`InfraredExcess`](Criterion::InfraredExcess) | `CalFlag`, `IRflag`, `Diam-GAIA` | both flags zero; `Diam-GAIA` within tolerance of JSDC `UDDH` and `UDDK` |
//! | [`CompanionProximity`](Criterion::CompanionProximity) | `_r`, `Gmag` | no other source within the radius |

use crate::config::Thresholds;
use crate::model::{
    Catalogue, CatalogueQueryResult, Criterion, CriterionOutcome, Measurement, QueryStatus, Row,
};

pub const NO_UNAMBIGUOUS_MATCH: &str = "no unambiguous match";
pub const SERVICE_UNAVAILABLE: &str = "service unavailable";

/// Turn one catalogue lookup into its outcome.
///
/// `jsdc` is the star's JSDC row when that lookup succeeded; the MDFC
/// diameter comparison needs it.
pub fn evaluate(
    result: &CatalogueQueryResult,
    thresholds: &Thresholds,
    jsdc: Option<&Row>,
) -> CriterionOutcome {
    let criterion = Criterion::for_catalogue(result.catalogue);
    match &result.status {
        QueryStatus::Found(row) => evaluate_row(result.catalogue, row, thresholds, jsdc),
        QueryStatus::NotFound => CriterionOutcome::fail(criterion, vec![], NO_UNAMBIGUOUS_MATCH),
        QueryStatus::Ambiguous(rows) => CriterionOutcome::fail(
            criterion,
            vec![Measurement::new("candidate rows", Some(rows.len() as f64))],
            NO_UNAMBIGUOUS_MATCH,
        ),
        QueryStatus::ServiceError(_) => {
            CriterionOutcome::fail(criterion, vec![], SERVICE_UNAVAILABLE)
        }
    }
}

fn evaluate_row(
    catalogue: Catalogue,
    row: &Row,
    thresholds: &Thresholds,
    jsdc: Option<&Row>,
) -> CriterionOutcome {
    match catalogue {
        Catalogue::Jsdc => diameter_brightness(row, thresholds),
        Catalogue::GaiaDr3 => astrometric_multiplicity(row, thresholds),
        Catalogue::Kervella2019 => binarity(row),
        Catalogue::Mdfc => infrared_excess(row, jsdc, thresholds),
    }
}

/// JSDC: V magnitude, H band and H-band uniform-disk diameter.
pub fn diameter_brightness(row: &Row, t: &Thresholds) -> CriterionOutcome {
    let mut checks = Checks::new(row);
    checks.below("Vmag", t.v_mag_max);
    checks.in_h_band("Hmag", t);
    checks.below("UDDH", t.udd_h_max);
    checks.note("UDDK");
    checks.finish(Criterion::DiameterBrightness)
}

/// Gaia DR3: multi-peak fraction, RUWE and line broadening.
pub fn astrometric_multiplicity(row: &Row, t: &Thresholds) -> CriterionOutcome {
    let mut checks = Checks::new(row);
    checks.below("IPDfmp", t.ipd_frac_multi_peak_max);
    checks.below("RUWE", t.ruwe_max);
    checks.below("Vbroad", t.vbroad_max);
    checks.finish(Criterion::AstrometricMultiplicity)
}

/// Kervella et al. 2019: the four binarity indicators.
pub fn binarity(row: &Row) -> CriterionOutcome {
    let mut checks = Checks::new(row);
    for flag in ["DMS", "W", "BinH", "BinG2"] {
        checks.zero(flag);
    }
    checks.finish(Criterion::Binarity)
}

/// MDFC: calibrator and infrared-excess flags, and agreement of the MDFC
/// Gaia-based diameter with the JSDC uniform-disk diameters.
///
/// Without a JSDC row the comparison is skipped; the JSDC criterion already
/// fails in that case.
pub fn infrared_excess(row: &Row, jsdc: Option<&Row>, t: &Thresholds) -> CriterionOutcome {
    let mut checks = Checks::new(row);
    checks.zero("CalFlag");
    checks.zero("IRflag");
    if let Some(jsdc) = jsdc {
        let diam = checks.read("Diam-GAIA");
        for field in ["UDDH", "UDDK"] {
            match (diam, jsdc.number(field)) {
                (Some(d), Some(udd)) if (d - udd).abs() >= t.diameter_tolerance_mas => {
                    checks.failures.push(format!(
                        "Diam-GAIA {} differs from {} {} by {:.3} mas (tolerance {})",
                        d,
                        field,
                        udd,
                        (d - udd).abs(),
                        t.diameter_tolerance_mas
                    ));
                }
                (_, None) => checks.failures.push(format!("missing JSDC {}", field)),
                _ => {}
            }
        }
    }
    checks.finish(Criterion::InfraredExcess)
}

/// Companion check over the rows of a Gaia cone search around the star.
///
/// Rows are in ascending `_r` order. The nearest row within
/// `match_radius_arcsec` is taken to be the star itself; every other row
/// within `radius_arcsec` is a companion, unless `g_mag_max` is set and the
/// row is known to be fainter than it.
pub fn companion_proximity(
    rows: &[Row],
    radius_arcsec: f64,
    match_radius_arcsec: f64,
    g_mag_max: Option<f64>,
) -> CriterionOutcome {
    let self_index = rows.iter().position(|row| {
        row.separation_arcsec()
            .is_some_and(|r| r <= match_radius_arcsec)
    });

    let companions: Vec<&Row> = rows
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != self_index)
        .map(|(_, row)| row)
        .filter(|row| row.separation_arcsec().map_or(true, |r| r <= radius_arcsec))
        .filter(|row| match (g_mag_max, row.number("Gmag")) {
            (Some(limit), Some(g)) => g <= limit,
            _ => true,
        })
        .collect();

    let nearest = companions
        .iter()
        .filter_map(|row| row.separation_arcsec())
        .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.min(r))));

    let measurements = vec![
        Measurement::new("companions", Some(companions.len() as f64)),
        Measurement::new("nearest companion (arcsec)", nearest),
    ];

    if companions.is_empty() {
        CriterionOutcome::pass(Criterion::CompanionProximity, measurements)
    } else {
        let reason = match nearest {
            Some(r) => format!(
                "{} Gaia DR3 source(s) within {}\", nearest at {:.2}\"",
                companions.len(),
                radius_arcsec,
                r
            ),
            None => format!(
                "{} Gaia DR3 source(s) within {}\"",
                companions.len(),
                radius_arcsec
            ),
        };
        CriterionOutcome::fail(Criterion::CompanionProximity, measurements, reason)
    }
}

/// Accumulates sub-check results for one row.
struct Checks<'a> {
    row: &'a Row,
    measurements: Vec<Measurement>,
    failures: Vec<String>,
}

impl<'a> Checks<'a> {
    fn new(row: &'a Row) -> Self {
        Self {
            row,
            measurements: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn read(&mut self, field: &str) -> Option<f64> {
        let value = self.row.number(field);
        self.measurements.push(Measurement::new(field, value));
        if value.is_none() {
            self.failures.push(format!("missing {}", field));
        }
        value
    }

    fn below(&mut self, field: &str, limit: f64) {
        if let Some(v) = self.read(field) {
            if v >= limit {
                self.failures
                    .push(format!("{} {} is not below {}", field, v, limit));
            }
        }
    }

    /// Record an informational value; absence is not a failure.
    fn note(&mut self, field: &str) {
        let value = self.row.number(field);
        self.measurements.push(Measurement::new(field, value));
    }

    fn in_h_band(&mut self, field: &str, t: &Thresholds) {
        if let Some(v) = self.read(field) {
            if t.h_band_contains(v) {
                return;
            }
            match t.h_mag_min {
                Some(min) if v < min => self
                    .failures
                    .push(format!("{} {} is brighter than {}", field, v, min)),
                _ => self
                    .failures
                    .push(format!("{} {} exceeds {}", field, v, t.h_mag_max)),
            }
        }
    }

    fn zero(&mut self, field: &str) {
        if let Some(v) = self.read(field) {
            if v != 0.0 {
                self.failures.push(format!("{} = {} (expected 0)", field, v));
            }
        }
    }

    fn finish(self, criterion: Criterion) -> CriterionOutcome {
        if self.failures.is_empty() {
            CriterionOutcome::pass(criterion, self.measurements)
        } else {
            CriterionOutcome::fail(criterion, self.measurements, self.failures.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceFailure;

    fn jsdc(v: f64, h: f64, udd: f64) -> Row {
        Row::new().with("Vmag", v).with("Hmag", h).with("UDDH", udd)
    }

    fn kervella(dms: f64, w: f64, bin_h: f64, bin_g2: f64) -> Row {
        Row::new()
            .with("DMS", dms)
            .with("W", w)
            .with("BinH", bin_h)
            .with("BinG2", bin_g2)
    }

    #[test]
    fn test_jsdc_passing_row() {
        let outcome = diameter_brightness(&jsdc(6.82, 5.87, 0.270), &Thresholds::default());
        assert!(outcome.passed);
        assert_eq!(outcome.reason, None);
        assert_eq!(outcome.measurement("UDDH"), Some(0.270));
        assert_eq!(outcome.catalogue, Catalogue::Jsdc);
    }

    #[test]
    fn test_jsdc_faint_v_fails() {
        let outcome = diameter_brightness(&jsdc(9.5, 5.87, 0.270), &Thresholds::default());
        assert!(!outcome.passed);
        let reason = outcome.reason.unwrap();
        assert!(reason.contains("Vmag 9.5 is not below 9"));
        assert!(!reason.contains("Hmag"));
    }

    #[test]
    fn test_jsdc_bounds_are_strict_for_v_and_udd() {
        let t = Thresholds::default();
        assert!(!diameter_brightness(&jsdc(9.0, 5.0, 0.2), &t).passed);
        assert!(!diameter_brightness(&jsdc(8.0, 5.0, 0.4), &t).passed);
        assert!(diameter_brightness(&jsdc(8.0, 6.4, 0.2), &t).passed);
    }

    #[test]
    fn test_jsdc_h_band_lower_edge() {
        let t = Thresholds {
            h_mag_min: Some(4.0),
            ..Thresholds::default()
        };
        let outcome = diameter_brightness(&jsdc(6.0, 3.5, 0.2), &t);
        assert!(!outcome.passed);
        assert!(outcome.reason.unwrap().contains("Hmag 3.5 is brighter than 4"));
    }

    #[test]
    fn test_missing_field_named_in_reason() {
        let row = Row::new().with("Vmag", 6.0).with("UDDH", 0.2);
        let outcome = diameter_brightness(&row, &Thresholds::default());
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("missing Hmag"));
        assert_eq!(outcome.measurement("Vmag"), Some(6.0));
        assert_eq!(outcome.measurement("Hmag"), None);
    }

    #[test]
    fn test_gaia_passing_and_failing() {
        let t = Thresholds::default();
        let good = Row::new().with("IPDfmp", 0.0).with("RUWE", 0.98).with("Vbroad", 12.0);
        assert!(astrometric_multiplicity(&good, &t).passed);

        let binary = Row::new().with("IPDfmp", 3.0).with("RUWE", 2.1).with("Vbroad", 12.0);
        let outcome = astrometric_multiplicity(&binary, &t);
        let reason = outcome.reason.unwrap();
        assert!(reason.contains("IPDfmp"));
        assert!(reason.contains("RUWE 2.1"));
    }

    #[test]
    fn test_gaia_rapid_rotator_fails() {
        let row = Row::new().with("IPDfmp", 0.0).with("RUWE", 1.0).with("Vbroad", 100.0);
        let outcome = astrometric_multiplicity(&row, &Thresholds::default());
        assert!(!outcome.passed);
        assert!(outcome.reason.unwrap().contains("Vbroad"));
    }

    #[test]
    fn test_gaia_missing_vbroad() {
        let row = Row::new().with("IPDfmp", 0.0).with("RUWE", 1.0);
        let outcome = astrometric_multiplicity(&row, &Thresholds::default());
        assert_eq!(outcome.reason.as_deref(), Some("missing Vbroad"));
    }

    #[test]
    fn test_kervella_all_zero_passes() {
        assert!(binarity(&kervella(0.0, 0.0, 0.0, 0.0)).passed);
    }

    #[test]
    fn test_kervella_dms_fails_with_reason() {
        let outcome = binarity(&kervella(1.0, 0.0, 0.0, 0.0));
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("DMS = 1 (expected 0)"));
    }

    #[test]
    fn test_kervella_missing_flag_named() {
        let row = Row::new().with("DMS", 0.0).with("W", 0.0).with("BinH", 0.0);
        let outcome = binarity(&row);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("missing BinG2"));
        assert_eq!(outcome.measurement("DMS"), Some(0.0));
    }

    #[test]
    fn test_mdfc_flags() {
        let t = Thresholds::default();
        let ok = Row::new().with("CalFlag", 0.0).with("IRflag", 0.0);
        assert!(infrared_excess(&ok, None, &t).passed);

        let excess = Row::new().with("CalFlag", 0.0).with("IRflag", 7.0);
        let outcome = infrared_excess(&excess, None, &t);
        assert!(!outcome.passed);
        assert!(outcome.reason.unwrap().contains("IRflag"));
    }

    #[test]
    fn test_mdfc_missing_cal_flag_named() {
        let row = Row::new().with("IRflag", 0.0);
        let outcome = infrared_excess(&row, None, &Thresholds::default());
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some("missing CalFlag"));
    }

    fn mdfc(diam: f64) -> Row {
        Row::new()
            .with("CalFlag", 0.0)
            .with("IRflag", 0.0)
            .with("Diam-GAIA", diam)
    }

    fn jsdc_udd(uddh: f64, uddk: f64) -> Row {
        jsdc(6.0, 5.0, uddh).with("UDDK", uddk)
    }

    #[test]
    fn test_consistent_diameters_pass() {
        let outcome = infrared_excess(&mdfc(0.30), Some(&jsdc_udd(0.27, 0.28)), &Thresholds::default());
        assert!(outcome.passed);
        assert_eq!(outcome.measurement("Diam-GAIA"), Some(0.30));
    }

    #[test]
    fn test_inconsistent_diameter_fails() {
        let outcome = infrared_excess(&mdfc(0.9), Some(&jsdc_udd(0.27, 0.27)), &Thresholds::default());
        assert!(!outcome.passed);
        let reason = outcome.reason.unwrap();
        assert!(reason.contains("differs from UDDH 0.27 by 0.630 mas"));
        assert!(reason.contains("differs from UDDK 0.27"));
    }

    #[test]
    fn test_diameter_tolerance_is_configurable() {
        let jsdc = jsdc_udd(0.25, 0.25);
        let t = Thresholds::default();
        assert!(!infrared_excess(&mdfc(0.45), Some(&jsdc), &t).passed);

        let loose = Thresholds {
            diameter_tolerance_mas: 0.5,
            ..Thresholds::default()
        };
        assert!(infrared_excess(&mdfc(0.45), Some(&jsdc), &loose).passed);
    }

    #[test]
    fn test_diameter_check_needs_both_diameters() {
        let t = Thresholds::default();
        let no_diam = Row::new().with("CalFlag", 0.0).with("IRflag", 0.0);
        let outcome = infrared_excess(&no_diam, Some(&jsdc_udd(0.27, 0.27)), &t);
        assert_eq!(outcome.reason.as_deref(), Some("missing Diam-GAIA"));

        let outcome = infrared_excess(&mdfc(0.27), Some(&jsdc(6.0, 5.0, 0.27)), &t);
        assert_eq!(outcome.reason.as_deref(), Some("missing JSDC UDDK"));
    }

    #[test]
    fn test_mdfc_outcome_uses_jsdc_row_through_evaluate() {
        let result = CatalogueQueryResult::new(Catalogue::Mdfc, QueryStatus::Found(mdfc(0.9)));
        let t = Thresholds::default();
        assert!(evaluate(&result, &t, None).passed);
        assert!(!evaluate(&result, &t, Some(&jsdc_udd(0.27, 0.27))).passed);
    }

    #[test]
    fn test_not_found_and_ambiguous_fail_without_data() {
        let t = Thresholds::default();
        let not_found = CatalogueQueryResult::new(Catalogue::Kervella2019, QueryStatus::NotFound);
        let outcome = evaluate(&not_found, &t, None);
        assert_eq!(outcome.criterion, Criterion::Binarity);
        assert_eq!(outcome.reason.as_deref(), Some(NO_UNAMBIGUOUS_MATCH));

        let ambiguous = CatalogueQueryResult::new(
            Catalogue::GaiaDr3,
            QueryStatus::Ambiguous(vec![Row::new(), Row::new()]),
        );
        let outcome = evaluate(&ambiguous, &t, None);
        assert!(!outcome.passed);
        assert_eq!(outcome.measurement("candidate rows"), Some(2.0));
    }

    #[test]
    fn test_service_error_outcome() {
        let result = CatalogueQueryResult::service_error(
            Catalogue::Mdfc,
            ServiceFailure::new("https://vizier.example", "timed out after 60 s"),
        );
        let outcome = evaluate(&result, &Thresholds::default(), None);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason.as_deref(), Some(SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let t = Thresholds::default();
        let result = CatalogueQueryResult::new(
            Catalogue::Jsdc,
            QueryStatus::Found(jsdc(9.5, 7.0, 0.5)),
        );
        assert_eq!(evaluate(&result, &t, None), evaluate(&result, &t, None));
    }

    #[test]
    fn test_companions_excludes_the_star_itself() {
        let rows = vec![
            Row::new().with("_r", 0.2).with("Gmag", 6.0),
            Row::new().with("_r", 14.0).with("Gmag", 15.0),
        ];
        let outcome = companion_proximity(&rows, 10.0, 5.0, None);
        assert!(outcome.passed);
        assert_eq!(outcome.measurement("companions"), Some(0.0));
    }

    #[test]
    fn test_companion_within_radius_fails() {
        let rows = vec![
            Row::new().with("_r", 0.2).with("Gmag", 6.0),
            Row::new().with("_r", 3.4).with("Gmag", 17.5),
        ];
        let outcome = companion_proximity(&rows, 10.0, 5.0, None);
        assert!(!outcome.passed);
        assert!(outcome.reason.unwrap().contains("nearest at 3.40\""));
    }

    #[test]
    fn test_faint_companion_ignored_with_magnitude_limit() {
        let rows = vec![
            Row::new().with("_r", 0.2).with("Gmag", 6.0),
            Row::new().with("_r", 3.4).with("Gmag", 17.5),
        ];
        let outcome = companion_proximity(&rows, 10.0, 5.0, Some(12.0));
        assert!(outcome.passed);
    }

    #[test]
    fn test_no_gaia_rows_means_no_companions() {
        let outcome = companion_proximity(&[], 10.0, 5.0, None);
        assert!(outcome.passed);
    }
}
