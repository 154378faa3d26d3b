//! Console and file rendering of verdicts.

use crate::config::SearchConfiguration;
use crate::errors::CalibResult;
use crate::model::{CriterionOutcome, Measurement, Rating, StarVerdict};
use crate::sky::{format_dms, format_hms};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BAD_CALIBRATORS_URL: &str = "https://www.jmmc.fr/badcal/";

/// Multi-line verify-mode report for one star.
pub fn render_verdict(verdict: &StarVerdict, elapsed: Option<Duration>) -> String {
    let name = &verdict.star().name;
    let mut out = String::new();
    let _ = writeln!(out, "Checking calibrator viability of: {}", name);
    for outcome in verdict.outcomes() {
        let _ = writeln!(out, "--> {}", render_outcome(outcome));
    }
    let _ = writeln!(
        out,
        "--> {}/{} checks passed",
        verdict.passed(),
        verdict.attempted()
    );

    let timing = elapsed
        .map(|d| format!(" ({:.2} s)", d.as_secs_f64()))
        .unwrap_or_default();
    match verdict.rating() {
        Rating::Ideal => {
            let _ = writeln!(out, "{} is likely an ideal calibrator{}", name, timing);
        }
        Rating::Usable => {
            let _ = writeln!(out, "{} is likely a usable calibrator{}", name, timing);
        }
        Rating::Unlikely => {
            let _ = writeln!(
                out,
                "{} is unlikely to be a viable calibrator{}",
                name, timing
            );
            let _ = writeln!(
                out,
                "Consider submitting it to the JMMC Bad Calibrators Database: {}",
                BAD_CALIBRATORS_URL
            );
        }
    }
    out
}

fn render_outcome(outcome: &CriterionOutcome) -> String {
    let values = render_measurements(&outcome.measurements);
    let mut line = String::from(outcome.criterion.label());
    match (&outcome.reason, outcome.passed) {
        (_, true) => line.push_str(": passed"),
        (Some(reason), false) => {
            let _ = write!(line, ": FAILED - {}", reason);
        }
        (None, false) => line.push_str(": FAILED"),
    }
    if !values.is_empty() {
        let _ = write!(line, " ({})", values);
    }
    line
}

fn render_measurements(measurements: &[Measurement]) -> String {
    measurements
        .iter()
        .map(|m| format!("{} = {}", m.field, format_value(m.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| v.to_string())
}

/// JSON form of a verify-mode report: the serialized verdict plus `elapsed_secs`.
pub fn verdict_json(verdict: &StarVerdict, elapsed: Duration) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(verdict)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("elapsed_secs".to_string(), json!(elapsed.as_secs_f64()));
    }
    Ok(value)
}

/// `<target>_Calibrators.txt`, with path separators in the target name replaced.
pub fn calibrator_file_name(target: &str) -> String {
    let safe: String = target
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_Calibrators.txt", safe)
}

/// Measured columns of the calibrator table and their decimal places.
const MEASURED_COLUMNS: [(&str, usize); 14] = [
    ("Vmag", 2),
    ("Hmag", 2),
    ("UDDH", 3),
    ("UDDK", 3),
    ("Diam-GAIA", 3),
    ("IPDfmp", 0),
    ("RUWE", 2),
    ("Vbroad", 2),
    ("DMS", 0),
    ("W", 0),
    ("BinH", 0),
    ("BinG2", 0),
    ("CalFlag", 0),
    ("IRflag", 0),
];

/// Fixed-width calibrator table with a comment line describing the target.
pub fn render_calibrator_table<'v>(
    search: &SearchConfiguration,
    calibrators: impl IntoIterator<Item = &'v StarVerdict>,
) -> String {
    let target = &search.target;
    let v_mag = target
        .v_mag
        .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));

    let header = ["Name", "_r", "_RAJ2000", "_DEJ2000"]
        .into_iter()
        .chain(MEASURED_COLUMNS.iter().map(|(name, _)| *name))
        .map(str::to_string)
        .collect::<Vec<_>>();
    let columns = header.len();
    let mut table = vec![header];
    for verdict in calibrators {
        let star = verdict.star();
        let mut row = vec![
            star.name.clone(),
            format!("{:.3}", star.position.separation_deg(&target.position)),
            format_hms(star.position.ra_deg, 2),
            format_dms(star.position.dec_deg, 2),
        ];
        row.extend(MEASURED_COLUMNS.iter().map(|(field, digits)| {
            verdict
                .measurement(field)
                .map_or_else(|| "--".to_string(), |v| format!("{:.*}", digits, v))
        }));
        table.push(row);
    }

    let widths: Vec<usize> = (0..columns)
        .map(|col| table.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Calibrators for {} (RA: {}, DEC: {}, V Mag: {})",
        target.name,
        format_hms(target.position.ra_deg, 2),
        format_dms(target.position.dec_deg, 2),
        v_mag
    );
    for row in &table {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Write the search-mode result file into `dir`, overwriting any previous run.
pub fn write_calibrator_file<'v>(
    dir: &Path,
    search: &SearchConfiguration,
    calibrators: impl IntoIterator<Item = &'v StarVerdict>,
) -> CalibResult<PathBuf> {
    let path = dir.join(calibrator_file_name(&search.target.name));
    fs::write(&path, render_calibrator_table(search, calibrators))?;
    Ok(path)
}
