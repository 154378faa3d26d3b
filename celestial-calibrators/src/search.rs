//! Target-search mode: enumerate JSDC stars around a science target and
//! verify each one.
//!
//! The cone search is pre-filtered on the server with the JSDC thresholds
//! and the declination limit, so the row cap is spent on plausible
//! candidates. Candidates keep catalogue return order; duplicates (same
//! canonical name) and the target itself are dropped before verification.

use crate::config::{SearchConfiguration, Settings};
use crate::errors::{CalibError, CalibResult};
use crate::model::{canonical_identifier, Catalogue, Row, StarIdentity, StarVerdict};
use crate::query::{fetch_with_failover, CatalogueClient, QueryRequest};
use crate::verify::Verifier;
use std::collections::HashSet;
use tracing::{debug, info};

/// Verdicts for every evaluated candidate, in cone-search order.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub rows_returned: usize,
    pub verdicts: Vec<StarVerdict>,
}

impl SearchOutcome {
    pub fn candidates_evaluated(&self) -> usize {
        self.verdicts.len()
    }

    /// Viable calibrators, preserving query order.
    pub fn calibrators(&self) -> impl Iterator<Item = &StarVerdict> {
        self.verdicts.iter().filter(|v| v.viable())
    }
}

pub struct CandidateEnumerator<'a, C: CatalogueClient + ?Sized> {
    client: &'a C,
    settings: &'a Settings,
}

impl<'a, C: CatalogueClient + ?Sized> CandidateEnumerator<'a, C> {
    pub fn new(client: &'a C, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    fn cone_request(&self, search: &SearchConfiguration) -> QueryRequest {
        let t = &self.settings.thresholds;
        let h_band = match t.h_mag_min {
            Some(min) => format!("{}..{}", min, t.h_mag_max),
            None => format!("<={}", t.h_mag_max),
        };
        QueryRequest::with_radius_deg(Catalogue::Jsdc, search.target.position, search.cone_radius_deg)
            .limit(self.settings.service.row_limit)
            .constrain("Vmag", format!("<{}", t.v_mag_max))
            .constrain("Hmag", h_band)
            .constrain("UDDH", format!("<{}", t.udd_h_max))
            .constrain("_DEJ2000", format!(">{}", search.declination_limit_deg))
    }

    /// Cone search around the target, returning unique candidates in catalogue order.
    ///
    /// # Errors
    /// Returns [`CalibError::Service`] when both endpoints fail; without the
    /// cone search there is nothing to verify.
    pub fn candidates(&self, search: &SearchConfiguration) -> CalibResult<(usize, Vec<StarIdentity>)> {
        let request = self.cone_request(search);
        let rows = fetch_with_failover(self.client, &self.settings.service, &request)
            .map_err(|f| CalibError::service(Catalogue::Jsdc.label(), f.to_string()))?;
        let returned = rows.len();
        let candidates = unique_candidates(&rows, &search.target, self.settings.service.match_radius_arcsec);
        info!(
            target = %search.target.name,
            rows = returned,
            candidates = candidates.len(),
            "candidate cone search"
        );
        Ok((returned, candidates))
    }

    /// Enumerate candidates and verify each independently.
    pub fn find_calibrators(&self, search: &SearchConfiguration) -> CalibResult<SearchOutcome> {
        let (rows_returned, candidates) = self.candidates(search)?;
        let verifier = Verifier::new(self.client, self.settings)
            .with_companion_radius(search.companion_radius_arcsec);

        let verdicts = candidates
            .into_iter()
            .map(|candidate| verifier.verify(candidate))
            .collect();

        Ok(SearchOutcome {
            rows_returned,
            verdicts,
        })
    }
}

/// Candidate identities from cone-search rows.
///
/// Rows without a name or position are skipped. The first row for each
/// canonical name wins; rows within `match_radius_arcsec` of the target are
/// the target itself and are dropped.
pub fn unique_candidates(
    rows: &[Row],
    target: &StarIdentity,
    match_radius_arcsec: f64,
) -> Vec<StarIdentity> {
    let mut seen = HashSet::new();
    seen.insert(target.canonical_key());
    let mut candidates = Vec::new();

    for row in rows {
        let (Some(name), Some(position)) = (row.text("Name"), row.position()) else {
            debug!(?row, "skipping cone-search row without name or position");
            continue;
        };
        if position.separation_arcsec(&target.position) <= match_radius_arcsec {
            continue;
        }
        if !seen.insert(canonical_identifier(name)) {
            debug!(%name, "duplicate candidate");
            continue;
        }
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        candidates.push(StarIdentity::new(name, position).with_v_mag(row.number("Vmag")));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::SkyPosition;

    fn target() -> StarIdentity {
        StarIdentity::new("HD 100", SkyPosition::new(100.0, 20.0))
    }

    fn row(name: &str, ra: f64, dec: f64) -> Row {
        Row::new()
            .with_text("Name", name)
            .with("_RAJ2000", ra)
            .with("_DEJ2000", dec)
            .with("Vmag", 7.0)
    }

    #[test]
    fn test_unique_candidates_preserves_order_and_dedupes() {
        let rows = vec![
            row("HD 3", 101.0, 20.0),
            row("HD 1", 102.0, 21.0),
            row("hd  3", 101.0, 20.0),
            row("HD 2", 103.0, 22.0),
        ];
        let names: Vec<String> = unique_candidates(&rows, &target(), 5.0)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["HD 3", "HD 1", "HD 2"]);
    }

    #[test]
    fn test_target_is_excluded() {
        let rows = vec![row("HD 100", 100.0, 20.0), row("BD+20 1", 100.0001, 20.0)];
        let candidates = unique_candidates(&rows, &target(), 5.0);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_rows_without_position_are_skipped() {
        let rows = vec![Row::new().with_text("Name", "HD 9"), row("HD 8", 99.0, 19.0)];
        let candidates = unique_candidates(&rows, &target(), 5.0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "HD 8");
        assert_eq!(candidates[0].v_mag, Some(7.0));
    }

    #[test]
    fn test_cone_request_filters() {
        let settings = Settings::default();
        let client = crate::query::VizierClient::new(&settings.service).unwrap();
        let enumerator = CandidateEnumerator::new(&client, &settings);
        let search = SearchConfiguration::new(target(), &settings, None, None).unwrap();
        let request = enumerator.cone_request(&search);

        assert_eq!(request.catalogue, Catalogue::Jsdc);
        assert_eq!(request.radius_arcsec, 36000.0);
        assert_eq!(request.row_limit, Some(100));
        assert!(request
            .constraints
            .contains(&("Hmag".to_string(), "<=6.4".to_string())));
        assert!(request
            .constraints
            .contains(&("_DEJ2000".to_string(), ">-25".to_string())));
    }
}
