//! VizieR catalogue client.
//!
//! Queries go to the ASU VOTable interface (`/viz-bin/votable`) of whichever
//! endpoint the caller names, so the same client serves the primary service
//! and its mirror. Responses are sorted by distance from the query centre and
//! carry the computed `_r`, `_RAJ2000` and `_DEJ2000` columns in addition to
//! the catalogue's own columns.

use super::votable::{parse_votable, VoTable};
use super::{CatalogueClient, QueryRequest};
use crate::config::ServiceSettings;
use crate::errors::{CalibError, CalibResult};
use crate::model::{Row, ServiceFailure, Value, SEPARATION_COLUMN};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

const VOTABLE_PATH: &str = "/viz-bin/votable";

pub struct VizierClient {
    http: Client,
    timeout: Duration,
}

impl VizierClient {
    /// Build a client honouring the configured timeout.
    ///
    /// Idle connections are not pooled, so nothing stays open between the
    /// queries made for one star or after it is finished.
    pub fn new(service: &ServiceSettings) -> CalibResult<Self> {
        let timeout = Duration::from_secs(service.timeout_secs);
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| {
                CalibError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { http, timeout })
    }

    fn url(endpoint: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), VOTABLE_PATH)
    }

    /// Timeouts in either the request or the body read are reported as such.
    fn transport_failure(&self, endpoint: &str, context: &str, e: reqwest::Error) -> ServiceFailure {
        if e.is_timeout() {
            ServiceFailure::new(
                endpoint,
                format!("timed out after {} s", self.timeout.as_secs()),
            )
        } else {
            ServiceFailure::new(endpoint, format!("{}: {}", context, e))
        }
    }

    fn query_params(request: &QueryRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("-source".to_string(), request.catalogue.vizier_id().to_string()),
            (
                "-c".to_string(),
                format!("{:.6} {:+.6}", request.center.ra_deg, request.center.dec_deg),
            ),
            ("-c.rs".to_string(), format!("{}", request.radius_arcsec)),
            ("-out".to_string(), request.catalogue.columns().join(",")),
            ("-out.add".to_string(), "_r,_RAJ,_DEJ".to_string()),
            ("-oc.form".to_string(), "d".to_string()),
            ("-sort".to_string(), "_r".to_string()),
            (
                "-out.max".to_string(),
                request
                    .row_limit
                    .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
            ),
        ];
        params.extend(request.constraints.iter().cloned());
        params
    }
}

impl CatalogueClient for VizierClient {
    fn fetch_rows(&self, endpoint: &str, request: &QueryRequest) -> Result<Vec<Row>, ServiceFailure> {
        let url = Self::url(endpoint);
        debug!(catalogue = %request.catalogue, %url, radius_arcsec = request.radius_arcsec, "VizieR query");

        let response = self
            .http
            .get(&url)
            .query(&Self::query_params(request))
            .send()
            .map_err(|e| self.transport_failure(endpoint, "Network request failed", e))?;

        if !response.status().is_success() {
            return Err(ServiceFailure::new(
                endpoint,
                format!("HTTP request failed with status: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .map_err(|e| self.transport_failure(endpoint, "Failed to read response", e))?;

        let table = parse_votable(&body).map_err(|e| ServiceFailure::new(endpoint, e.to_string()))?;
        let rows = rows_in_arcsec(table);
        debug!(catalogue = %request.catalogue, rows = rows.len(), "VizieR response");
        Ok(rows)
    }
}

/// Rescale the `_r` column to arcseconds according to its declared unit.
fn rows_in_arcsec(table: VoTable) -> Vec<Row> {
    let factor = match table.field(SEPARATION_COLUMN).and_then(|f| f.unit.as_deref()) {
        Some("arcmin") => 60.0,
        Some("deg") => 3600.0,
        _ => 1.0,
    };
    let mut rows = table.rows;
    if factor != 1.0 {
        for row in &mut rows {
            if let Some(r) = row.number(SEPARATION_COLUMN) {
                row.insert(SEPARATION_COLUMN, Value::Number(r * factor));
            }
        }
    }
    rows
}

pub(crate) fn user_agent() -> String {
    format!("celestial-calibrators/{}", env!("CARGO_PKG_VERSION"))
}
