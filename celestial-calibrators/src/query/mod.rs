//! Remote catalogue access.
//!
//! - [`CatalogueClient`]: one positional query against one catalogue table
//! - [`NameResolver`]: star name to coordinates
//! - [`vizier`] / [`simbad`]: HTTP implementations of the two traits
//! - [`votable`]: response decoding shared by both services
//!
//! Transport problems never escape as errors from a catalogue query: they
//! come back as [`ServiceFailure`] values so the verifier can fold them into
//! a verdict.

pub mod simbad;
pub mod vizier;
pub mod votable;

pub use simbad::SimbadResolver;
pub use vizier::VizierClient;

use crate::config::ServiceSettings;
use crate::errors::CalibResult;
use crate::model::{
    Catalogue, CatalogueQueryResult, QueryStatus, Row, ServiceFailure, StarIdentity,
};
use crate::sky::{SkyPosition, ARCSEC_PER_DEGREE};
use tracing::warn;

/// A positional query against a single catalogue table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub catalogue: Catalogue,
    pub center: SkyPosition,
    pub radius_arcsec: f64,
    /// Server-side row cap. `None` asks for every matching row.
    pub row_limit: Option<usize>,
    /// Column constraints in VizieR syntax, e.g. `("Vmag", "<9.0")`.
    pub constraints: Vec<(String, String)>,
}

impl QueryRequest {
    pub fn around(catalogue: Catalogue, center: SkyPosition, radius_arcsec: f64) -> Self {
        Self {
            catalogue,
            center,
            radius_arcsec,
            row_limit: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_radius_deg(catalogue: Catalogue, center: SkyPosition, radius_deg: f64) -> Self {
        Self::around(catalogue, center, radius_deg * ARCSEC_PER_DEGREE)
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.row_limit = Some(rows);
        self
    }

    pub fn constrain(mut self, column: &str, constraint: impl Into<String>) -> Self {
        self.constraints.push((column.to_string(), constraint.into()));
        self
    }
}

/// Executes catalogue queries against a named service endpoint.
///
/// Implementations return rows ordered by increasing distance from the
/// query centre, with the `_r` column in arcseconds.
pub trait CatalogueClient {
    fn fetch_rows(&self, endpoint: &str, request: &QueryRequest) -> Result<Vec<Row>, ServiceFailure>;

    /// Look up a single star and classify the answer.
    ///
    /// `radius_arcsec` overrides `match_radius_arcsec` as the search radius.
    fn query(
        &self,
        endpoint: &str,
        catalogue: Catalogue,
        star: &StarIdentity,
        match_radius_arcsec: f64,
        radius_arcsec: Option<f64>,
    ) -> CatalogueQueryResult {
        let request = QueryRequest::around(
            catalogue,
            star.position,
            radius_arcsec.unwrap_or(match_radius_arcsec),
        );
        match self.fetch_rows(endpoint, &request) {
            Ok(rows) => CatalogueQueryResult::classify(catalogue, star, rows, match_radius_arcsec),
            Err(failure) => CatalogueQueryResult::service_error(catalogue, failure),
        }
    }
}

/// Resolves a star name to a canonical identity.
pub trait NameResolver {
    /// # Errors
    /// Returns [`CalibError::Resolution`](crate::CalibError::Resolution) when
    /// the name is unknown or the service cannot be reached.
    fn resolve(&self, name: &str) -> CalibResult<StarIdentity>;
}

/// Run `request` on the primary endpoint, retrying once on the alternate if one is configured.
pub fn fetch_with_failover<C: CatalogueClient + ?Sized>(
    client: &C,
    service: &ServiceSettings,
    request: &QueryRequest,
) -> Result<Vec<Row>, ServiceFailure> {
    match client.fetch_rows(&service.vizier_url, request) {
        Ok(rows) => Ok(rows),
        Err(failure) => match &service.alternate_vizier_url {
            Some(alternate) => {
                warn!(
                    catalogue = %request.catalogue,
                    %failure,
                    alternate = %alternate,
                    "query failed, retrying on alternate endpoint"
                );
                client.fetch_rows(alternate, request)
            }
            None => Err(failure),
        },
    }
}

/// Single-star lookup with the same one-retry failover as [`fetch_with_failover`].
pub fn query_with_failover<C: CatalogueClient + ?Sized>(
    client: &C,
    service: &ServiceSettings,
    catalogue: Catalogue,
    star: &StarIdentity,
) -> CatalogueQueryResult {
    let radius = service.match_radius_arcsec;
    let first = client.query(&service.vizier_url, catalogue, star, radius, None);
    if let (QueryStatus::ServiceError(failure), Some(alternate)) =
        (&first.status, &service.alternate_vizier_url)
    {
        warn!(
            %catalogue,
            star = %star.name,
            %failure,
            alternate = %alternate,
            "lookup failed, retrying on alternate endpoint"
        );
        return client.query(alternate, catalogue, star, radius, None);
    }
    first
}
