//! SIMBAD name resolution over the TAP synchronous endpoint.

use super::votable::parse_votable;
use super::NameResolver;
use crate::config::ServiceSettings;
use crate::errors::{CalibError, CalibResult};
use crate::model::{canonical_identifier, StarIdentity};
use crate::sky::SkyPosition;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

pub struct SimbadResolver {
    http: Client,
    url: String,
}

impl SimbadResolver {
    pub fn new(service: &ServiceSettings) -> CalibResult<Self> {
        let http = Client::builder()
            .user_agent(super::vizier::user_agent())
            .timeout(Duration::from_secs(service.timeout_secs))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| {
                CalibError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            http,
            url: service.simbad_url.clone(),
        })
    }
}

/// ADQL for one identifier. Single quotes are doubled per ADQL string syntax.
fn identifier_query(name: &str) -> String {
    let id = name.trim().replace('\'', "''");
    format!(
        "SELECT TOP 1 basic.main_id, basic.ra, basic.dec, allfluxes.V \
         FROM basic JOIN ident ON ident.oidref = basic.oid \
         LEFT JOIN allfluxes ON allfluxes.oidref = basic.oid \
         WHERE ident.id = '{}'",
        id
    )
}

impl NameResolver for SimbadResolver {
    fn resolve(&self, name: &str) -> CalibResult<StarIdentity> {
        let query = identifier_query(name);
        debug!(%name, url = %self.url, "SIMBAD lookup");

        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("REQUEST", "doQuery"),
                ("LANG", "ADQL"),
                ("FORMAT", "votable"),
                ("QUERY", query.as_str()),
            ])
            .send()
            .map_err(|e| CalibError::resolution(name, format!("SIMBAD request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CalibError::resolution(
                name,
                format!("SIMBAD returned status {}", response.status()),
            ));
        }

        let body = response
            .text()
            .map_err(|e| CalibError::resolution(name, format!("Failed to read response: {}", e)))?;
        let table = parse_votable(&body).map_err(|e| CalibError::resolution(name, e.to_string()))?;

        let row = table
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| CalibError::resolution(name, "not found in SIMBAD"))?;

        let main_id = row
            .text("main_id")
            .map(|id| id.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| name.trim().to_string());
        let (ra, dec) = match (row.number("ra"), row.number("dec")) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => {
                return Err(CalibError::resolution(
                    name,
                    "SIMBAD entry has no coordinates",
                ))
            }
        };

        let mut alternate_ids = Vec::new();
        if canonical_identifier(name) != canonical_identifier(&main_id) {
            alternate_ids.push(name.trim().to_string());
        }

        Ok(StarIdentity::new(main_id, SkyPosition::new(ra, dec))
            .with_alternate_ids(alternate_ids)
            .with_v_mag(row.number("V")))
    }
}
