//! Scripted catalogue client and resolver shared by the integration tests.

#![allow(dead_code)]

use celestial_calibrators::config::Settings;
use celestial_calibrators::model::{Catalogue, Row, ServiceFailure, StarIdentity};
use celestial_calibrators::query::{CatalogueClient, NameResolver, QueryRequest};
use celestial_calibrators::sky::SkyPosition;
use celestial_calibrators::{CalibError, CalibResult};
use std::cell::RefCell;
use std::collections::HashMap;

pub const PRIMARY: &str = "http://primary.test";
pub const ALTERNATE: &str = "http://alternate.test";

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.service.vizier_url = PRIMARY.to_string();
    settings.service.alternate_vizier_url = Some(ALTERNATE.to_string());
    settings
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: String,
    pub catalogue: Catalogue,
    pub radius_arcsec: f64,
    pub row_limit: Option<usize>,
}

/// Answers each (endpoint, catalogue) pair with a fixed response.
/// Unscripted pairs return no rows.
#[derive(Default)]
pub struct ScriptedClient {
    responses: HashMap<(String, Catalogue), Result<Vec<Row>, ServiceFailure>>,
    /// Answer for row-limited requests, i.e. candidate cone searches.
    cone: Option<Result<Vec<Row>, ServiceFailure>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, endpoint: &str, catalogue: Catalogue, rows: Vec<Row>) -> Self {
        self.responses
            .insert((endpoint.to_string(), catalogue), Ok(rows));
        self
    }

    pub fn failing(mut self, endpoint: &str, catalogue: Catalogue) -> Self {
        self.responses.insert(
            (endpoint.to_string(), catalogue),
            Err(ServiceFailure::new(endpoint, "HTTP 503 Service Unavailable")),
        );
        self
    }

    pub fn cone_rows(mut self, rows: Vec<Row>) -> Self {
        self.cone = Some(Ok(rows));
        self
    }

    pub fn cone_failing(mut self) -> Self {
        self.cone = Some(Err(ServiceFailure::new(PRIMARY, "connection timed out")));
        self
    }

    /// Every catalogue on `PRIMARY` answers with a passing row for `star`.
    pub fn all_passing(star: &StarIdentity) -> Self {
        Self::new()
            .rows(PRIMARY, Catalogue::Jsdc, vec![jsdc_row(star, 6.8, 5.9, 0.27)])
            .rows(PRIMARY, Catalogue::GaiaDr3, vec![gaia_row(0.1, 0.0, 0.95, 12.0)])
            .rows(PRIMARY, Catalogue::Kervella2019, vec![kervella_row(star, [0.0; 4])])
            .rows(PRIMARY, Catalogue::Mdfc, vec![mdfc_row(star, 0.0, 0.0, 0.28)])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

impl CatalogueClient for ScriptedClient {
    fn fetch_rows(&self, endpoint: &str, request: &QueryRequest) -> Result<Vec<Row>, ServiceFailure> {
        self.calls.borrow_mut().push(Call {
            endpoint: endpoint.to_string(),
            catalogue: request.catalogue,
            radius_arcsec: request.radius_arcsec,
            row_limit: request.row_limit,
        });
        if request.row_limit.is_some() {
            return self.cone.clone().unwrap_or_else(|| Ok(Vec::new()));
        }
        self.responses
            .get(&(endpoint.to_string(), request.catalogue))
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Resolves names from a fixed table; anything else is unknown.
#[derive(Default)]
pub struct StaticResolver {
    stars: HashMap<String, StarIdentity>,
}

impl StaticResolver {
    pub fn with(mut self, star: StarIdentity) -> Self {
        self.stars.insert(star.name.clone(), star);
        self
    }
}

impl NameResolver for StaticResolver {
    fn resolve(&self, name: &str) -> CalibResult<StarIdentity> {
        self.stars
            .get(name.trim())
            .cloned()
            .ok_or_else(|| CalibError::resolution(name, "not found in SIMBAD"))
    }
}

pub fn star(name: &str, ra: f64, dec: f64) -> StarIdentity {
    StarIdentity::new(name, SkyPosition::new(ra, dec))
}

pub fn jsdc_row(star: &StarIdentity, v: f64, h: f64, uddh: f64) -> Row {
    Row::new()
        .with("_r", 0.2)
        .with_text("Name", &star.name)
        .with("Vmag", v)
        .with("Hmag", h)
        .with("UDDH", uddh)
        .with("UDDK", uddh)
}

pub fn gaia_row(r: f64, ipdfmp: f64, ruwe: f64, vbroad: f64) -> Row {
    Row::new()
        .with("_r", r)
        .with("IPDfmp", ipdfmp)
        .with("RUWE", ruwe)
        .with("Vbroad", vbroad)
}

pub fn kervella_row(star: &StarIdentity, flags: [f64; 4]) -> Row {
    Row::new()
        .with("_r", 0.3)
        .with_text("Name", &star.name)
        .with("DMS", flags[0])
        .with("W", flags[1])
        .with("BinH", flags[2])
        .with("BinG2", flags[3])
}

pub fn mdfc_row(star: &StarIdentity, cal_flag: f64, ir_flag: f64, diam_gaia: f64) -> Row {
    Row::new()
        .with("_r", 0.1)
        .with_text("Name", &star.name)
        .with("CalFlag", cal_flag)
        .with("IRflag", ir_flag)
        .with("Diam-GAIA", diam_gaia)
}

/// A JSDC cone-search row as returned around a target.
pub fn cone_row(name: &str, ra: f64, dec: f64) -> Row {
    Row::new()
        .with_text("Name", name)
        .with("_RAJ2000", ra)
        .with("_DEJ2000", dec)
        .with("Vmag", 7.5)
}
