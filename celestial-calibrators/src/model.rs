//! Data model shared by the query, evaluation and reporting layers.
//!
//! Everything here is data-only: no network or filesystem side effects.
//! [`StarVerdict`] can only be produced through [`VerdictBuilder::finish`],
//! which is the single place where `passed`, `attempted` and `viable` are
//! computed.

use crate::sky::SkyPosition;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Column carrying the angular distance from the query centre, normalised to arcseconds.
pub const SEPARATION_COLUMN: &str = "_r";
/// Computed J2000 right ascension column, in degrees.
pub const RA_COLUMN: &str = "_RAJ2000";
/// Computed J2000 declination column, in degrees.
pub const DEC_COLUMN: &str = "_DEJ2000";

/// A resolved star. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarIdentity {
    pub name: String,
    pub position: SkyPosition,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_ids: Vec<String>,
    /// Johnson V magnitude reported by the resolver, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_mag: Option<f64>,
}

impl StarIdentity {
    pub fn new(name: impl Into<String>, position: SkyPosition) -> Self {
        Self {
            name: name.into(),
            position,
            alternate_ids: Vec::new(),
            v_mag: None,
        }
    }

    pub fn with_alternate_ids(mut self, ids: Vec<String>) -> Self {
        self.alternate_ids = ids;
        self
    }

    pub fn with_v_mag(mut self, v_mag: Option<f64>) -> Self {
        self.v_mag = v_mag;
        self
    }

    /// Key used to deduplicate identifiers: internal whitespace collapsed, case folded.
    pub fn canonical_key(&self) -> String {
        canonical_identifier(&self.name)
    }
}

/// Collapse runs of whitespace and fold case, so `"HD  1234"` and `"hd 1234"` compare equal.
pub fn canonical_identifier(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A single cell of a catalogue row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

/// One catalogue row: column name → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    pub fn with(mut self, column: &str, value: f64) -> Self {
        self.insert(column, Value::Number(value));
        self
    }

    pub fn with_text(mut self, column: &str, value: &str) -> Self {
        self.insert(column, Value::Text(value.to_string()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Numeric value of `column`. Null, absent and non-finite cells are `None`.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.values.get(column)? {
            Value::Number(v) if v.is_finite() => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Trimmed, non-empty text value of `column`.
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.values.get(column)? {
            Value::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    pub fn separation_arcsec(&self) -> Option<f64> {
        self.number(SEPARATION_COLUMN)
    }

    pub fn position(&self) -> Option<SkyPosition> {
        Some(SkyPosition::new(
            self.number(RA_COLUMN)?,
            self.number(DEC_COLUMN)?,
        ))
    }

}

/// The four catalogues consulted for every star, in query order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Catalogue {
    /// JMMC Stellar Diameters Catalogue v2.
    Jsdc,
    /// Gaia DR3 main source table.
    GaiaDr3,
    /// Kervella et al. 2019 proper-motion anomaly catalogue.
    Kervella2019,
    /// Cruzalèbes et al. 2019 Mid-infrared stellar Diameters and Fluxes Catalogue.
    Mdfc,
}

impl Catalogue {
    pub const VERIFICATION_ORDER: [Catalogue; 4] = [
        Catalogue::Jsdc,
        Catalogue::GaiaDr3,
        Catalogue::Kervella2019,
        Catalogue::Mdfc,
    ];

    /// VizieR table identifier.
    pub fn vizier_id(&self) -> &'static str {
        match self {
            Catalogue::Jsdc => "II/346/jsdc_v2",
            Catalogue::GaiaDr3 => "I/355/gaiadr3",
            Catalogue::Kervella2019 => "J/A+A/623/A72/hipgpma",
            Catalogue::Mdfc => "II/361/mdfc-v10",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Catalogue::Jsdc => "JSDC",
            Catalogue::GaiaDr3 => "Gaia DR3",
            Catalogue::Kervella2019 => "Kervella et al. 2019",
            Catalogue::Mdfc => "MDFC",
        }
    }

    /// Columns requested from VizieR, in addition to `_r` and the J2000 position.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Catalogue::Jsdc => &["Name", "Vmag", "Hmag", "UDDH", "UDDK"],
            Catalogue::GaiaDr3 => &["Gmag", "IPDfmp", "RUWE", "Vbroad"],
            Catalogue::Kervella2019 => &["Name", "DMS", "W", "BinH", "BinG2"],
            Catalogue::Mdfc => &["Name", "Diam-GAIA", "CalFlag", "IRflag"],
        }
    }

    /// Column holding a star name comparable with SIMBAD identifiers, if any.
    pub fn name_column(&self) -> Option<&'static str> {
        match self {
            Catalogue::Jsdc | Catalogue::Kervella2019 | Catalogue::Mdfc => Some("Name"),
            Catalogue::GaiaDr3 => None,
        }
    }
}

impl fmt::Display for Catalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transport-level query failure (timeout, HTTP status, malformed response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub endpoint: String,
    pub detail: String,
}

impl ServiceFailure {
    pub fn new(endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.detail, self.endpoint)
    }
}

/// Classification of a single-star catalogue lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus {
    Found(Row),
    NotFound,
    Ambiguous(Vec<Row>),
    ServiceError(ServiceFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueQueryResult {
    pub catalogue: Catalogue,
    pub status: QueryStatus,
}

impl CatalogueQueryResult {
    pub fn new(catalogue: Catalogue, status: QueryStatus) -> Self {
        Self { catalogue, status }
    }

    pub fn service_error(catalogue: Catalogue, failure: ServiceFailure) -> Self {
        Self::new(catalogue, QueryStatus::ServiceError(failure))
    }

    /// Classify the rows of an identifier lookup.
    ///
    /// Rows are expected in ascending `_r` order. Only rows within
    /// `match_radius_arcsec` are plausible cross-matches; rows without a
    /// separation are treated as plausible. Several plausible rows are
    /// disambiguated by an exact name match when the catalogue has a name
    /// column. Catalogues without one take the nearest row when the next is
    /// at least [`NEAREST_MARGIN_ARCSEC`] farther; otherwise the lookup is
    /// ambiguous.
    pub fn classify(
        catalogue: Catalogue,
        star: &StarIdentity,
        rows: Vec<Row>,
        match_radius_arcsec: f64,
    ) -> Self {
        let mut plausible: Vec<Row> = rows
            .into_iter()
            .filter(|row| {
                row.separation_arcsec()
                    .map_or(true, |r| r <= match_radius_arcsec)
            })
            .collect();

        let status = match plausible.len() {
            0 => QueryStatus::NotFound,
            1 => QueryStatus::Found(plausible.remove(0)),
            _ => match pick_by_name(catalogue, star, &plausible)
                .or_else(|| pick_nearest(catalogue, &plausible))
            {
                Some(index) => QueryStatus::Found(plausible.swap_remove(index)),
                None => QueryStatus::Ambiguous(plausible),
            },
        };
        Self::new(catalogue, status)
    }
}

fn pick_by_name(catalogue: Catalogue, star: &StarIdentity, rows: &[Row]) -> Option<usize> {
    let column = catalogue.name_column()?;
    let mut keys = vec![star.canonical_key()];
    keys.extend(star.alternate_ids.iter().map(|id| canonical_identifier(id)));

    let matches: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.text(column)
                .map(canonical_identifier)
                .is_some_and(|name| keys.contains(&name))
        })
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Minimum gap between the two nearest plausible rows for the nearer one to
/// be taken as the star in catalogues without a name column.
pub const NEAREST_MARGIN_ARCSEC: f64 = 1.0;

fn pick_nearest(catalogue: Catalogue, rows: &[Row]) -> Option<usize> {
    if catalogue.name_column().is_some() {
        return None;
    }
    let mut ranked = rows
        .iter()
        .enumerate()
        .map(|(i, row)| row.separation_arcsec().map(|r| (i, r)))
        .collect::<Option<Vec<_>>>()?;
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    match ranked.as_slice() {
        [(nearest, r0), (_, r1), ..] if r1 - r0 >= NEAREST_MARGIN_ARCSEC => Some(*nearest),
        _ => None,
    }
}

/// Which viability check an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Criterion {
    DiameterBrightness,
    AstrometricMultiplicity,
    Binarity,
    InfraredExcess,
    CompanionProximity,
}

impl Criterion {
    pub fn for_catalogue(catalogue: Catalogue) -> Self {
        match catalogue {
            Catalogue::Jsdc => Criterion::DiameterBrightness,
            Catalogue::GaiaDr3 => Criterion::AstrometricMultiplicity,
            Catalogue::Kervella2019 => Criterion::Binarity,
            Catalogue::Mdfc => Criterion::InfraredExcess,
        }
    }

    /// Catalogue the check reads from. The companion check searches Gaia DR3.
    pub fn catalogue(&self) -> Catalogue {
        match self {
            Criterion::DiameterBrightness => Catalogue::Jsdc,
            Criterion::AstrometricMultiplicity | Criterion::CompanionProximity => {
                Catalogue::GaiaDr3
            }
            Criterion::Binarity => Catalogue::Kervella2019,
            Criterion::InfraredExcess => Catalogue::Mdfc,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::DiameterBrightness => "JSDC magnitude/diameter",
            Criterion::AstrometricMultiplicity => "Gaia DR3 astrometry",
            Criterion::Binarity => "Kervella et al. 2019 binarity",
            Criterion::InfraredExcess => "MDFC calibrator/IR flags",
            Criterion::CompanionProximity => "Gaia DR3 companions",
        }
    }
}

/// A value read from a catalogue row. `None` when the cell was absent or null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub field: String,
    pub value: Option<f64>,
}

impl Measurement {
    pub fn new(field: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub catalogue: Catalogue,
    pub passed: bool,
    pub measurements: Vec<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CriterionOutcome {
    pub fn pass(criterion: Criterion, measurements: Vec<Measurement>) -> Self {
        Self {
            criterion,
            catalogue: criterion.catalogue(),
            passed: true,
            measurements,
            reason: None,
        }
    }

    pub fn fail(
        criterion: Criterion,
        measurements: Vec<Measurement>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            criterion,
            catalogue: criterion.catalogue(),
            passed: false,
            measurements,
            reason: Some(reason.into()),
        }
    }

    pub fn measurement(&self, field: &str) -> Option<f64> {
        self.measurements
            .iter()
            .find(|m| m.field == field)
            .and_then(|m| m.value)
    }
}

/// Final per-star result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarVerdict {
    star: StarIdentity,
    outcomes: Vec<CriterionOutcome>,
    passed: usize,
    attempted: usize,
    viable: bool,
}

impl StarVerdict {
    pub fn star(&self) -> &StarIdentity {
        &self.star
    }

    pub fn outcomes(&self) -> &[CriterionOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, criterion: Criterion) -> Option<&CriterionOutcome> {
        self.outcomes.iter().find(|o| o.criterion == criterion)
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn viable(&self) -> bool {
        self.viable
    }

    pub fn rating(&self) -> Rating {
        Rating::from_counts(self.passed, self.attempted)
    }

    /// Look up a measured value across all outcomes.
    pub fn measurement(&self, field: &str) -> Option<f64> {
        self.outcomes.iter().find_map(|o| o.measurement(field))
    }
}

/// Accumulates outcomes for one star as each check completes.
#[derive(Debug)]
pub struct VerdictBuilder {
    star: StarIdentity,
    outcomes: Vec<CriterionOutcome>,
}

impl VerdictBuilder {
    pub fn new(star: StarIdentity) -> Self {
        Self {
            star,
            outcomes: Vec::new(),
        }
    }

    pub fn star(&self) -> &StarIdentity {
        &self.star
    }

    /// Record an outcome. A second outcome for the same criterion replaces the first.
    pub fn record(&mut self, outcome: CriterionOutcome) {
        match self
            .outcomes
            .iter_mut()
            .find(|o| o.criterion == outcome.criterion)
        {
            Some(existing) => *existing = outcome,
            None => self.outcomes.push(outcome),
        }
    }

    pub fn finish(self) -> StarVerdict {
        let attempted = self.outcomes.len();
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        StarVerdict {
            star: self.star,
            outcomes: self.outcomes,
            passed,
            attempted,
            viable: attempted > 0 && passed == attempted,
        }
    }
}

/// How usable a verified star is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    /// Every enabled check passed.
    Ideal,
    /// At least 70% of the checks passed.
    Usable,
    Unlikely,
}

impl Rating {
    pub const USABLE_FRACTION: f64 = 0.7;

    pub fn from_counts(passed: usize, attempted: usize) -> Self {
        if attempted > 0 && passed == attempted {
            Rating::Ideal
        } else if attempted > 0 && passed as f64 / attempted as f64 >= Self::USABLE_FRACTION {
            Rating::Usable
        } else {
            Rating::Unlikely
        }
    }
}
