//! Per-star verification across the four catalogues.
//!
//! [`Verifier::verify`] always yields a [`StarVerdict`] with exactly one
//! outcome per enabled criterion. Catalogue failures of any kind become
//! failing outcomes; they never abort the star or the batch.

use crate::config::Settings;
use crate::errors::CalibResult;
use crate::evaluate::{companion_proximity, evaluate, SERVICE_UNAVAILABLE};
use crate::model::{
    Catalogue, Criterion, CriterionOutcome, Measurement, QueryStatus, Row, StarIdentity,
    StarVerdict, VerdictBuilder,
};
use crate::query::{fetch_with_failover, query_with_failover, CatalogueClient, NameResolver, QueryRequest};
use tracing::{info, info_span, warn};

pub struct Verifier<'a, C: CatalogueClient + ?Sized> {
    client: &'a C,
    settings: &'a Settings,
    companion_radius_arcsec: Option<f64>,
}

impl<'a, C: CatalogueClient + ?Sized> Verifier<'a, C> {
    pub fn new(client: &'a C, settings: &'a Settings) -> Self {
        Self {
            client,
            settings,
            companion_radius_arcsec: None,
        }
    }

    /// Enable the Gaia companion check with the given radius, or disable it with `None`.
    pub fn with_companion_radius(mut self, radius_arcsec: Option<f64>) -> Self {
        self.companion_radius_arcsec = radius_arcsec;
        self
    }

    /// Criteria evaluated for every star, in report order.
    pub fn enabled_criteria(&self) -> Vec<Criterion> {
        let mut criteria: Vec<Criterion> = Catalogue::VERIFICATION_ORDER
            .into_iter()
            .map(Criterion::for_catalogue)
            .collect();
        if self.companion_radius_arcsec.is_some() {
            criteria.push(Criterion::CompanionProximity);
        }
        criteria
    }

    pub fn verify(&self, star: StarIdentity) -> StarVerdict {
        let _span = info_span!("verify", star = %star.name).entered();
        let thresholds = &self.settings.thresholds;
        let mut builder = VerdictBuilder::new(star);

        let dec = builder.star().position.dec_deg;
        if !thresholds.is_observable(dec) {
            let reason = format!(
                "not queried: Dec {:+.2} deg is at or below the declination limit {:+.2} deg",
                dec, thresholds.declination_limit_deg
            );
            warn!(dec, limit = thresholds.declination_limit_deg, "outside declination limit");
            for criterion in self.enabled_criteria() {
                builder.record(CriterionOutcome::fail(
                    criterion,
                    vec![Measurement::new("Dec", Some(dec))],
                    reason.clone(),
                ));
            }
            return builder.finish();
        }

        // JSDC comes first; its row feeds the MDFC diameter comparison.
        let mut jsdc_row: Option<Row> = None;
        for catalogue in Catalogue::VERIFICATION_ORDER {
            let result =
                query_with_failover(self.client, &self.settings.service, catalogue, builder.star());
            if let QueryStatus::ServiceError(failure) = &result.status {
                warn!(%catalogue, %failure, "catalogue unavailable");
            }
            builder.record(evaluate(&result, thresholds, jsdc_row.as_ref()));
            if let (Catalogue::Jsdc, QueryStatus::Found(row)) = (catalogue, result.status) {
                jsdc_row = Some(row);
            }
        }

        if let Some(radius) = self.companion_radius_arcsec {
            let outcome = self.companion_outcome(builder.star(), radius);
            builder.record(outcome);
        }

        let verdict = builder.finish();
        info!(
            passed = verdict.passed(),
            attempted = verdict.attempted(),
            viable = verdict.viable(),
            "verdict"
        );
        verdict
    }

    /// Resolve `name` and verify it. Only resolution can fail.
    pub fn resolve_and_verify<R: NameResolver + ?Sized>(
        &self,
        resolver: &R,
        name: &str,
    ) -> CalibResult<StarVerdict> {
        let star = resolver.resolve(name)?;
        Ok(self.verify(star))
    }

    fn companion_outcome(&self, star: &StarIdentity, radius_arcsec: f64) -> CriterionOutcome {
        let service = &self.settings.service;
        let request = QueryRequest::around(
            Catalogue::GaiaDr3,
            star.position,
            radius_arcsec.max(service.match_radius_arcsec),
        );
        match fetch_with_failover(self.client, service, &request) {
            Ok(rows) => companion_proximity(
                &rows,
                radius_arcsec,
                service.match_radius_arcsec,
                self.settings.thresholds.companion_g_mag_max,
            ),
            Err(failure) => {
                warn!(%failure, "companion search unavailable");
                CriterionOutcome::fail(Criterion::CompanionProximity, vec![], SERVICE_UNAVAILABLE)
            }
        }
    }
}
