//! Verify mode: check a list of named stars.

use crate::cli::{companion_radius, Cli, OutputFormat, VerifyArgs};
use anyhow::Context;
use celestial_calibrators::config::{validate_companion_radius, Settings};
use celestial_calibrators::query::{SimbadResolver, VizierClient};
use celestial_calibrators::report::{render_verdict, verdict_json};
use celestial_calibrators::verify::Verifier;
use serde_json::json;
use std::time::Instant;

pub fn run(args: &VerifyArgs, cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    let radius = companion_radius(
        args.companions,
        args.companion_radius,
        settings.search.companion_radius_arcsec,
    );
    if let Some(r) = radius {
        validate_companion_radius(r)?;
    }

    let client = VizierClient::new(&settings.service)?;
    let resolver = SimbadResolver::new(&settings.service)?;
    let verifier = Verifier::new(&client, settings).with_companion_radius(radius);

    if cli.verbose {
        eprintln!(
            "Verifying {} star(s) against {}",
            args.names.len(),
            settings.service.vizier_url
        );
    }

    let mut json_results = Vec::new();
    for name in args.names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let start = Instant::now();
        match verifier.resolve_and_verify(&resolver, name) {
            Ok(verdict) => match args.format {
                OutputFormat::Text => {
                    println!("{}", render_verdict(&verdict, Some(start.elapsed())));
                }
                OutputFormat::Json => json_results.push(verdict_json(&verdict, start.elapsed())?),
            },
            Err(e) if e.is_per_star() => match args.format {
                OutputFormat::Text => eprintln!("Skipping {}: {}\n", name, e),
                OutputFormat::Json => json_results.push(json!({
                    "name": name,
                    "error": e.to_string(),
                    "elapsed_secs": start.elapsed().as_secs_f64(),
                })),
            },
            Err(e) => return Err(e).with_context(|| format!("Verification of {} failed", name)),
        }
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }
    Ok(())
}
