//! Search mode: enumerate and verify calibrators around a science target.

use crate::cli::{companion_radius, Cli, SearchArgs};
use anyhow::Context;
use celestial_calibrators::config::{SearchConfiguration, Settings};
use celestial_calibrators::query::{NameResolver, SimbadResolver, VizierClient};
use celestial_calibrators::report::write_calibrator_file;
use celestial_calibrators::search::CandidateEnumerator;
use std::time::Instant;

pub fn run(args: &SearchArgs, cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if !args.output_dir.is_dir() {
        anyhow::bail!("Output directory does not exist: {:?}", args.output_dir);
    }
    let start = Instant::now();

    let client = VizierClient::new(&settings.service)?;
    let resolver = SimbadResolver::new(&settings.service)?;
    let target = resolver
        .resolve(&args.target)
        .with_context(|| format!("Could not resolve target {}", args.target))?;

    let search = SearchConfiguration::new(
        target,
        settings,
        companion_radius(
            args.exclude_companions,
            args.companion_radius,
            settings.search.companion_radius_arcsec,
        ),
        args.radius,
    )?;
    print_plan(&search, cli);

    let outcome = CandidateEnumerator::new(&client, settings).find_calibrators(&search)?;
    for verdict in &outcome.verdicts {
        println!(
            "  {:<24} {}/{} checks passed{}",
            verdict.star().name,
            verdict.passed(),
            verdict.attempted(),
            if verdict.viable() { "  *" } else { "" }
        );
    }

    let viable = outcome.calibrators().count();
    let path = write_calibrator_file(&args.output_dir, &search, outcome.calibrators())
        .context("Failed to write calibrator table")?;

    println!();
    println!(
        "Found {} viable calibrators in {:.1} seconds",
        viable,
        start.elapsed().as_secs_f64()
    );
    println!(
        "Evaluated {} of {} returned candidates; results written to {}",
        outcome.candidates_evaluated(),
        outcome.rows_returned,
        path.display()
    );
    Ok(())
}

fn print_plan(search: &SearchConfiguration, cli: &Cli) {
    let target = &search.target;
    println!("=== Calibrator Search ===");
    println!(
        "Target: {} (RA {}, Dec {})",
        target.name,
        target.position.ra_hms(),
        target.position.dec_dms()
    );
    println!("Cone radius: {} deg", search.cone_radius_deg);
    match search.companion_radius_arcsec {
        Some(r) => println!("Companion exclusion: {}\"", r),
        None => println!("Companion exclusion: off"),
    }
    if cli.verbose {
        println!("Declination limit: {} deg", search.declination_limit_deg);
    }
    println!();
}
