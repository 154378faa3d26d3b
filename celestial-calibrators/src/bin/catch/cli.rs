//! CLI argument definitions for catch

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catch")]
#[command(about = "Find and verify interferometric calibrator stars")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file overriding thresholds and service endpoints
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Query the alternate VizieR mirror first
    #[arg(long, global = true)]
    pub mirror: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find calibrators around a science target
    Search(SearchArgs),

    /// Check whether the named stars are viable calibrators
    Verify(VerifyArgs),
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Science target name, resolved through SIMBAD
    pub target: String,

    /// Reject candidates with a bright Gaia DR3 neighbour
    #[arg(long)]
    pub exclude_companions: bool,

    /// Companion search radius in arcseconds (implies --exclude-companions)
    #[arg(long)]
    pub companion_radius: Option<f64>,

    /// Cone radius around the target in degrees
    #[arg(long)]
    pub radius: Option<f64>,

    /// Directory receiving <target>_Calibrators.txt
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Star names, comma-separated or repeated
    #[arg(required = true, value_delimiter = ',')]
    pub names: Vec<String>,

    /// Also run the Gaia DR3 companion check
    #[arg(long)]
    pub companions: bool,

    /// Companion search radius in arcseconds (implies --companions)
    #[arg(long)]
    pub companion_radius: Option<f64>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Companion radius from the enabling flag and an optional explicit radius.
pub fn companion_radius(enabled: bool, radius: Option<f64>, default_arcsec: f64) -> Option<f64> {
    match (enabled, radius) {
        (_, Some(r)) => Some(r),
        (true, None) => Some(default_arcsec),
        (false, None) => None,
    }
}
