//! Interferometric calibrator selection against VizieR catalogues.
//!
//! Candidate calibrators are checked against four catalogues hosted by
//! VizieR. Each catalogue contributes one pass/fail criterion; an optional
//! Gaia DR3 neighbourhood search adds a fifth. A star is a viable
//! calibrator only when every enabled criterion passes.
//!
//! | Catalogue | VizieR table | Criterion |
//! |-----------|--------------|-----------|
//! | JSDC v2 | `II/346/jsdc_v2` | V < 9, H ≤ 6.4, UDDH < 0.4 mas |
//! | Gaia DR3 | `I/355/gaiadr3` | IPDfmp < 2, RUWE < 1.4, Vbroad < 100 km/s |
//! | Kervella 2019 | `J/A+A/623/A72/hipgpma` | no binarity flags |
//! | MDFC v10 | `II/361/mdfc-v10` | `CalFlag == 0`, `IRflag == 0`, `Diam-GAIA` within 0.075 mas of JSDC `UDDH` and `UDDK` |
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | [`Settings`](config::Settings) loaded from TOML, thresholds and endpoints |
//! | [`model`] | Stars, catalogue rows, query results and [`StarVerdict`](model::StarVerdict) |
//! | [`query`] | VizieR cone searches, SIMBAD name resolution, mirror failover |
//! | [`evaluate`] | Per-catalogue criteria producing [`CriterionOutcome`](model::CriterionOutcome)s |
//! | [`verify`] | [`Verifier`](verify::Verifier): all criteria for one star |
//! | [`search`] | JSDC cone search around a science target |
//! | [`report`] | Console report and `<target>_Calibrators.txt` table |
//! | [`sky`] | Angular separation and sexagesimal formatting |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_calibrators::config::Settings;
//! use celestial_calibrators::query::{SimbadResolver, VizierClient};
//! use celestial_calibrators::verify::Verifier;
//!
//! let settings = Settings::load(None)?;
//! let client = VizierClient::new(&settings.service)?;
//! let resolver = SimbadResolver::new(&settings.service)?;
//!
//! let verdict = Verifier::new(&client, &settings)
//!     .with_companion_radius(Some(10.0))
//!     .resolve_and_verify(&resolver, "HD 36079")?;
//! println!("{}/{} passed", verdict.passed(), verdict.attempted());
//! ```
//!
//! # Features
//!
//! - **`cli`** (default): builds the `catch` binary.

pub mod config;
pub mod errors;
pub mod evaluate;
pub mod model;
pub mod query;
pub mod report;
pub mod search;
pub mod sky;
pub mod verify;

pub use errors::{CalibError, CalibResult};
pub use model::{Catalogue, Criterion, StarIdentity, StarVerdict};
