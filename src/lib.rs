#![forbid(unsafe_code)]
//! # satlib
//!
//! Design of **saturation-mutagenesis prime-editing libraries**: every single-base
//! substitution of a target region is scored by an external pegRNA predictor
//! (PRIDICT2.0 table layout), the best designs per position are assembled into
//! cloning-ready oligos, grouped by cut site, and closed with stop-codon and
//! single-base-deletion controls.
//!
//! ## Pipeline
//! 1. [`candidates`]: `3 × len(region)` annotated inputs, `AAA(C/T)GGG`.
//! 2. [`predictor`]: one predictor call per candidate, read back by column name.
//! 3. [`select`]: length filters, best design per spacer, top-N by score.
//! 4. [`assemble`]: oligos (filler and scaffold variants) and the annotated reference.
//! 5. [`group`]: PAM numbering and controls per group.
//! 6. [`synonymous`]: the same library with an added silent mutation.
//! 7. [`report`]: CSV tables, per-position frequency table and SVG plot.
//!
//! ## Orientation
//! Templates (`RTTs`) are stored in pegRNA orientation; on the `(+)` strand
//! that is the reverse complement of the target. Edited bases are lower case.
//!
//! ## Examples
//! ```rust
//! let c = satlib::candidates::generate_candidates("AAACCCGGGTTT", "CCC").unwrap();
//! assert_eq!(c.len(), 9);
//! assert_eq!(c[0].sequence, "AAA(C/A)CCGGGTTT");
//! ```
//!
//! ## Version
//! This build is "0.1.0".

use log::{debug, info, warn};
use rand::Rng;

pub mod assemble;
pub mod candidates;
pub mod codon;
pub mod config;
pub mod error;
pub mod group;
pub mod predictor;
pub mod report;
pub mod select;
pub mod seq;
pub mod synonymous;
pub mod data {
    pub mod oligos;
}

pub use error::Error;

/// Crate-wide result.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use assemble::LibraryRecord;
use candidates::{generate_candidates, Candidate};
use config::RunConfig;
use group::{build_library, Library};
use predictor::Predictor;
use report::Frequency;
use select::select_top;

/// Run candidates through the predictor and build the grouped library.
///
/// Candidates with fewer than `top_n` surviving designs are kept with what
/// they have. Any predictor failure aborts the run.
pub fn design_library<P, R>(config: &RunConfig, predictor: &mut P, rng: &mut R) -> Result<Library>
where
    P: Predictor + ?Sized,
    R: Rng + ?Sized,
{
    let candidates = generate_candidates(&config.target, &config.region)?;
    info!(
        "{} candidates over a {}-nt region of a {}-nt target",
        candidates.len(),
        config.region.len(),
        config.target.len()
    );

    let assembler = config.assembler();
    let mut records = Vec::new();
    for (i, cand) in candidates.iter().enumerate() {
        let designs = predictor.predict(i, &cand.sequence)?;
        let picked = select_top(designs, config.top_n);
        debug!("{}: {} designs kept", Candidate::name(i), picked.len());
        if picked.len() < config.top_n {
            warn!(
                "{} (position {}, {}>{}): {} of {} designs pass the filters",
                Candidate::name(i),
                cand.position + 1,
                cand.original as char,
                cand.substitute as char,
                picked.len(),
                config.top_n
            );
        }
        for (rank, design) in picked.iter().enumerate() {
            records.push(assembler.record(design, cand.position + 1, rank + 1, &mut *rng)?);
        }
    }

    let designer = config.codon_designer()?;
    let library = build_library(&assembler, &designer, records, config.grouping, rng)?;
    info!("Library: {} rows in {} PAM groups", library.len(), library.groups.len());
    Ok(library)
}

/// Synonymous variant of a library from its candidate rows.
pub fn design_synonymous_library<R>(config: &RunConfig, candidates: Vec<LibraryRecord>, rng: &mut R) -> Result<Library>
where
    R: Rng + ?Sized,
{
    let designer = config.codon_designer()?;
    synonymous::synonymous_library(&config.assembler(), &designer, candidates, rng)
}

/// Region coverage of a set of library rows.
pub fn frequency<'a, I>(config: &RunConfig, rows: I) -> Result<Vec<Frequency>>
where
    I: IntoIterator<Item = &'a LibraryRecord>,
{
    report::frequency_table(&config.assembler(), &config.region, rows)
}
