use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while designing a library. Every variant is fatal for a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Saturation region `{region}` is not a substring of the target sequence")]
    /// Region missing from the target
    RegionNotFound { region: String },
    #[error("Only A, C, G and T nucleotides are allowed but got `{0}`")]
    /// Incorrect nucleotide supplied
    InvalidBase(char),
    #[error("Wild-type template for `{pattern}` is unresolved ({matches} matches in target)")]
    /// Degenerate template matched zero or several target segments
    WildTypeUnresolved { pattern: String, matches: usize },
    #[error("Spacer `{spacer}` does not target the {strand} strand of the target sequence")]
    /// Spacer could not be placed on the target
    SpacerNotFound { spacer: String, strand: String },
    #[error("Predictor table {path} is missing column `{column}`")]
    /// Predictor output does not follow the expected schema
    MissingColumn { path: PathBuf, column: String },
    #[error("Invalid value `{value}` in column `{column}` at line {line}")]
    /// A table cell could not be interpreted
    InvalidValue {
        column: String,
        line: usize,
        value: String,
    },
    #[error("Predictor `{program}` failed with status {status}")]
    /// External predictor exited unsuccessfully
    PredictorFailed { program: String, status: String },
    #[error("No in-frame codon of template `{template}` can carry a {purpose} edit")]
    /// Codon designers found no admissible position
    NoCodon { template: String, purpose: &'static str },
    #[error("Library is empty, no design survived selection")]
    /// Nothing to group or report
    EmptyLibrary,
    #[error("Could not read FASTA record")]
    /// Target FASTA could not be parsed
    Fasta(#[from] needletail::errors::ParseError),
    #[error("I/O error")]
    /// Filesystem or process error
    Io(#[from] std::io::Error),
    #[error("Could not read CSV table")]
    /// Malformed CSV input
    Csv(#[from] csv::Error),
    #[error("Could not build report table")]
    /// DataFrame construction or CSV writing failed
    Polars(#[from] polars::prelude::PolarsError),
    #[error("Could not draw frequency plot: {0}")]
    /// Plot rendering failed
    Plot(String),
}
