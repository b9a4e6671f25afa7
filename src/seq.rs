//! Nucleotide helpers shared by every pipeline stage.
//!
//! Templates reported by the predictor are in pegRNA orientation and carry the
//! edited base in lower case. [`wild_type_template`] turns such a template,
//! once brought to genomic orientation with [`Strand::to_genomic`], back into
//! the unedited target segment.
//!
//! # Examples
//! ```
//! use satlib::seq::{revcomp, wild_type_template};
//! assert_eq!(revcomp("AACg"), "cGTT");
//! let wt = wild_type_template("AAACCCGGGTTT", "CCgGG").unwrap();
//! assert_eq!(wt, "CCCGG");
//! ```
use core::fmt;
use core::str::FromStr;

use aho_corasick::AhoCorasick;
use bio::alphabets::dna;

use crate::{Error, Result};

/// Nucleotide alphabet, in the order alternates are proposed for an edit.
pub const NUCLEOTIDES: [u8; 4] = [b'A', b'T', b'C', b'G'];

/// Genomic strand targeted by a spacer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Strand {
    /// Spacer reads along the target as given (predictor label `Fw`).
    Plus,
    /// Spacer reads along the reverse complement (predictor label `Rv`).
    Minus,
}

impl Strand {
    /// Parse a predictor (`Fw`/`Rv`) or report (`(+)`/`(-)`) strand label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Fw" | "(+)" | "+" => Some(Self::Plus),
            "Rv" | "(-)" | "-" => Some(Self::Minus),
            _ => None,
        }
    }

    /// `'+'` or `'-'`.
    pub fn symbol(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }

    /// Bring a pegRNA-orientation template to the target's orientation.
    pub fn to_genomic(self, template: &str) -> String {
        match self {
            Self::Plus => revcomp(template),
            Self::Minus => template.to_string(),
        }
    }

    /// Bring a target-orientation segment to pegRNA orientation.
    pub fn from_genomic(self, segment: &str) -> String {
        // Both orientations are related by an involution.
        self.to_genomic(segment)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.symbol())
    }
}

impl FromStr for Strand {
    type Err = String;
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("Unknown strand label: {}", s))
    }
}

/// Reverse complement, preserving case.
pub fn revcomp(seq: &str) -> String {
    String::from_utf8_lossy(&dna::revcomp(seq.as_bytes())).into_owned()
}

/// Complement of a single base, preserving case.
pub fn complement(base: u8) -> u8 {
    dna::complement(base)
}

/// Fail on anything outside `ACGT` (either case).
pub fn validate_dna(seq: &str) -> Result<()> {
    match seq.chars().find(|c| !matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T')) {
        Some(c) => Err(Error::InvalidBase(c)),
        None => Ok(()),
    }
}

/// Start of the saturation region within the target.
pub fn locate_region(target: &str, region: &str) -> Result<usize> {
    if region.is_empty() {
        return Err(Error::RegionNotFound { region: region.to_string() });
    }
    target
        .find(region)
        .ok_or_else(|| Error::RegionNotFound { region: region.to_string() })
}

/// Genomic index of a spacer on the target.
///
/// The first spacer base is the transcription-start `G` added by the
/// predictor and is not matched. Minus-strand spacers are placed through their
/// reverse complement.
pub fn spacer_index(target: &str, spacer: &str, strand: Strand) -> Result<usize> {
    let protospacer = spacer.get(1..).unwrap_or("").to_ascii_uppercase();
    let site = match strand {
        Strand::Plus => protospacer,
        Strand::Minus => revcomp(&protospacer),
    };
    target.find(&site).ok_or_else(|| Error::SpacerNotFound {
        spacer: spacer.to_string(),
        strand: strand.to_string(),
    })
}

/// Recover the unedited target segment a degenerate template was derived from.
///
/// The first lower-case base of `pattern` stands for "any of the other three
/// bases"; further lower-case bases are taken literally. Exactly one
/// occurrence of exactly one alternative must exist in `target`; a pattern
/// without lower-case bases must occur exactly once.
pub fn wild_type_template(target: &str, pattern: &str) -> Result<String> {
    let upper = pattern.to_ascii_uppercase();
    let unresolved = |matches| Error::WildTypeUnresolved { pattern: pattern.to_string(), matches };

    let alternatives: Vec<String> = match pattern.bytes().position(|b| b.is_ascii_lowercase()) {
        None => vec![upper],
        Some(degenerate) => {
            let edited = upper.as_bytes()[degenerate];
            NUCLEOTIDES
                .iter()
                .filter(|&&n| n != edited)
                .map(|&n| {
                    let mut alt = upper.clone().into_bytes();
                    alt[degenerate] = n;
                    String::from_utf8_lossy(&alt).into_owned()
                })
                .collect()
        }
    };

    let ac = AhoCorasick::new(&alternatives).map_err(|_| unresolved(0))?;
    // distinct (alternative, start) pairs; overlapping occurrences count separately
    let mut hits: Vec<(usize, usize)> = ac
        .find_overlapping_iter(target)
        .map(|m| (m.pattern().as_usize(), m.start()))
        .collect();
    hits.sort_unstable();
    hits.dedup();

    match hits.as_slice() {
        [(only, _)] => Ok(alternatives[*only].clone()),
        other => Err(unresolved(other.len())),
    }
}
