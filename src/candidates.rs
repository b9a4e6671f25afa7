//! Saturation candidates: every single-base substitution of the region,
//! written in the inline `(original/substituted)` notation the predictor reads.
use polars::prelude::*;

use crate::seq::{locate_region, validate_dna, NUCLEOTIDES};
use crate::Result;

/// One predictor input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    /// 0-based position within the saturation region.
    pub position: usize,
    /// Wild-type base.
    pub original: u8,
    /// Substituted base.
    pub substitute: u8,
    /// Annotated target, e.g. `AAA(C/T)CCGGGTTT`.
    pub sequence: String,
}

impl Candidate {
    /// Name used for predictor runs and batch tables (`seq<i>`).
    pub fn name(index: usize) -> String {
        format!("seq{}", index)
    }
}

/// Expand `region` (which must occur in `target`) into `3 × len(region)`
/// candidates, three per position, in region order.
pub fn generate_candidates(target: &str, region: &str) -> Result<Vec<Candidate>> {
    validate_dna(region)?;
    let start = locate_region(target, region)?;
    let end = start + region.len();
    let (head, tail) = (&target[..start], &target[end..]);

    let mut out = Vec::with_capacity(region.len() * 3);
    for (i, original) in region.bytes().enumerate() {
        let original = original.to_ascii_uppercase();
        for &substitute in NUCLEOTIDES.iter().filter(|&&n| n != original) {
            let sequence = format!(
                "{}{}({}/{}){}{}",
                head,
                &region[..i],
                original as char,
                substitute as char,
                &region[i + 1..],
                tail
            );
            out.push(Candidate { position: i, original, substitute, sequence });
        }
    }
    Ok(out)
}

/// Batch input table for predictor runs (`editseq`, `sequence_name`).
pub fn batch_template(candidates: &[Candidate]) -> PolarsResult<DataFrame> {
    df!(
        "editseq"       => candidates.iter().map(|c| c.sequence.clone()).collect::<Vec<_>>(),
        "sequence_name" => (0..candidates.len()).map(Candidate::name).collect::<Vec<_>>(),
    )
}
