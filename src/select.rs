//! Filtering and ranking of predictor designs for one candidate.
use std::collections::BTreeMap;

use crate::predictor::Design;

/// RT templates must be strictly shorter than this.
pub const MAX_RTT_LEN: usize = 40;
/// PBS length must lie strictly between these bounds.
pub const PBS_LEN_BOUNDS: (usize, usize) = (7, 15);
/// Designs kept per candidate.
pub const DEFAULT_TOP_N: usize = 4;

/// Length constraints on the RT template and primer-binding site.
pub fn passes_length_filter(d: &Design) -> bool {
    let (lo, hi) = PBS_LEN_BOUNDS;
    d.rtt.len() < MAX_RTT_LEN && d.pbs.len() > lo && d.pbs.len() < hi
}

/// Best design per spacer, ranked by score (descending), truncated to `top_n`.
///
/// Among equal scores for one spacer the first reported design wins. Spacers
/// are visited in lexical order before ranking, so equal-scoring spacers keep
/// that order. Fewer than `top_n` survivors are returned as they are.
pub fn select_top(designs: Vec<Design>, top_n: usize) -> Vec<Design> {
    let mut best: BTreeMap<String, Design> = BTreeMap::new();
    for d in designs.into_iter().filter(passes_length_filter) {
        match best.get(&d.spacer) {
            Some(kept) if kept.score >= d.score => {}
            _ => {
                best.insert(d.spacer.clone(), d);
            }
        }
    }

    let mut ranked: Vec<Design> = best.into_values().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_n);
    ranked
}
