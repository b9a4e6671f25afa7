//! Run parameters.
//!
//! A [`RunConfig`] is normally filled from the command line; [`RunConfig::example`]
//! holds a complete worked setup (a 444-nt locus whose 244-nt exon is
//! saturated, read in frame +2, with its acceptor and donor splice sites
//! protected).
use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assemble::Assembler;
use crate::codon::CodonDesigner;
use crate::data::oligos::{FIVE_PRIME_ARM, THREE_PRIME_ARM};
use crate::group::GroupingMode;
use crate::select::DEFAULT_TOP_N;
use crate::seq::{locate_region, validate_dna};
use crate::Result;

/// Seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 0x5a7_11b;

const EXAMPLE_TARGET: &str = "TACAGCTGGGTCTGACCTCTGAGTCCAGGGTCAGGTGATTTTGCTTAGCCTCAAGTGCTCAGATTCTGCTGATATTTTGCAAGACCTGGACTCTCTTGACACCCAGGATTCTTTCCTCAGGGGACATGCTGCCTATAGTTCTGCAGTTAACATCCTCCTTGGCCATGGCACCAGGGTCGGAGCCACGTACTTCATGACCTACCACACCGTGCTGCAGACCTCTGCTGACTTTATTGACGCTCTGAAGAAAGCCCGACTTATAGCCAGTAATGTCACCGAAACCATGGGCATTAACGGCAGTGCCTACCGAGTATTTCCTTACAGGTAAAGCCTGCCCTTTTTCAATGGGGTTTACCCAGCAAAGGGCCTACACTGGGTGGGAGTGGGGAGGGTTCCCTTGGCAAGATGCTGATTTTCAGGTTGGGTTCTGGCCCCTGCTCCATT";
const EXAMPLE_REGION: &str = "ACCCAGGATTCTTTCCTCAGGGGACATGCTGCCTATAGTTCTGCAGTTAACATCCTCCTTGGCCATGGCACCAGGGTCGGAGCCACGTACTTCATGACCTACCACACCGTGCTGCAGACCTCTGCTGACTTTATTGACGCTCTGAAGAAAGCCCGACTTATAGCCAGTAATGTCACCGAAACCATGGGCATTAACGGCAGTGCCTACCGAGTATTTCCTTACAGGTAAAGCCTGCCCTTTTTCA";

/// Homology arms flanking every oligo.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Arms {
    pub five_prime: String,
    pub three_prime: String,
}

impl Default for Arms {
    fn default() -> Self {
        Self {
            five_prime: FIVE_PRIME_ARM.sequence.to_string(),
            three_prime: THREE_PRIME_ARM.sequence.to_string(),
        }
    }
}

/// Splice sites as 1-based inclusive coordinates within the region.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SpliceSites {
    pub acceptor: Option<(usize, usize)>,
    pub donor: Option<(usize, usize)>,
}

impl SpliceSites {
    /// 0-based region positions covered by either site.
    ///
    /// ```
    /// use satlib::config::SpliceSites;
    /// let s = SpliceSites { acceptor: Some((18, 21)), donor: None };
    /// assert_eq!(s.protected_positions().into_iter().collect::<Vec<_>>(), vec![17, 18, 19, 20]);
    /// ```
    pub fn protected_positions(&self) -> BTreeSet<usize> {
        [self.acceptor, self.donor]
            .into_iter()
            .flatten()
            .flat_map(|(from, to)| from.saturating_sub(1)..to)
            .collect()
    }
}

/// Everything a library run needs besides the predictor.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Upper-case target sequence.
    pub target: String,
    /// Upper-case saturation region, a substring of `target`.
    pub region: String,
    /// Reading frame of the region, 0, 1 or 2.
    pub frame: usize,
    pub splice: SpliceSites,
    pub arms: Arms,
    /// Wrap oligos in the homology arms.
    pub homology_arms: bool,
    /// Designs kept per candidate.
    pub top_n: usize,
    pub grouping: GroupingMode,
    pub seed: u64,
}

impl RunConfig {
    /// Validated configuration with default arms, top-N, grouping and seed.
    pub fn new(target: &str, region: &str, frame: usize) -> Result<Self> {
        let target = target.trim().to_ascii_uppercase();
        let region = region.trim().to_ascii_uppercase();
        validate_dna(&target)?;
        validate_dna(&region)?;
        locate_region(&target, &region)?;
        Ok(Self {
            target,
            region,
            frame: frame % 3,
            splice: SpliceSites::default(),
            arms: Arms::default(),
            homology_arms: true,
            top_n: DEFAULT_TOP_N,
            grouping: GroupingMode::default(),
            seed: DEFAULT_SEED,
        })
    }

    /// The worked example locus.
    pub fn example() -> Self {
        Self {
            target: EXAMPLE_TARGET.to_string(),
            region: EXAMPLE_REGION.to_string(),
            frame: 2,
            splice: SpliceSites { acceptor: Some((18, 21)), donor: Some((223, 231)) },
            arms: Arms::default(),
            homology_arms: true,
            top_n: DEFAULT_TOP_N,
            grouping: GroupingMode::default(),
            seed: DEFAULT_SEED,
        }
    }

    /// Start of the region within the target.
    pub fn region_start(&self) -> Result<usize> {
        locate_region(&self.target, &self.region)
    }

    /// Record builder over this target and arms.
    pub fn assembler(&self) -> Assembler<'_> {
        Assembler::new(&self.target, &self.arms, self.homology_arms)
    }

    /// Stop and synonymous designer for this locus.
    pub fn codon_designer(&self) -> Result<CodonDesigner> {
        Ok(CodonDesigner::new(
            &self.target,
            self.region_start()?,
            self.frame,
            &self.splice.protected_positions(),
        ))
    }

    /// Filler RNG seeded from `seed`.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use rand::Rng;

    #[test]
    fn example_region_sits_inside_target() {
        let c = RunConfig::example();
        assert_eq!(c.target.len(), 444);
        assert_eq!(c.region.len(), 244);
        assert_eq!(c.region_start().unwrap(), 100);
        let p = c.splice.protected_positions();
        assert_eq!(p.len(), 4 + 9);
        assert!(p.contains(&17) && p.contains(&230) && !p.contains(&21));
    }

    #[test]
    fn new_normalises_and_validates() {
        let c = RunConfig::new(" aaacccgggttt\n", "ccc", 5).unwrap();
        assert_eq!(c.target, "AAACCCGGGTTT");
        assert_eq!(c.region, "CCC");
        assert_eq!(c.frame, 2);
        assert!(matches!(RunConfig::new("AAACCC", "GGG", 0), Err(Error::RegionNotFound { .. })));
        assert!(matches!(RunConfig::new("AANCCC", "CC", 0), Err(Error::InvalidBase('N'))));
    }

    #[test]
    fn splice_sites_reach_the_codon_designer() {
        use crate::codon::ControlDesigner;
        use crate::seq::Strand;

        let mut c = RunConfig::new("ATGGCCAAAGATTGGCTG", "ATGGCCAAAGATTGGCTG", 0).unwrap();
        let free = c.codon_designer().unwrap().stop_template("AAAGATTGG", Strand::Minus).unwrap();
        assert_eq!(free, "tAAGATTGG");
        // region position 7 (1-based) is the A of AAA
        c.splice = SpliceSites { acceptor: Some((7, 7)), donor: None };
        let kept = c.codon_designer().unwrap().stop_template("AAAGATTGG", Strand::Minus).unwrap();
        assert!(kept.starts_with('A'));
        assert_ne!(kept, free);
    }

    #[test]
    fn rng_follows_seed() {
        let mut c = RunConfig::new("ACGT", "CG", 0).unwrap();
        c.seed = 3;
        let a: u64 = c.rng().gen();
        let b: u64 = c.rng().gen();
        assert_eq!(a, b);
    }
}
