//! Cloning oligos shared by every library member.
//!
//! - SpCas9 sgRNA scaffold (**SF**), used in the scaffold variant of each pegRNA
//! - 5′ and 3′ homology arms for pooled cloning into the expression backbone
//! - BsmBI filler flanks; the filler between them is dropped out and replaced
//!   by the scaffold during Golden Gate assembly
//!
//! Notes:
//! - Sequences are uppercase DNA, 5′→3′.
//! - The arms are defaults only; other backbones pass their own arms through
//!   [`crate::config::Arms`].

/// Where an oligo sequence came from.
#[derive(Clone, Copy, Debug)]
pub struct Provenance {
    /// Human-readable source.
    pub source: &'static str,
    /// Ambiguities, usage notes.
    pub notes: Option<&'static str>,
}

/// A named oligo.
#[derive(Clone, Copy, Debug)]
pub struct Oligo {
    pub name: &'static str,
    pub sequence: &'static str,
    pub provenance: Provenance,
}

const SPCAS9: Provenance = Provenance {
    source: "SpCas9 sgRNA scaffold (Jinek et al. 2012; Anzalone et al. 2019 pegRNA layout)",
    notes: None,
};

const BACKBONE: Provenance = Provenance {
    source: "U6 promoter end / tevopreQ1 epegRNA terminus with pooled-cloning overlap",
    notes: Some("Backbone specific; override for other vectors."),
};

const GOLDEN_GATE: Provenance = Provenance {
    source: "BsmBI (Esp3I) dropout flanks",
    notes: Some("CGTCTC / GAGACG recognition sites; cut positions leave scaffold-compatible overhangs."),
};

/// SpCas9 scaffold, 76 nt.
pub const SCAFFOLD: Oligo = Oligo {
    name: "SF",
    sequence: "GTTTTAGAGCTAGAAATAGCAAGTTAAAATAAGGCTAGTCCGTTATCAACTTGAAAAAGTGGCACCGAGTCGGTGC",
    provenance: SPCAS9,
};

/// 5′ homology arm (LHA).
pub const FIVE_PRIME_ARM: Oligo = Oligo {
    name: "LHA",
    sequence: "GTGGAAAGGACGAAACACCG",
    provenance: BACKBONE,
};

/// 3′ homology arm (RHA): tevopreQ1 motif, U6 terminator and cloning overlap.
pub const THREE_PRIME_ARM: Oligo = Oligo {
    name: "RHA",
    sequence: "CGCGGTTCTATCTAGTTACGCGTTAAACCAACTAGAATTTTTTGAATTCTCGACCTCGAGACAAATGGCAG",
    provenance: BACKBONE,
};

/// Filler prefix, 11 nt.
pub const FILLER_PREFIX: Oligo = Oligo {
    name: "filler_5p",
    sequence: "GTTTCGAGACG",
    provenance: GOLDEN_GATE,
};

/// Filler suffix, 11 nt.
pub const FILLER_SUFFIX: Oligo = Oligo {
    name: "filler_3p",
    sequence: "CGTCTCGGTGC",
    provenance: GOLDEN_GATE,
};

/// All embedded oligos.
pub const ALL: &[Oligo] = &[SCAFFOLD, FIVE_PRIME_ARM, THREE_PRIME_ARM, FILLER_PREFIX, FILLER_SUFFIX];
