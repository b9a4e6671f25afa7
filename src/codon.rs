//! Codon-aware template designers for control and silent-mutation pegRNAs.
//!
//! Both designers work on wild-type templates in target orientation. The
//! reading frame is anchored at the start of the saturation region and
//! extends over the whole target; only codons lying entirely within the
//! template are touched, never at protected splice positions.
use std::collections::BTreeSet;

use crate::seq::Strand;
use crate::{Error, Result};

/// Stop codons, in preference order.
pub const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

/// Standard genetic code; `*` marks a stop.
pub fn translate(codon: &[u8]) -> Option<char> {
    let idx = |b: u8| match b.to_ascii_uppercase() {
        b'T' => Some(0usize),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    };
    const AMINO: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";
    if codon.len() != 3 {
        return None;
    }
    let i = idx(codon[0])? * 16 + idx(codon[1])? * 4 + idx(codon[2])?;
    Some(AMINO[i] as char)
}

/// Builds the stop-codon template of a control pegRNA.
pub trait ControlDesigner {
    /// Wild-type template (target orientation) with an in-frame stop codon
    /// installed, in target orientation.
    fn stop_template(&self, wild_type: &str, strand: Strand) -> Result<String>;
}

/// Builds a template carrying one silent substitution.
pub trait SynonymousDesigner {
    /// Wild-type template (target orientation) with one synonymous
    /// substitution, in target orientation; the substituted base is lower case.
    fn synonymous_template(&self, wild_type: &str, strand: Strand) -> Result<String>;
}

/// Frame- and splice-aware designer over one target.
#[derive(Clone, Debug)]
pub struct CodonDesigner {
    target: String,
    /// Target position of the first region codon.
    origin: usize,
    protected: BTreeSet<usize>,
}

impl CodonDesigner {
    /// `region_start` is the region's target coordinate, `frame` the
    /// region-relative offset of the first codon and `protected` holds
    /// region-relative positions that must stay untouched.
    pub fn new(target: &str, region_start: usize, frame: usize, protected: &BTreeSet<usize>) -> Self {
        Self {
            target: target.to_ascii_uppercase(),
            origin: region_start + frame % 3,
            protected: protected.iter().map(|p| p + region_start).collect(),
        }
    }

    fn span(&self, wild_type: &str) -> Result<(usize, usize)> {
        let start = self
            .target
            .find(&wild_type.to_ascii_uppercase())
            .ok_or_else(|| Error::WildTypeUnresolved { pattern: wild_type.to_string(), matches: 0 })?;
        Ok((start, start + wild_type.len()))
    }

    /// In-frame codon starts (target coordinates) fully inside the template span.
    fn codons(&self, span: (usize, usize)) -> impl Iterator<Item = usize> {
        let phase = self.origin % 3;
        (span.0..span.1.saturating_sub(2)).filter(move |&c| c % 3 == phase)
    }

    fn is_protected(&self, pos: usize) -> bool {
        self.protected.contains(&pos)
    }
}

/// Apply `(target position, base)` substitutions to a template starting at
/// `start`, writing substituted bases in lower case.
fn substitute(wild_type: &str, start: usize, edits: &[(usize, u8)]) -> String {
    let mut out = wild_type.to_ascii_uppercase().into_bytes();
    for &(pos, base) in edits {
        out[pos - start] = base.to_ascii_lowercase();
    }
    String::from_utf8_lossy(&out).into_owned()
}

impl ControlDesigner for CodonDesigner {
    /// Fewest substitutions win; ties go to the codon nearest the template centre.
    fn stop_template(&self, wild_type: &str, _strand: Strand) -> Result<String> {
        let span = self.span(wild_type)?;
        let centre = span.0 + wild_type.len() / 2;
        let t = self.target.as_bytes();

        let mut best: Option<((usize, usize), Vec<(usize, u8)>)> = None;
        for c in self.codons(span) {
            let codon = &t[c..c + 3];
            if translate(codon) == Some('*') {
                continue;
            }
            for stop in STOP_CODONS {
                let edits: Vec<(usize, u8)> = (0..3)
                    .filter(|&k| codon[k] != stop[k])
                    .map(|k| (c + k, stop[k]))
                    .collect();
                if edits.iter().any(|&(p, _)| self.is_protected(p)) {
                    continue;
                }
                let key = (edits.len(), (c + 1).abs_diff(centre));
                if best.as_ref().map_or(true, |(k, _)| key < *k) {
                    best = Some((key, edits));
                }
            }
        }

        match best {
            Some((_, edits)) => Ok(substitute(wild_type, span.0, &edits)),
            None => Err(Error::NoCodon { template: wild_type.to_string(), purpose: "stop" }),
        }
    }
}

impl SynonymousDesigner for CodonDesigner {
    /// The substitution nearest the `GG` of the PAM wins, which also blocks
    /// re-nicking of the edited strand.
    fn synonymous_template(&self, wild_type: &str, strand: Strand) -> Result<String> {
        let span = self.span(wild_type)?;
        let len = wild_type.len();
        let pam = match strand {
            Strand::Plus => span.0 + 4.min(len.saturating_sub(1)),
            Strand::Minus => span.0 + len.saturating_sub(5),
        };
        let t = self.target.as_bytes();

        let mut best: Option<(usize, usize, u8)> = None;
        for c in self.codons(span) {
            let codon = [t[c], t[c + 1], t[c + 2]];
            let Some(aa) = translate(&codon) else { continue };
            if aa == '*' {
                continue;
            }
            for k in 0..3 {
                let pos = c + k;
                if self.is_protected(pos) {
                    continue;
                }
                for &base in b"ACGT" {
                    if base == codon[k] {
                        continue;
                    }
                    let mut alt = codon;
                    alt[k] = base;
                    if translate(&alt) != Some(aa) {
                        continue;
                    }
                    let dist = pos.abs_diff(pam);
                    if best.map_or(true, |(d, p, _)| (dist, pos) < (d, p)) {
                        best = Some((dist, pos, base));
                    }
                }
            }
        }

        match best {
            Some((_, pos, base)) => Ok(substitute(wild_type, span.0, &[(pos, base)])),
            None => Err(Error::NoCodon { template: wild_type.to_string(), purpose: "synonymous" }),
        }
    }
}

/// Carry the silent change of `synonymous` over to the edited template.
///
/// All three templates are in pegRNA orientation. Bases where the synonymous
/// template departs from the wild type are copied (lower case) into `edited`
/// unless `edited` already changes that base. Templates of unequal length
/// are returned unchanged.
pub fn preserving_template(synonymous: &str, edited: &str, wild_type: &str) -> String {
    if synonymous.len() != edited.len() || edited.len() != wild_type.len() {
        return edited.to_string();
    }
    synonymous
        .chars()
        .zip(edited.chars())
        .zip(wild_type.chars())
        .map(|((s, e), w)| {
            if !s.eq_ignore_ascii_case(&w) && e.eq_ignore_ascii_case(&w) {
                s.to_ascii_lowercase()
            } else {
                e
            }
        })
        .collect()
}

/// First position where two templates differ, ignoring case.
pub fn edit_position(a: &str, b: &str) -> Option<usize> {
    a.chars().zip(b.chars()).position(|(x, y)| !x.eq_ignore_ascii_case(&y))
}
