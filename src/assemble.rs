//! Assembly of library records from selected designs.
//!
//! A pegRNA oligo is `[LHA] + spacer + filler + RTT + PBS + [RHA]`; its
//! scaffold variant carries the SpCas9 scaffold in place of the filler. The
//! filler is a BsmBI dropout cassette with a random core, drawn fresh for
//! every record so that oligos of one group stay distinguishable.
use rand::Rng;

use crate::config::Arms;
use crate::data::oligos::{FILLER_PREFIX, FILLER_SUFFIX, SCAFFOLD};
use crate::predictor::Design;
use crate::seq::{complement, wild_type_template, Strand, NUCLEOTIDES};
use crate::{Error, Result};

/// Random bases between the filler flanks; the filler matches the scaffold length.
pub const FILLER_CORE_LEN: usize = 54;

/// One row of the library.
#[derive(Clone, Debug, PartialEq)]
pub struct LibraryRecord {
    /// Rank of the design within its saturation position (1-based).
    pub rank: usize,
    /// Cut-site group (1-based); 0 until groups are numbered.
    pub pam_no: usize,
    /// Saturation position the design edits (1-based).
    pub edit_position: usize,
    pub pam: String,
    pub strand: Strand,
    /// `original>edited`, or a control label.
    pub edit: String,
    pub lha: String,
    pub spacer: String,
    pub filler: String,
    /// RT template in pegRNA orientation.
    pub rtt: String,
    pub pbs: String,
    pub rha: String,
    /// Filler variant of the assembled oligo.
    pub peg_rna: String,
    /// Scaffold variant of the assembled oligo.
    pub peg_rna_sf: String,
    /// Target with the edit marked (lower case, or `-` for a deletion).
    pub reference: String,
    pub score: f64,
    /// Offset of an added silent mutation (synonymous library only).
    pub syn_position: Option<i64>,
}

impl LibraryRecord {
    pub fn length(&self) -> usize {
        self.peg_rna.len()
    }

    pub fn length_sf(&self) -> usize {
        self.peg_rna_sf.len()
    }
}

/// Where the reference annotation marks a deletion.
///
/// Library rows and their controls mark the PAM-side base on the plus strand.
/// Controls of the synonymous library carry a single `-` at the middle of the
/// target, whatever their template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeletionMarker {
    /// `(+)`: template end − 10; `(-)`: template midpoint.
    Library,
    /// Target midpoint, for stop and deletion templates alike.
    TargetMidpoint,
}

impl DeletionMarker {
    fn offset(self, strand: Strand, template_len: usize) -> usize {
        match (self, strand) {
            (Self::Library, Strand::Plus) => template_len.saturating_sub(10),
            (Self::Library, Strand::Minus) | (Self::TargetMidpoint, _) => template_len / 2,
        }
    }
}

/// Filler: fixed 11-nt flanks around a random core, redrawn until the only
/// BsmBI sites are the flanking ones.
pub fn random_filler<R: Rng + ?Sized>(rng: &mut R) -> String {
    loop {
        let core: String = (0..FILLER_CORE_LEN)
            .map(|_| NUCLEOTIDES[rng.gen_range(0..NUCLEOTIDES.len())] as char)
            .collect();
        let filler = format!("{}{}{}", FILLER_PREFIX.sequence, core, FILLER_SUFFIX.sequence);
        if filler.matches("CGTCTC").count() == 1 && filler.matches("GAGACG").count() == 1 {
            return filler;
        }
    }
}

/// `NGG` motif of a design: complement of the fourth template base from its 3′ end.
pub fn pam_motif(rtt: &str) -> String {
    let n = rtt.len();
    let base = match n.checked_sub(4) {
        Some(i) => complement(rtt.as_bytes()[i].to_ascii_uppercase()) as char,
        None => 'N',
    };
    format!("{}GG", base)
}

/// Target sequence annotated with the edit a template installs.
///
/// `rtt` is in pegRNA orientation, `wild_type` in target orientation. For an
/// equal-length template every mismatching base is written in lower case;
/// otherwise one base is replaced by `-` as chosen by `marker`.
/// [`DeletionMarker::TargetMidpoint`] ignores the template and always marks
/// the middle of the target.
pub fn reference_sequence(
    target: &str,
    rtt: &str,
    wild_type: &str,
    strand: Strand,
    marker: DeletionMarker,
) -> Result<String> {
    if marker == DeletionMarker::TargetMidpoint {
        return Ok(mark_deletion(target, 0, target.len(), marker, strand));
    }
    let genomic = strand.to_genomic(rtt);
    let start = target.find(wild_type).ok_or_else(|| Error::WildTypeUnresolved {
        pattern: wild_type.to_string(),
        matches: 0,
    })?;
    let end = start + wild_type.len();

    if genomic.len() == wild_type.len() {
        let mut out = String::with_capacity(target.len());
        out.push_str(&target[..start]);
        for (t, r) in target[start..end].chars().zip(genomic.chars()) {
            if t.eq_ignore_ascii_case(&r) {
                out.push(t);
            } else {
                out.push(r.to_ascii_lowercase());
            }
        }
        out.push_str(&target[end..]);
        Ok(out)
    } else {
        Ok(mark_deletion(target, start, wild_type.len(), marker, strand))
    }
}

fn mark_deletion(target: &str, start: usize, len: usize, marker: DeletionMarker, strand: Strand) -> String {
    let at = start + marker.offset(strand, len);
    if at >= target.len() {
        return target.to_string();
    }
    format!("{}-{}", &target[..at], &target[at + 1..])
}

/// Builds records against one target.
#[derive(Clone, Copy, Debug)]
pub struct Assembler<'a> {
    target: &'a str,
    arms: &'a Arms,
    include_arms: bool,
}

impl<'a> Assembler<'a> {
    pub fn new(target: &'a str, arms: &'a Arms, include_arms: bool) -> Self {
        Self { target, arms, include_arms }
    }

    pub fn target(&self) -> &'a str {
        self.target
    }

    /// Wild-type target segment of a pegRNA-orientation template.
    pub fn wild_type(&self, rtt: &str, strand: Strand) -> Result<String> {
        wild_type_template(self.target, &strand.to_genomic(rtt))
    }

    fn wrap(&self, core: String) -> String {
        if self.include_arms {
            format!("{}{}{}", self.arms.five_prime, core, self.arms.three_prime)
        } else {
            core
        }
    }

    /// Filler variant of the oligo.
    pub fn compose(&self, spacer: &str, filler: &str, rtt: &str, pbs: &str) -> String {
        self.wrap(format!("{}{}{}{}", spacer, filler, rtt, pbs))
    }

    /// Scaffold variant of the oligo.
    pub fn compose_scaffold(&self, spacer: &str, rtt: &str, pbs: &str) -> String {
        self.wrap(format!("{}{}{}{}", spacer, SCAFFOLD.sequence, rtt, pbs))
    }

    /// Library record for a selected design.
    pub fn record<R: Rng + ?Sized>(
        &self,
        design: &Design,
        edit_position: usize,
        rank: usize,
        rng: &mut R,
    ) -> Result<LibraryRecord> {
        let wild_type = self.wild_type(&design.rtt, design.strand)?;
        let filler = random_filler(rng);
        Ok(LibraryRecord {
            rank,
            pam_no: 0,
            edit_position,
            pam: pam_motif(&design.rtt),
            strand: design.strand,
            edit: format!("{}>{}", design.original_allele, design.edited_allele),
            lha: self.arms.five_prime.clone(),
            spacer: design.spacer.clone(),
            peg_rna: self.compose(&design.spacer, &filler, &design.rtt, &design.pbs),
            peg_rna_sf: self.wrap(design.peg_rna.clone()),
            filler,
            rtt: design.rtt.clone(),
            pbs: design.pbs.clone(),
            rha: self.arms.three_prime.clone(),
            reference: reference_sequence(
                self.target,
                &design.rtt,
                &wild_type,
                design.strand,
                DeletionMarker::Library,
            )?,
            score: design.score,
            syn_position: None,
        })
    }

    /// Draw a new filler and rebuild both oligo variants from the record's
    /// spacer, template and PBS.
    pub fn refresh<R: Rng + ?Sized>(&self, rec: &mut LibraryRecord, rng: &mut R) {
        rec.filler = random_filler(rng);
        rec.peg_rna = self.compose(&rec.spacer, &rec.filler, &rec.rtt, &rec.pbs);
        rec.peg_rna_sf = self.compose_scaffold(&rec.spacer, &rec.rtt, &rec.pbs);
    }
}
