//! Library variant whose templates carry an extra silent mutation.
//!
//! Each candidate row keeps its primary edit and gains one synonymous
//! substitution next to the PAM, which stops the edited allele from being
//! nicked again. Controls are rebuilt from the wild-type templates of the
//! unmodified groups.
use log::{info, warn};
use rand::Rng;

use crate::assemble::{reference_sequence, Assembler, DeletionMarker, LibraryRecord};
use crate::codon::{edit_position, preserving_template, ControlDesigner, SynonymousDesigner};
use crate::group::{attach_controls, group_wild_type, partition, Library};
use crate::{Error, Result};

/// Reported offset of a silent mutation found at template index `index`.
pub fn syn_mutation_position(index: usize) -> i64 {
    25 - index as i64 - 4
}

/// Copy of `rec` with a silent mutation added to its template.
///
/// The new template is compared with the upper-cased original to locate the
/// silent change. When none is present (the silent change fell on the primary
/// edit) the position is left empty.
pub fn synonymous_record<S, R>(
    assembler: &Assembler<'_>,
    designer: &S,
    rec: &LibraryRecord,
    rng: &mut R,
) -> Result<LibraryRecord>
where
    S: SynonymousDesigner + ?Sized,
    R: Rng + ?Sized,
{
    let strand = rec.strand;
    let wild_type = assembler.wild_type(&rec.rtt, strand)?;
    let synonymous = strand.from_genomic(&designer.synonymous_template(&wild_type, strand)?);
    let edited = rec.rtt.to_ascii_uppercase();
    let rtt = preserving_template(&synonymous, &edited, &strand.from_genomic(&wild_type));

    let syn_position = edit_position(&rtt, &edited).map(syn_mutation_position);
    if syn_position.is_none() {
        warn!(
            "PAM {} position {}: silent mutation collides with the edit in {}",
            rec.pam_no, rec.edit_position, rec.rtt
        );
    }

    let mut out = rec.clone();
    out.reference = reference_sequence(
        assembler.target(),
        &rtt.to_ascii_uppercase(),
        &wild_type,
        strand,
        DeletionMarker::Library,
    )?;
    out.rtt = rtt;
    out.syn_position = syn_position;
    assembler.refresh(&mut out, rng);
    Ok(out)
}

/// Synonymous library from the candidate rows of a grouped library.
///
/// `candidates` must carry PAM numbers (a `no_ctl.csv` table or
/// [`Library::candidates`]). Every group is closed with controls built from
/// the wild-type template of its original top-scoring row; their reference
/// annotation is the target with its middle base marked `-`.
pub fn synonymous_library<D, R>(
    assembler: &Assembler<'_>,
    designer: &D,
    candidates: Vec<LibraryRecord>,
    rng: &mut R,
) -> Result<Library>
where
    D: ControlDesigner + SynonymousDesigner + ?Sized,
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return Err(Error::EmptyLibrary);
    }
    let mut groups = Vec::new();
    for (pam_no, rows) in partition(candidates) {
        let wild_type = group_wild_type(assembler, &rows)?;
        let modified = rows
            .iter()
            .map(|r| synonymous_record(assembler, designer, r, &mut *rng))
            .collect::<Result<Vec<_>>>()?;
        groups.push(attach_controls(
            assembler,
            designer,
            pam_no,
            modified,
            &wild_type,
            DeletionMarker::TargetMidpoint,
            &mut *rng,
        )?);
    }
    let lib = Library { groups };
    info!("Synonymous library: {} rows in {} groups", lib.len(), lib.groups.len());
    Ok(lib)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codon::CodonDesigner;
    use crate::config::Arms;
    use crate::group::{build_library, GroupingMode, DELETION_CONTROL};
    use crate::predictor::Design;
    use crate::seq::Strand;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    const TARGET: &str = "ACCCAGGATTCTTTCCTCAGGGGACATGCTGCCTATAGTTCTGCAGTTAACATCCTCCTT";

    fn designer() -> CodonDesigner {
        CodonDesigner::new(TARGET, 0, 0, &BTreeSet::new())
    }

    fn design(spacer: &str, strand: Strand, rtt: &str, score: f64) -> Design {
        Design {
            spacer: spacer.to_string(),
            strand,
            rtt: rtt.to_string(),
            pbs: "GAAAGAATCC".to_string(),
            original_allele: "A".into(),
            edited_allele: "T".into(),
            score,
            peg_rna: String::new(),
        }
    }

    fn library(asm: &Assembler<'_>, rng: &mut StdRng) -> Library {
        let recs = [
            design("GTTAACTGCAG", Strand::Minus, "GCCTATtGTTCT", 70.0),
            design("GGGATTCTTTC", Strand::Plus, "TCCCCTtAGGAA", 50.0),
            design("GGGATTCTTTC", Strand::Plus, "TCCaCTGAGGAA", 30.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, d)| asm.record(d, i + 1, 1, &mut *rng).unwrap())
        .collect();
        build_library(asm, &designer(), recs, GroupingMode::IndexChange, rng).unwrap()
    }

    #[test]
    fn position_offset() {
        assert_eq!(syn_mutation_position(0), 21);
        assert_eq!(syn_mutation_position(21), 0);
        assert_eq!(syn_mutation_position(30), -9);
    }

    #[test]
    fn silent_change_is_added_next_to_the_edit() {
        let arms = Arms::default();
        let asm = Assembler::new(TARGET, &arms, true);
        let mut rng = StdRng::seed_from_u64(9);
        let lib = library(&asm, &mut rng);
        // TCCaCTGAGGAA: edit at template index 3
        let rec = lib.candidates()[1].clone();
        let syn = synonymous_record(&asm, &designer(), &rec, &mut rng).unwrap();

        assert_eq!(syn.rtt, "TCCACTtAGGAA");
        assert_eq!(syn.syn_position, Some(15));
        // primary edit survives, upper-cased; one lower-case silent change
        let primary = rec.rtt.bytes().position(|b| b.is_ascii_lowercase()).unwrap();
        assert_eq!(syn.rtt.as_bytes()[primary], rec.rtt.as_bytes()[primary].to_ascii_uppercase());
        assert_eq!(syn.rtt.bytes().filter(u8::is_ascii_lowercase).count(), 1);
        let at = syn.rtt.bytes().position(|b| b.is_ascii_lowercase()).unwrap();
        assert_eq!(syn.syn_position, Some(syn_mutation_position(at)));
        // both edits show up in the reference
        assert_eq!(syn.reference.bytes().filter(u8::is_ascii_lowercase).count(), 2);
        assert_eq!(syn.peg_rna_sf, asm.compose_scaffold(&syn.spacer, &syn.rtt, &syn.pbs));
    }

    #[test]
    fn collision_with_the_primary_edit_leaves_no_position() {
        let arms = Arms::default();
        let asm = Assembler::new(TARGET, &arms, true);
        let mut rng = StdRng::seed_from_u64(13);
        let lib = library(&asm, &mut rng);
        // TCCCCTtAGGAA: the silent change would land on the edited base
        let rec = lib.candidates()[0].clone();
        let syn = synonymous_record(&asm, &designer(), &rec, &mut rng).unwrap();
        assert_eq!(syn.rtt, "TCCCCTTAGGAA");
        assert_eq!(syn.syn_position, None);
    }

    #[test]
    fn synonymous_library_keeps_group_shape() {
        let arms = Arms::default();
        let asm = Assembler::new(TARGET, &arms, true);
        let mut rng = StdRng::seed_from_u64(10);
        let lib = library(&asm, &mut rng);
        let rows: Vec<LibraryRecord> = lib.candidates().into_iter().cloned().collect();
        let syn = synonymous_library(&asm, &designer(), rows, &mut rng).unwrap();

        assert_eq!(syn.groups.len(), lib.groups.len());
        for (a, b) in syn.groups.iter().zip(&lib.groups) {
            assert_eq!(a.pam_no, b.pam_no);
            assert_eq!(a.candidates.len(), b.candidates.len());
            assert_eq!(a.deletion.edit, DELETION_CONTROL);
            // controls come from the unmodified wild type
            assert_eq!(a.deletion.rtt, b.deletion.rtt);
            assert_eq!(a.stop.rtt, b.stop.rtt);
            assert!(a.stop.syn_position.is_none());
        }
    }

    #[test]
    fn controls_mark_the_target_midpoint() {
        let arms = Arms::default();
        let asm = Assembler::new(TARGET, &arms, true);
        let mut rng = StdRng::seed_from_u64(11);
        let lib = library(&asm, &mut rng);
        let rows: Vec<LibraryRecord> = lib.candidates().into_iter().cloned().collect();
        let syn = synonymous_library(&asm, &designer(), rows, &mut rng).unwrap();
        let mid = TARGET.len() / 2;
        let expected = format!("{}-{}", &TARGET[..mid], &TARGET[mid + 1..]);
        for g in &syn.groups {
            assert_eq!(g.stop.reference, expected);
            assert_eq!(g.deletion.reference, expected);
        }
        // the main library keeps the template-based marker
        assert_eq!(lib.groups[0].deletion.reference.as_bytes()[14], b'-');
        assert!(lib.groups[0].stop.reference.bytes().any(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn empty_input_is_rejected() {
        let arms = Arms::default();
        let asm = Assembler::new(TARGET, &arms, true);
        let mut rng = StdRng::seed_from_u64(12);
        assert!(matches!(
            synonymous_library(&asm, &designer(), Vec::new(), &mut rng),
            Err(Error::EmptyLibrary)
        ));
    }
}
