//! Cut-site groups and control pegRNAs.
//!
//! Records are ordered by spacer position, `(+)` before `(-)`, and numbered
//! into PAM groups. Every group then receives two controls derived from the
//! wild-type template of its top-scoring record: one that installs an
//! in-frame stop codon and one that deletes the template's middle base.
use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use rand::Rng;

use crate::assemble::{reference_sequence, Assembler, DeletionMarker, LibraryRecord};
use crate::codon::ControlDesigner;
use crate::seq::{spacer_index, Strand};
use crate::{Error, Result};

/// `Edit` label of a stop control.
pub const STOP_CONTROL: &str = "Stop ctl";
/// `Edit` label of a single-base deletion control.
pub const DELETION_CONTROL: &str = "1bp del ctl";

/// When the PAM counter advances while walking the ordered records.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GroupingMode {
    /// On every change of spacer index. A `(+)` and a `(-)` spacer with the
    /// same index end up in one group.
    #[default]
    IndexChange,
    /// On every change of strand or spacer index.
    StrandAware,
}

impl FromStr for GroupingMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "index" | "index-change" => Ok(Self::IndexChange),
            "strand" | "strand-aware" => Ok(Self::StrandAware),
            other => Err(format!("Unknown grouping mode: {}", other)),
        }
    }
}

/// Records of one PAM number followed by its two controls.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub pam_no: usize,
    pub candidates: Vec<LibraryRecord>,
    pub stop: LibraryRecord,
    pub deletion: LibraryRecord,
}

impl Group {
    /// Candidates, then stop and deletion controls.
    pub fn rows(&self) -> impl Iterator<Item = &LibraryRecord> {
        self.candidates.iter().chain([&self.stop, &self.deletion])
    }
}

/// A grouped library with its three report views.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Library {
    pub groups: Vec<Group>,
}

impl Library {
    /// Every row, group by group.
    pub fn full(&self) -> Vec<&LibraryRecord> {
        self.groups.iter().flat_map(|g| g.rows()).collect()
    }

    /// Rows without controls.
    pub fn candidates(&self) -> Vec<&LibraryRecord> {
        self.groups.iter().flat_map(|g| g.candidates.iter()).collect()
    }

    /// The last two rows of every group.
    pub fn controls(&self) -> Vec<&LibraryRecord> {
        self.groups.iter().flat_map(|g| [&g.stop, &g.deletion]).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.candidates.len() + 2).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Order records and assign PAM numbers.
///
/// `(+)` records are sorted by ascending spacer index, `(-)` records by
/// descending index; the two runs are concatenated and the counter starts
/// at 1.
pub fn number_groups(target: &str, records: Vec<LibraryRecord>, mode: GroupingMode) -> Result<Vec<LibraryRecord>> {
    let mut plus = Vec::new();
    let mut minus = Vec::new();
    for rec in records {
        let idx = spacer_index(target, &rec.spacer, rec.strand)?;
        match rec.strand {
            Strand::Plus => plus.push((idx, rec)),
            Strand::Minus => minus.push((idx, rec)),
        }
    }
    plus.sort_by_key(|(idx, _)| *idx);
    minus.sort_by(|a, b| b.0.cmp(&a.0));

    let mut pam_no = 0;
    let mut last: Option<(Strand, usize)> = None;
    let mut out = Vec::with_capacity(plus.len() + minus.len());
    for (idx, mut rec) in plus.into_iter().chain(minus) {
        let key = (rec.strand, idx);
        let advance = match (last, mode) {
            (None, _) => true,
            (Some((_, prev)), GroupingMode::IndexChange) => prev != idx,
            (Some(prev), GroupingMode::StrandAware) => prev != key,
        };
        if advance {
            pam_no += 1;
        }
        last = Some(key);
        rec.pam_no = pam_no;
        out.push(rec);
    }
    Ok(out)
}

/// Split numbered records by PAM number, in ascending number order.
pub fn partition(records: Vec<LibraryRecord>) -> Vec<(usize, Vec<LibraryRecord>)> {
    let mut groups: BTreeMap<usize, Vec<LibraryRecord>> = BTreeMap::new();
    for rec in records {
        groups.entry(rec.pam_no).or_default().push(rec);
    }
    groups.into_iter().collect()
}

/// Highest-scoring record; the first one wins a tie.
pub fn top_record(records: &[LibraryRecord]) -> Option<&LibraryRecord> {
    records.iter().fold(None, |best, r| match best {
        Some(b) if b.score >= r.score => Some(b),
        _ => Some(r),
    })
}

/// Wild-type template (target orientation) of a group's top record.
pub fn group_wild_type(assembler: &Assembler<'_>, records: &[LibraryRecord]) -> Result<String> {
    let top = top_record(records).ok_or(Error::EmptyLibrary)?;
    assembler.wild_type(&top.rtt, top.strand)
}

/// Wild-type template without its middle base (index `len / 2`).
pub fn deletion_template(wild_type: &str) -> String {
    let mid = wild_type.len() / 2;
    format!("{}{}", &wild_type[..mid], wild_type.get(mid + 1..).unwrap_or(""))
}

/// Close a group with its stop and deletion controls.
///
/// Controls copy the top record (rank, score, spacer, PBS, PAM), carry
/// templates built from `wild_type` in pegRNA orientation, and get a fresh
/// filler and rebuilt oligos.
pub fn attach_controls<D, R>(
    assembler: &Assembler<'_>,
    designer: &D,
    pam_no: usize,
    candidates: Vec<LibraryRecord>,
    wild_type: &str,
    marker: DeletionMarker,
    rng: &mut R,
) -> Result<Group>
where
    D: ControlDesigner + ?Sized,
    R: Rng + ?Sized,
{
    let top = top_record(&candidates).ok_or(Error::EmptyLibrary)?.clone();
    let strand = top.strand;

    let control = |rtt: String, label: &str, rng: &mut R| -> Result<LibraryRecord> {
        let mut rec = top.clone();
        rec.reference = reference_sequence(assembler.target(), &rtt, wild_type, strand, marker)?;
        rec.rtt = rtt;
        rec.edit = label.to_string();
        rec.syn_position = None;
        assembler.refresh(&mut rec, rng);
        Ok(rec)
    };

    let stop_rtt = strand.from_genomic(&designer.stop_template(wild_type, strand)?);
    let deletion_rtt = strand.from_genomic(&deletion_template(wild_type));
    debug!("PAM {}: stop {} / deletion {}", pam_no, stop_rtt, deletion_rtt);

    let stop = control(stop_rtt, STOP_CONTROL, &mut *rng)?;
    let deletion = control(deletion_rtt, DELETION_CONTROL, &mut *rng)?;
    Ok(Group { pam_no, candidates, stop, deletion })
}

/// Number, partition and close every group of a set of library records.
pub fn build_library<D, R>(
    assembler: &Assembler<'_>,
    designer: &D,
    records: Vec<LibraryRecord>,
    mode: GroupingMode,
    rng: &mut R,
) -> Result<Library>
where
    D: ControlDesigner + ?Sized,
    R: Rng + ?Sized,
{
    if records.is_empty() {
        return Err(Error::EmptyLibrary);
    }
    let numbered = number_groups(assembler.target(), records, mode)?;
    let mut groups = Vec::new();
    for (pam_no, candidates) in partition(numbered) {
        let wild_type = group_wild_type(assembler, &candidates)?;
        groups.push(attach_controls(
            assembler,
            designer,
            pam_no,
            candidates,
            &wild_type,
            DeletionMarker::Library,
            rng,
        )?);
    }
    Ok(Library { groups })
}
