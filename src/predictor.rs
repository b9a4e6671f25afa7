//! Adapter to the external editing-outcome predictor (PRIDICT2.0 layout).
//!
//! The predictor is an opaque collaborator: it receives one annotated
//! candidate and produces a table of scored pegRNA designs. Only the columns
//! listed below are relied upon; everything else in the table is ignored.
//!
//! Implementations:
//! - [`CommandPredictor`] runs the predictor as a child process and reads the
//!   table it writes into a per-call output directory.
//! - [`PrecomputedPredictor`] reads tables left behind by earlier runs.
//! - Any `FnMut(usize, &str) -> Result<Vec<Design>>` closure.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::candidates::Candidate;
use crate::seq::Strand;
use crate::{Error, Result};

pub const SPACER: &str = "Spacer-Sequence";
pub const RTT: &str = "RTrevcomp";
pub const PBS: &str = "PBSrevcomp";
pub const TARGET_STRAND: &str = "Target-Strand";
pub const SCORE: &str = "PRIDICT2_0_editing_Score_deep_HEK";
pub const ORIGINAL_ALLELE: &str = "OriginalAllele";
pub const EDITED_ALLELE: &str = "EditedAllele";
pub const PEG_RNA: &str = "pegRNA";

/// Suffix of the per-candidate table written by the predictor.
pub const TABLE_SUFFIX: &str = "_pegRNA_Pridict_full.csv";

/// One scored design as reported by the predictor.
#[derive(Clone, Debug, PartialEq)]
pub struct Design {
    pub spacer: String,
    pub strand: Strand,
    /// RT template in pegRNA orientation, edited base(s) in lower case.
    pub rtt: String,
    /// Primer-binding site in pegRNA orientation.
    pub pbs: String,
    pub original_allele: String,
    pub edited_allele: String,
    pub score: f64,
    /// Scaffold-inclusive pegRNA assembled by the predictor.
    pub peg_rna: String,
}

/// Anything that can score a candidate.
pub trait Predictor {
    /// Score candidate number `index` (its position in the candidate list).
    fn predict(&mut self, index: usize, candidate: &str) -> Result<Vec<Design>>;
}

impl<F> Predictor for F
where
    F: FnMut(usize, &str) -> Result<Vec<Design>>,
{
    fn predict(&mut self, index: usize, candidate: &str) -> Result<Vec<Design>> {
        self(index, candidate)
    }
}

/// Parse a predictor table. `source` is only used in error messages.
pub fn read_designs<R: io::Read>(rdr: R, source: &Path) -> Result<Vec<Design>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| Error::MissingColumn {
            path: source.to_path_buf(),
            column: name.to_string(),
        })
    };
    let spacer = column(SPACER)?;
    let rtt = column(RTT)?;
    let pbs = column(PBS)?;
    let strand = column(TARGET_STRAND)?;
    let score = column(SCORE)?;
    let original = column(ORIGINAL_ALLELE)?;
    let edited = column(EDITED_ALLELE)?;
    let peg_rna = column(PEG_RNA)?;

    let mut designs = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        // header is line 1
        let line = i + 2;
        let field = |idx: usize| rec.get(idx).unwrap_or("").trim();
        let invalid = |name: &str, value: &str| Error::InvalidValue {
            column: name.to_string(),
            line,
            value: value.to_string(),
        };

        let strand_label = field(strand);
        let score_value = field(score);
        designs.push(Design {
            spacer: field(spacer).to_string(),
            strand: Strand::from_label(strand_label).ok_or_else(|| invalid(TARGET_STRAND, strand_label))?,
            rtt: field(rtt).to_string(),
            pbs: field(pbs).to_string(),
            original_allele: field(original).to_string(),
            edited_allele: field(edited).to_string(),
            score: score_value.parse().map_err(|_| invalid(SCORE, score_value))?,
            peg_rna: field(peg_rna).to_string(),
        });
    }
    Ok(designs)
}

/// [`read_designs`] on a file.
pub fn read_designs_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Design>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_designs(file, path)
}

/// Flag names a [`CommandPredictor`] passes its per-call values under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredictorFlags {
    pub sequence_name: String,
    pub editseq: String,
    pub output_dir: String,
}

impl Default for PredictorFlags {
    fn default() -> Self {
        Self {
            sequence_name: "--sequence-name".to_string(),
            editseq: "--editseq".to_string(),
            output_dir: "--output-dir".to_string(),
        }
    }
}

/// Runs the predictor as a child process, once per candidate.
///
/// With the default [`PredictorFlags`] the command line is `<program> <args…>
/// --sequence-name seq<i> --editseq <candidate> --output-dir <workdir>/seq<i>`
/// and the predictor is expected to write
/// `<workdir>/seq<i>/seq<i>_pegRNA_Pridict_full.csv`.
#[derive(Clone, Debug)]
pub struct CommandPredictor {
    program: PathBuf,
    args: Vec<String>,
    workdir: PathBuf,
    flags: PredictorFlags,
}

impl CommandPredictor {
    pub fn new<P: Into<PathBuf>, W: Into<PathBuf>>(program: P, args: Vec<String>, workdir: W) -> Self {
        Self { program: program.into(), args, workdir: workdir.into(), flags: PredictorFlags::default() }
    }

    /// Use other flag names for the per-call values.
    pub fn with_flags(mut self, flags: PredictorFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Directory the predictor writes candidate `index` into.
    pub fn output_dir(&self, index: usize) -> PathBuf {
        self.workdir.join(Candidate::name(index))
    }
}

impl Predictor for CommandPredictor {
    fn predict(&mut self, index: usize, candidate: &str) -> Result<Vec<Design>> {
        let name = Candidate::name(index);
        let dir = self.output_dir(index);
        fs::create_dir_all(&dir)?;
        debug!("predictor: {} {} -> {}", name, candidate, dir.display());

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.flags.sequence_name)
            .arg(&name)
            .arg(&self.flags.editseq)
            .arg(candidate)
            .arg(&self.flags.output_dir)
            .arg(&dir)
            .status()?;
        if !status.success() {
            return Err(Error::PredictorFailed {
                program: self.program.display().to_string(),
                status: status.to_string(),
            });
        }
        read_designs_from_path(dir.join(format!("{}{}", name, TABLE_SUFFIX)))
    }
}

/// Reads `seq<i>_pegRNA_Pridict_full.csv` tables from a directory of earlier
/// predictor runs.
#[derive(Clone, Debug)]
pub struct PrecomputedPredictor {
    dir: PathBuf,
}

impl PrecomputedPredictor {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{}", Candidate::name(index), TABLE_SUFFIX))
    }
}

impl Predictor for PrecomputedPredictor {
    fn predict(&mut self, index: usize, candidate: &str) -> Result<Vec<Design>> {
        let path = self.table_path(index);
        debug!("predictor: {} read from {}", candidate, path.display());
        read_designs_from_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
,Original_Sequence,Spacer-Sequence,PBSrevcomp,RTrevcomp,Target-Strand,OriginalAllele,EditedAllele,pegRNA,PRIDICT2_0_editing_Score_deep_HEK
0,x,GACCCGGGTTTAAACCCGG,CCGGGTTTAAA,CCtGGG,Fw,C,T,GACCCGGGTTTAAACCCGGSCAFCCtGGGCCGGGTTTAAA,71.5
1,x,GTTTAAACCCGGGTTTAAA,AAACCCGGG,CCCaGG,Rv,T,A,GTTTAAACCCGGGTTTAAASCAFCCCaGGAAACCCGGG,12.25
";

    #[test]
    fn parses_expected_columns() {
        let d = read_designs(TABLE.as_bytes(), Path::new("table.csv")).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].strand, Strand::Plus);
        assert_eq!(d[0].rtt, "CCtGGG");
        assert_eq!(d[0].pbs, "CCGGGTTTAAA");
        assert_eq!(d[1].strand, Strand::Minus);
        assert!((d[1].score - 12.25).abs() < 1e-9);
        assert_eq!(d[1].original_allele, "T");
        assert_eq!(d[1].edited_allele, "A");
    }

    #[test]
    fn missing_column_is_fatal() {
        let table = "Spacer-Sequence,RTrevcomp\nGAC,CCt\n";
        match read_designs(table.as_bytes(), Path::new("t.csv")) {
            Err(Error::MissingColumn { column, .. }) => assert_eq!(column, PBS),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_strand_label_reports_line() {
        let table = TABLE.replace(",Rv,", ",Up,");
        match read_designs(table.as_bytes(), Path::new("t.csv")) {
            Err(Error::InvalidValue { column, line, .. }) => {
                assert_eq!(column, TARGET_STRAND);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn closures_are_predictors() {
        let mut calls = Vec::new();
        let mut p = |i: usize, c: &str| -> Result<Vec<Design>> {
            calls.push((i, c.to_string()));
            Ok(Vec::new())
        };
        assert!(p.predict(3, "A(C/G)T").unwrap().is_empty());
        drop(p);
        assert_eq!(calls, vec![(3, "A(C/G)T".to_string())]);
    }

    #[test]
    fn precomputed_tables_are_read_by_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seq4_pegRNA_Pridict_full.csv"), TABLE).unwrap();
        let mut p = PrecomputedPredictor::new(dir.path());
        assert_eq!(p.predict(4, "ignored").unwrap().len(), 2);
        assert!(matches!(p.predict(5, "ignored"), Err(Error::Io(_))));
    }

    /// `sh` script that writes TABLE under `<output flag> <dir>` as
    /// `<name>_pegRNA_Pridict_full.csv`, naming the file after `<name flag>`.
    fn table_script(dir: &Path, name_flag: &str, out_flag: &str) -> PathBuf {
        let table = dir.join("table.csv");
        std::fs::write(&table, TABLE).unwrap();
        let script = dir.join("predict.sh");
        std::fs::write(
            &script,
            format!(
                "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    {}) name=\"$2\"; shift 2 ;;\n    {}) out=\"$2\"; shift 2 ;;\n    *) shift ;;\n  esac\ndone\ncp \"{}\" \"$out/${{name}}_pegRNA_Pridict_full.csv\"\n",
                name_flag,
                out_flag,
                table.display()
            ),
        )
        .unwrap();
        script
    }

    #[test]
    fn command_predictor_reads_the_table_it_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let script = table_script(dir.path(), "--sequence-name", "--output-dir");
        let work = dir.path().join("runs");
        let mut p = CommandPredictor::new("sh", vec![script.display().to_string()], &work);
        let designs = p.predict(2, "AAA(C/T)GGG").unwrap();
        assert_eq!(designs.len(), 2);
        assert_eq!(designs[0].rtt, "CCtGGG");
        assert!(work.join("seq2").join("seq2_pegRNA_Pridict_full.csv").is_file());
    }

    #[test]
    fn command_predictor_takes_other_flag_names() {
        let dir = tempfile::tempdir().unwrap();
        let script = table_script(dir.path(), "--name", "--out");
        let flags = PredictorFlags {
            sequence_name: "--name".into(),
            editseq: "--sequence".into(),
            output_dir: "--out".into(),
        };
        let mut p = CommandPredictor::new("sh", vec![script.display().to_string()], dir.path().join("runs"))
            .with_flags(flags);
        assert_eq!(p.predict(0, "AAA(C/T)GGG").unwrap().len(), 2);
    }

    #[test]
    fn failing_predictor_halts() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "exit 1\n").unwrap();
        let mut p = CommandPredictor::new("sh", vec![script.display().to_string()], dir.path().join("runs"));
        match p.predict(0, "AAA(C/T)GGG") {
            Err(Error::PredictorFailed { program, .. }) => assert_eq!(program, "sh"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
