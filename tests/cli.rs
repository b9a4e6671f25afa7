use assert_cmd::prelude::*;
use predicates::str::{contains, is_empty};
use std::fs;
use std::path::Path;
use std::process::Command;

use satlib::seq::revcomp;

const TARGET: &str = "AAACCCGGGTTT";
const REGION: &str = "CCC";
const HEADER: &str = ",Original_Sequence,Spacer-Sequence,PBSrevcomp,RTrevcomp,Target-Strand,OriginalAllele,EditedAllele,pegRNA,PRIDICT2_0_editing_Score_deep_HEK";

/// Predictor tables for the nine candidates of TARGET/REGION: four passing
/// designs each, three on (+) and one on (-).
fn write_predictions(dir: &Path) {
    let candidates = satlib::candidates::generate_candidates(TARGET, REGION).unwrap();
    for (i, cand) in candidates.iter().enumerate() {
        let mut seg = b"CCCGGG".to_vec();
        seg[cand.position] = cand.substitute.to_ascii_lowercase();
        let genomic = String::from_utf8(seg).unwrap();
        let plus_rtt = revcomp(&genomic);
        let (orig, sub) = (cand.original as char, cand.substitute as char);

        let mut table = String::from(HEADER);
        let rows = [
            ("GAAACC", "Fw", &plus_rtt, "TTTTTTTTTT", 60.0),
            ("GAACCC", "Fw", &plus_rtt, "TTTTTTTTTT", 55.0),
            ("GACCCG", "Fw", &plus_rtt, "TTTTTTTTTT", 10.0),
            ("GAAAC", "Rv", &genomic, "TTTTTTTTTTTT", 30.0),
        ];
        for (n, (spacer, strand, rtt, pbs, score)) in rows.iter().enumerate() {
            table.push_str(&format!(
                "\n{},{},{},{},{},{},{},{},{}SCAF,{}",
                n, cand.sequence, spacer, pbs, rtt, strand, orig, sub, spacer, score
            ));
        }
        fs::write(dir.join(format!("seq{}_pegRNA_Pridict_full.csv", i)), table).unwrap();
    }
}

fn satlib() -> Command {
    Command::cargo_bin("satlib").unwrap()
}

#[test]
fn cli_no_args() {
    satlib().assert().failure();
}

#[test]
fn cli_region_outside_target() {
    satlib()
        .args(["candidates", "--target", TARGET, "--region", "GGGG"])
        .assert()
        .failure()
        .stderr(contains("not a substring"));
}

#[test]
fn cli_candidates_to_stdout() {
    satlib()
        .args(["candidates", "--target", TARGET, "--region", REGION])
        .assert()
        .success()
        .stdout(contains("editseq,sequence_name"))
        .stdout(contains("AAA(C/A)CCGGGTTT,seq0"))
        .stdout(contains("AAACC(C/G)GGGTTT,seq8"));
}

#[test]
fn cli_candidates_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("batch.csv");
    satlib()
        .args(["-q", "candidates", "--target", TARGET, "--region", REGION, "-o"])
        .arg(&out)
        .assert()
        .success();
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 1 + 9);
}

#[test]
fn cli_oligos() {
    satlib()
        .arg("oligos")
        .assert()
        .success()
        .stdout(contains("SF"))
        .stdout(contains("GTTTTAGAGCTAGAAATAGCAAGTTAAAATAAGGCTAGTCCGTTATCAACTTGAAAAAGTGGCACCGAGTCGGTGC"));
}

#[test]
fn cli_run_from_precomputed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let predictions = dir.path().join("pridict");
    fs::create_dir(&predictions).unwrap();
    write_predictions(&predictions);
    let out = dir.path().join("library");

    satlib()
        .args(["run", "--target", TARGET, "--region", REGION, "--seed", "7", "--predictions-dir"])
        .arg(&predictions)
        .arg("--outdir")
        .arg(&out)
        .assert()
        .success();

    for name in ["full.csv", "no_ctl.csv", "only_ctl.csv", "synony_full.csv", "freq_table.csv", "freq_plot.svg"] {
        assert!(out.join(name).is_file(), "{} missing", name);
    }

    let no_ctl = fs::read_to_string(out.join("no_ctl.csv")).unwrap();
    assert!(no_ctl.starts_with("peg No. (within edit),PAM No.,"));
    assert_eq!(no_ctl.lines().count(), 1 + 9 * 4);

    let only_ctl = fs::read_to_string(out.join("only_ctl.csv")).unwrap();
    assert!(only_ctl.contains("Stop ctl"));
    assert!(only_ctl.contains("1bp del ctl"));

    let full = fs::read_to_string(out.join("full.csv")).unwrap();
    assert_eq!(full.lines().count(), no_ctl.lines().count() + only_ctl.lines().count() - 1);

    let syn = fs::read_to_string(out.join("synony_full.csv")).unwrap();
    assert!(syn.lines().next().unwrap().ends_with("Syn. Mutation Position"));

    // every region base is hit by all 36 rows
    let freq = fs::read_to_string(out.join("freq_table.csv")).unwrap();
    assert_eq!(freq.lines().count(), 1 + 3);
    assert!(freq.lines().skip(1).all(|l| l.ends_with(",36")));

    // the frequency stage can be re-run from the written table
    let again = dir.path().join("again");
    satlib()
        .args(["frequency", "--target", TARGET, "--region", REGION, "--outdir"])
        .arg(&again)
        .arg(out.join("no_ctl.csv"))
        .assert()
        .success();
    assert_eq!(fs::read_to_string(again.join("freq_table.csv")).unwrap(), freq);
}

#[test]
fn cli_run_missing_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    satlib()
        .args(["run", "--target", TARGET, "--region", REGION, "--predictions-dir"])
        .arg(dir.path())
        .arg("--outdir")
        .arg(dir.path().join("out"))
        .assert()
        .failure();
}

#[test]
fn cli_log_levels() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("batch.csv");
    satlib()
        .args(["candidates", "--target", TARGET, "--region", REGION, "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(contains("[INFO] - Wrote 9 candidates"));
    satlib()
        .args(["-q", "candidates", "--target", TARGET, "--region", REGION, "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(is_empty());
}

#[test]
fn cli_run_with_predictor_command() {
    let dir = tempfile::tempdir().unwrap();
    let predictions = dir.path().join("pridict");
    fs::create_dir(&predictions).unwrap();
    write_predictions(&predictions);

    // stands in for a predictor with its own flag names
    let script = dir.path().join("predict.sh");
    fs::write(
        &script,
        format!(
            "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    --name) name=\"$2\"; shift 2 ;;\n    --out) out=\"$2\"; shift 2 ;;\n    *) shift ;;\n  esac\ndone\ncp \"{}/${{name}}_pegRNA_Pridict_full.csv\" \"$out/\"\n",
            predictions.display()
        ),
    )
    .unwrap();
    let out = dir.path().join("library");

    satlib()
        .args(["run", "--target", TARGET, "--region", REGION, "--no-synonymous"])
        .args(["--predictor-cmd", "sh", "--predictor-arg"])
        .arg(&script)
        .args(["--name-flag", "--name", "--sequence-flag", "--seq", "--output-flag", "--out", "--outdir"])
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("predictions").join("seq8").join("seq8_pegRNA_Pridict_full.csv").is_file());
    let no_ctl = fs::read_to_string(out.join("no_ctl.csv")).unwrap();
    assert_eq!(no_ctl.lines().count(), 1 + 9 * 4);
    assert!(!out.join("synony_full.csv").exists());
}
