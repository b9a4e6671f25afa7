use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use polars::prelude::*;

use satlib::candidates::{batch_template, generate_candidates};
use satlib::config::{Arms, RunConfig, SpliceSites};
use satlib::group::GroupingMode;
use satlib::predictor::{CommandPredictor, PrecomputedPredictor, Predictor, PredictorFlags};
use satlib::report;
use satlib::select::DEFAULT_TOP_N;

/// satlib CLI
#[derive(Parser)]
#[command(name = "satlib")]
#[command(version)]
#[command(about = "Saturation-mutagenesis prime-editing library designer", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Target locus and library layout.
#[derive(Args, Clone, Debug)]
struct Locus {
    /// Target sequence
    #[arg(long, conflicts_with = "target_fasta")]
    target: Option<String>,
    /// FASTA file whose first record is the target
    #[arg(long)]
    target_fasta: Option<PathBuf>,
    /// Saturation region (substring of the target)
    #[arg(long)]
    region: Option<String>,
    /// Use the built-in example locus and its splice sites
    #[arg(long, conflicts_with_all = ["target", "target_fasta", "region"])]
    example: bool,
    /// Reading frame of the region (0, 1 or 2)
    #[arg(long, default_value_t = 0)]
    frame: usize,
    /// Acceptor splice site, 1-based inclusive region coordinates (e.g. 18-21)
    #[arg(long, value_parser = parse_site)]
    acceptor: Option<(usize, usize)>,
    /// Donor splice site, 1-based inclusive region coordinates (e.g. 223-231)
    #[arg(long, value_parser = parse_site)]
    donor: Option<(usize, usize)>,
    /// Leave the homology arms off the oligos
    #[arg(long)]
    no_homology_arms: bool,
    /// 5' homology arm
    #[arg(long)]
    lha: Option<String>,
    /// 3' homology arm
    #[arg(long)]
    rha: Option<String>,
    /// Filler RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Designs kept per candidate
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
    /// Start a new PAM group on strand changes as well as spacer-index changes
    #[arg(long)]
    strand_aware: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Design the library: predictor, selection, groups, controls, synonymous library, frequency
    Run {
        #[command(flatten)]
        locus: Locus,
        /// Output directory
        #[arg(long, short, default_value = "library")]
        outdir: PathBuf,
        /// Predictor program, run once per candidate
        #[arg(long, conflicts_with = "predictions_dir")]
        predictor_cmd: Option<PathBuf>,
        /// Extra argument passed to the predictor (repeatable)
        #[arg(long = "predictor-arg", allow_hyphen_values = true)]
        predictor_args: Vec<String>,
        /// Predictor flag taking the run name (seq<i>)
        #[arg(long, default_value = "--sequence-name", allow_hyphen_values = true)]
        name_flag: String,
        /// Predictor flag taking the annotated candidate
        #[arg(long, default_value = "--editseq", allow_hyphen_values = true)]
        sequence_flag: String,
        /// Predictor flag taking the per-call output directory
        #[arg(long, default_value = "--output-dir", allow_hyphen_values = true)]
        output_flag: String,
        /// Directory of seq<i>_pegRNA_Pridict_full.csv tables from earlier predictor runs
        #[arg(long)]
        predictions_dir: Option<PathBuf>,
        /// Skip the synonymous library
        #[arg(long)]
        no_synonymous: bool,
    },

    /// Write the predictor batch table (editseq, sequence_name)
    Candidates {
        #[command(flatten)]
        locus: Locus,
        /// Output CSV (stdout when absent)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Build the synonymous library from a candidates-only table (no_ctl.csv)
    Synonymous {
        #[command(flatten)]
        locus: Locus,
        /// Library table without controls
        library: PathBuf,
        #[arg(long, short, default_value = "library")]
        outdir: PathBuf,
    },

    /// Frequency table and plot for a candidates-only table (no_ctl.csv)
    Frequency {
        #[command(flatten)]
        locus: Locus,
        /// Library table without controls
        library: PathBuf,
        #[arg(long, short, default_value = "library")]
        outdir: PathBuf,
    },

    /// Print the embedded cloning oligos
    Oligos,
}

fn parse_site(s: &str) -> std::result::Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(['-', ':', ','])
        .ok_or_else(|| format!("expected FROM-TO, got `{}`", s))?;
    let from: usize = a.trim().parse().map_err(|_| format!("bad start `{}`", a))?;
    let to: usize = b.trim().parse().map_err(|_| format!("bad end `{}`", b))?;
    if from == 0 || to < from {
        return Err(format!("site must satisfy 1 <= FROM <= TO, got {}-{}", from, to));
    }
    Ok((from, to))
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .format(|buf, record| writeln!(buf, "{} [{}] - {}", buf.timestamp_seconds(), record.level(), record.args()))
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// First record of a FASTA file as an upper-case string.
fn read_target_fasta(path: &Path) -> Result<String> {
    let mut reader = needletail::parse_fastx_file(path)
        .with_context(|| format!("opening target FASTA {}", path.display()))?;
    match reader.next() {
        Some(rec) => {
            let rec = rec.with_context(|| format!("reading {}", path.display()))?;
            let seq = String::from_utf8_lossy(&rec.seq()).to_ascii_uppercase();
            info!("Target {} ({} nt) from {}", String::from_utf8_lossy(rec.id()), seq.len(), path.display());
            Ok(seq)
        }
        None => bail!("{} holds no sequence", path.display()),
    }
}

impl Locus {
    fn config(&self) -> Result<RunConfig> {
        let mut config = if self.example {
            RunConfig::example()
        } else {
            let target = match (&self.target, &self.target_fasta) {
                (Some(t), _) => t.clone(),
                (None, Some(path)) => read_target_fasta(path)?,
                (None, None) => bail!("one of --target, --target-fasta or --example is required"),
            };
            let Some(region) = &self.region else {
                bail!("--region is required unless --example is given");
            };
            RunConfig::new(&target, region, self.frame).context("invalid locus")?
        };
        // the example keeps its own sites unless either is overridden
        if !self.example || self.acceptor.is_some() || self.donor.is_some() {
            config.splice = SpliceSites { acceptor: self.acceptor, donor: self.donor };
        }
        let defaults = Arms::default();
        config.arms = Arms {
            five_prime: self.lha.clone().unwrap_or(defaults.five_prime).to_ascii_uppercase(),
            three_prime: self.rha.clone().unwrap_or(defaults.three_prime).to_ascii_uppercase(),
        };
        config.homology_arms = !self.no_homology_arms;
        config.top_n = self.top_n;
        if self.strand_aware {
            config.grouping = GroupingMode::StrandAware;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn create_outdir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            locus,
            outdir,
            predictor_cmd,
            predictor_args,
            name_flag,
            sequence_flag,
            output_flag,
            predictions_dir,
            no_synonymous,
        } => {
            let config = locus.config()?;
            create_outdir(&outdir)?;
            let mut predictor: Box<dyn Predictor> = match (predictor_cmd, predictions_dir) {
                (Some(cmd), _) => {
                    let flags = PredictorFlags { sequence_name: name_flag, editseq: sequence_flag, output_dir: output_flag };
                    Box::new(CommandPredictor::new(cmd, predictor_args, outdir.join("predictions")).with_flags(flags))
                }
                (None, Some(dir)) => Box::new(PrecomputedPredictor::new(dir)),
                (None, None) => bail!("one of --predictor-cmd or --predictions-dir is required"),
            };

            let mut rng = config.rng();
            let library = satlib::design_library(&config, predictor.as_mut(), &mut rng).context("designing library")?;
            report::write_library(&library, &outdir)?;

            let candidates: Vec<_> = library.candidates().into_iter().cloned().collect();
            if !no_synonymous {
                let syn = satlib::design_synonymous_library(&config, candidates.clone(), &mut rng)
                    .context("designing synonymous library")?;
                report::write_synonymous(&syn, &outdir)?;
            }
            let freqs = satlib::frequency(&config, &candidates)?;
            report::write_frequency(&freqs, &outdir)?;
        }

        Commands::Candidates { locus, output } => {
            let config = locus.config()?;
            let cands = generate_candidates(&config.target, &config.region)?;
            let mut df = batch_template(&cands)?;
            match output {
                Some(path) => {
                    report::write_csv(&mut df, &path)?;
                    info!("Wrote {} candidates to {}", cands.len(), path.display());
                }
                None => CsvWriter::new(std::io::stdout()).include_header(true).finish(&mut df)?,
            }
        }

        Commands::Synonymous { locus, library, outdir } => {
            let config = locus.config()?;
            let rows = report::read_library_from_path(&library)
                .with_context(|| format!("reading library {}", library.display()))?;
            create_outdir(&outdir)?;
            let syn = satlib::design_synonymous_library(&config, rows, &mut config.rng())?;
            report::write_synonymous(&syn, &outdir)?;
        }

        Commands::Frequency { locus, library, outdir } => {
            let config = locus.config()?;
            let rows = report::read_library_from_path(&library)
                .with_context(|| format!("reading library {}", library.display()))?;
            create_outdir(&outdir)?;
            let freqs = satlib::frequency(&config, &rows)?;
            report::write_frequency(&freqs, &outdir)?;
        }

        Commands::Oligos => cmd_oligos()?,
    }

    Ok(())
}

fn cmd_oligos() -> Result<()> {
    use satlib::data::oligos::ALL;

    let df = df!(
        "name"     => ALL.iter().map(|o| o.name).collect::<Vec<_>>(),
        "length"   => ALL.iter().map(|o| o.sequence.len() as u64).collect::<Vec<_>>(),
        "sequence" => ALL.iter().map(|o| o.sequence).collect::<Vec<_>>(),
        "source"   => ALL.iter().map(|o| o.provenance.source).collect::<Vec<_>>(),
    )?;

    // Polars' pretty-printer reads these; show every row and the full sequences.
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000");
    std::env::set_var("POLARS_FMT_STR_LEN", "1000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");
    println!("{}", df);
    Ok(())
}
