//! CSV reports, frequency table and frequency plot.
//!
//! Library tables are built as polars `DataFrame`s and written with
//! `CsvWriter`. Tables written by an earlier run are read back with the csv
//! crate so the synonymous and frequency stages can be re-run on their own.
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;
use polars::prelude::*;

use crate::assemble::{Assembler, LibraryRecord};
use crate::group::Library;
use crate::seq::{locate_region, Strand};
use crate::{Error, Result};

pub const FULL_CSV: &str = "full.csv";
pub const NO_CONTROLS_CSV: &str = "no_ctl.csv";
pub const ONLY_CONTROLS_CSV: &str = "only_ctl.csv";
pub const SYNONYMOUS_CSV: &str = "synony_full.csv";
pub const FREQUENCY_CSV: &str = "freq_table.csv";
pub const FREQUENCY_PLOT: &str = "freq_plot.svg";

pub const PEG_NO: &str = "peg No. (within edit)";
pub const PAM_NO: &str = "PAM No.";
pub const EDIT_POSITION: &str = "Edit Position (sat. area)";
pub const PAM: &str = "PAM";
pub const STRAND: &str = "Strand";
pub const EDIT: &str = "Edit";
pub const LHA: &str = "LHA";
pub const SPACER: &str = "Spacer";
pub const FILLER: &str = "Filler";
pub const RTT: &str = "RTTs";
pub const PBS: &str = "PBS";
pub const RHA: &str = "RHA";
pub const PEG_RNA: &str = "Complete epegRNA";
pub const PEG_RNA_SF: &str = "Complete epegRNA (SF)";
pub const LENGTH: &str = "Length (bp)";
pub const LENGTH_SF: &str = "Length (bp) (SF)";
pub const REFERENCE: &str = "Reference Sequence";
pub const SCORE: &str = "PRIDICT2.0 Score";
pub const SYN_POSITION: &str = "Syn. Mutation Position";

/// Library rows as a report table. `synonymous` adds the silent-mutation column.
pub fn library_frame<'a, I>(rows: I, synonymous: bool) -> PolarsResult<DataFrame>
where
    I: IntoIterator<Item = &'a LibraryRecord>,
{
    let rows: Vec<&LibraryRecord> = rows.into_iter().collect();
    let text = |f: &dyn Fn(&LibraryRecord) -> String| -> Vec<String> { rows.iter().map(|r| f(r)).collect() };
    let count = |f: &dyn Fn(&LibraryRecord) -> usize| -> Vec<u64> { rows.iter().map(|r| f(r) as u64).collect() };

    let mut df = df!(
        PEG_NO        => count(&|r| r.rank),
        PAM_NO        => count(&|r| r.pam_no),
        EDIT_POSITION => count(&|r| r.edit_position),
        PAM           => text(&|r| r.pam.clone()),
        STRAND        => text(&|r| r.strand.to_string()),
        EDIT          => text(&|r| r.edit.clone()),
        LHA           => text(&|r| r.lha.clone()),
        SPACER        => text(&|r| r.spacer.clone()),
        FILLER        => text(&|r| r.filler.clone()),
        RTT           => text(&|r| r.rtt.clone()),
        PBS           => text(&|r| r.pbs.clone()),
        RHA           => text(&|r| r.rha.clone()),
        PEG_RNA       => text(&|r| r.peg_rna.clone()),
        PEG_RNA_SF    => text(&|r| r.peg_rna_sf.clone()),
        LENGTH        => count(&|r| r.length()),
        LENGTH_SF     => count(&|r| r.length_sf()),
        REFERENCE     => text(&|r| r.reference.clone()),
        SCORE         => rows.iter().map(|r| r.score).collect::<Vec<f64>>(),
    )?;
    if synonymous {
        let syn = df!(SYN_POSITION => rows.iter().map(|r| r.syn_position).collect::<Vec<Option<i64>>>())?;
        df = df.hstack(syn.get_columns())?;
    }
    Ok(df)
}

/// Write a frame as CSV with a header line.
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    Ok(())
}

/// Write `full.csv`, `no_ctl.csv` and `only_ctl.csv` into `dir`.
pub fn write_library<P: AsRef<Path>>(library: &Library, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let views = [
        (FULL_CSV, library.full()),
        (NO_CONTROLS_CSV, library.candidates()),
        (ONLY_CONTROLS_CSV, library.controls()),
    ];
    let mut written = Vec::new();
    for (name, rows) in views {
        let path = dir.join(name);
        let n = rows.len();
        write_csv(&mut library_frame(rows, false)?, &path)?;
        info!("Wrote {} rows to {}", n, path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write the synonymous library as `synony_full.csv` into `dir`.
pub fn write_synonymous<P: AsRef<Path>>(library: &Library, dir: P) -> Result<PathBuf> {
    let path = dir.as_ref().join(SYNONYMOUS_CSV);
    write_csv(&mut library_frame(library.full(), true)?, &path)?;
    info!("Wrote {} rows to {}", library.len(), path.display());
    Ok(path)
}

/// Parse a library table written by [`write_library`] or [`write_synonymous`].
///
/// Length columns are derived from the oligos and not read.
pub fn read_library<R: io::Read>(rdr: R, source: &Path) -> Result<Vec<LibraryRecord>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let column = |name: &str| {
        position(name).ok_or_else(|| Error::MissingColumn {
            path: source.to_path_buf(),
            column: name.to_string(),
        })
    };
    let peg_no = column(PEG_NO)?;
    let pam_no = column(PAM_NO)?;
    let edit_pos = column(EDIT_POSITION)?;
    let pam = column(PAM)?;
    let strand = column(STRAND)?;
    let edit = column(EDIT)?;
    let lha = column(LHA)?;
    let spacer = column(SPACER)?;
    let filler = column(FILLER)?;
    let rtt = column(RTT)?;
    let pbs = column(PBS)?;
    let rha = column(RHA)?;
    let peg_rna = column(PEG_RNA)?;
    let peg_rna_sf = column(PEG_RNA_SF)?;
    let reference = column(REFERENCE)?;
    let score = column(SCORE)?;
    let syn = position(SYN_POSITION);

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let line = i + 2;
        let field = |idx: usize| rec.get(idx).unwrap_or("").trim();
        let invalid = |name: &str, value: &str| Error::InvalidValue {
            column: name.to_string(),
            line,
            value: value.to_string(),
        };
        let number = |name: &str, idx: usize| -> Result<usize> {
            field(idx).parse().map_err(|_| invalid(name, field(idx)))
        };

        out.push(LibraryRecord {
            rank: number(PEG_NO, peg_no)?,
            pam_no: number(PAM_NO, pam_no)?,
            edit_position: number(EDIT_POSITION, edit_pos)?,
            pam: field(pam).to_string(),
            strand: Strand::from_label(field(strand)).ok_or_else(|| invalid(STRAND, field(strand)))?,
            edit: field(edit).to_string(),
            lha: field(lha).to_string(),
            spacer: field(spacer).to_string(),
            filler: field(filler).to_string(),
            rtt: field(rtt).to_string(),
            pbs: field(pbs).to_string(),
            rha: field(rha).to_string(),
            peg_rna: field(peg_rna).to_string(),
            peg_rna_sf: field(peg_rna_sf).to_string(),
            reference: field(reference).to_string(),
            score: field(score).parse().map_err(|_| invalid(SCORE, field(score)))?,
            syn_position: match syn.map(field) {
                Some(v) if !v.is_empty() => Some(v.parse().map_err(|_| invalid(SYN_POSITION, v))?),
                _ => None,
            },
        });
    }
    Ok(out)
}

/// [`read_library`] on a file.
pub fn read_library_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<LibraryRecord>> {
    let path = path.as_ref();
    read_library(File::open(path)?, path)
}

/// How many library rows cover one region base.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frequency {
    /// 1-based position within the region.
    pub position: usize,
    pub base: char,
    pub count: usize,
}

/// Per-position count of rows whose wild-type template spans the base.
pub fn frequency_table<'a, I>(assembler: &Assembler<'_>, region: &str, rows: I) -> Result<Vec<Frequency>>
where
    I: IntoIterator<Item = &'a LibraryRecord>,
{
    let target = assembler.target();
    let start = locate_region(target, region)?;
    let mut coverage = vec![0usize; target.len()];
    for rec in rows {
        let wild_type = assembler.wild_type(&rec.rtt, rec.strand)?;
        let at = target.find(&wild_type).ok_or_else(|| Error::WildTypeUnresolved {
            pattern: wild_type.clone(),
            matches: 0,
        })?;
        for c in &mut coverage[at..at + wild_type.len()] {
            *c += 1;
        }
    }
    Ok(region
        .chars()
        .enumerate()
        .map(|(i, base)| Frequency { position: i + 1, base, count: coverage[start + i] })
        .collect())
}

/// Frequency table as a report frame (`Position`, `Base`, `Frequency`).
pub fn frequency_frame(freqs: &[Frequency]) -> PolarsResult<DataFrame> {
    df!(
        "Position"  => freqs.iter().map(|f| f.position as u64).collect::<Vec<_>>(),
        "Base"      => freqs.iter().map(|f| f.base.to_string()).collect::<Vec<_>>(),
        "Frequency" => freqs.iter().map(|f| f.count as u64).collect::<Vec<_>>(),
    )
}

/// Region positions no row covers.
pub fn uncovered(freqs: &[Frequency]) -> Vec<usize> {
    freqs.iter().filter(|f| f.count == 0).map(|f| f.position).collect()
}

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Bar chart of the frequency table as SVG.
///
/// Uncovered positions are drawn as bars of height −1 below a red zero line
/// and listed next to the chart.
pub fn plot_frequency<P: AsRef<Path>>(freqs: &[Frequency], path: P) -> Result<()> {
    let root = SVGBackend::new(path.as_ref(), (1400, 700)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (plot_area, side) = root.split_horizontally(1150);

    let n = freqs.len() as f64;
    let top = freqs.iter().map(|f| f.count).max().unwrap_or(0).max(1) as f64;
    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Frequency Plot", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.5..n + 0.5, -1.0..top + 0.5)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Position")
        .y_desc("Frequency")
        .axis_desc_style(("sans-serif", 16))
        .y_label_formatter(&|v: &f64| if *v < 0.0 { String::new() } else { format!("{:.0}", v) })
        .draw()
        .map_err(plot_err)?;

    let bar = RGBColor(31, 119, 180);
    chart
        .draw_series(freqs.iter().map(|f| {
            let x = f.position as f64;
            let h = if f.count == 0 { -1.0 } else { f.count as f64 };
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, h)], bar.filled())
        }))
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(vec![(0.5, 0.0), (n + 0.5, 0.0)], RED.stroke_width(1)))
        .map_err(plot_err)?;

    let zeros = uncovered(freqs);
    let mut lines = vec![format!("Total 0 Count: {}", zeros.len()), "Positions:".to_string()];
    lines.extend(
        zeros
            .chunks(8)
            .map(|c| c.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")),
    );
    for (i, line) in lines.iter().enumerate() {
        side.draw(&Text::new(line.clone(), (10, 60 + 20 * i as i32), ("sans-serif", 14)))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Write `freq_table.csv` and `freq_plot.svg` into `dir`.
pub fn write_frequency<P: AsRef<Path>>(freqs: &[Frequency], dir: P) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    let table = dir.join(FREQUENCY_CSV);
    write_csv(&mut frequency_frame(freqs)?, &table)?;
    let plot = dir.join(FREQUENCY_PLOT);
    plot_frequency(freqs, &plot)?;
    info!(
        "Frequency: {} of {} positions uncovered; wrote {} and {}",
        uncovered(freqs).len(),
        freqs.len(),
        table.display(),
        plot.display()
    );
    Ok((table, plot))
}
