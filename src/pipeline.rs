use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::axis::{XAxis, XAxisConfig};
use crate::data::filter::select_refined;
use crate::data::loader::{
    RefinedFiles, load_curve_file, read_labels, read_names, read_raw_scan, read_refined,
    write_refined, write_table,
};
use crate::data::matching::{canonical_id, canonical_set, filter_records, match_by_id, union};
use crate::data::model::{CurveTable, LabelList, RowRange};
use crate::data::normalize::normalize_table;
use crate::error::ScanError;
use crate::render::{ChartRenderer, ChartRequest, CurveStyle, LineKind, PlotCurve};

/// Style slots of the two curves in a side-by-side comparison figure.
const PAIR_SLOT_A: usize = 0;
const PAIR_SLOT_B: usize = 6;
/// Combined comparisons rotate through the first nine palette colours.
const COMPARE_COLORS: usize = 9;

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))
}

fn figure_path(dir: &Path, stem: &str, renderer: &dyn ChartRenderer) -> PathBuf {
    dir.join(format!("{stem}.{}", renderer.extension()))
}

fn curve(label: String, x: &XAxis, y: &[f64], style: CurveStyle) -> PlotCurve {
    PlotCurve {
        label,
        x: x.values.clone(),
        y: y.to_vec(),
        style,
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NormalizeReport {
    pub n_sets: usize,
    pub n_data: usize,
    /// Input min/max of every set.
    pub ranges: Vec<RowRange>,
    pub output: PathBuf,
}

/// Raw scan file → normalized values file.
pub fn run_normalize(input: &Path, output: &Path) -> Result<NormalizeReport> {
    let raw = read_raw_scan(input)?;
    let normalized = normalize_table(&raw)?;
    write_table(output, &normalized.table)?;

    Ok(NormalizeReport {
        n_sets: raw.n_sets(),
        n_data: raw.n_data(),
        ranges: normalized.ranges,
        output: output.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// plot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotMode {
    Combined,
    Individual,
    Refined,
}

#[derive(Debug, Clone)]
pub struct PlotJob {
    pub input: PathBuf,
    /// X-axis title.
    pub parameter: String,
    pub mode: PlotMode,
    pub names: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub x_axis: XAxisConfig,
}

#[derive(Debug, Clone, Default)]
pub struct PlotReport {
    pub figures: Vec<PathBuf>,
    /// Set in refined mode.
    pub refined: Option<(RefinedFiles, usize)>,
}

/// Render a normalized table in one of the three plot modes.
pub fn run_plot(job: &PlotJob, renderer: &dyn ChartRenderer) -> Result<PlotReport> {
    let out_dir = job.output_dir.clone().unwrap_or_default();
    if job.output_dir.is_some() {
        ensure_dir(&out_dir)?;
    }

    let loaded = load_curve_file(&job.input)
        .with_context(|| format!("loading {}", job.input.display()))?;
    let table = loaded.table;

    let labels = match &job.names {
        Some(path) => read_names(path)?,
        None => loaded.labels.unwrap_or_default(),
    };

    if labels.is_empty() {
        log::info!("no curve names given, using Set_<n>");
    } else if labels.len() != table.n_sets() {
        log::warn!(
            "{} names for {} curves; missing names are synthesized",
            labels.len(),
            table.n_sets()
        );
    }

    let source = job.x_axis.source();
    log::info!("x axis from {}", source.describe());
    let x = source.resolve_checked(table.n_data())?;

    let plot_style = |slot: usize| CurveStyle {
        slot,
        line: LineKind::Solid,
        markers: true,
    };
    let request = |curves: Vec<PlotCurve>, dest: PathBuf| ChartRequest {
        curves,
        x_title: job.parameter.clone(),
        x_limits: x.limits,
        dest,
    };

    let mut report = PlotReport::default();
    match job.mode {
        PlotMode::Combined => {
            let curves = table
                .rows()
                .enumerate()
                .map(|(i, row)| curve(canonical_id(&labels.label_for(i)), &x, row, plot_style(i)))
                .collect();
            let dest = figure_path(&out_dir, "combined_plot", renderer);
            renderer.render(&request(curves, dest.clone()))?;
            report.figures.push(dest);
        }
        PlotMode::Individual => {
            for (i, row) in table.rows().enumerate() {
                let id = canonical_id(&labels.label_or(i, "plot_set_"));
                let dest = figure_path(&out_dir, &id, renderer);
                let curves = vec![curve(id, &x, row, plot_style(i))];
                renderer.render(&request(curves, dest.clone()))?;
                report.figures.push(dest);
            }
        }
        PlotMode::Refined => {
            let refined = select_refined(&table, &labels);
            log::info!("refined rows: {:?}", refined.source_indices());
            let files = write_refined(&out_dir, &refined)?;

            if refined.is_empty() {
                log::warn!("no curve has exactly one local minimum; nothing to draw");
            } else {
                let curves = refined
                    .curves
                    .iter()
                    .map(|c| curve(canonical_id(&c.label), &x, &c.values, plot_style(c.style_slot)))
                    .collect();
                let dest = figure_path(&out_dir, "refined_plot", renderer);
                renderer.render(&request(curves, dest.clone()))?;
                report.figures.push(dest);
            }
            report.refined = Some((files, refined.len()));
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompareMode {
    Combined,
    Individual,
}

#[derive(Debug, Clone)]
pub struct CompareJob {
    pub dir_a: PathBuf,
    pub dir_b: PathBuf,
    pub mode: CompareMode,
    /// X-axis title.
    pub parameter: String,
    pub output_dir: PathBuf,
    pub x_a: XAxisConfig,
    pub x_b: XAxisConfig,
}

#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    pub figures: Vec<PathBuf>,
    pub matched: usize,
}

/// One refined run: its table, a label per row, and its x axis.
struct RefinedSource {
    table: CurveTable,
    labels: Vec<String>,
    x: XAxis,
}

fn load_refined_source(dir: &Path, x_axis: &XAxisConfig) -> Result<RefinedSource> {
    let (table, labels): (CurveTable, LabelList) =
        read_refined(dir).with_context(|| format!("reading refined set in {}", dir.display()))?;
    let x = x_axis.source().resolve_checked(table.n_data())?;
    let labels = labels.resolved(table.n_sets());
    Ok(RefinedSource { table, labels, x })
}

/// Compare the refined sets of two independent runs.
pub fn run_compare(job: &CompareJob, renderer: &dyn ChartRenderer) -> Result<CompareReport> {
    let a = load_refined_source(&job.dir_a, &job.x_a)?;
    let b = load_refined_source(&job.dir_b, &job.x_b)?;
    ensure_dir(&job.output_dir)?;

    let style = |slot: usize, line: LineKind| CurveStyle {
        slot,
        line,
        markers: false,
    };
    let request = |curves: Vec<PlotCurve>, dest: PathBuf| ChartRequest {
        curves,
        x_title: job.parameter.clone(),
        x_limits: None,
        dest,
    };

    let mut report = CompareReport::default();
    match job.mode {
        CompareMode::Combined => {
            let side = |src: &RefinedSource, tag: &str, line: LineKind| {
                src.table
                    .rows()
                    .enumerate()
                    .map(|(i, row)| {
                        let label = format!("{} ({tag})", canonical_id(&src.labels[i]));
                        curve(label, &src.x, row, style(i % COMPARE_COLORS, line))
                    })
                    .collect::<Vec<_>>()
            };
            let mut curves = side(&a, "A", LineKind::Solid);
            curves.extend(side(&b, "B", LineKind::Dashed));

            let dest = figure_path(&job.output_dir, "comparison_combined", renderer);
            renderer.render(&request(curves, dest.clone()))?;
            report.figures.push(dest);
        }
        CompareMode::Individual => {
            let pairs = match_by_id(&a.labels, &b.labels);
            report.matched = pairs.len();

            for pair in pairs {
                let curves = vec![
                    curve(
                        "A".to_string(),
                        &a.x,
                        a.table.row(pair.a_index),
                        style(PAIR_SLOT_A, LineKind::Solid),
                    ),
                    curve(
                        "B".to_string(),
                        &b.x,
                        b.table.row(pair.b_index),
                        style(PAIR_SLOT_B, LineKind::Dashed),
                    ),
                ];
                let dest = figure_path(&job.output_dir, &pair.id, renderer);
                renderer.render(&request(curves, dest.clone()))?;
                report.figures.push(dest);
            }
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FilterJob {
    pub records: PathBuf,
    pub refined_a: PathBuf,
    pub refined_b: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub ids_a: usize,
    pub ids_b: usize,
    pub union: usize,
    pub total: usize,
    pub kept: usize,
}

/// Copy the records whose ID survived refinement in either run.
pub fn run_filter(job: &FilterJob) -> Result<FilterReport> {
    let ids_a = canonical_set(read_labels(&job.refined_a)?.as_slice());
    let ids_b = canonical_set(read_labels(&job.refined_b)?.as_slice());
    let keep = union(&ids_a, &ids_b);

    let text = fs::read_to_string(&job.records)
        .map_err(|e| ScanError::not_found(&job.records, e))?;
    let outcome = filter_records(text.lines(), &keep);

    let mut body = outcome.kept.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(&job.output, body).map_err(|e| ScanError::io(&job.output, e))?;

    Ok(FilterReport {
        ids_a: ids_a.len(),
        ids_b: ids_b.len(),
        union: keep.len(),
        total: outcome.total,
        kept: outcome.kept_count(),
    })
}
