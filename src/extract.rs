use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::error::ScanError;

pub const HISTO_VALUES_FILE: &str = "chi2_histo_values.txt";
pub const VALUES_FILE: &str = "chi2_values.txt";

/// `χ2/n = 0.50`, `χ 2 / n=0.5`, `chi^2/n = .5`, `CHI2/N = 1`
const CHI2_PATTERN: &str = r"(?i)(?:χ\s*2\s*/\s*n|chi\s*\^?2\s*/\s*n)\s*=\s*([0-9]*\.?[0-9]+)";

// ---------------------------------------------------------------------------
// Pattern matching
// ---------------------------------------------------------------------------

pub struct Chi2Extractor {
    pattern: Regex,
}

impl Chi2Extractor {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(CHI2_PATTERN).context("compiling chi2 pattern")?;
        Ok(Self { pattern })
    }

    /// Every chi2 value in `text`, in document order, as written.
    pub fn values<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Output directory base name when the input is a glob pattern.
const PATTERN_BASE: &str = "pdf_collection";

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expand the `--input` argument into the files to scan.
///
/// A file is taken as is. A directory yields its `*.pdf` files, or its
/// `*.txt` text layers when it holds no PDF. Anything else is a glob pattern.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if input.is_dir() {
        let pdfs = files_with_extension(input, "pdf")?;
        if !pdfs.is_empty() {
            return Ok(pdfs);
        }
        return files_with_extension(input, "txt");
    }

    let pattern = input.to_string_lossy();
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid pattern '{pattern}'"))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("skipping {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}

/// Text of one input: the PDF text layer, or the file itself for `.txt`.
pub fn read_text(path: &Path) -> Result<String> {
    if has_extension(path, "pdf") {
        // the PDF parser panics on some malformed files
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|_| anyhow::anyhow!("PDF parser panicked"))?;
        return extracted
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("extracting text from {}", path.display()));
    }
    let bytes = fs::read(path).map_err(|e| ScanError::not_found(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Name recorded for an input: its base name, without a text-layer `.txt`.
pub fn plot_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(".txt") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// `<stem>_output` for a file, `<name>_output` for a directory and
/// `pdf_collection_output` for a pattern, relative to the working directory.
pub fn default_output_dir(input: &Path) -> PathBuf {
    let base = if input.is_file() {
        input.file_stem()
    } else if input.is_dir() {
        input.file_name()
    } else {
        None
    };
    let base = base
        .map(|b| b.to_string_lossy().into_owned())
        .unwrap_or_else(|| PATTERN_BASE.to_string());
    PathBuf::from(format!("{base}_output"))
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub files: usize,
    pub values_per_plot: usize,
    pub histo_file: PathBuf,
    pub values_file: PathBuf,
}

/// Scan every input for chi2 values and write the raw scan file plus the
/// named listing.
pub fn run_extract(input: &Path, output_dir: Option<&Path>) -> Result<ExtractReport> {
    let inputs = collect_inputs(input)?;
    if inputs.is_empty() {
        bail!("no PDF files found for {}", input.display());
    }
    log::info!("Found {} PDF file(s)", inputs.len());

    let extractor = Chi2Extractor::new()?;
    let mut listing = Vec::with_capacity(inputs.len());
    let mut value_lines = Vec::with_capacity(inputs.len());

    for path in &inputs {
        let name = plot_name(path);
        let text = read_text(path).unwrap_or_else(|e| {
            log::error!("reading {}: {e:#}", path.display());
            String::new()
        });

        let values = extractor.values(&text).join(" ");
        if values.is_empty() {
            log::warn!("{name}: no chi2 value found");
            listing.push(format!("{name}   NOT_FOUND"));
        } else {
            listing.push(format!("{name}   {values}"));
        }
        value_lines.push(values);
    }

    let values_per_plot = value_lines
        .iter()
        .find(|v| !v.is_empty())
        .map(|v| v.split_whitespace().count())
        .unwrap_or(0);

    let out_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(input));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let n = inputs.len();
    let histo_file = out_dir.join(HISTO_VALUES_FILE);
    let mut histo = format!(
        "Found {n} PDF file(s)\nFound {values_per_plot} chi-squared values per plot\n"
    );
    for line in &listing {
        histo.push_str(line);
        histo.push('\n');
    }
    fs::write(&histo_file, histo).map_err(|e| ScanError::io(&histo_file, e))?;

    let values_file = out_dir.join(VALUES_FILE);
    let mut values = format!("{n}\n{values_per_plot}\n");
    for line in &value_lines {
        values.push_str(line);
        values.push('\n');
    }
    fs::write(&values_file, values).map_err(|e| ScanError::io(&values_file, e))?;

    Ok(ExtractReport {
        files: n,
        values_per_plot,
        histo_file,
        values_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{read_names, read_raw_scan};
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir(name: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "chi2scan-extract-{name}-{}-{}-{counter}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn recognises_pattern_variants() {
        let ex = Chi2Extractor::new().unwrap();
        let text = "Data\nχ2/n = 0.50 MC1\nχ 2 / n=1.25\nchi^2/n = .75\nCHI2/N=3 and chi2 = 9";
        assert_eq!(ex.values(text), vec!["0.50", "1.25", ".75", "3"]);
        assert!(ex.values("no fit here").is_empty());
    }

    #[test]
    fn plot_name_is_the_base_name() {
        assert_eq!(plot_name(Path::new("dir/d01-x01-y01.pdf")), "d01-x01-y01.pdf");
        assert_eq!(plot_name(Path::new("dir/d01-x01-y01.pdf.txt")), "d01-x01-y01.pdf");
        assert_eq!(plot_name(Path::new("notes.md")), "notes.md");
    }

    #[test]
    fn writes_scan_and_listing_for_a_directory() {
        let dir = temp_dir("run");
        let input = dir.join("plots");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("h2.pdf.txt"), "χ2/n = 4.0\nχ2/n = 2.0\nχ2/n = 3.0").unwrap();
        fs::write(input.join("h1.pdf.txt"), "chi2/n=1.5 chi2/n=0.5 chi2/n=2.5").unwrap();
        fs::write(input.join("skip.dat"), "χ2/n = 9").unwrap();

        let out = dir.join("out");
        let report = run_extract(&input, Some(&out)).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.values_per_plot, 3);

        let listing = fs::read_to_string(&report.histo_file).unwrap();
        assert_eq!(
            listing,
            "Found 2 PDF file(s)\nFound 3 chi-squared values per plot\n\
             h1.pdf   1.5 0.5 2.5\nh2.pdf   4.0 2.0 3.0\n"
        );

        let table = read_raw_scan(&report.values_file).unwrap();
        assert_eq!(table.row(0), &[1.5, 0.5, 2.5]);
        let names = read_names(&report.histo_file).unwrap();
        assert_eq!(names.as_slice(), &["h1.pdf", "h2.pdf"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn directory_prefers_pdfs_over_text_layers() {
        let dir = temp_dir("prefer-pdf");
        fs::write(dir.join("b.pdf"), b"%PDF-1.4").unwrap();
        fs::write(dir.join("a.pdf"), b"%PDF-1.4").unwrap();
        fs::write(dir.join("a.pdf.txt"), "χ2/n = 1.0").unwrap();

        let inputs = collect_inputs(&dir).unwrap();
        assert_eq!(inputs, vec![dir.join("a.pdf"), dir.join("b.pdf")]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn glob_pattern_selects_matching_files() {
        let dir = temp_dir("glob");
        fs::write(dir.join("d02.pdf.txt"), "χ2/n = 2.0").unwrap();
        fs::write(dir.join("d01.pdf.txt"), "χ2/n = 1.0").unwrap();
        fs::write(dir.join("other.txt"), "χ2/n = 9.0").unwrap();

        let pattern = dir.join("d*.pdf.txt");
        let inputs = collect_inputs(&pattern).unwrap();
        assert_eq!(inputs, vec![dir.join("d01.pdf.txt"), dir.join("d02.pdf.txt")]);
        assert_eq!(default_output_dir(&pattern), PathBuf::from("pdf_collection_output"));

        let report = run_extract(&pattern, Some(&dir.join("out"))).unwrap();
        let listing = fs::read_to_string(&report.histo_file).unwrap();
        assert!(listing.ends_with("d01.pdf   1.0\nd02.pdf   2.0\n"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_pdf_is_recorded_by_base_name() {
        let dir = temp_dir("broken-pdf");
        let input = dir.join("plots");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("d01-x01-y01.pdf"), "not a pdf at all").unwrap();

        let report = run_extract(&input, Some(&dir.join("out"))).unwrap();
        assert_eq!(report.files, 1);
        let listing = fs::read_to_string(&report.histo_file).unwrap();
        assert!(listing.starts_with("Found 1 PDF file(s)\n"));
        assert!(listing.ends_with("d01-x01-y01.pdf   NOT_FOUND\n"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_pattern_is_an_error() {
        let dir = temp_dir("no-match");
        assert!(run_extract(&dir.join("*.pdf"), Some(&dir.join("out"))).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_values_are_marked_not_found() {
        let dir = temp_dir("notfound");
        let input = dir.join("empty.txt");
        fs::write(&input, "no statistics on this page").unwrap();

        let report = run_extract(&input, Some(&dir.join("out"))).unwrap();
        assert_eq!(report.values_per_plot, 0);
        let listing = fs::read_to_string(&report.histo_file).unwrap();
        assert!(listing.ends_with("empty   NOT_FOUND\n"));
        let _ = fs::remove_dir_all(&dir);
    }
}
