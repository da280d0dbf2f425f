use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{CurveTable, LabelList, RefinedSet};
use crate::error::{ScanError, ScanResult};

/// Labels of a persisted refined set, one per line.
pub const REFINED_LABELS_FILE: &str = "refined_plots.txt";
/// Values of a persisted refined set, one row per line.
pub const REFINED_VALUES_FILE: &str = "refined_normalize_values.txt";

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

fn open(path: &Path) -> ScanResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ScanError::not_found(path, e))
}

fn create(path: &Path) -> ScanResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ScanError::io(path, e))
}

/// All lines of `path`, `\r` stripped, paired with their 1-based number.
fn read_lines(path: &Path) -> ScanResult<Vec<(usize, String)>> {
    let reader = open(path)?;
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let mut line = line.map_err(|e| ScanError::io(path, e))?;
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push((i + 1, line));
    }
    Ok(lines)
}

/// Finite number or `MalformedValue`; `nan` and `inf` are rejected.
fn parse_value(token: &str, path: &Path, line: usize) -> ScanResult<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScanError::MalformedValue {
            path: path.to_path_buf(),
            line,
            token: token.to_string(),
        })
}

fn parse_row(text: &str, path: &Path, line: usize) -> ScanResult<Vec<f64>> {
    text.split_whitespace()
        .map(|tok| parse_value(tok, path, line))
        .collect()
}

fn format_row(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Raw scan file
// ---------------------------------------------------------------------------

/// Read a raw scan file: `nSets nData` followed by `nSets * nData` values.
/// Rows may span several lines; only the token stream matters.
pub fn read_raw_scan(path: &Path) -> ScanResult<CurveTable> {
    let lines = read_lines(path)?;
    let mut tokens = lines
        .iter()
        .flat_map(|(no, text)| text.split_whitespace().map(move |tok| (*no, tok)));

    let mut header = |name: &str| -> ScanResult<usize> {
        let (_, tok) = tokens.next().ok_or_else(|| ScanError::MalformedHeader {
            path: path.to_path_buf(),
            reason: format!("missing {name}"),
        })?;
        tok.parse::<usize>().map_err(|_| ScanError::MalformedHeader {
            path: path.to_path_buf(),
            reason: format!("{name} '{tok}' is not a non-negative integer"),
        })
    };
    let n_sets = header("nSets")?;
    let n_data = header("nData")?;

    if n_sets == 0 {
        return Err(ScanError::EmptyTable);
    }
    if n_data == 0 {
        return Err(ScanError::EmptyRow { set: 0 });
    }

    let mut rows = Vec::with_capacity(n_sets);
    for set in 0..n_sets {
        let mut row = Vec::with_capacity(n_data);
        while row.len() < n_data {
            let Some((line, tok)) = tokens.next() else {
                return Err(ScanError::TruncatedData {
                    path: path.to_path_buf(),
                    set,
                    expected: n_data,
                    found: row.len(),
                });
            };
            row.push(parse_value(tok, path, line)?);
        }
        rows.push(row);
    }

    log::debug!("{}: {n_sets} sets x {n_data} values", path.display());
    CurveTable::new(rows)
}

// ---------------------------------------------------------------------------
// Normalized values file
// ---------------------------------------------------------------------------

/// Read one row per non-empty line.
pub fn read_normalized(path: &Path) -> ScanResult<CurveTable> {
    let mut rows = Vec::new();
    for (no, text) in read_lines(path)? {
        let row = parse_row(&text, path, no)?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    CurveTable::new(rows)
}

/// Write one row per line, values separated by a single space.
pub fn write_table(path: &Path, table: &CurveTable) -> ScanResult<()> {
    write_rows(path, table.rows())
}

fn write_rows<'a, I>(path: &Path, rows: I) -> ScanResult<()>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut out = create(path)?;
    for row in rows {
        writeln!(out, "{}", format_row(row)).map_err(|e| ScanError::io(path, e))?;
    }
    out.flush().map_err(|e| ScanError::io(path, e))
}

fn write_lines<I, S>(path: &Path, lines: I) -> ScanResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = create(path)?;
    for line in lines {
        writeln!(out, "{}", line.as_ref()).map_err(|e| ScanError::io(path, e))?;
    }
    out.flush().map_err(|e| ScanError::io(path, e))
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// One label per non-blank line, kept verbatim.
pub fn read_labels(path: &Path) -> ScanResult<LabelList> {
    let labels = read_lines(path)?
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(_, text)| text)
        .collect();
    Ok(LabelList::new(labels))
}

/// Legend names file: two header lines, then the leading token of every
/// non-blank line.
pub fn read_names(path: &Path) -> ScanResult<LabelList> {
    let labels = read_lines(path)?
        .into_iter()
        .skip(2)
        .filter_map(|(_, text)| text.split_whitespace().next().map(str::to_string))
        .collect();
    Ok(LabelList::new(labels))
}

// ---------------------------------------------------------------------------
// X values
// ---------------------------------------------------------------------------

/// Coordinates from the first line that holds any value.
pub fn read_x_values(path: &Path) -> ScanResult<Vec<f64>> {
    for (no, text) in read_lines(path)? {
        let values = parse_row(&text, path, no)?;
        if !values.is_empty() {
            return Ok(values);
        }
    }
    Ok(Vec::new())
}

// ---------------------------------------------------------------------------
// Refined set persistence
// ---------------------------------------------------------------------------

/// Paths written by [`write_refined`].
#[derive(Debug, Clone)]
pub struct RefinedFiles {
    pub labels: PathBuf,
    pub values: PathBuf,
}

impl RefinedFiles {
    pub fn in_dir(dir: &Path) -> Self {
        RefinedFiles {
            labels: dir.join(REFINED_LABELS_FILE),
            values: dir.join(REFINED_VALUES_FILE),
        }
    }
}

/// Persist a refined set as two index-aligned files inside `dir`.
pub fn write_refined(dir: &Path, refined: &RefinedSet) -> ScanResult<RefinedFiles> {
    let files = RefinedFiles::in_dir(dir);
    write_lines(&files.labels, refined.labels())?;
    write_rows(&files.values, refined.curves.iter().map(|c| c.values.as_slice()))?;
    Ok(files)
}

/// Read back a refined set written by [`write_refined`].
pub fn read_refined(dir: &Path) -> ScanResult<(CurveTable, LabelList)> {
    let files = RefinedFiles::in_dir(dir);
    let labels = read_labels(&files.labels)?;
    let table = read_normalized(&files.values)?;
    Ok((table, labels))
}

// ---------------------------------------------------------------------------
// Curve tables in other formats
// ---------------------------------------------------------------------------

/// A curve table plus the labels the file carried, if any.
#[derive(Debug, Clone)]
pub struct LoadedCurves {
    pub table: CurveTable,
    pub labels: Option<LabelList>,
}

/// Load a normalized curve table.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`    – `[[...], ...]` or `[{ "label": "...", "values": [...] }, ...]`
/// * `.csv`     – optional `label` column, every other column a scan point
/// * `.parquet` – `values` list column, optional `label` string column
/// * anything else – whitespace-separated rows, one per line
pub fn load_curve_file(path: &Path) -> Result<LoadedCurves> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        _ => Ok(LoadedCurves {
            table: read_normalized(path)?,
            labels: None,
        }),
    }
}

/// Keep labels only when at least one row carried one.
fn collect_labels(labels: Vec<Option<String>>) -> Option<LabelList> {
    if labels.iter().all(Option::is_none) {
        return None;
    }
    let filled = labels
        .into_iter()
        .enumerate()
        .map(|(i, l)| l.unwrap_or_else(|| format!("Set_{}", i + 1)))
        .collect();
    Some(LabelList::new(filled))
}

// -- JSON --

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCurve {
    Values(Vec<f64>),
    Record {
        #[serde(default)]
        label: Option<String>,
        values: Vec<f64>,
    },
}

fn load_json(path: &Path) -> Result<LoadedCurves> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ScanError::not_found(path, e))?;
    let curves: Vec<JsonCurve> = serde_json::from_str(&text).context("parsing JSON curve table")?;

    let (rows, labels): (Vec<_>, Vec<_>) = curves
        .into_iter()
        .map(|c| match c {
            JsonCurve::Values(values) => (values, None),
            JsonCurve::Record { label, values } => (values, label),
        })
        .unzip();

    Ok(LoadedCurves {
        table: CurveTable::new(rows)?,
        labels: collect_labels(labels),
    })
}

// -- CSV --

fn load_csv(path: &Path) -> Result<LoadedCurves> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let label_idx = headers.iter().position(|h| h == "label");

    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut values = Vec::with_capacity(record.len());
        for (col_idx, cell) in record.iter().enumerate() {
            if Some(col_idx) == label_idx {
                continue;
            }
            let v = cell.parse::<f64>().with_context(|| {
                format!("Row {row_no}, column '{}': '{cell}' is not a number", &headers[col_idx])
            })?;
            values.push(v);
        }

        labels.push(label_idx.and_then(|i| record.get(i)).map(str::to_string));
        rows.push(values);
    }

    Ok(LoadedCurves {
        table: CurveTable::new(rows)?,
        labels: collect_labels(labels),
    })
}

// -- Parquet --

/// Expected schema:
/// - `values`: List or LargeList of Float64/Float32, one curve per row
/// - `label`: optional Utf8 / LargeUtf8 column
fn load_parquet(path: &Path) -> Result<LoadedCurves> {
    let file = File::open(path).map_err(|e| ScanError::not_found(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for batch in reader {
        let batch = batch.context("reading parquet record batch")?;
        let values_col = batch
            .column_by_name("values")
            .context("parquet file has no 'values' column")?;
        let label_col = batch.column_by_name("label");

        for row in 0..batch.num_rows() {
            let curve = rows.len();
            rows.push(curve_values(values_col, row).with_context(|| format!("curve {curve}"))?);
            labels.push(label_col.and_then(|col| curve_label(col, row)));
        }
    }

    Ok(LoadedCurves {
        table: CurveTable::new(rows)?,
        labels: collect_labels(labels),
    })
}

/// The scan values of one list cell. Null cells and null or non-finite
/// entries are errors.
fn curve_values(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("'values' is null");
    }
    let cell = if let Some(list) = col.as_list_opt::<i32>() {
        list.value(row)
    } else if let Some(list) = col.as_list_opt::<i64>() {
        list.value(row)
    } else {
        bail!("'values' must be a list column, found {:?}", col.data_type());
    };

    let values: Vec<Option<f64>> = if let Some(arr) = cell.as_primitive_opt::<Float64Type>() {
        arr.iter().collect()
    } else if let Some(arr) = cell.as_primitive_opt::<Float32Type>() {
        arr.iter().map(|v| v.map(f64::from)).collect()
    } else {
        bail!("'values' items must be Float64 or Float32, found {:?}", cell.data_type());
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => bail!("point {i} is {v}"),
            None => bail!("point {i} is null"),
        })
        .collect()
}

fn curve_label(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::select_refined;
    use arrow::array::{Float64Builder, ListBuilder, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir(name: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "chi2scan-loader-{name}-{}-{}-{counter}",
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
    fn raw_scan_rows_may_span_lines() {
        let dir = temp_dir("raw");
        let path = dir.join("chi2_values.txt");
        fs::write(&path, "2\n3\n1.5 2.5\n0.5\n4 5 6\n").unwrap();

        let table = read_raw_scan(&path).unwrap();
        assert_eq!(table.n_sets(), 2);
        assert_eq!(table.row(0), &[1.5, 2.5, 0.5]);
        assert_eq!(table.row(1), &[4.0, 5.0, 6.0]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn raw_scan_header_and_body_errors() {
        let dir = temp_dir("raw-bad");
        let path = dir.join("scan.txt");

        fs::write(&path, "two 3\n1 2 3\n").unwrap();
        assert!(matches!(read_raw_scan(&path), Err(ScanError::MalformedHeader { .. })));

        fs::write(&path, "4").unwrap();
        assert!(matches!(read_raw_scan(&path), Err(ScanError::MalformedHeader { .. })));

        fs::write(&path, "2 3\n1 2 3\n4 5\n").unwrap();
        assert!(matches!(
            read_raw_scan(&path),
            Err(ScanError::TruncatedData {
                set: 1,
                expected: 3,
                found: 2,
                ..
            })
        ));

        fs::write(&path, "1 2\n1 NOT_FOUND\n").unwrap();
        assert!(matches!(
            read_raw_scan(&path),
            Err(ScanError::MalformedValue { line: 2, .. })
        ));

        fs::write(&path, "2 3\n1 nan 3\n1 inf 3\n").unwrap();
        assert!(matches!(
            read_raw_scan(&path),
            Err(ScanError::MalformedValue { line: 2, ref token, .. }) if token == "nan"
        ));
        fs::write(&path, "1 3\n1 -infinity 3\n").unwrap();
        assert!(matches!(
            read_raw_scan(&path),
            Err(ScanError::MalformedValue { ref token, .. }) if token == "-infinity"
        ));

        fs::write(&path, "0 5\n").unwrap();
        assert!(matches!(read_raw_scan(&path), Err(ScanError::EmptyTable)));

        assert!(matches!(
            read_raw_scan(&dir.join("missing.txt")),
            Err(ScanError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn names_file_skips_header_and_keeps_leading_token() {
        let dir = temp_dir("names");
        let path = dir.join("chi2_histo_values.txt");
        fs::write(
            &path,
            "Found 2 PDF file(s)\nFound 3 chi-squared values per plot\n\
             d01-x01-y01.pdf   0.5 0.6 0.7\n\nd02-x01-y01.pdf   NOT_FOUND\n",
        )
        .unwrap();

        let names = read_names(&path).unwrap();
        assert_eq!(names.as_slice(), &["d01-x01-y01.pdf", "d02-x01-y01.pdf"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn refined_set_round_trips() {
        let dir = temp_dir("refined");
        let table = CurveTable::new(vec![
            vec![10.0, 0.0, 10.0, 4.0],
            vec![0.0, 5.0, 7.5, 10.0],
            vec![10.0, 3.3333333333333335, 0.0, 7.25],
        ])
        .unwrap();
        let labels = LabelList::new(vec![
            "/ATLAS/a/d01-x01-y01.pdf".into(),
            "d02-x01-y01.pdf".into(),
        ]);
        let refined = select_refined(&table, &labels);
        assert_eq!(refined.labels(), vec!["/ATLAS/a/d01-x01-y01.pdf", "Set_3"]);

        let files = write_refined(&dir, &refined).unwrap();
        assert!(files.labels.ends_with(REFINED_LABELS_FILE));

        let (back, back_labels) = read_refined(&dir).unwrap();
        assert_eq!(back_labels.as_slice(), refined.labels().as_slice());
        let rows: Vec<Vec<f64>> = back.rows().map(<[f64]>::to_vec).collect();
        let expected: Vec<Vec<f64>> = refined.curves.iter().map(|c| c.values.clone()).collect();
        assert_eq!(rows, expected);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalized_table_round_trips_exactly() {
        let dir = temp_dir("norm");
        let path = dir.join("normalized.txt");
        let table = CurveTable::new(vec![vec![0.1, 10.0, 1.0 / 3.0], vec![0.0, 0.0, 0.0]]).unwrap();

        write_table(&path, &table).unwrap();
        assert_eq!(read_normalized(&path).unwrap(), table);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn json_and_csv_tables_carry_labels() {
        let dir = temp_dir("formats");

        let json = dir.join("curves.json");
        fs::write(
            &json,
            r#"[{"label": "h1.pdf", "values": [3, 1, 2]}, {"values": [1, 2, 3]}]"#,
        )
        .unwrap();
        let loaded = load_curve_file(&json).unwrap();
        assert_eq!(loaded.table.n_sets(), 2);
        assert_eq!(loaded.labels.unwrap().as_slice(), &["h1.pdf", "Set_2"]);

        let bare = dir.join("bare.json");
        fs::write(&bare, "[[1, 2], [3, 4]]").unwrap();
        assert!(load_curve_file(&bare).unwrap().labels.is_none());

        let csv_path = dir.join("curves.csv");
        fs::write(&csv_path, "label,p1,p2,p3\nh1,3,1,2\nh2, 4, 5, 6\n").unwrap();
        let loaded = load_curve_file(&csv_path).unwrap();
        assert_eq!(loaded.table.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(loaded.labels.unwrap().as_slice(), &["h1", "h2"]);
        let _ = fs::remove_dir_all(&dir);
    }

    fn write_parquet(path: &Path, curves: &[Vec<Option<f64>>], labels: &[Option<&str>]) {
        let mut values = ListBuilder::new(Float64Builder::new());
        for curve in curves {
            values.values().extend(curve.iter().copied());
            values.append(true);
        }
        let item = Arc::new(Field::new("item", DataType::Float64, true));
        let schema = Arc::new(Schema::new(vec![
            Field::new("values", DataType::List(item), false),
            Field::new("label", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(values.finish()),
                Arc::new(StringArray::from(labels.to_vec())),
            ],
        )
        .unwrap();

        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_table_carries_labels() {
        let dir = temp_dir("parquet");
        let path = dir.join("curves.parquet");
        write_parquet(
            &path,
            &[
                vec![Some(10.0), Some(0.0), Some(10.0)],
                vec![Some(0.0), Some(5.0), Some(10.0)],
            ],
            &[Some("/ATLAS/d01-x01-y01.pdf"), None],
        );

        let loaded = load_curve_file(&path).unwrap();
        assert_eq!(loaded.table.row(0), &[10.0, 0.0, 10.0]);
        assert_eq!(loaded.table.row(1), &[0.0, 5.0, 10.0]);
        assert_eq!(
            loaded.labels.unwrap().as_slice(),
            &["/ATLAS/d01-x01-y01.pdf", "Set_2"]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn parquet_rejects_missing_and_non_finite_points() {
        let dir = temp_dir("parquet-bad");

        let nulls = dir.join("nulls.parquet");
        write_parquet(&nulls, &[vec![Some(1.0), None, Some(3.0)]], &[Some("h1")]);
        let err = load_curve_file(&nulls).unwrap_err();
        assert!(format!("{err:#}").contains("point 1 is null"));

        let nan = dir.join("nan.parquet");
        write_parquet(&nan, &[vec![Some(1.0), Some(f64::NAN), Some(3.0)]], &[None]);
        let err = load_curve_file(&nan).unwrap_err();
        assert!(format!("{err:#}").contains("point 1 is NaN"));
        let _ = fs::remove_dir_all(&dir);
    }
}
