use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::temporal_conversions::date32_to_datetime;
use encoding_rs::{UTF_8, WINDOWS_1252};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, ColumnKind, Dataset};

/// Outcome of ingesting one table.
#[derive(Debug)]
pub struct LoadedFile {
    pub dataset: Dataset,
    /// Rows dropped by the lenient CSV pass.
    pub skipped_rows: usize,
    /// Text encoding the bytes were decoded with (`None` for binary formats).
    pub encoding: Option<&'static str>,
}

impl LoadedFile {
    fn binary(dataset: Dataset) -> Self {
        Self {
            dataset,
            skipped_rows: 0,
            encoding: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load invoice tables from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, `;`, `,` or tab separated, UTF-8 or Latin-1
/// * `.zip`     – every `.csv` member becomes its own dataset
/// * `.json`    – `[{ "fornecedor": "...", "valor": 10.5, ... }, ...]`
/// * `.parquet` – flat columns of strings, numbers, booleans or dates
pub fn load_file(path: &Path) -> Result<Vec<LoadedFile>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let name = file_name(path);

    let loaded = match ext.as_str() {
        "csv" | "txt" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading {}", path.display()))?;
            vec![parse_csv_bytes(&name, &bytes)?]
        }
        "zip" => load_zip(path)?,
        "json" => vec![load_json(path, &name)?],
        "parquet" | "pq" => vec![load_parquet(path, &name)?],
        other => bail!("Unsupported file extension: .{other}"),
    };

    for file in &loaded {
        log::info!(
            "Loaded {} ({} rows, {} columns{})",
            file.dataset.name(),
            file.dataset.len(),
            file.dataset.columns().len(),
            file.encoding.map(|e| format!(", {e}")).unwrap_or_default()
        );
    }
    Ok(loaded)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dados")
        .to_string()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Decode, sniff and parse CSV bytes into a dataset named `name`.
///
/// A strict pass runs first. If any record is malformed, a lenient pass
/// keeps only rows whose width matches the header and reports how many
/// rows it dropped.
pub fn parse_csv_bytes(name: &str, bytes: &[u8]) -> Result<LoadedFile> {
    let (text, encoding) = decode_text(bytes);
    let first_line = text.lines().next().unwrap_or("");
    if first_line.trim().is_empty() {
        bail!("{name}: CSV has no header row");
    }
    let delimiter = sniff_delimiter(first_line);

    let (headers, records, skipped_rows) = match read_records(&text, delimiter, false) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("{name}: strict CSV parse failed ({err}), retrying in lenient mode");
            read_records(&text, delimiter, true)
                .with_context(|| format!("{name}: parsing CSV"))?
        }
    };
    if skipped_rows > 0 {
        log::warn!("{name}: skipped {skipped_rows} malformed rows");
    }

    let dataset = Dataset::infer(name, dedupe_headers(headers), records)
        .with_context(|| format!("{name}: building dataset"))?;

    Ok(LoadedFile {
        dataset,
        skipped_rows,
        encoding: Some(encoding),
    })
}

/// UTF-8 when the bytes are valid UTF-8, Windows-1252 otherwise.
fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => (text.into_owned(), UTF_8.name()),
        None => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text.into_owned(), WINDOWS_1252.name())
        }
    }
}

fn sniff_delimiter(header: &str) -> u8 {
    [b';', b',', b'\t']
        .into_iter()
        .map(|d| (d, header.bytes().filter(|b| *b == d).count()))
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

type Records = (Vec<String>, Vec<Vec<String>>, usize);

fn read_records(text: &str, delimiter: u8, lenient: bool) -> Result<Records> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(lenient)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0;

    for (row_no, result) in reader.records().enumerate() {
        match result {
            Ok(record) if record.len() == headers.len() => {
                records.push(record.iter().map(str::to_string).collect());
            }
            Ok(_) | Err(_) if lenient => skipped += 1,
            Ok(record) => bail!(
                "CSV row {row_no}: {} fields, header has {}",
                record.len(),
                headers.len()
            ),
            Err(e) => return Err(e).with_context(|| format!("CSV row {row_no}")),
        }
    }

    Ok((headers, records, skipped))
}

/// Suffix repeated header names with `.1`, `.2`, ... so every column is addressable.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{header}.{n}");
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

// ---------------------------------------------------------------------------
// ZIP loader
// ---------------------------------------------------------------------------

fn load_zip(path: &Path) -> Result<Vec<LoadedFile>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("reading ZIP archive")?;

    let mut loaded = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("reading ZIP entry")?;
        let entry_name = entry.name().to_string();
        if entry.is_dir()
            || entry_name.starts_with("__MACOSX/")
            || !entry_name.to_ascii_lowercase().ends_with(".csv")
        {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("extracting {entry_name}"))?;

        let name = file_name(Path::new(&entry_name));
        loaded.push(parse_csv_bytes(&name, &bytes)?);
    }

    if loaded.is_empty() {
        bail!("Nenhum arquivo CSV encontrado no ZIP");
    }
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "fornecedor": "ACME LTDA", "valor": 1520.75, "data": "2024-01-05" },
///   ...
/// ]
/// ```
///
/// Keys missing from a record are null for that row.
fn load_json(path: &Path, name: &str) -> Result<LoadedFile> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let dataset = Dataset::infer(name, headers, rows).context("building dataset from JSON")?;
    Ok(LoadedFile::binary(dataset))
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
///
/// Integer and float columns become numeric, date and timestamp columns
/// temporal, everything else is rendered as text.
fn load_parquet(path: &Path, name: &str) -> Result<LoadedFile> {
    let file = File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), kind_of(f.data_type())))
        .collect();

    let reader = builder.build().context("building parquet reader")?;
    let mut rows: Vec<Vec<CellValue>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let first_row = rows.len();
        rows.extend((0..batch.num_rows()).map(|_| Vec::with_capacity(columns.len())));

        for (col_idx, column) in columns.iter().enumerate() {
            let cells = column_cells(batch.column(col_idx), column.kind)
                .with_context(|| format!("converting column '{}'", column.name))?;
            for (offset, cell) in cells.into_iter().enumerate() {
                rows[first_row + offset].push(cell);
            }
        }
    }

    let dataset = Dataset::new(name, columns, rows).context("building dataset from parquet")?;
    Ok(LoadedFile::binary(dataset))
}

fn kind_of(data_type: &DataType) -> ColumnKind {
    match data_type {
        t if t.is_integer() || t.is_floating() => ColumnKind::Numeric,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => ColumnKind::Temporal,
        _ => ColumnKind::Text,
    }
}

/// Cast an Arrow column to the representation of `kind` and extract its cells.
fn column_cells(col: &ArrayRef, kind: ColumnKind) -> Result<Vec<CellValue>> {
    let n = col.len();
    let cells = match kind {
        ColumnKind::Numeric if col.data_type().is_integer() => {
            let arr = cast(col, &DataType::Int64)?;
            let arr = arr.as_primitive::<Int64Type>();
            (0..n)
                .map(|i| if arr.is_null(i) { CellValue::Null } else { CellValue::Integer(arr.value(i)) })
                .collect()
        }
        ColumnKind::Numeric => {
            let arr = cast(col, &DataType::Float64)?;
            let arr = arr.as_primitive::<Float64Type>();
            (0..n)
                .map(|i| if arr.is_null(i) { CellValue::Null } else { CellValue::Float(arr.value(i)) })
                .collect()
        }
        ColumnKind::Temporal => {
            let arr = cast(col, &DataType::Date32)?;
            let arr = arr.as_primitive::<arrow::datatypes::Date32Type>();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        return CellValue::Null;
                    }
                    date32_to_datetime(arr.value(i))
                        .map(|dt| CellValue::Date(dt.date()))
                        .unwrap_or(CellValue::Null)
                })
                .collect()
        }
        ColumnKind::Text => {
            let arr = cast(col, &DataType::Utf8)?;
            let arr = arr.as_string::<i32>();
            (0..n)
                .map(|i| if arr.is_null(i) { CellValue::Null } else { CellValue::Text(arr.value(i).to_string()) })
                .collect()
        }
    };
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_semicolon_latin1_csv() {
        // "RAZÃO" and "EMISSÃO" encoded as Windows-1252.
        let mut bytes = b"RAZ\xC3O SOCIAL EMITENTE;VALOR NOTA FISCAL;DATA EMISS\xC3O\n".to_vec();
        bytes.extend_from_slice(b"ACME LTDA;1.520,75;05/01/2024 10:00:00\n");
        bytes.extend_from_slice(b"BETA SA;99,90;20/01/2024 08:30:00\n");

        let loaded = parse_csv_bytes("nfe.csv", &bytes).unwrap();
        let ds = &loaded.dataset;

        assert_eq!(loaded.encoding, Some("windows-1252"));
        assert_eq!(ds.columns()[0].name, "RAZÃO SOCIAL EMITENTE");
        assert_eq!(ds.columns()[1].kind, ColumnKind::Numeric);
        assert_eq!(ds.columns()[2].kind, ColumnKind::Temporal);
        assert_eq!(ds.rows()[0][1], CellValue::Float(1520.75));
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn strips_utf8_bom() {
        let bytes = "\u{feff}fornecedor,valor\nACME,10\n".as_bytes();
        let loaded = parse_csv_bytes("a.csv", bytes).unwrap();
        assert_eq!(loaded.encoding, Some("UTF-8"));
        assert_eq!(loaded.dataset.columns()[0].name, "fornecedor");
    }

    #[test]
    fn lenient_mode_skips_ragged_rows() {
        let text = "fornecedor,valor\nACME,10\nBROKEN\nBETA,20,extra\nGAMA,30\n";
        let loaded = parse_csv_bytes("a.csv", text.as_bytes()).unwrap();

        assert_eq!(loaded.skipped_rows, 2);
        assert_eq!(loaded.dataset.len(), 2);
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let text = "valor,valor,valor\n1,2,3\n";
        let loaded = parse_csv_bytes("a.csv", text.as_bytes()).unwrap();
        let names: Vec<&str> = loaded
            .dataset
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["valor", "valor.1", "valor.2"]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_csv_bytes("a.csv", b"").is_err());
    }

    #[test]
    fn zip_members_become_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notas.zip");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("2024/jan.csv", options).unwrap();
            zip.write_all(b"fornecedor,valor\nACME,10\n").unwrap();
            zip.start_file("leia-me.txt", options).unwrap();
            zip.write_all(b"ignored").unwrap();
            zip.start_file("fev.csv", options).unwrap();
            zip.write_all(b"fornecedor,valor\nBETA,20\nGAMA,5\n").unwrap();
            zip.finish().unwrap();
        }

        let loaded = load_file(&path).unwrap();
        let names: Vec<&str> = loaded.iter().map(|l| l.dataset.name()).collect();
        assert_eq!(names, vec!["jan.csv", "fev.csv"]);
        assert_eq!(loaded[1].dataset.len(), 2);
    }

    #[test]
    fn zip_without_csv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vazio.zip");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("nota.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"x").unwrap();
            zip.finish().unwrap();
        }

        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Nenhum arquivo CSV"));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notas.json");
        std::fs::write(
            &path,
            r#"[{"fornecedor":"ACME","valor":10.5},{"fornecedor":"BETA","data":"2024-01-05"}]"#,
        )
        .unwrap();

        let loaded = load_file(&path).unwrap();
        let ds = &loaded[0].dataset;
        assert_eq!(ds.columns().len(), 3);
        assert_eq!(ds.rows()[0][1], CellValue::Float(10.5));
        assert!(ds.rows()[1][1].is_null());
        assert_eq!(ds.columns()[2].kind, ColumnKind::Temporal);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(load_file(Path::new("notas.xlsx")).is_err());
    }
}
