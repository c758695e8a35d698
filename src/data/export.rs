use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Date32Builder, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;

use super::model::{CellValue, Column, ColumnKind, Dataset};
use crate::analysis::union::UnionView;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

// ---------------------------------------------------------------------------
// Union export
// ---------------------------------------------------------------------------

/// Write the union of `snapshot` to `path`, choosing the format from the extension.
///
/// Returns the number of rows written.
pub fn export_union(path: &Path, snapshot: &[Arc<Dataset>]) -> Result<usize> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => export_csv(path, snapshot),
        "parquet" | "pq" => export_parquet(path, snapshot),
        _ => bail!("Unsupported export extension: {}", path.display()),
    }
}

fn non_empty(snapshot: &[Arc<Dataset>]) -> Result<UnionView<'_>> {
    let view = UnionView::new(snapshot);
    if view.row_count() == 0 {
        bail!("Nenhum dado para exportar");
    }
    Ok(view)
}

/// Union columns as the header, one line per row, nulls as empty cells.
pub fn export_csv(path: &Path, snapshot: &[Arc<Dataset>]) -> Result<usize> {
    let view = non_empty(snapshot)?;
    let columns = view.columns();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    let mut written = 0;
    for row in view.rows(&columns) {
        writer.write_record(row.iter().map(|cell| plain_text(cell)))?;
        written += 1;
    }
    writer.flush()?;

    log::info!("Exported {written} rows to {}", path.display());
    Ok(written)
}

/// Cell text without display rounding.
fn plain_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Float(v) => v.to_string(),
        other => other.to_string(),
    }
}

/// Single record batch with Float64, Date32 and Utf8 columns, all nullable.
pub fn export_parquet(path: &Path, snapshot: &[Arc<Dataset>]) -> Result<usize> {
    let view = non_empty(snapshot)?;
    let columns = view.columns();
    let rows: Vec<Vec<&CellValue>> = view.rows(&columns).collect();

    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c.kind), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| build_array(column, rows.iter().map(|r| r[i])))
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .context("Failed to assemble export batch")?;

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Numeric => DataType::Float64,
        ColumnKind::Temporal => DataType::Date32,
        ColumnKind::Text => DataType::Utf8,
    }
}

fn build_array<'a>(column: &Column, cells: impl Iterator<Item = &'a CellValue>) -> ArrayRef {
    match column.kind {
        ColumnKind::Numeric => {
            let mut builder = Float64Builder::new();
            for cell in cells {
                builder.append_option(cell.as_f64());
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Temporal => {
            let mut builder = Date32Builder::new();
            for cell in cells {
                builder.append_option(
                    cell.as_date()
                        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                );
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Text => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                match cell {
                    CellValue::Null => builder.append_null(),
                    other => builder.append_value(plain_text(other)),
                }
            }
            Arc::new(builder.finish())
        }
    }
}
