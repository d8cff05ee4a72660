use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit, TimestampMicrosecondType};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{DashResult, DashboardError};

use super::las::parse_las;
use super::model::{Column, ColumnData, DataKind, Dataset, HeaderItem, Table};

/// Date column of production tables.
pub const PRODUCTION_DATE: &str = "Date";
/// Timestamp column of drilling tables.
pub const DRILLING_TIMESTAMP: &str = "Timestamp";
/// Exact format of drilling timestamps; the fraction may be absent.
pub const DRILLING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Cells that count as missing in delimited text.
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where a dataset comes from: a file on disk or an in-memory upload.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Path(PathBuf),
    Upload { name: String, bytes: Bytes },
}

impl DataSource {
    /// File name shown in messages.
    pub fn name(&self) -> String {
        match self {
            DataSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            DataSource::Upload { name, .. } => name.clone(),
        }
    }

    /// Lower-case extension without the dot.
    pub fn extension(&self) -> String {
        let path = match self {
            DataSource::Path(p) => p.as_path(),
            DataSource::Upload { name, .. } => Path::new(name),
        };
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    /// Raw content. The only blocking I/O the loader performs.
    pub fn read(&self) -> DashResult<Bytes> {
        match self {
            DataSource::Path(p) => std::fs::read(p)
                .map(Bytes::from)
                .with_context(|| format!("reading {}", p.display()))
                .map_err(|e| DashboardError::load(self.name(), &e)),
            DataSource::Upload { bytes, .. } => Ok(bytes.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read and parse a source as the given kind of dataset.
pub fn load(source: &DataSource, kind: DataKind) -> DashResult<Dataset> {
    let bytes = source.read()?;
    load_bytes(&source.name(), &source.extension(), &bytes, kind)
}

/// Parse already-read content. Pure: the same bytes always give the same table.
///
/// Well logs are always parsed as LAS. Production and drilling tables are
/// dispatched by extension:
/// * `.parquet` / `.pq` – Parquet file
/// * anything else      – comma-delimited text with a header row
pub fn load_bytes(
    name: &str,
    extension: &str,
    bytes: &Bytes,
    kind: DataKind,
) -> DashResult<Dataset> {
    let parsed = match kind {
        DataKind::WellLog => load_las(bytes),
        DataKind::Production | DataKind::Drilling => {
            let table = match extension {
                "parquet" | "pq" => load_parquet(bytes.clone()),
                _ => load_csv(bytes, kind),
            };
            table
                .and_then(|t| normalize_dates(t, kind))
                .map(|t| (t, Vec::new()))
        }
    };

    match parsed {
        Ok((table, well_header)) => {
            log::info!(
                "Loaded {kind} data from {name}: {} rows, columns {:?}",
                table.n_rows(),
                table.column_names()
            );
            Ok(Dataset {
                kind,
                source_name: name.to_string(),
                table,
                well_header,
            })
        }
        Err(e) => {
            log::error!("Failed to load {kind} data from {name}: {e:#}");
            Err(DashboardError::load(name, &e))
        }
    }
}

// ---------------------------------------------------------------------------
// LAS loader
// ---------------------------------------------------------------------------

fn load_las(bytes: &[u8]) -> Result<(Table, Vec<HeaderItem>)> {
    let text = std::str::from_utf8(bytes).context("LAS file is not valid UTF-8")?;
    let las = parse_las(text).context("parsing LAS file")?;
    Ok((las.table, las.well))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per row.
/// Column types are inferred per column: numeric if every non-missing cell
/// parses as a number, text otherwise. The kind's date column stays text
/// here and is parsed by [`normalize_dates`].
fn load_csv(bytes: &[u8], kind: DataKind) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let date_column = date_column_for(kind);
    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            if Some(name.as_str()) == date_column {
                Column::text(name, raw.into_iter().map(non_missing).collect())
            } else {
                infer_column(name, raw)
            }
        })
        .collect();
    Table::new(columns)
}

fn non_missing(s: String) -> Option<String> {
    if NA_TOKENS.contains(&s.as_str()) { None } else { Some(s) }
}

fn infer_column(name: String, raw: Vec<String>) -> Column {
    let numeric: Option<Vec<f64>> = raw
        .iter()
        .map(|s| {
            if NA_TOKENS.contains(&s.as_str()) {
                Some(f64::NAN)
            } else {
                s.parse::<f64>().ok()
            }
        })
        .collect();
    match numeric {
        Some(values) => Column::numeric(name, values),
        None => Column::text(name, raw.into_iter().map(non_missing).collect()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet table. Strings stay text, dates and timestamps become
/// date/time columns, every other primitive (ints, floats, bools) becomes
/// numeric with nulls as NaN.
fn load_parquet(bytes: Bytes) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| empty_column_for(f.name(), f.data_type()))
        .collect::<Result<_>>()?;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col, array) in columns.iter_mut().zip(batch.columns()) {
            append_arrow(col, array.as_ref())
                .with_context(|| format!("parquet column '{}'", col.name))?;
        }
    }

    Table::new(columns)
}

fn empty_column_for(name: &str, data_type: &DataType) -> Result<Column> {
    Ok(match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Column::text(name, Vec::new()),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            Column::datetime(name, Vec::new())
        }
        t if t.is_numeric() || *t == DataType::Boolean => Column::numeric(name, Vec::new()),
        other => bail!("column '{name}' has unsupported type {other:?}"),
    })
}

fn append_arrow(col: &mut Column, array: &dyn Array) -> Result<()> {
    match &mut col.data {
        ColumnData::Text(values) => {
            let strings = cast(array, &DataType::Utf8).context("casting to Utf8")?;
            let strings = strings.as_string::<i32>();
            values.extend((0..strings.len()).map(|i| {
                (!strings.is_null(i)).then(|| strings.value(i).to_string())
            }));
        }
        ColumnData::DateTime(values) => {
            let ts = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))
                .context("casting to timestamp")?;
            let ts = ts.as_primitive::<TimestampMicrosecondType>();
            values.extend((0..ts.len()).map(|i| {
                if ts.is_null(i) { None } else { ts.value_as_datetime(i) }
            }));
        }
        ColumnData::Numeric(values) => {
            let floats = cast(array, &DataType::Float64).context("casting to Float64")?;
            let floats = floats.as_primitive::<arrow::datatypes::Float64Type>();
            values.extend(floats.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Date normalization
// ---------------------------------------------------------------------------

fn date_column_for(kind: DataKind) -> Option<&'static str> {
    match kind {
        DataKind::WellLog => None,
        DataKind::Production => Some(PRODUCTION_DATE),
        DataKind::Drilling => Some(DRILLING_TIMESTAMP),
    }
}

/// Parse the kind's date column into date/time values. Any unparseable cell
/// fails the whole load; a table without the column passes through.
fn normalize_dates(table: Table, kind: DataKind) -> Result<Table> {
    let Some(date_col) = date_column_for(kind) else {
        return Ok(table);
    };
    let Some(col) = table.column(date_col) else {
        log::warn!("{kind} data has no '{date_col}' column; date-based views are disabled");
        return Ok(table);
    };

    let values = match &col.data {
        ColumnData::DateTime(_) => None,
        ColumnData::Numeric(_) => bail!("column '{date_col}' holds numbers, expected dates"),
        ColumnData::Text(values) => Some(values),
    };
    let Some(values) = values else {
        return Ok(table);
    };

    let parsed = values
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(s) => {
                let parsed = match kind {
                    DataKind::Drilling => {
                        NaiveDateTime::parse_from_str(s, DRILLING_TIMESTAMP_FORMAT).ok()
                    }
                    _ => parse_date_flexible(s),
                };
                parsed.map(Some).with_context(|| {
                    format!("column '{date_col}', row {}: cannot parse '{s}' as a date", row + 1)
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let columns = table
        .columns()
        .iter()
        .map(|c| {
            if c.name == date_col {
                Column::datetime(date_col, parsed.clone())
            } else {
                c.clone()
            }
        })
        .collect();
    Table::new(columns)
}

/// Accepts ISO, slash-separated and US-style dates, with or without a time.
pub fn parse_date_flexible(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn upload(name: &str, text: &str) -> DataSource {
        DataSource::Upload {
            name: name.to_string(),
            bytes: Bytes::from(text.as_bytes().to_vec()),
        }
    }

    #[test]
    fn production_csv_parses_dates_and_infers_types() {
        let src = upload(
            "prod.csv",
            "Date,Well_ID,Oil_Production_bbl,Notes\n\
             2024-01-01,W1,100,ok\n\
             2024-01-02,W1,,\n\
             2024-01-03,W2,80.5,late\n",
        );
        let ds = load(&src, DataKind::Production).unwrap();
        let t = &ds.table;
        assert_eq!(t.n_rows(), 3);
        let dates = t.datetime("Date").unwrap();
        assert_eq!(dates[2].unwrap().date(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        let oil = t.numeric("Oil_Production_bbl").unwrap();
        assert_eq!(oil[0], 100.0);
        assert!(oil[1].is_nan());
        assert!(t.numeric("Well_ID").is_none());
        assert!(t.column("Notes").is_some_and(|c| !c.is_numeric()));
    }

    #[test]
    fn bad_production_date_is_fatal_and_names_column() {
        let src = upload("bad.csv", "Date,Oil\n2024-01-01,1\nyesterday,2\n");
        let err = load(&src, DataKind::Production).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, DashboardError::Load { .. }));
        assert!(msg.contains("bad.csv"), "{msg}");
        assert!(msg.contains("'Date'"), "{msg}");
        assert!(msg.contains("yesterday"), "{msg}");
    }

    #[test]
    fn missing_date_column_still_loads() {
        let src = upload("nodate.csv", "Well_ID,Oil_Production_bbl\nW1,10\n");
        let ds = load(&src, DataKind::Production).unwrap();
        assert!(!ds.table.has_column("Date"));
    }

    #[test]
    fn drilling_timestamp_requires_exact_format() {
        let ok = upload(
            "drill.csv",
            "Timestamp,Depth,ROP\n\
             2024-05-01 08:00:00.250000,1000,12\n\
             2024-05-01 08:00:01,1001,13\n",
        );
        let ds = load(&ok, DataKind::Drilling).unwrap();
        let ts = ds.table.datetime("Timestamp").unwrap();
        assert_eq!(ts[0].unwrap().and_utc().timestamp_subsec_micros(), 250_000);

        let bad = upload("drill.csv", "Timestamp,Depth\n05/01/2024 08:00,1000\n");
        assert!(load(&bad, DataKind::Drilling).is_err());
    }

    #[test]
    fn loading_twice_is_identical() {
        let src = upload("p.csv", "Date,Oil\n2024-01-01,1.5\n2024-02-01,2.5\n");
        let a = load(&src, DataKind::Production).unwrap();
        let b = load(&src, DataKind::Production).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn las_with_null_values_loads_identically_twice() {
        let src = upload(
            "w.las",
            "~W\n NULL. -999.25 : NULL VALUE\n~C\n DEPT.M : D\n GR.GAPI : g\n~A\n1 10\n2 -999.25\n",
        );
        let a = load(&src, DataKind::WellLog).unwrap();
        let b = load(&src, DataKind::WellLog).unwrap();
        assert!(a.table.numeric("GR").unwrap()[1].is_nan());
        assert!(a.bit_eq(&b));
        assert_eq!(a.table.numeric("DEPTH").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn ragged_csv_is_a_load_error() {
        let src = upload("r.csv", "a,b\n1,2\n3\n");
        assert!(matches!(
            load(&src, DataKind::Drilling),
            Err(DashboardError::Load { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let src = DataSource::Path(PathBuf::from("/definitely/not/here.las"));
        let err = load(&src, DataKind::WellLog).unwrap_err();
        assert!(err.to_string().contains("here.las"));
    }

    #[test]
    fn parquet_columns_are_typed() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Date", DataType::Date32, true),
            Field::new("Well_ID", DataType::Utf8, false),
            Field::new("Oil_Production_bbl", DataType::Float64, true),
            Field::new("Days_On", DataType::Int64, false),
        ]));
        // 19723 = 2024-01-01
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Date32Array::from(vec![Some(19723), None])),
                Arc::new(StringArray::from(vec!["W1", "W2"])),
                Arc::new(Float64Array::from(vec![Some(10.0), None])),
                Arc::new(Int64Array::from(vec![1, 2])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let src = DataSource::Upload {
            name: "prod.parquet".into(),
            bytes: Bytes::from(buf),
        };
        let ds = load(&src, DataKind::Production).unwrap();
        let dates = ds.table.datetime("Date").unwrap();
        assert_eq!(dates[0].unwrap().date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(dates[1], None);
        assert!(ds.table.numeric("Oil_Production_bbl").unwrap()[1].is_nan());
        assert_eq!(ds.table.numeric("Days_On").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn flexible_dates() {
        assert!(parse_date_flexible("2024-03-31").is_some());
        assert!(parse_date_flexible("03/31/2024").is_some());
        assert!(parse_date_flexible("2024-03-31T12:00:00").is_some());
        assert!(parse_date_flexible("31.03.2024").is_none());
    }
}
