use std::collections::{BTreeSet, HashSet};
use std::fmt;

use anyhow::{Result, bail};
use chrono::{NaiveDateTime, NaiveTime};

use crate::error::{DashResult, DashboardError};

// ---------------------------------------------------------------------------
// DataKind – which of the three dataset slots a table belongs to
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    WellLog,
    Production,
    Drilling,
}

impl DataKind {
    pub const ALL: [DataKind; 3] = [DataKind::WellLog, DataKind::Production, DataKind::Drilling];

    /// Human-readable name used in notices ("the well log data").
    pub fn label(self) -> &'static str {
        match self {
            DataKind::WellLog => "well log",
            DataKind::Production => "production",
            DataKind::Drilling => "drilling",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell, used for previews and categorical selection
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Categorical selections live in `BTreeSet`s, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Null,
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                DateTime(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(f) => f.to_bits().hash(state),
            CellValue::DateTime(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{v:.0}")
            }
            CellValue::Number(v) => write!(f, "{v:.4}"),
            CellValue::DateTime(d) if d.time() == NaiveTime::MIN => {
                write!(f, "{}", d.format("%Y-%m-%d"))
            }
            CellValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Column – a named, typed vector of cells
// ---------------------------------------------------------------------------

/// Column storage. Missing numbers are NaN; missing text and dates are `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<Option<String>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn datetime(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::DateTime(values),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&[Option<NaiveDateTime>]> {
        match &self.data {
            ColumnData::DateTime(v) => Some(v),
            _ => None,
        }
    }

    /// Cell at `row` as a dynamically-typed value.
    pub fn value(&self, row: usize) -> CellValue {
        match &self.data {
            ColumnData::Numeric(v) => v
                .get(row)
                .map(|x| if x.is_nan() { CellValue::Null } else { CellValue::Number(*x) })
                .unwrap_or(CellValue::Null),
            ColumnData::Text(v) => v
                .get(row)
                .and_then(|s| s.clone())
                .map(CellValue::Text)
                .unwrap_or(CellValue::Null),
            ColumnData::DateTime(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Null),
        }
    }

    /// Equality where NaN cells match NaN cells with the same bits, which the
    /// derived `PartialEq` does not give for numeric columns.
    pub fn bit_eq(&self, other: &Column) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.data, &other.data) {
            (ColumnData::Numeric(a), ColumnData::Numeric(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (a, b) => a == b,
        }
    }

    /// New column holding only the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            ColumnData::DateTime(v) => ColumnData::DateTime(rows.iter().map(|&r| v[r]).collect()),
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the common tabular representation of all three datasets
// ---------------------------------------------------------------------------

/// Column-oriented table. All columns have the same length and unique names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that column lengths agree and names are unique.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for col in &columns {
            if col.len() != n_rows {
                bail!(
                    "column '{}' has {} rows, expected {n_rows}",
                    col.name,
                    col.len()
                );
            }
            if !seen.insert(col.name.as_str()) {
                bail!("duplicate column name '{}'", col.name);
            }
        }
        Ok(Table { columns, n_rows })
    }

    /// Internal constructor for derivations that build columns of equal length.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == n_rows));
        Table { columns, n_rows }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        self.column(name).and_then(Column::as_numeric)
    }

    pub fn datetime(&self, name: &str) -> Option<&[Option<NaiveDateTime>]> {
        self.column(name).and_then(Column::as_datetime)
    }

    /// Numeric column or a `MissingColumn` error naming `table`.
    pub fn require_numeric(&self, name: &str, table: &str) -> DashResult<&[f64]> {
        self.numeric(name)
            .ok_or_else(|| DashboardError::missing_column(name, table))
    }

    /// Date/time column or a `MissingColumn` error naming `table`.
    pub fn require_datetime(
        &self,
        name: &str,
        table: &str,
    ) -> DashResult<&[Option<NaiveDateTime>]> {
        self.datetime(name)
            .ok_or_else(|| DashboardError::missing_column(name, table))
    }

    /// Column-wise [`Column::bit_eq`].
    pub fn bit_eq(&self, other: &Table) -> bool {
        self.n_rows == other.n_rows
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| a.bit_eq(b))
    }

    /// New table holding only the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }

    /// First `n` rows (preview).
    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..self.n_rows.min(n)).collect();
        self.take_rows(&rows)
    }

    /// Sorted distinct values of a column (empty if the column is absent).
    pub fn unique_values(&self, name: &str) -> BTreeSet<CellValue> {
        match self.column(name) {
            Some(col) => (0..self.n_rows).map(|r| col.value(r)).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Distinct values in order of first appearance.
    pub fn distinct_in_order(&self, name: &str) -> Vec<CellValue> {
        let Some(col) = self.column(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        (0..self.n_rows)
            .map(|r| col.value(r))
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Well-log header and loaded dataset
// ---------------------------------------------------------------------------

/// One `MNEM.UNIT VALUE : DESCRIPTION` line of a LAS header section.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderItem {
    pub mnemonic: String,
    pub unit: String,
    pub value: String,
    pub description: String,
}

/// A table plus whatever source metadata came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub kind: DataKind,
    /// File name or upload name, for display.
    pub source_name: String,
    pub table: Table,
    /// `~W` section of a LAS file; empty for CSV/Parquet sources.
    pub well_header: Vec<HeaderItem>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.table.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Same kind, name, header and bit-identical table.
    pub fn bit_eq(&self, other: &Dataset) -> bool {
        self.kind == other.kind
            && self.source_name == other.source_name
            && self.well_header == other.well_header
            && self.table.bit_eq(&other.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("DEPTH", vec![100.0, 150.0, 200.0]),
            Column::text(
                "Formation",
                vec![Some("Shale".into()), None, Some("Sand".into())],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn rejects_duplicate_names() {
        assert!(Table::new(vec![
            Column::numeric("a", vec![1.0]),
            Column::numeric("a", vec![2.0]),
        ])
        .is_err());
    }

    #[test]
    fn bit_eq_matches_nan_cells() {
        let a = Table::new(vec![Column::numeric("GR", vec![10.0, f64::NAN])]).unwrap();
        let b = a.clone();
        assert_ne!(a, b);
        assert!(a.bit_eq(&b));
        let c = Table::new(vec![Column::numeric("GR", vec![10.0, 11.0])]).unwrap();
        assert!(!a.bit_eq(&c));
        assert!(sample().bit_eq(&sample()));
    }

    #[test]
    fn take_rows_and_head() {
        let t = sample();
        let sub = t.take_rows(&[2, 0]);
        assert_eq!(sub.numeric("DEPTH").unwrap(), &[200.0, 100.0]);
        assert_eq!(t.head(2).n_rows(), 2);
        assert_eq!(t.head(10).n_rows(), 3);
    }

    #[test]
    fn unique_values_include_null() {
        let vals = sample().unique_values("Formation");
        assert_eq!(vals.len(), 3);
        assert!(vals.contains(&CellValue::Null));
        assert!(sample().unique_values("missing").is_empty());
    }

    #[test]
    fn display_formats_whole_numbers_without_decimals() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5000");
    }

    #[test]
    fn require_numeric_reports_missing_column() {
        let err = sample().require_numeric("ROP", "drilling").unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { .. }));
        assert!(err.to_string().contains("ROP"));
    }
}
