use std::collections::BTreeSet;

use crate::error::DashResult;

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Range filter: depth windows
// ---------------------------------------------------------------------------

/// Rows with `lo <= value <= hi`, both ends inclusive. Missing (NaN) values
/// never pass. An empty result is a valid table, not an error.
pub fn filter_by_range(table: &Table, column: &str, lo: f64, hi: f64) -> DashResult<Table> {
    let values = table.require_numeric(column, "loaded")?;
    Ok(table.take_rows(&range_indices(values, lo, hi)))
}

/// Indices of values inside `[lo, hi]`.
pub fn range_indices(values: &[f64], lo: f64, hi: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| lo <= **v && **v <= hi)
        .map(|(i, _)| i)
        .collect()
}

/// `(min, max)` of a numeric column ignoring NaN; `None` if the column is
/// absent, not numeric, or has no values.
pub fn value_range(table: &Table, column: &str) -> Option<(f64, f64)> {
    table
        .numeric(column)?
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

// ---------------------------------------------------------------------------
// Categorical filter: which wells / formations are selected
// ---------------------------------------------------------------------------

/// All distinct values of `column` selected (i.e., show everything).
pub fn init_selection(table: &Table, column: &str) -> BTreeSet<CellValue> {
    table.unique_values(column)
}

/// Rows whose `column` value is in `selected`.
///
/// A column the table does not have is a stale selection and leaves the
/// table unchanged. An empty `selected` set keeps nothing; callers decide
/// whether an empty selection means "no filter" before calling.
pub fn filter_by_values(table: &Table, column: &str, selected: &BTreeSet<CellValue>) -> Table {
    let Some(col) = table.column(column) else {
        log::warn!("Ignoring selection on missing column '{column}'");
        return table.clone();
    };
    let rows: Vec<usize> = (0..table.n_rows())
        .filter(|&r| selected.contains(&col.value(r)))
        .collect();
    table.take_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn logs() -> Table {
        Table::new(vec![
            Column::numeric("DEPTH", vec![99.5, 100.0, 150.0, 200.0, 200.5, f64::NAN]),
            Column::text(
                "Formation",
                ["A", "A", "B", "C", "C", "A"].iter().map(|s| Some(s.to_string())).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let out = filter_by_range(&logs(), "DEPTH", 100.0, 200.0).unwrap();
        assert_eq!(out.numeric("DEPTH").unwrap(), &[100.0, 150.0, 200.0]);
    }

    #[test]
    fn empty_range_is_valid() {
        let out = filter_by_range(&logs(), "DEPTH", 1000.0, 2000.0).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.n_cols(), 2);
    }

    #[test]
    fn range_on_missing_column_is_an_error() {
        assert!(filter_by_range(&logs(), "GR", 0.0, 1.0).is_err());
    }

    #[test]
    fn value_range_skips_nan() {
        assert_eq!(value_range(&logs(), "DEPTH"), Some((99.5, 200.5)));
        assert_eq!(value_range(&logs(), "Formation"), None);
    }

    #[test]
    fn categorical_filter_and_stale_column() {
        let t = logs();
        let sel: BTreeSet<CellValue> = [CellValue::Text("C".into())].into_iter().collect();
        assert_eq!(filter_by_values(&t, "Formation", &sel).n_rows(), 2);
        assert_eq!(filter_by_values(&t, "Lithology", &sel).n_rows(), t.n_rows());
        assert_eq!(init_selection(&t, "Formation").len(), 3);
    }
}
