use std::collections::BTreeMap;

use statrs::statistics::Statistics;

use crate::error::DashResult;

use super::model::{CellValue, Table};
use super::resample::{Accumulator, Aggregator};

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Summary of one numeric column. NaN values are not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Count, mean, std, min, quartiles and max of every numeric column.
pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .filter_map(|c| c.as_numeric().map(|v| summarize(&c.name, v)))
        .collect()
}

pub fn summarize(name: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    ColumnSummary {
        name: name.to_string(),
        count: sorted.len(),
        mean: sorted.iter().mean(),
        std: sorted.iter().std_dev(),
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Rolling mean
// ---------------------------------------------------------------------------

/// Trailing mean over `window` consecutive positions.
///
/// The first `window - 1` positions have no value, as does any window that
/// contains a NaN. Never looks ahead. A zero window yields no values.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; series.len()];
    }
    (0..series.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &series[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                None
            } else {
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` square. NaN where undefined.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Pairwise Pearson correlation of every numeric column not in `excluded`.
/// Each pair uses the rows where both values are present. Columns with zero
/// variance correlate as NaN everywhere, including the diagonal.
pub fn correlation_matrix(table: &Table, excluded: &[&str]) -> CorrelationMatrix {
    let cols: Vec<(&str, &[f64])> = table
        .columns()
        .iter()
        .filter(|c| !excluded.contains(&c.name.as_str()))
        .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
        .collect();
    let n = cols.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(cols[i].1, cols[j].1);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: cols.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

/// Pearson r over pairwise-complete observations; NaN with fewer than two
/// pairs or zero variance on either side.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip();
    if xs.len() < 2 {
        return f64::NAN;
    }
    let mx = xs.iter().mean();
    let my = ys.iter().mean();
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in xs.iter().zip(&ys) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]` of the non-NaN values. The last bin
/// includes `max`. A constant series gets a single unit-wide bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            lo: min - 0.5,
            hi: max + 0.5,
            count: finite.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lo: min + width * i as f64,
            hi: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Group-by
// ---------------------------------------------------------------------------

/// Aggregate `value` per distinct `key`, sorted by key. Rows with a missing
/// key are dropped.
pub fn aggregate_by(
    table: &Table,
    key: &str,
    value: &str,
    aggregator: Aggregator,
) -> DashResult<Vec<(CellValue, f64)>> {
    let key_col = table
        .column(key)
        .ok_or_else(|| crate::error::DashboardError::missing_column(key, "loaded"))?;
    let values = table.require_numeric(value, "loaded")?;

    let mut groups: BTreeMap<CellValue, Accumulator> = BTreeMap::new();
    for (row, v) in values.iter().enumerate() {
        let k = key_col.value(row);
        if k == CellValue::Null {
            continue;
        }
        groups.entry(k).or_default().push(*v);
    }
    Ok(groups
        .into_iter()
        .map(|(k, acc)| (k, acc.finish(aggregator)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rolling_mean_window_three() {
        let out = rolling_mean(&[10.0, 20.0, 30.0, 40.0], 3);
        assert_eq!(out, vec![None, None, Some(20.0), Some(30.0)]);
    }

    #[test]
    fn rolling_mean_edge_cases() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 5), vec![None, None]);
        assert_eq!(rolling_mean(&[1.0, 2.0], 0), vec![None, None]);
        assert_eq!(rolling_mean(&[1.0, f64::NAN, 3.0, 5.0], 2), vec![None, None, None, Some(4.0)]);
        assert_eq!(rolling_mean(&[4.0], 1), vec![Some(4.0)]);
    }

    #[test]
    fn describe_matches_linear_quantiles() {
        let t = Table::new(vec![
            Column::numeric("GR", vec![1.0, 2.0, 3.0, 4.0, f64::NAN]),
            Column::text("Name", vec![None; 5]),
        ])
        .unwrap();
        let s = &describe(&t)[0];
        assert_eq!(s.count, 4);
        assert!(close(s.mean, 2.5));
        assert!(close(s.std, (5.0f64 / 3.0).sqrt()));
        assert!(close(s.q25, 1.75));
        assert!(close(s.median, 2.5));
        assert!(close(s.q75, 3.25));
        assert_eq!((s.min, s.max), (1.0, 4.0));
        assert_eq!(describe(&t).len(), 1);
    }

    #[test]
    fn identical_columns_correlate_perfectly() {
        let v = vec![1.0, 3.0, 2.0, 8.0, 5.0];
        let t = Table::new(vec![
            Column::numeric("DEPTH", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::numeric("A", v.clone()),
            Column::numeric("B", v),
            Column::numeric("C", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let m = correlation_matrix(&t, &["DEPTH"]);
        assert_eq!(m.columns, vec!["A", "B", "C"]);
        assert!(close(m.get("A", "B").unwrap(), 1.0));
        for i in 0..3 {
            assert!(close(m.values[i][i], 1.0));
        }
        assert_eq!(m.get("A", "C"), m.get("C", "A"));
    }

    #[test]
    fn constant_column_correlation_is_nan() {
        let t = Table::new(vec![
            Column::numeric("A", vec![1.0, 2.0, 3.0]),
            Column::numeric("K", vec![7.0, 7.0, 7.0]),
        ])
        .unwrap();
        let m = correlation_matrix(&t, &[]);
        assert!(m.get("A", "K").unwrap().is_nan());
        assert!(m.get("K", "K").unwrap().is_nan());
        assert!(close(m.get("A", "A").unwrap(), 1.0));
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bins = histogram(&values, 30);
        assert_eq!(bins.len(), 30);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(bins.last().unwrap().hi, 99.0);
        assert_eq!(histogram(&[2.0, 2.0], 10).len(), 1);
        assert!(histogram(&[], 10).is_empty());
    }

    #[test]
    fn aggregate_by_sorts_and_skips_null_keys() {
        let t = Table::new(vec![
            Column::text(
                "Formation",
                vec![Some("Sand".into()), Some("Shale".into()), Some("Sand".into()), None],
            ),
            Column::numeric("ROP", vec![10.0, 4.0, 20.0, 99.0]),
        ])
        .unwrap();
        let out = aggregate_by(&t, "Formation", "ROP", Aggregator::Mean).unwrap();
        assert_eq!(
            out,
            vec![
                (CellValue::Text("Sand".into()), 15.0),
                (CellValue::Text("Shale".into()), 4.0)
            ]
        );
    }
}
