//! Calendar resampling of date-indexed tables.
//!
//! Buckets are labelled by their last calendar day:
//!
//! | frequency | bucket                | label                         |
//! |-----------|-----------------------|-------------------------------|
//! | Daily     | one calendar day      | that day                      |
//! | Weekly    | Monday ..= Sunday     | the Sunday                    |
//! | Monthly   | calendar month        | last day of the month         |
//! | Quarterly | Jan-Mar, Apr-Jun, ... | Mar 31, Jun 30, Sep 30, Dec 31|
//! | Yearly    | calendar year         | Dec 31                        |
//!
//! Every bucket between a group's first and last label is emitted, so gaps
//! in the data show up as empty buckets (0 for sums, NaN for means). Rows
//! without a date are dropped. Sums are conserved: the grand total of a
//! resampled column equals the total of the source column.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime};

use crate::error::{DashResult, DashboardError};

use super::model::{CellValue, Column, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Label of the bucket containing `date`.
    pub fn bucket_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday))
                    .unwrap_or(NaiveDate::MAX)
            }
            Frequency::Monthly => last_day_of_month(date.year(), date.month()),
            Frequency::Quarterly => {
                let quarter_end_month = (date.month() - 1) / 3 * 3 + 3;
                last_day_of_month(date.year(), quarter_end_month)
            }
            Frequency::Yearly => last_day_of_month(date.year(), 12),
        }
    }

    /// Label of the bucket after the one labelled `label`.
    pub fn next(self, label: NaiveDate) -> NaiveDate {
        match label.succ_opt() {
            Some(day_after) => self.bucket_end(day_after),
            None => NaiveDate::MAX,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next_first| next_first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// How values in one bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    /// NaN skipped; an empty bucket sums to 0.
    #[default]
    Sum,
    /// NaN skipped; an empty bucket is NaN.
    Mean,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    pub(crate) fn push(&mut self, v: f64) {
        if !v.is_nan() {
            self.sum += v;
            self.count += 1;
        }
    }

    pub(crate) fn finish(self, aggregator: Aggregator) -> f64 {
        match aggregator {
            Aggregator::Sum => self.sum,
            Aggregator::Mean if self.count == 0 => f64::NAN,
            Aggregator::Mean => self.sum / self.count as f64,
        }
    }
}

struct Group {
    /// A source row carrying this group's key values.
    representative: usize,
    buckets: BTreeMap<NaiveDate, Vec<Accumulator>>,
}

/// Resample `table` on `time_column` into calendar buckets, separately for
/// each combination of `group_keys` values (groups in order of first
/// appearance). Output columns: the bucket label, the group keys, then every
/// other numeric column aggregated.
pub fn resample(
    table: &Table,
    time_column: &str,
    group_keys: &[&str],
    frequency: Frequency,
    aggregator: Aggregator,
) -> DashResult<Table> {
    let times = table.require_datetime(time_column, "loaded")?;
    let key_columns = group_keys
        .iter()
        .map(|k| {
            table
                .column(k)
                .ok_or_else(|| DashboardError::missing_column(*k, "loaded"))
        })
        .collect::<DashResult<Vec<_>>>()?;
    let value_columns: Vec<(&str, &[f64])> = table
        .columns()
        .iter()
        .filter(|c| !group_keys.contains(&c.name.as_str()))
        .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
        .collect();

    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<Vec<CellValue>, usize> = HashMap::new();

    for (row, time) in times.iter().enumerate() {
        let Some(time) = time else { continue };
        let key: Vec<CellValue> = key_columns.iter().map(|c| c.value(row)).collect();
        let gi = *group_index.entry(key).or_insert_with(|| {
            groups.push(Group {
                representative: row,
                buckets: BTreeMap::new(),
            });
            groups.len() - 1
        });
        let accs = groups[gi]
            .buckets
            .entry(frequency.bucket_end(time.date()))
            .or_insert_with(|| vec![Accumulator::default(); value_columns.len()]);
        for (acc, (_, values)) in accs.iter_mut().zip(&value_columns) {
            acc.push(values[row]);
        }
    }

    let mut labels = Vec::new();
    let mut representatives = Vec::new();
    let mut outputs: Vec<Vec<f64>> = vec![Vec::new(); value_columns.len()];

    for group in &groups {
        let buckets = &group.buckets;
        let (Some((&first, _)), Some((&last, _))) =
            (buckets.first_key_value(), buckets.last_key_value())
        else {
            continue;
        };
        let mut label = first;
        loop {
            labels.push(Some(label.and_time(NaiveTime::MIN)));
            representatives.push(group.representative);
            match group.buckets.get(&label) {
                Some(accs) => {
                    for (out, acc) in outputs.iter_mut().zip(accs) {
                        out.push(acc.finish(aggregator));
                    }
                }
                None => {
                    for out in outputs.iter_mut() {
                        out.push(Accumulator::default().finish(aggregator));
                    }
                }
            }
            let next = frequency.next(label);
            if label >= last || next <= label {
                break;
            }
            label = next;
        }
    }

    let mut columns = vec![Column::datetime(time_column, labels)];
    columns.extend(key_columns.iter().map(|c| c.take(&representatives)));
    columns.extend(
        value_columns
            .iter()
            .zip(outputs)
            .map(|((name, _), values)| Column::numeric(*name, values)),
    );
    Ok(Table::from_columns(columns))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dt(y: i32, m: u32, day: u32) -> Option<NaiveDateTime> {
        Some(d(y, m, day).and_time(NaiveTime::MIN))
    }

    #[test]
    fn bucket_labels() {
        // 2024-01-10 is a Wednesday.
        assert_eq!(Frequency::Weekly.bucket_end(d(2024, 1, 10)), d(2024, 1, 14));
        assert_eq!(Frequency::Weekly.bucket_end(d(2024, 1, 14)), d(2024, 1, 14));
        assert_eq!(Frequency::Monthly.bucket_end(d(2024, 2, 3)), d(2024, 2, 29));
        assert_eq!(Frequency::Monthly.bucket_end(d(2023, 12, 31)), d(2023, 12, 31));
        assert_eq!(Frequency::Quarterly.bucket_end(d(2024, 5, 1)), d(2024, 6, 30));
        assert_eq!(Frequency::Yearly.bucket_end(d(2024, 5, 1)), d(2024, 12, 31));
        assert_eq!(Frequency::Monthly.next(d(2024, 1, 31)), d(2024, 2, 29));
    }

    #[test]
    fn monthly_sum_fills_gaps_with_zero() {
        let t = Table::new(vec![
            Column::datetime("Date", vec![dt(2024, 1, 5), dt(2024, 1, 20), dt(2024, 3, 2)]),
            Column::numeric("Oil", vec![10.0, 5.0, 7.0]),
        ])
        .unwrap();
        let out = resample(&t, "Date", &[], Frequency::Monthly, Aggregator::Sum).unwrap();
        assert_eq!(out.numeric("Oil").unwrap(), &[15.0, 0.0, 7.0]);
        let labels = out.datetime("Date").unwrap();
        assert_eq!(labels[1].unwrap().date(), d(2024, 2, 29));
    }

    #[test]
    fn mean_of_empty_bucket_is_nan() {
        let t = Table::new(vec![
            Column::datetime("Date", vec![dt(2024, 1, 5), dt(2024, 3, 2)]),
            Column::numeric("Oil", vec![10.0, 7.0]),
        ])
        .unwrap();
        let out = resample(&t, "Date", &[], Frequency::Monthly, Aggregator::Mean).unwrap();
        assert!(out.numeric("Oil").unwrap()[1].is_nan());
    }

    #[test]
    fn per_well_groups_keep_key_column() {
        let t = Table::new(vec![
            Column::datetime(
                "Date",
                vec![dt(2024, 1, 1), dt(2024, 1, 1), dt(2024, 2, 1), None],
            ),
            Column::text(
                "Well_ID",
                ["W1", "W2", "W1", "W2"].iter().map(|s| Some(s.to_string())).collect(),
            ),
            Column::numeric("Oil", vec![1.0, 2.0, 3.0, 100.0]),
        ])
        .unwrap();
        let out = resample(&t, "Date", &["Well_ID"], Frequency::Monthly, Aggregator::Sum).unwrap();
        assert_eq!(out.column_names(), vec!["Date", "Well_ID", "Oil"]);
        // W1: Jan, Feb; W2: Jan only (its undated row is dropped).
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.numeric("Oil").unwrap(), &[1.0, 3.0, 2.0]);
        assert_eq!(out.column("Well_ID").unwrap().value(2), CellValue::Text("W2".into()));
    }

    #[test]
    fn missing_time_column_is_reported() {
        let t = Table::new(vec![Column::numeric("Oil", vec![1.0])]).unwrap();
        let err = resample(&t, "Date", &[], Frequency::Daily, Aggregator::Sum).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { .. }));
    }
}
