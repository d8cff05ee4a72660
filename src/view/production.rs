use std::collections::BTreeSet;

use crate::config::DashboardConfig;
use crate::data::decline::{DeclineFit, decline_curve_fit};
use crate::data::filter::{filter_by_values, init_selection};
use crate::data::kpi::{WELL_ID, production_columns};
use crate::data::loader::PRODUCTION_DATE;
use crate::data::model::{CellValue, DataKind, Table};
use crate::data::resample::{Aggregator, resample};
use crate::data::stats::{aggregate_by, rolling_mean};
use crate::error::{DashResult, DashboardError};
use crate::state::{ProductionSelection, Session};

use super::{
    Axis, Block, ChartSpec, Notice, Section, Series, SeriesStyle, TableView, resolve_column, time_x,
};

pub const MA_WINDOW_MIN: usize = 2;
pub const MA_WINDOW_MAX: usize = 12;

const DATE_SECTIONS: [&str; 4] = [
    "Resampled Production Data",
    "Production Trends",
    "Moving Averages",
    "Decline Curve Analysis",
];

#[derive(Debug, Clone, Default)]
pub struct ProductionView {
    /// Distinct `Well_ID`s in order of appearance; empty without the column.
    pub wells: Vec<CellValue>,
    pub selected_wells: BTreeSet<CellValue>,
    pub production_columns: Vec<String>,
    pub column: Option<String>,
    pub ma_window: usize,
    /// Well the decline fit runs on; `None` for the total.
    pub decline_well: Option<String>,
    pub sections: Vec<Section>,
}

pub fn build(
    session: &Session,
    selection: &ProductionSelection,
    config: &DashboardConfig,
) -> ProductionView {
    let ma_window = selection.ma_window.clamp(MA_WINDOW_MIN, MA_WINDOW_MAX);
    let Some(table) = session.table(DataKind::Production) else {
        let mut section = Section::new("Production Data Analysis");
        section.notice(Notice::info(
            "Please upload a CSV file or use sample data to begin analysis.",
        ));
        return ProductionView {
            ma_window,
            sections: vec![section],
            ..ProductionView::default()
        };
    };

    let columns = production_columns(table);
    let mut view = ProductionView {
        column: resolve_column(selection.column.as_deref(), &columns, 0),
        production_columns: columns,
        ma_window,
        ..ProductionView::default()
    };

    let mut preview = Section::new("Production Data");
    preview.push(Block::Table(TableView::preview(table, config.preview_rows)));
    view.sections.push(preview);

    let column = match (table.datetime(PRODUCTION_DATE).is_some(), view.column.clone()) {
        (true, Some(column)) => column,
        (has_date, _) => {
            let mut missing = Section::new("Required Columns");
            missing.notice(Notice::error(
                "The data does not have the required columns (Date and production data columns).",
            ));
            view.sections.push(missing);
            let err = if !has_date {
                DashboardError::missing_column(PRODUCTION_DATE, "production")
            } else {
                DashboardError::missing_column("oil/gas production", "production")
            };
            for title in DATE_SECTIONS {
                let mut section = Section::new(title);
                section.notice(&err);
                view.sections.push(section);
            }
            return view;
        }
    };

    let source = if table.has_column(WELL_ID) {
        view.wells = table.distinct_in_order(WELL_ID);
        view.selected_wells = match &selection.wells {
            Some(chosen) => view.wells.iter().filter(|w| chosen.contains(*w)).cloned().collect(),
            None => init_selection(table, WELL_ID),
        };
        if view.selected_wells.is_empty() {
            let mut section = Section::new("Well Selection");
            section.notice(Notice::warning("Please select at least one well."));
            view.sections.push(section);
            return view;
        }
        filter_by_values(table, WELL_ID, &view.selected_wells)
    } else {
        table.clone()
    };
    let keys: &[&str] = if view.wells.is_empty() { &[] } else { &[WELL_ID] };

    let resampled = resample(&source, PRODUCTION_DATE, keys, selection.frequency, Aggregator::Sum);
    let resampled = match resampled {
        Ok(t) => t,
        Err(e) => {
            for title in DATE_SECTIONS {
                let mut section = Section::new(title);
                section.notice(&e);
                view.sections.push(section);
            }
            return view;
        }
    };

    let mut resampled_section = Section::new("Resampled Production Data");
    resampled_section.push(Block::Table(TableView::preview(&resampled, config.preview_rows)));
    view.sections.push(resampled_section);

    view.sections.push(trends(&resampled, &column, &view.wells));
    view.sections.push(moving_average(&resampled, &column, ma_window));

    view.decline_well = session
        .selected_well
        .as_ref()
        .filter(|w| view.wells.iter().any(|v| v.to_string() == **w))
        .cloned();
    if selection.show_decline {
        view.sections
            .push(decline_section(&resampled, &column, view.decline_well.as_deref()));
    } else {
        view.sections.push(Section::new("Decline Curve Analysis"));
    }
    view
}

/// Epoch-second x values of the date column, NaN for missing dates.
fn date_x(table: &Table) -> DashResult<Vec<f64>> {
    let dates = table.require_datetime(PRODUCTION_DATE, "production")?;
    Ok(dates.iter().map(|d| d.as_ref().map_or(f64::NAN, time_x)).collect())
}

fn trends(resampled: &Table, column: &str, wells: &[CellValue]) -> Section {
    let mut section = Section::new("Production Trends");
    let built = date_x(resampled).and_then(|x| {
        let values = resampled.require_numeric(column, "production")?;
        let mut chart = ChartSpec::new(
            "production_trends",
            format!("{column} over time"),
            Axis::time(PRODUCTION_DATE),
            Axis::linear(column),
        );
        if wells.is_empty() {
            chart = chart.with_series(Series::from_xy(column, SeriesStyle::Line, &x, values));
        } else {
            let ids = resampled
                .column(WELL_ID)
                .ok_or_else(|| DashboardError::missing_column(WELL_ID, "production"))?;
            for well in wells {
                let rows: Vec<usize> = (0..resampled.n_rows())
                    .filter(|&r| ids.value(r) == *well)
                    .collect();
                if rows.is_empty() {
                    continue;
                }
                let wx: Vec<f64> = rows.iter().map(|&r| x[r]).collect();
                let wy: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
                let series = Series::from_xy(well.to_string(), SeriesStyle::Line, &wx, &wy);
                chart = chart.with_series(series);
            }
        }
        Ok(chart)
    });
    match built {
        Ok(chart) => section.push(Block::Chart(chart)),
        Err(e) => section.notice(e),
    }
    section
}

/// Production summed over wells per bucket, in date order.
pub fn total_by_date(resampled: &Table, column: &str) -> DashResult<Vec<(f64, f64)>> {
    Ok(aggregate_by(resampled, PRODUCTION_DATE, column, Aggregator::Sum)?
        .into_iter()
        .filter_map(|(date, total)| match date {
            CellValue::DateTime(d) => Some((time_x(&d), total)),
            _ => None,
        })
        .collect())
}

fn moving_average(resampled: &Table, column: &str, window: usize) -> Section {
    let mut section = Section::new("Moving Averages");
    let totals = match total_by_date(resampled, column) {
        Ok(t) => t,
        Err(e) => {
            section.notice(e);
            return section;
        }
    };
    let x: Vec<f64> = totals.iter().map(|(x, _)| *x).collect();
    let y: Vec<f64> = totals.iter().map(|(_, y)| *y).collect();
    let ma: Vec<f64> = rolling_mean(&y, window)
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    section.push(Block::Chart(
        ChartSpec::new(
            "production_moving_average",
            format!("Total {column} with {window}-Period Moving Average"),
            Axis::time(PRODUCTION_DATE),
            Axis::linear(column),
        )
        .with_series(Series::from_xy("Total Production", SeriesStyle::Line, &x, &y))
        .with_series(Series::from_xy(
            format!("{window}-Period Moving Average"),
            SeriesStyle::Line,
            &x,
            &ma,
        )),
    ));
    section
}

/// The series the decline fit runs on: one well, or the total.
fn decline_input(
    resampled: &Table,
    column: &str,
    well: Option<&str>,
) -> DashResult<(Vec<Option<chrono::NaiveDateTime>>, Vec<f64>)> {
    let dates = resampled.require_datetime(PRODUCTION_DATE, "production")?;
    let values = resampled.require_numeric(column, "production")?;
    if let Some(well) = well {
        let ids = resampled
            .column(WELL_ID)
            .ok_or_else(|| DashboardError::missing_column(WELL_ID, "production"))?;
        let rows: Vec<usize> = (0..resampled.n_rows())
            .filter(|&r| ids.value(r).to_string() == well)
            .collect();
        return Ok((
            rows.iter().map(|&r| dates[r]).collect(),
            rows.iter().map(|&r| values[r]).collect(),
        ));
    }
    Ok(aggregate_by(resampled, PRODUCTION_DATE, column, Aggregator::Sum)?
        .into_iter()
        .filter_map(|(date, total)| match date {
            CellValue::DateTime(d) => Some((Some(d), total)),
            _ => None,
        })
        .unzip())
}

fn decline_section(resampled: &Table, column: &str, well: Option<&str>) -> Section {
    let mut section = Section::new("Decline Curve Analysis");
    let fit = decline_input(resampled, column, well)
        .and_then(|(dates, values)| decline_curve_fit(&dates, &values));
    match fit {
        Ok(fit) => {
            section.push(Block::Chart(decline_chart(&fit, column)));
            section.push(Block::Metrics(decline_metrics(&fit)));
        }
        Err(e) => section.notice(e),
    }
    section
}

fn decline_chart(fit: &DeclineFit, column: &str) -> ChartSpec {
    let observed = fit.observed.iter().map(|p| [time_x(&p.date), p.rate]).collect();
    let forecast = fit.forecast.iter().map(|p| [time_x(&p.date), p.rate]).collect();
    ChartSpec::new(
        "production_decline",
        format!(
            "Decline Curve Analysis (Annual Decline Rate: {:.1}%)",
            fit.decline_rate * 100.0
        ),
        Axis::time(PRODUCTION_DATE),
        Axis::linear(column),
    )
    .with_series(Series::new("Actual Production", SeriesStyle::Markers, observed))
    .with_series(Series::new("Exponential Decline Model", SeriesStyle::Line, forecast))
}

fn decline_metrics(fit: &DeclineFit) -> Vec<(String, String)> {
    vec![
        (
            "Initial Production (q_i)".to_string(),
            format!("{:.2}", fit.initial_production),
        ),
        (
            "Decline Rate (D)".to_string(),
            format!(
                "{:.4} per year ({:.1}% per year)",
                fit.decline_rate,
                fit.decline_rate * 100.0
            ),
        ),
        ("R-squared".to_string(), format!("{:.4}", fit.r_squared)),
    ]
}
