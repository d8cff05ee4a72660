use crate::config::DashboardConfig;
use crate::data::kpi::{self, DRILLING_DEPTH, GAMMA_RAY, Kpi, OIL_PRODUCTION, ROP};
use crate::data::loader::PRODUCTION_DATE;
use crate::data::model::{DataKind, Table};
use crate::data::resample::{Aggregator, Frequency, resample};
use crate::data::stats::{describe, histogram};
use crate::error::DashResult;
use crate::state::Session;

use super::{Axis, Block, ChartSpec, Notice, Section, Series, SeriesStyle, TableView, time_x};

pub struct OverviewView {
    pub kpis: [Kpi; 4],
    /// Well log, production and drilling summary tabs.
    pub tabs: [Section; 3],
}

pub fn build(session: &Session, config: &DashboardConfig) -> OverviewView {
    let well_log = session.table(DataKind::WellLog);
    let production = session.table(DataKind::Production);
    let drilling = session.table(DataKind::Drilling);

    OverviewView {
        kpis: kpi::overview_kpis(well_log, production, drilling),
        tabs: [
            well_log_tab(well_log, config),
            production_tab(production),
            drilling_tab(drilling),
        ],
    }
}

fn no_data(kind: DataKind, page: &str) -> Notice {
    Notice::info(format!(
        "No {kind} data available. Please upload data on the {page} page."
    ))
}

fn well_log_tab(table: Option<&Table>, config: &DashboardConfig) -> Section {
    let mut section = Section::new("Well Log Summary");
    let Some(table) = table else {
        section.notice(no_data(DataKind::WellLog, "Well Log Analysis"));
        return section;
    };
    section.push(Block::Table(TableView::describe(&describe(table))));
    // The gamma-ray histogram only appears for logs that record GR.
    if let Some(gr) = table.numeric(GAMMA_RAY) {
        let bins = histogram(gr, config.histogram_bins);
        let width = bins.first().map(|b| b.hi - b.lo).unwrap_or(1.0);
        let points = bins
            .iter()
            .map(|b| [(b.lo + b.hi) / 2.0, b.count as f64])
            .collect();
        section.push(Block::Chart(
            ChartSpec::new(
                "overview_gr_hist",
                "Gamma Ray Distribution",
                Axis::linear(GAMMA_RAY),
                Axis::linear("count"),
            )
            .with_series(Series::new(GAMMA_RAY, SeriesStyle::Bars { width }, points)),
        ));
    }
    section
}

/// Oil production summed across wells per date, then per calendar month.
pub fn monthly_oil(table: &Table) -> DashResult<Table> {
    table.require_numeric(OIL_PRODUCTION, "production")?;
    resample(table, PRODUCTION_DATE, &[], Frequency::Monthly, Aggregator::Sum)
}

fn production_tab(table: Option<&Table>) -> Section {
    let mut section = Section::new("Production Summary");
    let Some(table) = table else {
        section.notice(no_data(DataKind::Production, "Production Analysis"));
        return section;
    };
    match monthly_oil(table) {
        Ok(monthly) => {
            let dates = monthly.datetime(PRODUCTION_DATE);
            let (Some(dates), Some(oil)) = (dates, monthly.numeric(OIL_PRODUCTION)) else {
                return section;
            };
            let x: Vec<f64> = dates.iter().map(|d| d.as_ref().map_or(f64::NAN, time_x)).collect();
            section.push(Block::Chart(
                ChartSpec::new(
                    "overview_monthly_oil",
                    "Monthly Oil Production",
                    Axis::time(PRODUCTION_DATE),
                    Axis::linear(OIL_PRODUCTION),
                )
                .with_series(Series::from_xy(OIL_PRODUCTION, SeriesStyle::Line, &x, oil)),
            ));
        }
        Err(e) => section.notice(e),
    }
    section
}

fn drilling_tab(table: Option<&Table>) -> Section {
    let mut section = Section::new("Drilling Summary");
    let Some(table) = table else {
        section.notice(no_data(DataKind::Drilling, "Drilling KPIs"));
        return section;
    };
    let columns = table
        .require_numeric(ROP, "drilling")
        .and_then(|rop| Ok((rop, table.require_numeric(DRILLING_DEPTH, "drilling")?)));
    match columns {
        Ok((rop, depth)) => section.push(Block::Chart(
            ChartSpec::new(
                "overview_rop_depth",
                "ROP vs Depth",
                Axis::linear(ROP),
                Axis::depth(DRILLING_DEPTH),
            )
            .with_series(Series::from_xy(ROP, SeriesStyle::Markers, rop, depth)),
        )),
        Err(e) => section.notice(e),
    }
    section
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::kpi::WELL_ID;
    use crate::data::las::DEPTH;
    use crate::data::model::{Column, Dataset};
    use crate::view::Severity;

    fn dataset(kind: DataKind, table: Table) -> Arc<Dataset> {
        Arc::new(Dataset {
            kind,
            source_name: "test".into(),
            table,
            well_header: Vec::new(),
        })
    }

    #[test]
    fn empty_session_shows_placeholders() {
        let view = build(&Session::default(), &DashboardConfig::default());
        assert!(view.kpis.iter().all(|k| !k.is_available()));
        for tab in &view.tabs {
            let notices: Vec<_> = tab.notices().collect();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].severity, Severity::Info);
        }
    }

    #[test]
    fn tabs_build_from_loaded_tables() {
        let mut session = Session::default();
        session.set_well_log(dataset(
            DataKind::WellLog,
            Table::new(vec![
                Column::numeric(DEPTH, vec![100.0, 101.0, 102.0]),
                Column::numeric(GAMMA_RAY, vec![40.0, 80.0, 120.0]),
            ])
            .unwrap(),
        ));
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap().and_hms_opt(0, 0, 0);
        session.set_production(dataset(
            DataKind::Production,
            Table::new(vec![
                Column::datetime(PRODUCTION_DATE, vec![day(1, 1), day(1, 1), day(2, 1)]),
                Column::text(
                    WELL_ID,
                    vec![Some("W1".into()), Some("W2".into()), Some("W1".into())],
                ),
                Column::numeric(OIL_PRODUCTION, vec![10.0, 20.0, 5.0]),
            ])
            .unwrap(),
        ));
        session.set_drilling(dataset(
            DataKind::Drilling,
            Table::new(vec![
                Column::numeric(DRILLING_DEPTH, vec![1000.0, 1010.0]),
                Column::numeric(ROP, vec![12.0, 14.0]),
            ])
            .unwrap(),
        ));

        let view = build(&session, &DashboardConfig::default());
        assert!(view.kpis.iter().all(Kpi::is_available));
        assert_eq!(view.kpis[3].display_value(), "2");

        let hist = view.tabs[0].charts().next().unwrap();
        assert_eq!(hist.series[0].points.iter().map(|p| p[1]).sum::<f64>(), 3.0);

        let monthly = view.tabs[1].charts().next().unwrap();
        let ys: Vec<f64> = monthly.series[0].points.iter().map(|p| p[1]).collect();
        assert_eq!(ys, vec![30.0, 5.0]);

        let scatter = view.tabs[2].charts().next().unwrap();
        assert!(scatter.y.inverted());
        assert_eq!(scatter.point_count(), 2);
    }

    #[test]
    fn production_without_date_reports_missing_column() {
        let mut session = Session::default();
        session.set_production(dataset(
            DataKind::Production,
            Table::new(vec![Column::numeric(OIL_PRODUCTION, vec![1.0, 2.0])]).unwrap(),
        ));
        let view = build(&session, &DashboardConfig::default());
        // The KPI still computes; only the date-based chart is blocked.
        assert!(view.kpis[1].is_available());
        let notice = view.tabs[1].notices().next().unwrap();
        assert_eq!(notice.severity, Severity::Warning);
        assert!(notice.message.contains("'Date'"));
    }
}
