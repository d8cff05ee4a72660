use std::collections::BTreeSet;

use crate::config::DashboardConfig;
use crate::data::filter::{filter_by_range, filter_by_values, value_range};
use crate::data::kpi::{DRILLING_DEPTH, FORMATION, drilling_kpi_columns};
use crate::data::loader::DRILLING_TIMESTAMP;
use crate::data::model::{CellValue, DataKind, Table};
use crate::data::resample::Aggregator;
use crate::data::stats::{aggregate_by, summarize};
use crate::error::DashboardError;
use crate::state::{DrillingColor, DrillingPlot, DrillingSelection, Session};

use super::{
    Axis, Block, ChartSpec, Notice, Section, Series, SeriesStyle, TableView, fmt_num,
    resolve_column, resolve_columns, time_x,
};

pub const TRACK_GROUP: &str = "drilling_tracks";

#[derive(Debug, Clone, Default)]
pub struct DrillingView {
    pub kpi_columns: Vec<String>,
    pub depth_bounds: Option<(f64, f64)>,
    pub depth_range: Option<(f64, f64)>,
    /// Distinct formations in order of appearance; empty without the column.
    pub formations: Vec<CellValue>,
    pub selected_formations: BTreeSet<CellValue>,
    pub has_timestamp: bool,
    pub depth_params: Vec<String>,
    /// Choices for the time plot: `Depth` followed by the KPI columns.
    pub time_options: Vec<String>,
    pub time_params: Vec<String>,
    pub cross_x: Option<String>,
    pub cross_y: Option<String>,
    pub color_by: DrillingColor,
    pub summary_kpi: Option<String>,
    pub sections: Vec<Section>,
}

pub fn build(
    session: &Session,
    selection: &DrillingSelection,
    config: &DashboardConfig,
) -> DrillingView {
    let Some(table) = session.table(DataKind::Drilling) else {
        let mut section = Section::new("Drilling KPI Visualization");
        section.notice(Notice::info(
            "Please upload a CSV file or use sample data to begin analysis.",
        ));
        return DrillingView {
            sections: vec![section],
            ..DrillingView::default()
        };
    };

    let mut view = DrillingView::default();
    let mut preview = Section::new("Drilling Data");
    preview.push(Block::Table(TableView::preview(table, config.preview_rows)));
    view.sections.push(preview);

    view.kpi_columns = drilling_kpi_columns(table);
    view.depth_bounds = value_range(table, DRILLING_DEPTH);
    let Some((min, max)) = view.depth_bounds.filter(|_| !view.kpi_columns.is_empty()) else {
        let mut section = Section::new("Required Columns");
        section.notice(Notice::error(
            "The data does not have the required columns (Depth and KPI columns).",
        ));
        if table.numeric(DRILLING_DEPTH).is_none() {
            section.notice(DashboardError::missing_column(DRILLING_DEPTH, "drilling"));
        }
        view.sections.push(section);
        return view;
    };

    let range = match selection.depth_range {
        Some((lo, hi)) if lo <= hi => (lo.max(min), hi.min(max)),
        _ => (min, max),
    };
    view.depth_range = Some(range);
    let mut filtered = match filter_by_range(table, DRILLING_DEPTH, range.0, range.1) {
        Ok(t) => t,
        Err(e) => {
            let mut section = Section::new("Drilling Plots");
            section.notice(e);
            view.sections.push(section);
            return view;
        }
    };

    if table.has_column(FORMATION) {
        view.formations = table.distinct_in_order(FORMATION);
        if let Some(chosen) = &selection.formations {
            view.selected_formations = view
                .formations
                .iter()
                .filter(|f| chosen.contains(*f))
                .cloned()
                .collect();
        }
        // An empty choice leaves the formation filter off.
        if !view.selected_formations.is_empty() {
            filtered = filter_by_values(&filtered, FORMATION, &view.selected_formations);
        }
    }

    let kpis = view.kpi_columns.clone();
    view.has_timestamp = table.datetime(DRILLING_TIMESTAMP).is_some();
    let default_params = &kpis[..kpis.len().min(3)];
    view.depth_params = resolve_columns(selection.depth_params.as_deref(), &kpis, default_params);
    view.time_options = std::iter::once(DRILLING_DEPTH.to_string())
        .chain(kpis.iter().cloned())
        .collect();
    view.time_params = resolve_columns(
        selection.time_params.as_deref(),
        &view.time_options,
        &view.time_options[..2.min(view.time_options.len())],
    );
    view.cross_x = resolve_column(selection.cross_x.as_deref(), &kpis, 0);
    view.cross_y = resolve_column(selection.cross_y.as_deref(), &kpis, 1);
    view.color_by = match selection.color_by {
        DrillingColor::Formation if view.formations.is_empty() => DrillingColor::Depth,
        other => other,
    };
    view.summary_kpi = resolve_column(selection.summary_kpi.as_deref(), &kpis, 0);

    let plot = match selection.plot {
        DrillingPlot::DepthBased => depth_based(&filtered, &view.depth_params),
        DrillingPlot::TimeBased => time_based(&filtered, &view.time_params),
        DrillingPlot::Crossplot => crossplot(&filtered, &view),
        DrillingPlot::KpiSummary => kpi_summary(&filtered, &view),
    };
    view.sections.extend(plot);
    view
}

fn depth_based(table: &Table, params: &[String]) -> Vec<Section> {
    let mut section = Section::new("Depth-Based Drilling Parameters");
    if params.is_empty() {
        section.notice(Notice::info("Select at least one parameter."));
        return vec![section];
    }
    let tracks: Result<Vec<ChartSpec>, DashboardError> = params
        .iter()
        .map(|param| -> Result<ChartSpec, DashboardError> {
            let depth = table.require_numeric(DRILLING_DEPTH, "drilling")?;
            let values = table.require_numeric(param, "drilling")?;
            Ok(ChartSpec::new(
                format!("drilling_track_{param}"),
                param.as_str(),
                Axis::linear(param.as_str()),
                Axis::depth("Depth (m)"),
            )
            .with_series(Series::from_xy(param.as_str(), SeriesStyle::Line, values, depth))
            .linked(TRACK_GROUP))
        })
        .collect();
    match tracks {
        Ok(tracks) => section.push(Block::Tracks(tracks)),
        Err(e) => section.notice(e),
    }
    vec![section]
}

fn time_based(table: &Table, params: &[String]) -> Vec<Section> {
    let mut section = Section::new("Time-Based Drilling Parameters");
    let Some(times) = table.datetime(DRILLING_TIMESTAMP) else {
        section.notice(Notice::warning(
            "Time-based visualization requires a 'Timestamp' column in the data.",
        ));
        section.notice(DashboardError::missing_column(DRILLING_TIMESTAMP, "drilling"));
        return vec![section];
    };
    if params.is_empty() {
        section.notice(Notice::info("Select at least one parameter."));
        return vec![section];
    }
    let x: Vec<f64> = times.iter().map(|t| t.as_ref().map_or(f64::NAN, time_x)).collect();
    let mut chart = ChartSpec::new(
        "drilling_time",
        "Time-Based Drilling Parameters",
        Axis::time("Time"),
        Axis::linear("Parameter Value"),
    );
    for param in params {
        match table.require_numeric(param, "drilling") {
            Ok(values) => {
                chart = chart.with_series(Series::from_xy(
                    param.as_str(),
                    SeriesStyle::Line,
                    &x,
                    values,
                ));
            }
            Err(e) => section.notice(e),
        }
    }
    section.push(Block::Chart(chart));
    vec![section]
}

fn crossplot(table: &Table, view: &DrillingView) -> Vec<Section> {
    let mut section = Section::new("Parameter Crossplot");
    let (Some(x), Some(y)) = (view.cross_x.as_deref(), view.cross_y.as_deref()) else {
        section.notice(Notice::warning("A crossplot needs at least one KPI column."));
        return vec![section];
    };
    let columns = table
        .require_numeric(x, "drilling")
        .and_then(|xs| Ok((xs, table.require_numeric(y, "drilling")?)));
    let (xs, ys) = match columns {
        Ok(c) => c,
        Err(e) => {
            section.notice(e);
            return vec![section];
        }
    };
    let title = format!("{y} vs {x} Relationship");
    let mut chart =
        ChartSpec::new("drilling_crossplot", title.as_str(), Axis::linear(x), Axis::linear(y));
    match view.color_by {
        DrillingColor::None => {
            chart =
                chart.with_series(Series::from_xy(title.as_str(), SeriesStyle::Markers, xs, ys));
        }
        DrillingColor::Depth => match table.require_numeric(DRILLING_DEPTH, "drilling") {
            Ok(depth) => {
                let series =
                    Series::colored_markers(title.as_str(), xs, ys, DRILLING_DEPTH, depth);
                chart = chart.with_series(series);
            }
            Err(e) => section.notice(e),
        },
        DrillingColor::Formation => {
            if let Some(formation) = table.column(FORMATION) {
                for value in table.distinct_in_order(FORMATION) {
                    let rows: Vec<usize> = (0..table.n_rows())
                        .filter(|&r| formation.value(r) == value)
                        .collect();
                    let fx: Vec<f64> = rows.iter().map(|&r| xs[r]).collect();
                    let fy: Vec<f64> = rows.iter().map(|&r| ys[r]).collect();
                    let series =
                        Series::from_xy(value.to_string(), SeriesStyle::Markers, &fx, &fy);
                    chart = chart.with_series(series);
                }
            }
        }
    }
    section.push(Block::Chart(chart));
    vec![section]
}

fn kpi_summary(table: &Table, view: &DrillingView) -> Vec<Section> {
    let mut summary = Section::new("Drilling KPI Summary");
    let rows = view
        .kpi_columns
        .iter()
        .filter_map(|name| table.numeric(name).map(|v| summarize(name, v)))
        .map(|s| {
            vec![
                s.name.clone(),
                fmt_num(s.mean),
                fmt_num(s.std),
                fmt_num(s.min),
                fmt_num(s.max),
            ]
        })
        .collect();
    summary.push(Block::Table(TableView {
        columns: ["", "mean", "std", "min", "max"].map(String::from).to_vec(),
        rows,
    }));
    let mut sections = vec![summary];

    if view.formations.is_empty() {
        return sections;
    }
    let Some(kpi) = view.summary_kpi.as_deref() else {
        return sections;
    };
    let mut by_formation = Section::new("KPIs by Formation");
    match aggregate_by(table, FORMATION, kpi, Aggregator::Mean) {
        Ok(groups) => {
            let categories: Vec<String> = groups.iter().map(|(f, _)| f.to_string()).collect();
            let mut chart = ChartSpec::new(
                "drilling_by_formation",
                format!("Average {kpi} by Formation"),
                Axis::categories(FORMATION, categories),
                Axis::linear(kpi),
            );
            // One series per formation so each bar gets its own colour.
            for (i, (formation, mean)) in groups.iter().enumerate() {
                chart = chart.with_series(Series::new(
                    formation.to_string(),
                    SeriesStyle::Bars { width: 0.6 },
                    vec![[i as f64, *mean]],
                ));
            }
            by_formation.push(Block::Chart(chart));
        }
        Err(e) => by_formation.notice(e),
    }
    sections.push(by_formation);
    sections
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::data::kpi::{FORMATION_HARDNESS, ROP};
    use crate::data::model::{Column, Dataset};
    use crate::view::{SeriesColor, Severity, all_notices};

    fn drilling_table(with_time: bool) -> Table {
        let n = 12;
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(6, 0, 0).unwrap();
        let mut columns = vec![
            Column::numeric(DRILLING_DEPTH, (0..n).map(|i| 1000.0 + 10.0 * i as f64).collect()),
            Column::numeric(ROP, (0..n).map(|i| 10.0 + i as f64).collect()),
            Column::numeric("WOB", (0..n).map(|i| 20.0 - 0.5 * i as f64).collect()),
            Column::numeric("RPM", vec![120.0; n]),
            Column::numeric("Torque", (0..n).map(|i| 5.0 + 0.1 * i as f64).collect()),
            Column::numeric(FORMATION_HARDNESS, vec![3.0; n]),
            Column::text(
                FORMATION,
                (0..n)
                    .map(|i| Some(if i < 6 { "Sandstone" } else { "Shale" }.to_string()))
                    .collect(),
            ),
        ];
        if with_time {
            columns.push(Column::datetime(
                DRILLING_TIMESTAMP,
                (0..n).map(|i| Some(start + Duration::minutes(15 * i as i64))).collect(),
            ));
        }
        Table::new(columns).unwrap()
    }

    fn session_with(table: Table) -> Session {
        let mut session = Session::default();
        session.set_drilling(Arc::new(Dataset {
            kind: DataKind::Drilling,
            source_name: "d.csv".into(),
            table,
            well_header: Vec::new(),
        }));
        session
    }

    fn build_with(selection: &DrillingSelection, with_time: bool) -> DrillingView {
        build(&session_with(drilling_table(with_time)), selection, &DashboardConfig::default())
    }

    #[test]
    fn depth_based_tracks_default_to_first_three_kpis() {
        let view = build_with(&DrillingSelection::default(), true);
        assert_eq!(view.kpi_columns, vec![ROP, "WOB", "RPM", "Torque"]);
        assert_eq!(view.depth_params, vec![ROP, "WOB", "RPM"]);
        let tracks: Vec<_> = view.sections.last().unwrap().charts().collect();
        assert_eq!(tracks.len(), 3);
        assert!(tracks.iter().all(|t| t.y.inverted() && t.point_count() == 12));
    }

    #[test]
    fn depth_range_and_formation_filters_combine() {
        let selection = DrillingSelection {
            depth_range: Some((1020.0, 1090.0)),
            formations: Some([CellValue::Text("Shale".into())].into_iter().collect()),
            ..DrillingSelection::default()
        };
        let view = build_with(&selection, true);
        // Depths 1060..=1090 are Shale rows inside the window.
        let track = view.sections.last().unwrap().charts().next().unwrap();
        assert_eq!(track.point_count(), 4);
    }

    #[test]
    fn empty_formation_choice_is_no_filter() {
        let selection = DrillingSelection {
            formations: Some(BTreeSet::new()),
            ..DrillingSelection::default()
        };
        let view = build_with(&selection, true);
        assert_eq!(view.sections.last().unwrap().charts().next().unwrap().point_count(), 12);
    }

    #[test]
    fn time_plot_needs_timestamp() {
        let selection = DrillingSelection {
            plot: DrillingPlot::TimeBased,
            ..DrillingSelection::default()
        };
        let with = build_with(&selection, true);
        assert_eq!(with.time_params, vec![DRILLING_DEPTH, ROP]);
        let chart = with.sections.last().unwrap().charts().next().unwrap();
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.x.kind, crate::view::AxisKind::Time);

        let without = build_with(&selection, false);
        let notices: Vec<_> = without.sections.last().unwrap().notices().collect();
        assert_eq!(notices[0].severity, Severity::Warning);
        assert!(notices.iter().any(|n| n.message.contains("'Timestamp'")));
    }

    #[test]
    fn crossplot_colouring() {
        let mut selection = DrillingSelection {
            plot: DrillingPlot::Crossplot,
            ..DrillingSelection::default()
        };
        let view = build_with(&selection, true);
        let chart = view.sections.last().unwrap().charts().next().unwrap();
        assert!(matches!(chart.series[0].color, SeriesColor::Scale { .. }));

        selection.color_by = DrillingColor::Formation;
        let view = build_with(&selection, true);
        let chart = view.sections.last().unwrap().charts().next().unwrap();
        let names: Vec<_> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sandstone", "Shale"]);
    }

    #[test]
    fn kpi_summary_with_formation_means() {
        let selection = DrillingSelection {
            plot: DrillingPlot::KpiSummary,
            ..DrillingSelection::default()
        };
        let view = build_with(&selection, true);
        assert!(all_notices(&view.sections).is_empty());
        let summary = view.sections.iter().find(|s| s.title == "Drilling KPI Summary").unwrap();
        match &summary.blocks[0] {
            Block::Table(t) => {
                assert_eq!(t.rows.len(), 4);
                assert_eq!(t.rows[0][0], ROP);
            }
            other => panic!("unexpected {other:?}"),
        }
        let bars = view.sections.last().unwrap().charts().next().unwrap();
        assert_eq!(bars.x.categories, vec!["Sandstone", "Shale"]);
        // ROP 10..=15 for Sandstone, 16..=21 for Shale.
        assert_eq!(bars.series[0].points[0][1], 12.5);
        assert_eq!(bars.series[1].points[0][1], 18.5);
    }

    #[test]
    fn missing_depth_is_reported() {
        let table = Table::new(vec![Column::numeric(ROP, vec![1.0])]).unwrap();
        let view = build(
            &session_with(table),
            &DrillingSelection::default(),
            &DashboardConfig::default(),
        );
        let notices = all_notices(&view.sections);
        assert_eq!(notices[0].severity, Severity::Error);
        assert!(notices[1].message.contains("'Depth'"));
    }
}
