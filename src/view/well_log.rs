use crate::config::DashboardConfig;
use crate::data::filter::{filter_by_range, value_range};
use crate::data::kpi::well_log_curves;
use crate::data::las::DEPTH;
use crate::data::model::{DataKind, Dataset, Table};
use crate::data::stats::{correlation_matrix, describe};
use crate::error::DashboardError;
use crate::state::{Session, WellLogSelection};

use super::{
    Axis, Block, ChartSpec, Notice, Section, Series, SeriesStyle, TableView, resolve_column,
    resolve_columns,
};

/// Link group of the multi-curve tracks.
pub const TRACK_GROUP: &str = "well_log_tracks";

/// Sections that need the depth-windowed table.
const PLOT_SECTIONS: [&str; 4] = [
    "Single Curve Plot",
    "Multi-Curve Plot",
    "Crossplot",
    "Correlation Matrix",
];

/// Everything the well-log page shows, plus the resolved choices its
/// widgets start from.
#[derive(Debug, Clone, Default)]
pub struct WellLogView {
    pub curves: Vec<String>,
    /// Full logged interval, for the depth slider.
    pub depth_bounds: Option<(f64, f64)>,
    /// Interval actually shown.
    pub depth_range: Option<(f64, f64)>,
    pub curve: Option<String>,
    pub tracks: Vec<String>,
    pub cross_x: Option<String>,
    pub cross_y: Option<String>,
    pub color_by: Option<String>,
    pub sections: Vec<Section>,
}

pub fn build(
    session: &Session,
    selection: &WellLogSelection,
    config: &DashboardConfig,
) -> WellLogView {
    let Some(dataset) = session.dataset(DataKind::WellLog) else {
        let mut section = Section::new("Well Log Analysis");
        section.notice(Notice::info(
            "Please upload a LAS file or use sample data to begin analysis.",
        ));
        return WellLogView {
            sections: vec![section],
            ..WellLogView::default()
        };
    };
    let table = &dataset.table;

    let curves = well_log_curves(table);
    let depth_bounds = value_range(table, DEPTH);
    let depth_range = clamp_range(session.depth_range, depth_bounds);
    let mut view = WellLogView {
        curve: resolve_column(selection.curve.as_deref(), &curves, 0),
        tracks: resolve_columns(
            selection.tracks.as_deref(),
            &curves,
            &curves[..curves.len().min(1)],
        ),
        cross_x: resolve_column(selection.cross_x.as_deref(), &curves, 0),
        cross_y: resolve_column(selection.cross_y.as_deref(), &curves, 1),
        color_by: selection
            .color_by
            .as_ref()
            .filter(|c| curves.contains(c))
            .cloned(),
        curves,
        depth_bounds,
        depth_range,
        sections: Vec::new(),
    };

    if let Some(header) = header_section(dataset) {
        view.sections.push(header);
    }

    let mut preview = Section::new("Well Log Data");
    preview.push(Block::Table(TableView::preview(table, config.preview_rows)));
    view.sections.push(preview);

    let mut stats = Section::new("Descriptive Statistics");
    stats.push(Block::Table(TableView::describe(&describe(table))));
    view.sections.push(stats);

    // Every remaining section works on the depth window.
    let windowed = match depth_range {
        Some((lo, hi)) => filter_by_range(table, DEPTH, lo, hi).map_err(Notice::from),
        None if table.numeric(DEPTH).is_some() => Err(Notice::warning(
            "The well log has no depth samples to plot.",
        )),
        None => Err(Notice::from(DashboardError::missing_column(DEPTH, "well log"))),
    };
    match windowed {
        Ok(windowed) => {
            view.sections.push(single_curve(&windowed, view.curve.as_deref()));
            view.sections.push(multi_curve(&windowed, &view.tracks));
            view.sections.push(crossplot(&windowed, &view));
            view.sections.push(correlation(&windowed));
        }
        Err(e) => {
            for title in PLOT_SECTIONS {
                let mut section = Section::new(title);
                section.notice(e.clone());
                view.sections.push(section);
            }
        }
    }
    view
}

/// The requested window clipped to the logged interval; the full interval
/// when nothing (or nothing overlapping) was requested.
fn clamp_range(requested: Option<(f64, f64)>, bounds: Option<(f64, f64)>) -> Option<(f64, f64)> {
    let (min, max) = bounds?;
    match requested {
        Some((lo, hi)) if lo <= hi && hi >= min && lo <= max => Some((lo.max(min), hi.min(max))),
        _ => Some((min, max)),
    }
}

fn header_section(dataset: &Dataset) -> Option<Section> {
    if dataset.well_header.is_empty() {
        return None;
    }
    let mut section = Section::new("Well Header Information");
    section.push(Block::Metrics(
        dataset
            .well_header
            .iter()
            .map(|item| {
                let value = format!("{} {}", item.value, item.unit);
                (item.mnemonic.clone(), value.trim().to_string())
            })
            .collect(),
    ));
    Some(section)
}

fn depth_track(id: String, table: &Table, curve: &str) -> Result<ChartSpec, DashboardError> {
    let depth = table.require_numeric(DEPTH, "well log")?;
    let values = table.require_numeric(curve, "well log")?;
    Ok(ChartSpec::new(id, curve, Axis::linear(curve), Axis::depth("DEPTH (m)"))
        .with_series(Series::from_xy(curve, SeriesStyle::Line, values, depth)))
}

fn single_curve(table: &Table, curve: Option<&str>) -> Section {
    let mut section = Section::new("Single Curve Plot");
    let Some(curve) = curve else {
        section.notice(Notice::warning("The well log has no curves besides DEPTH."));
        return section;
    };
    match depth_track("well_log_single".to_string(), table, curve) {
        Ok(chart) => section.push(Block::Chart(chart)),
        Err(e) => section.notice(e),
    }
    section
}

fn multi_curve(table: &Table, tracks: &[String]) -> Section {
    let mut section = Section::new("Multi-Curve Plot");
    if tracks.is_empty() {
        section.notice(Notice::info("Select at least one curve to draw tracks."));
        return section;
    }
    let charts: Result<Vec<ChartSpec>, DashboardError> = tracks
        .iter()
        .map(|curve| {
            depth_track(format!("well_log_track_{curve}"), table, curve)
                .map(|c| c.linked(TRACK_GROUP))
        })
        .collect();
    match charts {
        Ok(charts) => section.push(Block::Tracks(charts)),
        Err(e) => section.notice(e),
    }
    section
}

fn crossplot(table: &Table, view: &WellLogView) -> Section {
    let mut section = Section::new("Crossplot");
    let (Some(x), Some(y)) = (view.cross_x.as_deref(), view.cross_y.as_deref()) else {
        section.notice(Notice::warning("A crossplot needs at least one curve."));
        return section;
    };
    let columns = table
        .require_numeric(x, "well log")
        .and_then(|xs| Ok((xs, table.require_numeric(y, "well log")?)));
    let (xs, ys) = match columns {
        Ok(columns) => columns,
        Err(e) => {
            section.notice(e);
            return section;
        }
    };
    let name = format!("{y} vs {x}");
    let series = match view.color_by.as_deref().and_then(|c| table.numeric(c).map(|v| (c, v))) {
        Some((label, colors)) => Series::colored_markers(&name, xs, ys, label, colors),
        None => Series::from_xy(&name, SeriesStyle::Markers, xs, ys),
    };
    let title = match view.color_by.as_deref() {
        Some(c) => format!("{name} (colored by {c})"),
        None => name,
    };
    section.push(Block::Chart(
        ChartSpec::new("well_log_crossplot", title, Axis::linear(x), Axis::linear(y))
            .with_series(series),
    ));
    section
}

fn correlation(table: &Table) -> Section {
    let mut section = Section::new("Correlation Matrix");
    let matrix = correlation_matrix(table, &[DEPTH]);
    if matrix.columns.is_empty() {
        section.notice(Notice::warning("No numeric curves to correlate."));
    } else {
        section.push(Block::Heatmap(matrix));
    }
    section
}
