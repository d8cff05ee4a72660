//! View models: everything a page shows, computed without touching egui.
//!
//! Each page module exposes `build(..) -> XxxView`, a pure function of the
//! session snapshot and the page's selection. Errors never escape a build;
//! they become [`Notice`]s in the section they blocked and the other
//! sections are still produced.

use chrono::{DateTime, NaiveDateTime};

use crate::data::model::Table;
use crate::data::stats::{ColumnSummary, CorrelationMatrix};
use crate::error::DashboardError;

pub mod drilling;
pub mod overview;
pub mod production;
pub mod well_log;

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A user-visible message replacing (part of) a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl From<&DashboardError> for Notice {
    fn from(err: &DashboardError) -> Self {
        match err {
            DashboardError::Load { .. } | DashboardError::Config(..) => {
                Notice::error(err.to_string())
            }
            DashboardError::InsufficientData { .. } | DashboardError::MissingColumn { .. } => {
                Notice::warning(err.to_string())
            }
        }
    }
}

impl From<DashboardError> for Notice {
    fn from(err: DashboardError) -> Self {
        Notice::from(&err)
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Linear,
    /// Depth: larger values are drawn lower on the screen.
    Depth,
    /// Seconds since the Unix epoch, shown as dates.
    Time,
    /// Integer positions into [`Axis::categories`].
    Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub label: String,
    pub kind: AxisKind,
    pub categories: Vec<String>,
}

impl Axis {
    pub fn linear(label: impl Into<String>) -> Self {
        Self::new(label, AxisKind::Linear)
    }

    pub fn depth(label: impl Into<String>) -> Self {
        Self::new(label, AxisKind::Depth)
    }

    pub fn time(label: impl Into<String>) -> Self {
        Self::new(label, AxisKind::Time)
    }

    pub fn categories(label: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            categories,
            ..Self::new(label, AxisKind::Category)
        }
    }

    fn new(label: impl Into<String>, kind: AxisKind) -> Self {
        Self {
            label: label.into(),
            kind,
            categories: Vec::new(),
        }
    }

    /// Whether the axis runs against numeric order on screen.
    pub fn inverted(&self) -> bool {
        self.kind == AxisKind::Depth
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesStyle {
    Line,
    Markers,
    /// Bars centred on x with the given width.
    Bars { width: f64 },
}

/// How a series is coloured.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesColor {
    /// Picked by the renderer from the categorical palette by series index.
    Auto,
    /// One value per point, mapped through a sequential colour scale.
    Scale { label: String, values: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub style: SeriesStyle,
    /// `[x, y]` in data units; NaN points are already dropped.
    pub points: Vec<[f64; 2]>,
    pub color: SeriesColor,
}

impl Series {
    pub fn new(name: impl Into<String>, style: SeriesStyle, points: Vec<[f64; 2]>) -> Self {
        Self {
            name: name.into(),
            style,
            points,
            color: SeriesColor::Auto,
        }
    }

    /// Pairs `x[i], y[i]`, skipping rows where either is missing.
    pub fn from_xy(name: impl Into<String>, style: SeriesStyle, x: &[f64], y: &[f64]) -> Self {
        let points = x
            .iter()
            .zip(y)
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(a, b)| [*a, *b])
            .collect();
        Self::new(name, style, points)
    }

    /// Markers coloured by a third column. Points keep their colour value
    /// even when it is missing (NaN); the renderer greys those out.
    pub fn colored_markers(
        name: impl Into<String>,
        x: &[f64],
        y: &[f64],
        color_label: impl Into<String>,
        color: &[f64],
    ) -> Self {
        let (points, values): (Vec<[f64; 2]>, Vec<f64>) = x
            .iter()
            .zip(y)
            .zip(color)
            .filter(|((a, b), _)| a.is_finite() && b.is_finite())
            .map(|((a, b), c)| ([*a, *b], *c))
            .unzip();
        Self {
            color: SeriesColor::Scale {
                label: color_label.into(),
                values,
            },
            ..Self::new(name, SeriesStyle::Markers, points)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// Stable id for the renderer's plot memory.
    pub id: String,
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
    /// Charts sharing a group keep their y axes in step.
    pub link_group: Option<String>,
}

impl ChartSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            x,
            y,
            series: Vec::new(),
            link_group: None,
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn linked(mut self, group: impl Into<String>) -> Self {
        self.link_group = Some(group.into());
        self
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Epoch seconds for a time axis.
pub fn time_x(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp() as f64
}

/// Inverse of [`time_x`], for axis labels.
pub fn time_from_x(x: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(x.round() as i64, 0).map(|dt| dt.naive_utc())
}

// ---------------------------------------------------------------------------
// Tables and sections
// ---------------------------------------------------------------------------

/// Already-formatted cells for a tabular preview.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// The first `n` rows of a table.
    pub fn preview(table: &Table, n: usize) -> Self {
        let head = table.head(n);
        let rows = (0..head.n_rows())
            .map(|r| head.columns().iter().map(|c| c.value(r).to_string()).collect())
            .collect();
        Self {
            columns: head.column_names(),
            rows,
        }
    }

    /// One row per statistic, one column per summarized column.
    pub fn describe(summaries: &[ColumnSummary]) -> Self {
        let mut columns = vec![String::new()];
        columns.extend(summaries.iter().map(|s| s.name.clone()));
        let stat = |label: &str, f: &dyn Fn(&ColumnSummary) -> String| {
            let mut row = vec![label.to_string()];
            row.extend(summaries.iter().map(f));
            row
        };
        let rows = vec![
            stat("count", &|s| s.count.to_string()),
            stat("mean", &|s| fmt_num(s.mean)),
            stat("std", &|s| fmt_num(s.std)),
            stat("min", &|s| fmt_num(s.min)),
            stat("25%", &|s| fmt_num(s.q25)),
            stat("50%", &|s| fmt_num(s.median)),
            stat("75%", &|s| fmt_num(s.q75)),
            stat("max", &|s| fmt_num(s.max)),
        ];
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Number formatting shared by tables and metric lines.
pub fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.4}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Notice(Notice),
    Table(TableView),
    Chart(ChartSpec),
    /// Side-by-side tracks sharing a depth axis.
    Tracks(Vec<ChartSpec>),
    Heatmap(CorrelationMatrix),
    /// `label: value` lines.
    Metrics(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn notice(&mut self, notice: impl Into<Notice>) {
        self.blocks.push(Block::Notice(notice.into()));
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Notice(n) => Some(n),
            _ => None,
        })
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartSpec> {
        self.blocks.iter().flat_map(|b| match b {
            Block::Chart(c) => std::slice::from_ref(c),
            Block::Tracks(t) => t.as_slice(),
            _ => &[][..],
        })
    }
}

/// Every notice on a page, in section order.
pub fn all_notices(sections: &[Section]) -> Vec<&Notice> {
    sections.iter().flat_map(Section::notices).collect()
}

/// `choice` when it still names an available column, otherwise the
/// `fallback`-th available column. Stale selections fall back silently.
pub fn resolve_column(
    choice: Option<&str>,
    available: &[String],
    fallback: usize,
) -> Option<String> {
    match choice {
        Some(c) if available.iter().any(|a| a == c) => Some(c.to_string()),
        _ => available
            .get(fallback.min(available.len().saturating_sub(1)))
            .cloned(),
    }
}

/// The still-available entries of `choice`, or `default` when unset.
pub fn resolve_columns(
    choice: Option<&[String]>,
    available: &[String],
    default: &[String],
) -> Vec<String> {
    match choice {
        Some(c) => c.iter().filter(|name| available.contains(name)).cloned().collect(),
        None => default.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    #[test]
    fn stale_choices_fall_back() {
        let cols = vec!["GR".to_string(), "RHOB".to_string()];
        assert_eq!(resolve_column(Some("RHOB"), &cols, 0).as_deref(), Some("RHOB"));
        assert_eq!(resolve_column(Some("NPHI"), &cols, 1).as_deref(), Some("RHOB"));
        assert_eq!(resolve_column(None, &cols, 5).as_deref(), Some("RHOB"));
        assert_eq!(resolve_column(None, &[], 0), None);

        let multi = vec!["NPHI".to_string(), "GR".to_string()];
        assert_eq!(resolve_columns(Some(&multi), &cols, &[]), vec!["GR"]);
        assert_eq!(resolve_columns(None, &cols, &cols[..1]), vec!["GR"]);
    }

    #[test]
    fn series_drops_missing_points() {
        let xs = [1.0, f64::NAN, 3.0];
        let s = Series::from_xy("GR", SeriesStyle::Line, &xs, &[10.0, 20.0, f64::NAN]);
        assert_eq!(s.points, vec![[1.0, 10.0]]);
    }

    #[test]
    fn preview_formats_cells() {
        let t = Table::new(vec![
            Column::numeric("DEPTH", vec![100.0, 100.5, 101.0]),
            Column::text("Well_ID", vec![Some("W1".into()), None, Some("W2".into())]),
        ])
        .unwrap();
        let view = TableView::preview(&t, 2);
        assert_eq!(view.columns, vec!["DEPTH", "Well_ID"]);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0][0], "100");
        assert_eq!(view.rows[1][0], "100.5000");
        assert_eq!(view.rows[1][1], "<null>");
    }

    #[test]
    fn time_axis_round_trips() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(time_from_x(time_x(&dt)), Some(dt));
    }

    #[test]
    fn depth_axes_are_inverted() {
        assert!(Axis::depth("Depth (m)").inverted());
        assert!(!Axis::time("Date").inverted());
    }
}
