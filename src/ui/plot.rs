use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, Points};

use crate::color::{ColorMap, ContinuousScale, categorical, diverging};
use crate::data::stats::CorrelationMatrix;
use crate::view::{
    AxisKind, Block, ChartSpec, Notice, Section, Series, SeriesColor, SeriesStyle, Severity,
    TableView, time_from_x,
};

const CHART_HEIGHT: f32 = 320.0;
/// Colour bins used to approximate a continuous marker colour scale.
const SCALE_STEPS: usize = 12;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Render a section heading followed by its blocks.
pub fn section(ui: &mut Ui, section: &Section, colors: Option<&ColorMap>) {
    ui.heading(&section.title);
    for (i, block) in section.blocks.iter().enumerate() {
        ui.push_id((&section.title, i), |ui: &mut Ui| {
            block_ui(ui, block, colors);
        });
    }
    ui.add_space(8.0);
}

pub fn block_ui(ui: &mut Ui, block: &Block, colors: Option<&ColorMap>) {
    match block {
        Block::Notice(n) => notice(ui, n),
        Block::Table(t) => table(ui, t),
        Block::Chart(c) => chart(ui, c, CHART_HEIGHT, colors),
        Block::Tracks(tracks) => {
            ui.columns(tracks.len().max(1), |columns: &mut [Ui]| {
                for (col, spec) in columns.iter_mut().zip(tracks) {
                    col.label(RichText::new(&spec.title).strong());
                    chart(col, spec, CHART_HEIGHT * 1.5, colors);
                }
            });
        }
        Block::Heatmap(m) => heatmap(ui, m),
        Block::Metrics(items) => {
            egui::Grid::new("metrics").num_columns(2).show(ui, |ui: &mut Ui| {
                for (label, value) in items {
                    ui.strong(label);
                    ui.label(value);
                    ui.end_row();
                }
            });
        }
    }
}

pub fn notice(ui: &mut Ui, notice: &Notice) {
    let color = match notice.severity {
        Severity::Info => Color32::LIGHT_BLUE,
        Severity::Warning => Color32::from_rgb(230, 160, 20),
        Severity::Error => Color32::RED,
    };
    ui.label(RichText::new(&notice.message).color(color));
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub fn table(ui: &mut Ui, view: &TableView) {
    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .columns(Column::auto().at_least(60.0), view.columns.len())
            .header(20.0, |mut header| {
                for name in &view.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|mut body| {
                for row in &view.rows {
                    body.row(18.0, |mut cells| {
                        for cell in row {
                            cells.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
    });
}

/// Correlation matrix as a grid of coloured cells.
pub fn heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    egui::Grid::new("correlation").spacing([2.0, 2.0]).show(ui, |ui: &mut Ui| {
        ui.label("");
        for name in &matrix.columns {
            ui.strong(name);
        }
        ui.end_row();
        for (name, row) in matrix.columns.iter().zip(&matrix.values) {
            ui.strong(name);
            for &r in row {
                let text = if r.is_nan() { "NaN".to_string() } else { format!("{r:.2}") };
                let fg = if r.abs() > 0.6 { Color32::WHITE } else { Color32::BLACK };
                ui.label(RichText::new(text).monospace().color(fg).background_color(diverging(r)));
            }
            ui.end_row();
        }
    });
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Depth axes are drawn by negating y, so depth grows downward.
fn screen_y(spec: &ChartSpec, y: f64) -> f64 {
    if spec.y.inverted() {
        -y
    } else {
        y
    }
}

fn axis_text(kind: AxisKind, categories: &[String], value: f64) -> String {
    match kind {
        AxisKind::Linear => format!("{value}"),
        AxisKind::Depth => format!("{}", value.abs()),
        AxisKind::Time => time_from_x(value)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        AxisKind::Category => {
            if value.fract() == 0.0 && value >= 0.0 {
                categories.get(value as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        }
    }
}

pub fn chart(ui: &mut Ui, spec: &ChartSpec, height: f32, colors: Option<&ColorMap>) {
    // Linked tracks get their titles from the track header.
    if spec.link_group.is_none() {
        ui.label(RichText::new(&spec.title).strong());
    }
    let (x_kind, x_categories) = (spec.x.kind, spec.x.categories.clone());
    let (y_kind, y_categories) = (spec.y.kind, spec.y.categories.clone());
    let (x_label, y_label) = (spec.x.label.clone(), spec.y.label.clone());

    let mut plot = Plot::new(&spec.id)
        .height(height)
        .legend(Legend::default())
        .x_axis_label(spec.x.label.as_str())
        .y_axis_label(spec.y.label.as_str())
        .x_axis_formatter(move |mark: GridMark, _range| {
            axis_text(x_kind, &x_categories, mark.value)
        })
        .y_axis_formatter(move |mark: GridMark, _range| {
            axis_text(y_kind, &y_categories, mark.value)
        })
        .label_formatter(move |name: &str, point: &PlotPoint| {
            let x = axis_text(x_kind, &[], point.x);
            let y = if y_kind == AxisKind::Depth { -point.y } else { point.y };
            let head = if name.is_empty() { String::new() } else { format!("{name}\n") };
            format!("{head}{x_label}: {x}\n{y_label}: {y:.2}")
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if let Some(group) = &spec.link_group {
        plot = plot.link_axis(egui::Id::new(group), [false, true]);
    }

    let n = spec.series.len();
    plot.show(ui, |plot_ui| {
        for (i, series) in spec.series.iter().enumerate() {
            let base = colors
                .filter(|_| n > 1)
                .map(|cm| cm.color_for(&crate::data::model::CellValue::Text(series.name.clone())))
                .filter(|c| *c != Color32::GRAY)
                .unwrap_or_else(|| categorical(i, n.max(1)));
            let points = |pts: &[[f64; 2]]| -> PlotPoints<'static> {
                pts.iter().map(|p| [p[0], screen_y(spec, p[1])]).collect()
            };
            match (&series.style, &series.color) {
                (SeriesStyle::Markers, SeriesColor::Scale { label, values }) => {
                    for layer in scale_layers(series, values) {
                        let mut markers = Points::new(points(&layer.1)).color(layer.0).radius(2.5);
                        if layer.2 {
                            markers = markers.name(format!("{} (colour: {label})", series.name));
                        }
                        plot_ui.points(markers);
                    }
                }
                (SeriesStyle::Markers, SeriesColor::Auto) => {
                    plot_ui.points(
                        Points::new(points(&series.points))
                            .name(&series.name)
                            .color(base)
                            .radius(2.5),
                    );
                }
                (SeriesStyle::Line, _) => {
                    plot_ui.line(
                        Line::new(points(&series.points))
                            .name(&series.name)
                            .color(base)
                            .width(1.5),
                    );
                }
                (SeriesStyle::Bars { width }, _) => {
                    let bars = series
                        .points
                        .iter()
                        .map(|p| Bar::new(p[0], screen_y(spec, p[1])).width(*width))
                        .collect();
                    plot_ui.bar_chart(BarChart::new(bars).name(&series.name).color(base));
                }
            }
        }
    });
}

/// Split coloured markers into a few same-colour layers. The bool marks the
/// layer that carries the legend entry.
fn scale_layers(series: &Series, values: &[f64]) -> Vec<(Color32, Vec<[f64; 2]>, bool)> {
    let Some(scale) = ContinuousScale::fit(values) else {
        return vec![(Color32::GRAY, series.points.clone(), true)];
    };
    let span = (scale.max - scale.min).max(f64::EPSILON);
    let mut layers: Vec<Vec<[f64; 2]>> = vec![Vec::new(); SCALE_STEPS + 1];
    for (p, v) in series.points.iter().zip(values) {
        let slot = if v.is_finite() {
            let step = ((v - scale.min) / span * (SCALE_STEPS - 1) as f64).round() as usize;
            step.min(SCALE_STEPS - 1)
        } else {
            SCALE_STEPS
        };
        layers[slot].push(*p);
    }
    let mut out: Vec<(Color32, Vec<[f64; 2]>, bool)> = layers
        .into_iter()
        .enumerate()
        .filter(|(_, pts)| !pts.is_empty())
        .map(|(slot, pts)| {
            let color = if slot == SCALE_STEPS {
                Color32::GRAY
            } else {
                scale.color_for(scale.min + span * slot as f64 / (SCALE_STEPS - 1) as f64)
            };
            (color, pts, false)
        })
        .collect();
    if let Some(first) = out.first_mut() {
        first.2 = true;
    }
    out
}
