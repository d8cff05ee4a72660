use std::collections::BTreeSet;

use bytes::Bytes;
use eframe::egui::{self, RichText, Ui};

use crate::color::ColorMap;
use crate::data::loader::DataSource;
use crate::data::model::{CellValue, DataKind};
use crate::data::resample::Frequency;
use crate::state::{AppState, DrillingColor, DrillingPlot, Page, SourceChoice};
use crate::ui::plot;
use crate::view::drilling::DrillingView;
use crate::view::production::{MA_WINDOW_MAX, MA_WINDOW_MIN, ProductionView};
use crate::view::well_log::WellLogView;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Page navigation and a one-line summary of what is loaded.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong("Oil & Gas Data Dashboard");
        ui.separator();
        for page in Page::ALL {
            if ui.selectable_label(state.page == page, page.label()).clicked() {
                state.page = page;
            }
        }
        ui.separator();
        for kind in DataKind::ALL {
            let text = match state.session.dataset(kind) {
                Some(ds) => format!("{kind}: {} rows", ds.len()),
                None => format!("{kind}: none"),
            };
            ui.label(RichText::new(text).small());
        }
    });
}

// ---------------------------------------------------------------------------
// Data loading
// ---------------------------------------------------------------------------

fn source_choice(state: &mut AppState, kind: DataKind) -> &mut SourceChoice {
    match kind {
        DataKind::WellLog => &mut state.well_log.source,
        DataKind::Production => &mut state.production.source,
        DataKind::Drilling => &mut state.drilling.source,
    }
}

/// Sample-or-upload choice for one dataset. Returns whether a load happened.
pub fn source_picker(ui: &mut Ui, state: &mut AppState, kind: DataKind) -> bool {
    ui.heading("Data Loading");
    let mut choice = *source_choice(state, kind);
    let upload_label = match kind {
        DataKind::WellLog => "Upload LAS File",
        _ => "Upload CSV File",
    };
    let mut loaded = false;
    ui.radio_value(&mut choice, SourceChoice::Sample, "Use Sample Data");
    ui.radio_value(&mut choice, SourceChoice::Upload, upload_label);
    if choice != *source_choice(state, kind) {
        *source_choice(state, kind) = choice;
        if choice == SourceChoice::Sample {
            loaded = state.load_sample(kind);
        }
    }
    match choice {
        SourceChoice::Sample => {
            if ui.button("Reload sample").clicked() {
                loaded = state.load_sample(kind);
            }
        }
        SourceChoice::Upload => {
            if ui.button("Choose a file…").clicked() {
                loaded = open_file_dialog(state, kind);
            }
        }
    }
    if let Some(n) = state.load_notice(kind) {
        plot::notice(ui, n);
    }
    loaded
}

/// Pick a file and load it as an upload of `kind`.
pub fn open_file_dialog(state: &mut AppState, kind: DataKind) -> bool {
    let dialog = rfd::FileDialog::new().set_title(format!("Open {kind} data"));
    let dialog = match kind {
        DataKind::WellLog => dialog.add_filter("LAS", &["las", "LAS"]),
        _ => dialog
            .add_filter("Supported files", &["csv", "parquet", "pq"])
            .add_filter("CSV", &["csv"])
            .add_filter("Parquet", &["parquet", "pq"]),
    };
    let Some(path) = dialog.pick_file() else {
        return false;
    };
    let source = match std::fs::read(&path) {
        Ok(content) => DataSource::Upload {
            name: DataSource::Path(path.clone()).name(),
            bytes: Bytes::from(content),
        },
        // Let the loader report the read failure.
        Err(_) => DataSource::Path(path),
    };
    state.load_source(&source, kind)
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

/// Combo box over column names; returns the new choice when one is clicked.
fn column_combo(
    ui: &mut Ui,
    label: &str,
    options: &[String],
    current: Option<&str>,
) -> Option<String> {
    let mut picked = None;
    egui::ComboBox::from_label(label)
        .selected_text(current.unwrap_or("-"))
        .show_ui(ui, |ui: &mut Ui| {
            for name in options {
                if ui.selectable_label(current == Some(name.as_str()), name).clicked() {
                    picked = Some(name.clone());
                }
            }
        });
    picked
}

/// Checkbox per option; returns the full new selection when any changes.
fn column_checklist(ui: &mut Ui, options: &[String], selected: &[String]) -> Option<Vec<String>> {
    let mut changed = false;
    let mut next = Vec::new();
    for name in options {
        let mut on = selected.contains(name);
        changed |= ui.checkbox(&mut on, name.as_str()).changed();
        if on {
            next.push(name.clone());
        }
    }
    changed.then_some(next)
}

/// Checkbox per categorical value with All / None buttons.
fn value_checklist(
    ui: &mut Ui,
    values: &[CellValue],
    selected: &BTreeSet<CellValue>,
    colors: Option<&ColorMap>,
) -> Option<BTreeSet<CellValue>> {
    let mut next = selected.clone();
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            next = values.iter().cloned().collect();
            changed = true;
        }
        if ui.small_button("None").clicked() {
            next.clear();
            changed = true;
        }
    });
    for value in values {
        let mut on = next.contains(value);
        let mut text = RichText::new(value.to_string());
        if let Some(cm) = colors {
            text = text.color(cm.color_for(value));
        }
        if ui.checkbox(&mut on, text).changed() {
            changed = true;
            if on {
                next.insert(value.clone());
            } else {
                next.remove(value);
            }
        }
    }
    changed.then_some(next)
}

/// Two sliders bounding a depth window.
fn depth_slider(ui: &mut Ui, bounds: (f64, f64), current: (f64, f64)) -> Option<(f64, f64)> {
    let (min, max) = bounds;
    let (mut lo, mut hi) = current;
    let mut changed = ui
        .add(egui::Slider::new(&mut lo, min..=max).text("top"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut hi, min..=max).text("bottom"))
        .changed();
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    changed.then_some((lo, hi))
}

// ---------------------------------------------------------------------------
// Page controls
// ---------------------------------------------------------------------------

/// Returns whether any selection changed.
pub fn well_log_controls(ui: &mut Ui, state: &mut AppState, view: &WellLogView) -> bool {
    if view.curves.is_empty() {
        return false;
    }
    let mut changed = false;
    ui.heading("Plotting Options");

    if let (Some(bounds), Some(current)) = (view.depth_bounds, view.depth_range) {
        ui.label("Depth Range (m)");
        if let Some(range) = depth_slider(ui, bounds, current) {
            state.session.set_depth_range(Some(range));
            changed = true;
        }
    }

    ui.separator();
    if let Some(c) = column_combo(ui, "Single curve", &view.curves, view.curve.as_deref()) {
        state.well_log.curve = Some(c);
        changed = true;
    }

    ui.separator();
    ui.label("Multi-curve tracks");
    if let Some(tracks) = column_checklist(ui, &view.curves, &view.tracks) {
        state.well_log.tracks = Some(tracks);
        changed = true;
    }

    ui.separator();
    ui.label("Crossplot");
    if let Some(x) = column_combo(ui, "X-axis", &view.curves, view.cross_x.as_deref()) {
        state.well_log.cross_x = Some(x);
        changed = true;
    }
    if let Some(y) = column_combo(ui, "Y-axis", &view.curves, view.cross_y.as_deref()) {
        state.well_log.cross_y = Some(y);
        changed = true;
    }
    let mut color_options = vec!["None".to_string()];
    color_options.extend(view.curves.iter().cloned());
    let current = view.color_by.as_deref().unwrap_or("None");
    if let Some(c) = column_combo(ui, "Color by", &color_options, Some(current)) {
        state.well_log.color_by = (c != "None").then_some(c);
        changed = true;
    }
    changed
}

pub fn production_controls(
    ui: &mut Ui,
    state: &mut AppState,
    view: &ProductionView,
    colors: Option<&ColorMap>,
) -> bool {
    if view.production_columns.is_empty() {
        return false;
    }
    let mut changed = false;

    if !view.wells.is_empty() {
        ui.heading("Well Selection");
        if let Some(wells) = value_checklist(ui, &view.wells, &view.selected_wells, colors) {
            state.production.wells = Some(wells);
            changed = true;
        }
        ui.separator();
    }

    ui.heading("Analysis Options");
    egui::ComboBox::from_label("Resampling Frequency")
        .selected_text(state.production.frequency.label())
        .show_ui(ui, |ui: &mut Ui| {
            for f in Frequency::ALL {
                changed |= ui
                    .selectable_value(&mut state.production.frequency, f, f.label())
                    .changed();
            }
        });
    let current = view.column.as_deref();
    if let Some(c) = column_combo(ui, "Production column", &view.production_columns, current) {
        state.production.column = Some(c);
        changed = true;
    }
    let mut window = view.ma_window;
    if ui
        .add(
            egui::Slider::new(&mut window, MA_WINDOW_MIN..=MA_WINDOW_MAX)
                .text("Moving Average Window"),
        )
        .changed()
    {
        state.production.ma_window = window;
        changed = true;
    }

    ui.separator();
    changed |= ui
        .checkbox(&mut state.production.show_decline, "Show Decline Curve Analysis")
        .changed();
    if state.production.show_decline && !view.wells.is_empty() {
        let mut options = vec!["Total".to_string()];
        options.extend(view.selected_wells.iter().map(|w| w.to_string()));
        let current = view.decline_well.as_deref().unwrap_or("Total");
        if let Some(w) = column_combo(ui, "Decline well", &options, Some(current)) {
            state.session.set_selected_well((w != "Total").then_some(w));
            changed = true;
        }
    }
    changed
}

pub fn drilling_controls(ui: &mut Ui, state: &mut AppState, view: &DrillingView) -> bool {
    let (Some(bounds), Some(current)) = (view.depth_bounds, view.depth_range) else {
        return false;
    };
    let mut changed = false;

    ui.heading("Depth Range");
    if let Some(range) = depth_slider(ui, bounds, current) {
        state.drilling.depth_range = Some(range);
        changed = true;
    }

    if !view.formations.is_empty() {
        ui.separator();
        ui.heading("Formation Selection");
        let shown = if view.selected_formations.is_empty() {
            view.formations.iter().cloned().collect()
        } else {
            view.selected_formations.clone()
        };
        let colors = ColorMap::new(&view.formations.iter().cloned().collect());
        if let Some(f) = value_checklist(ui, &view.formations, &shown, Some(&colors)) {
            state.drilling.formations = Some(f);
            changed = true;
        }
    }

    ui.separator();
    ui.heading("Visualization Options");
    egui::ComboBox::from_label("Plot Type")
        .selected_text(state.drilling.plot.label())
        .show_ui(ui, |ui: &mut Ui| {
            for p in DrillingPlot::ALL {
                changed |= ui.selectable_value(&mut state.drilling.plot, p, p.label()).changed();
            }
        });

    match state.drilling.plot {
        DrillingPlot::DepthBased => {
            if let Some(p) = column_checklist(ui, &view.kpi_columns, &view.depth_params) {
                state.drilling.depth_params = Some(p);
                changed = true;
            }
        }
        DrillingPlot::TimeBased => {
            if view.has_timestamp {
                if let Some(p) = column_checklist(ui, &view.time_options, &view.time_params) {
                    state.drilling.time_params = Some(p);
                    changed = true;
                }
            }
        }
        DrillingPlot::Crossplot => {
            let kpis = &view.kpi_columns;
            if let Some(x) = column_combo(ui, "X-Axis Parameter", kpis, view.cross_x.as_deref()) {
                state.drilling.cross_x = Some(x);
                changed = true;
            }
            if let Some(y) = column_combo(ui, "Y-Axis Parameter", kpis, view.cross_y.as_deref()) {
                state.drilling.cross_y = Some(y);
                changed = true;
            }
            let mut options = vec![DrillingColor::Depth, DrillingColor::None];
            if !view.formations.is_empty() {
                options.push(DrillingColor::Formation);
            }
            egui::ComboBox::from_label("Color By")
                .selected_text(view.color_by.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for c in options {
                        changed |= ui
                            .selectable_value(&mut state.drilling.color_by, c, c.label())
                            .changed();
                    }
                });
        }
        DrillingPlot::KpiSummary => {
            if !view.formations.is_empty() {
                let current = view.summary_kpi.as_deref();
                if let Some(k) = column_combo(ui, "Select KPI", &view.kpi_columns, current) {
                    state.drilling.summary_kpi = Some(k);
                    changed = true;
                }
            }
        }
    }
    changed
}
