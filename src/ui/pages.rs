use eframe::egui::{self, Context, RichText, Ui};

use crate::color::ColorMap;
use crate::data::kpi::Kpi;
use crate::data::model::DataKind;
use crate::state::{AppState, Page};
use crate::ui::{panels, plot};
use crate::view::{self, Section};

const SIDE_WIDTH: f32 = 280.0;

/// Draw the side panel and central panel for the active page.
pub fn show(ctx: &Context, state: &mut AppState, overview_tab: &mut usize) {
    match state.page {
        Page::Overview => overview(ctx, state, overview_tab),
        Page::WellLog => well_log(ctx, state),
        Page::Production => production(ctx, state),
        Page::Drilling => drilling(ctx, state),
    }
}

fn side_panel(ctx: &Context, add_contents: impl FnOnce(&mut Ui)) {
    egui::SidePanel::left("controls")
        .resizable(true)
        .default_width(SIDE_WIDTH)
        .show(ctx, |ui: &mut Ui| {
            egui::ScrollArea::vertical().show(ui, add_contents);
        });
}

fn central(ctx: &Context, title: &str, sections: &[Section], colors: Option<&ColorMap>) {
    egui::CentralPanel::default().show(ctx, |ui: &mut Ui| {
        egui::ScrollArea::vertical().show(ui, |ui: &mut Ui| {
            ui.heading(RichText::new(title).size(24.0));
            ui.separator();
            for section in sections {
                plot::section(ui, section, colors);
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn overview(ctx: &Context, state: &mut AppState, tab: &mut usize) {
    side_panel(ctx, |ui: &mut Ui| {
        ui.heading("Loaded Data");
        for kind in DataKind::ALL {
            match state.session.dataset(kind) {
                Some(ds) => ui.label(format!("{kind}: {} ({} rows)", ds.source_name, ds.len())),
                None => ui.label(format!("{kind}: not loaded")),
            };
            if let Some(n) = state.load_notice(kind) {
                plot::notice(ui, n);
            }
        }
        ui.separator();
        if ui.button("Reload sample data").clicked() {
            state.load_samples();
        }
    });

    let view = view::overview::build(&state.session, &state.config);
    egui::CentralPanel::default().show(ctx, |ui: &mut Ui| {
        egui::ScrollArea::vertical().show(ui, |ui: &mut Ui| {
            ui.heading(RichText::new("Oil & Gas Data Dashboard").size(24.0));
            ui.label(
                "Analyze well logs, production data and drilling performance. \
                 Use the pages above to explore each dataset.",
            );
            ui.separator();
            ui.columns(view.kpis.len(), |columns: &mut [Ui]| {
                for (col, kpi) in columns.iter_mut().zip(&view.kpis) {
                    kpi_card(col, kpi);
                }
            });
            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                for (i, section) in view.tabs.iter().enumerate() {
                    if ui.selectable_label(*tab == i, &section.title).clicked() {
                        *tab = i;
                    }
                }
            });
            if let Some(section) = view.tabs.get(*tab) {
                plot::section(ui, section, None);
            }
        });
    });
}

fn kpi_card(ui: &mut Ui, kpi: &Kpi) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(kpi.title).small());
        let value = if kpi.unit.is_empty() || !kpi.is_available() {
            kpi.display_value()
        } else {
            format!("{} {}", kpi.display_value(), kpi.unit)
        };
        ui.label(RichText::new(value).size(20.0).strong());
    });
}

// ---------------------------------------------------------------------------
// Analysis pages
// ---------------------------------------------------------------------------

fn well_log(ctx: &Context, state: &mut AppState) {
    let view = view::well_log::build(&state.session, &state.well_log, &state.config);
    let mut changed = false;
    side_panel(ctx, |ui: &mut Ui| {
        changed |= panels::source_picker(ui, state, DataKind::WellLog);
        ui.separator();
        changed |= panels::well_log_controls(ui, state, &view);
    });
    let view = if changed {
        view::well_log::build(&state.session, &state.well_log, &state.config)
    } else {
        view
    };
    central(ctx, Page::WellLog.label(), &view.sections, None);
}

fn production(ctx: &Context, state: &mut AppState) {
    let view = view::production::build(&state.session, &state.production, &state.config);
    let colors = ColorMap::new(&view.wells.iter().cloned().collect());
    let mut changed = false;
    side_panel(ctx, |ui: &mut Ui| {
        changed |= panels::source_picker(ui, state, DataKind::Production);
        ui.separator();
        changed |= panels::production_controls(ui, state, &view, Some(&colors));
    });
    let (view, colors) = if changed {
        let view = view::production::build(&state.session, &state.production, &state.config);
        let colors = ColorMap::new(&view.wells.iter().cloned().collect());
        (view, colors)
    } else {
        (view, colors)
    };
    central(ctx, Page::Production.label(), &view.sections, Some(&colors));
}

fn drilling(ctx: &Context, state: &mut AppState) {
    let view = view::drilling::build(&state.session, &state.drilling, &state.config);
    let mut changed = false;
    side_panel(ctx, |ui: &mut Ui| {
        changed |= panels::source_picker(ui, state, DataKind::Drilling);
        ui.separator();
        changed |= panels::drilling_controls(ui, state, &view);
    });
    let view = if changed {
        view::drilling::build(&state.session, &state.drilling, &state.config)
    } else {
        view
    };
    let colors = ColorMap::new(&view.formations.iter().cloned().collect());
    central(ctx, Page::Drilling.label(), &view.sections, Some(&colors));
}
