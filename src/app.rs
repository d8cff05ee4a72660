use eframe::egui;

use crate::config::DashboardConfig;
use crate::state::AppState;
use crate::ui::{pages, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyDerrickApp {
    pub state: AppState,
    /// Active tab on the overview page.
    overview_tab: usize,
}

impl RustyDerrickApp {
    /// Build the app and load whatever sample data is present.
    pub fn new(config: DashboardConfig) -> Self {
        let mut state = AppState::new(config);
        state.load_samples();
        Self {
            state,
            overview_tab: 0,
        }
    }
}

impl eframe::App for RustyDerrickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: page navigation ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Side and central panels for the active page ----
        pages::show(ctx, &mut self.state, &mut self.overview_tab);
    }
}
