use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::data::cache::LoadCache;
use crate::data::loader::DataSource;
use crate::data::model::{CellValue, DataKind, Dataset, Table};
use crate::data::resample::Frequency;
use crate::view::Notice;

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// The loaded tables and the two shared selections. One per app instance;
/// every setter overwrites (last write wins).
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub well_log: Option<Arc<Dataset>>,
    pub production: Option<Arc<Dataset>>,
    pub drilling: Option<Arc<Dataset>>,
    /// Well whose production feeds the decline analysis; `None` means the
    /// total over the selected wells.
    pub selected_well: Option<String>,
    /// Well-log depth window; `None` means the full logged interval.
    pub depth_range: Option<(f64, f64)>,
}

impl Session {
    /// Create the session in `slot` unless it already exists.
    pub fn initialize(slot: &mut Option<Session>) -> &mut Session {
        slot.get_or_insert_with(Session::default)
    }

    pub fn dataset(&self, kind: DataKind) -> Option<&Arc<Dataset>> {
        match kind {
            DataKind::WellLog => self.well_log.as_ref(),
            DataKind::Production => self.production.as_ref(),
            DataKind::Drilling => self.drilling.as_ref(),
        }
    }

    pub fn table(&self, kind: DataKind) -> Option<&Table> {
        self.dataset(kind).map(|d| &d.table)
    }

    /// Store a dataset in the slot matching its kind.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        match dataset.kind {
            DataKind::WellLog => self.set_well_log(dataset),
            DataKind::Production => self.set_production(dataset),
            DataKind::Drilling => self.set_drilling(dataset),
        }
    }

    pub fn set_well_log(&mut self, dataset: Arc<Dataset>) {
        self.well_log = Some(dataset);
    }

    pub fn set_production(&mut self, dataset: Arc<Dataset>) {
        self.production = Some(dataset);
    }

    pub fn set_drilling(&mut self, dataset: Arc<Dataset>) {
        self.drilling = Some(dataset);
    }

    pub fn set_selected_well(&mut self, well: Option<String>) {
        self.selected_well = well;
    }

    pub fn set_depth_range(&mut self, range: Option<(f64, f64)>) {
        self.depth_range = range;
    }
}

// ---------------------------------------------------------------------------
// Per-page selections
// ---------------------------------------------------------------------------

/// Where a page takes its dataset from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceChoice {
    #[default]
    Sample,
    Upload,
}

/// Column choices are `None` until the user picks one; the view layer
/// substitutes defaults and ignores names the table no longer has.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WellLogSelection {
    pub source: SourceChoice,
    pub curve: Option<String>,
    pub tracks: Option<Vec<String>>,
    pub cross_x: Option<String>,
    pub cross_y: Option<String>,
    /// Curve colouring the crossplot; `None` for a single colour.
    pub color_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSelection {
    pub source: SourceChoice,
    /// `None` selects every well.
    pub wells: Option<BTreeSet<CellValue>>,
    pub frequency: Frequency,
    pub column: Option<String>,
    pub ma_window: usize,
    pub show_decline: bool,
}

impl ProductionSelection {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            source: SourceChoice::Sample,
            wells: None,
            frequency: Frequency::Daily,
            column: None,
            ma_window: config.default_ma_window,
            show_decline: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrillingPlot {
    #[default]
    DepthBased,
    TimeBased,
    Crossplot,
    KpiSummary,
}

impl DrillingPlot {
    pub const ALL: [DrillingPlot; 4] = [
        DrillingPlot::DepthBased,
        DrillingPlot::TimeBased,
        DrillingPlot::Crossplot,
        DrillingPlot::KpiSummary,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DrillingPlot::DepthBased => "Depth-Based",
            DrillingPlot::TimeBased => "Time-Based",
            DrillingPlot::Crossplot => "Crossplot",
            DrillingPlot::KpiSummary => "KPI Summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrillingColor {
    #[default]
    Depth,
    None,
    Formation,
}

impl DrillingColor {
    pub fn label(self) -> &'static str {
        match self {
            DrillingColor::Depth => "Depth",
            DrillingColor::None => "None",
            DrillingColor::Formation => "Formation",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrillingSelection {
    pub source: SourceChoice,
    /// `None` means the full drilled interval.
    pub depth_range: Option<(f64, f64)>,
    /// `None` or an empty set applies no formation filter.
    pub formations: Option<BTreeSet<CellValue>>,
    pub plot: DrillingPlot,
    pub depth_params: Option<Vec<String>>,
    pub time_params: Option<Vec<String>>,
    pub cross_x: Option<String>,
    pub cross_y: Option<String>,
    pub color_by: DrillingColor,
    pub summary_kpi: Option<String>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Overview,
    WellLog,
    Production,
    Drilling,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Overview, Page::WellLog, Page::Production, Page::Drilling];

    pub fn label(self) -> &'static str {
        match self {
            Page::Overview => "Overview",
            Page::WellLog => "Well Log Analysis",
            Page::Production => "Production Analysis",
            Page::Drilling => "Drilling KPIs",
        }
    }

    /// Dataset a page loads, if any.
    pub fn kind(self) -> Option<DataKind> {
        match self {
            Page::Overview => None,
            Page::WellLog => Some(DataKind::WellLog),
            Page::Production => Some(DataKind::Production),
            Page::Drilling => Some(DataKind::Drilling),
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    pub session: Session,
    pub cache: LoadCache,
    pub page: Page,
    pub well_log: WellLogSelection,
    pub production: ProductionSelection,
    pub drilling: DrillingSelection,
    /// Outcome of the latest load per kind, shown in the sidebar.
    load_notices: BTreeMap<DataKind, Notice>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        // One session per app instance, created empty here and dropped with it.
        let mut slot = None;
        let session = std::mem::take(Session::initialize(&mut slot));
        Self {
            production: ProductionSelection::new(&config),
            config,
            session,
            cache: LoadCache::new(),
            page: Page::Overview,
            well_log: WellLogSelection::default(),
            drilling: DrillingSelection::default(),
            load_notices: BTreeMap::new(),
        }
    }

    /// Load every sample dataset that exists and is not loaded yet.
    pub fn load_samples(&mut self) {
        for kind in DataKind::ALL {
            if self.session.dataset(kind).is_none() && self.config.sample_path(kind).exists() {
                self.load_sample(kind);
            }
        }
    }

    /// Load the canonical sample file for `kind`. Returns whether it loaded.
    pub fn load_sample(&mut self, kind: DataKind) -> bool {
        let path = self.config.sample_path(kind);
        if !path.exists() {
            log::warn!("Sample {kind} data not found at {}", path.display());
            self.load_notices.insert(
                kind,
                Notice::error(format!(
                    "Sample data not found at {}. Please upload your own data.",
                    path.display()
                )),
            );
            return false;
        }
        self.load_source(&DataSource::Path(path), kind)
    }

    /// Load through the cache. On failure the previously loaded dataset
    /// stays in place and the error is kept as a notice.
    pub fn load_source(&mut self, source: &DataSource, kind: DataKind) -> bool {
        match self.cache.load(source, kind) {
            Ok(dataset) => {
                let replaced = self
                    .session
                    .dataset(kind)
                    .is_some_and(|old| !Arc::ptr_eq(old, &dataset));
                self.load_notices.insert(
                    kind,
                    Notice::info(format!(
                        "Loaded {} ({} rows)",
                        dataset.source_name,
                        dataset.len()
                    )),
                );
                if replaced || self.session.dataset(kind).is_none() {
                    self.reset_selection(kind);
                }
                self.session.set_dataset(dataset);
                true
            }
            Err(e) => {
                self.load_notices.insert(kind, Notice::from(&e));
                false
            }
        }
    }

    pub fn load_notice(&self, kind: DataKind) -> Option<&Notice> {
        self.load_notices.get(&kind)
    }

    /// Selections of the previous table would be stale for a new one.
    fn reset_selection(&mut self, kind: DataKind) {
        match kind {
            DataKind::WellLog => {
                self.well_log = WellLogSelection {
                    source: self.well_log.source,
                    ..WellLogSelection::default()
                };
                self.session.set_depth_range(None);
            }
            DataKind::Production => {
                self.production = ProductionSelection {
                    source: self.production.source,
                    ..ProductionSelection::new(&self.config)
                };
                self.session.set_selected_well(None);
            }
            DataKind::Drilling => {
                self.drilling = DrillingSelection {
                    source: self.drilling.source,
                    ..DrillingSelection::default()
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    const PRODUCTION_CSV: &str = "Date,Well_ID,Oil_Production_bbl\n\
                                  2024-01-01,W1,100\n\
                                  2024-01-02,W1,90\n";

    fn upload(name: &str, text: &str) -> DataSource {
        DataSource::Upload {
            name: name.to_string(),
            bytes: Bytes::from(text.to_string()),
        }
    }

    fn temp_config() -> (tempfile::TempDir, DashboardConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            data_dir: dir.path().to_path_buf(),
            ..DashboardConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn initialize_only_fills_an_empty_slot() {
        let mut slot = None;
        Session::initialize(&mut slot).set_selected_well(Some("W1".into()));
        let again = Session::initialize(&mut slot);
        assert_eq!(again.selected_well.as_deref(), Some("W1"));
        assert!(again.well_log.is_none() && again.depth_range.is_none());
    }

    #[test]
    fn new_state_starts_with_an_empty_session() {
        let (_dir, config) = temp_config();
        let state = AppState::new(config);
        for kind in DataKind::ALL {
            assert!(state.session.dataset(kind).is_none());
            assert!(state.load_notice(kind).is_none());
        }
        assert!(state.session.selected_well.is_none());
        assert!(state.session.depth_range.is_none());
    }

    #[test]
    fn upload_replaces_dataset_and_resets_selection() {
        let (_dir, config) = temp_config();
        let mut state = AppState::new(config);
        state.production.column = Some("Gas".into());
        state.session.set_selected_well(Some("W9".into()));

        assert!(state.load_source(&upload("p.csv", PRODUCTION_CSV), DataKind::Production));
        let table = state.session.table(DataKind::Production).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(state.production.column, None);
        assert_eq!(state.session.selected_well, None);
        assert_eq!(
            state.load_notice(DataKind::Production).unwrap().severity,
            crate::view::Severity::Info
        );
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let (_dir, config) = temp_config();
        let mut state = AppState::new(config);
        assert!(state.load_source(&upload("p.csv", PRODUCTION_CSV), DataKind::Production));

        let bad = upload("bad.csv", "Date,Oil_Production_bbl\nyesterday,1\n");
        assert!(!state.load_source(&bad, DataKind::Production));
        assert_eq!(state.session.table(DataKind::Production).unwrap().n_rows(), 2);
        let notice = state.load_notice(DataKind::Production).unwrap();
        assert_eq!(notice.severity, crate::view::Severity::Error);
        assert!(notice.message.contains("bad.csv"));
    }

    #[test]
    fn missing_sample_is_reported() {
        let (_dir, config) = temp_config();
        let mut state = AppState::new(config);
        assert!(!state.load_sample(DataKind::Drilling));
        assert!(state.session.drilling.is_none());
        assert!(state
            .load_notice(DataKind::Drilling)
            .unwrap()
            .message
            .contains("Sample data not found"));
    }

    #[test]
    fn samples_load_once_through_the_cache() {
        let (dir, config) = temp_config();
        std::fs::write(dir.path().join("production_data.csv"), PRODUCTION_CSV).unwrap();
        let mut state = AppState::new(config);
        state.load_samples();
        assert!(state.session.production.is_some());
        assert!(state.session.well_log.is_none());

        assert!(state.load_sample(DataKind::Production));
        assert_eq!(state.cache.hits(), 1);
        assert_eq!(state.cache.len(), 1);
    }
}
