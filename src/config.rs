use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::model::DataKind;
use crate::error::{DashResult, DashboardError};

/// Env var naming a JSON config file.
pub const CONFIG_ENV: &str = "RUSTY_DERRICK_CONFIG";
/// Env var overriding `data_dir` after the config is loaded.
pub const DATA_DIR_ENV: &str = "RUSTY_DERRICK_DATA_DIR";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "rusty_derrick.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding the sample datasets.
    pub data_dir: PathBuf,
    pub well_log_file: String,
    pub production_file: String,
    pub drilling_file: String,
    /// Rows shown in table previews.
    pub preview_rows: usize,
    pub histogram_bins: usize,
    /// Initial moving-average window on the production page.
    pub default_ma_window: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            well_log_file: "synthetic_well.las".to_string(),
            production_file: "production_data.csv".to_string(),
            drilling_file: "drilling_data.csv".to_string(),
            preview_rows: 5,
            histogram_bins: 30,
            default_ma_window: 3,
        }
    }
}

impl DashboardConfig {
    /// Load from `$RUSTY_DERRICK_CONFIG`, then `./rusty_derrick.json`, then
    /// defaults. Unreadable files are logged and skipped.
    pub fn load() -> Self {
        let mut config = Self::load_file_chain();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            log::info!("Data directory overridden by {DATA_DIR_ENV}: {dir}");
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    fn load_file_chain() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        log::info!("Loaded config from {CONFIG_ENV} ({})", p.display());
                        return config;
                    }
                    Err(e) => log::warn!("{e}; falling back"),
                }
            } else {
                log::warn!("{CONFIG_ENV} points to non-existent file {path}, falling back");
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    log::info!("Loaded config from ./{LOCAL_CONFIG}");
                    return config;
                }
                Err(e) => log::warn!("{e}; using defaults"),
            }
        }

        log::info!("No config file found, using built-in defaults");
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> DashResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(path.to_path_buf(), e.to_string()))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| DashboardError::Config(path.to_path_buf(), e.to_string()))?;
        config.validated(path)
    }

    fn validated(mut self, path: &Path) -> DashResult<Self> {
        if self.histogram_bins == 0 {
            return Err(DashboardError::Config(
                path.to_path_buf(),
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if !(2..=12).contains(&self.default_ma_window) {
            log::warn!(
                "default_ma_window {} outside 2..=12, clamping",
                self.default_ma_window
            );
            self.default_ma_window = self.default_ma_window.clamp(2, 12);
        }
        Ok(self)
    }

    /// Canonical sample file for a data kind.
    pub fn sample_path(&self, kind: DataKind) -> PathBuf {
        let file = match kind {
            DataKind::WellLog => &self.well_log_file,
            DataKind::Production => &self.production_file,
            DataKind::Drilling => &self.drilling_file,
        };
        self.data_dir.join(file)
    }
}
