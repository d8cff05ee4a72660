use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the dashboard.
///
/// None of these abort a page: the view layer turns each one into a
/// [`crate::view::Notice`] and keeps building the sections that do not
/// depend on the failed input.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Unreadable or malformed source, a missing required column, or a
    /// date that does not parse in a required date column.
    #[error("could not load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// Decline-curve fit requested without enough usable points.
    #[error("not enough valid data points ({found}, need {needed}): {detail}")]
    InsufficientData {
        found: usize,
        needed: usize,
        detail: String,
    },

    /// A KPI or chart needs a column the loaded table does not have.
    #[error("column '{column}' is not present in the {table} data")]
    MissingColumn { column: String, table: String },

    /// Config file that exists but cannot be read or parsed.
    #[error("config file {0}: {1}")]
    Config(PathBuf, String),
}

impl DashboardError {
    pub fn load(source_name: impl Into<String>, err: &anyhow::Error) -> Self {
        DashboardError::Load {
            source_name: source_name.into(),
            reason: format!("{err:#}"),
        }
    }

    pub fn missing_column(column: impl Into<String>, table: impl Into<String>) -> Self {
        DashboardError::MissingColumn {
            column: column.into(),
            table: table.into(),
        }
    }
}

pub type DashResult<T> = std::result::Result<T, DashboardError>;
