use std::collections::HashSet;

use statrs::statistics::Statistics;

use crate::error::{DashResult, DashboardError};

use super::las::DEPTH;
use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Well-known column names
// ---------------------------------------------------------------------------

pub const OIL_PRODUCTION: &str = "Oil_Production_bbl";
pub const WELL_ID: &str = "Well_ID";
pub const ROP: &str = "ROP";
/// Depth column of drilling tables (well logs use [`DEPTH`]).
pub const DRILLING_DEPTH: &str = "Depth";
pub const FORMATION: &str = "Formation";
pub const FORMATION_HARDNESS: &str = "Formation_Hardness";
pub const GAMMA_RAY: &str = "GR";

/// Well-log curves: every numeric column except the depth index.
pub fn well_log_curves(table: &Table) -> Vec<String> {
    table
        .numeric_column_names()
        .into_iter()
        .filter(|c| c != DEPTH)
        .collect()
}

/// Numeric columns that look like production volumes.
pub fn production_columns(table: &Table) -> Vec<String> {
    table
        .numeric_column_names()
        .into_iter()
        .filter(|c| {
            let lower = c.to_lowercase();
            lower.contains("production") || lower.contains("oil") || lower.contains("gas")
        })
        .collect()
}

/// Numeric drilling parameters, i.e. everything but depth, time and geology.
pub fn drilling_kpi_columns(table: &Table) -> Vec<String> {
    const NOT_KPIS: [&str; 4] = [
        DRILLING_DEPTH,
        crate::data::loader::DRILLING_TIMESTAMP,
        FORMATION,
        FORMATION_HARDNESS,
    ];
    table
        .numeric_column_names()
        .into_iter()
        .filter(|c| !NOT_KPIS.contains(&c.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// KPI scalars
// ---------------------------------------------------------------------------

/// `max(DEPTH) - min(DEPTH)` of a well log.
pub fn depth_range(well_log: &Table) -> DashResult<f64> {
    well_log.require_numeric(DEPTH, "well log")?;
    Ok(super::filter::value_range(well_log, DEPTH)
        .map(|(lo, hi)| hi - lo)
        .unwrap_or(f64::NAN))
}

/// Sum of `Oil_Production_bbl`, NaN skipped.
pub fn total_oil_production(production: &Table) -> DashResult<f64> {
    let oil = production.require_numeric(OIL_PRODUCTION, "production")?;
    Ok(oil.iter().filter(|v| !v.is_nan()).sum())
}

/// Mean rate of penetration, NaN skipped.
pub fn mean_rop(drilling: &Table) -> DashResult<f64> {
    let rop = drilling.require_numeric(ROP, "drilling")?;
    Ok(rop.iter().filter(|v| !v.is_nan()).mean())
}

/// Number of distinct non-missing `Well_ID` values.
pub fn well_count(production: &Table) -> DashResult<usize> {
    let col = production
        .column(WELL_ID)
        .ok_or_else(|| DashboardError::missing_column(WELL_ID, "production"))?;
    let distinct: HashSet<CellValue> = (0..production.n_rows())
        .map(|r| col.value(r))
        .filter(|v| *v != CellValue::Null)
        .collect();
    Ok(distinct.len())
}

/// What a KPI card shows.
#[derive(Debug, Clone, PartialEq)]
pub enum KpiValue {
    Number { value: f64, decimals: usize },
    /// Placeholder with the reason the value could not be computed.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub title: &'static str,
    pub unit: &'static str,
    pub value: KpiValue,
}

impl Kpi {
    fn from_result(
        title: &'static str,
        unit: &'static str,
        result: Option<DashResult<f64>>,
        decimals: usize,
    ) -> Kpi {
        let value = match result {
            None => KpiValue::Unavailable {
                reason: "no data loaded".to_string(),
            },
            Some(Err(e)) => KpiValue::Unavailable {
                reason: e.to_string(),
            },
            Some(Ok(v)) if !v.is_finite() => KpiValue::Unavailable {
                reason: "no values".to_string(),
            },
            Some(Ok(value)) => KpiValue::Number { value, decimals },
        };
        Kpi { title, unit, value }
    }

    /// Value text, `N/A` when unavailable.
    pub fn display_value(&self) -> String {
        match &self.value {
            KpiValue::Number { value, decimals } => format!("{value:.decimals$}"),
            KpiValue::Unavailable { .. } => "N/A".to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.value, KpiValue::Number { .. })
    }
}

/// The four overview KPIs. Absent tables and columns yield placeholders.
pub fn overview_kpis(
    well_log: Option<&Table>,
    production: Option<&Table>,
    drilling: Option<&Table>,
) -> [Kpi; 4] {
    [
        Kpi::from_result("Well Depth Range", "m", well_log.map(depth_range), 1),
        Kpi::from_result(
            "Total Oil Production",
            "bbl",
            production.map(total_oil_production),
            1,
        ),
        Kpi::from_result("Average ROP", "m/hr", drilling.map(mean_rop), 1),
        Kpi::from_result(
            "Well Count",
            "",
            production.map(|t| well_count(t).map(|n| n as f64)),
            0,
        ),
    ]
}
