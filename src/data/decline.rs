//! Exponential decline-curve analysis.
//!
//! Fits `ln(q) = ln(qi) - D * t` by ordinary least squares, with `t` in days
//! since the first valid observation, and reports the decline annualized.

use chrono::{Duration, NaiveDateTime};
use statrs::statistics::Statistics;

use crate::error::{DashResult, DashboardError};

/// A fit needs strictly more valid points than this.
pub const MIN_POINTS: usize = 5;

/// How far past the last observation the forecast runs, as a multiple of the
/// observed span.
pub const FORECAST_SPAN: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct DeclinePoint {
    pub date: NaiveDateTime,
    /// Whole days since the first valid observation.
    pub days: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclineFit {
    /// `qi = exp(intercept)`.
    pub initial_production: f64,
    /// Annual decline, `-slope * 365`.
    pub decline_rate: f64,
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination of the log-linear fit.
    pub r_squared: f64,
    /// Valid observations used by the fit.
    pub observed: Vec<DeclinePoint>,
    /// Model evaluated at every whole day of `[0, 1.5 * max_observed_days]`.
    pub forecast: Vec<DeclinePoint>,
}

impl DeclineFit {
    /// Modelled rate after `days` days.
    pub fn rate_at(&self, days: f64) -> f64 {
        (self.intercept + self.slope * days).exp()
    }
}

/// Fit an exponential decline to `(date, production)` pairs.
///
/// Pairs with a missing date or a missing / non-positive rate are excluded.
pub fn decline_curve_fit(
    dates: &[Option<NaiveDateTime>],
    production: &[f64],
) -> DashResult<DeclineFit> {
    let valid: Vec<(NaiveDateTime, f64)> = dates
        .iter()
        .zip(production)
        .filter_map(|(d, q)| match d {
            Some(d) if *q > 0.0 => Some((*d, *q)),
            _ => None,
        })
        .collect();

    if valid.len() <= MIN_POINTS {
        return Err(DashboardError::InsufficientData {
            found: valid.len(),
            needed: MIN_POINTS + 1,
            detail: "decline analysis needs more positive production values".to_string(),
        });
    }

    let first_date = valid.iter().fold(valid[0].0, |acc, (d, _)| acc.min(*d));
    let observed: Vec<DeclinePoint> = valid
        .iter()
        .map(|(date, rate)| DeclinePoint {
            date: *date,
            days: (*date - first_date).num_days(),
            rate: *rate,
        })
        .collect();

    let xs: Vec<f64> = observed.iter().map(|p| p.days as f64).collect();
    let ys: Vec<f64> = observed.iter().map(|p| p.rate.ln()).collect();

    let var_x = xs.iter().variance();
    if var_x == 0.0 {
        return Err(DashboardError::InsufficientData {
            found: 1,
            needed: 2,
            detail: "all production values fall on the same day".to_string(),
        });
    }
    let var_y = ys.iter().variance();
    let cov = xs.iter().covariance(ys.iter());

    let slope = cov / var_x;
    let intercept = ys.iter().mean() - slope * xs.iter().mean();
    // A flat series has no variance to explain.
    let r = if var_y == 0.0 {
        0.0
    } else {
        (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
    };

    let max_days = observed.iter().map(|p| p.days).fold(0, i64::max);
    let horizon = (max_days as f64 * FORECAST_SPAN).floor() as i64;
    let forecast = (0..=horizon)
        .map(|day| DeclinePoint {
            date: first_date + Duration::days(day),
            days: day,
            rate: (intercept + slope * day as f64).exp(),
        })
        .collect();

    let fit = DeclineFit {
        initial_production: intercept.exp(),
        decline_rate: -slope * 365.0,
        slope,
        intercept,
        r_squared: r * r,
        observed,
        forecast,
    };
    log::debug!(
        "Decline fit: qi={:.2}, D={:.4}/yr, R²={:.4} over {} points",
        fit.initial_production,
        fit.decline_rate,
        fit.r_squared,
        fit.observed.len()
    );
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(n: i64) -> Option<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Some(start + Duration::days(n))
    }

    #[test]
    fn recovers_exponential_decline() {
        let dates: Vec<_> = (0..30).map(day).collect();
        let q: Vec<f64> = (0..30).map(|t| 100.0 * (-0.001 * t as f64).exp()).collect();
        let fit = decline_curve_fit(&dates, &q).unwrap();
        assert!((fit.decline_rate - 0.365).abs() < 1e-6, "{}", fit.decline_rate);
        assert!((fit.initial_production - 100.0).abs() < 1e-6);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        // 29 observed days -> forecast over 0..=43.
        assert_eq!(fit.forecast.len(), 44);
        assert_eq!(fit.forecast[0].days, 0);
        assert!((fit.rate_at(10.0) - q[10]).abs() < 1e-6);
    }

    #[test]
    fn four_points_are_insufficient() {
        let dates: Vec<_> = (0..4).map(day).collect();
        let err = decline_curve_fit(&dates, &[10.0, 9.0, 8.0, 7.0]).unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData { found: 4, .. }));
    }

    #[test]
    fn non_positive_and_missing_values_are_excluded() {
        let dates: Vec<_> = (0..8).map(day).collect();
        // Only five usable values remain.
        let q = [10.0, 0.0, -1.0, f64::NAN, 8.0, 7.0, 6.0, 5.0];
        assert!(decline_curve_fit(&dates, &q).is_err());

        let mut dates = dates;
        dates[1] = None;
        let q = [10.0, 9.0, 8.5, 8.0, 7.5, 7.0, 6.5, 6.0];
        let fit = decline_curve_fit(&dates, &q).unwrap();
        assert_eq!(fit.observed.len(), 7);
    }

    #[test]
    fn elapsed_days_start_at_first_valid_date() {
        let dates: Vec<_> = (0..8).map(day).collect();
        let q = [0.0, 12.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0];
        let fit = decline_curve_fit(&dates, &q).unwrap();
        assert_eq!(fit.observed[0].days, 0);
        assert_eq!(fit.observed.last().unwrap().days, 6);
    }

    #[test]
    fn flat_production_has_zero_r_squared() {
        let dates: Vec<_> = (0..10).map(day).collect();
        let fit = decline_curve_fit(&dates, &[1.0; 10]).unwrap();
        assert_eq!(fit.r_squared, 0.0);
        assert!(fit.decline_rate.abs() < 1e-12);
    }
}
