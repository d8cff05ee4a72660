use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n).map(|i| categorical(i, n)).collect()
}

/// The `i`-th of `n` evenly spaced hues.
pub fn categorical(i: usize, n: usize) -> Color32 {
    let hue = (i as f32 / n.max(1) as f32) * 360.0;
    let hsl = Hsl::new(hue, 0.75, 0.45);
    to_color32(hsl.into_color())
}

// ---------------------------------------------------------------------------
// Continuous scales
// ---------------------------------------------------------------------------

/// Viridis, sampled at five stops.
const SEQUENTIAL: [(f32, f32, f32); 5] = [
    (0.267, 0.005, 0.329),
    (0.230, 0.322, 0.546),
    (0.128, 0.567, 0.551),
    (0.369, 0.789, 0.383),
    (0.993, 0.906, 0.144),
];

/// Blue (-1) through white (0) to red (+1).
const DIVERGING: [(f32, f32, f32); 3] = [
    (0.020, 0.188, 0.380),
    (0.969, 0.969, 0.969),
    (0.404, 0.0, 0.122),
];

fn gradient(stops: &[(f32, f32, f32)], t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0) * (stops.len() - 1) as f32;
    let i = (t.floor() as usize).min(stops.len() - 2);
    let (a, b) = (stops[i], stops[i + 1]);
    let a: LinSrgb = Srgb::new(a.0, a.1, a.2).into_linear();
    let b: LinSrgb = Srgb::new(b.0, b.1, b.2).into_linear();
    to_color32(Srgb::from_linear(a.mix(b, t - i as f32)))
}

/// Colour of `t` in `[0, 1]` on the sequential scale.
pub fn sequential(t: f64) -> Color32 {
    gradient(&SEQUENTIAL, t as f32)
}

/// Colour of a correlation coefficient; NaN is grey.
pub fn diverging(r: f64) -> Color32 {
    if r.is_nan() {
        return Color32::GRAY;
    }
    gradient(&DIVERGING, ((r + 1.0) / 2.0) as f32)
}

/// Maps values onto the sequential scale over their finite range.
#[derive(Debug, Clone, Copy)]
pub struct ContinuousScale {
    pub min: f64,
    pub max: f64,
}

impl ContinuousScale {
    /// `None` if no value is finite.
    pub fn fit(values: &[f64]) -> Option<Self> {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some(ContinuousScale { min: v, max: v }),
                Some(s) => Some(ContinuousScale {
                    min: s.min.min(v),
                    max: s.max.max(v),
                }),
            })
    }

    pub fn color_for(&self, v: f64) -> Color32 {
        if !v.is_finite() {
            return Color32::GRAY;
        }
        let span = self.max - self.min;
        let t = if span > 0.0 { (v - self.min) / span } else { 0.5 };
        sequential(t)
    }
}

// ---------------------------------------------------------------------------
// Color mapping: cell value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a categorical column (wells, formations) to
/// distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(unique_values: &BTreeSet<CellValue>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let p = generate_palette(6);
        let unique: BTreeSet<_> = p.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 6);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn scales_hit_their_end_stops() {
        assert_eq!(sequential(0.0), Color32::from_rgb(68, 1, 83));
        assert_eq!(diverging(f64::NAN), Color32::GRAY);
        assert_ne!(diverging(-1.0), diverging(1.0));
    }

    #[test]
    fn continuous_scale_ignores_nan() {
        let scale = ContinuousScale::fit(&[f64::NAN, 2.0, 4.0]).unwrap();
        assert_eq!((scale.min, scale.max), (2.0, 4.0));
        assert_eq!(scale.color_for(f64::NAN), Color32::GRAY);
        assert!(ContinuousScale::fit(&[f64::NAN]).is_none());
    }

    #[test]
    fn colour_map_falls_back_to_grey() {
        let values: BTreeSet<CellValue> =
            ["A", "B"].iter().map(|s| CellValue::Text(s.to_string())).collect();
        let map = ColorMap::new(&values);
        assert_ne!(map.color_for(&CellValue::Text("A".into())), Color32::GRAY);
        assert_eq!(map.color_for(&CellValue::Text("Z".into())), Color32::GRAY);
    }
}
