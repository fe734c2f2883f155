//! Value scaling and the green-yellow-red color ramp.

use super::matrix::HeatmapMatrix;

/// Transform applied to a normalized value before coloring
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Linear,
    Log2,
    Log10,
}

impl ScaleMode {
    /// Compression constant `k` in `ln(1 + k*x) / ln(1 + k)`.
    /// `base - 1` turns the ratio into `log_base(1 + (base - 1) * x)`.
    pub fn compression(self) -> f64 {
        match self {
            ScaleMode::Linear => 0.0,
            ScaleMode::Log2 => 1.0,
            ScaleMode::Log10 => 9.0,
        }
    }

    pub fn apply(self, t: f64) -> f64 {
        match self {
            ScaleMode::Linear => t.clamp(0.0, 1.0),
            ScaleMode::Log2 | ScaleMode::Log10 => log_compress(t, self.compression()),
        }
    }

    pub fn next(self) -> Self {
        match self {
            ScaleMode::Linear => ScaleMode::Log2,
            ScaleMode::Log2 => ScaleMode::Log10,
            ScaleMode::Log10 => ScaleMode::Linear,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScaleMode::Linear => "linear",
            ScaleMode::Log2 => "log2",
            ScaleMode::Log10 => "log10",
        }
    }
}

/// `ln(1 + k*t) / ln(1 + k)` clamped to [0, 1]; identity for `k <= 0`
pub fn log_compress(t: f64, k: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if k <= 0.0 {
        return t;
    }
    ((1.0 + k * t).ln() / (1.0 + k).ln()).clamp(0.0, 1.0)
}

/// 24-bit color independent of any terminal backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

fn lerp_rgb(from: Rgb, to: Rgb, t: f64) -> Rgb {
    Rgb(lerp(from.0, to.0, t), lerp(from.1, to.1, t), lerp(from.2, to.2, t))
}

/// Three-point ramp: green at 0, yellow at 0.5, red at 1
pub fn ramp(t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        lerp_rgb(Rgb::GREEN, Rgb::YELLOW, t * 2.0)
    } else {
        lerp_rgb(Rgb::YELLOW, Rgb::RED, (t - 0.5) * 2.0)
    }
}

/// Color for a raw cell value of `matrix` under `mode`
pub fn cell_color(matrix: &HeatmapMatrix, value: f64, mode: ScaleMode) -> Rgb {
    ramp(mode.apply(matrix.normalize(value)))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegendEntry {
    pub value: f64,
    pub color: Rgb,
}

/// `samples` evenly spaced values across [min, max] with their colors
pub fn legend(matrix: &HeatmapMatrix, mode: ScaleMode, samples: usize) -> Vec<LegendEntry> {
    let (min, max) = (matrix.min_value(), matrix.max_value());
    match samples {
        0 => Vec::new(),
        1 => vec![LegendEntry {
            value: min,
            color: cell_color(matrix, min, mode),
        }],
        n => (0..n)
            .map(|i| {
                let value = min + (max - min) * i as f64 / (n - 1) as f64;
                LegendEntry {
                    value,
                    color: cell_color(matrix, value, mode),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::matrix::DataPoint;
    use chrono::DateTime;

    fn matrix(values: &[f64]) -> HeatmapMatrix {
        let points = values.iter().enumerate().map(|(i, v)| {
            DataPoint::new(DateTime::from_timestamp(i as i64 * 60, 0).unwrap(), "c", *v)
        });
        HeatmapMatrix::build(points).into_matrix().unwrap()
    }

    #[test]
    fn test_ramp_anchor_colors() {
        assert_eq!(ramp(0.0), Rgb::GREEN);
        assert_eq!(ramp(0.5), Rgb::YELLOW);
        assert_eq!(ramp(1.0), Rgb::RED);
        assert_eq!(ramp(0.25), Rgb(128, 255, 0));
        assert_eq!(ramp(0.75), Rgb(255, 128, 0));
    }

    #[test]
    fn test_ramp_clamps_out_of_range() {
        assert_eq!(ramp(-1.0), Rgb::GREEN);
        assert_eq!(ramp(4.0), Rgb::RED);
    }

    #[test]
    fn test_log_modes_fix_endpoints() {
        for mode in [ScaleMode::Log2, ScaleMode::Log10] {
            assert_eq!(mode.apply(0.0), 0.0);
            assert!((mode.apply(1.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_log_modes_lift_low_end() {
        let t = 0.1;
        let log2 = ScaleMode::Log2.apply(t);
        let log10 = ScaleMode::Log10.apply(t);
        assert!(log2 > t);
        assert!(log10 > log2);
        assert!(log10 <= 1.0);
    }

    #[test]
    fn test_log_compress_is_bounded_for_any_input() {
        for t in [-5.0, -0.0, 0.3, 0.999, 1.0, 2.0, 1e9] {
            let v = log_compress(t, 1000.0);
            assert!((0.0..=1.0).contains(&v), "t={t} gave {v}");
        }
    }

    #[test]
    fn test_cell_color_uses_matrix_extrema() {
        let m = matrix(&[10.0, 20.0, 30.0]);
        assert_eq!(cell_color(&m, 10.0, ScaleMode::Linear), Rgb::GREEN);
        assert_eq!(cell_color(&m, 20.0, ScaleMode::Linear), Rgb::YELLOW);
        assert_eq!(cell_color(&m, 30.0, ScaleMode::Linear), Rgb::RED);
    }

    #[test]
    fn test_legend_spans_range() {
        let m = matrix(&[0.0, 100.0]);
        let entries = legend(&m, ScaleMode::Linear, 5);
        let values: Vec<f64> = entries.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(entries[0].color, Rgb::GREEN);
        assert_eq!(entries[2].color, Rgb::YELLOW);
        assert_eq!(entries[4].color, Rgb::RED);
        assert!(legend(&m, ScaleMode::Linear, 0).is_empty());
    }

    #[test]
    fn test_scale_mode_cycle() {
        let mut mode = ScaleMode::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(mode);
            mode = mode.next();
        }
        assert_eq!(mode, ScaleMode::Linear);
        assert_eq!(seen, vec![ScaleMode::Linear, ScaleMode::Log2, ScaleMode::Log10]);
    }
}
