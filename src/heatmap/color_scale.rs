//! Discrete color scales for heatmap cells.

use crate::matrix::hour_date_matrix::HourDateMatrix;
use plotters::style::colors::colormaps::{ColorMap, DerivedColorMap};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

/// Palette for absolute temperatures, coldest first.
const ABSOLUTE_PALETTE: [RGBColor; 17] = [
    RGBColor(0x72, 0x5b, 0xa2),
    RGBColor(0x9c, 0x87, 0xc0),
    RGBColor(0xc2, 0xac, 0xde),
    RGBColor(0x67, 0x05, 0x3d),
    RGBColor(0x9c, 0x2d, 0x8b),
    RGBColor(0xc9, 0x6e, 0xce),
    RGBColor(0xbb, 0xd7, 0xf0),
    RGBColor(0x6f, 0x94, 0xca),
    RGBColor(0x1f, 0x25, 0x9e),
    RGBColor(0x52, 0x4a, 0x6f),
    RGBColor(0xd6, 0xd5, 0x2f),
    RGBColor(0xd7, 0x86, 0x02),
    RGBColor(0xd7, 0x2c, 0x06),
    RGBColor(0x92, 0x02, 0x00),
    RGBColor(0xe5, 0x69, 0xa7),
    RGBColor(0xd4, 0xcc, 0xd1),
    RGBColor(0xec, 0xee, 0xbb),
];
const ABSOLUTE_MIN: i32 = -40;
const ABSOLUTE_MAX: i32 = 120;
const ABSOLUTE_STEP: usize = 5;

/// Diverging palette for deltas: blue below zero, red above.
const CHANGE_PALETTE: [RGBColor; 3] = [
    RGBColor(0x22, 0x22, 0xdd),
    RGBColor(0xff, 0xff, 0xff),
    RGBColor(0xdd, 0x22, 0x22),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Fixed −40..120 range in steps of 5.
    #[default]
    Absolute,
    /// Symmetric integer range around zero, sized to the largest magnitude.
    Change,
}

/// Boundaries split the value axis into bins; each bin gets one color from the palette gradient.
///
/// A value in `[b_i, b_{i+1})` falls in bin `i`. Values outside the boundaries are
/// clipped to the first or last bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    boundaries: Vec<f64>,
    bin_colors: Vec<RGBColor>,
}

impl ColorScale {
    pub fn absolute() -> Self {
        let boundaries = (ABSOLUTE_MIN..=ABSOLUTE_MAX)
            .step_by(ABSOLUTE_STEP)
            .map(f64::from)
            .collect();
        Self::with_palette(boundaries, &ABSOLUTE_PALETTE)
    }

    /// Integer boundaries `-e..=e` with `e = ceil(max_abs)`, at least 1.
    pub fn change(max_abs: f64) -> Self {
        let extent = if max_abs.is_finite() {
            (max_abs.abs().ceil() as i32).max(1)
        } else {
            1
        };
        Self::with_palette((-extent..=extent).map(f64::from).collect(), &CHANGE_PALETTE)
    }

    /// Bins are spread evenly over the palette gradient, first bin at the first color.
    fn with_palette(boundaries: Vec<f64>, palette: &[RGBColor]) -> Self {
        let gradient = DerivedColorMap::new(palette);
        let bins = boundaries.len().saturating_sub(1).max(1);
        let bin_colors = (0..bins)
            .map(|bin| {
                let t = if bins > 1 {
                    bin as f64 / (bins - 1) as f64
                } else {
                    0.0
                };
                gradient.get_color_normalized(t, 0.0, 1.0)
            })
            .collect();
        Self {
            boundaries,
            bin_colors,
        }
    }

    pub fn for_matrix(mode: ScaleMode, matrix: &HourDateMatrix) -> Self {
        match mode {
            ScaleMode::Absolute => Self::absolute(),
            ScaleMode::Change => Self::change(matrix.max_abs()),
        }
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn bins(&self) -> usize {
        self.boundaries.len().saturating_sub(1).max(1)
    }

    pub fn bin(&self, value: f64) -> usize {
        let at_or_below = self.boundaries.partition_point(|b| *b <= value);
        at_or_below.saturating_sub(1).min(self.bins() - 1)
    }

    pub fn color(&self, value: f64) -> RGBColor {
        self.bin_color(self.bin(value))
    }

    /// Color of `bin`; bins past the last one get the last color.
    pub fn bin_color(&self, bin: usize) -> RGBColor {
        self.bin_colors[bin.min(self.bin_colors.len() - 1)]
    }

    /// Every other boundary, starting with the first.
    pub fn legend_labels(&self) -> Vec<f64> {
        self.boundaries.iter().step_by(2).copied().collect()
    }
}
