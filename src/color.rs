use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

/// Maps parent-region names to distinct colours.
#[derive(Debug, Clone, Default)]
pub struct RegionColors {
    mapping: BTreeMap<String, Color32>,
}

impl RegionColors {
    pub fn new(regions: &[String]) -> Self {
        let mapping = regions
            .iter()
            .cloned()
            .zip(generate_palette(regions.len()))
            .collect();
        RegionColors { mapping }
    }

    pub fn color_for(&self, region: Option<&str>) -> Color32 {
        region
            .and_then(|r| self.mapping.get(r))
            .copied()
            .unwrap_or(Color32::GRAY)
    }

    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping.iter().map(|(r, c)| (r.clone(), *c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Sequential scales for the choropleth
// ---------------------------------------------------------------------------

/// Sequential colour scheme, light for small values to dark for large.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorScheme {
    #[default]
    YlOrRd,
    Blues,
    Greens,
    Reds,
    Purples,
    Oranges,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 6] = [
        ColorScheme::YlOrRd,
        ColorScheme::Blues,
        ColorScheme::Greens,
        ColorScheme::Reds,
        ColorScheme::Purples,
        ColorScheme::Oranges,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorScheme::YlOrRd => "Yellow-Orange-Red",
            ColorScheme::Blues => "Blues",
            ColorScheme::Greens => "Greens",
            ColorScheme::Reds => "Reds",
            ColorScheme::Purples => "Purples",
            ColorScheme::Oranges => "Oranges",
        }
    }

    /// Colour stops, evenly spaced from 0 to 1.
    fn stops(&self) -> &'static [[u8; 3]] {
        match self {
            ColorScheme::YlOrRd => &[[255, 255, 204], [254, 178, 76], [240, 59, 32], [128, 0, 38]],
            ColorScheme::Blues => &[[239, 243, 255], [107, 174, 214], [33, 113, 181], [8, 48, 107]],
            ColorScheme::Greens => &[[237, 248, 233], [116, 196, 118], [35, 139, 69], [0, 68, 27]],
            ColorScheme::Reds => &[[254, 229, 217], [251, 106, 74], [203, 24, 29], [103, 0, 13]],
            ColorScheme::Purples => &[[242, 240, 247], [158, 154, 200], [106, 81, 163], [63, 0, 125]],
            ColorScheme::Oranges => &[[254, 237, 222], [253, 141, 60], [217, 71, 1], [127, 39, 4]],
        }
    }

    /// Colour at `t` in `[0, 1]`, interpolated in linear RGB.
    pub fn sample(&self, t: f64) -> Color32 {
        let stops = self.stops();
        let t = t.clamp(0.0, 1.0) as f32 * (stops.len() - 1) as f32;
        let i = (t.floor() as usize).min(stops.len() - 2);
        let local = t - i as f32;

        let linear = |[r, g, b]: [u8; 3]| -> LinSrgb {
            Srgb::new(r, g, b).into_format::<f32>().into_linear()
        };
        let mixed = linear(stops[i]).mix(linear(stops[i + 1]), local);
        let rgb: Srgb<u8> = Srgb::from_linear(mixed);
        Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
    }
}

/// Maps a value range onto a [`ColorScheme`].
#[derive(Debug, Clone, Copy)]
pub struct SequentialScale {
    pub scheme: ColorScheme,
    pub min: f64,
    pub max: f64,
}

impl SequentialScale {
    pub fn new(scheme: ColorScheme, min: f64, max: f64) -> Self {
        SequentialScale { scheme, min, max }
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        let span = self.max - self.min;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            (value - self.min) / span
        };
        self.scheme.sample(t)
    }

    /// `steps` evenly spaced `(value, colour)` legend entries.
    pub fn legend_entries(&self, steps: usize) -> Vec<(f64, Color32)> {
        let steps = steps.max(2);
        (0..steps)
            .map(|i| {
                let v = self.min + (self.max - self.min) * i as f64 / (steps - 1) as f64;
                (v, self.color_for(v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let colors = generate_palette(5);
        assert_eq!(colors.len(), 5);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn scale_endpoints_match_stops() {
        for scheme in ColorScheme::ALL {
            let [r, g, b] = scheme.stops()[0];
            assert_eq!(scheme.sample(0.0), Color32::from_rgb(r, g, b));
            let [r, g, b] = *scheme.stops().last().unwrap();
            assert_eq!(scheme.sample(1.0), Color32::from_rgb(r, g, b));
        }
    }

    #[test]
    fn flat_range_uses_midpoint() {
        let scale = SequentialScale::new(ColorScheme::Blues, 10.0, 10.0);
        assert_eq!(scale.color_for(10.0), ColorScheme::Blues.sample(0.5));
        assert_eq!(scale.legend_entries(1).len(), 2);
    }

    #[test]
    fn unknown_region_is_gray() {
        let colors = RegionColors::new(&["KARA".to_string()]);
        assert_eq!(colors.color_for(Some("SAVANES")), Color32::GRAY);
        assert_ne!(colors.color_for(Some("KARA")), Color32::GRAY);
    }
}
