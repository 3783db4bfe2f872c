//! Analysis views of the master bus
//!
//! One view is active at a time (spectrum on start); it changes only when
//! a tab is selected. Each tick the renderer rasterizes the current
//! analyzer snapshot onto a `RenderSurface`. Drawing never fails outward:
//! a missing or zero-sized surface makes the frame a no-op.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::analyzer::AnalyzerSnapshot;

/// Number of level bands in the histogram view
pub const HISTOGRAM_BANDS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisView {
    #[default]
    Spectrum,
    Waveform,
    Histogram,
}

impl AnalysisView {
    pub const ALL: [AnalysisView; 3] = [
        AnalysisView::Spectrum,
        AnalysisView::Waveform,
        AnalysisView::Histogram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisView::Spectrum => "spectrum",
            AnalysisView::Waveform => "waveform",
            AnalysisView::Histogram => "histogram",
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spectrum" | "fft" => Ok(AnalysisView::Spectrum),
            "waveform" | "wave" | "scope" => Ok(AnalysisView::Waveform),
            "histogram" | "hist" => Ok(AnalysisView::Histogram),
            other => Err(format!("unknown analysis view '{}'", other)),
        }
    }
}

// =============================================================================
// Drawing surface
// =============================================================================

/// RGBA color, components 0..1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::from_rgb(0.0, 0.0, 0.0);

    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Hue in degrees, saturation and lightness 0..1
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = lightness - c / 2.0;

        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self::from_rgb(r + m, g + m, b + m)
    }
}

/// Target the renderer draws into (canvas, framebuffer, display list)
pub trait RenderSurface {
    /// Width and height in pixels
    fn size(&self) -> (f32, f32);

    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Color, width: f32);
}

/// One recorded drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        color: Color,
        width: f32,
    },
}

/// Surface that records operations instead of drawing them
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn rects(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Rect { .. }))
    }
}

impl RenderSurface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.ops.push(DrawOp::Rect { x, y, width, height, color });
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], color: Color, width: f32) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color,
            width,
        });
    }
}

// =============================================================================
// Renderer
// =============================================================================

const WAVEFORM_COLOR: Color = Color::from_rgb(0.24, 0.81, 0.56);

pub struct AnalysisRenderer {
    view: AnalysisView,
    points: Vec<(f32, f32)>,
    histogram: [usize; HISTOGRAM_BANDS],
    frames_drawn: u64,
}

impl Default for AnalysisRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisRenderer {
    pub fn new() -> Self {
        Self {
            view: AnalysisView::default(),
            points: Vec::new(),
            histogram: [0; HISTOGRAM_BANDS],
            frames_drawn: 0,
        }
    }

    pub fn view(&self) -> AnalysisView {
        self.view
    }

    /// Make `view` the active tab; returns whether it changed
    pub fn select(&mut self, view: AnalysisView) -> bool {
        if self.view == view {
            return false;
        }
        log::debug!("Analysis view {} -> {}", self.view, view);
        self.view = view;
        true
    }

    /// Bin counts per level band from the last histogram frame
    pub fn histogram(&self) -> &[usize; HISTOGRAM_BANDS] {
        &self.histogram
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Draw the active view of `snapshot`
    pub fn render(&mut self, snapshot: &AnalyzerSnapshot, surface: Option<&mut dyn RenderSurface>) {
        let Some(surface) = surface else {
            return;
        };
        let (width, height) = surface.size();
        if !(width > 0.0 && height > 0.0) {
            return;
        }

        surface.clear(Color::BLACK);
        match self.view {
            AnalysisView::Spectrum => draw_spectrum(surface, &snapshot.frequency, width, height),
            AnalysisView::Waveform => {
                self.trace_waveform(&snapshot.time_domain, width, height);
                surface.stroke_polyline(&self.points, WAVEFORM_COLOR, 2.0);
            }
            AnalysisView::Histogram => {
                self.histogram = snapshot.level_histogram();
                draw_histogram(surface, &self.histogram, snapshot.frequency.len(), width, height);
            }
        }
        self.frames_drawn += 1;
    }

    fn trace_waveform(&mut self, samples: &[f32], width: f32, height: f32) {
        self.points.clear();
        let step = width / samples.len().saturating_sub(1).max(1) as f32;
        self.points.extend(samples.iter().enumerate().map(|(i, s)| {
            let y = (1.0 - s.clamp(-1.0, 1.0)) * 0.5 * height;
            (i as f32 * step, y)
        }));
    }
}

// =============================================================================
// Drawing Helper Functions
// =============================================================================

/// One bar per bin, hue swept across the spectrum
fn draw_spectrum(surface: &mut dyn RenderSurface, bins: &[u8], width: f32, height: f32) {
    if bins.is_empty() {
        return;
    }
    let bar_width = width / bins.len() as f32;
    for (i, magnitude) in bins.iter().enumerate() {
        if *magnitude == 0 {
            continue;
        }
        let bar_height = *magnitude as f32 / 255.0 * height;
        let hue = i as f32 / bins.len() as f32 * 360.0;
        surface.fill_rect(
            i as f32 * bar_width,
            height - bar_height,
            bar_width,
            bar_height,
            Color::from_hsl(hue, 1.0, 0.5),
        );
    }
}

fn draw_histogram(
    surface: &mut dyn RenderSurface,
    counts: &[usize; HISTOGRAM_BANDS],
    total: usize,
    width: f32,
    height: f32,
) {
    if total == 0 {
        return;
    }
    let bar_width = width / HISTOGRAM_BANDS as f32;
    for (band, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let bar_height = *count as f32 / total as f32 * height;
        let hue = band as f32 / HISTOGRAM_BANDS as f32 * 360.0;
        surface.fill_rect(
            band as f32 * bar_width,
            height - bar_height,
            bar_width - 1.0,
            bar_height,
            Color::from_hsl(hue, 0.8, 0.55),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AnalyzerSnapshot {
        let mut frequency = vec![0u8; 256];
        frequency[0] = 255;
        frequency[10] = 128;
        let time_domain = (0..1024).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        AnalyzerSnapshot { frequency, time_domain }
    }

    #[test]
    fn test_single_active_view() {
        let mut renderer = AnalysisRenderer::new();
        assert_eq!(renderer.view(), AnalysisView::Spectrum);
        assert!(renderer.select(AnalysisView::Histogram));
        assert!(!renderer.select(AnalysisView::Histogram));
        assert_eq!(renderer.view(), AnalysisView::Histogram);
    }

    #[test]
    fn test_spectrum_bars() {
        let mut renderer = AnalysisRenderer::new();
        let mut surface = DisplayList::new(256.0, 100.0);
        renderer.render(&snapshot(), Some(&mut surface));

        let rects: Vec<_> = surface.rects().collect();
        assert_eq!(rects.len(), 2);
        match rects[0] {
            DrawOp::Rect { x, y, height, .. } => {
                assert_eq!(*x, 0.0);
                assert_eq!(*y, 0.0);
                assert_eq!(*height, 100.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_waveform_maps_range_to_height() {
        let mut renderer = AnalysisRenderer::new();
        renderer.select(AnalysisView::Waveform);
        let mut surface = DisplayList::new(1023.0, 50.0);
        renderer.render(&snapshot(), Some(&mut surface));

        let DrawOp::Polyline { points, .. } = &surface.ops()[1] else {
            panic!("expected polyline");
        };
        assert_eq!(points.len(), 1024);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[1], (1.0, 50.0));
        assert!((points[1023].0 - 1023.0).abs() < 1e-3);
    }

    #[test]
    fn test_histogram_bands() {
        let mut renderer = AnalysisRenderer::new();
        renderer.select(AnalysisView::Histogram);
        let mut surface = DisplayList::new(90.0, 90.0);
        renderer.render(&snapshot(), Some(&mut surface));

        let counts = renderer.histogram();
        assert_eq!(counts.iter().sum::<usize>(), 256);
        assert_eq!(counts[0], 254);
        assert_eq!(counts[4], 1);
        assert_eq!(counts[8], 1);
    }

    #[test]
    fn test_missing_surface_is_noop() {
        let mut renderer = AnalysisRenderer::new();
        renderer.render(&snapshot(), None);
        let mut empty = DisplayList::new(0.0, 0.0);
        renderer.render(&snapshot(), Some(&mut empty));
        assert!(empty.ops().is_empty());
        assert_eq!(renderer.frames_drawn(), 0);
    }

    #[test]
    fn test_hsl_primaries() {
        let red = Color::from_hsl(0.0, 1.0, 0.5);
        assert_eq!((red.r, red.g, red.b), (1.0, 0.0, 0.0));
        let blue = Color::from_hsl(240.0, 1.0, 0.5);
        assert!((blue.b - 1.0).abs() < 1e-6 && blue.r.abs() < 1e-6);
    }

    #[test]
    fn test_view_parse() {
        assert_eq!("Waveform".parse::<AnalysisView>(), Ok(AnalysisView::Waveform));
        assert!("bogus".parse::<AnalysisView>().is_err());
    }
}
