//! Attention heatmap rendering
//!
//! Gaze points are splatted onto a per-pixel density field with a linear
//! radial falloff, the field is normalized by its maximum, and each normalized
//! value is mapped through a four-stop ramp:
//!
//! | normalized value | red      | green    | blue     | alpha     |
//! |------------------|----------|----------|----------|-----------|
//! | `[0, 0.25)`      | 0        | 0        | 0 → 255  | 0 → 128   |
//! | `[0.25, 0.5)`    | 0        | 0 → 255  | 255 → 0  | 128 → 192 |
//! | `[0.5, 0.75)`    | 0 → 255  | 255      | 0        | 192 → 224 |
//! | `[0.75, 1]`      | 255      | 255 → 0  | 0        | 224       |
//!
//! The engine only produces an RGBA buffer; drawing it is up to the caller.

use crate::types::GazePoint;
use serde::{Deserialize, Serialize};

/// Default splat radius in pixels
pub const DEFAULT_RADIUS: u32 = 30;

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: usize = 900;

/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: usize = 500;

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Densities are accumulated as integers scaled by 2^32. Integer addition is
/// associative, so the field does not depend on the order of the points.
const FIXED_POINT_SCALE: f64 = 4_294_967_296.0;

/// Heatmap geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub width: usize,
    pub height: usize,
    /// Falloff radius; 0 is treated as 1
    pub radius: u32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            radius: DEFAULT_RADIUS,
        }
    }
}

/// Per-pixel accumulated gaze density
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityField {
    width: usize,
    height: usize,
    cells: Vec<u64>,
}

impl DensityField {
    /// Zeroed field of the given size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Density at a cell, `None` outside the field
    pub fn value(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x] as f64 / FIXED_POINT_SCALE)
    }

    /// Largest density in the field (0 for an empty field)
    pub fn max_value(&self) -> f64 {
        self.max_raw() as f64 / FIXED_POINT_SCALE
    }

    fn max_raw(&self) -> u64 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Density values scaled into `[0, 1]`, row-major.
    ///
    /// An all-zero field is divided by 1 instead of its maximum, so it stays
    /// all zero.
    pub fn normalized(&self) -> impl Iterator<Item = f64> + '_ {
        let max = match self.max_raw() {
            0 => 1.0,
            m => m as f64,
        };
        self.cells.iter().map(move |&c| c as f64 / max)
    }

    /// Add one splat centred on `(cx, cy)`, clipped to the field
    fn splat(&mut self, cx: i64, cy: i64, kernel: &Kernel) {
        let r = kernel.radius as i64;
        let (w, h) = (self.width as i64, self.height as i64);

        let x0 = (cx - r).max(0);
        let x1 = (cx + r).min(w - 1);
        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(h - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }

        for py in y0..=y1 {
            let row = (py * w) as usize;
            let ky = (py - cy + r) as usize;
            for px in x0..=x1 {
                let kx = (px - cx + r) as usize;
                let weight = kernel.weights[ky * kernel.side + kx];
                let cell = &mut self.cells[row + px as usize];
                *cell = cell.saturating_add(weight);
            }
        }
    }
}

/// Precomputed linear falloff weights over the `(2r+1)²` neighbourhood
struct Kernel {
    radius: u32,
    side: usize,
    weights: Vec<u64>,
}

impl Kernel {
    fn linear(radius: u32) -> Self {
        let r = radius as i64;
        let side = (2 * r + 1) as usize;
        let mut weights = Vec::with_capacity(side * side);
        for dy in -r..=r {
            for dx in -r..=r {
                let distance = ((dx * dx + dy * dy) as f64).sqrt();
                let intensity = (1.0 - distance / radius as f64).max(0.0);
                weights.push((intensity * FIXED_POINT_SCALE).round() as u64);
            }
        }
        Self {
            radius,
            side,
            weights,
        }
    }
}

/// Row-major RGBA pixel buffer, 4 bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// RGBA value at a pixel, `None` outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// True when every pixel has zero alpha
    pub fn is_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Density-to-color renderer for gaze points
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapEngine {
    config: HeatmapConfig,
}

impl HeatmapEngine {
    pub fn new(config: HeatmapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Accumulate the density field for a set of gaze points.
    ///
    /// Points snap to the nearest pixel, halves rounding up (-0.5 lands on 0).
    /// Non-finite points and the
    /// parts of a splat that fall outside the canvas contribute nothing.
    pub fn density(&self, points: &[GazePoint]) -> DensityField {
        let HeatmapConfig { width, height, .. } = self.config;
        let radius = self.config.radius.max(1);
        let mut field = DensityField::new(width, height);
        if width == 0 || height == 0 || points.is_empty() {
            return field;
        }

        let kernel = Kernel::linear(radius);
        let r = radius as f64;
        for point in points {
            if !point.x.is_finite() || !point.y.is_finite() {
                continue;
            }
            let (x, y) = (round_half_up(point.x), round_half_up(point.y));
            // Splat cannot reach the canvas; also keeps the i64 casts in range
            if x < -r || y < -r || x > width as f64 + r || y > height as f64 + r {
                continue;
            }
            field.splat(x as i64, y as i64, &kernel);
        }
        field
    }

    /// Render gaze points into an RGBA buffer of the configured size
    pub fn render(&self, points: &[GazePoint]) -> RgbaBuffer {
        Self::colorize(&self.density(points))
    }

    /// Map an existing density field through the color ramp
    pub fn colorize(field: &DensityField) -> RgbaBuffer {
        let mut pixels = Vec::with_capacity(field.width * field.height * 4);
        for value in field.normalized() {
            pixels.extend_from_slice(&gradient(value));
        }
        RgbaBuffer {
            width: field.width,
            height: field.height,
            pixels,
        }
    }
}

/// Map a normalized density in `[0, 1]` to RGBA
pub fn gradient(value: f64) -> [u8; 4] {
    let v = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };

    if v < 0.25 {
        let t = v / 0.25;
        [0, 0, channel(255.0 * t), channel(128.0 * t)]
    } else if v < 0.5 {
        let t = (v - 0.25) / 0.25;
        [
            0,
            channel(255.0 * t),
            channel(255.0 * (1.0 - t)),
            channel(128.0 + 64.0 * t),
        ]
    } else if v < 0.75 {
        let t = (v - 0.5) / 0.25;
        [channel(255.0 * t), 255, 0, channel(192.0 + 32.0 * t)]
    } else {
        let t = (v - 0.75) / 0.25;
        [255, channel(255.0 * (1.0 - t)), 0, 224]
    }
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
