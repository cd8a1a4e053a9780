//! # Aggregation Engine
//!
//! Bins (retention time, m/z, intensity) points into a dense grid for
//! rendering.
//!
//! - Grid size follows data density: the retention-time axis gets one bin per
//!   spectrum and the m/z axis [`AggregationConfig::mz_bins_per_unit`] bins per
//!   unit m/z, both scaled by [`Quality`] and clamped to
//!   `[min_resolution, max_resolution]`.
//! - Cells hold `log10` of their summed intensity; empty cells hold exactly `0`.
//! - Sums do not depend on input order: contributions to a cell are added in
//!   sorted order.
//!
//! Precursor markers and the highlight/query rectangles are carried next to the
//! grid as overlays and are never binned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::query::PeakSet;
use crate::scan::{PeakPoint, PrecursorMarker, RtWindow};

#[cfg(test)]
mod tests;

/// Coarse/medium/fine resolution knob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Half the density-derived resolution
    Coarse,
    /// Density-derived resolution
    #[default]
    Medium,
    /// Twice the density-derived resolution
    Fine,
}

impl Quality {
    /// Resolution multiplier
    pub fn multiplier(self) -> f64 {
        match self {
            Quality::Coarse => 0.5,
            Quality::Medium => 1.0,
            Quality::Fine => 2.0,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Coarse => write!(f, "coarse"),
            Quality::Medium => write!(f, "medium"),
            Quality::Fine => write!(f, "fine"),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coarse" | "low" => Ok(Quality::Coarse),
            "medium" | "default" => Ok(Quality::Medium),
            "fine" | "high" => Ok(Quality::Fine),
            other => Err(format!("unknown quality '{other}'")),
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Fewest bins per axis
    pub min_resolution: usize,
    /// Most bins per axis
    pub max_resolution: usize,
    /// Resolution knob
    pub quality: Quality,
    /// m/z bins per unit m/z at medium quality
    pub mz_bins_per_unit: f64,
    /// Precursor markers are dropped entirely above this count
    pub marker_limit: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_resolution: 100,
            max_resolution: 1_000,
            quality: Quality::Medium,
            mz_bins_per_unit: 1.0,
            marker_limit: 5_000,
        }
    }
}

impl AggregationConfig {
    fn clamp(&self, bins: f64) -> usize {
        let min = self.min_resolution.max(1);
        let max = self.max_resolution.max(min);
        if !bins.is_finite() || bins <= 0.0 {
            return min;
        }
        (bins as usize).clamp(min, max)
    }
}

/// Axis-aligned rectangle in (retention time, m/z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Lower retention time (minutes)
    pub rt_min: f64,
    /// Upper retention time (minutes)
    pub rt_max: f64,
    /// Lower m/z
    pub mz_min: f64,
    /// Upper m/z
    pub mz_max: f64,
}

impl Rect {
    /// Rectangle with bounds given in any order
    pub fn new(rt: (f64, f64), mz: (f64, f64)) -> Self {
        Self {
            rt_min: rt.0.min(rt.1),
            rt_max: rt.0.max(rt.1),
            mz_min: mz.0.min(mz.1),
            mz_max: mz.0.max(mz.1),
        }
    }

    /// Retention-time extent as a window
    pub fn window(&self) -> RtWindow {
        RtWindow::new(self.rt_min, self.rt_max)
    }

    /// Inclusive membership test
    pub fn contains(&self, rt: f64, mz: f64) -> bool {
        rt >= self.rt_min && rt <= self.rt_max && mz >= self.mz_min && mz <= self.mz_max
    }
}

/// Dense grid of log-compressed summed intensity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationGrid {
    /// Retention-time bins
    pub width: usize,
    /// m/z bins
    pub height: usize,
    /// `width + 1` retention-time bin boundaries
    pub rt_edges: Vec<f64>,
    /// `height + 1` m/z bin boundaries
    pub mz_edges: Vec<f64>,
    /// Row-major cells, one row per m/z bin
    pub values: Vec<f64>,
}

impl AggregationGrid {
    /// Cell at (`rt_bin`, `mz_bin`)
    pub fn value(&self, rt_bin: usize, mz_bin: usize) -> Option<f64> {
        if rt_bin >= self.width || mz_bin >= self.height {
            return None;
        }
        self.values.get(mz_bin * self.width + rt_bin).copied()
    }

    /// Cells that received intensity
    pub fn occupied(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }
}

/// Grid dimensions (`width`, `height`) for the given data density
pub fn grid_shape(spectra: usize, mz_span: f64, config: &AggregationConfig) -> (usize, usize) {
    let q = config.quality.multiplier();
    let width = config.clamp((spectra as f64 * q).round());
    let height = config.clamp((mz_span * config.mz_bins_per_unit * q).ceil());
    (width, height)
}

fn edges(low: f64, high: f64, bins: usize) -> Vec<f64> {
    let step = (high - low) / bins as f64;
    (0..=bins).map(|i| low + step * i as f64).collect()
}

fn bin(value: f64, low: f64, high: f64, bins: usize) -> usize {
    let span = high - low;
    if span <= 0.0 {
        return 0;
    }
    let position = ((value - low) / span * bins as f64).floor();
    (position.max(0.0) as usize).min(bins - 1)
}

/// Bin `points` inside `bounds` into a `width` x `height` grid
///
/// Points outside `bounds` are ignored; the upper bounds are inclusive.
pub fn aggregate(points: &[PeakPoint], bounds: &Rect, width: usize, height: usize) -> AggregationGrid {
    let width = width.max(1);
    let height = height.max(1);

    let mut contributions: Vec<(usize, f32)> = points
        .iter()
        .filter(|p| bounds.contains(p.rt, p.mz))
        .map(|p| {
            let x = bin(p.rt, bounds.rt_min, bounds.rt_max, width);
            let y = bin(p.mz, bounds.mz_min, bounds.mz_max, height);
            (y * width + x, p.intensity)
        })
        .collect();
    contributions.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut sums = vec![0.0f64; width * height];
    for (cell, intensity) in contributions {
        sums[cell] += intensity as f64;
    }
    let values = sums
        .into_iter()
        .map(|sum| if sum > 0.0 { sum.log10() } else { 0.0 })
        .collect();

    AggregationGrid {
        width,
        height,
        rt_edges: edges(bounds.rt_min, bounds.rt_max, width),
        mz_edges: edges(bounds.mz_min, bounds.mz_max, height),
        values,
    }
}

/// What an overlay rectangle marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// Region chosen by the caller
    Highlight,
    /// Bounds the grid was built for
    QueryBounds,
}

/// Fixed-geometry rectangle drawn over the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overlay {
    /// Meaning of the rectangle
    pub kind: OverlayKind,
    /// Geometry
    pub rect: Rect,
}

/// Everything needed to render a 2D map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// Binned MS1 intensity
    pub grid: AggregationGrid,
    /// Precursor events inside the bounds; `None` when there were too many to draw
    pub precursor_markers: Option<Vec<PrecursorMarker>>,
    /// Highlight and query rectangles
    pub overlays: Vec<Overlay>,
}

/// Build a map of `peaks` over `bounds`
pub fn build_map(
    peaks: &PeakSet,
    bounds: Rect,
    highlight: Option<Rect>,
    config: &AggregationConfig,
) -> MapView {
    let (width, height) = grid_shape(peaks.spectra, bounds.mz_max - bounds.mz_min, config);
    let grid = aggregate(&peaks.points, &bounds, width, height);

    let markers: Vec<PrecursorMarker> = peaks
        .precursors
        .iter()
        .filter(|m| bounds.contains(m.rt, m.precursor_mz))
        .copied()
        .collect();
    let precursor_markers = if markers.len() > config.marker_limit {
        log::info!(
            "Suppressing {} precursor markers (limit {})",
            markers.len(),
            config.marker_limit
        );
        None
    } else {
        Some(markers)
    };

    let mut overlays = Vec::with_capacity(2);
    if let Some(rect) = highlight {
        overlays.push(Overlay {
            kind: OverlayKind::Highlight,
            rect,
        });
    }
    overlays.push(Overlay {
        kind: OverlayKind::QueryBounds,
        rect: bounds,
    });

    log::debug!(
        "Built {width}x{height} map from {} peaks of {} spectra",
        peaks.points.len(),
        peaks.spectra
    );
    MapView {
        grid,
        precursor_markers,
        overlays,
    }
}
