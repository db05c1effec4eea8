//! Color ramps for contour fills and colorbars.
//!
//! A [`ColorMap`] is an ordered list of `(position, RGB)` control points
//! with linear interpolation between them, the same model as a ParaView
//! colormap export. The built-in ramps are plain constructors; callers
//! that want a custom ramp load one explicitly with
//! [`ColorMap::from_json_path`] and pass it in — there is no process-wide
//! resource registry.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::DataError;

/// One control point of a ramp: position in [0, 1] and RGB in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f64,
    pub rgb: [f64; 3],
}

/// A named color ramp sampled by linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    pub name: String,
    /// Control points in ascending position order, at least two.
    pub stops: Vec<ColorStop>,
}

/// On-disk shape of a ParaView JSON colormap entry.
#[derive(Deserialize)]
struct ParaViewEntry {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "RGBPoints")]
    rgb_points: Vec<f64>,
}

impl ColorMap {
    /// Build a ramp from explicit control points.
    pub fn new(name: impl Into<String>, stops: Vec<ColorStop>) -> Result<Self, DataError> {
        if stops.len() < 2 {
            return Err(DataError::colormap("a ramp needs at least 2 control points"));
        }
        if stops.windows(2).any(|w| w[1].position < w[0].position) {
            return Err(DataError::colormap("control points must be position-sorted"));
        }
        Ok(Self {
            name: name.into(),
            stops,
        })
    }

    /// The ramp used for absolute Cp subplots: classic blue-to-red jet.
    pub fn default_absolute() -> Self {
        Self {
            name: "jet".to_string(),
            stops: vec![
                ColorStop { position: 0.0, rgb: [0.0, 0.0, 0.5] },
                ColorStop { position: 0.125, rgb: [0.0, 0.0, 1.0] },
                ColorStop { position: 0.375, rgb: [0.0, 1.0, 1.0] },
                ColorStop { position: 0.625, rgb: [1.0, 1.0, 0.0] },
                ColorStop { position: 0.875, rgb: [1.0, 0.0, 0.0] },
                ColorStop { position: 1.0, rgb: [0.5, 0.0, 0.0] },
            ],
        }
    }

    /// The diverging ramp used for delta subplots: cool gray warm.
    pub fn default_delta() -> Self {
        Self {
            name: "cool-warm".to_string(),
            stops: vec![
                ColorStop { position: 0.0, rgb: [0.2314, 0.2980, 0.7529] },
                ColorStop { position: 0.5, rgb: [0.8667, 0.8667, 0.8667] },
                ColorStop { position: 1.0, rgb: [0.7059, 0.0157, 0.1490] },
            ],
        }
    }

    /// Parse a ParaView JSON colormap (an array of entries; the first is
    /// used). Control-point positions are normalized into [0, 1].
    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        let entries: Vec<ParaViewEntry> = serde_json::from_str(text)
            .map_err(|e| DataError::colormap(format!("JSON parse failed: {}", e)))?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DataError::colormap("colormap file contains no entries"))?;

        if entry.rgb_points.len() < 8 || entry.rgb_points.len() % 4 != 0 {
            return Err(DataError::colormap(format!(
                "RGBPoints must be (x, r, g, b) quadruples, got {} values",
                entry.rgb_points.len()
            )));
        }

        let mut stops: Vec<ColorStop> = entry
            .rgb_points
            .chunks_exact(4)
            .map(|q| ColorStop {
                position: q[0],
                rgb: [q[1], q[2], q[3]],
            })
            .collect();

        if stops.windows(2).any(|w| w[1].position < w[0].position) {
            return Err(DataError::colormap("RGBPoints positions must be ascending"));
        }

        // ParaView exports positions in data units; rescale to [0, 1].
        let lo = stops.first().map(|s| s.position).unwrap_or(0.0);
        let hi = stops.last().map(|s| s.position).unwrap_or(1.0);
        let span = hi - lo;
        if span > 0.0 {
            for stop in &mut stops {
                stop.position = (stop.position - lo) / span;
            }
        }

        Self::new(entry.name.unwrap_or_else(|| "colormap".to_string()), stops)
    }

    /// Load a ParaView JSON colormap from disk.
    pub fn from_json_path(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Sample the ramp at `t` in [0, 1] (clamped), as 8-bit RGB.
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);

        let mut lower = self.stops[0];
        let mut upper = *self.stops.last().expect("at least 2 stops");
        for w in self.stops.windows(2) {
            if t >= w[0].position && t <= w[1].position {
                lower = w[0];
                upper = w[1];
                break;
            }
        }

        let span = upper.position - lower.position;
        let f = if span > 0.0 { (t - lower.position) / span } else { 0.0 };
        let mut rgb = [0u8; 3];
        for k in 0..3 {
            let c = lower.rgb[k] + (upper.rgb[k] - lower.rgb[k]) * f;
            rgb[k] = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        rgb
    }
}
