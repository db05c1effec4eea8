//! Stacked contour-figure rendering.
//!
//! A render request is an ordered list of [`PlotSpec`]s sharing one grid.
//! Each spec becomes one subplot row, drawn top to bottom: boundary
//! outline, filled contour bands, black iso-lines, and a labelled
//! colorbar. Every row uses the same padded spatial extent so the shapes
//! are visually comparable. The result is an in-memory [`Figure`];
//! writing it to disk is a separate step.
//!
//! Because the field varies linearly over each triangle, the portion of a
//! triangle inside one contour band is a convex polygon recovered by
//! clipping the triangle in value space; iso-lines are the straight
//! segments where a level crosses a triangle.

use std::path::Path;

use plotters::prelude::*;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::types::{PlotSpec, SurfaceGrid};

/// Options for figure assembly.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Figure size in pixels.
    pub width: u32,
    pub height: u32,

    /// World-unit padding added around the grid's bounding box on every
    /// side of every subplot.
    pub margin: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            margin: 0.5,
        }
    }
}

/// Per-subplot metadata kept alongside the rendered pixels.
#[derive(Debug, Clone)]
pub struct SubplotInfo {
    pub title: String,
    pub colorbar_label: String,
    /// World extent `((x0, x1), (y0, y1))`; identical for every subplot
    /// of a figure.
    pub extent: ((f64, f64), (f64, f64)),
}

/// A finished figure: RGB pixels plus the subplot layout that produced
/// them.
#[derive(Debug, Clone)]
pub struct Figure {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    subplots: Vec<SubplotInfo>,
}

impl Figure {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn subplot_count(&self) -> usize {
        self.subplots.len()
    }

    pub fn subplots(&self) -> &[SubplotInfo] {
        &self.subplots
    }

    /// The shared world extent of all subplots.
    pub fn extent(&self) -> ((f64, f64), (f64, f64)) {
        self.subplots[0].extent
    }

    /// Raw RGB8 pixel data, row-major, 3 bytes per pixel.
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// Encode the figure as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.rgb.clone())
            .ok_or_else(|| RenderError::backend("pixel buffer size mismatch"))?;
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| RenderError::backend(e.to_string()))?;
        Ok(bytes)
    }

    /// Write the figure to a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes).map_err(|e| RenderError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Render one figure with one subplot row per spec, in spec order.
pub fn render(
    grid: &SurfaceGrid,
    specs: &[PlotSpec],
    opts: &RenderOptions,
) -> Result<Figure, RenderError> {
    if specs.is_empty() {
        return Err(RenderError::NoPlots);
    }
    for spec in specs {
        if spec.field.len() != grid.vertex_count() {
            return Err(RenderError::FieldMismatch {
                field_len: spec.field.len(),
                vertex_count: grid.vertex_count(),
            });
        }
    }

    let extent = grid
        .extent(opts.margin)
        .ok_or_else(|| RenderError::backend("grid has no vertices"))?;

    let mut rgb = vec![255u8; (opts.width * opts.height * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut rgb, (opts.width, opts.height)).into_drawing_area();
        root.fill(&WHITE).map_err(to_backend)?;

        let row_height = opts.height / specs.len() as u32;
        for (row, spec) in specs.iter().enumerate() {
            let top = row as u32 * row_height;
            draw_subplot(&root, grid, spec, extent, 0, top, opts.width, row_height)?;
        }

        root.present().map_err(to_backend)?;
    }

    debug!(
        subplots = specs.len(),
        width = opts.width,
        height = opts.height,
        "Rendered figure"
    );

    Ok(Figure {
        width: opts.width,
        height: opts.height,
        rgb,
        subplots: specs
            .iter()
            .map(|spec| SubplotInfo {
                title: spec.title.clone(),
                colorbar_label: spec.scale.label.clone(),
                extent,
            })
            .collect(),
    })
}

type Backend<'a> = BitMapBackend<'a>;
type Area<'a> = DrawingArea<Backend<'a>, plotters::coord::Shift>;

fn to_backend<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::backend(e.to_string())
}

const TITLE_BAND: i32 = 26;
const SIDE_PAD: i32 = 30;
const COLORBAR_RESERVE: i32 = 140;
const COLORBAR_WIDTH: i32 = 24;

#[allow(clippy::too_many_arguments)]
fn draw_subplot(
    root: &Area<'_>,
    grid: &SurfaceGrid,
    spec: &PlotSpec,
    extent: ((f64, f64), (f64, f64)),
    left: u32,
    top: u32,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let (left, top) = (left as i32, top as i32);
    let (width, height) = (width as i32, height as i32);

    // Plot region inside the row: title band on top, colorbar reserve on
    // the right, small pads elsewhere. No frame, no ticks.
    let plot_left = left + SIDE_PAD;
    let plot_top = top + TITLE_BAND;
    let plot_right = left + width - COLORBAR_RESERVE;
    let plot_bottom = top + height - 8;
    let plot_w = (plot_right - plot_left).max(1) as f64;
    let plot_h = (plot_bottom - plot_top).max(1) as f64;

    // Equal-aspect world-to-pixel mapping, centered in the plot region.
    let ((x0, x1), (y0, y1)) = extent;
    let scale = (plot_w / (x1 - x0)).min(plot_h / (y1 - y0));
    let cx = (plot_left + plot_right) as f64 / 2.0;
    let cy = (plot_top + plot_bottom) as f64 / 2.0;
    let to_px = |x: f64, y: f64| -> (i32, i32) {
        (
            (cx + (x - (x0 + x1) / 2.0) * scale).round() as i32,
            // Pixel y grows downward.
            (cy - (y - (y0 + y1) / 2.0) * scale).round() as i32,
        )
    };

    // Title, centered over the plot region.
    let title_style = ("sans-serif", 16).into_font().color(&BLACK);
    let tw = root
        .estimate_text_size(&spec.title, &title_style)
        .map(|(w, _)| w as i32)
        .unwrap_or(8 * spec.title.len() as i32);
    draw_label(
        root,
        &spec.title,
        (((plot_left + plot_right) / 2) - tw / 2, top + 6),
        16,
    );

    let levels = spec.scale.level_values();
    let bands = contour_bands(&levels, spec);

    // Filled bands, one clipped polygon per triangle per band.
    for &[a, b, c] in &grid.triangles {
        let corners = [
            grid.project(&grid.points[a as usize]),
            grid.project(&grid.points[b as usize]),
            grid.project(&grid.points[c as usize]),
        ];
        let values = [
            spec.field.values[a as usize],
            spec.field.values[b as usize],
            spec.field.values[c as usize],
        ];
        let tri_min = values[0].min(values[1]).min(values[2]);
        let tri_max = values[0].max(values[1]).max(values[2]);

        for band in &bands {
            if tri_max < band.lower || tri_min > band.upper {
                continue;
            }
            let clipped = clip_band(&corners, &values, band.lower, band.upper);
            if clipped.len() < 3 {
                continue;
            }
            let pixels: Vec<(i32, i32)> =
                clipped.iter().map(|&(x, y)| to_px(x, y)).collect();
            root.draw(&Polygon::new(pixels, band.color.filled()))
                .map_err(to_backend)?;
        }

        // Iso-lines at every level crossing this triangle.
        for &level in &levels {
            if level <= tri_min || level >= tri_max {
                continue;
            }
            if let Some((p, q)) = level_segment(&corners, &values, level) {
                root.draw(&PathElement::new(
                    vec![to_px(p.0, p.1), to_px(q.0, q.1)],
                    BLACK.stroke_width(1),
                ))
                .map_err(to_backend)?;
            }
        }
    }

    // Closed boundary outline, if the grid has one.
    if !grid.boundary.is_empty() {
        let outline: Vec<(i32, i32)> = grid
            .boundary
            .iter()
            .map(|p| {
                let (x, y) = grid.project(p);
                to_px(x, y)
            })
            .collect();
        root.draw(&PathElement::new(outline, BLACK.stroke_width(1)))
            .map_err(to_backend)?;
    }

    draw_colorbar(root, spec, &bands, plot_right, plot_top, plot_bottom)
}

/// One fill band: value range plus the color it is painted with.
struct Band {
    lower: f64,
    upper: f64,
    color: RGBColor,
}

/// Build the fill bands for a scale: one band between each consecutive
/// level pair, plus the two clamp bands that extend the end colors to
/// out-of-bounds values ("extend both").
fn contour_bands(levels: &[f64], spec: &PlotSpec) -> Vec<Band> {
    let ramp = |t: f64| {
        let [r, g, b] = spec.scale.colormap.sample(t);
        RGBColor(r, g, b)
    };

    let mut bands = Vec::with_capacity(levels.len() + 1);
    bands.push(Band {
        lower: f64::NEG_INFINITY,
        upper: levels[0],
        color: ramp(0.0),
    });
    for w in levels.windows(2) {
        bands.push(Band {
            lower: w[0],
            upper: w[1],
            color: ramp(spec.scale.normalize((w[0] + w[1]) / 2.0)),
        });
    }
    bands.push(Band {
        lower: *levels.last().expect("at least 2 levels"),
        upper: f64::INFINITY,
        color: ramp(1.0),
    });
    bands
}

/// Clip a triangle to the region where its linear field lies in
/// `[lower, upper]`. Sutherland-Hodgman in value space; the result is a
/// convex polygon with 0 to 5 corners.
fn clip_band(
    corners: &[(f64, f64); 3],
    values: &[f64; 3],
    lower: f64,
    upper: f64,
) -> Vec<(f64, f64)> {
    let mut poly: Vec<((f64, f64), f64)> = corners
        .iter()
        .zip(values)
        .map(|(&p, &v)| (p, v))
        .collect();

    if lower.is_finite() {
        poly = clip_half(&poly, lower, true);
    }
    if upper.is_finite() {
        poly = clip_half(&poly, upper, false);
    }
    poly.into_iter().map(|(p, _)| p).collect()
}

/// Keep the part of a polygon where `value >= level` (`keep_above`) or
/// `value <= level`.
fn clip_half(
    poly: &[((f64, f64), f64)],
    level: f64,
    keep_above: bool,
) -> Vec<((f64, f64), f64)> {
    let inside = |v: f64| if keep_above { v >= level } else { v <= level };
    let mut out = Vec::with_capacity(poly.len() + 1);

    for i in 0..poly.len() {
        let (pa, va) = poly[i];
        let (pb, vb) = poly[(i + 1) % poly.len()];
        if inside(va) {
            out.push((pa, va));
        }
        if inside(va) != inside(vb) {
            // Edge crosses the level; the field is linear along it.
            let t = (level - va) / (vb - va);
            let p = (pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1));
            out.push((p, level));
        }
    }
    out
}

/// The straight segment where `level` crosses a triangle, or None when
/// the level only grazes a vertex.
fn level_segment(
    corners: &[(f64, f64); 3],
    values: &[f64; 3],
    level: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let mut hits = Vec::with_capacity(2);
    for i in 0..3 {
        let (pa, va) = (corners[i], values[i]);
        let (pb, vb) = (corners[(i + 1) % 3], values[(i + 1) % 3]);
        if (va - level) * (vb - level) < 0.0 {
            let t = (level - va) / (vb - va);
            hits.push((pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1)));
        }
    }
    if hits.len() == 2 {
        Some((hits[0], hits[1]))
    } else {
        None
    }
}

fn draw_colorbar(
    root: &Area<'_>,
    spec: &PlotSpec,
    bands: &[Band],
    plot_right: i32,
    plot_top: i32,
    plot_bottom: i32,
) -> Result<(), RenderError> {
    let bar_left = plot_right + 40;
    let bar_right = bar_left + COLORBAR_WIDTH;
    let bar_top = plot_top + 10;
    let bar_bottom = plot_bottom - 10;
    let bar_h = (bar_bottom - bar_top).max(1);

    // Interior bands only; the clamp bands are implied by the end colors.
    let interior = &bands[1..bands.len() - 1];
    let n = interior.len().max(1) as i32;
    for (i, band) in interior.iter().enumerate() {
        // Low values at the bottom.
        let y1 = bar_bottom - (i as i32 * bar_h) / n;
        let y0 = bar_bottom - ((i as i32 + 1) * bar_h) / n;
        root.draw(&Rectangle::new(
            [(bar_left, y0), (bar_right, y1)],
            band.color.filled(),
        ))
        .map_err(to_backend)?;
    }
    root.draw(&Rectangle::new(
        [(bar_left, bar_top), (bar_right, bar_bottom)],
        BLACK.stroke_width(1),
    ))
    .map_err(to_backend)?;

    draw_label(root, &spec.scale.label, (bar_left, bar_top - 18), 14);
    draw_label(
        root,
        &format!("{:.2}", spec.scale.bounds.1),
        (bar_right + 6, bar_top - 6),
        14,
    );
    draw_label(
        root,
        &format!("{:.2}", spec.scale.bounds.0),
        (bar_right + 6, bar_bottom - 6),
        14,
    );

    Ok(())
}

/// Draw a text label, degrading to a warning when font discovery fails;
/// headless machines without system fonts still get their contours.
fn draw_label(root: &Area<'_>, text: &str, pos: (i32, i32), size: u32) {
    let style = ("sans-serif", size).into_font().color(&BLACK);
    if let Err(e) = root.draw(&Text::new(text.to_string(), pos, style)) {
        warn!("label {:?} not drawn: {}", text, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorScale, VertexField};
    use nalgebra::Point3;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn square_grid() -> SurfaceGrid {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let boundary = vec![
            points[0], points[1], points[2], points[3], points[0],
        ];
        SurfaceGrid {
            points,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            axes: [0, 1],
            boundary,
        }
    }

    fn spec_with(values: Vec<f64>, title: &str) -> PlotSpec {
        PlotSpec::new(VertexField::new(values), ColorScale::default(), title)
    }

    #[test]
    fn test_empty_specs_fail_fast() {
        let err = render(&square_grid(), &[], &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::NoPlots));
    }

    #[test]
    fn test_field_mismatch_reports_counts() {
        let spec = spec_with(vec![0.1, 0.2], "bad");
        let err = render(&square_grid(), &[spec], &RenderOptions::default()).unwrap_err();
        match err {
            RenderError::FieldMismatch {
                field_len,
                vertex_count,
            } => {
                assert_eq!(field_len, 2);
                assert_eq!(vertex_count, 4);
            }
            other => panic!("expected FieldMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_subplot_count_and_shared_extent() {
        let grid = square_grid();
        let specs = vec![
            spec_with(vec![0.1, 0.2, 0.3, 0.4], "a"),
            spec_with(vec![0.4, 0.3, 0.2, 0.1], "b"),
            spec_with(vec![0.0, 0.0, 0.1, 0.1], "c"),
        ];
        let figure = render(&grid, &specs, &RenderOptions::default()).unwrap();
        assert_eq!(figure.subplot_count(), 3);

        let shared = figure.extent();
        for sub in figure.subplots() {
            assert_eq!(sub.extent, shared);
        }
        // Extent is the bbox padded by the 0.5 default margin.
        assert!(approx_eq(shared.0 .0, -0.5) && approx_eq(shared.0 .1, 1.5));
    }

    #[test]
    fn test_colorbar_label_recorded() {
        let grid = square_grid();
        let mut spec = spec_with(vec![0.1, 0.2, 0.3, 0.4], "target");
        spec.scale.label = "dCp".to_string();
        let figure = render(&grid, &[spec], &RenderOptions::default()).unwrap();
        assert_eq!(figure.subplots()[0].colorbar_label, "dCp");
    }

    #[test]
    fn test_figure_has_nonwhite_pixels() {
        let grid = square_grid();
        let spec = spec_with(vec![0.1, 0.3, 0.5, 0.7], "fill");
        let figure = render(&grid, &[spec], &RenderOptions::default()).unwrap();
        assert!(figure.rgb().iter().any(|&b| b != 255));
    }

    #[test]
    fn test_out_of_bounds_values_still_fill() {
        // Every value sits outside the scale bounds; the clamp bands must
        // paint them with the ramp end colors rather than leaving the
        // surface blank.
        let grid = square_grid();
        let spec = spec_with(vec![-5.0, -5.0, 9.0, 9.0], "clamped");
        let figure = render(&grid, &[spec], &RenderOptions::default()).unwrap();
        assert!(figure.rgb().iter().any(|&b| b != 255));
    }

    #[test]
    fn test_clip_band_whole_triangle() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let values = [0.2, 0.4, 0.6];
        let poly = clip_band(&corners, &values, 0.0, 1.0);
        assert_eq!(poly.len(), 3);
    }

    #[test]
    fn test_clip_band_half_triangle() {
        // Field peaks at the right-hand vertex; the band [0.5, 1.0] keeps
        // the corner triangle past the midline.
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let values = [0.0, 1.0, 0.0];
        let poly = clip_band(&corners, &values, 0.5, 1.0);
        assert_eq!(poly.len(), 3);
        for &(x, _) in &poly {
            assert!(x >= 0.5 - 1e-12);
        }
    }

    #[test]
    fn test_clip_band_outside_range_is_empty() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let values = [0.0, 0.1, 0.2];
        assert!(clip_band(&corners, &values, 0.5, 1.0).is_empty());
    }

    #[test]
    fn test_level_segment_midline() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let values = [0.0, 1.0, 0.0];
        let (p, q) = level_segment(&corners, &values, 0.5).expect("crossing");
        assert!(approx_eq(p.0, 0.5) && approx_eq(q.0, 0.5));
    }

    #[test]
    fn test_level_segment_missing_when_no_crossing() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let values = [0.0, 0.1, 0.2];
        assert!(level_segment(&corners, &values, 0.9).is_none());
    }

    #[test]
    fn test_encode_png_signature() {
        let grid = square_grid();
        let spec = spec_with(vec![0.1, 0.2, 0.3, 0.4], "png");
        let figure = render(&grid, &[spec], &RenderOptions::default()).unwrap();
        let bytes = figure.encode_png().unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
