//! Interpolation-grid loading: STL parsing, projection-plane inference and
//! boundary extraction.

use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

use crate::error::MeshLoadError;
use crate::perimeter::sort_perimeter;
use crate::tracing_ext::OperationTimer;
use crate::types::{SurfaceGrid, Triangle};

/// Load an interpolation grid from an STL file (binary or ASCII).
pub fn load_grid(path: &Path) -> Result<SurfaceGrid, MeshLoadError> {
    let _timer = OperationTimer::new("load_grid");

    let file = File::open(path).map_err(|e| MeshLoadError::io(path, e))?;
    let mut reader = BufReader::new(file);

    // stl_io returns an indexed mesh: exact duplicate coordinates are
    // already welded into shared vertex ids.
    let stl =
        stl_io::read_stl(&mut reader).map_err(|e| MeshLoadError::parse(path, e.to_string()))?;

    debug!(
        "STL contains {} vertices, {} triangles",
        stl.vertices.len(),
        stl.faces.len()
    );

    let points: Vec<Point3<f64>> = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();

    let mut triangles = Vec::with_capacity(stl.faces.len());
    for face in &stl.faces {
        let indices = [
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ];

        // Skip triangles with repeated vertex ids
        if indices[0] != indices[1] && indices[1] != indices[2] && indices[0] != indices[2] {
            triangles.push(indices);
        }
    }

    let grid = build_grid(points, triangles, path)?;

    if let Some((min, max)) = grid.bounds() {
        info!(
            "Loaded grid: {} vertices, {} triangles, plot axes {:?}",
            grid.vertex_count(),
            grid.triangle_count(),
            grid.axes
        );
        debug!(
            "Bounding box: [{:.2}, {:.2}, {:.2}] to [{:.2}, {:.2}, {:.2}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    Ok(grid)
}

/// Assemble a grid from already-parsed geometry: infer the projection
/// plane from face normals and extract the ordered boundary outline.
///
/// `origin` is only used to label errors.
pub fn build_grid(
    points: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
    origin: &Path,
) -> Result<SurfaceGrid, MeshLoadError> {
    let mut normal_sum = Vector3::zeros();
    let mut valid = 0usize;
    for &[a, b, c] in &triangles {
        let tri = Triangle::new(
            points[a as usize],
            points[b as usize],
            points[c as usize],
        );
        if let Some(n) = tri.normal() {
            normal_sum += n;
            valid += 1;
        }
    }

    if valid < 3 {
        return Err(MeshLoadError::DegenerateSurface {
            path: origin.to_path_buf(),
            triangles: valid,
        });
    }

    let mean_normal = normal_sum / valid as f64;
    let axes = projection_axes(&mean_normal);
    debug!(
        "Mean surface normal ({:.3}, {:.3}, {:.3}) -> plot axes {:?}",
        mean_normal.x, mean_normal.y, mean_normal.z, axes
    );

    let outline = boundary_points(&points, &triangles);
    let boundary = if outline.len() < 3 {
        // Degenerate outline: the contours still render, just without the
        // surrounding silhouette.
        warn!(
            "Only {} boundary points found; grid outline left empty",
            outline.len()
        );
        Vec::new()
    } else {
        // sort_perimeter closes the loop (first point repeated last).
        sort_perimeter(&outline)
    };

    Ok(SurfaceGrid {
        points,
        triangles,
        axes,
        boundary,
    })
}

/// Pick the two plot axes: rank the coordinate axes by the magnitude of
/// the mean normal's components and drop the largest (the through-plane
/// axis). A flat surface's normal points along the axis perpendicular to
/// the plane the user wants to view, whatever the mesh orientation.
fn projection_axes(mean_normal: &Vector3<f64>) -> [usize; 2] {
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        mean_normal[a]
            .abs()
            .partial_cmp(&mean_normal[b].abs())
            .unwrap_or(Ordering::Equal)
    });

    let mut axes = [order[0], order[1]];
    axes.sort_unstable();
    axes
}

/// Collect the endpoints of boundary edges: an edge is on the boundary
/// iff exactly one triangle uses it. Non-manifold (3+ uses) and interior
/// (2 uses) edges are excluded.
fn boundary_points(points: &[Point3<f64>], triangles: &[[u32; 3]]) -> Vec<Point3<f64>> {
    let mut edge_use: HashMap<(u32, u32), u32> = HashMap::new();
    for &[a, b, c] in triangles {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let key = if u < v { (u, v) } else { (v, u) };
            *edge_use.entry(key).or_insert(0) += 1;
        }
    }

    let mut ids: HashSet<u32> = HashSet::new();
    for (&(u, v), &uses) in &edge_use {
        if uses == 1 {
            ids.insert(u);
            ids.insert(v);
        }
    }

    // Sort ids so the perimeter walk sees a stable input order.
    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.iter().map(|&i| points[i as usize]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    /// Unit square in the XY plane, split along the diagonal.
    fn square_geometry() -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let triangles = vec![[0, 1, 2], [0, 2, 3]];
        (points, triangles)
    }

    #[test]
    fn test_projection_axes_exclude_normal_axis() {
        assert_eq!(projection_axes(&Vector3::new(0.0, 0.0, 1.0)), [0, 1]);
        assert_eq!(projection_axes(&Vector3::new(0.0, -0.9, 0.1)), [0, 2]);
        assert_eq!(projection_axes(&Vector3::new(0.8, 0.1, 0.2)), [1, 2]);
    }

    #[test]
    fn test_projection_axes_sorted_by_index() {
        // Through-plane axis y: remaining axes must come back as [0, 2],
        // not in magnitude order.
        let axes = projection_axes(&Vector3::new(0.3, 0.9, 0.1));
        assert_eq!(axes, [0, 2]);
    }

    #[test]
    fn test_build_grid_flat_square() {
        let (points, triangles) = square_geometry();
        let grid = build_grid(points, triangles, Path::new("square.stl")).unwrap();
        assert_eq!(grid.axes, [0, 1]);
        // 4 corners plus the closing repeat.
        assert_eq!(grid.boundary.len(), 5);
        assert_eq!(grid.boundary.first(), grid.boundary.last());
    }

    #[test]
    fn test_boundary_excludes_shared_diagonal() {
        let (points, triangles) = square_geometry();
        let outline = boundary_points(&points, &triangles);
        // The diagonal (0-2) is interior; all 4 corners remain boundary
        // endpoints.
        assert_eq!(outline.len(), 4);
    }

    #[test]
    fn test_build_grid_rejects_degenerate_surface() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        // One zero-area sliver only.
        let err = build_grid(points, vec![[0, 1, 2]], Path::new("bad.stl")).unwrap_err();
        match err {
            MeshLoadError::DegenerateSurface { triangles, .. } => assert_eq!(triangles, 0),
            other => panic!("expected DegenerateSurface, got {other:?}"),
        }
    }

    #[test]
    fn test_load_grid_missing_file() {
        let err = load_grid(Path::new("/nonexistent/grid.stl")).unwrap_err();
        assert!(matches!(err, MeshLoadError::Io { .. }));
    }

    #[test]
    fn test_tilted_plane_axes() {
        // Square in the XZ plane: normal along y.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let triangles = vec![[0, 1, 2], [0, 2, 3]];
        let grid = build_grid(points, triangles, Path::new("xz.stl")).unwrap();
        assert_eq!(grid.axes, [0, 2]);
        let (u, v) = grid.project(&Point3::new(0.25, 9.0, 0.75));
        assert!(approx_eq(u, 0.25) && approx_eq(v, 0.75));
    }
}
