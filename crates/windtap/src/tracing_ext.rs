//! Structured-logging helpers for pipeline operations.
//!
//! Enable output by installing a `tracing` subscriber in the application,
//! e.g. `RUST_LOG=windtap=debug` with an `EnvFilter`-based registry. The
//! CLI does this from its `-v` flags.

use std::time::Instant;

use tracing::{Span, debug, info};

use crate::types::SurfaceGrid;

/// A performance timer that logs its duration on drop.
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("tap_operation", operation = name);
        debug!(target: "windtap::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Timer carrying the item identifier of the comparison being worked.
    pub fn with_item(name: &'static str, item: &str) -> Self {
        let span = tracing::info_span!("tap_operation", operation = name, item = item);
        debug!(
            target: "windtap::timing",
            operation = name,
            item = item,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "windtap::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log the state of a loaded grid at debug level.
pub fn log_grid_stats(grid: &SurfaceGrid, context: &str) {
    debug!(
        target: "windtap::grid",
        context = context,
        vertices = grid.vertex_count(),
        triangles = grid.triangle_count(),
        axes = format!("{:?}", grid.axes),
        boundary_points = grid.boundary.len(),
        "Grid state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_elapsed_is_monotonic() {
        let timer = OperationTimer::new("test_op");
        let first = timer.elapsed_ms();
        let second = timer.elapsed_ms();
        assert!(second >= first);
        assert!(first >= 0.0);
    }

    #[test]
    fn test_timer_span_has_name() {
        let timer = OperationTimer::with_item("render", "11.01");
        // Span exists even with no subscriber installed.
        let _ = timer.span();
    }
}
