//! Target/reference matching and pressure-coefficient derivation.
//!
//! For every target point the reference run is searched for rows taken at
//! the same ride height, yaw and belt speed. No match skips the point;
//! several matches are averaged column-by-column, keeping the first
//! matched row's run-point identifier, and the matched row indices are
//! consumed so they are not reused as targets. This average-numeric /
//! keep-one-id merge is the tool's long-standing policy; do not widen it.

use hashbrown::HashSet;
use tracing::debug;

use crate::error::DataError;
use crate::rundata::{
    COL_DYNPR, COL_RIDE_HEIGHT, COL_RUN_NUMBER, COL_SPEED, COL_YAW, ChannelMap, RunRow, RunTable,
};
use crate::types::ScatteredField;

/// Reading-to-Cp conversion constant (psf readings, psf dynamic pressure,
/// per-square-inch tap areas).
pub const CP_FACTOR: f64 = 144.0;

/// Matching knobs; every recognized option is an explicit field.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Target rows below this belt speed are skipped (tunnel not yet at
    /// condition).
    pub min_speed: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { min_speed: 20.0 }
    }
}

/// One matched target/reference pair with the derived Cp tap fields.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub target: ScatteredField,
    pub reference: ScatteredField,
    /// Per-tap signed difference, target minus reference.
    pub delta: ScatteredField,

    pub target_run_point: String,
    pub reference_run_point: String,
    pub target_run: i64,
    pub reference_run: i64,
    pub ride_height: f64,
}

/// Build every target/reference comparison for a pair of runs.
pub fn build_comparisons(
    target: &RunTable,
    reference: &RunTable,
    map: &ChannelMap,
    opts: &MatchOptions,
) -> Result<Vec<Comparison>, DataError> {
    let target_channels = map.resolve(target)?;
    let reference_channels = map.resolve(reference)?;
    let positions = map.positions();

    let speed_col = column(target, COL_SPEED)?;
    let rh_col = column(target, COL_RIDE_HEIGHT)?;
    let run_col = column(target, COL_RUN_NUMBER)?;
    let dynpr_t = column(target, COL_DYNPR)?;
    let dynpr_r = column(reference, COL_DYNPR)?;
    let ref_run_col = column(reference, COL_RUN_NUMBER)?;

    let mut consumed: HashSet<usize> = HashSet::new();
    let mut comparisons = Vec::new();

    for (i, row) in target.rows.iter().enumerate() {
        if consumed.contains(&i) || row.values[speed_col] < opts.min_speed {
            continue;
        }

        let Some(matched) = match_reference(target, i, reference, &mut consumed) else {
            debug!(
                run_point = row.run_point.as_str(),
                "No reference match; point skipped"
            );
            continue;
        };

        let target_cp = cp_values(&row.values, &target_channels, row.values[dynpr_t]);
        let reference_cp = cp_values(
            &matched.values,
            &reference_channels,
            matched.values[dynpr_r],
        );
        let delta_cp: Vec<f64> = target_cp
            .iter()
            .zip(&reference_cp)
            .map(|(t, r)| t - r)
            .collect();

        comparisons.push(Comparison {
            target: ScatteredField::from_parts(&positions, &target_cp),
            reference: ScatteredField::from_parts(&positions, &reference_cp),
            delta: ScatteredField::from_parts(&positions, &delta_cp),
            target_run_point: row.run_point.clone(),
            reference_run_point: matched.run_point.clone(),
            target_run: row.values[run_col].round() as i64,
            reference_run: matched.values[ref_run_col].round() as i64,
            ride_height: row.values[rh_col],
        });
    }

    debug!("Built {} comparisons", comparisons.len());
    Ok(comparisons)
}

fn column(table: &RunTable, name: &str) -> Result<usize, DataError> {
    table
        .column(name)
        .ok_or_else(|| DataError::missing_column("<run table>", name))
}

/// Find the reference row(s) matching a target row on ride height, yaw
/// and speed. Multiple matches are merged by arithmetic mean of every
/// column; the first match's `run_point` is retained and all matched
/// indices are marked consumed.
fn match_reference(
    target: &RunTable,
    target_row: usize,
    reference: &RunTable,
    consumed: &mut HashSet<usize>,
) -> Option<RunRow> {
    let keys = [COL_RIDE_HEIGHT, COL_YAW, COL_SPEED];
    let target_keys: Vec<f64> = keys
        .iter()
        .map(|k| target.value(target_row, k).unwrap_or(f64::NAN))
        .collect();

    let candidates: Vec<usize> = (0..reference.len())
        .filter(|&j| {
            keys.iter()
                .zip(&target_keys)
                .all(|(k, &want)| reference.value(j, k) == Some(want))
        })
        .collect();

    match candidates.len() {
        0 => None,
        1 => Some(reference.rows[candidates[0]].clone()),
        n => {
            let width = reference.columns.len();
            let mut mean = vec![0.0; width];
            for &j in &candidates {
                for (k, v) in reference.rows[j].values.iter().enumerate() {
                    mean[k] += v / n as f64;
                }
            }
            consumed.extend(candidates.iter().copied());
            debug!(
                matches = n,
                kept = reference.rows[candidates[0]].run_point.as_str(),
                "Averaged duplicate reference matches"
            );
            Some(RunRow {
                values: mean,
                run_point: reference.rows[candidates[0]].run_point.clone(),
            })
        }
    }
}

/// Convert channel readings of one row into pressure coefficients.
fn cp_values(row: &[f64], channel_cols: &[usize], dynamic_pressure: f64) -> Vec<f64> {
    channel_cols
        .iter()
        .map(|&col| row[col] * CP_FACTOR / dynamic_pressure)
        .collect()
}
