//! Wind-tunnel run tables and tap channel maps.
//!
//! A run table is the tab-separated `.asc` export of a test run: three
//! preamble lines, a header line, a units line (skipped), then one row
//! per measured point. A channel map is a comma CSV tying tap positions
//! (`x,y,z`) to the pressure channel recorded at each tap.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::DataError;

/// Columns the matching logic depends on.
pub const COL_RIDE_HEIGHT: &str = "Ride-Height-Number";
pub const COL_YAW: &str = "YAW";
pub const COL_SPEED: &str = "RRS_SPEED";
pub const COL_DYNPR: &str = "DYNPR";
pub const COL_RUN_NUMBER: &str = "Run Number";
pub const COL_POINT_NUMBER: &str = "Point Number";

const REQUIRED_COLUMNS: [&str; 6] = [
    COL_RIDE_HEIGHT,
    COL_YAW,
    COL_SPEED,
    COL_DYNPR,
    COL_RUN_NUMBER,
    COL_POINT_NUMBER,
];

/// Lines before the header in a `.asc` export, and the units line after.
const PREAMBLE_LINES: usize = 3;
const UNITS_LINES: usize = 1;

/// One measured point: the numeric columns in table column order, plus
/// the derived run-point identifier (`"11.01"` = run 11, point 1).
#[derive(Debug, Clone)]
pub struct RunRow {
    pub values: Vec<f64>,
    pub run_point: String,
}

/// A parsed run table with named numeric columns.
#[derive(Debug, Clone)]
pub struct RunTable {
    pub columns: Vec<String>,
    index: HashMap<String, usize>,
    pub rows: Vec<RunRow>,
}

impl RunTable {
    /// Read a tab-separated `.asc` run export.
    pub fn read(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let table = Self::parse(&text, path)?;
        info!(
            "Loaded run table {:?}: {} rows, {} columns",
            path,
            table.rows.len(),
            table.columns.len()
        );
        Ok(table)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, DataError> {
        let mut lines = text.lines().skip(PREAMBLE_LINES);
        let header = lines
            .next()
            .ok_or_else(|| DataError::missing_column(path, COL_RUN_NUMBER))?;
        let body: Vec<&str> = lines.skip(UNITS_LINES).collect();

        // Re-assemble header + data for the csv reader; the units line and
        // preamble are gone.
        let mut csv_text = String::with_capacity(text.len());
        csv_text.push_str(header);
        for line in &body {
            if !line.trim().is_empty() {
                csv_text.push('\n');
                csv_text.push_str(line);
            }
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(csv_text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::csv(path, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut index = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            index.insert(name.clone(), i);
        }
        for required in REQUIRED_COLUMNS {
            if !index.contains_key(required) {
                return Err(DataError::missing_column(path, required));
            }
        }

        let yaw_col = index[COL_YAW];
        let speed_col = index[COL_SPEED];
        let run_col = index[COL_RUN_NUMBER];
        let point_col = index[COL_POINT_NUMBER];

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            let mut values: Vec<f64> = record
                .iter()
                .map(|field| field.parse::<f64>().unwrap_or(f64::NAN))
                .collect();
            values.resize(columns.len(), f64::NAN);

            // Match keys are compared exactly, so normalize their
            // precision at the parsing boundary.
            values[yaw_col] = round_to(values[yaw_col], 2);
            values[speed_col] = round_to(values[speed_col], 1);

            let run_point = format!(
                "{}.{:02}",
                values[run_col].round() as i64,
                values[point_col].round() as i64
            );
            rows.push(RunRow { values, run_point });
        }

        debug!("Parsed {} run rows", rows.len());
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Build a table from already-parsed columns and rows.
    pub fn from_parts(columns: Vec<String>, rows: Vec<RunRow>) -> Self {
        let mut index = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            index.insert(name.clone(), i);
        }
        Self {
            columns,
            index,
            rows,
        }
    }

    /// Column index by exact name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// First column whose name starts with `prefix` (channel columns
    /// carry unit suffixes in the export).
    pub fn column_with_prefix(&self, prefix: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.starts_with(prefix))
    }

    /// A single cell by row index and exact column name.
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column(name)?;
        self.rows.get(row).map(|r| r.values[col])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// One pressure tap: position on the model and the channel it records.
#[derive(Debug, Clone)]
pub struct Tap {
    pub position: Point3<f64>,
    pub channel: String,
}

/// A channel map: the tap layout for one instrumented surface.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    pub taps: Vec<Tap>,
}

impl ChannelMap {
    /// Read a comma CSV with columns `x, y, z, channel`.
    pub fn read(path: &Path) -> Result<Self, DataError> {
        let text = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let map = Self::parse(&text, path)?;
        info!("Loaded channel map {:?}: {} taps", path, map.taps.len());
        Ok(map)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers().map_err(|e| DataError::csv(path, e))?.clone();
        let find = |name: &str| -> Result<usize, DataError> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| DataError::missing_column(path, name))
        };
        let (xi, yi, zi, ci) = (find("x")?, find("y")?, find("z")?, find("channel")?);

        let mut taps = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataError::csv(path, e))?;
            let coord = |i: usize| record.get(i).and_then(|f| f.parse::<f64>().ok());
            let (Some(x), Some(y), Some(z)) = (coord(xi), coord(yi), coord(zi)) else {
                continue;
            };
            let Some(channel) = record.get(ci).filter(|c| !c.is_empty()) else {
                continue;
            };
            taps.push(Tap {
                position: Point3::new(x, y, z),
                channel: channel.to_string(),
            });
        }

        Ok(Self { taps })
    }

    /// Resolve every tap channel to a run-table column index by prefix
    /// match.
    pub fn resolve(&self, table: &RunTable) -> Result<Vec<usize>, DataError> {
        self.taps
            .iter()
            .map(|tap| {
                table
                    .column_with_prefix(&tap.channel)
                    .ok_or_else(|| DataError::UnknownChannel {
                        channel: tap.channel.clone(),
                    })
            })
            .collect()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.taps.iter().map(|t| t.position).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}
