//! Output helpers shared by the subcommands.

use serde::Serialize;

use crate::OutputFormat;

/// Print a result value in the selected format. Text rendering is done by
/// the commands themselves; this handles the JSON path.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Json = format {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize output: {}", e),
        }
    }
}
