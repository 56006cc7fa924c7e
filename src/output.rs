use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::result::TraceResult;


/// Rounds `x` to `precision` decimal places.
pub fn round_to(x: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    (x * scale).round() / scale
}

/// Writes a trace result as pretty JSON.
pub fn write_result(result: &TraceResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writeln!(writer)?;
    writer.flush()?;
    log::info!("wrote trace result to {}", path.display());
    Ok(())
}

/// Writes one JSON object per line.
pub fn write_records<T: Serialize>(records: &[T], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes a trace result for stdout.
pub fn to_json(result: &TraceResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
