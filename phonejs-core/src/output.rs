//! Streaming JSON output helpers

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Write a value as prettified JSON followed by a newline.
pub fn write_json_pretty<T: Serialize + ?Sized>(value: &T, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write each item as one line of JSON (NDJSON).
pub fn write_ndjson<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
