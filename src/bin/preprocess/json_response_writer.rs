use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<(), String> {
    let Some(path) = path else {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        serde_json::to_writer_pretty(&mut lock, value)
            .map_err(|err| format!("Failed to serialize response JSON: {err}"))?;
        return lock
            .write_all(b"\n")
            .map_err(|err| format!("Failed to finalize response on stdout: {err}"));
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create response output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create response file '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, value).map_err(|err| {
        format!(
            "Failed to serialize response JSON '{}': {err}",
            path.display()
        )
    })?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize response file '{}': {err}", path.display()))?;
    Ok(())
}
