//! JSON files read and written by the CLI.
//!
//! Writes go to a temporary sibling file that is then renamed over the
//! target, so a reader never sees a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use calfeed_core::CalendarEvent;

use crate::error::{ClientError, ClientResult};

/// Reads a list of events from a JSON file.
///
/// Both `calendar.json` and `expanded-calendar.json` parse as events; the
/// latter simply has no recurrences.
pub fn load_events(path: &Path) -> ClientResult<Vec<CalendarEvent>> {
    let content = fs::read_to_string(path).map_err(|e| ClientError::file(path, e))?;
    let events: Vec<CalendarEvent> =
        serde_json::from_str(&content).map_err(|e| ClientError::json(path, e))?;
    debug!(path = %path.display(), count = events.len(), "Loaded events");
    Ok(events)
}

/// Writes `value` to `path` as pretty-printed JSON.
///
/// Missing parent directories are created.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ClientResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ClientError::file(parent, e))?;
    }

    let mut json = serde_json::to_string_pretty(value).map_err(|e| ClientError::json(path, e))?;
    json.push('\n');

    let tmp = temp_path(path);
    fs::write(&tmp, json).map_err(|e| ClientError::file(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ClientError::file(path, e));
    }

    debug!(path = %path.display(), "Wrote JSON file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
