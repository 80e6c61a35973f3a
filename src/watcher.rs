use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;

/// Contents of the host's last-state file.
#[derive(Deserialize)]
struct LastState {
    pedalboard: String,
}

/// Detects pedalboard switches made outside this control surface by
/// watching the host's last-state file.
///
/// Edge-triggered: `poll` reports a bundle only when the file's modification
/// time differs from the last one seen.
pub struct ChangeWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ChangeWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_seen = modified(&path);
        ChangeWatcher { path, last_seen }
    }

    /// Bundle made current since the previous call, if any.
    pub fn poll(&mut self) -> Option<String> {
        let mtime = modified(&self.path)?;
        if self.last_seen == Some(mtime) {
            return None;
        }
        self.last_seen = Some(mtime);

        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Cannot read {}: {e}", self.path.display());
                return None;
            }
        };
        match serde_json::from_str::<LastState>(&text) {
            Ok(state) if !state.pedalboard.is_empty() => Some(state.pedalboard),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Cannot parse {}: {e}", self.path.display());
                None
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
