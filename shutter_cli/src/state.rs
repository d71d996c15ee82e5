//! Last-known position persisted between runs.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use shutter_core::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub position: u8,
    /// Unix time of the save in milliseconds.
    pub updated_unix_ms: u64,
}

impl PersistedState {
    pub fn now(position: Position) -> Self {
        let updated_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            position: position.get(),
            updated_unix_ms,
        }
    }

    pub fn position(&self) -> eyre::Result<Position> {
        Ok(Position::new(self.position)?)
    }
}

/// Read the state file. A missing file is not an error.
pub fn load(path: &Path) -> eyre::Result<Option<PersistedState>> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).wrap_err_with(|| format!("read state file {path:?}")),
    };
    let state: PersistedState = serde_json::from_str(&text)
        .wrap_err_with(|| format!("parse state file {path:?}"))?;
    state.position()?;
    Ok(Some(state))
}

pub fn save(path: &Path, position: Position) -> eyre::Result<()> {
    let state = PersistedState::now(position);
    let bytes = serde_json::to_vec_pretty(&state)?;
    shutter_core::atomic::write_atomic(path, &bytes)
        .wrap_err_with(|| format!("write state file {path:?}"))?;
    tracing::debug!(position = %position, path = %path.display(), "state saved");
    Ok(())
}
