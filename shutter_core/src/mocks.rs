//! Test and helper mocks for shutter_core

use std::sync::{Arc, Mutex};

use shutter_traits::{Cover, CoverCommand};

/// A cover that records every command it accepts.
///
/// Clones share the log and the failure toggle, so a test can keep one handle
/// while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingCover {
    supports_stop: bool,
    log: Arc<Mutex<Vec<CoverCommand>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingCover {
    pub fn new(supports_stop: bool) -> Self {
        Self {
            supports_stop,
            ..Self::default()
        }
    }

    /// Commands accepted so far, oldest first.
    pub fn commands(&self) -> Vec<CoverCommand> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut l) = self.log.lock() {
            l.clear();
        }
    }

    /// When set, every `send` fails and nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut f) = self.failing.lock() {
            *f = failing;
        }
    }

    fn is_failing(&self) -> bool {
        self.failing.lock().map(|f| *f).unwrap_or(false)
    }
}

impl Cover for RecordingCover {
    fn send(
        &mut self,
        command: CoverCommand,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.is_failing() {
            return Err(Box::new(std::io::Error::other(format!(
                "relay did not accept {command:?}"
            ))));
        }
        if let Ok(mut l) = self.log.lock() {
            l.push(command);
        }
        Ok(())
    }

    fn supports_stop(&self) -> bool {
        self.supports_stop
    }
}
