use std::path::PathBuf;
use std::time::Duration;

use autoapply_core::AppError;
use autoapply_core::config::{DEFAULT_LEDGER_PATH, SessionConfig};

/// Configuration for the SQLite ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a statement waits on a lock held by another process.
    pub busy_timeout: Duration,
}

impl LedgerConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_session(config: &SessionConfig) -> Self {
        Self::new(config.ledger_path.clone())
    }

    /// Reject settings sqlx would only fail on at connect time.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.path.as_os_str().is_empty() {
            return Err(AppError::ConfigError("LEDGER_PATH must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(AppError::ConfigError(
                "Ledger pool needs at least 1 connection".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEDGER_PATH),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}
