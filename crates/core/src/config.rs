//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! services as `Arc<CoreConfig>`. The intent is to avoid reading process-wide
//! environment variables during request handling, which can lead to
//! inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::STORE_FILE_NAME;
use crate::{AslError, AslResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    pharmacy_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `AslError::InvalidInput` if the pharmacy name is empty.
    pub fn new(data_dir: PathBuf, pharmacy_name: String) -> AslResult<Self> {
        if pharmacy_name.trim().is_empty() {
            return Err(AslError::InvalidInput(
                "pharmacy_name cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            pharmacy_name,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the persisted store document.
    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    /// Display name of the simulated pharmacy, used in operator-facing
    /// messages.
    pub fn pharmacy_name(&self) -> &str {
        &self.pharmacy_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_pharmacy_name() {
        let err = CoreConfig::new(PathBuf::from("/tmp/x"), "  ".into())
            .expect_err("empty pharmacy name should fail");
        assert!(matches!(err, AslError::InvalidInput(_)));
    }

    #[test]
    fn store_file_lives_in_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/tmp/x"), "Test Pharmacy".into())
            .expect("config should build");
        assert_eq!(cfg.store_file(), PathBuf::from("/tmp/x/store.json"));
    }
}
