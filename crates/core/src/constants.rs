//! Shared constants for the ASL core.

/// Timestamp format for consent-status updates, e.g. `07/08/2026 14:05`.
pub const CONSENT_TIMESTAMP_FMT: &str = "%d/%m/%Y %H:%M";

/// File name of the persisted store document inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

/// Default data directory when `ASL_DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = "/asl_data";

/// Default pharmacy display name when `ASL_PHARMACY_NAME` is not set.
pub const DEFAULT_PHARMACY_NAME: &str = "Simulated Community Pharmacy";

/// Formats a consent-status timestamp the way the consent machine stamps it.
pub fn consent_timestamp(now: chrono::DateTime<chrono::Local>) -> String {
    now.format(CONSENT_TIMESTAMP_FMT).to_string()
}
