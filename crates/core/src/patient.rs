//! Patient aggregate and consent-status types.
//!
//! A [`Patient`] is the aggregate root for a dispensing episode: the
//! prescriptions ingested from a pt_data contract belong to it, while
//! prescribers are shared, non-owned references. The patient's
//! [`AslStatus`] is the single authority for whether its Active Script List
//! may be displayed; it is mutated only by the consent state machine in
//! [`crate::consent`].

use serde::{Deserialize, Serialize};

/// Consent status of a patient's Active Script List.
///
/// Authoritative for ASL visibility gating. Stored as a small integer by the
/// persistence adapter; everywhere else this closed variant is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AslStatus {
    NoConsent,
    Pending,
    Granted,
    Rejected,
}

impl AslStatus {
    /// Maps a contract consent-status string onto the enum.
    ///
    /// The input is normalised the way the contract spells statuses:
    /// trimmed, uppercased, underscores treated as spaces. Returns `None`
    /// for anything outside the closed set.
    pub fn from_contract(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "NO CONSENT" => Some(Self::NoConsent),
            "PENDING" => Some(Self::Pending),
            "GRANTED" => Some(Self::Granted),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Human-readable form used in messages and consent snapshots,
    /// e.g. `"No Consent"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NoConsent => "No Consent",
            Self::Pending => "Pending",
            Self::Granted => "Granted",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for AslStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Legacy coarse consent flag carried by older registration records.
///
/// Not consulted by any gating logic; [`AslStatus`] is authoritative. How
/// the two are meant to interact needs product clarification before this is
/// wired anywhere (see DESIGN.md).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    Granted,
    Revoked,
}

/// One simulated pharmacy patient.
///
/// The Medicare number is the natural deduplication key: re-ingesting a
/// contract with the same Medicare number updates this row rather than
/// creating a duplicate. Date fields keep the contract's original
/// `DD/MM/YYYY` strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    /// 11-digit Medicare number.
    pub medicare: i64,
    pub pharmaceut_ben_entitlement_no: String,
    pub sfty_net_entitlement_cardholder: bool,
    pub rpbs_ben_entitlement_cardholder: bool,
    pub name: String,
    pub dob: String,
    pub preferred_contact: i64,
    pub address_1: String,
    pub address_2: String,
    pub script_date: String,
    pub pbs: Option<String>,
    pub rpbs: Option<String>,
    pub asl_status: AslStatus,
    pub is_registered: bool,
    /// `%d/%m/%Y %H:%M` timestamp of the last consent transition.
    pub consent_last_updated: Option<String>,
}

impl Patient {
    /// Whether this patient's Active Script List may be displayed.
    pub fn can_view_asl(&self) -> bool {
        self.asl_status == AslStatus::Granted
    }

    /// Snapshot of the consent state as surfaced to the presentation layer.
    pub fn consent_snapshot(&self) -> ConsentSnapshot {
        ConsentSnapshot {
            is_registered: self.is_registered,
            status: self.asl_status.display_name().to_string(),
            last_updated: self.consent_last_updated.clone(),
        }
    }
}

/// Consent state as reported alongside transition outcomes and ASL views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSnapshot {
    pub is_registered: bool,
    pub status: String,
    pub last_updated: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_statuses_normalise() {
        assert_eq!(AslStatus::from_contract("GRANTED"), Some(AslStatus::Granted));
        assert_eq!(
            AslStatus::from_contract("no_consent"),
            Some(AslStatus::NoConsent)
        );
        assert_eq!(
            AslStatus::from_contract("  No Consent "),
            Some(AslStatus::NoConsent)
        );
        assert_eq!(AslStatus::from_contract("pending"), Some(AslStatus::Pending));
        assert_eq!(AslStatus::from_contract("denied"), None);
    }

    #[test]
    fn only_granted_can_view() {
        let mut patient = test_patient();
        for (status, expected) in [
            (AslStatus::NoConsent, false),
            (AslStatus::Pending, false),
            (AslStatus::Granted, true),
            (AslStatus::Rejected, false),
        ] {
            patient.asl_status = status;
            assert_eq!(patient.can_view_asl(), expected, "{status}");
        }
    }

    #[test]
    fn snapshot_uses_display_names() {
        let patient = test_patient();
        let snapshot = patient.consent_snapshot();
        assert_eq!(snapshot.status, "No Consent");
        assert!(snapshot.is_registered);
        assert_eq!(snapshot.last_updated, None);
    }

    fn test_patient() -> Patient {
        Patient {
            id: 1,
            medicare: 49502864011,
            pharmaceut_ben_entitlement_no: "NA318402K(W)".into(),
            sfty_net_entitlement_cardholder: true,
            rpbs_ben_entitlement_cardholder: false,
            name: "Draga Diaz".into(),
            dob: "26/01/1998".into(),
            preferred_contact: 401234567,
            address_1: "33 JIT DR".into(),
            address_2: "CHARAM VIC 3318".into(),
            script_date: "30/11/2020".into(),
            pbs: None,
            rpbs: None,
            asl_status: AslStatus::NoConsent,
            is_registered: true,
            consent_last_updated: None,
        }
    }
}
