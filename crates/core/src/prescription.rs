//! Prescription entity and dispensing status.

use serde::{Deserialize, Serialize};

/// Dispensing status of a single prescription.
///
/// Stored as a small integer by the persistence adapter. Status transitions
/// are driven by the consent state machine (bulk `Pending` → `Available`
/// flips on refresh) and by dispensing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    Pending,
    Available,
    Dispensed,
    Cancelled,
}

impl PrescriptionStatus {
    /// Human-readable form, e.g. `"Available"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Available => "Available",
            Self::Dispensed => "Dispensed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One dispensing record, belonging to exactly one patient and referencing
/// one prescriber.
///
/// Active contract items arrive with status `Available` and no dispensed
/// date; dispensing-history items arrive `Dispensed` with a dispensed date
/// and a positive remaining-repeats count. Date fields keep the contract's
/// original `DD/MM/YYYY` strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    /// Row id of the issuing [`crate::Prescriber`].
    pub prescriber_id: i64,
    /// External digital-script identifier, when the contract carries one.
    pub dspid: Option<String>,
    pub status: PrescriptionStatus,
    pub drug_name: String,
    /// 4-6 alphanumeric characters.
    pub drug_code: String,
    pub dose_instr: String,
    pub dose_qty: i64,
    pub dose_rpt: i64,
    pub prescribed_date: String,
    pub dispensed_date: Option<String>,
    pub paperless: bool,
    pub brand_sub_not_prmt: bool,
    pub remaining_repeats: Option<i64>,
    pub dispensed_at_this_pharmacy: bool,
}

impl Prescription {
    /// Whether this record belongs on the dispensing-history (ALR) list.
    ///
    /// All three conditions are required: dispensed status, dispensed at
    /// this pharmacy, and repeats remaining. They are independent of the
    /// patient's consent state.
    pub fn is_alr_entry(&self) -> bool {
        self.status == PrescriptionStatus::Dispensed
            && self.dispensed_at_this_pharmacy
            && self.remaining_repeats.is_some_and(|r| r > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispensed_prescription() -> Prescription {
        Prescription {
            id: 1,
            patient_id: 1,
            prescriber_id: 1,
            dspid: None,
            status: PrescriptionStatus::Dispensed,
            drug_name: "Atorvastatin 20mg".into(),
            drug_code: "ATV20".into(),
            dose_instr: "Take one tablet at night".into(),
            dose_qty: 30,
            dose_rpt: 5,
            prescribed_date: "30/11/2020".into(),
            dispensed_date: Some("05/12/2020".into()),
            paperless: true,
            brand_sub_not_prmt: false,
            remaining_repeats: Some(4),
            dispensed_at_this_pharmacy: true,
        }
    }

    #[test]
    fn alr_entry_needs_all_three_conditions() {
        let base = dispensed_prescription();
        assert!(base.is_alr_entry());

        let mut not_dispensed = base.clone();
        not_dispensed.status = PrescriptionStatus::Available;
        assert!(!not_dispensed.is_alr_entry());

        let mut elsewhere = base.clone();
        elsewhere.dispensed_at_this_pharmacy = false;
        assert!(!elsewhere.is_alr_entry());

        let mut exhausted = base.clone();
        exhausted.remaining_repeats = Some(0);
        assert!(!exhausted.is_alr_entry());

        let mut unknown_repeats = base;
        unknown_repeats.remaining_repeats = None;
        assert!(!unknown_repeats.is_alr_entry());
    }
}
