//! Consent state machine for ASL access.
//!
//! Governs the lifecycle of a patient's ASL consent flag
//! (`NoConsent` → `Pending` → `Granted`, reset via revoke) and the side
//! effects each transition has on the patient's prescriptions. Every
//! transition is a read-modify-write executed inside the caller's
//! transaction; an illegal transition is a reported
//! [`AslError::StateConflict`] naming the current state, with no mutation.

use crate::constants::consent_timestamp;
use crate::error::{AslError, AslResult};
use crate::patient::{AslStatus, ConsentSnapshot};
use crate::prescription::PrescriptionStatus;
use crate::store::StoreTxn;
use chrono::{DateTime, Local};

/// Outcome of a consent transition, as surfaced to the presentation layer.
#[derive(Clone, Debug)]
pub struct TransitionOutcome {
    /// Human-readable summary of what happened.
    pub message: String,
    /// Consent state after the transition.
    pub consent: ConsentSnapshot,
    /// How many prescriptions were flipped `Pending` → `Available`.
    pub updated_prescriptions: usize,
    /// Whether the caller should reload displayed state.
    pub should_reload: bool,
}

/// Requests ASL access for a patient.
///
/// Allowed only from `NoConsent`: moves the patient to `Pending` and stamps
/// the consent timestamp. Any other source state is a conflict.
pub fn request_access(
    txn: &mut StoreTxn<'_>,
    patient_id: i64,
    now: DateTime<Local>,
) -> AslResult<TransitionOutcome> {
    let mut patient = txn.get_patient(patient_id)?;

    if patient.asl_status != AslStatus::NoConsent {
        return Err(AslError::StateConflict {
            action: "request access",
            current: patient.asl_status,
        });
    }

    patient.asl_status = AslStatus::Pending;
    patient.consent_last_updated = Some(consent_timestamp(now));
    txn.update_patient(&patient)?;

    Ok(TransitionOutcome {
        message: format!(
            "Access request sent to {}. Patient will receive SMS/email to approve.",
            patient.name
        ),
        consent: patient.consent_snapshot(),
        updated_prescriptions: 0,
        should_reload: false,
    })
}

/// Polls for the simulated patient's reply and catches up prescription
/// visibility.
///
/// From `Pending` the patient is considered to have granted access: status
/// moves to `Granted`, the timestamp is stamped, and every `Pending`
/// prescription flips to `Available`. From `Granted` the flip is repeated as
/// an idempotent catch-up (commonly flipping nothing). Any other source
/// state is a conflict.
pub fn refresh(
    txn: &mut StoreTxn<'_>,
    patient_id: i64,
    now: DateTime<Local>,
) -> AslResult<TransitionOutcome> {
    let mut patient = txn.get_patient(patient_id)?;

    match patient.asl_status {
        AslStatus::Pending => {
            patient.asl_status = AslStatus::Granted;
            patient.consent_last_updated = Some(consent_timestamp(now));
            txn.update_patient(&patient)?;

            let updated = txn.bulk_update_prescription_status(
                patient_id,
                PrescriptionStatus::Pending,
                PrescriptionStatus::Available,
            );

            Ok(TransitionOutcome {
                message: format!(
                    "Patient {} replied and granted access! {} prescriptions now available.",
                    patient.name, updated
                ),
                consent: patient.consent_snapshot(),
                updated_prescriptions: updated,
                should_reload: true,
            })
        }
        AslStatus::Granted => {
            let updated = txn.bulk_update_prescription_status(
                patient_id,
                PrescriptionStatus::Pending,
                PrescriptionStatus::Available,
            );

            Ok(TransitionOutcome {
                message: format!(
                    "ASL refreshed for patient {}. {} new prescriptions found.",
                    patient.name, updated
                ),
                consent: patient.consent_snapshot(),
                updated_prescriptions: updated,
                should_reload: updated > 0,
            })
        }
        current => Err(AslError::StateConflict {
            action: "refresh ASL",
            current,
        }),
    }
}

/// Revokes consent, unconditionally resetting the patient to `NoConsent`.
///
/// Enables a future request-access cycle. Prescription rows are left
/// untouched.
pub fn delete_consent(
    txn: &mut StoreTxn<'_>,
    patient_id: i64,
    now: DateTime<Local>,
) -> AslResult<TransitionOutcome> {
    let mut patient = txn.get_patient(patient_id)?;

    patient.asl_status = AslStatus::NoConsent;
    patient.consent_last_updated = Some(consent_timestamp(now));
    txn.update_patient(&patient)?;

    Ok(TransitionOutcome {
        message: format!(
            "Consent record deleted for {}. Can now request access again.",
            patient.name
        ),
        consent: patient.consent_snapshot(),
        updated_prescriptions: 0,
        should_reload: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Patient;
    use crate::prescription::Prescription;
    use crate::store::Store;

    fn seed_patient(store: &Store, status: AslStatus) -> Patient {
        store
            .transaction(|txn| {
                Ok(txn.insert_patient(Patient {
                    id: 0,
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
                    asl_status: status,
                    is_registered: true,
                    consent_last_updated: None,
                }))
            })
            .expect("seeding should succeed")
    }

    fn seed_prescription(store: &Store, patient_id: i64, status: PrescriptionStatus) {
        store
            .transaction(|txn| {
                txn.insert_prescription(Prescription {
                    id: 0,
                    patient_id,
                    prescriber_id: 1,
                    dspid: None,
                    status,
                    drug_name: "Amoxicillin 500mg".into(),
                    drug_code: "AMX500".into(),
                    dose_instr: "One capsule three times daily".into(),
                    dose_qty: 20,
                    dose_rpt: 1,
                    prescribed_date: "30/11/2020".into(),
                    dispensed_date: None,
                    paperless: true,
                    brand_sub_not_prmt: false,
                    remaining_repeats: None,
                    dispensed_at_this_pharmacy: false,
                });
                Ok(())
            })
            .expect("seeding should succeed");
    }

    fn now() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn request_access_moves_no_consent_to_pending() {
        let store = Store::in_memory();
        let patient = seed_patient(&store, AslStatus::NoConsent);

        let outcome = store
            .transaction(|txn| request_access(txn, patient.id, now()))
            .expect("request access should succeed");

        assert_eq!(outcome.consent.status, "Pending");
        assert!(outcome.consent.last_updated.is_some());
        assert!(!outcome.should_reload);

        let stored = store
            .read(|view| view.get_patient(patient.id))
            .expect("patient should exist");
        assert_eq!(stored.asl_status, AslStatus::Pending);
    }

    #[test]
    fn request_access_conflicts_from_every_other_state() {
        for status in [AslStatus::Pending, AslStatus::Granted, AslStatus::Rejected] {
            let store = Store::in_memory();
            let patient = seed_patient(&store, status);

            let err = store
                .transaction(|txn| request_access(txn, patient.id, now()))
                .expect_err("request access should conflict");
            match err {
                AslError::StateConflict { current, .. } => assert_eq!(current, status),
                other => panic!("unexpected error: {other:?}"),
            }

            // Conflict must leave the persisted state unchanged.
            let stored = store
                .read(|view| view.get_patient(patient.id))
                .expect("patient should exist");
            assert_eq!(stored.asl_status, status);
            assert_eq!(stored.consent_last_updated, None);
        }
    }

    #[test]
    fn refresh_from_pending_grants_and_flips_exact_count() {
        let store = Store::in_memory();
        let patient = seed_patient(&store, AslStatus::Pending);
        seed_prescription(&store, patient.id, PrescriptionStatus::Pending);
        seed_prescription(&store, patient.id, PrescriptionStatus::Pending);
        seed_prescription(&store, patient.id, PrescriptionStatus::Dispensed);

        let outcome = store
            .transaction(|txn| refresh(txn, patient.id, now()))
            .expect("refresh should succeed");

        assert_eq!(outcome.updated_prescriptions, 2);
        assert!(outcome.should_reload);
        assert_eq!(outcome.consent.status, "Granted");

        let prescriptions = store
            .read(|view| view.prescriptions_for_patient(patient.id))
            .expect("read should succeed");
        let available = prescriptions
            .iter()
            .filter(|p| p.status == PrescriptionStatus::Available)
            .count();
        assert_eq!(available, 2);
    }

    #[test]
    fn refresh_from_granted_is_an_idempotent_catch_up() {
        let store = Store::in_memory();
        let patient = seed_patient(&store, AslStatus::Granted);
        seed_prescription(&store, patient.id, PrescriptionStatus::Available);

        let outcome = store
            .transaction(|txn| refresh(txn, patient.id, now()))
            .expect("refresh should succeed");

        assert_eq!(outcome.updated_prescriptions, 0);
        assert!(!outcome.should_reload);

        let stored = store
            .read(|view| view.get_patient(patient.id))
            .expect("patient should exist");
        assert_eq!(stored.asl_status, AslStatus::Granted);
    }

    #[test]
    fn refresh_conflicts_from_no_consent_and_rejected() {
        for status in [AslStatus::NoConsent, AslStatus::Rejected] {
            let store = Store::in_memory();
            let patient = seed_patient(&store, status);

            let err = store
                .transaction(|txn| refresh(txn, patient.id, now()))
                .expect_err("refresh should conflict");
            match err {
                AslError::StateConflict { current, .. } => assert_eq!(current, status),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn delete_consent_resets_from_any_state_and_reopens_the_cycle() {
        for status in [
            AslStatus::NoConsent,
            AslStatus::Pending,
            AslStatus::Granted,
            AslStatus::Rejected,
        ] {
            let store = Store::in_memory();
            let patient = seed_patient(&store, status);

            let outcome = store
                .transaction(|txn| delete_consent(txn, patient.id, now()))
                .expect("delete consent should succeed");
            assert_eq!(outcome.consent.status, "No Consent");
            assert!(outcome.should_reload);

            // A fresh request-access cycle must now be possible.
            store
                .transaction(|txn| request_access(txn, patient.id, now()))
                .expect("request access after revoke should succeed");
        }
    }

    #[test]
    fn transitions_on_missing_patient_are_not_found() {
        let store = Store::in_memory();
        let err = store
            .transaction(|txn| refresh(txn, 42, now()))
            .expect_err("missing patient should fail");
        assert!(matches!(err, AslError::PatientNotFound(42)));
    }
}
