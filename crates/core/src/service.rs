//! High-level ASL operations hosted by the HTTP and CLI layers.
//!
//! Pure domain orchestration - no API concerns. Each operation runs as a
//! single store read or transaction, so concurrent requests against the
//! same patient serialize on the store lock and either apply fully or not
//! at all.

use crate::config::CoreConfig;
use crate::consent::{self, TransitionOutcome};
use crate::contract::{ingest_pt_data_contract, IngestOptions, IngestOutcome};
use crate::error::{AslError, AslResult};
use crate::patient::{ConsentSnapshot, Patient};
use crate::prescriber::Prescriber;
use crate::prescription::{Prescription, PrescriptionStatus};
use crate::store::{Store, StoreView};
use asl_types::NonEmptyText;
use chrono::Local;
use serde_json::Value;
use std::sync::Arc;

/// A prescription paired with its issuing prescriber, ready for display.
#[derive(Clone, Debug)]
pub struct ScriptEntry {
    pub prescription: Prescription,
    pub prescriber: Prescriber,
}

/// Everything the ASL page needs for one patient.
///
/// Demographics and the consent snapshot are always present; the active
/// list is empty unless consent is granted, while history entries are
/// governed only by their own three conditions.
#[derive(Clone, Debug)]
pub struct AslView {
    pub patient: Patient,
    pub consent: ConsentSnapshot,
    pub can_view_asl: bool,
    pub asl_entries: Vec<ScriptEntry>,
    pub alr_entries: Vec<ScriptEntry>,
}

/// One row of a gated ASL search.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub prescription_id: i64,
    pub drug_name: String,
    pub drug_code: String,
    /// `"Family, Given"`.
    pub prescriber_name: String,
    pub status: String,
    pub prescribed_date: String,
}

/// Outcome of dispensing a batch of prescriptions.
#[derive(Clone, Debug)]
pub struct DispenseOutcome {
    pub message: String,
    pub dispensed_count: usize,
}

/// Summary row for patient listings.
#[derive(Clone, Debug)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub medicare: i64,
    pub dob: String,
    pub asl_status: String,
    pub consent_last_updated: Option<String>,
}

/// Pure ASL data operations - no API concerns.
#[derive(Clone)]
pub struct AslService {
    cfg: Arc<CoreConfig>,
    store: Arc<Store>,
}

impl AslService {
    /// Creates a new service over the given configuration and store.
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<Store>) -> Self {
        Self { cfg, store }
    }

    /// Ingests one pt_data contract as a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `AslError::Contract` on any validation failure; nothing is
    /// committed in that case.
    pub fn ingest_contract(
        &self,
        contract: &Value,
        options: IngestOptions,
    ) -> AslResult<IngestOutcome> {
        self.store
            .transaction(|txn| ingest_pt_data_contract(txn, contract, options))
    }

    /// Assembles the ASL page data for a patient.
    ///
    /// # Errors
    ///
    /// Returns `AslError::PatientNotFound` for an unknown patient id.
    pub fn asl_view(&self, patient_id: i64) -> AslResult<AslView> {
        self.store.read(|view| {
            let patient = view.get_patient(patient_id)?;
            let can_view_asl = patient.can_view_asl();

            let mut asl_entries = Vec::new();
            let mut alr_entries = Vec::new();
            for prescription in view.prescriptions_for_patient(patient_id)? {
                if prescription.is_alr_entry() {
                    // History entries are gated only by their own conditions.
                    if let Some(entry) = pair_with_prescriber(view, prescription) {
                        alr_entries.push(entry);
                    }
                } else if can_view_asl {
                    if let Some(entry) = pair_with_prescriber(view, prescription) {
                        asl_entries.push(entry);
                    }
                }
            }

            Ok(AslView {
                consent: patient.consent_snapshot(),
                can_view_asl,
                asl_entries,
                alr_entries,
                patient,
            })
        })
    }

    /// Requests ASL access for a patient (`NoConsent` → `Pending`).
    pub fn request_access(&self, patient_id: i64) -> AslResult<TransitionOutcome> {
        self.store
            .transaction(|txn| consent::request_access(txn, patient_id, Local::now()))
    }

    /// Polls for the patient's consent reply and catches up prescription
    /// visibility.
    pub fn refresh(&self, patient_id: i64) -> AslResult<TransitionOutcome> {
        self.store
            .transaction(|txn| consent::refresh(txn, patient_id, Local::now()))
    }

    /// Revokes consent, resetting the patient to `NoConsent`.
    pub fn delete_consent(&self, patient_id: i64) -> AslResult<TransitionOutcome> {
        self.store
            .transaction(|txn| consent::delete_consent(txn, patient_id, Local::now()))
    }

    /// Searches a patient's prescriptions by drug or prescriber name.
    ///
    /// Only permitted while consent is granted; matching is a
    /// case-insensitive substring test.
    ///
    /// # Errors
    ///
    /// Returns `AslError::StateConflict` when the ASL is not viewable and
    /// `AslError::InvalidInput` for a blank query.
    pub fn search(&self, patient_id: i64, query: &str) -> AslResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AslError::InvalidInput("search query required".into()));
        }
        let needle = query.to_lowercase();

        self.store.read(|view| {
            let patient = view.get_patient(patient_id)?;
            if !patient.can_view_asl() {
                return Err(AslError::StateConflict {
                    action: "search ASL",
                    current: patient.asl_status,
                });
            }

            let mut hits = Vec::new();
            for prescription in view.prescriptions_for_patient(patient_id)? {
                let Some(prescriber) = view.get_prescriber(prescription.prescriber_id) else {
                    tracing::warn!(
                        prescription_id = prescription.id,
                        prescriber_id = prescription.prescriber_id,
                        "skipping prescription with missing prescriber row"
                    );
                    continue;
                };

                let matches = prescription.drug_name.to_lowercase().contains(&needle)
                    || prescription.drug_code.to_lowercase().contains(&needle)
                    || prescriber.fname.to_lowercase().contains(&needle)
                    || prescriber.lname.to_lowercase().contains(&needle);
                if matches {
                    hits.push(SearchHit {
                        prescription_id: prescription.id,
                        drug_name: prescription.drug_name.clone(),
                        drug_code: prescription.drug_code.clone(),
                        prescriber_name: prescriber.listing_name(),
                        status: prescription.status.display_name().to_string(),
                        prescribed_date: prescription.prescribed_date.clone(),
                    });
                }
            }
            Ok(hits)
        })
    }

    /// Dispenses a batch of a patient's prescriptions.
    ///
    /// Each prescription moves to `Dispensed` with the given date, is
    /// flagged as dispensed at this pharmacy, and has its remaining-repeats
    /// count initialised from the repeat count when unset. Already-dispensed
    /// prescriptions are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AslError::PrescriptionNotFound` if any id does not belong to
    /// the patient; the whole batch rolls back in that case.
    pub fn dispense(
        &self,
        patient_id: i64,
        prescription_ids: &[i64],
        dispensed_by: &NonEmptyText,
        dispensed_date: &str,
    ) -> AslResult<DispenseOutcome> {
        if prescription_ids.is_empty() {
            return Err(AslError::InvalidInput("no prescriptions selected".into()));
        }
        if chrono::NaiveDate::parse_from_str(dispensed_date, asl_types::CONTRACT_DATE_FMT).is_err()
        {
            return Err(AslError::InvalidInput(
                "dispensed date must be DD/MM/YYYY".into(),
            ));
        }

        let pharmacy = self.cfg.pharmacy_name().to_string();
        self.store.transaction(|txn| {
            txn.get_patient(patient_id)?;

            let mut dispensed_count = 0;
            for &id in prescription_ids {
                let mut prescription = txn.get_prescription(id)?;
                if prescription.patient_id != patient_id {
                    return Err(AslError::PrescriptionNotFound(id));
                }
                if prescription.status == PrescriptionStatus::Dispensed {
                    continue;
                }

                prescription.status = PrescriptionStatus::Dispensed;
                prescription.dispensed_date = Some(dispensed_date.to_string());
                prescription.dispensed_at_this_pharmacy = true;
                if prescription.dose_rpt > 0 && prescription.remaining_repeats.is_none() {
                    prescription.remaining_repeats = Some(prescription.dose_rpt);
                }
                txn.update_prescription(&prescription)?;
                dispensed_count += 1;
            }

            Ok(DispenseOutcome {
                message: format!(
                    "{dispensed_by} dispensed {dispensed_count} prescription(s) at {pharmacy}"
                ),
                dispensed_count,
            })
        })
    }

    /// Lists summary rows for every patient.
    pub fn list_patients(&self) -> AslResult<Vec<PatientSummary>> {
        self.store.read(|view| {
            Ok(view
                .list_patients()?
                .into_iter()
                .map(|p| PatientSummary {
                    id: p.id,
                    name: p.name,
                    medicare: p.medicare,
                    dob: p.dob,
                    asl_status: p.asl_status.display_name().to_string(),
                    consent_last_updated: p.consent_last_updated,
                })
                .collect())
        })
    }
}

fn pair_with_prescriber(view: &StoreView<'_>, prescription: Prescription) -> Option<ScriptEntry> {
    match view.get_prescriber(prescription.prescriber_id) {
        Some(prescriber) => Some(ScriptEntry {
            prescription,
            prescriber,
        }),
        None => {
            tracing::warn!(
                prescription_id = prescription.id,
                prescriber_id = prescription.prescriber_id,
                "skipping prescription with missing prescriber row"
            );
            None
        }
    }
}
