//! pt_data contract validation and ingestion.
//!
//! Maps every field of the externally defined pt_data contract onto the
//! domain entities, enforcing presence, format, and cross-field constraints
//! before anything is staged. Ingestion reconciles against existing rows by
//! natural key (Medicare number for patients, prescriber identifier for
//! prescribers) rather than inserting blindly.
//!
//! The whole contract is processed inside the caller's transaction: any
//! validation failure propagates out of the closure and the transaction
//! rollback discards every row staged before the failure.

use crate::error::{AslError, AslResult};
use crate::patient::{AslStatus, Patient};
use crate::prescriber::Prescriber;
use crate::prescription::{Prescription, PrescriptionStatus};
use crate::store::StoreTxn;
use asl_types::{
    coerce_bool, coerce_date_dmy, coerce_drug_code, coerce_optional_string, coerce_string,
    digits_exact, digits_only, CoerceError,
};
use serde_json::{Map, Value};

/// Keys every pt_data contract must carry at the top level.
pub const TOP_LEVEL_REQUIRED: &[&str] = &[
    "medicare",
    "pharmaceut-ben-entitlement-no",
    "sfty-net-entitlement-cardholder",
    "rpbs-ben-entitlement-cardholder",
    "name",
    "dob",
    "preferred-contact",
    "address-1",
    "address-2",
    "script-date",
    "consent-status",
    "asl-data",
    "alr-data",
];

/// Keys required of the consent-status sub-object.
pub const CONSENT_STATUS_REQUIRED: &[&str] = &["status", "is-registered"];

/// Keys every prescriber sub-object must carry.
pub const PRESCRIBER_REQUIRED: &[&str] = &[
    "fname",
    "lname",
    "address-1",
    "address-2",
    "id",
    "hpii",
    "hpio",
    "phone",
];

/// Keys every active-prescription (asl-data) item must carry.
pub const ASL_ITEM_REQUIRED: &[&str] = &[
    "DSPID",
    "status",
    "drug-name",
    "drug-code",
    "dose-instr",
    "dose-qty",
    "dose-rpt",
    "prescribed-date",
    "paperless",
    "brand-sub-not-prmt",
    "prescriber",
];

/// Keys every dispensing-history (alr-data) item must carry.
pub const ALR_ITEM_REQUIRED: &[&str] = &[
    "drug-name",
    "drug-code",
    "dose-instr",
    "dose-qty",
    "dose-rpt",
    "prescribed-date",
    "dispensed-date",
    "paperless",
    "brand-sub-not-prmt",
    "remaining-repeats",
    "prescriber",
];

/// A malformed or incomplete pt_data contract.
///
/// Raised before any row is committed; always names the offending field(s)
/// and the containing object so the caller can correct the input.
#[derive(Debug, thiserror::Error)]
pub enum ContractValidationError {
    #[error("{object} must be a JSON object")]
    NotAnObject { object: &'static str },
    #[error("{object} must be a list")]
    NotAList { object: &'static str },
    #[error("missing {missing:?} in {object}")]
    MissingKeys {
        object: &'static str,
        missing: Vec<String>,
    },
    #[error("invalid {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: CoerceError,
    },
    #[error("invalid consent status {0}")]
    UnknownConsentStatus(String),
    #[error("remaining-repeats must be > 0")]
    NonPositiveRepeats,
}

/// Options controlling how ingestion treats an already-known patient.
#[derive(Clone, Copy, Debug, Default)]
pub struct IngestOptions {
    /// When the Medicare number matches an existing patient, copy every
    /// mutable field from the contract onto the existing row. When false,
    /// the existing row is reused untouched.
    pub overwrite_patient: bool,
}

/// Structured outcome of one ingestion call.
#[derive(Clone, Debug)]
pub struct IngestOutcome {
    /// The resolved patient row (created, overwritten, or reused).
    pub patient: Patient,
    /// Distinct prescribers touched by this contract, in first-seen order.
    pub prescribers: Vec<Prescriber>,
    /// Every prescription created by this contract, in contract order.
    pub prescriptions: Vec<Prescription>,
    /// How many of `prescribers` were newly created (as opposed to reused).
    pub created_prescribers: usize,
    pub created_prescriptions: usize,
    pub is_new_patient: bool,
}

static NULL: Value = Value::Null;

fn require_object<'a>(
    value: &'a Value,
    object: &'static str,
) -> Result<&'a Map<String, Value>, ContractValidationError> {
    value
        .as_object()
        .ok_or(ContractValidationError::NotAnObject { object })
}

fn require_keys(
    obj: &Map<String, Value>,
    keys: &[&str],
    object: &'static str,
) -> Result<(), ContractValidationError> {
    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !obj.contains_key(**k))
        .map(|k| (*k).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ContractValidationError::MissingKeys { object, missing });
    }
    Ok(())
}

fn key<'a>(obj: &'a Map<String, Value>, name: &str) -> &'a Value {
    obj.get(name).unwrap_or(&NULL)
}

/// Attaches the offending field name to a coercion failure.
fn field<T>(name: &str, result: Result<T, CoerceError>) -> Result<T, ContractValidationError> {
    result.map_err(|source| ContractValidationError::Field {
        field: name.to_string(),
        source,
    })
}

/// Builds a transient patient from the contract's top-level fields.
///
/// Pure validation: nothing is staged. The returned patient carries a zero
/// row id until the ingestor resolves it against the store.
fn build_patient(contract: &Map<String, Value>) -> Result<Patient, ContractValidationError> {
    require_keys(contract, TOP_LEVEL_REQUIRED, "pt_data")?;

    let consent = require_object(key(contract, "consent-status"), "consent-status")?;
    require_keys(consent, CONSENT_STATUS_REQUIRED, "consent-status")?;

    let status_raw = field("consent-status.status", coerce_string(key(consent, "status")))?;
    let asl_status = AslStatus::from_contract(&status_raw)
        .ok_or(ContractValidationError::UnknownConsentStatus(status_raw))?;

    // Blank last-updated values are treated as absent.
    let consent_last_updated = field(
        "consent-status.last-updated",
        coerce_optional_string(consent.get("last-updated")),
    )?
    .filter(|s| !s.is_empty());

    Ok(Patient {
        id: 0,
        medicare: field("medicare", digits_exact(key(contract, "medicare"), 11))?,
        pharmaceut_ben_entitlement_no: field(
            "pharmaceut-ben-entitlement-no",
            coerce_string(key(contract, "pharmaceut-ben-entitlement-no")),
        )?,
        sfty_net_entitlement_cardholder: field(
            "sfty-net-entitlement-cardholder",
            coerce_bool(key(contract, "sfty-net-entitlement-cardholder")),
        )?,
        rpbs_ben_entitlement_cardholder: field(
            "rpbs-ben-entitlement-cardholder",
            coerce_bool(key(contract, "rpbs-ben-entitlement-cardholder")),
        )?,
        name: field("name", coerce_string(key(contract, "name")))?,
        dob: field("dob", coerce_date_dmy(key(contract, "dob")))?,
        preferred_contact: field(
            "preferred-contact",
            digits_only(key(contract, "preferred-contact")),
        )?,
        address_1: field("address-1", coerce_string(key(contract, "address-1")))?,
        address_2: field("address-2", coerce_string(key(contract, "address-2")))?,
        script_date: field("script-date", coerce_date_dmy(key(contract, "script-date")))?,
        pbs: field("pbs", coerce_optional_string(contract.get("pbs")))?,
        rpbs: field("rpbs", coerce_optional_string(contract.get("rpbs")))?,
        asl_status,
        is_registered: field(
            "consent-status.is-registered",
            coerce_bool(key(consent, "is-registered")),
        )?,
        consent_last_updated,
    })
}

/// Validates a prescriber sub-object and resolves it against the store.
///
/// A known natural identifier updates the existing row's mutable fields in
/// place; an unknown one stages a new row. Returns the resolved prescriber
/// and whether it was created by this call.
fn get_or_create_prescriber(
    txn: &mut StoreTxn<'_>,
    value: &Value,
) -> AslResult<(Prescriber, bool)> {
    let obj = require_object(value, "prescriber")?;
    require_keys(obj, PRESCRIBER_REQUIRED, "prescriber")?;

    let prescriber_id = field("prescriber.id", digits_only(key(obj, "id")))?;
    let fname = field("prescriber.fname", coerce_string(key(obj, "fname")))?;
    let lname = field("prescriber.lname", coerce_string(key(obj, "lname")))?;
    let address_1 = field("prescriber.address-1", coerce_string(key(obj, "address-1")))?;
    let address_2 = field("prescriber.address-2", coerce_string(key(obj, "address-2")))?;
    let hpii = field("hpii", digits_exact(key(obj, "hpii"), 16))?;
    let hpio = field("hpio", digits_exact(key(obj, "hpio"), 16))?;
    let phone = field("prescriber.phone", coerce_string(key(obj, "phone")))?;
    let title = field("prescriber.title", coerce_optional_string(obj.get("title")))?;
    let fax = field("prescriber.fax", coerce_optional_string(obj.get("fax")))?;

    if let Some(mut existing) = txn.find_prescriber_by_natural_id(prescriber_id) {
        existing.fname = fname;
        existing.lname = lname;
        existing.address_1 = address_1;
        existing.address_2 = address_2;
        existing.hpii = hpii;
        existing.hpio = hpio;
        existing.phone = phone;
        // Optional fields keep their stored value when the contract omits
        // the key entirely.
        if obj.contains_key("title") {
            existing.title = title;
        }
        if obj.contains_key("fax") {
            existing.fax = fax;
        }
        txn.update_prescriber(&existing)?;
        return Ok((existing, false));
    }

    let created = txn.insert_prescriber(Prescriber {
        id: 0,
        fname,
        lname,
        title,
        address_1,
        address_2,
        prescriber_id,
        hpii,
        hpio,
        phone,
        fax,
    });
    Ok((created, true))
}

/// Builds an active prescription from an already key-checked asl-data item.
///
/// The item's own `status` key is required for shape fidelity but its value
/// is ignored: freshly ingested active scripts always start `Available`.
fn build_asl_prescription(
    item: &Map<String, Value>,
    patient_id: i64,
    prescriber_id: i64,
) -> Result<Prescription, ContractValidationError> {
    Ok(Prescription {
        id: 0,
        patient_id,
        prescriber_id,
        dspid: field("DSPID", coerce_optional_string(item.get("DSPID")))?,
        status: PrescriptionStatus::Available,
        drug_name: field("drug-name", coerce_string(key(item, "drug-name")))?,
        drug_code: field("drug-code", coerce_drug_code(key(item, "drug-code")))?,
        dose_instr: field("dose-instr", coerce_string(key(item, "dose-instr")))?,
        dose_qty: field("dose-qty", digits_only(key(item, "dose-qty")))?,
        dose_rpt: field("dose-rpt", digits_only(key(item, "dose-rpt")))?,
        prescribed_date: field(
            "prescribed-date",
            coerce_date_dmy(key(item, "prescribed-date")),
        )?,
        dispensed_date: None,
        paperless: field("paperless", coerce_bool(key(item, "paperless")))?,
        brand_sub_not_prmt: field(
            "brand-sub-not-prmt",
            coerce_bool(key(item, "brand-sub-not-prmt")),
        )?,
        remaining_repeats: None,
        dispensed_at_this_pharmacy: false,
    })
}

/// Builds a dispensing-history prescription from an already key-checked
/// alr-data item.
///
/// History records additionally require a dispensed date and a positive
/// remaining-repeats count, and are implicitly flagged as dispensed at this
/// pharmacy.
fn build_alr_prescription(
    item: &Map<String, Value>,
    patient_id: i64,
    prescriber_id: i64,
) -> Result<Prescription, ContractValidationError> {
    let remaining = field(
        "remaining-repeats",
        digits_only(key(item, "remaining-repeats")),
    )?;
    if remaining <= 0 {
        return Err(ContractValidationError::NonPositiveRepeats);
    }

    Ok(Prescription {
        id: 0,
        patient_id,
        prescriber_id,
        dspid: field("DSPID", coerce_optional_string(item.get("DSPID")))?,
        status: PrescriptionStatus::Dispensed,
        drug_name: field("drug-name", coerce_string(key(item, "drug-name")))?,
        drug_code: field("drug-code", coerce_drug_code(key(item, "drug-code")))?,
        dose_instr: field("dose-instr", coerce_string(key(item, "dose-instr")))?,
        dose_qty: field("dose-qty", digits_only(key(item, "dose-qty")))?,
        dose_rpt: field("dose-rpt", digits_only(key(item, "dose-rpt")))?,
        prescribed_date: field(
            "prescribed-date",
            coerce_date_dmy(key(item, "prescribed-date")),
        )?,
        dispensed_date: Some(field(
            "dispensed-date",
            coerce_date_dmy(key(item, "dispensed-date")),
        )?),
        paperless: field("paperless", coerce_bool(key(item, "paperless")))?,
        brand_sub_not_prmt: field(
            "brand-sub-not-prmt",
            coerce_bool(key(item, "brand-sub-not-prmt")),
        )?,
        remaining_repeats: Some(remaining),
        dispensed_at_this_pharmacy: true,
    })
}

/// Returns a contract list, treating JSON null as empty.
fn list_items<'a>(
    contract: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a [Value], ContractValidationError> {
    match key(contract, name) {
        Value::Null => Ok(&[]),
        Value::Array(items) => Ok(items),
        _ => Err(ContractValidationError::NotAList { object: name }),
    }
}

/// Ingests one pt_data contract inside the caller's transaction.
///
/// Builds a transient patient from the top-level fields, reconciles it
/// against the store by Medicare number, resolves each item's prescriber by
/// natural identifier, and stages one prescription per list item. The caller
/// owns the transaction: composing this inside a larger
/// [`crate::Store::transaction`] closure defers the commit, and any `Err`
/// return rolls the whole call back.
///
/// # Errors
///
/// Returns `AslError::Contract` for any missing key or coercion failure,
/// naming the field and containing object. No partial data survives a
/// failure.
pub fn ingest_pt_data_contract(
    txn: &mut StoreTxn<'_>,
    contract: &Value,
    options: IngestOptions,
) -> AslResult<IngestOutcome> {
    let root = require_object(contract, "pt_data")?;
    let transient = build_patient(root)?;

    let existing = txn.find_patient_by_medicare(transient.medicare)?;
    let is_new_patient = existing.is_none();
    let patient = match existing {
        None => txn.insert_patient(transient),
        Some(mut current) => {
            if options.overwrite_patient {
                current.pharmaceut_ben_entitlement_no = transient.pharmaceut_ben_entitlement_no;
                current.sfty_net_entitlement_cardholder = transient.sfty_net_entitlement_cardholder;
                current.rpbs_ben_entitlement_cardholder = transient.rpbs_ben_entitlement_cardholder;
                current.name = transient.name;
                current.dob = transient.dob;
                current.preferred_contact = transient.preferred_contact;
                current.address_1 = transient.address_1;
                current.address_2 = transient.address_2;
                current.script_date = transient.script_date;
                current.pbs = transient.pbs;
                current.rpbs = transient.rpbs;
                current.asl_status = transient.asl_status;
                current.is_registered = transient.is_registered;
                current.consent_last_updated = transient.consent_last_updated;
                txn.update_patient(&current)?;
            }
            current
        }
    };

    let mut prescribers: Vec<Prescriber> = Vec::new();
    let mut prescriptions: Vec<Prescription> = Vec::new();
    let mut created_prescribers = 0;

    let mut resolve_prescriber = |txn: &mut StoreTxn<'_>,
                                  item: &Map<String, Value>,
                                  prescribers: &mut Vec<Prescriber>|
     -> AslResult<Prescriber> {
        let (prescriber, created) = get_or_create_prescriber(txn, key(item, "prescriber"))?;
        if !prescribers.iter().any(|p| p.id == prescriber.id) {
            prescribers.push(prescriber.clone());
            if created {
                created_prescribers += 1;
            }
        }
        Ok(prescriber)
    };

    for item in list_items(root, "asl-data")? {
        let obj = require_object(item, "asl-data item")?;
        require_keys(obj, ASL_ITEM_REQUIRED, "asl-data item")?;
        let prescriber = resolve_prescriber(txn, obj, &mut prescribers)?;
        let prescription = build_asl_prescription(obj, patient.id, prescriber.id)?;
        prescriptions.push(txn.insert_prescription(prescription));
    }

    for item in list_items(root, "alr-data")? {
        let obj = require_object(item, "alr-data item")?;
        require_keys(obj, ALR_ITEM_REQUIRED, "alr-data item")?;
        let prescriber = resolve_prescriber(txn, obj, &mut prescribers)?;
        let prescription = build_alr_prescription(obj, patient.id, prescriber.id)?;
        prescriptions.push(txn.insert_prescription(prescription));
    }

    let created_prescriptions = prescriptions.len();
    Ok(IngestOutcome {
        patient,
        prescribers,
        prescriptions,
        created_prescribers,
        created_prescriptions,
        is_new_patient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::json;

    fn prescriber_value() -> Value {
        json!({
            "fname": "Phillip",
            "lname": "Davis",
            "title": "( MBBS; FRACGP )",
            "address-1": "Level 3  60 Albert Rd",
            "address-2": "SOUTH MELBOURNE VIC 3205",
            "id": 987774,
            "hpii": "8003 6199 0002 6805",
            "hpio": "8003 6265 6669 2846",
            "phone": "03 9284 3300",
            "fax": null
        })
    }

    fn asl_item(drug_name: &str, drug_code: &str) -> Value {
        json!({
            "DSPID": null,
            "status": "Available",
            "drug-name": drug_name,
            "drug-code": drug_code,
            "dose-instr": "Take one tablet daily",
            "dose-qty": 30,
            "dose-rpt": "5",
            "prescribed-date": "30/11/2020",
            "paperless": "yes",
            "brand-sub-not-prmt": false,
            "prescriber": prescriber_value()
        })
    }

    fn alr_item(drug_name: &str, drug_code: &str, remaining: i64) -> Value {
        json!({
            "drug-name": drug_name,
            "drug-code": drug_code,
            "dose-instr": "Take one capsule at night",
            "dose-qty": "30",
            "dose-rpt": 5,
            "prescribed-date": "30/11/2020",
            "dispensed-date": "05/12/2020",
            "paperless": true,
            "brand-sub-not-prmt": "no",
            "remaining-repeats": remaining,
            "prescriber": prescriber_value()
        })
    }

    fn sample_contract() -> Value {
        json!({
            "medicare": "4950-28640-11",
            "pharmaceut-ben-entitlement-no": "NA318402K(W)",
            "sfty-net-entitlement-cardholder": "true",
            "rpbs-ben-entitlement-cardholder": false,
            "name": "Draga Diaz",
            "dob": "26/01/1998",
            "preferred-contact": "0401 234 567",
            "address-1": "33 JIT DR",
            "address-2": "CHARAM VIC 3318",
            "script-date": "30/11/2020",
            "pbs": null,
            "rpbs": null,
            "consent-status": {
                "status": "granted",
                "is-registered": true,
                "last-updated": "01/12/2020 09:30"
            },
            "asl-data": [
                asl_item("Amoxicillin 500mg", "AMX500"),
                asl_item("Atorvastatin 20mg", "ATV20")
            ],
            "alr-data": [
                alr_item("Sertraline 50mg", "SRT50", 3),
                alr_item("Salbutamol 100mcg", "SLB100", 1)
            ]
        })
    }

    fn ingest(store: &Store, contract: &Value, options: IngestOptions) -> AslResult<IngestOutcome> {
        store.transaction(|txn| ingest_pt_data_contract(txn, contract, options))
    }

    #[test]
    fn sample_contract_ingests_end_to_end() {
        let store = Store::in_memory();
        let outcome = ingest(&store, &sample_contract(), IngestOptions::default())
            .expect("ingestion should succeed");

        assert!(outcome.is_new_patient);
        assert_eq!(outcome.created_prescribers, 1);
        assert_eq!(outcome.created_prescriptions, 4);
        assert_eq!(outcome.prescribers.len(), 1);
        assert_eq!(outcome.patient.medicare, 49502864011);
        assert_eq!(outcome.patient.asl_status, AslStatus::Granted);
        assert_eq!(
            outcome.patient.consent_last_updated.as_deref(),
            Some("01/12/2020 09:30")
        );

        let statuses: Vec<PrescriptionStatus> =
            outcome.prescriptions.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                PrescriptionStatus::Available,
                PrescriptionStatus::Available,
                PrescriptionStatus::Dispensed,
                PrescriptionStatus::Dispensed,
            ]
        );
        for alr in &outcome.prescriptions[2..] {
            assert!(alr.remaining_repeats.is_some_and(|r| r > 0));
            assert!(alr.dispensed_at_this_pharmacy);
            assert!(alr.dispensed_date.is_some());
        }
    }

    #[test]
    fn reingest_without_overwrite_reuses_patient_untouched() {
        let store = Store::in_memory();
        let first = ingest(&store, &sample_contract(), IngestOptions::default())
            .expect("first ingestion should succeed");

        let mut second_contract = sample_contract();
        second_contract["name"] = json!("Someone Else");
        let second = ingest(&store, &second_contract, IngestOptions::default())
            .expect("second ingestion should succeed");

        assert!(!second.is_new_patient);
        assert_eq!(second.patient.id, first.patient.id);
        assert_eq!(second.patient.name, "Draga Diaz");

        let patients = store
            .read(|view| view.list_patients())
            .expect("read should succeed");
        assert_eq!(patients.len(), 1, "no duplicate patient row");
    }

    #[test]
    fn reingest_with_overwrite_updates_every_mutable_field() {
        let store = Store::in_memory();
        ingest(&store, &sample_contract(), IngestOptions::default())
            .expect("first ingestion should succeed");

        let mut second_contract = sample_contract();
        second_contract["name"] = json!("Draga Diaz-Smith");
        second_contract["dob"] = json!("27/01/1998");
        second_contract["address-1"] = json!("1 New Street");
        second_contract["consent-status"]["status"] = json!("NO_CONSENT");

        let outcome = ingest(
            &store,
            &second_contract,
            IngestOptions {
                overwrite_patient: true,
            },
        )
        .expect("overwrite ingestion should succeed");

        assert!(!outcome.is_new_patient);
        assert_eq!(outcome.patient.name, "Draga Diaz-Smith");
        assert_eq!(outcome.patient.dob, "27/01/1998");
        assert_eq!(outcome.patient.address_1, "1 New Street");
        assert_eq!(outcome.patient.asl_status, AslStatus::NoConsent);

        let stored = store
            .read(|view| view.get_patient(outcome.patient.id))
            .expect("patient should exist");
        assert_eq!(stored, outcome.patient);
    }

    #[test]
    fn shared_prescriber_is_created_once() {
        let store = Store::in_memory();
        let outcome = ingest(&store, &sample_contract(), IngestOptions::default())
            .expect("ingestion should succeed");

        // Four items all referencing prescriber 987774
        assert_eq!(outcome.created_prescribers, 1);
        assert_eq!(outcome.prescribers.len(), 1);
        assert_eq!(outcome.prescribers[0].prescriber_id, 987774);
        assert_eq!(outcome.prescribers[0].hpii, 8003619900026805);

        let same_ids: Vec<i64> = outcome
            .prescriptions
            .iter()
            .map(|p| p.prescriber_id)
            .collect();
        assert!(same_ids.iter().all(|id| *id == outcome.prescribers[0].id));
    }

    #[test]
    fn missing_top_level_keys_are_all_reported() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract.as_object_mut().unwrap().remove("name");
        contract.as_object_mut().unwrap().remove("dob");

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("missing keys should fail");
        match err {
            AslError::Contract(ContractValidationError::MissingKeys { object, missing }) => {
                assert_eq!(object, "pt_data");
                assert_eq!(missing, vec!["name".to_string(), "dob".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_prescriber_keys_name_the_prescriber_object() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["asl-data"][0]["prescriber"]
            .as_object_mut()
            .unwrap()
            .remove("hpii");

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("missing prescriber key should fail");
        match err {
            AslError::Contract(ContractValidationError::MissingKeys { object, missing }) => {
                assert_eq!(object, "prescriber");
                assert_eq!(missing, vec!["hpii".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ten_digit_medicare_fails() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["medicare"] = json!("495-028-640-1");

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("10-digit medicare should fail");
        match err {
            AslError::Contract(ContractValidationError::Field { field, .. }) => {
                assert_eq!(field, "medicare");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_consent_status_fails() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["consent-status"]["status"] = json!("denied");

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("unknown status should fail");
        assert!(matches!(
            err,
            AslError::Contract(ContractValidationError::UnknownConsentStatus(_))
        ));
    }

    #[test]
    fn invalid_drug_code_in_item_fails() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["asl-data"][1]["drug-code"] = json!("AB1");

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("short drug code should fail");
        match err {
            AslError::Contract(ContractValidationError::Field { field, .. }) => {
                assert_eq!(field, "drug-code");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_remaining_repeats_fails_and_rolls_back() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["alr-data"][1]["remaining-repeats"] = json!(0);

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("zero remaining repeats should fail");
        assert!(matches!(
            err,
            AslError::Contract(ContractValidationError::NonPositiveRepeats)
        ));

        // The patient, prescriber, and three valid prescriptions staged
        // before the bad item must all be discarded.
        let patients = store
            .read(|view| view.list_patients())
            .expect("read should succeed");
        assert!(patients.is_empty(), "failed ingestion must not commit rows");
    }

    #[test]
    fn one_remaining_repeat_succeeds() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["alr-data"][1]["remaining-repeats"] = json!(1);

        let outcome =
            ingest(&store, &contract, IngestOptions::default()).expect("should succeed");
        assert_eq!(outcome.prescriptions[3].remaining_repeats, Some(1));
    }

    #[test]
    fn null_lists_are_treated_as_empty() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["asl-data"] = json!(null);
        contract["alr-data"] = json!(null);

        let outcome =
            ingest(&store, &contract, IngestOptions::default()).expect("should succeed");
        assert_eq!(outcome.created_prescriptions, 0);
        assert!(outcome.prescribers.is_empty());
    }

    #[test]
    fn non_object_item_names_its_list() {
        let store = Store::in_memory();
        let mut contract = sample_contract();
        contract["alr-data"] = json!(["not an object"]);

        let err = ingest(&store, &contract, IngestOptions::default())
            .expect_err("scalar item should fail");
        match err {
            AslError::Contract(ContractValidationError::NotAnObject { object }) => {
                assert_eq!(object, "alr-data item");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
