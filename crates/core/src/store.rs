//! Persistence adapter for patients, prescribers, and prescriptions.
//!
//! The store keeps three related tables in memory and, when opened against a
//! data directory, persists them as a single JSON document (`store.json`)
//! under that directory. Status enums are stored as small integers; the
//! integer mapping is confined to the row types in this module and never
//! leaks into the domain.
//!
//! ## Transactions
//!
//! All writes go through [`Store::transaction`]: the closure receives a
//! [`StoreTxn`] over a working copy of the tables, and the copy is persisted
//! and installed only when the closure returns `Ok`. An `Err` return
//! discards every staged change, which gives ingestion its all-or-nothing
//! guarantee. Writers serialize on the table lock, so two concurrent
//! consent transitions cannot interleave their read-modify-write cycles.

use crate::error::{AslError, AslResult};
use crate::patient::{AslStatus, Patient};
use crate::prescriber::Prescriber;
use crate::prescription::{Prescription, PrescriptionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

// ============================================================================
// ROW TYPES - enum-as-small-integer lives here and nowhere else
// ============================================================================

fn asl_status_to_i16(status: AslStatus) -> i16 {
    match status {
        AslStatus::NoConsent => 0,
        AslStatus::Pending => 1,
        AslStatus::Granted => 2,
        AslStatus::Rejected => 3,
    }
}

fn asl_status_from_i16(raw: i16) -> AslResult<AslStatus> {
    match raw {
        0 => Ok(AslStatus::NoConsent),
        1 => Ok(AslStatus::Pending),
        2 => Ok(AslStatus::Granted),
        3 => Ok(AslStatus::Rejected),
        other => Err(AslError::CorruptStore(format!(
            "unknown asl_status code {other}"
        ))),
    }
}

fn prescription_status_to_i16(status: PrescriptionStatus) -> i16 {
    match status {
        PrescriptionStatus::Pending => 0,
        PrescriptionStatus::Available => 1,
        PrescriptionStatus::Dispensed => 2,
        PrescriptionStatus::Cancelled => 3,
    }
}

fn prescription_status_from_i16(raw: i16) -> AslResult<PrescriptionStatus> {
    match raw {
        0 => Ok(PrescriptionStatus::Pending),
        1 => Ok(PrescriptionStatus::Available),
        2 => Ok(PrescriptionStatus::Dispensed),
        3 => Ok(PrescriptionStatus::Cancelled),
        other => Err(AslError::CorruptStore(format!(
            "unknown prescription status code {other}"
        ))),
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct PatientRow {
    id: i64,
    medicare: i64,
    pharmaceut_ben_entitlement_no: String,
    sfty_net_entitlement_cardholder: bool,
    rpbs_ben_entitlement_cardholder: bool,
    name: String,
    dob: String,
    preferred_contact: i64,
    address_1: String,
    address_2: String,
    script_date: String,
    pbs: Option<String>,
    rpbs: Option<String>,
    asl_status: i16,
    is_registered: bool,
    consent_last_updated: Option<String>,
}

impl PatientRow {
    fn from_domain(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            medicare: patient.medicare,
            pharmaceut_ben_entitlement_no: patient.pharmaceut_ben_entitlement_no.clone(),
            sfty_net_entitlement_cardholder: patient.sfty_net_entitlement_cardholder,
            rpbs_ben_entitlement_cardholder: patient.rpbs_ben_entitlement_cardholder,
            name: patient.name.clone(),
            dob: patient.dob.clone(),
            preferred_contact: patient.preferred_contact,
            address_1: patient.address_1.clone(),
            address_2: patient.address_2.clone(),
            script_date: patient.script_date.clone(),
            pbs: patient.pbs.clone(),
            rpbs: patient.rpbs.clone(),
            asl_status: asl_status_to_i16(patient.asl_status),
            is_registered: patient.is_registered,
            consent_last_updated: patient.consent_last_updated.clone(),
        }
    }

    fn to_domain(&self) -> AslResult<Patient> {
        Ok(Patient {
            id: self.id,
            medicare: self.medicare,
            pharmaceut_ben_entitlement_no: self.pharmaceut_ben_entitlement_no.clone(),
            sfty_net_entitlement_cardholder: self.sfty_net_entitlement_cardholder,
            rpbs_ben_entitlement_cardholder: self.rpbs_ben_entitlement_cardholder,
            name: self.name.clone(),
            dob: self.dob.clone(),
            preferred_contact: self.preferred_contact,
            address_1: self.address_1.clone(),
            address_2: self.address_2.clone(),
            script_date: self.script_date.clone(),
            pbs: self.pbs.clone(),
            rpbs: self.rpbs.clone(),
            asl_status: asl_status_from_i16(self.asl_status)?,
            is_registered: self.is_registered,
            consent_last_updated: self.consent_last_updated.clone(),
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct PrescriberRow {
    id: i64,
    fname: String,
    lname: String,
    title: Option<String>,
    address_1: String,
    address_2: String,
    prescriber_id: i64,
    hpii: i64,
    hpio: i64,
    phone: String,
    fax: Option<String>,
}

impl PrescriberRow {
    fn from_domain(prescriber: &Prescriber) -> Self {
        Self {
            id: prescriber.id,
            fname: prescriber.fname.clone(),
            lname: prescriber.lname.clone(),
            title: prescriber.title.clone(),
            address_1: prescriber.address_1.clone(),
            address_2: prescriber.address_2.clone(),
            prescriber_id: prescriber.prescriber_id,
            hpii: prescriber.hpii,
            hpio: prescriber.hpio,
            phone: prescriber.phone.clone(),
            fax: prescriber.fax.clone(),
        }
    }

    fn to_domain(&self) -> Prescriber {
        Prescriber {
            id: self.id,
            fname: self.fname.clone(),
            lname: self.lname.clone(),
            title: self.title.clone(),
            address_1: self.address_1.clone(),
            address_2: self.address_2.clone(),
            prescriber_id: self.prescriber_id,
            hpii: self.hpii,
            hpio: self.hpio,
            phone: self.phone.clone(),
            fax: self.fax.clone(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct PrescriptionRow {
    id: i64,
    patient_id: i64,
    prescriber_id: i64,
    dspid: Option<String>,
    status: i16,
    drug_name: String,
    drug_code: String,
    dose_instr: String,
    dose_qty: i64,
    dose_rpt: i64,
    prescribed_date: String,
    dispensed_date: Option<String>,
    paperless: bool,
    brand_sub_not_prmt: bool,
    remaining_repeats: Option<i64>,
    dispensed_at_this_pharmacy: bool,
}

impl PrescriptionRow {
    fn from_domain(prescription: &Prescription) -> Self {
        Self {
            id: prescription.id,
            patient_id: prescription.patient_id,
            prescriber_id: prescription.prescriber_id,
            dspid: prescription.dspid.clone(),
            status: prescription_status_to_i16(prescription.status),
            drug_name: prescription.drug_name.clone(),
            drug_code: prescription.drug_code.clone(),
            dose_instr: prescription.dose_instr.clone(),
            dose_qty: prescription.dose_qty,
            dose_rpt: prescription.dose_rpt,
            prescribed_date: prescription.prescribed_date.clone(),
            dispensed_date: prescription.dispensed_date.clone(),
            paperless: prescription.paperless,
            brand_sub_not_prmt: prescription.brand_sub_not_prmt,
            remaining_repeats: prescription.remaining_repeats,
            dispensed_at_this_pharmacy: prescription.dispensed_at_this_pharmacy,
        }
    }

    fn to_domain(&self) -> AslResult<Prescription> {
        Ok(Prescription {
            id: self.id,
            patient_id: self.patient_id,
            prescriber_id: self.prescriber_id,
            dspid: self.dspid.clone(),
            status: prescription_status_from_i16(self.status)?,
            drug_name: self.drug_name.clone(),
            drug_code: self.drug_code.clone(),
            dose_instr: self.dose_instr.clone(),
            dose_qty: self.dose_qty,
            dose_rpt: self.dose_rpt,
            prescribed_date: self.prescribed_date.clone(),
            dispensed_date: self.dispensed_date.clone(),
            paperless: self.paperless,
            brand_sub_not_prmt: self.brand_sub_not_prmt,
            remaining_repeats: self.remaining_repeats,
            dispensed_at_this_pharmacy: self.dispensed_at_this_pharmacy,
        })
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct Tables {
    last_patient_id: i64,
    last_prescriber_id: i64,
    last_prescription_id: i64,
    patients: BTreeMap<i64, PatientRow>,
    prescribers: BTreeMap<i64, PrescriberRow>,
    prescriptions: BTreeMap<i64, PrescriptionRow>,
}

impl Tables {
    fn get_patient(&self, id: i64) -> AslResult<Patient> {
        self.patients
            .get(&id)
            .ok_or(AslError::PatientNotFound(id))?
            .to_domain()
    }

    fn find_patient_by_medicare(&self, medicare: i64) -> AslResult<Option<Patient>> {
        self.patients
            .values()
            .find(|row| row.medicare == medicare)
            .map(PatientRow::to_domain)
            .transpose()
    }

    fn list_patients(&self) -> AslResult<Vec<Patient>> {
        self.patients.values().map(PatientRow::to_domain).collect()
    }

    fn get_prescriber(&self, id: i64) -> Option<Prescriber> {
        self.prescribers.get(&id).map(PrescriberRow::to_domain)
    }

    fn find_prescriber_by_natural_id(&self, prescriber_id: i64) -> Option<Prescriber> {
        self.prescribers
            .values()
            .find(|row| row.prescriber_id == prescriber_id)
            .map(PrescriberRow::to_domain)
    }

    fn get_prescription(&self, id: i64) -> AslResult<Prescription> {
        self.prescriptions
            .get(&id)
            .ok_or(AslError::PrescriptionNotFound(id))?
            .to_domain()
    }

    fn prescriptions_for_patient(&self, patient_id: i64) -> AslResult<Vec<Prescription>> {
        self.prescriptions
            .values()
            .filter(|row| row.patient_id == patient_id)
            .map(PrescriptionRow::to_domain)
            .collect()
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Table store backing the ASL simulator.
///
/// Open against a data directory for a persisted store, or use
/// [`Store::in_memory`] for an ephemeral one (tests, dry runs).
pub struct Store {
    path: Option<PathBuf>,
    tables: RwLock<Tables>,
}

impl Store {
    /// Opens the store under `data_dir`, loading `store.json` when present.
    ///
    /// # Errors
    ///
    /// Returns an `AslError` if the directory cannot be created or the
    /// store document cannot be read or parsed.
    pub fn open(data_dir: &Path) -> AslResult<Self> {
        fs::create_dir_all(data_dir).map_err(AslError::DataDirCreation)?;
        let path = data_dir.join(crate::constants::STORE_FILE_NAME);

        let tables = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(AslError::FileRead)?;
            serde_json::from_str(&raw).map_err(AslError::Deserialization)?
        } else {
            Tables::default()
        };

        Ok(Self {
            path: Some(path),
            tables: RwLock::new(tables),
        })
    }

    /// Creates an empty store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Runs a read-only closure against a consistent view of the tables.
    pub fn read<T>(&self, f: impl FnOnce(&StoreView<'_>) -> AslResult<T>) -> AslResult<T> {
        let guard = self.tables.read().map_err(|_| AslError::LockPoisoned)?;
        f(&StoreView { tables: &guard })
    }

    /// Runs a read-modify-write closure as one transaction.
    ///
    /// The closure operates on a working copy of the tables. When it returns
    /// `Ok`, the copy is persisted (for file-backed stores) and installed;
    /// on `Err` every staged change is discarded. Writers serialize on the
    /// table lock for the whole closure.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut StoreTxn<'_>) -> AslResult<T>) -> AslResult<T> {
        let mut guard = self.tables.write().map_err(|_| AslError::LockPoisoned)?;
        let mut work = guard.clone();

        let out = f(&mut StoreTxn { tables: &mut work })?;

        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(&work).map_err(AslError::Serialization)?;
            fs::write(path, raw).map_err(AslError::FileWrite)?;
        }
        *guard = work;

        Ok(out)
    }
}

/// Read-only view over the tables.
pub struct StoreView<'a> {
    tables: &'a Tables,
}

impl StoreView<'_> {
    pub fn get_patient(&self, id: i64) -> AslResult<Patient> {
        self.tables.get_patient(id)
    }

    pub fn find_patient_by_medicare(&self, medicare: i64) -> AslResult<Option<Patient>> {
        self.tables.find_patient_by_medicare(medicare)
    }

    pub fn list_patients(&self) -> AslResult<Vec<Patient>> {
        self.tables.list_patients()
    }

    pub fn get_prescriber(&self, id: i64) -> Option<Prescriber> {
        self.tables.get_prescriber(id)
    }

    pub fn get_prescription(&self, id: i64) -> AslResult<Prescription> {
        self.tables.get_prescription(id)
    }

    pub fn prescriptions_for_patient(&self, patient_id: i64) -> AslResult<Vec<Prescription>> {
        self.tables.prescriptions_for_patient(patient_id)
    }
}

/// Staged view over a transaction's working tables.
///
/// Reads observe the transaction's own staged writes, so a prescriber
/// inserted for one contract item is found by the natural-key lookup of the
/// next item in the same ingestion call.
pub struct StoreTxn<'a> {
    tables: &'a mut Tables,
}

impl StoreTxn<'_> {
    pub fn get_patient(&self, id: i64) -> AslResult<Patient> {
        self.tables.get_patient(id)
    }

    pub fn find_patient_by_medicare(&self, medicare: i64) -> AslResult<Option<Patient>> {
        self.tables.find_patient_by_medicare(medicare)
    }

    pub fn get_prescriber(&self, id: i64) -> Option<Prescriber> {
        self.tables.get_prescriber(id)
    }

    pub fn find_prescriber_by_natural_id(&self, prescriber_id: i64) -> Option<Prescriber> {
        self.tables.find_prescriber_by_natural_id(prescriber_id)
    }

    pub fn get_prescription(&self, id: i64) -> AslResult<Prescription> {
        self.tables.get_prescription(id)
    }

    pub fn prescriptions_for_patient(&self, patient_id: i64) -> AslResult<Vec<Prescription>> {
        self.tables.prescriptions_for_patient(patient_id)
    }

    /// Inserts a patient, assigning a fresh row id. Returns the stored row.
    pub fn insert_patient(&mut self, mut patient: Patient) -> Patient {
        self.tables.last_patient_id += 1;
        patient.id = self.tables.last_patient_id;
        self.tables
            .patients
            .insert(patient.id, PatientRow::from_domain(&patient));
        patient
    }

    /// Writes back an existing patient row.
    pub fn update_patient(&mut self, patient: &Patient) -> AslResult<()> {
        if !self.tables.patients.contains_key(&patient.id) {
            return Err(AslError::PatientNotFound(patient.id));
        }
        self.tables
            .patients
            .insert(patient.id, PatientRow::from_domain(patient));
        Ok(())
    }

    /// Inserts a prescriber, assigning a fresh row id. Returns the stored row.
    pub fn insert_prescriber(&mut self, mut prescriber: Prescriber) -> Prescriber {
        self.tables.last_prescriber_id += 1;
        prescriber.id = self.tables.last_prescriber_id;
        self.tables
            .prescribers
            .insert(prescriber.id, PrescriberRow::from_domain(&prescriber));
        prescriber
    }

    /// Writes back an existing prescriber row.
    pub fn update_prescriber(&mut self, prescriber: &Prescriber) -> AslResult<()> {
        if !self.tables.prescribers.contains_key(&prescriber.id) {
            return Err(AslError::CorruptStore(format!(
                "prescriber row {} missing on update",
                prescriber.id
            )));
        }
        self.tables
            .prescribers
            .insert(prescriber.id, PrescriberRow::from_domain(prescriber));
        Ok(())
    }

    /// Inserts a prescription, assigning a fresh row id. Returns the stored
    /// row.
    pub fn insert_prescription(&mut self, mut prescription: Prescription) -> Prescription {
        self.tables.last_prescription_id += 1;
        prescription.id = self.tables.last_prescription_id;
        self.tables
            .prescriptions
            .insert(prescription.id, PrescriptionRow::from_domain(&prescription));
        prescription
    }

    /// Writes back an existing prescription row.
    pub fn update_prescription(&mut self, prescription: &Prescription) -> AslResult<()> {
        if !self.tables.prescriptions.contains_key(&prescription.id) {
            return Err(AslError::PrescriptionNotFound(prescription.id));
        }
        self.tables
            .prescriptions
            .insert(prescription.id, PrescriptionRow::from_domain(prescription));
        Ok(())
    }

    /// Flips every prescription of `patient_id` currently in `from` status
    /// to `to`, returning the number of rows changed.
    pub fn bulk_update_prescription_status(
        &mut self,
        patient_id: i64,
        from: PrescriptionStatus,
        to: PrescriptionStatus,
    ) -> usize {
        let from_code = prescription_status_to_i16(from);
        let to_code = prescription_status_to_i16(to);
        let mut flipped = 0;
        for row in self.tables.prescriptions.values_mut() {
            if row.patient_id == patient_id && row.status == from_code {
                row.status = to_code;
                flipped += 1;
            }
        }
        flipped
    }
}
