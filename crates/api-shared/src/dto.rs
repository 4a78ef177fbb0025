//! Request and response bodies exchanged by the ASL simulator web layer.
//!
//! Field names follow the original pt_data contract spelling: hyphenated
//! keys for contract-shaped payloads, snake_case for operational fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Liveness response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generic failure body; every error response uses this shape.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub success: bool,
    pub error: String,
}

/// Consent state as embedded in views and transition responses.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsentStatusDto {
    #[serde(rename = "is-registered")]
    pub is_registered: bool,
    pub status: String,
    #[serde(rename = "last-updated")]
    pub last_updated: Option<String>,
}

/// Request to ingest one pt_data contract.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestReq {
    /// The raw pt_data contract document.
    #[schema(value_type = Object)]
    pub pt_data: Value,
    /// Overwrite an existing patient's fields when the Medicare number is
    /// already known.
    #[serde(default)]
    pub overwrite: bool,
}

/// Summary of what an ingestion call created or reused.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRes {
    pub success: bool,
    pub patient_id: i64,
    pub is_new_patient: bool,
    pub created_prescribers: usize,
    pub created_prescriptions: usize,
    pub prescriber_ids: Vec<i64>,
    pub prescription_ids: Vec<i64>,
}

/// Prescriber details as embedded in script entries.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriberDto {
    pub fname: String,
    pub lname: String,
    pub title: Option<String>,
    #[serde(rename = "address-1")]
    pub address_1: String,
    #[serde(rename = "address-2")]
    pub address_2: String,
    pub id: i64,
    pub hpii: i64,
    pub hpio: i64,
    pub phone: String,
    pub fax: Option<String>,
}

/// One prescription entry of an ASL or ALR list.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScriptDto {
    pub prescription_id: i64,
    #[serde(rename = "DSPID")]
    pub dspid: Option<String>,
    pub status: String,
    #[serde(rename = "drug-name")]
    pub drug_name: String,
    #[serde(rename = "drug-code")]
    pub drug_code: String,
    #[serde(rename = "dose-instr")]
    pub dose_instr: String,
    #[serde(rename = "dose-qty")]
    pub dose_qty: i64,
    #[serde(rename = "dose-rpt")]
    pub dose_rpt: i64,
    #[serde(rename = "prescribed-date")]
    pub prescribed_date: String,
    #[serde(rename = "dispensed-date", skip_serializing_if = "Option::is_none")]
    pub dispensed_date: Option<String>,
    pub paperless: bool,
    #[serde(rename = "brand-sub-not-prmt")]
    pub brand_sub_not_prmt: bool,
    #[serde(rename = "remaining-repeats", skip_serializing_if = "Option::is_none")]
    pub remaining_repeats: Option<i64>,
    pub prescriber: PrescriberDto,
}

/// Full ASL page payload for one patient.
///
/// Demographics are always present; `asl-data` is empty unless consent is
/// granted, which the `can_view_asl` flag surfaces to the presentation
/// layer.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AslViewRes {
    pub pt: i64,
    pub medicare: i64,
    #[serde(rename = "pharmaceut-ben-entitlement-no")]
    pub pharmaceut_ben_entitlement_no: String,
    #[serde(rename = "sfty-net-entitlement-cardholder")]
    pub sfty_net_entitlement_cardholder: bool,
    #[serde(rename = "rpbs-ben-entitlement-cardholder")]
    pub rpbs_ben_entitlement_cardholder: bool,
    pub name: String,
    pub dob: String,
    #[serde(rename = "preferred-contact")]
    pub preferred_contact: i64,
    #[serde(rename = "address-1")]
    pub address_1: String,
    #[serde(rename = "address-2")]
    pub address_2: String,
    #[serde(rename = "script-date")]
    pub script_date: String,
    pub pbs: Option<String>,
    pub rpbs: Option<String>,
    #[serde(rename = "consent-status")]
    pub consent_status: ConsentStatusDto,
    #[serde(rename = "asl-data")]
    pub asl_data: Vec<ScriptDto>,
    #[serde(rename = "alr-data")]
    pub alr_data: Vec<ScriptDto>,
    pub can_view_asl: bool,
}

/// Outcome of a consent transition.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionRes {
    pub success: bool,
    pub message: String,
    #[serde(rename = "consent-status")]
    pub consent_status: ConsentStatusDto,
    pub updated_prescriptions: usize,
    pub should_reload: bool,
}

/// One gated search result.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchHitDto {
    pub prescription_id: i64,
    pub drug_name: String,
    pub drug_code: String,
    pub prescriber_name: String,
    pub status: String,
    pub prescribed_date: String,
}

/// Search response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchRes {
    pub success: bool,
    pub results: Vec<SearchHitDto>,
    pub count: usize,
}

/// Request to dispense a batch of prescriptions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DispenseReq {
    pub prescription_ids: Vec<i64>,
    pub dispensed_by: String,
    /// `DD/MM/YYYY`.
    pub dispensed_date: String,
}

/// Dispense outcome.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DispenseRes {
    pub success: bool,
    pub message: String,
    pub dispensed_count: usize,
}

/// Summary row for the patient listing.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientSummaryDto {
    pub id: i64,
    pub name: String,
    pub medicare: i64,
    pub dob: String,
    pub asl_status: String,
    pub consent_last_updated: Option<String>,
}

/// Patient listing response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientSummaryDto>,
}
