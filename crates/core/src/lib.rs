//! # ASL Core
//!
//! Core business logic for the ASL dispensing simulator.
//!
//! This crate contains pure data operations:
//! - pt_data contract validation and ingestion with natural-key
//!   reconciliation
//! - the consent state machine governing ASL visibility
//! - the transactional table store backing both
//!
//! **No API concerns**: HTTP servers, DTOs, and service interfaces belong in
//! `api-rest` and `api-shared`.

pub mod config;
pub mod consent;
pub mod constants;
pub mod contract;
pub mod error;
pub mod patient;
pub mod prescriber;
pub mod prescription;
pub mod service;
pub mod store;

pub use config::CoreConfig;
pub use consent::TransitionOutcome;
pub use contract::{
    ingest_pt_data_contract, ContractValidationError, IngestOptions, IngestOutcome,
};
pub use error::{AslError, AslResult};
pub use patient::{AslStatus, ConsentSnapshot, ConsentStatus, Patient};
pub use prescriber::Prescriber;
pub use prescription::{Prescription, PrescriptionStatus};
pub use service::{
    AslService, AslView, DispenseOutcome, PatientSummary, ScriptEntry, SearchHit,
};
pub use store::{Store, StoreTxn, StoreView};
