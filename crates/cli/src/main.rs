//! Command-line interface for the ASL simulator.
//!
//! Drives the same core operations as the REST API: seeding demo data,
//! ingesting pt_data contract files, and stepping patients through the
//! consent cycle.

use anyhow::Context;
use asl_core::{
    constants, AslService, AslStatus, CoreConfig, IngestOptions, Patient, Prescriber,
    Prescription, PrescriptionStatus, Store,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "asl")]
#[command(about = "ASL dispensing simulator CLI")]
struct Cli {
    /// Data directory holding the persisted store
    #[arg(long, default_value = constants::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed demo patients covering each consent state
    Seed,
    /// Ingest a pt_data contract from a JSON file
    Ingest {
        /// Path of the contract JSON file
        file: PathBuf,
        /// Overwrite patient fields when the Medicare number is known
        #[arg(long)]
        overwrite: bool,
    },
    /// List all patients
    List,
    /// Show a patient's ASL page data
    Show {
        /// Patient id
        pt: i64,
    },
    /// Request ASL access for a patient
    RequestAccess {
        /// Patient id
        pt: i64,
    },
    /// Poll for the patient's consent reply
    Refresh {
        /// Patient id
        pt: i64,
    },
    /// Revoke a patient's consent
    DeleteConsent {
        /// Patient id
        pt: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = Arc::new(Store::open(&cli.data_dir).context("opening store")?);
    let cfg = Arc::new(CoreConfig::new(
        cli.data_dir.clone(),
        std::env::var("ASL_PHARMACY_NAME")
            .unwrap_or_else(|_| constants::DEFAULT_PHARMACY_NAME.into()),
    )?);
    let service = AslService::new(cfg, store.clone());

    match cli.command {
        Commands::Seed => {
            let count = seed_demo_patients(&store)?;
            println!("Seeded {count} demo patients.");
        }
        Commands::Ingest { file, overwrite } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let contract: serde_json::Value =
                serde_json::from_str(&raw).context("parsing contract JSON")?;
            let outcome = service.ingest_contract(
                &contract,
                IngestOptions {
                    overwrite_patient: overwrite,
                },
            )?;
            println!(
                "Ingested contract for {} (patient {}): {} new, {} prescriber(s) created, {} prescription(s) created",
                outcome.patient.name,
                outcome.patient.id,
                if outcome.is_new_patient { "patient" } else { "existing patient" },
                outcome.created_prescribers,
                outcome.created_prescriptions,
            );
        }
        Commands::List => {
            let patients = service.list_patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Medicare: {}, Status: {}, Updated: {}",
                        patient.id,
                        patient.name,
                        patient.medicare,
                        patient.asl_status,
                        patient.consent_last_updated.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        Commands::Show { pt } => {
            let view = service.asl_view(pt)?;
            println!(
                "{} (dob {}) - consent: {}",
                view.patient.name, view.patient.dob, view.consent.status
            );
            if !view.can_view_asl {
                println!("ASL not viewable - no consent granted.");
            }
            println!("Active scripts: {}", view.asl_entries.len());
            for entry in &view.asl_entries {
                println!(
                    "  [{}] {} ({}) - {} - {}",
                    entry.prescription.id,
                    entry.prescription.drug_name,
                    entry.prescription.drug_code,
                    entry.prescription.status,
                    entry.prescriber.listing_name(),
                );
            }
            println!("Dispensing history: {}", view.alr_entries.len());
            for entry in &view.alr_entries {
                println!(
                    "  [{}] {} - dispensed {} - {} repeat(s) left",
                    entry.prescription.id,
                    entry.prescription.drug_name,
                    entry.prescription.dispensed_date.as_deref().unwrap_or("-"),
                    entry.prescription.remaining_repeats.unwrap_or(0),
                );
            }
        }
        Commands::RequestAccess { pt } => {
            let outcome = service.request_access(pt)?;
            println!("{}", outcome.message);
        }
        Commands::Refresh { pt } => {
            let outcome = service.refresh(pt)?;
            println!("{}", outcome.message);
        }
        Commands::DeleteConsent { pt } => {
            let outcome = service.delete_consent(pt)?;
            println!("{}", outcome.message);
        }
    }

    Ok(())
}

/// Seeds one patient per consent state, plus prescriptions that exercise the
/// refresh flip and the dispensing-history display.
fn seed_demo_patients(store: &Store) -> anyhow::Result<usize> {
    let seeded = store.transaction(|txn| {
        let prescriber = txn.insert_prescriber(Prescriber {
            id: 0,
            fname: "Phillip".into(),
            lname: "Davis".into(),
            title: Some("( MBBS; FRACGP )".into()),
            address_1: "Level 3  60 Albert Rd".into(),
            address_2: "SOUTH MELBOURNE VIC 3205".into(),
            prescriber_id: 987774,
            hpii: 8003619900026805,
            hpio: 8003626566692846,
            phone: "03 9284 3300".into(),
            fax: None,
        });

        let demo_patients = [
            (
                49502864011,
                "NA318402K(W)",
                "Draga Diaz",
                "26/01/1998",
                "33 JIT DR",
                "CHARAM VIC 3318",
                true,
                AslStatus::Granted,
            ),
            (
                12345678901,
                "TEST123456(X)",
                "John Smith",
                "15/03/1985",
                "123 Main St",
                "MELBOURNE VIC 3000",
                false,
                AslStatus::Pending,
            ),
            (
                98765432109,
                "REJ789012(Z)",
                "Sarah Johnson",
                "10/07/1992",
                "456 Oak Ave",
                "PERTH WA 6000",
                true,
                AslStatus::Rejected,
            ),
            (
                11122233344,
                "NEW456789(A)",
                "Michael Brown",
                "05/09/1975",
                "789 Pine St",
                "SYDNEY NSW 2000",
                false,
                AslStatus::NoConsent,
            ),
        ];

        let mut ids = Vec::new();
        for (medicare, entitlement, name, dob, address_1, address_2, safety_net, status) in
            demo_patients
        {
            let patient = txn.insert_patient(Patient {
                id: 0,
                medicare,
                pharmaceut_ben_entitlement_no: entitlement.into(),
                sfty_net_entitlement_cardholder: safety_net,
                rpbs_ben_entitlement_cardholder: false,
                name: name.into(),
                dob: dob.into(),
                preferred_contact: 401234567,
                address_1: address_1.into(),
                address_2: address_2.into(),
                script_date: "30/11/2020".into(),
                pbs: None,
                rpbs: None,
                asl_status: status,
                is_registered: true,
                consent_last_updated: None,
            });
            ids.push(patient.id);
        }

        let scripts = [
            // Granted patient: a viewable active list and one history entry.
            (ids[0], PrescriptionStatus::Available, "Amoxicillin 500mg", "AMX500", false, None),
            (ids[0], PrescriptionStatus::Available, "Atorvastatin 20mg", "ATV20", false, None),
            (ids[0], PrescriptionStatus::Dispensed, "Sertraline 50mg", "SRT50", true, Some(3)),
            // Pending patient: pending scripts that flip on refresh.
            (ids[1], PrescriptionStatus::Pending, "Salbutamol 100mcg", "SLB100", false, None),
            (ids[1], PrescriptionStatus::Pending, "Metformin 1g", "MET1G", false, None),
        ];
        for (patient_id, status, drug_name, drug_code, here, remaining) in scripts {
            txn.insert_prescription(Prescription {
                id: 0,
                patient_id,
                prescriber_id: prescriber.id,
                dspid: None,
                status,
                drug_name: drug_name.into(),
                drug_code: drug_code.into(),
                dose_instr: "As directed".into(),
                dose_qty: 30,
                dose_rpt: 5,
                prescribed_date: "30/11/2020".into(),
                dispensed_date: if status == PrescriptionStatus::Dispensed {
                    Some("05/12/2020".into())
                } else {
                    None
                },
                paperless: true,
                brand_sub_not_prmt: false,
                remaining_repeats: remaining,
                dispensed_at_this_pharmacy: here,
            });
        }

        Ok(ids.len())
    })?;

    Ok(seeded)
}
