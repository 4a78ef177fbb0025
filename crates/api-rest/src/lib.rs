//! # API REST
//!
//! REST API implementation for the ASL simulator.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error mapping)
//!
//! Uses `api-shared` for the request/response bodies and `asl-core` for all
//! domain behaviour.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    AslViewRes, ConsentStatusDto, DispenseReq, DispenseRes, ErrorRes, HealthRes, IngestReq,
    IngestRes, ListPatientsRes, PatientSummaryDto, PrescriberDto, ScriptDto, SearchHitDto,
    SearchRes, TransitionRes,
};
use api_shared::HealthService;
use asl_core::{
    AslError, AslService, ConsentSnapshot, IngestOptions, ScriptEntry, TransitionOutcome,
};
use asl_types::NonEmptyText;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: AslService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        ingest_contract,
        asl_view,
        refresh_asl,
        request_access,
        delete_consent,
        search_asl,
        dispense,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ConsentStatusDto,
        IngestReq,
        IngestRes,
        PrescriberDto,
        ScriptDto,
        AslViewRes,
        TransitionRes,
        SearchHitDto,
        SearchRes,
        DispenseReq,
        DispenseRes,
        PatientSummaryDto,
        ListPatientsRes,
    ))
)]
struct ApiDoc;

/// Builds the simulator's router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients))
        .route("/contracts", post(ingest_contract))
        .route("/asl/:pt", get(asl_view))
        .route("/api/asl/:pt/refresh", post(refresh_asl))
        .route("/api/asl/:pt/request-access", post(request_access))
        .route("/api/patient/:pt/consent", delete(delete_consent))
        .route("/api/asl/:pt/search", get(search_asl))
        .route("/api/asl/:pt/dispense", post(dispense))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorRes>);

/// Maps a core error onto an HTTP status and a `{"success": false}` body.
///
/// Validation failures and state conflicts carry their own messages;
/// storage failures are logged and reported generically.
fn error_response(err: AslError) -> ApiError {
    let status = match &err {
        AslError::Contract(_) | AslError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AslError::StateConflict { .. } => StatusCode::CONFLICT,
        AslError::PatientNotFound(_) | AslError::PrescriptionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("internal error: {err:?}");
        "Internal error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(ErrorRes {
            success: false,
            error,
        }),
    )
}

fn consent_dto(snapshot: &ConsentSnapshot) -> ConsentStatusDto {
    ConsentStatusDto {
        is_registered: snapshot.is_registered,
        status: snapshot.status.clone(),
        last_updated: snapshot.last_updated.clone(),
    }
}

fn transition_res(outcome: TransitionOutcome) -> TransitionRes {
    TransitionRes {
        success: true,
        message: outcome.message,
        consent_status: consent_dto(&outcome.consent),
        updated_prescriptions: outcome.updated_prescriptions,
        should_reload: outcome.should_reload,
    }
}

fn script_dto(entry: &ScriptEntry) -> ScriptDto {
    let prescription = &entry.prescription;
    let prescriber = &entry.prescriber;
    ScriptDto {
        prescription_id: prescription.id,
        dspid: prescription.dspid.clone(),
        status: prescription.status.display_name().to_string(),
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
        prescriber: PrescriberDto {
            fname: prescriber.fname.clone(),
            lname: prescriber.lname.clone(),
            title: prescriber.title.clone(),
            address_1: prescriber.address_1.clone(),
            address_2: prescriber.address_2.clone(),
            id: prescriber.prescriber_id,
            hpii: prescriber.hpii,
            hpio: prescriber.hpio,
            phone: prescriber.phone.clone(),
            fax: prescriber.fax.clone(),
        },
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
///
/// Used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Lists every simulated patient with a consent-status summary.
async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let patients = state.service.list_patients().map_err(error_response)?;
    Ok(Json(ListPatientsRes {
        patients: patients
            .into_iter()
            .map(|p| PatientSummaryDto {
                id: p.id,
                name: p.name,
                medicare: p.medicare,
                dob: p.dob,
                asl_status: p.asl_status,
                consent_last_updated: p.consent_last_updated,
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/contracts",
    request_body = IngestReq,
    responses(
        (status = 200, description = "Contract ingested", body = IngestRes),
        (status = 400, description = "Contract validation failed", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Ingests one pt_data contract.
///
/// Creates or reuses the patient by Medicare number, resolves prescribers by
/// their natural identifier, and creates one prescription per contract list
/// item. Validation failures report the offending field and containing
/// object, and commit nothing.
async fn ingest_contract(
    State(state): State<AppState>,
    Json(req): Json<IngestReq>,
) -> Result<Json<IngestRes>, ApiError> {
    let outcome = state
        .service
        .ingest_contract(
            &req.pt_data,
            IngestOptions {
                overwrite_patient: req.overwrite,
            },
        )
        .map_err(error_response)?;

    Ok(Json(IngestRes {
        success: true,
        patient_id: outcome.patient.id,
        is_new_patient: outcome.is_new_patient,
        created_prescribers: outcome.created_prescribers,
        created_prescriptions: outcome.created_prescriptions,
        prescriber_ids: outcome.prescribers.iter().map(|p| p.id).collect(),
        prescription_ids: outcome.prescriptions.iter().map(|p| p.id).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/asl/{pt}",
    params(("pt" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "ASL page data", body = AslViewRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Returns the ASL page data for a patient.
///
/// Demographics and the consent snapshot are always present. The active
/// list is empty unless consent is granted; dispensing history is listed
/// whenever its own conditions hold.
async fn asl_view(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
) -> Result<Json<AslViewRes>, ApiError> {
    let view = state.service.asl_view(pt).map_err(error_response)?;
    let patient = &view.patient;

    Ok(Json(AslViewRes {
        pt: patient.id,
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
        consent_status: consent_dto(&view.consent),
        asl_data: view.asl_entries.iter().map(script_dto).collect(),
        alr_data: view.alr_entries.iter().map(script_dto).collect(),
        can_view_asl: view.can_view_asl,
    }))
}

#[utoipa::path(
    post,
    path = "/api/asl/{pt}/refresh",
    params(("pt" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "ASL refreshed", body = TransitionRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Refresh not applicable in current state", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Polls for the simulated patient's consent reply.
///
/// From `Pending` the patient grants access and pending prescriptions become
/// available; from `Granted` the flip is repeated idempotently.
async fn refresh_asl(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
) -> Result<Json<TransitionRes>, ApiError> {
    let outcome = state.service.refresh(pt).map_err(error_response)?;
    Ok(Json(transition_res(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/asl/{pt}/request-access",
    params(("pt" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Access requested", body = TransitionRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Access cannot be requested in current state", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Requests ASL access for a patient (`No Consent` → `Pending`).
async fn request_access(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
) -> Result<Json<TransitionRes>, ApiError> {
    let outcome = state.service.request_access(pt).map_err(error_response)?;
    Ok(Json(transition_res(outcome)))
}

#[utoipa::path(
    delete,
    path = "/api/patient/{pt}/consent",
    params(("pt" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Consent revoked", body = TransitionRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Revokes consent, resetting the patient to `No Consent` so a fresh
/// request-access cycle can begin.
async fn delete_consent(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
) -> Result<Json<TransitionRes>, ApiError> {
    let outcome = state.service.delete_consent(pt).map_err(error_response)?;
    Ok(Json(transition_res(outcome)))
}

#[derive(Debug, Deserialize, IntoParams)]
struct SearchQuery {
    /// Search term matched against drug and prescriber names.
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/asl/{pt}/search",
    params(("pt" = i64, Path, description = "Patient id"), SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchRes),
        (status = 400, description = "Missing search query", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "No access to patient ASL", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Searches a patient's prescriptions; only available while consent is
/// granted.
async fn search_asl(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchRes>, ApiError> {
    let q = query.q.unwrap_or_default();
    let hits = state.service.search(pt, &q).map_err(error_response)?;

    Ok(Json(SearchRes {
        success: true,
        count: hits.len(),
        results: hits
            .into_iter()
            .map(|h| SearchHitDto {
                prescription_id: h.prescription_id,
                drug_name: h.drug_name,
                drug_code: h.drug_code,
                prescriber_name: h.prescriber_name,
                status: h.status,
                prescribed_date: h.prescribed_date,
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/asl/{pt}/dispense",
    params(("pt" = i64, Path, description = "Patient id")),
    request_body = DispenseReq,
    responses(
        (status = 200, description = "Prescriptions dispensed", body = DispenseRes),
        (status = 400, description = "Invalid dispense request", body = ErrorRes),
        (status = 404, description = "Patient or prescription not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Dispenses a batch of a patient's prescriptions.
///
/// Already-dispensed prescriptions are skipped; an id that does not belong
/// to the patient fails the whole batch.
async fn dispense(
    State(state): State<AppState>,
    AxumPath(pt): AxumPath<i64>,
    Json(req): Json<DispenseReq>,
) -> Result<Json<DispenseRes>, ApiError> {
    let dispensed_by = NonEmptyText::new(&req.dispensed_by).map_err(|_| {
        error_response(AslError::InvalidInput(
            "dispensed by field is required".into(),
        ))
    })?;

    let outcome = state
        .service
        .dispense(pt, &req.prescription_ids, &dispensed_by, &req.dispensed_date)
        .map_err(error_response)?;

    Ok(Json(DispenseRes {
        success: true,
        message: outcome.message,
        dispensed_count: outcome.dispensed_count,
    }))
}
