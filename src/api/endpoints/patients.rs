//! Patient record endpoints. All run behind `require_auth` and act only on
//! the caller's clinic:
//! - `POST /patients`: create
//! - `PUT /patients/:id`: full replace
//! - `GET /patients?name=&dob=`: search

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{ClinicIdentity, PatientFilter, PatientRecord};
use crate::patients::{self, PatientDraft};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub dob: Option<String>,
}

impl SearchQuery {
    fn into_filter(self) -> Result<PatientFilter, ApiError> {
        let dob = match self.dob.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(patients::parse_date(raw)?),
            _ => None,
        };
        Ok(PatientFilter::new(self.name.as_deref(), dob))
    }
}

/// `POST /patients`: create a record for the caller's clinic.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<ClinicIdentity>,
    payload: Result<Json<PatientDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientRecord>), ApiError> {
    let Json(draft) = payload?;
    let record = ctx
        .with_db(move |conn| Ok(patients::create_patient(conn, &caller, draft)?))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /patients/:id`: replace every field of one of the caller's records.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<ClinicIdentity>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PatientDraft>, JsonRejection>,
) -> Result<Json<PatientRecord>, ApiError> {
    let Path(id) = id?;
    let Json(draft) = payload?;
    let record = ctx
        .with_db(move |conn| Ok(patients::update_patient(conn, &caller, &id, draft)?))
        .await?;
    Ok(Json(record))
}

/// `GET /patients`: the caller's records matching the optional filters,
/// newest first.
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<ClinicIdentity>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<PatientRecord>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let outcome = ctx
        .with_db(move |conn| Ok(patients::search(conn, &caller, &filter)?))
        .await?;
    Ok(Json(outcome.into_records()))
}
