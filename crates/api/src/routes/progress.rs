use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use progress_core::model::{
    Language, NewProgress, ProgressId, ProgressRecord, ProgressUpdate, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub const LOGGED: &str = "Progress logged successfully";
pub const FETCHED: &str = "Progress records fetched successfully";
pub const UPDATED: &str = "Progress updated successfully";

pub const NO_RECORDS: &str = "No progress records found";
pub const NOT_UPDATED: &str = "Progress record not found or not updated";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub target_language: Option<String>,
}

/// Success body shared by every progress route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub progress: T,
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ValidationError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ValidationError::Malformed(rejection.body_text()))
}

fn list_params(
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<ListParams, ValidationError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ValidationError::Query(rejection.body_text()))
}

pub async fn track_progress(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<ProgressRecord>>), ApiError> {
    let draft = NewProgress::from_json(json_body(body)?)?;
    let record = state.progress.log_progress(&user.id, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            message: LOGGED,
            progress: record,
        }),
    ))
}

pub async fn fetch_student_progress(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<Vec<ProgressRecord>>>, ApiError> {
    let params = list_params(query)?;
    let language = match params.target_language.as_deref() {
        Some(code) => code.parse::<Language>()?,
        None => Language::default(),
    };

    let records = state.progress.list_progress(&user.id, language).await?;
    if records.is_empty() {
        warn!(user_id = %user.id, %language, "no progress records");
        return Err(ApiError::NotFound(NO_RECORDS));
    }

    Ok(Json(Envelope {
        message: FETCHED,
        progress: records,
    }))
}

pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(progress_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<ProgressRecord>>, ApiError> {
    let update = ProgressUpdate::from_json(json_body(body)?)?;
    let progress_id = ProgressId::new(progress_id);

    match state
        .progress
        .update_progress(&user.id, &progress_id, &update)
        .await?
    {
        Some(record) => Ok(Json(Envelope {
            message: UPDATED,
            progress: record,
        })),
        None => {
            warn!(user_id = %user.id, progress_id = %progress_id, "progress not updated");
            Err(ApiError::NotFound(NOT_UPDATED))
        }
    }
}
