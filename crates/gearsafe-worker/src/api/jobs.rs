//! Job endpoints. Each request runs one job to completion and returns its
//! report.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use gearsafe_pipeline::{HelmetJobOptions, JobReport, PipelineError};
use gearsafe_scraper::SoftGearCategory;
use serde::Deserialize;

use super::{ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta};
use crate::middleware::RequestId;

type JobResult = Result<Json<ApiResponse<JobReport>>, ApiError>;

#[derive(Debug, Deserialize)]
pub(super) struct SoftGearQuery {
    /// `false` skips the minimum-listing check.
    min_check: Option<bool>,
}

pub(super) async fn run_helmets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> JobResult {
    let result = state
        .pipeline
        .run_helmets(&HelmetJobOptions::default())
        .await;
    job_response(req_id, "helmets", result)
}

pub(super) async fn run_rescore(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> JobResult {
    let result = state.pipeline.run_rescore().await;
    job_response(req_id, "rescore", result)
}

pub(super) async fn sync_jackets(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    query: Query<SoftGearQuery>,
) -> JobResult {
    sync_soft_gear(state, req_id, query, SoftGearCategory::Jackets).await
}

pub(super) async fn sync_pants(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    query: Query<SoftGearQuery>,
) -> JobResult {
    sync_soft_gear(state, req_id, query, SoftGearCategory::Pants).await
}

pub(super) async fn sync_boots(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    query: Query<SoftGearQuery>,
) -> JobResult {
    sync_soft_gear(state, req_id, query, SoftGearCategory::Boots).await
}

pub(super) async fn sync_gloves(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    query: Query<SoftGearQuery>,
) -> JobResult {
    sync_soft_gear(state, req_id, query, SoftGearCategory::Gloves).await
}

async fn sync_soft_gear(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SoftGearQuery>,
    category: SoftGearCategory,
) -> JobResult {
    let min_check = query.min_check.unwrap_or(true);
    let result = state.pipeline.run_soft_gear(category, min_check).await;
    job_response(req_id, category.as_str(), result)
}

fn job_response(
    req_id: RequestId,
    job: &str,
    result: Result<JobReport, PipelineError>,
) -> JobResult {
    match result {
        Ok(report) => Ok(Json(ApiResponse {
            data: report,
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => {
            tracing::error!(job, error = %e, "job failed");
            let code = match &e {
                PipelineError::Structural(_) => ErrorCode::StructuralFailure,
                _ => ErrorCode::InternalError,
            };
            Err(ApiError::new(req_id.0, code, e.to_string()))
        }
    }
}
