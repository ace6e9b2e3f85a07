//! Admin endpoints: dashboard stats, filtered listing, status updates,
//! and complaint removal. The whole subtree sits behind `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::validation::validate_status;
use crate::db::{Complaint, ComplaintFilter, ComplaintWithUser, DashboardStats};
use crate::AppState;

/// Dashboard aggregate counts
///
/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = Complaint::dashboard_stats(&state.db).await?;
    Ok(Json(stats))
}

/// List all complaints with submitter info, optionally filtered
///
/// GET /api/admin/complaints?status&category&priority
pub async fn list_complaints(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<ComplaintFilter>,
) -> Result<Json<Vec<ComplaintWithUser>>, ApiError> {
    // An empty query value means "no constraint", same as an absent one
    filter.status = filter.status.filter(|s| !s.is_empty());
    filter.category = filter.category.filter(|s| !s.is_empty());
    filter.priority = filter.priority.filter(|s| !s.is_empty());

    let complaints = Complaint::list_filtered(&state.db, &filter).await?;
    Ok(Json(complaints))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Update a complaint's status
///
/// PUT /api/admin/complaints/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Complaint>, ApiError> {
    if let Err(e) = validate_status(&request.status) {
        return Err(ApiError::validation_field("status", e));
    }

    if !Complaint::update_status(&state.db, &id, &request.status).await? {
        return Err(ApiError::not_found("Complaint not found"));
    }

    tracing::info!(complaint_id = %id, status = %request.status, "Complaint status updated");

    let complaint = Complaint::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Complaint not found"))?;

    Ok(Json(complaint))
}

/// Delete a complaint
///
/// DELETE /api/admin/complaints/:id
pub async fn delete_complaint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let complaint = Complaint::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Complaint not found"))?;

    if !Complaint::delete(&state.db, &id).await? {
        return Err(ApiError::not_found("Complaint not found"));
    }

    // The stored image goes with the row; removal is best-effort
    if let Some(image_path) = &complaint.image_path {
        state.uploads.remove(image_path).await;
    }

    tracing::info!(complaint_id = %id, "Complaint deleted");

    Ok(StatusCode::NO_CONTENT)
}
