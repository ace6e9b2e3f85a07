//! Student-facing complaint endpoints.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation::{validate_category, validate_description, validate_priority};
use crate::db::{Complaint, NewComplaint};
use crate::uploads::UploadError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreateComplaintResponse {
    pub id: String,
}

/// Parsed multipart submission
#[derive(Debug, Default)]
struct ComplaintForm {
    category: String,
    description: String,
    priority: String,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(multipart: &mut Multipart) -> Result<ComplaintForm, ApiError> {
    let mut form = ComplaintForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?
    {
        match field.name() {
            Some("category") => {
                form.category = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?;
            }
            Some("description") => {
                form.description = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?;
            }
            Some("priority") => {
                form.priority = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?;
            }
            Some("image") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid multipart payload"))?;
                // An image part with no bytes means "no attachment"
                if !data.is_empty() {
                    form.image = Some((content_type, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Create a new complaint
///
/// POST /api/complaints
///
/// The owning user is always the verified token's subject; a client cannot
/// file a complaint on another user's behalf.
pub async fn create_complaint(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateComplaintResponse>), ApiError> {
    let form = read_form(&mut multipart).await?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_category(&form.category) {
        errors.add("category", e);
    }
    if let Err(e) = validate_description(&form.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_priority(&form.priority) {
        errors.add("priority", e);
    }
    errors.finish()?;

    let image_path = match &form.image {
        Some((content_type, data)) => {
            let path = state
                .uploads
                .save(content_type, data)
                .await
                .map_err(|e| match e {
                    UploadError::UnsupportedType(_) | UploadError::TooLarge { .. } => {
                        ApiError::validation_field("image", e.to_string())
                    }
                    UploadError::Io(io) => {
                        tracing::error!("Failed to store image: {}", io);
                        ApiError::internal("Failed to store image")
                    }
                })?;
            Some(path)
        }
        None => None,
    };

    let complaint = Complaint::create(
        &state.db,
        NewComplaint {
            user_id: &user.user_id,
            category: &form.category,
            description: &form.description,
            priority: &form.priority,
            image_path: image_path.as_deref(),
        },
    )
    .await?;

    tracing::info!(
        complaint_id = %complaint.id,
        user_id = %user.user_id,
        category = %complaint.category,
        "Complaint created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateComplaintResponse { id: complaint.id }),
    ))
}

/// List the caller's complaints, most recent first
///
/// GET /api/complaints
pub async fn list_my_complaints(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let complaints = Complaint::list_for_user(&state.db, &user.user_id).await?;
    Ok(Json(complaints))
}
