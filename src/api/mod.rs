mod admin;
pub mod auth;
mod complaints;
pub mod error;
mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Student routes (auth handled by the AuthUser extractor). The body
    // limit leaves headroom above the image bound for the other form fields.
    let complaint_routes = Router::new()
        .route(
            "/",
            get(complaints::list_my_complaints).post(complaints::create_complaint),
        )
        .layer(DefaultBodyLimit::max(
            state.config.uploads.max_bytes + 64 * 1024,
        ));

    // Admin routes
    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/complaints", get(admin::list_complaints))
        .route("/complaints/:id/status", put(admin::update_status))
        .route("/complaints/:id", delete(admin::delete_complaint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/complaints", complaint_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::uploads::ImageStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-form-boundary";

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.auth.token_secret = "e2e-test-secret".to_string();
        config.uploads.max_bytes = 64 * 1024;

        let db = db::init_test().await;
        let uploads = ImageStore::new(tmp.path(), config.uploads.max_bytes);
        (tmp, Arc::new(AppState::new(config, db, uploads)))
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Hand-rolled multipart body for the complaint form.
    fn complaint_form_body(
        category: &str,
        description: &str,
        priority: &str,
        image: Option<(&str, &[u8])>,
    ) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in [
            ("category", category),
            ("description", description),
            ("priority", priority),
        ] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn complaint_request(token: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/complaints")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn register_student(router: &Router, email: &str) -> (String, Value) {
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": "A",
                    "email": email,
                    "password": "password1",
                    "hostelBlock": "B1",
                    "roomNumber": "101",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    async fn admin_token(state: &Arc<AppState>, router: &Router) -> String {
        auth::ensure_admin_user(&state.db, "admin@test.local", "admin-password")
            .await
            .unwrap();
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "admin@test.local", "password": "admin-password"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_returns_token_and_public_user() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (token, user) = register_student(&router, "a@x.com").await;
        assert_eq!(user["email"], "a@x.com");
        assert_eq!(user["role"], "student");
        assert_eq!(user["hostelBlock"], "B1");
        assert!(user.get("password_hash").is_none());

        let claims = auth::verify_token(&token, &state.config.auth).unwrap();
        assert_eq!(claims.sub, user["id"].as_str().unwrap());
        assert_eq!(claims.role, "student");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflict() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        register_student(&router, "dup@x.com").await;

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": "B",
                    "email": "dup@x.com",
                    "password": "password2",
                    "hostelBlock": "B2",
                    "roomNumber": "202",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn test_register_missing_fields_rejected() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({"email": "a@x.com", "password": "password1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_register_ignores_caller_supplied_role() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": "Sneaky",
                    "email": "sneaky@x.com",
                    "password": "password1",
                    "hostelBlock": "B1",
                    "roomNumber": "101",
                    "role": "admin",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        assert_eq!(body["user"]["role"], "student");
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_are_indistinguishable() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        register_student(&router, "a@x.com").await;

        let wrong_password = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "a@x.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        let unknown_email = router
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "ghost@x.com", "password": "password1"}),
            ))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response_json(wrong_password).await,
            response_json(unknown_email).await
        );
    }

    #[tokio::test]
    async fn test_login_success() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (_, user) = register_student(&router, "a@x.com").await;

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "a@x.com", "password": "password1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        let claims = auth::verify_token(body["token"].as_str().unwrap(), &state.config.auth).unwrap();
        assert_eq!(claims.sub, user["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn test_complaints_require_auth() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let missing = router
            .clone()
            .oneshot(
                Request::get("/api/complaints")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = router
            .oneshot(
                Request::get("/api/complaints")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_and_list_complaint_with_image() {
        let (tmp, state) = test_state().await;
        let router = create_router(state);

        let (token, _) = register_student(&router, "a@x.com").await;

        let body = complaint_form_body(
            "Plumbing",
            "leak under the sink",
            "High",
            Some(("image/png", b"fake png bytes")),
        );
        let response = router
            .clone()
            .oneshot(complaint_request(&token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = response_json(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .oneshot(
                Request::get("/api/complaints")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = response_json(response).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["status"], "Pending");

        // Image landed on disk and its relative URL is persisted
        let image_path = listed[0]["image_path"].as_str().unwrap();
        let filename = image_path.strip_prefix("/uploads/").unwrap();
        assert!(tmp.path().join(filename).is_file());
    }

    #[tokio::test]
    async fn test_create_complaint_rejects_bad_fields() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let (token, _) = register_student(&router, "a@x.com").await;

        let body = complaint_form_body("Carpentry", "broken chair", "Urgent", None);
        let response = router
            .clone()
            .oneshot(complaint_request(&token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = complaint_form_body("Other", "big file", "Low", Some(("image/svg+xml", b"<svg>")));
        let response = router
            .oneshot(complaint_request(&token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_complaints_are_isolated_per_user() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (token_a, _) = register_student(&router, "a@x.com").await;
        let response = router
            .clone()
            .oneshot(complaint_request(
                &token_a,
                complaint_form_body("Internet", "wifi down", "Medium", None),
            ))
            .await
            .unwrap();
        let id = response_json(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();

        // User B cannot see A's complaint
        let (token_b, _) = register_student(&router, "b@x.com").await;
        let response = router
            .clone()
            .oneshot(
                Request::get("/api/complaints")
                    .header(header::AUTHORIZATION, format!("Bearer {token_b}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = response_json(response).await;
        assert!(listed.as_array().unwrap().is_empty());

        // An unfiltered admin listing does see it, with submitter info
        let admin = admin_token(&state, &router).await;
        let response = router
            .oneshot(
                Request::get("/api/admin/complaints")
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = response_json(response).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["student_name"], "A");
        assert_eq!(listed[0]["hostel_block"], "B1");
    }

    #[tokio::test]
    async fn test_admin_routes_reject_students_and_anonymous() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state);

        let (student, _) = register_student(&router, "a@x.com").await;

        for uri in ["/api/admin/dashboard", "/api/admin/complaints"] {
            let anonymous = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED, "{uri}");

            let as_student = router
                .clone()
                .oneshot(
                    Request::get(uri)
                        .header(header::AUTHORIZATION, format!("Bearer {student}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(as_student.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_filters_are_and_combined() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (token, _) = register_student(&router, "a@x.com").await;
        for (category, priority) in [("Plumbing", "High"), ("Electrical", "Low")] {
            let response = router
                .clone()
                .oneshot(complaint_request(
                    &token,
                    complaint_form_body(category, "something broke", priority, None),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let admin = admin_token(&state, &router).await;
        let get = |uri: String| {
            let router = router.clone();
            let admin = admin.clone();
            async move {
                let response = router
                    .oneshot(
                        Request::get(&uri)
                            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                            .body(Body::empty())
                            .unwrap(),
                    )
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                response_json(response).await
            }
        };

        let pending = get("/api/admin/complaints?status=Pending".to_string()).await;
        assert_eq!(pending.as_array().unwrap().len(), 2);

        let combined =
            get("/api/admin/complaints?status=Pending&category=Plumbing&priority=High".to_string())
                .await;
        let combined = combined.as_array().unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0]["category"], "Plumbing");

        let mismatch =
            get("/api/admin/complaints?category=Plumbing&priority=Low".to_string()).await;
        assert!(mismatch.as_array().unwrap().is_empty());

        // Empty query values mean no constraint
        let empty = get("/api/admin/complaints?status=&category=".to_string()).await;
        assert_eq!(empty.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_update_resolution_timestamp_and_dashboard() {
        let (_tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (token, _) = register_student(&router, "a@x.com").await;
        let response = router
            .clone()
            .oneshot(complaint_request(
                &token,
                complaint_form_body("Plumbing", "leak", "High", None),
            ))
            .await
            .unwrap();
        let id = response_json(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();

        let admin = admin_token(&state, &router).await;

        // Resolve: resolved_at is stamped
        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/admin/complaints/{id}/status"),
                Some(&admin),
                json!({"status": "Resolved"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = response_json(response).await;
        assert_eq!(updated["status"], "Resolved");
        assert!(updated["resolved_at"].is_string());

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/admin/dashboard")
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let stats = response_json(response).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["pending"], 0);
        assert_eq!(stats["resolved"], 1);

        // Reopen: resolved_at is cleared again
        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/admin/complaints/{id}/status"),
                Some(&admin),
                json!({"status": "In Progress"}),
            ))
            .await
            .unwrap();
        let reopened = response_json(response).await;
        assert_eq!(reopened["status"], "In Progress");
        assert!(reopened["resolved_at"].is_null());

        // Unknown status is rejected, unknown id is 404
        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/admin/complaints/{id}/status"),
                Some(&admin),
                json!({"status": "Done"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(json_request(
                "PUT",
                "/api/admin/complaints/no-such-id/status",
                Some(&admin),
                json!({"status": "Resolved"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_complaint_removes_row_and_image() {
        let (tmp, state) = test_state().await;
        let router = create_router(state.clone());

        let (token, _) = register_student(&router, "a@x.com").await;
        let response = router
            .clone()
            .oneshot(complaint_request(
                &token,
                complaint_form_body("Other", "misc", "Low", Some(("image/jpeg", b"jpeg"))),
            ))
            .await
            .unwrap();
        let id = response_json(response).await["id"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);

        let admin = admin_token(&state, &router).await;
        let response = router
            .clone()
            .oneshot(
                Request::delete(format!("/api/admin/complaints/{id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

        // Gone from the student's listing, and a second delete is a 404
        let response = router
            .clone()
            .oneshot(
                Request::get("/api/complaints")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response_json(response).await.as_array().unwrap().is_empty());

        let response = router
            .oneshot(
                Request::delete(format!("/api/admin/complaints/{id}"))
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
