//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod decisions;
pub mod health;
pub mod revocations;

/// Creates the API router; everything except the health check requires a
/// bearer token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(decisions::routes())
        .merge(revocations::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            Request, StatusCode,
            header::{AUTHORIZATION, CONTENT_TYPE},
        },
    };
    use chrono::{Duration, NaiveDate, Utc};
    use http_body_util::BodyExt;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::json;
    use tower::ServiceExt;
    use uchwala_core::revocation::Approval;
    use uchwala_core::signature::SignatureVerification;
    use uchwala_db::entities::{
        decisions, revocation_requests,
        sea_orm_active_enums::{DecisionStatus, RevocationStatus},
    };
    use uchwala_shared::types::{BusinessProfileId, DecisionId, RevocationRequestId, UserId};

    use crate::{create_router, test_support};

    const BOUNDARY: &str = "uchwala-test-boundary";
    const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF";

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// One multipart form part.
    struct Part<'a> {
        name: &'a str,
        filename: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    }

    impl<'a> Part<'a> {
        fn text(name: &'a str, data: &'a str) -> Self {
            Self {
                name,
                filename: None,
                content_type: None,
                data: data.as_bytes(),
            }
        }

        fn pdf(filename: &'a str) -> Self {
            Self {
                name: "file",
                filename: Some(filename),
                content_type: Some("application/pdf"),
                data: PDF,
            }
        }
    }

    fn multipart_request(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            let mut head = format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"",
                part.name
            );
            if let Some(filename) = part.filename {
                head += &format!("; filename=\"{filename}\"");
            }
            head += "\r\n";
            if let Some(content_type) = part.content_type {
                head += &format!("Content-Type: {content_type}\r\n");
            }
            head += "\r\n";
            body.extend_from_slice(head.as_bytes());
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    /// Result of a statement that returns no rows, such as `SET LOCAL`.
    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn decision_row(id: DecisionId, bp: BusinessProfileId) -> decisions::Model {
        let now = Utc::now().fixed_offset();
        decisions::Model {
            id: id.into_inner(),
            business_profile_id: bp.into_inner(),
            number: "7/2026".to_string(),
            title: "Powołanie członka zarządu".to_string(),
            content: None,
            adopted_on: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            status: DecisionStatus::Active,
            created_by: UserId::new().into_inner(),
            created_at: now,
            updated_at: now,
        }
    }

    fn valid_verification() -> SignatureVerification {
        SignatureVerification {
            has_signature: true,
            crypto_valid: true,
            signer_subject: Some("Anna Nowak".to_string()),
            signing_time: Some(Utc::now()),
            notes: Vec::new(),
            verified_at: Utc::now(),
        }
    }

    struct RowSpec {
        id: RevocationRequestId,
        bp: BusinessProfileId,
        requested_by: UserId,
        approvers: Vec<UserId>,
        approvals: Vec<UserId>,
        status: RevocationStatus,
        verification: Option<SignatureVerification>,
    }

    fn revocation_row(spec: RowSpec) -> revocation_requests::Model {
        let now = Utc::now().fixed_offset();
        let approvals: Vec<Approval> = spec
            .approvals
            .into_iter()
            .map(|user_id| Approval {
                user_id,
                approved_at: Utc::now(),
                signature: None,
            })
            .collect();
        let key = format!("{}/revocations/{}/upload/uchwala.pdf", spec.bp, spec.id);

        revocation_requests::Model {
            id: spec.id.into_inner(),
            decision_id: DecisionId::new().into_inner(),
            business_profile_id: spec.bp.into_inner(),
            reason: "Błąd w treści uchwały".to_string(),
            requested_by: spec.requested_by.into_inner(),
            requested_at: now,
            required_approvers: serde_json::to_value(&spec.approvers).unwrap(),
            approvals: serde_json::to_value(&approvals).unwrap(),
            signature_verification: spec
                .verification
                .map(|v| serde_json::to_value(v).unwrap()),
            document_url: Some(format!("file:///tmp/{key}")),
            document_name: Some("uchwala.pdf".to_string()),
            document_storage_key: Some(key),
            document_content_type: Some("application/pdf".to_string()),
            document_size: Some(PDF.len() as i64),
            document_uploaded_by: Some(spec.requested_by.into_inner()),
            document_uploaded_at: Some(now),
            status: spec.status,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Database scripted for `create`: load the decision, then project its
    /// status and insert the request in one transaction.
    fn create_db(decision_id: DecisionId, bp: BusinessProfileId, requester: UserId) -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![decision_row(decision_id, bp)]])
            .append_query_results([vec![revocation_row(RowSpec {
                id: RevocationRequestId::new(),
                bp,
                requested_by: requester,
                approvers: vec![requester],
                approvals: Vec::new(),
                status: RevocationStatus::Pending,
                verification: None,
            })]])
            .append_exec_results([exec(0), exec(0), exec(1)])
            .into_connection()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = create_router(test_support::state());

        let response = app.oneshot(get("/api/v1/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "down");
        assert_eq!(body["storage"], "local");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = create_router(test_support::state());

        let response = app.oneshot(get("/api/v1/decisions", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let app = create_router(test_support::state());

        let response = app
            .oneshot(get("/api/v1/decisions", Some("not.a.token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let state = test_support::state();
        let token = state
            .jwt_service
            .issue_token(
                UserId::new(),
                BusinessProfileId::new(),
                "member",
                Duration::hours(-2),
            )
            .unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(get("/api/v1/revocations/not-a-uuid", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let state = test_support::state();
        let token = test_support::token(&state, UserId::new(), BusinessProfileId::new(), "member");
        let app = create_router(state);

        // Rejected by the decision list query parser, past the auth layer.
        let response = app
            .oneshot(get("/api/v1/decisions?status=archived", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "INVALID_STATUS");
    }

    #[tokio::test]
    async fn test_create_revocation_without_document() {
        let (bp, decision_id, requester) = (BusinessProfileId::new(), DecisionId::new(), UserId::new());
        let state = test_support::state_with_db(create_db(decision_id, bp, requester));
        let token = test_support::token(&state, requester, bp, "member");
        let app = create_router(state);

        let payload = json!({"reason": "Błąd w treści uchwały", "required_approvers": [requester]})
            .to_string();
        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/decisions/{decision_id}/revocations"),
                &token,
                &[Part::text("payload", &payload)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["decision_id"], decision_id.to_string());
        assert!(body.get("document").is_none());
        assert_eq!(body["can_cancel"], true);
    }

    #[tokio::test]
    async fn test_create_revocation_with_document() {
        let (bp, decision_id, requester) = (BusinessProfileId::new(), DecisionId::new(), UserId::new());
        let state = test_support::state_with_db(create_db(decision_id, bp, requester));
        let token = test_support::token(&state, requester, bp, "member");
        let app = create_router(state);

        let payload = json!({"reason": "Błąd w treści uchwały", "required_approvers": [requester]})
            .to_string();
        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/decisions/{decision_id}/revocations"),
                &token,
                &[Part::text("payload", &payload), Part::pdf("uchylenie.pdf")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "pending_verification");
        assert_eq!(body["document"]["name"], "uchylenie.pdf");
        assert_eq!(body["document"]["content_type"], "application/pdf");
        assert_eq!(body["document"]["size"], PDF.len());
    }

    #[tokio::test]
    async fn test_create_revocation_requires_payload_part() {
        let state = test_support::state();
        let token = test_support::token(&state, UserId::new(), BusinessProfileId::new(), "member");
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/decisions/{}/revocations", DecisionId::new()),
                &token,
                &[Part::pdf("uchylenie.pdf")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_document_upload_requires_file_part() {
        let state = test_support::state();
        let token = test_support::token(&state, UserId::new(), BusinessProfileId::new(), "member");
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/revocations/{}/document", RevocationRequestId::new()),
                &token,
                &[Part::text("note", "bez pliku")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "INVALID_DOCUMENT");
    }

    #[tokio::test]
    async fn test_second_approval_by_same_user_conflicts() {
        let (bp, id) = (BusinessProfileId::new(), RevocationRequestId::new());
        let (requester, a, b) = (UserId::new(), UserId::new(), UserId::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![revocation_row(RowSpec {
                id,
                bp,
                requested_by: requester,
                approvers: vec![a, b],
                approvals: vec![a],
                status: RevocationStatus::Verified,
                verification: Some(valid_verification()),
            })]])
            .append_exec_results([exec(0)])
            .into_connection();
        let state = test_support::state_with_db(db);
        let token = test_support::token(&state, a, bp, "member");
        let app = create_router(state);

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/revocations/{id}/approvals"),
                &token,
                &json!({"signature": "A"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "DUPLICATE_APPROVAL");
    }

    #[tokio::test]
    async fn test_verification_snapshot_forbidden_for_members() {
        let state = test_support::state();
        let token = test_support::token(&state, UserId::new(), BusinessProfileId::new(), "member");
        let app = create_router(state);

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/revocations/{}/verification", RevocationRequestId::new()),
                &token,
                &serde_json::to_value(valid_verification()).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_verification_snapshot_accepted_from_verifier_role() {
        let (bp, id, requester) = (BusinessProfileId::new(), RevocationRequestId::new(), UserId::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![revocation_row(RowSpec {
                id,
                bp,
                requested_by: requester,
                approvers: vec![requester],
                approvals: Vec::new(),
                status: RevocationStatus::PendingVerification,
                verification: None,
            })]])
            // Read, then the versioned update in its own transaction.
            .append_exec_results([exec(0), exec(0), exec(1)])
            .into_connection();
        let state = test_support::state_with_db(db);
        let token = test_support::token(&state, UserId::new(), bp, super::revocations::VERIFIER_ROLE);
        let app = create_router(state);

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/revocations/{id}/verification"),
                &token,
                &serde_json::to_value(valid_verification()).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "verified");
        assert_eq!(body["version"], 2);
        assert_eq!(body["signature_verification"]["signer_subject"], "Anna Nowak");
    }
}
