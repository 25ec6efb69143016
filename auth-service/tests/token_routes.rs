mod support;

use std::sync::Arc;

use auth_service::{build_router, AuthConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common_auth::{Role, Tier, EPHEMERAL_SUBJECT_PREFIX, STATION_SUBJECT_PREFIX};
use common_security::{scope, test_request_headers};
use http_body_util::BodyExt;
use serde_json::json;
use support::{error_code, json_body, post_json, StaticCredentialVerifier, TestApp, UnavailableCredentials};
use tower::ServiceExt;
use uuid::Uuid;

fn app_with_manager() -> (TestApp, Uuid) {
    let (verifier, user_id) =
        StaticCredentialVerifier::default().with_account("manager@example.com", "s3cret!", Role::Manager);
    (TestApp::new(Arc::new(verifier)), user_id)
}

#[tokio::test]
async fn login_issues_persistent_token_with_registry_scopes() {
    let (app, user_id) = app_with_manager();
    let restaurant_id = Uuid::new_v4();
    app.memberships.grant(user_id, restaurant_id).unwrap();

    let resp = build_router(app.state.clone())
        .oneshot(post_json(
            "/login",
            json!({ "email": "Manager@Example.com", "password": "s3cret!", "restaurantId": restaurant_id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["tier"], "persistent");
    assert_eq!(body["role"], "manager");

    let claim = app.codec().verify(body["accessToken"].as_str().unwrap()).unwrap();
    assert_eq!(claim.subject_id, user_id.to_string());
    assert_eq!(claim.restaurant_id, Some(restaurant_id));
    assert!(claim.scopes.contains(scope::STATIONS_ISSUE));
    assert_eq!(&claim.scopes, app.state.access.registry().scopes_for(Role::Manager));
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let (app, _) = app_with_manager();
    let resp = build_router(app.state.clone())
        .oneshot(post_json("/login", json!({ "email": "manager@example.com", "password": "nope" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&resp), Some("invalid_credentials"));
}

#[tokio::test]
async fn login_for_foreign_restaurant_is_403() {
    let (app, _) = app_with_manager();
    let resp = build_router(app.state.clone())
        .oneshot(post_json(
            "/login",
            json!({ "email": "manager@example.com", "password": "s3cret!", "restaurantId": Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), Some("restaurant_access_denied"));
}

#[tokio::test]
async fn login_when_credential_store_is_down_is_503() {
    let app = TestApp::new(Arc::new(UnavailableCredentials));
    let resp = build_router(app.state.clone())
        .oneshot(post_json("/login", json!({ "email": "a@example.com", "password": "x" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&resp), Some("credential_store_unavailable"));
}

#[tokio::test]
async fn guest_session_is_bound_and_narrow() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let restaurant_id = Uuid::new_v4();
    let resp = build_router(app.state.clone())
        .oneshot(post_json("/sessions/guest", json!({ "restaurantId": restaurant_id })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["tier"], "ephemeral");
    assert_eq!(body["restaurantId"], restaurant_id.to_string());
    assert_eq!(body["expiresIn"], 3600);

    let claim = app.codec().verify(body["accessToken"].as_str().unwrap()).unwrap();
    assert!(claim.subject_id.starts_with(EPHEMERAL_SUBJECT_PREFIX));
    assert_eq!(claim.role, Role::Customer);
    assert!(!claim.scopes.contains(scope::ORDERS_UPDATE_STATUS));
    assert!(claim.scopes.contains(scope::ORDERS_READ_OWN));

}

#[tokio::test]
async fn issued_tokens_are_counted_per_tier() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let router = build_router(app.state.clone());
    router
        .clone()
        .oneshot(post_json("/sessions/guest", json!({ "restaurantId": Uuid::new_v4() })))
        .await
        .unwrap();

    let resp = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"tokens_issued_total{tier="ephemeral"} 1"#));
}

#[tokio::test]
async fn guest_sessions_can_be_disabled() {
    let app = TestApp::with_config(
        Arc::new(StaticCredentialVerifier::default()),
        AuthConfig { guest_sessions_enabled: false },
    );
    let resp = build_router(app.state.clone())
        .oneshot(post_json("/sessions/guest", json!({ "restaurantId": Uuid::new_v4() })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), Some("guest_sessions_disabled"));
}

fn station_request(token: &str, restaurant_id: Uuid, role: &str) -> Request<Body> {
    let mut req = post_json("/stations/tokens", json!({ "role": role }));
    test_request_headers!(req, token = token, restaurant = restaurant_id);
    req
}

#[tokio::test]
async fn manager_issues_station_token_for_their_restaurant() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let restaurant_id = Uuid::new_v4();
    let token = app.staff(Role::Manager, restaurant_id);

    let resp = build_router(app.state.clone())
        .oneshot(station_request(&token, restaurant_id, "kitchen"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["tier"], "station");

    let claim = app.codec().verify(body["accessToken"].as_str().unwrap()).unwrap();
    assert!(claim.subject_id.starts_with(STATION_SUBJECT_PREFIX));
    assert_eq!(claim.role, Role::Kitchen);
    assert_eq!(claim.restaurant_id, Some(restaurant_id));
    assert_eq!(claim.role.tier(), Tier::Station);
}

#[tokio::test]
async fn server_cannot_issue_station_tokens() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let restaurant_id = Uuid::new_v4();
    let token = app.staff(Role::Server, restaurant_id);

    let resp = build_router(app.state.clone())
        .oneshot(station_request(&token, restaurant_id, "kitchen"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), Some("insufficient_scope"));
    assert_eq!(json_body(resp).await["missing_scope"], scope::STATIONS_ISSUE);
}

#[tokio::test]
async fn station_token_for_staff_role_is_rejected() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let restaurant_id = Uuid::new_v4();
    let token = app.staff(Role::Owner, restaurant_id);

    let resp = build_router(app.state.clone())
        .oneshot(station_request(&token, restaurant_id, "cashier"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&resp), Some("invalid_station_role"));
}

#[tokio::test]
async fn station_token_for_other_restaurant_is_denied() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let token = app.staff(Role::Manager, Uuid::new_v4());

    let resp = build_router(app.state.clone())
        .oneshot(station_request(&token, Uuid::new_v4(), "expo"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), Some("restaurant_access_denied"));
}

#[tokio::test]
async fn sessions_me_reports_resolved_tier() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let restaurant_id = Uuid::new_v4();
    let router = build_router(app.state.clone());

    let guest = json_body(
        router
            .clone()
            .oneshot(post_json("/sessions/guest", json!({ "restaurantId": restaurant_id })))
            .await
            .unwrap(),
    )
    .await;

    let mut req = Request::builder().uri("/sessions/me").body(Body::empty()).unwrap();
    test_request_headers!(req, token = guest["accessToken"].as_str().unwrap());
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["identity"]["tier"], "ephemeral");
    assert_eq!(body["identity"]["restaurant_id"], restaurant_id.to_string());
    assert_eq!(body["claim"]["role"], "customer");
}

#[tokio::test]
async fn sessions_me_without_token_is_401() {
    let app = TestApp::new(Arc::new(StaticCredentialVerifier::default()));
    let resp = build_router(app.state.clone())
        .oneshot(Request::builder().uri("/sessions/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&resp), Some("unauthenticated"));
}
