mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{admin_token, json_request, login_token, send, test_app, ADMIN_PASSWORD};

#[tokio::test]
async fn login_returns_token_and_permissions() {
    let (app, _state) = test_app().await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "login": "admin", "password": ADMIN_PASSWORD })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["login_name"], "admin");
    assert_eq!(body["user"]["access_level_name"], "Administrator");
    assert_eq!(body["permissions"]["manage_access"], true);
    assert_eq!(body["permissions"]["view_history"], true);
    // The password hash must never appear in any response shape.
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_is_case_insensitive_on_identifier() {
    let (app, _state) = test_app().await;
    let token = login_token(&app, "ADMIN", ADMIN_PASSWORD).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_identical() {
    let (app, _state) = test_app().await;

    let (status_a, body_a) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "login": "admin", "password": "not-the-password" })),
        ),
    )
    .await;
    let (status_b, body_b) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "login": "nobody-here", "password": "whatever-pw" })),
        ),
    )
    .await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a["message"], body_b["message"]);
}

#[tokio::test]
async fn account_locks_after_repeated_failures() {
    let (app, _state) = test_app().await;

    for _ in 0..5 {
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "login": "admin", "password": "wrong-every-time" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Correct credentials are refused while the lock is active.
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "login": "admin", "password": ADMIN_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn successful_login_resets_the_failure_counter() {
    let (app, _state) = test_app().await;

    // Four failures stay under the threshold.
    for _ in 0..4 {
        send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "login": "admin", "password": "wrong-every-time" })),
            ),
        )
        .await;
    }
    login_token(&app, "admin", ADMIN_PASSWORD).await;

    // The counter restarted, so four more failures still do not lock.
    for _ in 0..4 {
        send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "login": "admin", "password": "wrong-every-time" })),
            ),
        )
        .await;
    }
    login_token(&app, "admin", ADMIN_PASSWORD).await;
}

#[tokio::test]
async fn session_endpoint_reflects_the_caller() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/auth/session", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["login_name"], "admin");
    assert_eq!(body["user"]["access_level_name"], "Administrator");
    assert_eq!(body["permissions"]["manage_access"], true);
}

#[tokio::test]
async fn session_check_reports_anonymous_instead_of_erroring() {
    let (app, _state) = test_app().await;

    // No token and a garbage token both come back as a plain "not
    // authenticated", never as an error status.
    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/auth/session", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
    assert!(body.get("user").is_none());

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            "/api/auth/session",
            Some("not-a-real-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let (app, _state) = test_app().await;

    let (status, _) = send(
        &app,
        json_request(Method::GET, "/api/products", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(Method::GET, "/api/movements", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/auth/logout", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/auth/session", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn password_reset_request_does_not_reveal_accounts() {
    let (app, _state) = test_app().await;

    let (status_known, body_known) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/password-reset/request",
            None,
            Some(json!({ "email": "admin@localhost" })),
        ),
    )
    .await;
    let (status_unknown, body_unknown) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/password-reset/request",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        ),
    )
    .await;

    assert_eq!(status_known, StatusCode::OK);
    assert_eq!(status_unknown, StatusCode::OK);
    assert_eq!(body_known, body_unknown);
}

#[tokio::test]
async fn bogus_reset_token_is_rejected() {
    let (app, _state) = test_app().await;
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/password-reset/submit",
            None,
            Some(json!({ "token": "nonsense", "password": "brand-new-pw" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
