mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{admin_token, create_product, json_request, send, test_app};
use stockroom_api::entities::stock_movement::MovementKind;
use stockroom_api::services::movements::NewMovement;

async fn record(
    app: &axum::Router,
    token: &str,
    product_id: &str,
    kind: &str,
    quantity: i64,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/api/movements",
            Some(token),
            Some(json!({
                "product_id": product_id,
                "kind": kind,
                "quantity": quantity
            })),
        ),
    )
    .await
}

async fn quantity_on_hand(app: &axum::Router, token: &str, product_id: &str) -> i64 {
    let (status, body) = send(
        app,
        json_request(
            Method::GET,
            &format!("/api/products/{}", product_id),
            Some(token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["quantity_on_hand"].as_i64().unwrap()
}

#[tokio::test]
async fn entries_and_exits_adjust_stock() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Widget", 10).await;

    let (status, body) = record(&app, &token, &product_id, "entry", 5).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["quantity_on_hand"], 15);
    assert_eq!(body["movement"]["kind"], "entry");
    assert_eq!(body["movement"]["quantity"], 5);

    let (status, body) = record(&app, &token, &product_id, "exit", 3).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["quantity_on_hand"], 12);

    assert_eq!(quantity_on_hand(&app, &token, &product_id).await, 12);
}

#[tokio::test]
async fn exit_exceeding_stock_changes_nothing() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Scarce item", 4).await;

    let (status, _) = record(&app, &token, &product_id, "exit", 5).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // No stock change and no ledger entry.
    assert_eq!(quantity_on_hand(&app, &token, &product_id).await, 4);
    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/movements?product_id={}", product_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn exit_down_to_zero_is_allowed() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Clearance", 4).await;

    let (status, body) = record(&app, &token, &product_id, "exit", 4).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["quantity_on_hand"], 0);
}

#[tokio::test]
async fn zero_and_negative_quantities_are_rejected() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Quantities", 10).await;

    let (status, _) = record(&app, &token, &product_id, "entry", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = record(&app, &token, &product_id, "exit", -2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(quantity_on_hand(&app, &token, &product_id).await, 10);
}

#[tokio::test]
async fn unknown_movement_kind_gets_the_uniform_error_shape() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Kind check item", 5).await;

    let (status, body) = record(&app, &token, &product_id, "transfer", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Same JSON error record as every other failure, not a bare rejection.
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().is_some());
    assert!(body["request_id"].as_str().is_some());

    assert_eq!(quantity_on_hand(&app, &token, &product_id).await, 5);
}

#[tokio::test]
async fn movement_for_unknown_product_is_not_found() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let (status, _) = record(
        &app,
        &token,
        "00000000-0000-0000-0000-000000000000",
        "entry",
        1,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movements_snapshot_the_product_name() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "Original name", 10).await;

    record(&app, &token, &product_id, "entry", 1).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/products/{}", product_id),
            Some(&token),
            Some(json!({ "name": "Renamed product" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/movements?product_id={}", product_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(body["items"][0]["product_name"], "Original name");
}

#[tokio::test]
async fn history_filters_by_kind_and_orders_newest_first() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let product_id = create_product(&app, &token, "History item", 10).await;

    record(&app, &token, &product_id, "entry", 5).await;
    record(&app, &token, &product_id, "exit", 2).await;
    record(&app, &token, &product_id, "entry", 1).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/movements?product_id={}&kind=entry", product_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    for item in body["items"].as_array().unwrap() {
        assert_eq!(item["kind"], "entry");
    }

    let (_, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/movements?product_id={}", product_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn concurrent_exits_never_oversell() {
    let (_app, state) = test_app().await;
    let service = state.services.movements.clone();

    let product = state
        .services
        .products
        .create(serde_json::from_value(json!({
            "name": "Contended item",
            "unit_price": "1.00",
            "quantity_on_hand": 10
        })).unwrap())
        .await
        .unwrap();

    let a = service.record(
        "tester",
        NewMovement {
            product_id: product.id,
            kind: MovementKind::Exit,
            quantity: 6,
            note: None,
        },
    );
    let b = service.record(
        "tester",
        NewMovement {
            product_id: product.id,
            kind: MovementKind::Exit,
            quantity: 6,
            note: None,
        },
    );

    let (res_a, res_b) = tokio::join!(a, b);

    // Exactly one of the two exits can fit into the available stock.
    let successes = [&res_a, &res_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let remaining = state
        .services
        .products
        .get(product.id)
        .await
        .unwrap()
        .quantity_on_hand;
    assert_eq!(remaining, 4);
}
