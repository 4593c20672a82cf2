mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{admin_token, create_product, json_request, send, test_app};

#[tokio::test]
async fn product_round_trip() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({
                "name": "Boxed widget",
                "description": "A widget in a box",
                "barcode": "7891234567895",
                "unit_price": "12.50",
                "quantity_on_hand": 10,
                "minimum_stock": 3
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Boxed widget");
    assert_eq!(body["quantity_on_hand"], 10);
    assert_eq!(body["below_minimum"], false);
    let id = body["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(Method::GET, &format!("/api/products/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["barcode"], "7891234567895");
}

#[tokio::test]
async fn short_names_and_negative_prices_are_rejected() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "name": "x", "unit_price": "1.00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "name": "Priced wrong", "unit_price": "-1.00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn defaults_apply_when_quantities_are_omitted() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "name": "Bare minimum", "unit_price": "0" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quantity_on_hand"], 0);
    assert_eq!(body["minimum_stock"], 0);
    // Zero on hand with zero minimum counts as needing restock.
    assert_eq!(body["below_minimum"], true);
}

#[tokio::test]
async fn listing_searches_and_paginates() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    create_product(&app, &token, "Alpha bracket", 10).await;
    create_product(&app, &token, "Beta bracket", 10).await;
    create_product(&app, &token, "Gamma shelf", 10).await;

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/products?search=bracket", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (status, body) = send(
        &app,
        json_request(Method::GET, "/api/products?page=1&per_page=2", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["per_page"], 2);
}

#[tokio::test]
async fn below_minimum_filter_flags_restock_candidates() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    // create_product uses minimum_stock = 2.
    create_product(&app, &token, "Plenty in stock", 50).await;
    create_product(&app, &token, "Running low", 1).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            "/api/products?below_minimum=true",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Running low");
    assert_eq!(items[0]["below_minimum"], true);
}

#[tokio::test]
async fn below_minimum_filter_paginates_consistently() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    // create_product uses minimum_stock = 2; three stocked, two low.
    create_product(&app, &token, "Stocked A", 50).await;
    create_product(&app, &token, "Stocked B", 50).await;
    create_product(&app, &token, "Stocked C", 50).await;
    create_product(&app, &token, "Low A", 1).await;
    create_product(&app, &token, "Low B", 0).await;

    for page in 1..=2 {
        let (status, body) = send(
            &app,
            json_request(
                Method::GET,
                &format!("/api/products?below_minimum=true&page={}&per_page=1", page),
                Some(&token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1, "page {} should not come back empty", page);
        assert_eq!(items[0]["below_minimum"], true);
    }
}

#[tokio::test]
async fn update_cannot_touch_stock_directly() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let id = create_product(&app, &token, "Fixed stock", 7).await;

    // quantity_on_hand is not an updatable field; it is simply ignored.
    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(&token),
            Some(json!({ "name": "Fixed stock v2", "quantity_on_hand": 999 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Fixed stock v2");
    assert_eq!(body["quantity_on_hand"], 7);
}

#[tokio::test]
async fn missing_products_are_not_found() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::GET,
            "/api/products/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movement_history_survives_product_deletion() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;
    let id = create_product(&app, &token, "Doomed product", 10).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/movements",
            Some(&token),
            Some(json!({ "product_id": id, "kind": "exit", "quantity": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request(Method::DELETE, &format!("/api/products/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The ledger keeps the record; the name snapshot keeps it readable.
    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            &format!("/api/movements?product_id={}", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["product_name"], "Doomed product");
}

#[tokio::test]
async fn error_responses_carry_a_request_id() {
    let (app, _state) = test_app().await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::GET,
            "/api/products/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["request_id"].as_str().is_some());
    assert!(body["message"].as_str().unwrap().contains("not found"));
}
