//! In-process HTTP tests for the order endpoints.
//!
//! The router is driven through `tower::ServiceExt::oneshot` over an
//! in-memory store; no socket or database is involved.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use mist_storefront::api::{self, AdminGuard, AppState};
use mist_storefront::notify::{Notifier, NotifyError, OutgoingMail};
use mist_storefront::order_link::OrderLinkSigner;
use mist_storefront::{Checkout, InMemoryStore, ProductId, ProductSnapshot};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

const ADMIN_TOKEN: &str = "admin-test-token";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("provider returned 503".into()));
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

struct Harness {
    router: axum::Router,
    store: Arc<InMemoryStore>,
    links: OrderLinkSigner,
}

fn pid(n: i64) -> ProductId {
    ProductId::new(n).unwrap()
}

fn harness_with(outbox: Arc<Outbox>) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    store
        .upsert_product(ProductSnapshot { id: pid(1), name: "Vela de soya".into(), stock: 5, is_active: true }, Some("/img/vela.png".into()))
        .unwrap();
    store
        .upsert_product(ProductSnapshot { id: pid(2), name: "Jabón artesanal".into(), stock: 1, is_active: true }, None)
        .unwrap();
    store
        .upsert_product(ProductSnapshot { id: pid(3), name: "Difusor".into(), stock: 9, is_active: false }, None)
        .unwrap();

    let links = OrderLinkSigner::new("http-test-secret", "https://tienda.example");
    let state = AppState {
        checkout: Checkout::new(store.clone(), outbox, links.clone()),
        admin: AdminGuard::new(Some(ADMIN_TOKEN)),
    };
    Harness { router: api::router(state), store, links }
}

fn harness() -> Harness {
    harness_with(Arc::new(Outbox::default()))
}

async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, serde_json::from_slice(&bytes).expect("body is not valid JSON"))
}

fn post_order(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn checkout_body(items: Value) -> Value {
    json!({
        "items": items,
        "customerName": "Ana López",
        "customerEmail": "ana@example.com",
        "customerPhone": "+52 33 1234 5678",
        "shippingAddress": {"street": "Av. Chapultepec 100", "city": "Guadalajara", "state": "Jalisco", "zip": "44100"},
        "shippingMethod": "express",
        "paymentMethod": "transfer"
    })
}

// ---------------------------------------------------------------------------
// POST /api/orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_order_returns_priced_order_and_decrements_stock() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 1, "quantity": 2, "unitPrice": 100}])))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let order = &json["data"];
    assert_eq!(order["subtotal"], "200.00");
    assert_eq!(order["shippingCost"], "250.00");
    assert_eq!(order["tax"], "32.00");
    assert_eq!(order["totalAmount"], "482.00");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["shippingMethod"], "express");
    assert_eq!(order["shippingAddress"]["country"], "México");
    assert_eq!(order["items"][0]["totalPrice"], "200.00");
    assert_eq!(order["items"][0]["product"], json!({"id": 1, "name": "Vela de soya", "imageUrl": "/img/vela.png"}));
    assert!(order["orderNumber"].as_str().unwrap().starts_with("MIST-"));
    assert_eq!(h.store.stock_of(pid(1)).unwrap(), Some(3));
}

#[tokio::test]
async fn empty_items_is_a_bad_request() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"success": false, "error": "Order items are required"}));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let h = harness();
    let req = Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"items\": ["))
        .unwrap();
    let (status, json) = call(&h.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn invalid_product_references_are_listed() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": "abc"}, {"productId": 1}, {"productId": 0}])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid product in order items");
    assert_eq!(json["invalidItems"], json!([{"index": 0, "productId": "abc"}, {"index": 2, "productId": 0}]));
}

#[tokio::test]
async fn missing_products_are_a_bad_request() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 1}, {"productId": 99}])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["missingProductIds"], json!([99]));
}

#[tokio::test]
async fn inactive_products_conflict() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 3}])))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Some products are not available");
    assert_eq!(json["inactiveProductIds"], json!([3]));
}

#[tokio::test]
async fn insufficient_stock_conflicts_and_leaves_stock_alone() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 2, "quantity": 2, "unitPrice": 80}])))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json,
        json!({
            "success": false,
            "error": "Insufficient stock for some products",
            "items": [{"productId": 2, "name": "Jabón artesanal", "available": 1, "requested": 2}]
        })
    );
    assert_eq!(h.store.stock_of(pid(2)).unwrap(), Some(1));
}

#[tokio::test]
async fn invalid_customer_details_are_a_bad_request() {
    let h = harness();
    let body = json!({"items": [{"productId": 1}], "customerName": "Ana", "customerEmail": "nope"});
    let (status, json) = call(&h.router, post_order(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("customerEmail"), "{error}");
    assert!(error.contains("shippingAddress is required"), "{error}");
    assert_eq!(h.store.stock_of(pid(1)).unwrap(), Some(5));
}

#[tokio::test]
async fn non_text_shipping_method_is_priced_as_standard() {
    let h = harness();
    let mut body = checkout_body(json!([{"productId": 1, "quantity": 1, "unitPrice": 100}]));
    body["shippingMethod"] = json!(5);
    body["notes"] = json!({"gift": true});
    let (status, json) = call(&h.router, post_order(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["shippingMethod"], "standard");
    assert_eq!(json["data"]["shippingCost"], "150.00");
    assert_eq!(json["data"]["notes"], Value::Null);
}

#[tokio::test]
async fn oversized_prices_are_a_bad_request() {
    let h = harness();
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 1, "quantity": 2, "unitPrice": 5e28}])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Order total exceeds"), "{json}");
    assert_eq!(h.store.stock_of(pid(1)).unwrap(), Some(5));
}

#[tokio::test]
async fn failing_mail_still_returns_the_order() {
    let outbox = Arc::new(Outbox { fail: true, ..Outbox::default() });
    let h = harness_with(outbox);
    let (status, json) = call(&h.router, post_order(checkout_body(json!([{"productId": 1, "quantity": 1, "unitPrice": 10}])))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(h.store.stock_of(pid(1)).unwrap(), Some(4));
}

// ---------------------------------------------------------------------------
// GET /api/orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_requires_admin() {
    let h = harness();
    let (status, json) = call(&h.router, get("/api/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({"success": false, "error": "Unauthorized"}));

    let (status, _) = call(&h.router, get("/api/orders", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let h = harness();
    for _ in 0..3 {
        let (status, _) = call(&h.router, post_order(checkout_body(json!([{"productId": 1, "quantity": 1}])))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = call(&h.router, get("/api/orders?page=1&limit=2", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][0]["id"], 3);
    assert_eq!(
        json["pagination"],
        json!({"currentPage": 1, "pageSize": 2, "total": 3, "totalPages": 2, "hasNextPage": true, "hasPreviousPage": false})
    );

    let (_, json) = call(&h.router, get("/api/orders?page=abc&limit=500&status=pending", Some(ADMIN_TOKEN))).await;
    assert_eq!(json["pagination"]["currentPage"], 1);
    assert_eq!(json["pagination"]["pageSize"], 100);
    assert_eq!(json["pagination"]["total"], 3);

    let (_, json) = call(&h.router, get("/api/orders?status=shipped", Some(ADMIN_TOKEN))).await;
    assert_eq!(json["pagination"]["total"], 0);

    let (status, _) = call(&h.router, get("/api/orders?status=lost", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// GET /api/orders/:id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_detail_opens_with_signed_token_or_admin() {
    let h = harness();
    let (_, created) = call(&h.router, post_order(checkout_body(json!([{"productId": 1, "quantity": 1}])))).await;
    let id = created["data"]["id"].as_i64().unwrap();
    let number = mist_storefront::OrderNumber::parse(created["data"]["orderNumber"].as_str().unwrap()).unwrap();
    let token = h.links.token(id, &number);

    let (status, json) = call(&h.router, get(&format!("/api/orders/{id}?token={token}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["orderNumber"], number.as_str());

    let (status, _) = call(&h.router, get(&format!("/api/orders/{id}?token=deadbeef"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h.router, get(&format!("/api/orders/{id}"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&h.router, get(&format!("/api/orders/{id}"), Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&h.router, get("/api/orders/999", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_service() {
    let h = harness();
    let (status, json) = call(&h.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "mist-storefront");
}
