//! End-to-end tests for the HTTP API.
//!
//! Each test builds the router over a fresh in-memory database and drives
//! it with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bazaar_api::{build_router, AppState, JwtManager};
use bazaar_core::{UserRole, DEFAULT_TENANT_ID};
use bazaar_db::{Database, DbConfig};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";
const ADMIN_ID: &str = "00000000-0000-4000-8000-0000000000aa";
const CUSTOMER_ID: &str = "00000000-0000-4000-8000-0000000000cc";

struct TestApp {
    router: Router,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, JwtManager::new(SECRET, 3600));
        TestApp {
            router: build_router(state),
            jwt: JwtManager::new(SECRET, 3600),
        }
    }

    fn token(&self, role: UserRole) -> String {
        let (sub, email) = match role {
            UserRole::Admin => (ADMIN_ID, "admin@bazaar.test"),
            UserRole::Customer => (CUSTOMER_ID, "shopper@bazaar.test"),
        };
        self.jwt.issue(sub, DEFAULT_TENANT_ID, email, role).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        self.send_with_headers(method, uri, token, body, &[]).await
    }

    async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Creates a product through the admin API and returns its id.
    async fn create_product(&self, name: &str, price_cents: i64, stock: i64) -> String {
        let admin = self.token(UserRole::Admin);
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/products",
                Some(&admin),
                Some(json!({
                    "name": name,
                    "description": format!("{name} description"),
                    "price_cents": price_cents,
                    "stock": stock,
                    "image_url": "https://img.bazaar.test/p.png",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
    assert_eq!(body["migrations"], json!([2, 2]));
}

#[tokio::test]
async fn test_cart_requires_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/cart", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_bad_token_rejected() {
    let app = TestApp::new().await;
    let forged = JwtManager::new("other-secret", 3600)
        .issue(CUSTOMER_ID, DEFAULT_TENANT_ID, "x@bazaar.test", UserRole::Customer)
        .unwrap();

    let (status, _) = app.send(Method::GET, "/api/me", Some(&forged), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_use_admin_routes() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);

    let (status, body) = app
        .send(Method::GET, "/api/admin/dashboard", Some(&customer), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_creates_product_visible_in_storefront() {
    let app = TestApp::new().await;
    let id = app.create_product("Linen Shirt", 4999, 10).await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/products/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Linen Shirt");
    assert_eq!(body["price_cents"], 4999);

    let (status, body) = app
        .send(Method::GET, "/api/products?keyword=linen", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn test_deactivated_product_is_hidden() {
    let app = TestApp::new().await;
    let admin = app.token(UserRole::Admin);
    let id = app.create_product("Old Stock", 1000, 1).await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/admin/products/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(Method::GET, &format!("/api/products/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_product_list_pagination_meta() {
    let app = TestApp::new().await;
    for i in 0..12 {
        app.create_product(&format!("Item {i}"), 100 + i, 5).await;
    }

    let (status, body) = app
        .send(Method::GET, "/api/products?page=2", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 12);
    assert_eq!(body["meta"]["page_size"], 10);
    assert_eq!(body["meta"]["total_pages"], 2);
    assert_eq!(body["meta"]["has_prev"], true);
    assert_eq!(body["meta"]["has_next"], false);
}

#[tokio::test]
async fn test_malformed_query_is_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/products?page=abc", None, None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_cart_checkout_and_order_flow() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);
    let admin = app.token(UserRole::Admin);
    let product = app.create_product("Merino Sweater", 8999, 3).await;

    let (status, cart) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&customer),
            Some(json!({ "product_id": product, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{cart}");
    assert_eq!(cart["totals"]["subtotal_cents"], 17998);
    assert_eq!(cart["totals"]["total_quantity"], 2);

    // More than the stock allows.
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/cart/items/{product}"),
            Some(&customer),
            Some(json!({ "quantity": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, address) = app
        .send(
            Method::POST,
            "/api/me/addresses",
            Some(&customer),
            Some(json!({
                "recipient_name": "Ada Shopper",
                "address_line1": "1 Market Street",
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701",
                "country": "US",
                "phone": "555-0100",
                "is_default": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{address}");

    let (status, order) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&customer),
            Some(json!({ "shipping_address_id": address["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_cents"], 17998);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, cart) = app.send(Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(cart["totals"]["item_count"], 0);

    let (status, mine) = app.send(Method::GET, "/api/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["meta"]["total"], 1);

    // Pending cannot jump to delivered.
    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "paid", "comment": "Paid by bank transfer" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "paid");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/orders/{order_id}/tracking"),
            Some(&admin),
            Some(json!({ "tracking_number": "1Z999AA10123456784" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "shipped");

    let (status, detail) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["tracking_number"], "1Z999AA10123456784");
    assert!(detail["history"].as_array().unwrap().len() >= 3);

    // Shipped orders are no longer the customer's to cancel.
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_checkout_with_empty_cart() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);

    let (status, body) = app
        .send(Method::POST, "/api/checkout", Some(&customer), Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_review_once_per_product() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);
    let product = app.create_product("Wool Scarf", 2599, 10).await;
    let uri = format!("/api/products/{product}/reviews");

    let (status, review) = app
        .send(
            Method::POST,
            &uri,
            Some(&customer),
            Some(json!({ "content": "Soft, no itch at all.", "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{review}");
    assert_eq!(review["rating"], 5);

    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(&customer),
            Some(json!({ "content": "Changed my mind", "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REVIEWED");

    let (status, list) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
}

#[tokio::test]
async fn test_review_like_and_reply() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);
    let admin = app.token(UserRole::Admin);
    let product = app.create_product("Canvas Tote", 2999, 10).await;

    let (_, review) = app
        .send(
            Method::POST,
            &format!("/api/products/{product}/reviews"),
            Some(&customer),
            Some(json!({ "content": "Holds a lot.", "rating": 4 })),
        )
        .await;
    let review_id = review["id"].as_str().unwrap().to_string();
    let like_uri = format!("/api/reviews/{review_id}/like");

    let (status, like) = app.send(Method::POST, &like_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(like["liked"], true);
    assert_eq!(like["like_count"], 1);

    let (status, body) = app.send(Method::POST, &like_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_LIKED");

    let (status, reply) = app
        .send(
            Method::POST,
            &format!("/api/products/{product}/reviews"),
            Some(&admin),
            Some(json!({ "content": "Thanks for the feedback!", "parent_id": review_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{reply}");

    let (status, thread) = app
        .send(Method::GET, &format!("/api/reviews/{review_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["reply_count"], 1);
    assert_eq!(thread["replies"].as_array().unwrap().len(), 1);
    assert_eq!(thread["liked_by"], json!([ADMIN_ID]));

    let (status, like) = app.send(Method::DELETE, &like_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(like["like_count"], 0);
}

#[tokio::test]
async fn test_admin_cannot_demote_self() {
    let app = TestApp::new().await;
    let admin = app.token(UserRole::Admin);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/users/{ADMIN_ID}"),
            Some(&admin),
            Some(json!({ "role": "customer" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/admin/users/{ADMIN_ID}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_customer_is_refused() {
    let app = TestApp::new().await;
    let admin = app.token(UserRole::Admin);
    let customer = app.token(UserRole::Customer);

    // First request creates the profile.
    let (status, _) = app.send(Method::GET, "/api/me", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, user) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/users/{CUSTOMER_ID}"),
            Some(&admin),
            Some(json!({ "status": "inactive" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "inactive");

    let (status, _) = app.send(Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dashboard_counts_orders() {
    let app = TestApp::new().await;
    let admin = app.token(UserRole::Admin);

    let (status, stats) = app
        .send(Method::GET, "/api/admin/dashboard", Some(&admin), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["orders"]["total_orders"], 0);
    assert_eq!(stats["users"]["admins"], 1);
    assert!(stats["recent_orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_is_scoped_by_tenant_header() {
    let app = TestApp::new().await;
    let product = app.create_product("Linen Shirt", 4999, 5).await;
    let other = [("x-tenant-id", "other-store")];

    let (status, _) = app
        .send(Method::GET, &format!("/api/products/{product}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send_with_headers(
            Method::GET,
            &format!("/api/products/{product}"),
            None,
            None,
            &other,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, list) = app
        .send_with_headers(Method::GET, "/api/products", None, None, &other)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 0);
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_tenant_header_is_bad_request() {
    let app = TestApp::new().await;
    let overlong = "t".repeat(65);

    for value in ["", overlong.as_str()] {
        let (status, body) = app
            .send_with_headers(
                Method::GET,
                "/api/products",
                None,
                None,
                &[("x-tenant-id", value)],
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_orders_are_invisible_across_tenants() {
    let app = TestApp::new().await;
    let customer = app.token(UserRole::Customer);
    let product = app.create_product("Merino Sweater", 8999, 3).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&customer),
            Some(json!({ "product_id": product, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, address) = app
        .send(
            Method::POST,
            "/api/me/addresses",
            Some(&customer),
            Some(json!({
                "recipient_name": "Ada Shopper",
                "address_line1": "1 Market Street",
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701",
                "country": "US",
                "phone": "555-0100",
                "is_default": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{address}");
    let (status, order) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&customer),
            Some(json!({ "shipping_address_id": address["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order_id = order["id"].as_str().unwrap().to_string();

    let outsider = app
        .jwt
        .issue(
            "00000000-0000-4000-8000-0000000000dd",
            "other-store",
            "outsider@bazaar.test",
            UserRole::Customer,
        )
        .unwrap();

    let (status, body) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), Some(&outsider), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, mine) = app.send(Method::GET, "/api/orders", Some(&outsider), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["meta"]["total"], 0);

    let (status, _) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
