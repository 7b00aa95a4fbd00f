use std::{any::Any, net::SocketAddr};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::{admin, auth, products};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(products::router(state.clone()))
                .merge(admin::router(state.clone())),
        )
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Something went wrong!" })),
    )
        .into_response()
}

pub async fn serve(app: Router, server: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}


/// Flows that need Postgres. Run with `DATABASE_URL` set and `cargo test -- --ignored`.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use sqlx::PgPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
    }

    impl TestApp {
        fn new(pool: PgPool) -> Self {
            let state = AppState::from_parts(pool, Arc::new(AppState::test_config()));
            Self {
                router: build_app(state),
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(t) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
            }
            let req = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }

        async fn register(&self, email: &str, role: &str) -> serde_json::Value {
            let (status, json) = self
                .call(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    Some(json!({
                        "email": email, "password": "secret1", "name": "Test",
                        "role": role, "farm_name": "Acres", "location": "Valley"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            json
        }

        async fn login(&self, email: &str) -> (String, serde_json::Value) {
            let (status, json) = self
                .call(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({"email": email, "password": "secret1"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            (json["token"].as_str().unwrap().to_string(), json["user"].clone())
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres via DATABASE_URL"]
    async fn duplicate_email_is_rejected(pool: PgPool) {
        let app = TestApp::new(pool);
        let created = app.register("dup@farm.test", "user").await;
        assert!(created.get("password_hash").is_none());
        assert_eq!(created["verified"], false);

        let (status, json) = app
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": "DUP@farm.test", "password": "secret1", "name": "X", "role": "user"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Email already in use");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres via DATABASE_URL"]
    async fn login_failures_are_indistinguishable(pool: PgPool) {
        let app = TestApp::new(pool);
        app.register("ann@farm.test", "user").await;

        let (s1, b1) = app
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ann@farm.test", "password": "wrong-pass"})),
            )
            .await;
        let (s2, b2) = app
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ghost@farm.test", "password": "secret1"})),
            )
            .await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(b1, b2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres via DATABASE_URL"]
    async fn product_lifecycle_respects_ownership(pool: PgPool) {
        let app = TestApp::new(pool);
        app.register("owner@farm.test", "farmer").await;
        app.register("rival@farm.test", "farmer").await;
        let (owner_token, owner) = app.login("owner@farm.test").await;
        let (rival_token, _) = app.login("rival@farm.test").await;

        let (status, product) = app
            .call(
                Method::POST,
                "/api/products",
                Some(&owner_token),
                Some(json!({"name": "Carrots", "description": "Orange", "price": 2.5, "stock": 40})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(product["farmer_id"], owner["id"]);
        let uri = format!("/api/products/{}", product["id"].as_str().unwrap());

        // Partial update keeps the other fields.
        let (status, updated) = app
            .call(Method::PUT, &uri, Some(&owner_token), Some(json!({"price": 3})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Carrots");
        assert_eq!(updated["description"], "Orange");
        assert_eq!(updated["stock"], 40);
        assert_eq!(updated["price"].as_f64(), Some(3.0));

        let (status, _) = app
            .call(Method::PUT, &uri, Some(&rival_token), Some(json!({"name": "Mine"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.call(Method::DELETE, &uri, Some(&rival_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let own_list = format!("/api/products/farmer/{}", owner["id"].as_str().unwrap());
        let (status, list) = app.call(Method::GET, &own_list, Some(&owner_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = app.call(Method::DELETE, &uri, Some(&owner_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.call(Method::DELETE, &uri, Some(&owner_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app
            .call(Method::PUT, &uri, Some(&owner_token), Some(json!({"price": 4})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let unknown = format!("/api/products/{}", uuid::Uuid::new_v4());
        let (status, json) = app
            .call(Method::PUT, &unknown, Some(&owner_token), Some(json!({"name": "Ghost"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Product not found");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres via DATABASE_URL"]
    async fn public_listing_is_newest_first(pool: PgPool) {
        let app = TestApp::new(pool);
        app.register("grower@farm.test", "farmer").await;
        let (token, _) = app.login("grower@farm.test").await;
        for name in ["first", "second"] {
            let (status, _) = app
                .call(
                    Method::POST,
                    "/api/products",
                    Some(&token),
                    Some(json!({"name": name, "price": 1, "stock": 1})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let (status, list) = app.call(Method::GET, "/api/products", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres via DATABASE_URL"]
    async fn admin_approval_flow(pool: PgPool) {
        let app = TestApp::new(pool);
        app.register("boss@farm.test", "admin").await;
        let farmer = app.register("new@farm.test", "farmer").await;
        let buyer = app.register("buyer@farm.test", "user").await;
        let (admin_token, _) = app.login("boss@farm.test").await;

        let (status, queue) = app
            .call(Method::GET, "/api/admin/farmers/unverified", Some(&admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue.as_array().unwrap().len(), 1);
        assert_eq!(queue[0]["farm_name"], "Acres");

        let approve = format!("/api/admin/approve-farmer/{}", farmer["id"].as_str().unwrap());
        for _ in 0..2 {
            let (status, json) = app.call(Method::PUT, &approve, Some(&admin_token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["verified"], true);
            assert_eq!(json["id"], farmer["id"]);
        }

        let (_, queue) = app
            .call(Method::GET, "/api/admin/farmers/unverified", Some(&admin_token), None)
            .await;
        assert!(queue.as_array().unwrap().is_empty());

        let not_farmer = format!("/api/admin/approve-farmer/{}", buyer["id"].as_str().unwrap());
        let (status, _) = app.call(Method::PUT, &not_farmer, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let missing = format!("/api/admin/approve-farmer/{}", uuid::Uuid::new_v4());
        let (status, _) = app.call(Method::PUT, &missing, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
