pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::pipeline::MasterQueryPipeline;

pub type SharedPipeline = Arc<MasterQueryPipeline>;

pub fn create_router(pipeline: SharedPipeline) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/cryptocurrency/master", get(routes::get_master))
        .route("/api/v1/cryptocurrency/:symbol", get(routes::get_symbol))
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn start_server(pipeline: MasterQueryPipeline, addr: &str) -> anyhow::Result<()> {
    let app = create_router(Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{listing, MockProvider};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(provider: Arc<MockProvider>) -> Router {
        create_router(Arc::new(MasterQueryPipeline::new(provider, "USD")))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn provider_with_page() -> Arc<MockProvider> {
        let provider = Arc::new(MockProvider::new());
        provider.set_page(
            2,
            vec![
                listing(1, "Bitcoin", "BTC", 8e11, 0.6, 2.0),
                listing(1027, "Ethereum", "ETH", 3e11, -0.6, -2.0),
            ],
        );
        provider
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(Arc::new(MockProvider::new())), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["provider"], "mock");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_master_envelope() {
        let (status, body) = get_json(
            app(provider_with_page()),
            "/api/v1/cryptocurrency/master?filter=gainers&sortBy=price",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["error_code"], 0);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["symbol"], "BTC");
        assert_eq!(body["data"][0]["raw_percent_change"]["6h"], 0.5);
        assert_eq!(body["data"][0]["percent_change"]["24h"], 2);
        assert_eq!(body["pagination"]["total_items"], 1);
        assert_eq!(body["pagination"]["page_size"], 10);
        assert_eq!(body["filter"], "gainers");
        assert_eq!(body["sort"]["by"], "percent_change");
        assert_eq!(body["sort"]["period"], "24h");
        assert_eq!(body["sort"]["direction"], "desc");
        assert!(body["search"].is_null());
    }

    #[tokio::test]
    async fn test_master_validation_error() {
        let provider = provider_with_page();
        let (status, body) = get_json(
            app(provider.clone()),
            "/api/v1/cryptocurrency/master?sortDirection=sideways",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"]["error_code"], 400);
        let message = body["status"]["error_message"].as_str().unwrap();
        assert!(message.contains("sortDirection"));
        assert!(message.contains("asc, desc"));
        assert!(provider.listings_calls().is_empty());
    }

    #[tokio::test]
    async fn test_master_upstream_failure_hides_details() {
        let provider = Arc::new(MockProvider::new());
        provider.set_listings_error("HTTP 401: key abc123 revoked");

        let (status, body) = get_json(app(provider), "/api/v1/cryptocurrency/master").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"]["error_code"], 500);
        assert!(!body["status"]["error_message"]
            .as_str()
            .unwrap()
            .contains("abc123"));
    }

    #[tokio::test]
    async fn test_symbol_lookup() {
        let (status, body) = get_json(app(provider_with_page()), "/api/v1/cryptocurrency/eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Ethereum");

        let (status, body) = get_json(app(provider_with_page()), "/api/v1/cryptocurrency/DOGE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"]["error_code"], 404);
    }
}
