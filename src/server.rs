use crate::data::SchedulingOutput;
use crate::solver::{self, SolveRequest};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info, warn};
use std::env;
use tower::limit::ConcurrencyLimitLayer;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CONCURRENT_SOLVES: usize = 2;

/// Listener address and solve concurrency, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub max_concurrent_solves: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_concurrent_solves: DEFAULT_MAX_CONCURRENT_SOLVES,
        }
    }
}

impl ServerConfig {
    /// Reads `SCHEDULER_ADDR` and `SCHEDULER_MAX_CONCURRENT_SOLVES`, falling
    /// back to the defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var("SCHEDULER_ADDR") {
            config.addr = addr;
        }
        if let Ok(raw) = env::var("SCHEDULER_MAX_CONCURRENT_SOLVES") {
            match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => config.max_concurrent_solves = limit,
                _ => warn!(
                    "Ignoring SCHEDULER_MAX_CONCURRENT_SOLVES={:?}, using {}",
                    raw, config.max_concurrent_solves
                ),
            }
        }
        config
    }
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> Result<Json<SchedulingOutput>, (StatusCode, String)> {
    // The search is CPU bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || solver::solve(&request))
        .await
        .map_err(|e| {
            error!("Solver task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    match result {
        Ok(output) => Ok(Json(output)),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

pub fn router(max_concurrent_solves: usize) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_solves))
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(config.max_concurrent_solves);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    info!(
        "Server running at http://{} ({} concurrent solves)",
        listener.local_addr()?,
        config.max_concurrent_solves
    );

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn halls() -> Value {
        json!((0..7)
            .map(|i| json!({ "name": format!("H{}", i), "capacity": 30 }))
            .collect::<Vec<_>>())
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/schedule/solve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_solve_endpoint_returns_schedule() {
        let body = json!({
            "catalog": {
                "courses": [{
                    "name": "Heuristics",
                    "activities": [
                        { "category": "lecture 1", "capacity": 30 },
                        { "category": "tutorial 1", "capacity": 20 }
                    ]
                }],
                "students": [
                    { "id": "s1", "courses": ["Heuristics"] },
                    { "id": "s2", "courses": ["Heuristics"] }
                ],
                "halls": halls()
            },
            "algorithm": { "name": "greedy" },
            "seed": 3
        });
        let response = router(1).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let output: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(output["algorithm"], "greedy");
        assert_eq!(output["assignments"].as_array().unwrap().len(), 2);
        assert_eq!(output["total"], 0);
        assert_eq!(output["penalties"]["capacity"], 0);
    }

    #[tokio::test]
    async fn test_invalid_catalog_is_bad_request() {
        let body = json!({
            "catalog": { "courses": [], "students": [], "halls": [] },
            "algorithm": { "name": "random" }
        });
        let response = router(1).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("invalid catalog"));
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:8080");
        assert_eq!(config.max_concurrent_solves, 2);
    }
}
