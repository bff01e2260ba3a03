//! Client for the external model-serving endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body sent to the answer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Successful body returned by the answer service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// Ways the answer service can fail to produce an answer.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to answer service failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("answer service returned {0}")]
    Status(reqwest::StatusCode),
    #[error("answer service returned a malformed body")]
    Malformed,
    #[error("answer service reported an error: {0}")]
    Reported(String),
}

/// Something that maps a query string to an answer string.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String, UpstreamError>;
}

/// HTTP answer source posting `{ "query": ... }` to a fixed URL.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AnswerSource for UpstreamClient {
    async fn answer(&self, query: &str) -> Result<String, UpstreamError> {
        tracing::debug!(url = %self.url, "forwarding query to answer service");
        let resp = self
            .client
            .post(&self.url)
            .json(&QueryRequest {
                query: query.to_string(),
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(UpstreamError::Status(resp.status()));
        }

        let body: serde_json::Value = resp.json().await.map_err(|_| UpstreamError::Malformed)?;
        if let Some(answer) = body.get("answer").and_then(serde_json::Value::as_str) {
            return Ok(answer.to_string());
        }
        match body.get("error").and_then(serde_json::Value::as_str) {
            Some(reason) => Err(UpstreamError::Reported(reason.to_string())),
            None => Err(UpstreamError::Malformed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/query")
    }

    fn client(url: String) -> UpstreamClient {
        UpstreamClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_answer_field() {
        let app = Router::new().route(
            "/query",
            post(|Json(req): Json<QueryRequest>| async move {
                Json(serde_json::json!({ "answer": format!("echo: {}", req.query), "sources": [] }))
            }),
        );
        let url = serve(app).await;
        let answer = client(url).answer("What is tort?").await.unwrap();
        assert_eq!(answer, "echo: What is tort?");
    }

    #[tokio::test]
    async fn non_success_status_is_failure() {
        let app = Router::new().route(
            "/query",
            post(|| async { (StatusCode::BAD_GATEWAY, "down") }),
        );
        let url = serve(app).await;
        let err = client(url).answer("q").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(s) if s == StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn missing_answer_is_malformed() {
        let app = Router::new().route(
            "/query",
            post(|| async { Json(serde_json::json!({ "result": "nope" })) }),
        );
        let url = serve(app).await;
        let err = client(url).answer("q").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed));
    }

    #[tokio::test]
    async fn reported_error_is_surfaced() {
        let app = Router::new().route(
            "/query",
            post(|| async { Json(serde_json::json!({ "error": "model not loaded" })) }),
        );
        let url = serve(app).await;
        let err = client(url).answer("q").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Reported(r) if r == "model not loaded"));
    }

    #[tokio::test]
    async fn unreachable_service_is_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(format!("http://{addr}/query")).answer("q").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Request(_)));
    }
}
