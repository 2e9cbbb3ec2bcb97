use crate::llm::scrub::api_error;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Minimal client for the workflow gateway's thread endpoints.
pub struct GatewayClient {
    http: reqwest::Client,
    base: Url,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized)
            .with_context(|| format!("invalid gateway URL: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build gateway HTTP client")?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid gateway path: {path}"))
    }

    pub async fn thread_exists(&self, thread_id: &str) -> Result<bool> {
        let response = self
            .http
            .get(self.endpoint(&format!("threads/{thread_id}"))?)
            .send()
            .await
            .context("gateway thread lookup failed")?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(api_error("gateway", response).await),
        }
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        graph_name: &str,
        email_input: &serde_json::Value,
        rerun: bool,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("threads/{thread_id}/runs"))?)
            .json(&json!({
                "graph_name": graph_name,
                "email_input": email_input,
                "rerun": rerun,
            }))
            .send()
            .await
            .context("gateway run request failed")?;
        if !response.status().is_success() {
            return Err(api_error("gateway", response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::GatewayClient;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn thread_lookup_maps_404_to_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads/known"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/unknown"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = GatewayClient::new(&server.uri()).unwrap();
        assert!(client.thread_exists("known").await.unwrap());
        assert!(!client.thread_exists("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn create_run_posts_graph_and_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/t-1/runs"))
            .and(body_partial_json(json!({
                "graph_name": "email_assistant_hitl_memory_gmail",
                "email_input": {"id": "m-1"},
                "rerun": true
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = GatewayClient::new(&server.uri()).unwrap();
        client
            .create_run(
                "t-1",
                "email_assistant_hitl_memory_gmail",
                &json!({"id": "m-1", "from": "a@b.com"}),
                true,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/t-1/runs"))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown graph 'x'"))
            .mount(&server)
            .await;

        let client = GatewayClient::new(&server.uri()).unwrap();
        let err = client
            .create_run("t-1", "x", &json!({}), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
