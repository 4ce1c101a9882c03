// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Remote agent over HTTP
//
// POSTs `{"query": ...}` to the configured URL. A JSON object reply is kept
// structured; any other body is treated as text.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::provider::{Provider, ProviderError, ProviderOutput};

pub struct HttpProvider {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn invoke(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(&QueryBody { query })
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(ProviderOutput::Structured(map)),
            _ => Ok(ProviderOutput::Text(body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_object_reply_is_structured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/agent")
            .match_body(mockito::Matcher::Json(serde_json::json!({"query": "cpu?"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "CPU at 23%"}"#)
            .create_async()
            .await;

        let provider = HttpProvider::new(format!("{}/agent", server.url()));
        let output = provider.invoke("cpu?").await.unwrap();

        mock.assert_async().await;
        assert!(matches!(output, ProviderOutput::Structured(_)));
        assert_eq!(output.extract_text(), "CPU at 23%");
    }

    #[tokio::test]
    async fn test_plain_body_is_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/agent")
            .with_status(200)
            .with_body("all systems nominal")
            .create_async()
            .await;

        let provider = HttpProvider::new(format!("{}/agent", server.url()));
        let output = provider.invoke("status").await.unwrap();
        assert_eq!(output, ProviderOutput::from("all systems nominal"));
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/agent")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let provider = HttpProvider::new(format!("{}/agent", server.url()));
        let err = provider.invoke("status").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503: overloaded");
    }
}
