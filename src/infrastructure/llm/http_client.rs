use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::DomainError;
use crate::domain::llm::ProviderKind;

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// Status and decoded body of a JSON call.
///
/// Non-success statuses are returned rather than raised so each adapter can
/// pull the provider's own error message out of the body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    /// Parsed JSON, or the raw text as a JSON string when the body is not JSON
    pub body: serde_json::Value,
}

impl JsonResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human-readable error from a failed call.
    ///
    /// Understands `{"error": {"message": ..}}` and `{"error": ".."}` bodies,
    /// falling back to the raw text or the bare status.
    pub fn error_message(&self) -> String {
        let error = &self.body["error"];

        if let Some(message) = error["message"].as_str().filter(|m| !m.is_empty()) {
            return message.to_string();
        }

        if let Some(message) = error.as_str().filter(|m| !m.is_empty()) {
            return message.to_string();
        }

        match self.body.as_str().map(str::trim) {
            Some(text) if !text.is_empty() => format!("HTTP {}: {}", self.status, text),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_json(&self, url: &str) -> Result<JsonResponse, DomainError>;

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, DomainError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError>;
}

#[async_trait]
impl<T: HttpClientTrait + ?Sized> HttpClientTrait for std::sync::Arc<T> {
    async fn get_json(&self, url: &str) -> Result<JsonResponse, DomainError> {
        (**self).get_json(url).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, DomainError> {
        (**self).post_json(url, headers, body).await
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError> {
        (**self).post_json_stream(url, headers, body).await
    }
}

/// Relabel an error raised by the HTTP layer with the provider that made the call
pub fn for_provider(error: DomainError, provider: ProviderKind) -> DomainError {
    match error {
        DomainError::Transport { message, .. } => DomainError::transport(provider.as_str(), message),
        other => other,
    }
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn request(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        request.json(body)
    }

    async fn read_json(response: reqwest::Response) -> Result<JsonResponse, DomainError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::transport("http", format!("Failed to read response: {}", e)))?;

        let body = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(e) if status.is_success() => {
                return Err(DomainError::transport(
                    "http",
                    format!("Failed to parse response: {}", e),
                ));
            }
            Err(_) => serde_json::Value::String(text),
        };

        Ok(JsonResponse::new(status.as_u16(), body))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get_json(&self, url: &str) -> Result<JsonResponse, DomainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::transport("http", format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, DomainError> {
        let response = self
            .request(url, headers, body)
            .send()
            .await
            .map_err(|e| DomainError::transport("http", format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError> {
        let response = self
            .request(url, headers, body)
            .send()
            .await
            .map_err(|e| DomainError::transport("http", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::transport(
                "http",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        use futures::StreamExt;
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| DomainError::transport("http", format!("Stream error: {}", e)))
        });

        Ok(Box::pin(stream))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/v1/chat/completions", server.uri());
        let response = client
            .post_json(
                &url,
                vec![("Authorization", "Bearer sk-test")],
                &serde_json::json!({"model": "gpt-4o"}),
            )
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body["ok"], true);
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3.2:3b"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/api/tags", server.uri());
        let response = client.get_json(&url).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.body["models"][0]["name"], "llama3.2:3b");
    }

    #[tokio::test]
    async fn test_post_json_returns_error_status_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let response = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(!response.is_success());
        assert_eq!(response.body["error"]["message"], "Incorrect API key provided");
    }

    #[tokio::test]
    async fn test_post_json_keeps_plain_text_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let response = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(response.status, 502);
        assert_eq!(response.body, serde_json::json!("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_post_json_non_json_success_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let err = client
            .post_json(&server.uri(), vec![], &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.provider_name(), Some("http"));
    }

    #[tokio::test]
    async fn test_post_json_stream_yields_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\":\"success\"}\n"))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/api/pull", server.uri());
        let mut stream = client
            .post_json_stream(&url, vec![], &serde_json::json!({}))
            .await
            .unwrap();

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(String::from_utf8(collected).unwrap(), "{\"status\":\"success\"}\n");
    }

    #[test]
    fn test_error_message_shapes() {
        let nested = JsonResponse::new(
            400,
            serde_json::json!({"error": {"code": 400, "message": "API key not valid"}}),
        );
        assert_eq!(nested.error_message(), "API key not valid");

        let flat = JsonResponse::new(404, serde_json::json!({"error": "model not found"}));
        assert_eq!(flat.error_message(), "model not found");

        let text = JsonResponse::new(502, serde_json::json!("Bad Gateway"));
        assert_eq!(text.error_message(), "HTTP 502: Bad Gateway");

        let empty = JsonResponse::new(500, serde_json::json!({}));
        assert_eq!(empty.error_message(), "HTTP 500");
    }

    #[test]
    fn test_for_provider_relabels_transport_errors() {
        let err = for_provider(
            DomainError::transport("http", "Request failed"),
            ProviderKind::OpenAi,
        );
        assert_eq!(err.provider_name(), Some("openai"));

        let err = for_provider(DomainError::configuration("x"), ProviderKind::OpenAi);
        assert!(err.is_configuration());
    }
}
