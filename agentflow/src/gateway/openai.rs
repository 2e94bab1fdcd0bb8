//! OpenAI-compatible HTTP completion gateway.

use super::{require_text, CompletionGateway};
use crate::agents::AgentRole;
use crate::config::GatewayConfig;
use crate::errors::{AgentflowError, GatewayError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Gateway speaking the `/v1/chat/completions` protocol.
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    http_client: reqwest::Client,
}

impl OpenAiGateway {
    /// Creates a gateway from configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, AgentflowError> {
        let timeout = config.timeout()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| AgentflowError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            timeout,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, system: &'a str, role: &AgentRole, task: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: task,
                },
            ],
            temperature: role.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn map_send_error(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            let seconds = self
                .timeout
                .map_or(0, |t| t.as_secs() + u64::from(t.subsec_nanos() > 0));
            GatewayError::Timeout { seconds }
        } else {
            GatewayError::transport(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, role: &AgentRole, task: &str) -> Result<String, GatewayError> {
        let system = role.system_prompt();
        let body = self.build_request(&system, role, task);

        let mut request = self.http_client.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(role = %role.name, model = %self.model, "Sending completion request");

        let response = request.send().await.map_err(|e| self.map_send_error(&e))?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            warn!(role = %role.name, ?retry_after, "Completion backend rate limited");
            return Err(GatewayError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::api(status.as_u16(), truncate_chars(&text, ERROR_BODY_LIMIT)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::malformed(format!("invalid completion body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::malformed("no choices in completion"))?
            .message
            .content
            .unwrap_or_default();

        require_text(content)
    }
}

/// Keeps at most `limit` characters of an error body.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Builds the HTTP gateway as a shareable trait object.
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn CompletionGateway>, AgentflowError> {
    if config.api_key.is_none() {
        warn!(base_url = %config.base_url, "No API key configured for completion gateway");
    }
    Ok(Arc::new(OpenAiGateway::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentId, AgentRoster};
    use crate::core::UserRequest;
    use crate::stages::{IntentStage, Stage, StageInput};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
             Connection: close\r\n{extra_headers}\r\n{body}",
            body.len()
        )
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    async fn complete_against(response: String) -> Result<String, GatewayError> {
        let base_url = serve_once(response).await;
        let gateway = OpenAiGateway::new(&GatewayConfig::new().with_base_url(base_url)).unwrap();
        let roster = AgentRoster::new();
        gateway.complete(roster.producer(AgentId::Intent), "classify").await
    }

    #[test]
    fn test_request_body_shape() {
        let gateway = OpenAiGateway::new(&GatewayConfig::new().with_model("gpt-4o")).unwrap();
        let roster = AgentRoster::new();
        let role = roster.producer(AgentId::Technical);
        let system = role.system_prompt();

        let body = serde_json::to_value(gateway.build_request(&system, role, "design it")).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "design it");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let gateway = OpenAiGateway::new(&GatewayConfig::new().with_base_url("http://localhost:11434/")).unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_response_without_content_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = GatewayConfig::new()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(2.0);
        let gateway = OpenAiGateway::new(&config).unwrap();
        let roster = AgentRoster::new();

        let err = gateway
            .complete(roster.producer(AgentId::Intent), "hello")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Transport { .. } | GatewayError::Timeout { .. }
        ));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let body = format!("a{}", "é".repeat(300));
        let cut = truncate_chars(&body, ERROR_BODY_LIMIT);
        assert_eq!(cut.chars().count(), ERROR_BODY_LIMIT);
        assert!(cut.starts_with('a'));
        assert_eq!(truncate_chars("short", ERROR_BODY_LIMIT), "short");
    }

    #[test]
    fn test_oversized_timeout_is_a_config_error() {
        let err = OpenAiGateway::new(&GatewayConfig::new().with_timeout(1e30)).unwrap_err();
        assert!(matches!(err, AgentflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "coaching request"}}]}"#;
        let text = complete_against(http_response("200 OK", "", body)).await.unwrap();
        assert_eq!(text, "coaching request");
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let err = complete_against(http_response("429 Too Many Requests", "Retry-After: 7\r\n", "{}"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::RateLimited { retry_after: Some(7) });
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let err = complete_against(http_response("503 Service Unavailable", "", "overloaded"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::api(503, "overloaded"));
    }

    #[tokio::test]
    async fn test_long_non_ascii_error_body_is_truncated() {
        let body = format!("a{}", "é".repeat(300));
        let err = complete_against(http_response("500 Internal Server Error", "", &body))
            .await
            .unwrap_err();

        let GatewayError::Api { status, body: kept } = err else {
            panic!("expected an API error");
        };
        assert_eq!(status, 500);
        assert_eq!(kept.chars().count(), ERROR_BODY_LIMIT);
    }

    #[tokio::test]
    async fn test_non_ascii_error_body_becomes_stage_fallback() {
        let body = format!("a{}", "é".repeat(300));
        let base_url = serve_once(http_response("500 Internal Server Error", "", &body)).await;
        let gateway: Arc<dyn CompletionGateway> =
            Arc::new(OpenAiGateway::new(&GatewayConfig::new().with_base_url(base_url)).unwrap());
        let stage = IntentStage::from_roster(gateway, &AgentRoster::new());
        let request = UserRequest::new("test");

        let record = stage.execute(StageInput::Request(&request)).await;

        assert!(record.is_fallback());
        assert!(record.fallback_cause().unwrap().starts_with("Gateway API error 500: a"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let err = complete_against(http_response("200 OK", "", "not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let err = complete_against(http_response("200 OK", "", r#"{"choices": []}"#))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::malformed("no choices in completion"));
    }

    #[tokio::test]
    async fn test_blank_content_is_empty_response() {
        let body = r#"{"choices": [{"message": {"content": "  \n "}}]}"#;
        let err = complete_against(http_response("200 OK", "", body)).await.unwrap_err();
        assert_eq!(err, GatewayError::EmptyResponse);

        let missing = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let err = complete_against(http_response("200 OK", "", missing)).await.unwrap_err();
        assert_eq!(err, GatewayError::EmptyResponse);
    }
}
