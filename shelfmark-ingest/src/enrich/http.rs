//! Shared HTTP plumbing for the enrichment resolvers
//!
//! Every outbound call carries its own timeout, independent of the parse
//! layer's wall clock. An aborted request (timed out before the remote
//! service answered) is retried exactly once at double the timeout; a
//! rejected request (non-2xx, malformed body) never retries. The caller's
//! cancellation token is observed at each call boundary and is terminal.

use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) const USER_AGENT: &str = "Shelfmark/0.1 (+https://github.com/shelfmark/shelfmark)";

/// Failure of a single logical call, after any retry.
#[derive(Debug)]
pub(crate) enum CallError {
    /// Transport or protocol failure; becomes a context warning upstream
    Failed(String),
    /// The caller's cancellation signal fired; terminal
    Cancelled,
}

/// Build the HTTP client a resolver holds for its lifetime.
pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client")
}

enum AttemptError {
    /// Timed out before the remote service completed; retryable once
    Aborted(String),
    /// Rejected by the service or unusable response; never retried
    Rejected(String),
    Cancelled,
}

/// Send a request and parse the JSON body, with the single-retry rule.
///
/// `build` constructs a fresh request per attempt so the retry does not
/// reuse a consumed builder.
pub(crate) async fn send_json<F>(
    build: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Value, CallError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    if cancel.is_cancelled() {
        return Err(CallError::Cancelled);
    }

    match attempt(build(), timeout, cancel).await {
        Ok(value) => Ok(value),
        Err(AttemptError::Aborted(first)) => {
            debug!(error = %first, "Request aborted, retrying once at doubled timeout");
            match attempt(build(), timeout * 2, cancel).await {
                Ok(value) => Ok(value),
                Err(AttemptError::Cancelled) => Err(CallError::Cancelled),
                Err(AttemptError::Aborted(msg)) | Err(AttemptError::Rejected(msg)) => {
                    Err(CallError::Failed(msg))
                }
            }
        }
        Err(AttemptError::Rejected(msg)) => Err(CallError::Failed(msg)),
        Err(AttemptError::Cancelled) => Err(CallError::Cancelled),
    }
}

async fn attempt(
    request: reqwest::RequestBuilder,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Value, AttemptError> {
    let send = async {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Aborted(e.to_string())
            } else {
                AttemptError::Rejected(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Rejected(format!("HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AttemptError::Rejected(format!("malformed JSON: {e}")))
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(AttemptError::Cancelled),
        result = send => result,
    }
}

/// Issue a JSON-RPC `tools/call` request and unwrap the tool payload.
pub(crate) async fn tool_call(
    client: &reqwest::Client,
    endpoint: &str,
    tool: &str,
    arguments: Value,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Value, CallError> {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": uuid::Uuid::new_v4().to_string(),
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments},
    });

    let envelope = send_json(|| client.post(endpoint).json(&body), timeout, cancel).await?;

    if let Some(error) = envelope.get("error") {
        return Err(CallError::Failed(format!("tool {tool} error: {error}")));
    }

    unwrap_tool_payload(&envelope)
        .ok_or_else(|| CallError::Failed(format!("tool {tool} returned no usable payload")))
}

/// A tool result is either `structuredContent` or text content holding JSON.
pub(crate) fn unwrap_tool_payload(envelope: &Value) -> Option<Value> {
    let result = envelope.get("result")?;
    if let Some(structured) = result.get("structuredContent") {
        return Some(structured.clone());
    }

    result
        .get("content")?
        .as_array()?
        .iter()
        .find_map(|entry| {
            entry
                .get("text")
                .and_then(Value::as_str)
                .and_then(|text| serde_json::from_str(text).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_content_wins() {
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "structuredContent": {"title": "The Hobbit"},
                "content": [{"type": "text", "text": "{\"title\": \"ignored\"}"}]
            }
        });
        let payload = unwrap_tool_payload(&envelope).unwrap();
        assert_eq!(payload["title"], "The Hobbit");
    }

    #[test]
    fn text_content_parsed_as_json() {
        let envelope = json!({
            "result": {
                "content": [
                    {"type": "text", "text": "not json"},
                    {"type": "text", "text": "{\"docs\": []}"}
                ]
            }
        });
        let payload = unwrap_tool_payload(&envelope).unwrap();
        assert!(payload["docs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn missing_result_is_none() {
        assert!(unwrap_tool_payload(&json!({"error": {"code": -32600}})).is_none());
    }

    #[tokio::test]
    async fn pre_cancelled_token_never_sends() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = build_client();
        let result = send_json(
            || client.get("http://127.0.0.1:1/unreachable"),
            Duration::from_millis(10),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(CallError::Cancelled)));
    }
}
