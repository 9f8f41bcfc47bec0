//! Generative-AI endpoint: neutral request/response shapes, the transport
//! seam, and the HTTP implementation.
//!
//! The orchestrator builds a [`GenerateRequest`] and hands it to whatever
//! implements [`GenAiTransport`]; tests script a transport, production uses
//! [`HttpGenAi`] against a Gemini-style `:generateContent` endpoint.

use crate::error::CoachError;
use async_trait::async_trait;
use brujula_core::AppConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One chat turn in the request context.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// "user" or "model".
    pub role: &'static str,
    pub text: String,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: "user", text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: "model", text: text.into() }
    }
}

/// A function the model may call, with a JSON-schema parameter object.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A structured call proposed by the model. Converted at the boundary into a
/// typed action; unrecognized names are dropped, never executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: Vec<Content>,
    pub temperature: f32,
    /// Function declarations exposed to the model; empty = plain chat.
    pub function_declarations: Vec<FunctionDecl>,
    /// When set, the model must answer with JSON matching this schema.
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
}

/// The transport seam. Implementations must be safe to call concurrently;
/// independent request chains are allowed to overlap.
#[async_trait]
pub trait GenAiTransport: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, CoachError>;
}

// ---------------------------------------------------------------------------
// HTTP transport (Gemini-style wire format)
// ---------------------------------------------------------------------------

pub struct HttpGenAi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGenAi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
        }
    }

    /// Builds the transport from config. `Err(MissingKey)` when no API key is
    /// configured anywhere.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoachError> {
        let key = config.genai_api_key.clone().ok_or(CoachError::MissingKey)?;
        Ok(Self::new(config.genai_base_url.clone(), key))
    }

    fn wire_body(request: &GenerateRequest) -> Value {
        let contents: Vec<Value> = request
            .contents
            .iter()
            .map(|c| {
                serde_json::json!({
                    "role": c.role,
                    "parts": [{"text": c.text}],
                })
            })
            .collect();

        let mut generation_config = serde_json::json!({ "temperature": request.temperature });
        if let Some(schema) = &request.response_schema {
            generation_config["responseMimeType"] = Value::String("application/json".into());
            generation_config["responseSchema"] = schema.clone();
        }

        let mut body = serde_json::json!({
            "systemInstruction": {"parts": [{"text": request.system_instruction}]},
            "contents": contents,
            "generationConfig": generation_config,
        });
        if !request.function_declarations.is_empty() {
            body["tools"] = serde_json::json!([
                {"functionDeclarations": request.function_declarations}
            ]);
        }
        body
    }

    fn parse_wire(value: &Value) -> GenerateResponse {
        let mut out = GenerateResponse::default();
        let parts = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array);
        let Some(parts) = parts else {
            return out;
        };
        let mut text_parts = Vec::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                text_parts.push(text);
            }
            if let Some(call) = part.get("functionCall") {
                if let Ok(call) = serde_json::from_value::<FunctionCall>(call.clone()) {
                    out.function_calls.push(call);
                }
            }
        }
        out.text = text_parts.join("");
        out
    }
}

#[async_trait]
impl GenAiTransport for HttpGenAi {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, CoachError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );
        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::wire_body(request))
            .send()
            .await
            .map_err(|e| CoachError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CoachError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let value = res
            .json::<Value>()
            .await
            .map_err(|e| CoachError::Parse(e.to_string()))?;
        Ok(Self::parse_wire(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_body_carries_tools_only_when_declared() {
        let mut request = GenerateRequest {
            model: "m".into(),
            system_instruction: "sys".into(),
            contents: vec![Content::user("hi")],
            temperature: 0.7,
            function_declarations: Vec::new(),
            response_schema: None,
        };
        let body = HttpGenAi::wire_body(&request);
        assert!(body.get("tools").is_none());

        request.function_declarations.push(FunctionDecl {
            name: "f".into(),
            description: String::new(),
            parameters: serde_json::json!({"type": "object"}),
        });
        let body = HttpGenAi::wire_body(&request);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "f");
    }

    #[test]
    fn parse_wire_collects_text_and_function_calls() {
        let value = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Claro, "},
                    {"text": "lo agendo."},
                    {"functionCall": {"name": "crear_tarea", "args": {"title": "X"}}}
                ]}
            }]
        });
        let parsed = HttpGenAi::parse_wire(&value);
        assert_eq!(parsed.text, "Claro, lo agendo.");
        assert_eq!(parsed.function_calls.len(), 1);
        assert_eq!(parsed.function_calls[0].name, "crear_tarea");
    }

    #[test]
    fn parse_wire_tolerates_empty_candidates() {
        let parsed = HttpGenAi::parse_wire(&serde_json::json!({"candidates": []}));
        assert!(parsed.text.is_empty());
        assert!(parsed.function_calls.is_empty());
    }
}
