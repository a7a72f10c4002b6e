//! The two serverless functions as plain request/response values.
//!
//! `FunctionHandler::handle` never fails: every outcome, including bad input
//! and upstream trouble, becomes a JSON envelope with a status code and the
//! same permissive CORS headers. Transport adapters (the axum server, the
//! in-process invoker) only move bytes in and out.

use roomcraft_contracts::design::validate_design_request;
use roomcraft_contracts::envelope::GatewayEnvelope;
use roomcraft_contracts::recommendations::validate_recommendation_request;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::FunctionError;
use crate::gateway::GatewayClient;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomFunction {
    GenerateRoomDesign,
    DesignRecommendations,
}

impl RoomFunction {
    pub const ALL: [RoomFunction; 2] = [
        RoomFunction::GenerateRoomDesign,
        RoomFunction::DesignRecommendations,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RoomFunction::GenerateRoomDesign => "generate-room-design",
            RoomFunction::DesignRecommendations => "ai-design-recommendations",
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        let name = raw.trim().trim_matches('/');
        Self::ALL.into_iter().find(|function| function.name() == name)
    }

    /// Only image generation checks for a bearer header.
    pub fn requires_authorization(self) -> bool {
        matches!(self, RoomFunction::GenerateRoomDesign)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRequest {
    pub method: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl FunctionRequest {
    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            authorization: None,
            body: body.into(),
        }
    }

    pub fn preflight() -> Self {
        Self {
            method: "OPTIONS".to_string(),
            authorization: None,
            body: Vec::new(),
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn is_preflight(&self) -> bool {
        self.method.eq_ignore_ascii_case("OPTIONS")
    }

    fn has_authorization(&self) -> bool {
        self.authorization
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Option<GatewayEnvelope>,
}

impl FunctionResponse {
    fn preflight() -> Self {
        Self {
            status: 200,
            headers: cors_headers(false),
            body: None,
        }
    }

    fn json(status: u16, envelope: GatewayEnvelope) -> Self {
        Self {
            status,
            headers: cors_headers(true),
            body: Some(envelope),
        }
    }

    /// An error envelope for failures outside the handler itself (unknown
    /// function, oversized body), with the same CORS headers.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, GatewayEnvelope::error(message))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    /// Serialized body; empty for a preflight answer.
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .and_then(|envelope| serde_json::to_string(envelope).ok())
            .unwrap_or_default()
    }
}

fn cors_headers(json: bool) -> Vec<(&'static str, &'static str)> {
    let mut headers = vec![
        ("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN),
        ("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS),
        ("Access-Control-Allow-Methods", CORS_ALLOW_METHODS),
    ];
    if json {
        headers.push(("Content-Type", "application/json"));
    }
    headers
}

pub struct FunctionHandler {
    gateway: GatewayClient,
}

impl FunctionHandler {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    pub fn handle(&self, function: RoomFunction, request: &FunctionRequest) -> FunctionResponse {
        if request.is_preflight() {
            return FunctionResponse::preflight();
        }
        match self.run(function, request) {
            Ok(envelope) => FunctionResponse::json(200, envelope),
            Err(err) => {
                let status = err.status_code();
                if status >= 500 {
                    error!(function = function.name(), status, error = %err, "function failed");
                } else {
                    warn!(function = function.name(), status, error = %err, "function rejected request");
                }
                let mut envelope = GatewayEnvelope::error(err.client_message());
                if let Some(details) = err.details() {
                    envelope = envelope.with_details(details);
                }
                FunctionResponse::json(status, envelope)
            }
        }
    }

    fn run(
        &self,
        function: RoomFunction,
        request: &FunctionRequest,
    ) -> Result<GatewayEnvelope, FunctionError> {
        if function.requires_authorization() && !request.has_authorization() {
            return Err(FunctionError::Unauthorized);
        }
        let body: Value = serde_json::from_slice(&request.body)
            .map_err(|err| FunctionError::MalformedBody(err.to_string()))?;

        match function {
            RoomFunction::GenerateRoomDesign => {
                let job = validate_design_request(&body)?;
                let generated = self.gateway.generate_design(&job)?;
                info!(
                    provider = generated.provider.label(),
                    edit_mode = job.is_edit(),
                    "room design ready"
                );
                Ok(GatewayEnvelope::image(generated.image))
            }
            RoomFunction::DesignRecommendations => {
                let job = validate_recommendation_request(&body)?;
                let recommendation = self.gateway.recommend(&job)?;
                Ok(GatewayEnvelope::recommendation(
                    recommendation.text,
                    recommendation.model,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::{FallbackConfig, GatewayConfig};
    use crate::error::RATE_LIMITED_MESSAGE;
    use crate::transport::testing::ScriptedTransport;

    fn handler(transport: Arc<ScriptedTransport>, fallback_key: Option<&str>) -> FunctionHandler {
        let config = GatewayConfig {
            api_base: "https://gateway.test/v1".to_string(),
            api_key: Some("primary-key".to_string()),
            fallback: FallbackConfig {
                api_base: "https://fallback.test/v1".to_string(),
                api_key: fallback_key.map(str::to_string),
                ..FallbackConfig::default()
            },
            ..GatewayConfig::default()
        };
        FunctionHandler::new(GatewayClient::new(config, transport))
    }

    fn generate_body() -> Vec<u8> {
        json!({
            "imageData": "data:image/png;base64,AAAA",
            "style": "Modern",
            "roomType": "Living Room",
            "editMode": false,
        })
        .to_string()
        .into_bytes()
    }

    fn assert_cors(response: &FunctionResponse) {
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            response.header("Access-Control-Allow-Headers"),
            Some(CORS_ALLOW_HEADERS)
        );
    }

    #[test]
    fn function_names_resolve_from_paths() {
        assert_eq!(
            RoomFunction::from_name("/generate-room-design"),
            Some(RoomFunction::GenerateRoomDesign)
        );
        assert_eq!(
            RoomFunction::from_name("ai-design-recommendations"),
            Some(RoomFunction::DesignRecommendations)
        );
        assert_eq!(RoomFunction::from_name("unknown"), None);
    }

    #[test]
    fn rejected_responses_carry_cors_and_json() {
        let response = FunctionResponse::rejected(413, "Request body too large");
        assert_eq!(response.status, 413);
        assert_cors(&response);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body_text(), r#"{"error":"Request body too large"}"#);
    }

    #[test]
    fn preflight_is_empty_success_without_upstream_calls() {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = handler(transport.clone(), None);
        for function in RoomFunction::ALL {
            let response = handler.handle(function, &FunctionRequest::preflight());
            assert_eq!(response.status, 200);
            assert_eq!(response.body, None);
            assert_eq!(response.body_text(), "");
            assert_cors(&response);
        }
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn generate_success_returns_image_envelope() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"choices": [{"message": {"images": [{"image_url": {"url": "data:image/png;base64,ZZZZ"}}]}}]}),
        ));
        let handler = handler(transport, None);
        let response = handler.handle(
            RoomFunction::GenerateRoomDesign,
            &FunctionRequest::post(generate_body()).with_authorization("Bearer t"),
        );
        assert_eq!(response.status, 200);
        assert_cors(&response);
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(&response.body_text()).unwrap_or(Value::Null);
        assert_eq!(
            body,
            json!({"image": "data:image/png;base64,ZZZZ", "message": "Design generated successfully"})
        );
    }

    #[test]
    fn missing_authorization_is_401_before_any_work() {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = handler(transport.clone(), None);
        for request in [
            FunctionRequest::post(generate_body()),
            FunctionRequest::post(generate_body()).with_authorization("   "),
        ] {
            let response = handler.handle(RoomFunction::GenerateRoomDesign, &request);
            assert_eq!(response.status, 401);
            assert_cors(&response);
            assert_eq!(
                response.body.and_then(|body| body.error).as_deref(),
                Some("Missing authorization header")
            );
        }
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn malformed_and_invalid_bodies_are_400() {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = handler(transport.clone(), None);

        let response = handler.handle(
            RoomFunction::GenerateRoomDesign,
            &FunctionRequest::post("{not json").with_authorization("Bearer t"),
        );
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body.and_then(|body| body.error).as_deref(),
            Some("Invalid JSON body")
        );

        let response = handler.handle(
            RoomFunction::GenerateRoomDesign,
            &FunctionRequest::post(json!({"imageData": "https://x/y.png"}).to_string())
                .with_authorization("Bearer t"),
        );
        assert_eq!(response.status, 400);
        let body = response.body.unwrap_or_default();
        assert_eq!(body.error.as_deref(), Some("Invalid request"));
        assert!(body.details.is_some_and(|details| details.is_array()));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn upstream_statuses_map_onto_envelopes() {
        let transport = Arc::new(ScriptedTransport::new().reply(429, json!({})));
        let response = handler(transport, Some("fallback-key")).handle(
            RoomFunction::GenerateRoomDesign,
            &FunctionRequest::post(generate_body()).with_authorization("Bearer t"),
        );
        assert_eq!(response.status, 429);
        assert_cors(&response);
        assert_eq!(
            response.body.and_then(|body| body.error).as_deref(),
            Some(RATE_LIMITED_MESSAGE)
        );

        let transport = Arc::new(ScriptedTransport::new().reply_text(500, "boom"));
        let response = handler(transport, None).handle(
            RoomFunction::GenerateRoomDesign,
            &FunctionRequest::post(generate_body()).with_authorization("Bearer t"),
        );
        assert_eq!(response.status, 500);
        let body = response.body.unwrap_or_default();
        assert_eq!(body.error.as_deref(), Some("AI Gateway error: 500"));
        assert!(body.details.is_some());
    }

    #[test]
    fn recommendations_do_not_require_authorization() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"choices": [{"message": {"content": "Warm oak and linen."}}]}),
        ));
        let response = handler(transport, None).handle(
            RoomFunction::DesignRecommendations,
            &FunctionRequest::post(
                json!({"roomType": "Office", "style": "Industrial", "budget": "1200"}).to_string(),
            ),
        );
        assert_eq!(response.status, 200);
        let body = response.body.unwrap_or_default();
        assert_eq!(body.recommendation.as_deref(), Some("Warm oak and linen."));
        assert_eq!(body.model.as_deref(), Some("google/gemini-2.5-flash"));
        assert_eq!(body.error, None);
    }
}
