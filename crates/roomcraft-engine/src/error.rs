use roomcraft_contracts::design::ValidationErrors;
use roomcraft_contracts::envelope::SUPPORT_DETAILS;
use serde_json::Value;

pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";
pub const NO_FALLBACK_MESSAGE: &str =
    "AI credits exhausted and no fallback configured. Please add credits or set OPENAI_API_KEY.";
pub const PAYMENT_REQUIRED_MESSAGE: &str =
    "Payment required. Please add credits to your workspace.";
pub const NOT_CONFIGURED_MESSAGE: &str = "AI service not configured";

/// Outcome classes of one gateway call, primary and fallback tiers included.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Configuration(String),
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,
    #[error("{0}")]
    PaymentRequired(String),
    #[error("{provider} request failed{}: {body}", status_suffix(.status))]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        body: String,
    },
    #[error("{provider}: {message}")]
    Extraction {
        provider: &'static str,
        message: String,
    },
}

impl GatewayError {
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::RateLimited => 429,
            GatewayError::PaymentRequired(_) => 402,
            GatewayError::Configuration(_)
            | GatewayError::Upstream { .. }
            | GatewayError::Extraction { .. } => 500,
        }
    }

    /// Message safe to hand back to the browser.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Configuration(_) => NOT_CONFIGURED_MESSAGE.to_string(),
            GatewayError::Upstream { status, .. } => match status {
                Some(code) => format!("AI Gateway error: {code}"),
                None => "AI Gateway unreachable".to_string(),
            },
            GatewayError::Extraction { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

/// Every way a function invocation can end without a success envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    #[error("Missing authorization header")]
    Unauthorized,
    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FunctionError {
    pub fn status_code(&self) -> u16 {
        match self {
            FunctionError::Unauthorized => 401,
            FunctionError::MalformedBody(_) | FunctionError::Validation(_) => 400,
            FunctionError::Gateway(err) => err.status_code(),
        }
    }

    pub fn client_message(&self) -> String {
        match self {
            FunctionError::Unauthorized => self.to_string(),
            FunctionError::MalformedBody(_) => "Invalid JSON body".to_string(),
            FunctionError::Validation(_) => "Invalid request".to_string(),
            FunctionError::Gateway(err) => err.client_message(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            FunctionError::Validation(errors) => Some(errors.details()),
            err if err.status_code() >= 500 => Some(Value::String(SUPPORT_DETAILS.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_one_to_one_onto_statuses() {
        assert_eq!(GatewayError::RateLimited.status_code(), 429);
        assert_eq!(
            GatewayError::PaymentRequired(NO_FALLBACK_MESSAGE.to_string()).status_code(),
            402
        );
        assert_eq!(
            GatewayError::Upstream {
                provider: "gateway",
                status: Some(503),
                body: "down".to_string(),
            }
            .status_code(),
            500
        );
        assert_eq!(
            GatewayError::Configuration("LOVABLE_API_KEY is not configured".to_string())
                .status_code(),
            500
        );
    }

    #[test]
    fn client_messages_hide_upstream_bodies() {
        let err = GatewayError::Upstream {
            provider: "gateway",
            status: Some(500),
            body: "stack trace with internals".to_string(),
        };
        assert_eq!(err.client_message(), "AI Gateway error: 500");
        assert!(err.to_string().contains("stack trace"));
        assert_eq!(
            GatewayError::Configuration("LOVABLE_API_KEY is not configured".to_string())
                .client_message(),
            NOT_CONFIGURED_MESSAGE
        );
    }

    #[test]
    fn function_errors_cover_client_statuses() {
        assert_eq!(FunctionError::Unauthorized.status_code(), 401);
        assert_eq!(
            FunctionError::MalformedBody("eof".to_string()).status_code(),
            400
        );
        assert_eq!(
            FunctionError::from(GatewayError::RateLimited).status_code(),
            429
        );
        assert_eq!(FunctionError::Unauthorized.details(), None);
        assert!(FunctionError::from(GatewayError::Configuration("x".to_string()))
            .details()
            .is_some());
    }
}
