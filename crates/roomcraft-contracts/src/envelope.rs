use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DESIGN_SUCCESS_MESSAGE: &str = "Design generated successfully";
pub const SUPPORT_DETAILS: &str = "Please try again or contact support if the issue persists";

/// Normalized JSON body returned by both functions. A success carries `image`
/// or `recommendation`; a failure carries `error`. Never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GatewayEnvelope {
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            message: Some(DESIGN_SUCCESS_MESSAGE.to_string()),
            ..Self::default()
        }
    }

    pub fn recommendation(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            recommendation: Some(text.into()),
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GatewayEnvelope;

    #[test]
    fn success_and_error_envelopes_omit_unused_fields() -> anyhow::Result<()> {
        let image = serde_json::to_value(GatewayEnvelope::image("data:image/png;base64,ZZZZ"))?;
        assert_eq!(
            image,
            json!({
                "image": "data:image/png;base64,ZZZZ",
                "message": "Design generated successfully",
            })
        );

        let rec = serde_json::to_value(GatewayEnvelope::recommendation("Use oak", "openai/gpt-5"))?;
        assert_eq!(rec, json!({"recommendation": "Use oak", "model": "openai/gpt-5"}));

        let err = GatewayEnvelope::error("Invalid request").with_details(json!([{"field": "style"}]));
        assert!(err.is_error());
        assert_eq!(
            serde_json::to_value(err)?,
            json!({"error": "Invalid request", "details": [{"field": "style"}]})
        );
        Ok(())
    }
}
