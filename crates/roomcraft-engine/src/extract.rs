//! Reading generated artifacts out of provider replies.
//!
//! Each provider's body is decoded into its own typed shape, wrapped in a
//! `ProviderReply` variant, and mapped to the single thing the caller wants.
//! A new provider is a new variant plus a match arm.

use serde::Deserialize;
use serde_json::Value;

use tracing::warn;

use crate::error::GatewayError;
use crate::providers::ProviderKind;

pub const NO_IMAGE_MESSAGE: &str = "No image generated from AI response";
pub const NO_TEXT_MESSAGE: &str = "No recommendation generated from AI response";

/// What the caller expects to pull out of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Image,
    Text,
}

impl Artifact {
    pub fn missing_message(self) -> &'static str {
        match self {
            Artifact::Image => NO_IMAGE_MESSAGE,
            Artifact::Text => NO_TEXT_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub images: Vec<ChatImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatImage {
    #[serde(default)]
    pub image_url: Option<ImageUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageUrl {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub data: Vec<ImageDatum>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageDatum {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    Gateway(ChatCompletion),
    ImageEdits(ImagesResponse),
}

impl ProviderReply {
    /// Decodes a success body. A body that is not the provider's JSON shape
    /// counts as "nothing generated" for the `wanted` artifact, never as an
    /// empty success. The decode error goes to the log only.
    pub fn parse(kind: ProviderKind, body: &str, wanted: Artifact) -> Result<Self, GatewayError> {
        let invalid = |err: serde_json::Error| {
            warn!(provider = kind.label(), error = %err, "success body is not valid JSON");
            GatewayError::Extraction {
                provider: kind.label(),
                message: wanted.missing_message().to_string(),
            }
        };
        Ok(match kind {
            ProviderKind::Gateway => ProviderReply::Gateway(serde_json::from_str(body).map_err(invalid)?),
            ProviderKind::ImageEdits => {
                ProviderReply::ImageEdits(serde_json::from_str(body).map_err(invalid)?)
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderReply::Gateway(_) => ProviderKind::Gateway,
            ProviderReply::ImageEdits(_) => ProviderKind::ImageEdits,
        }
    }

    /// The generated image as a URL the browser can display directly.
    ///
    /// Gateway: `choices[0].message.images[0].image_url.url`.
    /// Image edits: `data[0].url`, or `data[0].b64_json` wrapped as a PNG data URL.
    pub fn into_image(self) -> Result<String, GatewayError> {
        let provider = self.kind().label();
        let found = match self {
            ProviderReply::Gateway(completion) => completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.images.into_iter().next())
                .and_then(|image| image.image_url)
                .and_then(|image_url| image_url.url),
            ProviderReply::ImageEdits(images) => {
                images.data.into_iter().next().and_then(|datum| {
                    datum.url.filter(|url| !url.trim().is_empty()).or_else(|| {
                        datum
                            .b64_json
                            .filter(|b64| !b64.trim().is_empty())
                            .map(|b64| format!("data:image/png;base64,{}", b64.trim()))
                    })
                })
            }
        };
        found
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Extraction {
                provider,
                message: NO_IMAGE_MESSAGE.to_string(),
            })
    }

    /// Assistant text at `choices[0].message.content`.
    pub fn into_text(self) -> Result<String, GatewayError> {
        let provider = self.kind().label();
        let found = match self {
            ProviderReply::Gateway(completion) => completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .and_then(content_text),
            ProviderReply::ImageEdits(_) => None,
        };
        found.ok_or_else(|| GatewayError::Extraction {
            provider,
            message: NO_TEXT_MESSAGE.to_string(),
        })
    }
}

/// Content is either a plain string or a list of `{type: "text", text}` parts.
fn content_text(content: Value) -> Option<String> {
    let text = match content {
        Value::String(text) => text,
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<&str>>()
            .join(""),
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn gateway_image_is_read_from_nested_choice() -> anyhow::Result<()> {
        let body = json!({
            "choices": [{
                "message": {
                    "content": "Here you go",
                    "images": [{"type": "image_url", "image_url": {"url": "data:image/png;base64,ZZZZ"}}],
                }
            }]
        })
        .to_string();
        let reply = ProviderReply::parse(ProviderKind::Gateway, &body, Artifact::Image)?;
        assert_eq!(reply.into_image()?, "data:image/png;base64,ZZZZ");
        Ok(())
    }

    #[test]
    fn gateway_reply_without_images_is_an_extraction_error() -> anyhow::Result<()> {
        for body in [
            json!({"choices": [{"message": {"content": "I can't do that"}}]}),
            json!({"choices": []}),
            json!({}),
            json!({"choices": [{"message": {"images": [{"image_url": {"url": "  "}}]}}]}),
        ] {
            let reply = ProviderReply::parse(ProviderKind::Gateway, &body.to_string(), Artifact::Image)?;
            let err = reply.into_image().unwrap_err();
            assert_eq!(err.status_code(), 500);
            assert_eq!(err.client_message(), NO_IMAGE_MESSAGE);
        }
        Ok(())
    }

    #[test]
    fn edits_reply_reads_flat_url_or_b64() -> anyhow::Result<()> {
        let url = ProviderReply::parse(
            ProviderKind::ImageEdits,
            &json!({"data": [{"url": "https://img.example/out.png"}]}).to_string(),
            Artifact::Image,
        )?;
        assert_eq!(url.into_image()?, "https://img.example/out.png");

        let b64 = ProviderReply::parse(
            ProviderKind::ImageEdits,
            &json!({"data": [{"b64_json": "QUJD"}]}).to_string(),
            Artifact::Image,
        )?;
        assert_eq!(b64.into_image()?, "data:image/png;base64,QUJD");

        let empty = ProviderReply::parse(
            ProviderKind::ImageEdits,
            &json!({"data": []}).to_string(),
            Artifact::Image,
        )?;
        assert!(matches!(
            empty.into_image(),
            Err(GatewayError::Extraction { .. })
        ));
        Ok(())
    }

    #[test]
    fn non_json_success_body_reports_the_missing_artifact() {
        let image = ProviderReply::parse(ProviderKind::Gateway, "<html>oops</html>", Artifact::Image)
            .unwrap_err();
        assert!(matches!(image, GatewayError::Extraction { .. }));
        assert_eq!(image.client_message(), NO_IMAGE_MESSAGE);

        let text = ProviderReply::parse(ProviderKind::Gateway, "<html>oops</html>", Artifact::Text)
            .unwrap_err();
        assert_eq!(text.client_message(), NO_TEXT_MESSAGE);
        assert!(!text.client_message().contains("line 1"));
    }

    #[test]
    fn text_is_read_from_string_or_parts() -> anyhow::Result<()> {
        let plain = ProviderReply::parse(
            ProviderKind::Gateway,
            &json!({"choices": [{"message": {"content": " Use warm oak. "}}]}).to_string(),
            Artifact::Text,
        )?;
        assert_eq!(plain.into_text()?, "Use warm oak.");

        let parts = ProviderReply::parse(
            ProviderKind::Gateway,
            &json!({"choices": [{"message": {"content": [
                {"type": "text", "text": "Palette: "},
                {"type": "text", "text": "sage"},
            ]}}]})
            .to_string(),
            Artifact::Text,
        )?;
        assert_eq!(parts.into_text()?, "Palette: sage");

        let missing = ProviderReply::parse(
            ProviderKind::Gateway,
            &json!({"choices": [{"message": {}}]}).to_string(),
            Artifact::Text,
        )?;
        assert_eq!(missing.into_text().unwrap_err().client_message(), NO_TEXT_MESSAGE);
        Ok(())
    }
}
