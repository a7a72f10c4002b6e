//! Request shapes for the two upstream tiers.
//!
//! The primary gateway speaks OpenAI-style chat completions and takes the
//! room photo inline as an `image_url` block. The fallback tier is an image
//! edit endpoint that wants the same photo as a multipart file.

use serde_json::{json, Value};

use crate::config::FallbackConfig;
use crate::media::DataUrl;
use crate::transport::{FilePart, FormBody};

/// Which upstream produced a reply; decides how the body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gateway,
    ImageEdits,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Gateway => "AI Gateway",
            ProviderKind::ImageEdits => "Fallback image edits",
        }
    }
}

pub fn image_generation_payload(model: &str, prompt: &str, image_data: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_data } },
                ],
            }
        ],
        "modalities": ["image", "text"],
    })
}

pub fn text_completion_payload(model: &str, system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
    })
}

/// The fallback edit request: same prompt, photo as the `image` file part.
pub fn image_edit_form(fallback: &FallbackConfig, prompt: &str, image: DataUrl) -> FormBody {
    let mut fields = vec![
        ("prompt".to_string(), prompt.to_string()),
        ("n".to_string(), "1".to_string()),
        ("size".to_string(), fallback.size.clone()),
    ];
    if let Some(model) = fallback.model.as_ref() {
        fields.push(("model".to_string(), model.clone()));
    }
    let file_name = format!("room.{}", image.file_extension());
    FormBody {
        fields,
        files: vec![FilePart {
            field: "image".to_string(),
            file_name,
            mime: image.mime,
            bytes: image.bytes,
        }],
    }
}
