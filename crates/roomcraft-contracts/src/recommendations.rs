use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::design::validation::{check_length, optional_string};
use crate::design::{FieldError, ValidationErrors};

pub const PREFERENCES_MAX_CHARS: usize = 500;
const LABEL_MAX_CHARS: usize = 100;

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are an expert interior designer AI assistant \
with years of experience in creating beautiful, functional spaces. Generate creative, practical, \
and personalized room design recommendations based on user preferences. Provide detailed \
suggestions including furniture, colors, materials, and layout ideas that can be implemented \
within the specified budget.";

/// Body accepted by `/ai-design-recommendations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub room_type: String,
    pub style: String,
    pub budget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationJob {
    pub room_type: String,
    pub style: String,
    pub budget: String,
    pub preferences: Option<String>,
    pub model_preference: Option<String>,
}

pub fn validate_recommendation_request(body: &Value) -> Result<RecommendationJob, ValidationErrors> {
    let Some(obj) = body.as_object() else {
        return Err(ValidationErrors {
            errors: vec![FieldError::new("body", "must be a JSON object")],
        });
    };
    let mut errors = Vec::new();

    let required_label = |field: &str, errors: &mut Vec<FieldError>| {
        let value = optional_string(obj, field, errors);
        match value.as_deref() {
            Some(text) => check_length(field, text, LABEL_MAX_CHARS, errors),
            None if !errors.iter().any(|err| err.field == field) => {
                errors.push(FieldError::new(field, format!("{field} is required")));
            }
            None => {}
        }
        value
    };
    let room_type = required_label("roomType", &mut errors);
    let style = required_label("style", &mut errors);

    // Budget arrives as a numeric string from form inputs; bare numbers are accepted too.
    let budget = match obj.get("budget") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("budget", "budget is required"));
            None
        }
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            match trimmed.parse::<f64>() {
                Ok(amount) if amount.is_finite() && amount >= 0.0 => Some(trimmed.to_string()),
                _ if trimmed.is_empty() => {
                    errors.push(FieldError::new("budget", "budget is required"));
                    None
                }
                _ => {
                    errors.push(FieldError::new("budget", "must be a non-negative number"));
                    None
                }
            }
        }
        Some(_) => {
            errors.push(FieldError::new("budget", "must be a numeric string"));
            None
        }
    };

    let preferences = optional_string(obj, "preferences", &mut errors);
    if let Some(text) = preferences.as_deref() {
        check_length("preferences", text, PREFERENCES_MAX_CHARS, &mut errors);
    }
    let model_preference = optional_string(obj, "modelPreference", &mut errors);

    match (room_type, style, budget) {
        (Some(room_type), Some(style), Some(budget)) if errors.is_empty() => Ok(RecommendationJob {
            room_type,
            style,
            budget,
            preferences,
            model_preference,
        }),
        _ => Err(ValidationErrors { errors }),
    }
}

pub fn build_recommendation_prompt(job: &RecommendationJob) -> String {
    let preferences = job.preferences.as_deref().unwrap_or("None");
    format!(
        "Generate a detailed interior design recommendation for:
- Room Type: {room_type}
- Style: {style}
- Budget: ${budget}
- Additional Preferences: {preferences}

Provide a comprehensive design plan including:
1. Color palette (3-5 colors with specific color codes)
2. Key furniture pieces (5-7 items with estimated prices)
3. Materials and textures recommendations
4. Lighting suggestions (ambient, task, and accent)
5. Decor elements and accessories with shopping tips
6. Layout tips for optimal space utilization

Format the response as a detailed, actionable design plan that is practical and achievable within the budget.",
        room_type = job.room_type,
        style = job.style,
        budget = job.budget,
    )
}
