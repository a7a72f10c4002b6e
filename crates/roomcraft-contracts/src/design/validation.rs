use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{RoomType, Style};

pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const EDIT_PROMPT_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every field-level problem found in one request body, in field order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|err| err.field.as_str()).collect()
    }

    pub fn details(&self) -> Value {
        serde_json::to_value(&self.errors).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .errors
            .iter()
            .map(|err| format!("{}: {}", err.field, err.message))
            .collect::<Vec<String>>();
        write!(f, "invalid request ({})", parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignMode {
    Generate {
        style: Style,
        room_type: RoomType,
        description: Option<String>,
    },
    Edit {
        edit_prompt: String,
        style: Option<Style>,
        room_type: Option<RoomType>,
    },
}

/// A design request that passed validation. Only this type reaches the
/// prompt builder and the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignJob {
    pub image_data: String,
    pub mode: DesignMode,
}

impl DesignJob {
    pub fn is_edit(&self) -> bool {
        matches!(self.mode, DesignMode::Edit { .. })
    }
}

fn image_data_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/]+={0,2}$")
            .expect("image data URL pattern compiles")
    })
}

pub fn validate_design_request(body: &Value) -> Result<DesignJob, ValidationErrors> {
    let Some(obj) = body.as_object() else {
        return Err(ValidationErrors {
            errors: vec![FieldError::new("body", "must be a JSON object")],
        });
    };
    let mut errors = Vec::new();

    let image_data = match optional_string(obj, "imageData", &mut errors) {
        Some(value) if image_data_url_pattern().is_match(&value) => Some(value),
        Some(_) => {
            errors.push(FieldError::new(
                "imageData",
                "must be a base64 data URL with an image/* media type",
            ));
            None
        }
        None => {
            if !errors.iter().any(|err| err.field == "imageData") {
                errors.push(FieldError::new("imageData", "Image data is required"));
            }
            None
        }
    };

    let edit_mode = match obj.get("editMode") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            errors.push(FieldError::new("editMode", "must be a boolean"));
            false
        }
    };

    let style = optional_string(obj, "style", &mut errors).and_then(|raw| {
        let parsed = Style::parse(&raw);
        if parsed.is_none() {
            errors.push(FieldError::new("style", one_of(Style::ALL.map(Style::label))));
        }
        parsed
    });
    let room_type = optional_string(obj, "roomType", &mut errors).and_then(|raw| {
        let parsed = RoomType::parse(&raw);
        if parsed.is_none() {
            errors.push(FieldError::new(
                "roomType",
                one_of(RoomType::ALL.map(RoomType::label)),
            ));
        }
        parsed
    });

    let description = optional_string(obj, "description", &mut errors);
    if let Some(text) = description.as_deref() {
        check_length("description", text, DESCRIPTION_MAX_CHARS, &mut errors);
    }
    let edit_prompt = optional_string(obj, "editPrompt", &mut errors);
    if let Some(text) = edit_prompt.as_deref() {
        check_length("editPrompt", text, EDIT_PROMPT_MAX_CHARS, &mut errors);
    }

    if edit_mode {
        if edit_prompt.is_none() && !errors.iter().any(|err| err.field == "editPrompt") {
            errors.push(FieldError::new(
                "editPrompt",
                "editPrompt is required when editMode is true",
            ));
        }
    } else {
        for (field, present) in [("style", style.is_some()), ("roomType", room_type.is_some())] {
            if !present && !errors.iter().any(|err| err.field == field) {
                errors.push(FieldError::new(
                    field,
                    format!("{field} is required unless editMode is true"),
                ));
            }
        }
    }

    if !errors.is_empty() {
        return Err(ValidationErrors { errors });
    }
    match (
        image_data,
        build_mode(edit_mode, style, room_type, description, edit_prompt),
    ) {
        (Some(image_data), Some(mode)) => Ok(DesignJob { image_data, mode }),
        _ => Err(ValidationErrors {
            errors: vec![FieldError::new("body", "incomplete design request")],
        }),
    }
}

fn build_mode(
    edit_mode: bool,
    style: Option<Style>,
    room_type: Option<RoomType>,
    description: Option<String>,
    edit_prompt: Option<String>,
) -> Option<DesignMode> {
    if edit_mode {
        return Some(DesignMode::Edit {
            edit_prompt: edit_prompt?,
            style,
            room_type,
        });
    }
    Some(DesignMode::Generate {
        style: style?,
        room_type: room_type?,
        description,
    })
}

/// Missing, null, and blank strings all read as absent. A present value of the
/// wrong JSON type records an error and also reads as absent.
pub(crate) fn optional_string(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

pub(crate) fn check_length(field: &str, text: &str, max_chars: usize, errors: &mut Vec<FieldError>) {
    if text.chars().count() > max_chars {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
}

fn one_of<const N: usize>(labels: [&str; N]) -> String {
    format!("must be one of: {}", labels.join(", "))
}
