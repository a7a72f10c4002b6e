use std::fmt;

use serde::{Deserialize, Serialize};

mod pricing;
mod prompt;
pub(crate) mod validation;

pub use pricing::estimate_price;
pub use prompt::{build_design_prompt, compose_edit_instructions};
pub use validation::{
    validate_design_request, DesignJob, DesignMode, FieldError, ValidationErrors,
    DESCRIPTION_MAX_CHARS, EDIT_PROMPT_MAX_CHARS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    Modern,
    Minimalist,
    Scandinavian,
    Industrial,
    Contemporary,
    Traditional,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Modern,
        Style::Minimalist,
        Style::Scandinavian,
        Style::Industrial,
        Style::Contemporary,
        Style::Traditional,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Style::Modern => "Modern",
            Style::Minimalist => "Minimalist",
            Style::Scandinavian => "Scandinavian",
            Style::Industrial => "Industrial",
            Style::Contemporary => "Contemporary",
            Style::Traditional => "Traditional",
        }
    }

    /// Case-insensitive match against the catalog labels.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "Living Room")]
    LivingRoom,
    Bedroom,
    Kitchen,
    Bathroom,
    Office,
    #[serde(rename = "Dining Room")]
    DiningRoom,
}

impl RoomType {
    pub const ALL: [RoomType; 6] = [
        RoomType::LivingRoom,
        RoomType::Bedroom,
        RoomType::Kitchen,
        RoomType::Bathroom,
        RoomType::Office,
        RoomType::DiningRoom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RoomType::LivingRoom => "Living Room",
            RoomType::Bedroom => "Bedroom",
            RoomType::Kitchen => "Kitchen",
            RoomType::Bathroom => "Bathroom",
            RoomType::Office => "Office",
            RoomType::DiningRoom => "Dining Room",
        }
    }

    /// Accepts the catalog label in any case, and `living-room` / `living_room`
    /// spellings as typed on a command line.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|room| room.label().eq_ignore_ascii_case(&wanted))
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body accepted by `/generate-room-design`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRequest {
    pub image_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub edit_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_prompt: Option<String>,
}

impl DesignRequest {
    pub fn generate(
        image_data: impl Into<String>,
        style: Style,
        room_type: RoomType,
        description: Option<String>,
    ) -> Self {
        Self {
            image_data: image_data.into(),
            style: Some(style),
            room_type: Some(room_type),
            description,
            edit_mode: false,
            edit_prompt: None,
        }
    }

    pub fn edit(image_data: impl Into<String>, edit_prompt: impl Into<String>) -> Self {
        Self {
            image_data: image_data.into(),
            edit_mode: true,
            edit_prompt: Some(edit_prompt.into()),
            ..Self::default()
        }
    }
}
