use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::design::{estimate_price, RoomType, Style};

mod local_store;

pub use local_store::LocalDesignStore;

/// A row of `room_designs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub style: String,
    pub room_type: String,
    pub price: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Design {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    fn apply(&mut self, patch: &DesignPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(style) = &patch.style {
            self.style = style.clone();
        }
        if let Some(room_type) = &patch.room_type {
            self.room_type = room_type.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = Some(image_url.clone());
        }
        if let Some(is_featured) = patch.is_featured {
            self.is_featured = is_featured;
        }
    }
}

/// Insert payload for `room_designs`; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDesign {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub style: String,
    pub room_type: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub ai_generated: bool,
}

impl NewDesign {
    /// Record written after a successful generation.
    pub fn ai_generated(
        user_id: Uuid,
        style: Style,
        room_type: RoomType,
        description: Option<&str>,
        image_url: impl Into<String>,
    ) -> Self {
        let description = description
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("AI-generated {style} style {room_type} design"));
        Self {
            user_id,
            title: format!("AI {style} {room_type}"),
            description: Some(description),
            style: style.to_string(),
            room_type: room_type.to_string(),
            price: estimate_price(style, room_type),
            image_url: Some(image_url.into()),
            ai_generated: true,
        }
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
}

impl DesignPatch {
    pub fn featured(is_featured: bool) -> Self {
        Self {
            is_featured: Some(is_featured),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn touches_featured(&self) -> bool {
        self.is_featured.is_some()
    }
}

/// A row of `profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Row-level access to saved designs. Implemented over the managed backend
/// and over a local JSON file.
pub trait DesignStore: Send + Sync {
    fn insert(&self, design: &NewDesign) -> anyhow::Result<Design>;
    fn update(&self, id: Uuid, patch: &DesignPatch) -> anyhow::Result<Design>;
    fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    fn get(&self, id: Uuid) -> anyhow::Result<Option<Design>>;
    /// Featured designs, newest first.
    fn list_featured(&self) -> anyhow::Result<Vec<Design>>;
    /// Designs owned by `user_id`, newest first.
    fn list_owned(&self, user_id: Uuid) -> anyhow::Result<Vec<Design>>;
}
