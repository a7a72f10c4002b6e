//! Client-side orchestration: room photo upload, generate, edit, persist and
//! the design listings. Functions are reached through a `FunctionInvoker`,
//! rows through a `DesignStore`, so the same studio drives the remote backend
//! or runs fully offline.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use roomcraft_contracts::design::{compose_edit_instructions, DesignRequest, RoomType, Style};
use roomcraft_contracts::envelope::GatewayEnvelope;
use roomcraft_contracts::records::{Design, DesignPatch, DesignStore, NewDesign};
use roomcraft_contracts::recommendations::RecommendationRequest;
use roomcraft_contracts::session::{Session, SessionContext, UserRole};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::extract::{NO_IMAGE_MESSAGE, NO_TEXT_MESSAGE};
use crate::handler::{FunctionHandler, FunctionRequest, RoomFunction};
use crate::media::{encode_data_url, sniff_image_mime, MAX_UPLOAD_BYTES};

const LOCAL_BEARER: &str = "Bearer local";

/// Reaches one of the two functions and returns its status and envelope.
pub trait FunctionInvoker: Send + Sync {
    fn invoke(
        &self,
        function: RoomFunction,
        body: &Value,
        session: Option<&Session>,
    ) -> Result<(u16, GatewayEnvelope)>;
}

impl FunctionInvoker for BackendClient {
    fn invoke(
        &self,
        function: RoomFunction,
        body: &Value,
        session: Option<&Session>,
    ) -> Result<(u16, GatewayEnvelope)> {
        Ok(self.invoke_function(function, body, session)?)
    }
}

/// Runs the function handler in-process instead of over HTTP.
pub struct LocalFunctions {
    handler: Arc<FunctionHandler>,
}

impl LocalFunctions {
    pub fn new(handler: Arc<FunctionHandler>) -> Self {
        Self { handler }
    }
}

impl FunctionInvoker for LocalFunctions {
    fn invoke(
        &self,
        function: RoomFunction,
        body: &Value,
        session: Option<&Session>,
    ) -> Result<(u16, GatewayEnvelope)> {
        let authorization = session
            .map(|session| format!("Bearer {}", session.access_token))
            .unwrap_or_else(|| LOCAL_BEARER.to_string());
        let request = FunctionRequest::post(serde_json::to_vec(body)?).with_authorization(authorization);
        let response = self.handler.handle(function, &request);
        Ok((response.status, response.body.unwrap_or_default()))
    }
}

/// Who is driving the studio.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    Guest,
    Member(&'a SessionContext),
    /// Offline use against a local store; no backend session exists.
    Local { user_id: Uuid, role: Option<UserRole> },
}

impl Actor<'_> {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::Guest => None,
            Actor::Member(context) => Some(context.user_id()),
            Actor::Local { user_id, .. } => Some(*user_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Actor::Guest => false,
            Actor::Member(context) => context.is_admin(),
            Actor::Local { role, .. } => role.map(UserRole::can_feature_designs).unwrap_or(false),
        }
    }

    fn session(&self) -> Option<&Session> {
        match self {
            Actor::Member(context) => Some(&context.session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPhoto {
    pub mime: &'static str,
    pub byte_len: usize,
    pub data_url: String,
}

/// Reads a room photo from disk into a data URL after checking its size and
/// that its bytes really are an image.
pub fn load_room_photo(path: &Path) -> Result<RoomPhoto> {
    let meta = fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    if meta.len() > MAX_UPLOAD_BYTES as u64 {
        bail!("{} is larger than 10 MB", path.display());
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let Some(mime) = sniff_image_mime(&bytes) else {
        bail!("{} is not a PNG, JPEG, WebP or GIF image", path.display());
    };
    Ok(RoomPhoto {
        mime,
        byte_len: bytes.len(),
        data_url: encode_data_url(mime, &bytes),
    })
}

/// What happened to the best-effort row write after a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Design),
    /// Nobody to own the row.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDesign {
    pub image: String,
    pub saved: SaveOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub text: String,
    pub model: Option<String>,
}

pub struct DesignStudio {
    invoker: Arc<dyn FunctionInvoker>,
    store: Arc<dyn DesignStore>,
}

impl DesignStudio {
    pub fn new(invoker: Arc<dyn FunctionInvoker>, store: Arc<dyn DesignStore>) -> Self {
        Self { invoker, store }
    }

    /// Generates a design and, when someone can own it, saves the row. A
    /// failed save never fails the generation.
    pub fn generate(
        &self,
        actor: Actor<'_>,
        image_data: &str,
        style: Style,
        room_type: RoomType,
        description: Option<&str>,
    ) -> Result<GeneratedDesign> {
        let request = DesignRequest::generate(
            image_data,
            style,
            room_type,
            description.map(str::to_string),
        );
        let envelope = self.call(actor, RoomFunction::GenerateRoomDesign, &serde_json::to_value(&request)?)?;
        let image = envelope.image.ok_or_else(|| anyhow!(NO_IMAGE_MESSAGE))?;

        let saved = match actor.user_id() {
            None => SaveOutcome::Skipped,
            Some(user_id) => {
                let row = NewDesign::ai_generated(user_id, style, room_type, description, image.clone());
                match self.store.insert(&row) {
                    Ok(design) => {
                        info!(design_id = %design.id, "generated design saved");
                        SaveOutcome::Saved(design)
                    }
                    Err(err) => {
                        warn!(error = %format!("{err:#}"), "saving generated design failed");
                        SaveOutcome::Failed(format!("{err:#}"))
                    }
                }
            }
        };
        Ok(GeneratedDesign { image, saved })
    }

    /// Applies a colour change and/or free-form instructions to an existing image.
    pub fn edit(
        &self,
        actor: Actor<'_>,
        image_data: &str,
        color_change: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<String> {
        let Some(edit_prompt) = compose_edit_instructions(color_change, instructions) else {
            bail!("No edits specified");
        };
        let request = DesignRequest::edit(image_data, edit_prompt);
        let envelope = self.call(actor, RoomFunction::GenerateRoomDesign, &serde_json::to_value(&request)?)?;
        envelope.image.ok_or_else(|| anyhow!(NO_IMAGE_MESSAGE))
    }

    pub fn recommend(&self, actor: Actor<'_>, request: &RecommendationRequest) -> Result<Advice> {
        let envelope = self.call(
            actor,
            RoomFunction::DesignRecommendations,
            &serde_json::to_value(request)?,
        )?;
        let text = envelope
            .recommendation
            .ok_or_else(|| anyhow!(NO_TEXT_MESSAGE))?;
        Ok(Advice {
            text,
            model: envelope.model,
        })
    }

    pub fn save_design(&self, actor: Actor<'_>, design: NewDesign) -> Result<Design> {
        let Some(user_id) = actor.user_id() else {
            bail!("sign in to save designs");
        };
        self.store.insert(&NewDesign { user_id, ..design })
    }

    /// Owners edit their rows; admins edit any row. Only admins touch `is_featured`.
    pub fn update_design(&self, actor: Actor<'_>, id: Uuid, patch: &DesignPatch) -> Result<Design> {
        if patch.touches_featured() && !actor.is_admin() {
            bail!("only admins can feature designs");
        }
        self.authorize_row(actor, id)?;
        self.store.update(id, patch)
    }

    pub fn delete_design(&self, actor: Actor<'_>, id: Uuid) -> Result<()> {
        self.authorize_row(actor, id)?;
        self.store.delete(id)?;
        info!(design_id = %id, "design deleted");
        Ok(())
    }

    pub fn set_featured(&self, actor: Actor<'_>, id: Uuid, featured: bool) -> Result<Design> {
        self.update_design(actor, id, &DesignPatch::featured(featured))
    }

    pub fn gallery(&self) -> Result<Vec<Design>> {
        self.store.list_featured()
    }

    pub fn my_designs(&self, actor: Actor<'_>) -> Result<Vec<Design>> {
        let Some(user_id) = actor.user_id() else {
            bail!("sign in to list your designs");
        };
        self.store.list_owned(user_id)
    }

    fn authorize_row(&self, actor: Actor<'_>, id: Uuid) -> Result<Design> {
        let Some(user_id) = actor.user_id() else {
            bail!("sign in to modify designs");
        };
        let design = self
            .store
            .get(id)?
            .ok_or_else(|| anyhow!("design {id} not found"))?;
        if !design.is_owned_by(user_id) && !actor.is_admin() {
            bail!("design {id} belongs to another user");
        }
        Ok(design)
    }

    fn call(&self, actor: Actor<'_>, function: RoomFunction, body: &Value) -> Result<GatewayEnvelope> {
        let (status, envelope) = self
            .invoker
            .invoke(function, body, actor.session())
            .with_context(|| format!("{} invocation failed", function.name()))?;
        if let Some(error) = envelope.error.as_deref() {
            bail!("{} failed ({status}): {error}", function.name());
        }
        if !(200..300).contains(&status) {
            bail!("{} failed with status {status}", function.name());
        }
        Ok(envelope)
    }
}
