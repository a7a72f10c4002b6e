//! Client for the managed auth/data backend: GoTrue-style auth endpoints,
//! PostgREST tables (`room_designs`, `profiles`, `user_roles`), one RPC and
//! the remote function channel.

use std::sync::Arc;

use roomcraft_contracts::envelope::GatewayEnvelope;
use roomcraft_contracts::records::{
    Design, DesignPatch, DesignStore, NewDesign, Profile, ProfilePatch,
};
use roomcraft_contracts::session::{Session, SessionContext, UserRole};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::handler::RoomFunction;
use crate::transport::{
    truncate_text, HttpTransport, Method, OutboundRequest, Transport, UpstreamReply,
};

const DESIGNS_TABLE: &str = "room_designs";
const PROFILES_TABLE: &str = "profiles";
const ROLES_TABLE: &str = "user_roles";
const ENSURE_USER_RPC: &str = "ensure_user_initialized";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable during {context}: {message}")]
    Transport {
        context: &'static str,
        message: String,
    },
    #[error("{context} failed ({status}): {message}")]
    Status {
        context: &'static str,
        status: u16,
        message: String,
    },
    #[error("{context}: unexpected response: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },
    #[error("{0} not found")]
    NotFound(String),
}

/// Result of a sign-up; `session` is `None` while email confirmation is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user_id: Option<Uuid>,
    pub session: Option<Session>,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: UserRole,
}

#[derive(Clone)]
pub struct BackendClient {
    config: BackendConfig,
    transport: Arc<dyn Transport>,
}

impl BackendClient {
    pub fn new(config: BackendConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn from_config(config: BackendConfig, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self::new(config, Arc::new(HttpTransport::new(timeout)?)))
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUp, BackendError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(name) = full_name {
            body["data"] = json!({ "full_name": name });
        }
        let request = self.request(Method::Post, "/auth/v1/signup", None).json(body);
        let reply = self.exchange("sign up", &request)?;
        let value: Value = decode("sign up", &reply)?;
        if let Ok(session) = serde_json::from_value::<Session>(value.clone()) {
            info!(user_id = %session.user_id(), "signed up with immediate session");
            return Ok(SignUp {
                user_id: Some(session.user_id()),
                session: Some(session),
            });
        }
        let user_id = value
            .get("id")
            .or_else(|| value.get("user").and_then(|user| user.get("id")))
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok());
        info!(?user_id, "signed up; confirmation pending");
        Ok(SignUp {
            user_id,
            session: None,
        })
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let request = self
            .request(Method::Post, "/auth/v1/token?grant_type=password", None)
            .json(json!({ "email": email, "password": password }));
        let reply = self.exchange("sign in", &request)?;
        let session: Session = decode("sign in", &reply)?;
        info!(user_id = %session.user_id(), "signed in");
        Ok(session)
    }

    pub fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let request = self.request(Method::Post, "/auth/v1/logout", Some(session));
        self.exchange("sign out", &request)?;
        Ok(())
    }

    pub fn ensure_user_initialized(&self, session: &Session) -> Result<(), BackendError> {
        let request = self
            .request(Method::Post, &format!("/rest/v1/rpc/{ENSURE_USER_RPC}"), Some(session))
            .json(json!({}));
        self.exchange("user initialization", &request)?;
        Ok(())
    }

    pub fn fetch_role(&self, session: &Session) -> Result<Option<UserRole>, BackendError> {
        let path = format!(
            "/rest/v1/{ROLES_TABLE}?select=role&user_id=eq.{}",
            session.user_id()
        );
        let request = self.request(Method::Get, &path, Some(session));
        let reply = self.exchange("role lookup", &request)?;
        let rows: Vec<RoleRow> = decode("role lookup", &reply)?;
        // Admin wins when a user holds several roles.
        let role = rows
            .iter()
            .map(|row| row.role)
            .find(|role| role.can_feature_designs())
            .or_else(|| rows.first().map(|row| row.role));
        Ok(role)
    }

    /// Session setup after sign-in: the initialization RPC and the role lookup
    /// are both best effort, so a session always comes back usable.
    pub fn resolve_session(&self, session: Session) -> SessionContext {
        if let Err(err) = self.ensure_user_initialized(&session) {
            warn!(error = %err, "user initialization failed; continuing");
        }
        let role = match self.fetch_role(&session) {
            Ok(role) => role,
            Err(err) => {
                warn!(error = %err, "role lookup failed; treating user as non-admin");
                None
            }
        };
        debug!(user_id = %session.user_id(), ?role, "session resolved");
        SessionContext { session, role }
    }

    pub fn get_profile(&self, session: &Session) -> Result<Option<Profile>, BackendError> {
        let path = format!(
            "/rest/v1/{PROFILES_TABLE}?select=*&id=eq.{}",
            session.user_id()
        );
        let request = self.request(Method::Get, &path, Some(session));
        let reply = self.exchange("profile lookup", &request)?;
        let rows: Vec<Profile> = decode("profile lookup", &reply)?;
        Ok(rows.into_iter().next())
    }

    pub fn update_profile(
        &self,
        session: &Session,
        patch: &ProfilePatch,
    ) -> Result<Profile, BackendError> {
        let path = format!("/rest/v1/{PROFILES_TABLE}?id=eq.{}", session.user_id());
        let request = self
            .request(Method::Patch, &path, Some(session))
            .header("Prefer", "return=representation")
            .json(to_json(patch));
        let reply = self.exchange("profile update", &request)?;
        let rows: Vec<Profile> = decode("profile update", &reply)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("profile {}", session.user_id())))
    }

    /// Design rows as seen by `session`, or anonymously when `None`.
    pub fn designs(&self, session: Option<&Session>) -> RestDesignStore {
        RestDesignStore {
            client: self.clone(),
            session: session.cloned(),
        }
    }

    /// POSTs `body` to a deployed function and returns its status and envelope.
    pub fn invoke_function(
        &self,
        function: RoomFunction,
        body: &Value,
        session: Option<&Session>,
    ) -> Result<(u16, GatewayEnvelope), BackendError> {
        let request = self
            .request(
                Method::Post,
                &format!("/functions/v1/{}", function.name()),
                session,
            )
            .json(body.clone());
        let reply = self
            .transport
            .send(&request)
            .map_err(|err| BackendError::Transport {
                context: function.name(),
                message: format!("{err:#}"),
            })?;
        let envelope = serde_json::from_str::<GatewayEnvelope>(&reply.body).unwrap_or_else(|_| {
            GatewayEnvelope::error(format!(
                "Function returned status {} with an unreadable body",
                reply.status
            ))
        });
        Ok((reply.status, envelope))
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> OutboundRequest {
        let token = session
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone());
        OutboundRequest::new(method, format!("{}{path}", self.config.url))
            .bearer(token)
            .header("apikey", self.config.anon_key.clone())
    }

    fn exchange(
        &self,
        context: &'static str,
        request: &OutboundRequest,
    ) -> Result<UpstreamReply, BackendError> {
        let reply = self
            .transport
            .send(request)
            .map_err(|err| BackendError::Transport {
                context,
                message: format!("{err:#}"),
            })?;
        if !reply.is_success() {
            return Err(BackendError::Status {
                context,
                status: reply.status,
                message: error_message(&reply.body),
            });
        }
        Ok(reply)
    }
}

/// Design table access bound to one caller's credentials.
pub struct RestDesignStore {
    client: BackendClient,
    session: Option<Session>,
}

impl RestDesignStore {
    fn request(&self, method: Method, query: &str) -> OutboundRequest {
        self.client.request(
            method,
            &format!("/rest/v1/{DESIGNS_TABLE}{query}"),
            self.session.as_ref(),
        )
    }

    fn rows(&self, context: &'static str, request: OutboundRequest) -> Result<Vec<Design>, BackendError> {
        let reply = self.client.exchange(context, &request)?;
        decode(context, &reply)
    }

    fn single(&self, context: &'static str, id: Uuid, request: OutboundRequest) -> Result<Design, BackendError> {
        self.rows(context, request)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("design {id}")))
    }
}

impl DesignStore for RestDesignStore {
    fn insert(&self, design: &NewDesign) -> anyhow::Result<Design> {
        let request = self
            .request(Method::Post, "")
            .header("Prefer", "return=representation")
            .json(to_json(design));
        let row = self
            .rows("design insert", request)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode {
                context: "design insert",
                message: "no row returned".to_string(),
            })?;
        Ok(row)
    }

    fn update(&self, id: Uuid, patch: &DesignPatch) -> anyhow::Result<Design> {
        let request = self
            .request(Method::Patch, &format!("?id=eq.{id}"))
            .header("Prefer", "return=representation")
            .json(to_json(patch));
        Ok(self.single("design update", id, request)?)
    }

    fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let request = self.request(Method::Delete, &format!("?id=eq.{id}"));
        self.client.exchange("design delete", &request)?;
        Ok(())
    }

    fn get(&self, id: Uuid) -> anyhow::Result<Option<Design>> {
        let request = self.request(Method::Get, &format!("?select=*&id=eq.{id}"));
        Ok(self.rows("design lookup", request)?.into_iter().next())
    }

    fn list_featured(&self) -> anyhow::Result<Vec<Design>> {
        let request = self.request(
            Method::Get,
            "?select=*&is_featured=eq.true&order=created_at.desc",
        );
        Ok(self.rows("featured designs", request)?)
    }

    fn list_owned(&self, user_id: Uuid) -> anyhow::Result<Vec<Design>> {
        let request = self.request(
            Method::Get,
            &format!("?select=*&user_id=eq.{user_id}&order=created_at.desc"),
        );
        Ok(self.rows("owned designs", request)?)
    }
}

fn to_json(value: &impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn decode<T: DeserializeOwned>(context: &'static str, reply: &UpstreamReply) -> Result<T, BackendError> {
    serde_json::from_str(&reply.body).map_err(|err| BackendError::Decode {
        context,
        message: err.to_string(),
    })
}

/// Pulls the human-readable part out of an auth or PostgREST error body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let found = parsed.as_ref().and_then(|value| {
        ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    });
    found.unwrap_or_else(|| truncate_text(body.trim(), 200))
}
