use std::sync::Arc;

use roomcraft_contracts::design::{build_design_prompt, DesignJob};
use roomcraft_contracts::models::{Capability, ModelSelector};
use roomcraft_contracts::recommendations::{
    build_recommendation_prompt, RecommendationJob, RECOMMENDATION_SYSTEM_PROMPT,
};
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, NO_FALLBACK_MESSAGE, PAYMENT_REQUIRED_MESSAGE};
use crate::extract::{Artifact, ProviderReply};
use crate::media::parse_data_url;
use crate::providers::{
    image_edit_form, image_generation_payload, text_completion_payload, ProviderKind,
};
use crate::transport::{truncate_text, HttpTransport, Method, OutboundRequest, Transport, UpstreamReply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image: String,
    pub provider: ProviderKind,
    pub model: Option<String>,
}

impl GeneratedImage {
    pub fn used_fallback(&self) -> bool {
        self.provider != ProviderKind::Gateway
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub text: String,
    pub model: String,
    pub fallback_reason: Option<String>,
}

/// Client for the AI gateway with a single-step fallback tier for images.
///
/// Each call is independent: one primary attempt, and only when that attempt
/// has answered 402 a single fallback attempt. Nothing is retried.
pub struct GatewayClient {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    models: ModelSelector,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            models: ModelSelector::default(),
        }
    }

    pub fn from_config(config: GatewayConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn generate_design(&self, job: &DesignJob) -> Result<GeneratedImage, GatewayError> {
        let api_key = self.primary_key()?;
        let model = self.image_model();
        let prompt = build_design_prompt(job);
        debug!(edit_mode = job.is_edit(), prompt = %prompt, "generating room design");

        let request = OutboundRequest::new(Method::Post, self.config.chat_completions_endpoint())
            .bearer(api_key)
            .json(image_generation_payload(&model, &prompt, &job.image_data));
        let reply = self.send(ProviderKind::Gateway, &request)?;

        match reply.status {
            _ if reply.is_success() => {
                let image = ProviderReply::parse(ProviderKind::Gateway, &reply.body, Artifact::Image)?
                    .into_image()
                    .inspect_err(|err| error!(error = %err, "gateway answered without an image"))?;
                info!(model = %model, "design generated by primary gateway");
                Ok(GeneratedImage {
                    image,
                    provider: ProviderKind::Gateway,
                    model: Some(model),
                })
            }
            429 => {
                warn!("primary gateway rate limited the request");
                Err(GatewayError::RateLimited)
            }
            402 => {
                warn!("primary gateway credits exhausted");
                self.generate_with_fallback(&job.image_data, &prompt)
            }
            status => Err(upstream_failure(ProviderKind::Gateway, &reply, status)),
        }
    }

    fn generate_with_fallback(
        &self,
        image_data: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, GatewayError> {
        let fallback = &self.config.fallback;
        let Some(api_key) = fallback.api_key.as_deref() else {
            warn!("no fallback credential configured; returning 402");
            return Err(GatewayError::PaymentRequired(NO_FALLBACK_MESSAGE.to_string()));
        };
        let photo = parse_data_url(image_data).map_err(|err| GatewayError::Upstream {
            provider: ProviderKind::ImageEdits.label(),
            status: None,
            body: format!("room photo could not be decoded: {err:#}"),
        })?;

        info!(endpoint = %fallback.edits_endpoint(), "attempting fallback image edit");
        let request = OutboundRequest::new(Method::Post, fallback.edits_endpoint())
            .bearer(api_key)
            .form(image_edit_form(fallback, prompt, photo));
        let reply = self.send(ProviderKind::ImageEdits, &request)?;
        if !reply.is_success() {
            return Err(upstream_failure(ProviderKind::ImageEdits, &reply, reply.status));
        }

        let image = ProviderReply::parse(ProviderKind::ImageEdits, &reply.body, Artifact::Image)?
            .into_image()
            .inspect_err(|err| error!(error = %err, "fallback answered without an image"))?;
        info!("design generated by fallback provider");
        Ok(GeneratedImage {
            image,
            provider: ProviderKind::ImageEdits,
            model: fallback.model.clone(),
        })
    }

    pub fn recommend(&self, job: &RecommendationJob) -> Result<Recommendation, GatewayError> {
        let api_key = self.primary_key()?;
        let selection = self
            .models
            .select(job.model_preference.as_deref(), Capability::Text)
            .map_err(GatewayError::Configuration)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            debug!(reason, "model preference resolved to default");
        }
        info!(model = %selection.model.name, "requesting design recommendation");

        let request = OutboundRequest::new(Method::Post, self.config.chat_completions_endpoint())
            .bearer(api_key)
            .json(text_completion_payload(
                &selection.model.name,
                RECOMMENDATION_SYSTEM_PROMPT,
                &build_recommendation_prompt(job),
            ));
        let reply = self.send(ProviderKind::Gateway, &request)?;

        match reply.status {
            _ if reply.is_success() => {
                let text = ProviderReply::parse(ProviderKind::Gateway, &reply.body, Artifact::Text)?
                    .into_text()?;
                Ok(Recommendation {
                    text,
                    model: selection.model.name.clone(),
                    fallback_reason: selection.fallback_reason.clone(),
                })
            }
            429 => {
                warn!("primary gateway rate limited the request");
                Err(GatewayError::RateLimited)
            }
            402 => {
                warn!("primary gateway credits exhausted");
                Err(GatewayError::PaymentRequired(PAYMENT_REQUIRED_MESSAGE.to_string()))
            }
            status => Err(upstream_failure(ProviderKind::Gateway, &reply, status)),
        }
    }

    /// The configured image model, by alias or full name. Anything the
    /// registry does not list as image-capable falls back to its default.
    fn image_model(&self) -> String {
        match self
            .models
            .select(Some(&self.config.image_model), Capability::ImageEdit)
        {
            Ok(selection) => {
                if let Some(reason) = selection.fallback_reason.as_deref() {
                    warn!(reason, "configured image model replaced by default");
                }
                selection.model.name
            }
            Err(reason) => {
                warn!(reason = %reason, "no image model registered; using configured name");
                self.config.image_model.clone()
            }
        }
    }

    fn primary_key(&self) -> Result<&str, GatewayError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            error!("LOVABLE_API_KEY is not configured");
            GatewayError::Configuration("LOVABLE_API_KEY is not configured".to_string())
        })
    }

    fn send(
        &self,
        kind: ProviderKind,
        request: &OutboundRequest,
    ) -> Result<UpstreamReply, GatewayError> {
        self.transport.send(request).map_err(|err| {
            error!(provider = kind.label(), error = %format!("{err:#}"), "upstream unreachable");
            GatewayError::Upstream {
                provider: kind.label(),
                status: None,
                body: format!("{err:#}"),
            }
        })
    }
}

fn upstream_failure(kind: ProviderKind, reply: &UpstreamReply, status: u16) -> GatewayError {
    let body = truncate_text(&reply.body, 512);
    error!(provider = kind.label(), status, body = %body, "upstream returned an error status");
    GatewayError::Upstream {
        provider: kind.label(),
        status: Some(status),
        body,
    }
}
