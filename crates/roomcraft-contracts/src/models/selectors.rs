use super::registry::{Capability, ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    /// Resolves a caller's model preference. Unknown or mismatched preferences
    /// degrade to the capability default and say why.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: Capability,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        let fallback_reason = match requested {
            Some(wanted) => match self.registry.get(wanted) {
                Some(model) if model.supports(capability) => {
                    return Ok(ModelSelection {
                        model: model.clone(),
                        requested: Some(wanted.to_string()),
                        fallback_reason: None,
                    });
                }
                Some(_) => format!(
                    "Model preference '{wanted}' does not support {}.",
                    capability.as_str()
                ),
                None => format!("Unknown model preference '{wanted}'."),
            },
            None => "No model preference given; using default.".to_string(),
        };

        let Some(model) = self.registry.by_capability(capability).first().copied() else {
            return Err(format!(
                "No models available for capability '{}'.",
                capability.as_str()
            ));
        };
        Ok(ModelSelection {
            model: model.clone(),
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }
}
