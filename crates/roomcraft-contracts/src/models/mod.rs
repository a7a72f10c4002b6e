mod registry;
mod selectors;

pub use registry::{Capability, ModelRegistry, ModelSpec};
pub use selectors::{ModelSelection, ModelSelector};

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{Capability, ModelRegistry, ModelSelector, ModelSpec};

    #[test]
    fn known_preferences_map_to_gateway_models() {
        let selector = ModelSelector::default();
        for (alias, expected) in [
            ("gemini", "google/gemini-2.5-flash"),
            ("gemini-pro", "google/gemini-2.5-pro"),
            ("gpt", "openai/gpt-5-mini"),
            ("GPT-Pro", "openai/gpt-5"),
        ] {
            let selection = selector.select(Some(alias), Capability::Text).unwrap();
            assert_eq!(selection.model.name, expected);
            assert_eq!(selection.fallback_reason, None);
        }
    }

    #[test]
    fn unknown_preference_falls_back_to_default_text_model() {
        let selection = ModelSelector::default()
            .select(Some("llama"), Capability::Text)
            .unwrap();
        assert_eq!(selection.model.name, "google/gemini-2.5-flash");
        assert_eq!(selection.requested.as_deref(), Some("llama"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Unknown model preference 'llama'.")
        );
    }

    #[test]
    fn missing_preference_uses_default_with_explanation() {
        let selection = ModelSelector::default().select(None, Capability::Text).unwrap();
        assert_eq!(selection.model.alias, "gemini");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model preference given; using default.")
        );
    }

    #[test]
    fn image_model_is_not_a_text_preference() {
        let selection = ModelSelector::default()
            .select(Some("gemini-image"), Capability::Text)
            .unwrap();
        assert_eq!(selection.model.alias, "gemini");

        let image = ModelSelector::default()
            .select(Some("google/gemini-2.5-flash-image-preview"), Capability::ImageEdit)
            .unwrap();
        assert_eq!(image.model.alias, "gemini-image");
        assert_eq!(image.fallback_reason, None);
    }

    #[test]
    fn empty_registry_reports_missing_capability() {
        let mut models = IndexMap::new();
        models.insert(
            "only-text".to_string(),
            ModelSpec {
                alias: "only-text".to_string(),
                name: "vendor/only-text".to_string(),
                provider: "gateway".to_string(),
                capabilities: vec![Capability::Text],
            },
        );
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(None, Capability::ImageEdit)
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'image-edit'.");
    }
}
