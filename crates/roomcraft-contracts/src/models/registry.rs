use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Text,
    ImageEdit,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Text => "text",
            Capability::ImageEdit => "image-edit",
        }
    }
}

/// One gateway model reachable through a short preference alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub alias: String,
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
}

impl ModelSpec {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Insertion-ordered: the first model supporting a capability is its default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    /// Looks up by alias first, then by full gateway model name.
    pub fn get(&self, key: &str) -> Option<&ModelSpec> {
        let key = key.trim();
        self.models
            .get(&key.to_ascii_lowercase())
            .or_else(|| self.models.values().find(|model| model.name == key))
    }

    pub fn by_capability(&self, capability: Capability) -> Vec<&ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .collect()
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();
    let mut insert = |alias: &str, name: &str, provider: &str, capabilities: &[Capability]| {
        map.insert(
            alias.to_string(),
            ModelSpec {
                alias: alias.to_string(),
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities.to_vec(),
            },
        );
    };

    insert("gemini", "google/gemini-2.5-flash", "gateway", &[Capability::Text]);
    insert("gemini-pro", "google/gemini-2.5-pro", "gateway", &[Capability::Text]);
    insert("gpt", "openai/gpt-5-mini", "gateway", &[Capability::Text]);
    insert("gpt-pro", "openai/gpt-5", "gateway", &[Capability::Text]);
    insert(
        "gemini-image",
        "google/gemini-2.5-flash-image-preview",
        "gateway",
        &[Capability::ImageEdit],
    );

    map
}
