//! Model registry
//!
//! Static list of the model endpoints users can pick from. The portal
//! exposes a fixed, curated set; there is no runtime discovery.

use once_cell::sync::Lazy;

/// One selectable model endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Endpoint identifier sent to the dispatcher
    pub id: &'static str,
    /// Name shown in the model picker
    pub display_name: &'static str,
    /// Free-form capability tags ("fast", "reasoning", ...)
    pub tags: &'static [&'static str],
}

static MODELS: Lazy<Vec<ModelInfo>> = Lazy::new(|| {
    vec![
        ModelInfo {
            id: "gpt-4o",
            display_name: "GPT-4o",
            tags: &["general", "default"],
        },
        ModelInfo {
            id: "gpt-4o-mini",
            display_name: "GPT-4o mini",
            tags: &["general", "fast"],
        },
        ModelInfo {
            id: "o3-mini",
            display_name: "o3-mini",
            tags: &["reasoning"],
        },
        ModelInfo {
            id: "claude-sonnet-4-20250514",
            display_name: "Claude Sonnet 4",
            tags: &["general", "reasoning"],
        },
        ModelInfo {
            id: "claude-3-5-haiku-20241022",
            display_name: "Claude Haiku 3.5",
            tags: &["fast"],
        },
        ModelInfo {
            id: "gemini-2.0-flash",
            display_name: "Gemini 2.0 Flash",
            tags: &["general", "fast"],
        },
    ]
});

/// Lookup surface over the static model list
pub struct ModelCatalog;

impl ModelCatalog {
    /// All selectable models, in picker order
    pub fn all() -> &'static [ModelInfo] {
        &MODELS
    }

    /// Whether `id` names a selectable model
    pub fn contains(id: &str) -> bool {
        MODELS.iter().any(|m| m.id == id)
    }

    /// Metadata for a model id, if selectable
    pub fn get(id: &str) -> Option<&'static ModelInfo> {
        MODELS.iter().find(|m| m.id == id)
    }

    /// The model new sessions start on
    pub fn default_model() -> &'static ModelInfo {
        MODELS
            .iter()
            .find(|m| m.tags.contains(&"default"))
            .unwrap_or(&MODELS[0])
    }

    /// Models carrying a given tag
    pub fn by_tag(tag: &str) -> Vec<&'static ModelInfo> {
        MODELS.iter().filter(|m| m.tags.contains(&tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_known_model() {
        assert!(ModelCatalog::contains("gpt-4o"));
        assert!(!ModelCatalog::contains("made-up-model"));
    }

    #[test]
    fn test_default_model_is_selectable() {
        let default = ModelCatalog::default_model();
        assert!(ModelCatalog::contains(default.id));
    }

    #[test]
    fn test_by_tag() {
        let fast = ModelCatalog::by_tag("fast");
        assert!(!fast.is_empty());
        assert!(fast.iter().all(|m| m.tags.contains(&"fast")));
    }

    #[test]
    fn test_get_returns_metadata() {
        let info = ModelCatalog::get("gpt-4o").unwrap();
        assert_eq!(info.display_name, "GPT-4o");
    }
}
