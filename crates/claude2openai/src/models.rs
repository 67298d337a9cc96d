//! Claude model allowlist.
//!
//! Requests naming a model outside the list (including OpenAI model names such
//! as `gpt-4o`) are routed to the first entry, the default model.

use crate::types::{ModelEntry, ModelList};

/// Models accepted by name when no configuration overrides them.
pub const DEFAULT_MODELS: &[&str] = &[
    "claude-3-haiku-20240307",
    "claude-3-sonnet-20240229",
    "claude-3-opus-20240229",
    "claude-3-5-sonnet-20240620",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl ModelCatalog {
    /// Returns `None` for an empty list; there would be nothing to fall back to.
    pub fn new(models: Vec<String>) -> Option<Self> {
        if models.is_empty() {
            None
        } else {
            Some(Self { models })
        }
    }

    pub fn default_model(&self) -> &str {
        &self.models[0]
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn resolve<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.contains(requested) {
            requested
        } else {
            self.default_model()
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// `GET /v1/models` payload.
    pub fn to_model_list(&self) -> ModelList {
        ModelList {
            object: "list".to_string(),
            data: self
                .models
                .iter()
                .map(|id| ModelEntry {
                    id: id.clone(),
                    object: "model".to_string(),
                    created: 0,
                    owned_by: "user".to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve_to_themselves() {
        let catalog = ModelCatalog::default();
        assert_eq!(
            catalog.resolve("claude-3-opus-20240229"),
            "claude-3-opus-20240229"
        );
    }

    #[test]
    fn unknown_models_fall_back_to_first_entry() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.resolve("gpt-4o"), "claude-3-haiku-20240307");
        assert_eq!(catalog.resolve(""), "claude-3-haiku-20240307");
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(ModelCatalog::new(vec![]).is_none());
        let custom = ModelCatalog::new(vec!["claude-x".to_string()]).unwrap();
        assert_eq!(custom.default_model(), "claude-x");
    }

    #[test]
    fn model_list_has_one_entry_per_model() {
        let list = ModelCatalog::default().to_model_list();
        assert_eq!(list.object, "list");
        assert_eq!(list.data.len(), DEFAULT_MODELS.len());
        assert!(list
            .data
            .iter()
            .all(|m| m.object == "model" && m.owned_by == "user"));
        assert_eq!(list.data[3].id, "claude-3-5-sonnet-20240620");
    }
}
