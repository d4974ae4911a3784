use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{PromptArgument, PromptMetadata, SystemPrompt};

/// New metadata for an already registered prompt
#[derive(Debug, Clone, Default)]
pub struct PromptUpdate {
    pub description: String,
    pub version: String,
    pub arguments: Vec<PromptArgument>,
    pub modified: Option<SystemTime>,
}

/// In-memory set of system prompts keyed by name
#[derive(Debug)]
pub struct PromptsRegistry {
    prompts: RwLock<HashMap<String, Arc<SystemPrompt>>>,
    last_reload_at: RwLock<DateTime<Utc>>,
}

impl Default for PromptsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptsRegistry {
    pub fn new() -> Self {
        Self {
            prompts: RwLock::new(HashMap::new()),
            last_reload_at: RwLock::new(Utc::now()),
        }
    }

    /// Add a prompt, replacing any prompt with the same name
    pub async fn register(&self, prompt: SystemPrompt) {
        self.prompts
            .write()
            .await
            .insert(prompt.name.clone(), Arc::new(prompt));
    }

    pub async fn get(&self, name: &str) -> Option<Arc<SystemPrompt>> {
        self.prompts.read().await.get(name).cloned()
    }

    pub async fn unregister(&self, name: &str) -> bool {
        self.prompts.write().await.remove(name).is_some()
    }

    /// Swap in new metadata for `name`, dropping its cached body.
    /// Returns false when no such prompt is registered.
    pub async fn update(&self, name: &str, update: PromptUpdate) -> bool {
        let mut prompts = self.prompts.write().await;
        let Some(current) = prompts.get(name).cloned() else {
            return false;
        };
        let revised = current
            .revised(
                update.description,
                update.version,
                update.arguments,
                update.modified,
            )
            .await;
        prompts.insert(name.to_string(), Arc::new(revised));
        true
    }

    pub async fn count(&self) -> usize {
        self.prompts.read().await.len()
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prompts.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata of every prompt, sorted by name
    pub async fn list(&self) -> Vec<PromptMetadata> {
        let prompts: Vec<Arc<SystemPrompt>> =
            self.prompts.read().await.values().cloned().collect();

        let mut listed = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            listed.push(prompt.metadata().await);
        }
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    pub async fn last_reload_at(&self) -> DateTime<Utc> {
        *self.last_reload_at.read().await
    }

    pub async fn mark_reloaded(&self) {
        *self.last_reload_at.write().await = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::PromptScope;

    fn prompt(name: &str) -> SystemPrompt {
        SystemPrompt::new(name, format!("/prompts/{name}.prompt.md"))
            .with_description(format!("{name} prompt"))
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = PromptsRegistry::new();
        registry.register(prompt("review")).await;

        let found = registry.get("review").await.unwrap();
        assert_eq!(found.description, "review prompt");
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_list_is_sorted_system_scope() {
        let registry = PromptsRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(prompt(name)).await;
        }

        let listed = registry.list().await;
        let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(listed.iter().all(|p| p.scope == PromptScope::System));
        assert!(listed.iter().all(|p| p.updated_at > 0));
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = PromptsRegistry::new();
        registry.register(prompt("a")).await;

        assert!(registry.unregister("a").await);
        assert!(!registry.unregister("a").await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_metadata_and_advances_time() {
        let registry = PromptsRegistry::new();
        registry.register(prompt("a")).await;
        let before = registry.get("a").await.unwrap().updated_at().await;

        let updated = registry
            .update(
                "a",
                PromptUpdate {
                    description: "new".into(),
                    version: "2".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(updated);

        let after = registry.get("a").await.unwrap();
        assert_eq!(after.description, "new");
        assert_eq!(after.version, "2");
        assert!(!after.is_loaded().await);
        assert!(after.updated_at().await > before);

        assert!(!registry.update("b", PromptUpdate::default()).await);
    }

    #[tokio::test]
    async fn test_mark_reloaded() {
        let registry = PromptsRegistry::new();
        let first = registry.last_reload_at().await;
        registry.mark_reloaded().await;
        assert!(registry.last_reload_at().await >= first);
    }
}
