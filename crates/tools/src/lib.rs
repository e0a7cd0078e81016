//! Model-invokable tools for raglab.
//!
//! The model may call these during tool-capable rounds. Each tool is a
//! `raglab_core::Tool`; the registry built here is the tool executor.

pub mod project_details;

use raglab_core::retrieval::VectorIndex;
use raglab_core::tool::ToolRegistry;
use std::sync::Arc;

pub use project_details::ProjectDetailsTool;

/// Create the tool registry offered to the model.
pub fn default_registry(index: Arc<dyn VectorIndex>, detail_k: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ProjectDetailsTool::new(index, detail_k)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use raglab_memory::InMemoryIndex;
    use raglab_providers::HashingEmbedder;

    fn registry() -> ToolRegistry {
        let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::new(32))));
        default_registry(index, project_details::DEFAULT_DETAIL_K)
    }

    #[test]
    fn registry_offers_project_details_only() {
        let registry = registry();
        assert_eq!(registry.names(), ["get_project_details"]);
        assert_eq!(registry.definitions().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_yields_sentinel() {
        let output = registry()
            .execute("search_web", serde_json::json!({"q": "x"}))
            .await
            .unwrap();
        assert_eq!(output, "Unknown tool: search_web");
    }
}
