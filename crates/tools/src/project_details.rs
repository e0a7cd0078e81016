//! Project details tool: a narrow similarity search keyed on a project title.
//!
//! The model calls this when the initial context mentions a project but lacks
//! the depth needed for a feature-level breakdown.

use async_trait::async_trait;
use raglab_core::error::ToolError;
use raglab_core::retrieval::{CHUNK_DELIMITER, VectorIndex};
use raglab_core::tool::Tool;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const TOOL_NAME: &str = "get_project_details";

/// Chunks returned per lookup.
pub const DEFAULT_DETAIL_K: usize = 3;

#[derive(Debug, Deserialize)]
struct ProjectDetailsInput {
    project_title: String,
}

pub struct ProjectDetailsTool {
    index: Arc<dyn VectorIndex>,
    k: usize,
}

impl ProjectDetailsTool {
    pub fn new(index: Arc<dyn VectorIndex>, k: usize) -> Self {
        Self { index, k }
    }
}

#[async_trait]
impl Tool for ProjectDetailsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Retrieve detailed information about a specific project from the portfolio. \
         Use this tool when the user asks for details, features, technical breakdown, \
         or technical specifications of a named project. \
         The tool returns the project title, link, and a full description chunk from \
         the knowledge base that you should use to produce a numbered Technical Breakdown."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "project_title": {
                    "type": "string",
                    "description": "The exact or approximate name of the project to look up."
                }
            },
            "required": ["project_title"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let ProjectDetailsInput { project_title } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(format!("{TOOL_NAME}: {e}")))?;

        debug!(project = %project_title, k = self.k, "Looking up project details");

        let chunks = self.index.similarity_search(&project_title, self.k).await?;
        if chunks.is_empty() {
            return Ok(format!("No information found for project: {project_title}"));
        }

        Ok(chunks
            .iter()
            .map(|c| format!("(source: {})\n{}", c.source_id, c.text))
            .collect::<Vec<_>>()
            .join(CHUNK_DELIMITER))
    }
}
