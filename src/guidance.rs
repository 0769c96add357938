//! Guidance generator: turns selected (risk, treatment) records into
//! procurement guidelines through a chat model.

use crate::llm::{ChatRequest, GuidanceModel, LlmResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One chosen (risk, treatment) pair with its lifecycle phase and
/// responsible stakeholder, as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceRecord {
    #[serde(rename = "Risk")]
    pub risk: String,
    #[serde(rename = "Treatment")]
    pub treatment: String,
    #[serde(rename = "LC_Phase")]
    pub lc_phase: String,
    #[serde(rename = "Stakeholder")]
    pub stakeholder: Option<String>,
}

const INSTRUCTION_TEMPLATE: &str = r#"You are a procurement expert that takes the results
from a Neo4j Cypher query and forms a human-readable response. The
query results is a list with risk and the associated treatment.
generated based on a user's natural language question. You are required
to generate a guideline for implementation of treatment for each risk.
The guideline will describe the treatment, the stakeholder responsible for
implementation of the treatment and the life cycle phase involved as obtained
from the context. If there are more than one treatment for a risk, then separate
the treatments in numbered paragraphs under the risk.

Query Results:
{context}

If the provided information is empty, say you don't know the answer.
Empty information looks like this: []

Never say you don't have the right information if there is data in
the query results. Always use the data in the query results.

# Example:
Risk: Inaccurate information
1. Treatment: Reranking strategy
Reranking strategy should be used in Deployment phase by the Development team.
This involves determining the semantic similarities of information retrieved
with the given query.

2. Treatment: Exploit external knowledge
Exploiting external knowledge involves referring to external and usually updated
information related to the query. The Development team should incorporate this
function during the Deployment phase of the system.
"#;

/// Records as the JSON list embedded in prompts; `[]` when empty
pub fn render_records(records: &[GuidanceRecord]) -> String {
    serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string())
}

/// Build the fixed instruction and the question for a record list
pub fn build_request(records: &[GuidanceRecord]) -> ChatRequest {
    let context = render_records(records);
    ChatRequest {
        system: INSTRUCTION_TEMPLATE.replace("{context}", &context),
        user: format!("What is the treatment for the risks in {context}?"),
    }
}

/// Sends record lists to a chat model and returns its text untouched
pub struct GuidanceGenerator {
    model: Arc<dyn GuidanceModel>,
}

impl GuidanceGenerator {
    pub fn new(model: Arc<dyn GuidanceModel>) -> Self {
        Self { model }
    }

    /// One model call; failures propagate unchanged.
    pub async fn generate(&self, records: &[GuidanceRecord]) -> LlmResult<String> {
        tracing::info!(records = records.len(), "requesting guidelines");
        self.model.chat(&build_request(records)).await
    }
}
