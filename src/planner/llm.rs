// src/planner/llm.rs

use crate::client::ModelClient;
use crate::error::{PlanError, PlanResult};
use crate::planner::PlanGenerator;
use crate::planner::prompt::{system_prompt, user_prompt};
use crate::schema::{ObservationResult, Plan, PlanItem};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info};

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Generator that asks a language model for a JSON plan.
pub struct LlmPlanner {
    client: Box<dyn ModelClient>,
    max_items: usize,
}

impl LlmPlanner {
    pub fn new(client: Box<dyn ModelClient>, max_items: usize) -> Self {
        Self { client, max_items }
    }
}

impl PlanGenerator for LlmPlanner {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn generate(&self, instruction: &str, prior: &[ObservationResult]) -> PlanResult<Plan> {
        info!(model = self.client.name(), instruction, "generating model plan");

        let raw = self
            .client
            .generate(&system_prompt(self.max_items), &user_prompt(instruction, prior))?;
        debug!(raw = %raw, "model response");

        let plan = parse_response(&raw, self.max_items).inspect_err(|err| {
            error!(%err, response = %raw, "model plan rejected");
        })?;
        info!(items = plan.len(), "model generated plan");
        Ok(plan)
    }
}

fn strip_fences(response: &str) -> &str {
    let mut cleaned = response.trim();
    cleaned = cleaned.strip_prefix("```json").unwrap_or(cleaned);
    cleaned = cleaned.strip_prefix("```").unwrap_or(cleaned);
    cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);
    cleaned.trim()
}

/// Decode raw model text into a plan, validating every item.
pub fn parse_response(response: &str, max_items: usize) -> PlanResult<Plan> {
    let cleaned = strip_fences(response);

    let json = JSON_ARRAY
        .find(cleaned)
        .map(|m| m.as_str())
        .ok_or_else(|| PlanError::MalformedOutput("no JSON array found in model response".into()))?;

    let decoded: Value = serde_json::from_str(json)
        .map_err(|err| PlanError::MalformedOutput(format!("invalid JSON: {err}")))?;

    let Value::Array(items) = decoded else {
        return Err(PlanError::MalformedOutput("model output must be a JSON array".into()));
    };

    if items.is_empty() {
        return Err(PlanError::AmbiguousInstruction(
            "model returned an empty plan (ambiguous or unsafe instruction)".into(),
        ));
    }
    if items.len() > max_items {
        return Err(PlanError::TooComplex(format!(
            "{} items (max: {max_items}), break the task into smaller steps",
            items.len()
        )));
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            PlanItem::from_value(value).map_err(|source| PlanError::SchemaViolation {
                position: idx + 1,
                item: value.to_string(),
                source,
            })
        })
        .collect()
}
