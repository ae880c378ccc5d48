// src/schema/graph.rs

use super::{Context, PlanItem};
use serde::{Deserialize, Serialize};

/// One item wrapped with the metadata the executor shows and approves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based position within the owning graph.
    pub step_id: usize,
    pub item: PlanItem,
    pub intent: String,
    pub expected_outcome: String,
    /// Step ids that must complete first (the immediate predecessor).
    #[serde(default)]
    pub dependencies: Vec<usize>,
    #[serde(default)]
    pub requires_approval: bool,
}

/// A context-homogeneous run of steps. The unit handed to the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanGraph {
    #[serde(rename = "instruction")]
    pub instruction_label: String,
    pub steps: Vec<PlanStep>,
}

impl PlanGraph {
    /// Context shared by every step; `None` only for an empty graph.
    pub fn context(&self) -> Option<Context> {
        self.steps.first().map(|s| s.item.context())
    }

    pub fn total_actions(&self) -> usize {
        self.steps.iter().filter(|s| s.item.is_action()).count()
    }

    pub fn total_observations(&self) -> usize {
        self.steps.iter().filter(|s| s.item.is_observation()).count()
    }

    pub fn approval_required(&self) -> bool {
        self.steps.iter().any(|s| s.requires_approval)
    }

    pub fn approval_steps(&self) -> Vec<&PlanStep> {
        self.steps.iter().filter(|s| s.requires_approval).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Items are re-validated on the way in, exactly like model output.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain-text tree for previews and logs.
    pub fn preview(&self) -> String {
        let mut lines = vec![
            format!("┌─ Plan Preview {}", "─".repeat(54)),
            format!("│ Instruction: {}", self.instruction_label),
            format!(
                "│ Total Steps: {} ({} actions, {} observations)",
                self.steps.len(),
                self.total_actions(),
                self.total_observations()
            ),
        ];
        if self.approval_required() {
            lines.push(format!(
                "│ Approval Required: {} step(s) marked",
                self.approval_steps().len()
            ));
        }
        lines.push("│".into());

        for step in &self.steps {
            let marker = if step.requires_approval { " [REQUIRES APPROVAL]" } else { "" };
            lines.push(format!("│ Step {}: {}{}", step.step_id, step.item.type_name(), marker));
            lines.push(format!("│   Intent: {}", step.intent));
            lines.push(format!("│   Expected: {}", step.expected_outcome));
            if let Some(target) = step.item.target() {
                lines.push(format!("│   Target: {target}"));
            }
            if let Some(text) = step.item.action().and_then(|a| a.text()) {
                lines.push(format!("│   Text: '{}'", preview_text(text, 50)));
            }
            let deps = if step.dependencies.is_empty() {
                "None".to_string()
            } else {
                step.dependencies
                    .iter()
                    .map(|d| format!("Step {d}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            lines.push(format!("│   Dependencies: {deps}"));
            lines.push("│".into());
        }

        lines.push(format!("└{}", "─".repeat(70)));
        lines.join("\n")
    }
}

/// Truncate on a char boundary, appending "..." when shortened.
pub(crate) fn preview_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Action, Observation, Verify};
    use pretty_assertions::assert_eq;

    fn sample() -> PlanGraph {
        let launch = Action::launch(Context::Desktop, "notepad.exe")
            .unwrap()
            .with_verify(Verify {
                requires_approval: true,
                reason: Some("low confidence".into()),
                ..Verify::default()
            });
        PlanGraph {
            instruction_label: "open notepad".into(),
            steps: vec![
                PlanStep {
                    step_id: 1,
                    item: launch.into(),
                    intent: "Launch notepad.exe application".into(),
                    expected_outcome: "notepad.exe window appears".into(),
                    dependencies: vec![],
                    requires_approval: true,
                },
                PlanStep {
                    step_id: 2,
                    item: Action::wait(1.0).into(),
                    intent: "Wait 1.0 seconds".into(),
                    expected_outcome: "Pause for 1.0 seconds".into(),
                    dependencies: vec![1],
                    requires_approval: false,
                },
            ],
        }
    }

    #[test]
    fn json_round_trip_preserves_graph() {
        let graph = sample();
        let json = graph.to_json().unwrap();
        assert_eq!(PlanGraph::from_json(&json).unwrap(), graph);
    }

    #[test]
    fn from_json_rejects_invalid_items() {
        let json = r#"{"instruction":"x","steps":[{"step_id":1,
            "item":{"observation_type":"read_text","context":"file"},
            "intent":"","expected_outcome":""}]}"#;
        assert!(PlanGraph::from_json(json).is_err());
    }

    #[test]
    fn summary_accessors() {
        let graph = sample();
        assert_eq!(graph.context(), Some(Context::Desktop));
        assert_eq!(graph.total_actions(), 2);
        assert_eq!(graph.total_observations(), 0);
        assert!(graph.approval_required());
        assert_eq!(graph.approval_steps().len(), 1);
    }

    #[test]
    fn preview_lists_each_step() {
        let mut graph = sample();
        graph.steps.push(PlanStep {
            step_id: 3,
            item: Observation::read_file("notes.txt").unwrap().into(),
            intent: "Read text from notes.txt".into(),
            expected_outcome: "Data retrieved successfully".into(),
            dependencies: vec![2],
            requires_approval: false,
        });
        let tree = graph.preview();
        assert!(tree.contains("│ Step 1: launch_app [REQUIRES APPROVAL]"));
        assert!(tree.contains("│   Dependencies: Step 2"));
        assert!(tree.contains("│   Target: notes.txt"));
        assert!(tree.contains("Approval Required: 1 step(s) marked"));
    }

    #[test]
    fn preview_text_truncates_on_chars() {
        assert_eq!(preview_text("héllo wörld", 5), "héllo...");
        assert_eq!(preview_text("short", 30), "short");
    }
}
