// src/decompose/segment.rs

use crate::schema::graph::preview_text;
use crate::schema::{ActionType, Context, ObservationType, PlanGraph, PlanItem, PlanStep};
use tracing::info;

/// Split one sub-instruction's plan into contiguous same-context graphs.
///
/// `task_index` is 0-based; labels only carry the `(Task i/n, Seg j/m)`
/// suffix when there is more than one task or segment.
pub fn segment(
    sub_instruction: &str,
    plan: Vec<PlanItem>,
    task_index: usize,
    task_count: usize,
) -> Vec<PlanGraph> {
    let mut blocks: Vec<Vec<PlanItem>> = Vec::new();
    let mut current: Option<Context> = None;
    for item in plan {
        let context = item.context();
        if current == Some(context) {
            if let Some(block) = blocks.last_mut() {
                block.push(item);
                continue;
            }
        }
        if let Some(from) = current {
            info!(%from, to = %context, "context switch, starting new segment");
        }
        blocks.push(vec![item]);
        current = Some(context);
    }

    let segment_count = blocks.len();
    blocks
        .into_iter()
        .enumerate()
        .map(|(idx, items)| PlanGraph {
            instruction_label: label(sub_instruction, task_index, task_count, idx, segment_count),
            steps: items.into_iter().enumerate().map(|(j, item)| to_step(j, item)).collect(),
        })
        .collect()
}

fn label(sub_instruction: &str, task: usize, tasks: usize, seg: usize, segs: usize) -> String {
    let mut parts = Vec::new();
    if tasks > 1 {
        parts.push(format!("Task {}/{}", task + 1, tasks));
    }
    if segs > 1 {
        parts.push(format!("Seg {}/{}", seg + 1, segs));
    }
    if parts.is_empty() {
        sub_instruction.to_string()
    } else {
        format!("{sub_instruction} ({})", parts.join(", "))
    }
}

fn to_step(index: usize, item: PlanItem) -> PlanStep {
    let mut intent = intent_for(&item);
    let verify = item.action().and_then(|a| a.verify());
    let requires_approval = verify.is_some_and(|v| v.requires_approval);
    if let Some(reason) = verify.and_then(|v| v.reason.as_deref()).filter(|r| !r.is_empty()) {
        intent.push_str(&format!(" (Note: {reason})"));
    }

    PlanStep {
        step_id: index + 1,
        expected_outcome: outcome_for(&item),
        intent,
        dependencies: if index > 0 { vec![index] } else { Vec::new() },
        requires_approval,
        item,
    }
}

pub fn intent_for(item: &PlanItem) -> String {
    match item {
        PlanItem::Action(action) => {
            let target = action.target().unwrap_or_default();
            match action.action_type() {
                ActionType::LaunchApp if target.starts_with("http") => format!("Navigate to {target}"),
                ActionType::LaunchApp => format!("Launch {target} application"),
                ActionType::TypeText => {
                    format!("Type text '{}'", preview_text(action.text().unwrap_or_default(), 30))
                }
                ActionType::FocusWindow => format!("Focus {target} window"),
                ActionType::CloseApp => format!("Close {target} application"),
                ActionType::Wait => format!("Wait {target} seconds"),
                other => format!("Execute {other}"),
            }
        }
        PlanItem::Observation(observation) => match observation.observation_type() {
            ObservationType::ReadText => format!("Read text from {}", observation.target()),
            ObservationType::QueryElement => format!("Query element {}", observation.target()),
            other => format!("Observe {other}"),
        },
    }
}

pub fn outcome_for(item: &PlanItem) -> String {
    let PlanItem::Action(action) = item else {
        return "Data retrieved successfully".into();
    };
    let target = action.target().unwrap_or_default();
    match action.action_type() {
        ActionType::LaunchApp if target.starts_with("http") => format!("Browser navigates to {target}"),
        ActionType::LaunchApp => format!("{target} window appears"),
        ActionType::TypeText => "Text appears in focused element".into(),
        ActionType::FocusWindow => format!("{target} window becomes active"),
        ActionType::CloseApp => format!("{target} window closes"),
        ActionType::Wait => format!("Pause for {target} seconds"),
        ActionType::ClickControl => "Action completes successfully".into(),
    }
}
