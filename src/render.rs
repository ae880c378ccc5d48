// src/render.rs

use crate::schema::graph::preview_text;
use crate::schema::{Context, PlanGraph, PlanItem};
use colored::{ColoredString, Colorize};

fn context_badge(context: Option<Context>) -> ColoredString {
    match context {
        Some(Context::Desktop) => "[desktop]".blue().bold(),
        Some(Context::Web) => "[web]".magenta().bold(),
        Some(Context::File) => "[file]".yellow().bold(),
        None => "[empty]".dimmed(),
    }
}

fn kind(item: &PlanItem) -> ColoredString {
    match item {
        PlanItem::Action(_) => item.type_name().green(),
        PlanItem::Observation(_) => item.type_name().cyan(),
    }
}

/// Terminal tree for one graph, numbered `index` of `total`.
pub fn render_graph(graph: &PlanGraph, index: usize, total: usize) -> String {
    let mut lines = vec![format!(
        "{} {} {}",
        format!("Plan {index}/{total}").bold(),
        context_badge(graph.context()),
        graph.instruction_label
    )];
    lines.push(format!(
        "  {} steps: {} actions, {} observations",
        graph.steps.len(),
        graph.total_actions(),
        graph.total_observations()
    ));

    for step in &graph.steps {
        let approval = if step.requires_approval {
            format!(" {}", "REQUIRES APPROVAL".red().bold())
        } else {
            String::new()
        };
        lines.push(format!("  {:>2}. {}{}", step.step_id, kind(&step.item), approval));
        lines.push(format!("      {}", step.intent));
        lines.push(format!("      {} {}", "→".dimmed(), step.expected_outcome.dimmed()));
        if let Some(text) = step.item.action().and_then(|a| a.text()) {
            lines.push(format!("      text: '{}'", preview_text(text, 50)));
        }
    }
    lines.join("\n")
}

pub fn render_graphs(graphs: &[PlanGraph]) -> String {
    graphs
        .iter()
        .enumerate()
        .map(|(idx, graph)| render_graph(graph, idx + 1, graphs.len()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
