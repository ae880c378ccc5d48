// src/repair/mod.rs

//! Ordered rewrites applied to model-backed plans.
//!
//! Every pass is a pure function over a [`Plan`]; [`repair_plan`] composes
//! them left to right. The order matters: target inference must see the
//! original launch/close order, and reordering must run last so the
//! buffering waits are computed on the generator's sequence.

pub mod gate;

use crate::error::{PlanError, PlanResult};
use crate::schema::{Action, ActionType, Plan, PlanItem};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

pub use gate::filter_hallucinations;

/// Keystroke text that opens the save dialog.
pub const SAVE_SHORTCUT: &str = "^s";
pub const DEFAULT_FILENAME: &str = "untitled.txt";

const FILENAME_MARKERS: [&str; 6] = [".txt", ".md", ".json", ".py", "\\", "/"];
const FILENAME_LOOKAHEAD: usize = 3;

static FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9_\-\\]+\.(?:txt|md|json|csv|py))").unwrap());

pub fn repair_plan(plan: Plan, instruction: &str) -> PlanResult<Plan> {
    let plan = infer_close_targets(plan)?;
    let plan = repair_save_sequence(plan, instruction);
    let plan = buffer_destructive_sequences(plan);
    let plan = move_closes_last(plan);
    ensure_close_targets(plan)
}

/// Fill a target-less `close_app` from the apps launched or focused before it.
///
/// Exactly one candidate is unambiguous. Zero or several candidates are
/// handed back to the caller as [`PlanError::NeedsClarification`]; the
/// candidate list is ordered oldest first, so its last entry is the most
/// recent app.
pub fn infer_close_targets(plan: Plan) -> PlanResult<Plan> {
    let mut candidates: Vec<String> = Vec::new();
    let mut repaired = Vec::with_capacity(plan.len());

    for item in plan {
        let action = match item {
            PlanItem::Action(action) => action,
            observation => {
                repaired.push(observation);
                continue;
            }
        };

        match action.action_type() {
            ActionType::LaunchApp | ActionType::FocusWindow => {
                if let Some(target) = action.target() {
                    if !candidates.iter().any(|c| c == target) {
                        candidates.push(target.to_string());
                    }
                }
                repaired.push(action.into());
            }
            ActionType::CloseApp if action.target().is_none() => {
                warn!(?candidates, "close_app without target, attempting repair");
                if let [only] = candidates.as_slice() {
                    info!(target = %only, "auto-repaired close_app target");
                    repaired.push(action.with_target(only.clone()).into());
                } else {
                    return Err(PlanError::NeedsClarification { candidates });
                }
            }
            _ => repaired.push(action.into()),
        }
    }

    Ok(repaired)
}

fn is_save_shortcut(item: &PlanItem) -> bool {
    item.is(ActionType::TypeText)
        && item
            .action()
            .and_then(|a| a.text())
            .is_some_and(|text| text.contains(SAVE_SHORTCUT))
}

fn is_filename_step(item: &PlanItem) -> bool {
    item.is(ActionType::TypeText)
        && item
            .action()
            .and_then(|a| a.text())
            .is_some_and(|text| FILENAME_MARKERS.iter().any(|m| text.contains(m)))
}

/// Filename named in the instruction, or [`DEFAULT_FILENAME`].
pub fn extract_filename(instruction: &str) -> String {
    let Some(found) = FILENAME.captures(instruction).and_then(|c| c.get(1)) else {
        warn!("could not extract filename from instruction, using {DEFAULT_FILENAME}");
        return DEFAULT_FILENAME.to_string();
    };

    let name = found.as_str();
    if instruction.to_lowercase().contains("desktop") && !name.contains('\\') {
        format!("%USERPROFILE%\\Desktop\\{name}")
    } else {
        name.to_string()
    }
}

/// Complete save shortcuts that are missing their filename steps.
///
/// Without "save" in the instruction a shortcut is a hallucination and is
/// dropped. Otherwise a shortcut with no filename typed within the next
/// three items gets `wait(1.0)`, the filename and `{ENTER}` injected right
/// after it.
pub fn repair_save_sequence(plan: Plan, instruction: &str) -> Plan {
    if !plan.iter().any(is_save_shortcut) {
        return plan;
    }

    if !instruction.to_lowercase().contains("save") {
        warn!("plan contains save shortcut but instruction lacks 'save', dropping it");
        return plan.into_iter().filter(|item| !is_save_shortcut(item)).collect();
    }

    let mut repaired = Vec::with_capacity(plan.len() + 3);
    for (idx, item) in plan.iter().enumerate() {
        repaired.push(item.clone());
        if !is_save_shortcut(item) {
            continue;
        }
        let has_filename = plan[idx + 1..]
            .iter()
            .take(FILENAME_LOOKAHEAD)
            .any(is_filename_step);
        if has_filename {
            continue;
        }

        let filename = extract_filename(instruction);
        info!(step = idx + 1, %filename, "injecting [wait, filename, enter] after save shortcut");
        repaired.push(Action::wait(1.0).into());
        repaired.push(Action::keystrokes(filename).into());
        repaired.push(Action::keystrokes("{ENTER}").into());
    }
    repaired
}

/// Put a 2 second wait between typing and an immediately following close.
pub fn buffer_destructive_sequences(plan: Plan) -> Plan {
    let mut buffered = Vec::with_capacity(plan.len());
    let mut items = plan.into_iter().peekable();

    while let Some(item) = items.next() {
        let needs_buffer = item.is(ActionType::TypeText)
            && items.peek().is_some_and(|next| next.is(ActionType::CloseApp));
        buffered.push(item);
        if needs_buffer {
            info!("close_app right after type_text, injecting safety wait");
            buffered.push(Action::wait(2.0).into());
        }
    }
    buffered
}

/// Stable partition: every `close_app` moves behind all other items.
pub fn move_closes_last(plan: Plan) -> Plan {
    let (closes, mut rest): (Plan, Plan) =
        plan.into_iter().partition(|item| item.is(ActionType::CloseApp));
    rest.extend(closes);
    rest
}

/// Terminal check: an unresolved close is never emitted.
pub fn ensure_close_targets(plan: Plan) -> PlanResult<Plan> {
    let unresolved = plan
        .iter()
        .any(|item| item.is(ActionType::CloseApp) && item.target().is_none());
    if unresolved {
        return Err(PlanError::AmbiguousInstruction(
            "'close_app' action has no target and could not be repaired".into(),
        ));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Context;
    use pretty_assertions::assert_eq;

    fn launch(target: &str) -> PlanItem {
        Action::launch(Context::Desktop, target).unwrap().into()
    }

    fn close(target: Option<&str>) -> PlanItem {
        Action::new(ActionType::CloseApp, Context::Desktop, target.map(String::from), None)
            .unwrap()
            .into()
    }

    fn keys(text: &str) -> PlanItem {
        Action::keystrokes(text).into()
    }

    fn texts(plan: &Plan) -> Vec<String> {
        plan.iter()
            .map(|item| {
                let action = item.action().unwrap();
                format!(
                    "{}:{}",
                    action.action_type(),
                    action.text().or(action.target()).unwrap_or("-")
                )
            })
            .collect()
    }

    #[test]
    fn single_candidate_fills_close_target() {
        let plan = infer_close_targets(vec![launch("notepad.exe"), close(None)]).unwrap();
        assert_eq!(plan[1].target(), Some("notepad.exe"));
    }

    #[test]
    fn ambiguous_close_asks_for_clarification() {
        let err = infer_close_targets(vec![launch("notepad.exe"), launch("calc.exe"), close(None)])
            .unwrap_err();
        match err {
            PlanError::NeedsClarification { candidates } => {
                assert_eq!(candidates, vec!["notepad.exe", "calc.exe"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = infer_close_targets(vec![close(None)]).unwrap_err();
        assert!(matches!(err, PlanError::NeedsClarification { candidates } if candidates.is_empty()));
    }

    #[test]
    fn save_without_filename_gets_completed() {
        let plan = vec![launch("notepad.exe"), keys("hello"), keys("^s")];
        let repaired = repair_save_sequence(plan, "open notepad, type hello and save as notes.txt");
        assert_eq!(
            texts(&repaired),
            vec![
                "launch_app:notepad.exe",
                "type_text:hello",
                "type_text:^s",
                "wait:1.0",
                "type_text:notes.txt",
                "type_text:{ENTER}",
            ]
        );
    }

    #[test]
    fn save_with_filename_is_left_alone() {
        let plan = vec![keys("^s"), keys("^a{BACKSPACE}"), keys("report.md"), keys("{ENTER}")];
        let repaired = repair_save_sequence(plan.clone(), "save it as report.md");
        assert_eq!(repaired, plan);
    }

    #[test]
    fn unrequested_save_is_dropped() {
        let repaired = repair_save_sequence(vec![keys("hello"), keys("^s")], "type hello");
        assert_eq!(texts(&repaired), vec!["type_text:hello"]);
    }

    #[test]
    fn filename_extraction() {
        assert_eq!(extract_filename("save as draft_v2.md please"), "draft_v2.md");
        assert_eq!(
            extract_filename("save to desktop as todo.txt"),
            "%USERPROFILE%\\Desktop\\todo.txt"
        );
        assert_eq!(extract_filename("just save it"), DEFAULT_FILENAME);
    }

    #[test]
    fn buffers_typing_before_close() {
        let plan = buffer_destructive_sequences(vec![keys("hello"), close(Some("notepad.exe"))]);
        assert_eq!(
            texts(&plan),
            vec!["type_text:hello", "wait:2.0", "close_app:notepad.exe"]
        );
    }

    #[test]
    fn closes_move_to_the_end_in_order() {
        let plan = move_closes_last(vec![
            close(Some("a.exe")),
            launch("b.exe"),
            close(Some("c.exe")),
            keys("x"),
        ]);
        assert_eq!(
            texts(&plan),
            vec!["launch_app:b.exe", "type_text:x", "close_app:a.exe", "close_app:c.exe"]
        );
    }

    #[test]
    fn full_pipeline_orders_save_before_close() {
        let plan = vec![launch("notepad.exe"), keys("hello"), close(None), keys("^s")];
        let repaired = repair_plan(plan, "open notepad, type hello, save as a.txt, close").unwrap();
        assert_eq!(
            texts(&repaired),
            vec![
                "launch_app:notepad.exe",
                "type_text:hello",
                "wait:2.0",
                "type_text:^s",
                "wait:1.0",
                "type_text:a.txt",
                "type_text:{ENTER}",
                "close_app:notepad.exe",
            ]
        );
    }

    #[test]
    fn final_guard_rejects_unresolved_close() {
        assert!(matches!(
            ensure_close_targets(vec![close(None)]),
            Err(PlanError::AmbiguousInstruction(_))
        ));
    }
}
