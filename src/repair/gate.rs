// src/repair/gate.rs

//! Action-intent gate: drops causal actions the instruction never asked for.

use crate::schema::{Action, ActionType, Context, Plan, PlanItem};
use crate::validation::plan::has_file_create_intent;
use tracing::{debug, warn};

/// Words that ground each causal action type in the instruction text.
fn grounding_keywords(action_type: ActionType) -> &'static [&'static str] {
    match action_type {
        ActionType::LaunchApp => &["open", "launch", "start", "run", "navigate", "go to"],
        ActionType::CloseApp => &["close", "exit", "quit", "terminate"],
        ActionType::TypeText => &["type", "write", "enter", "input", "save", "press"],
        ActionType::ClickControl => &["click", "press", "save", "select", "check", "uncheck"],
        ActionType::Wait | ActionType::FocusWindow => &[],
    }
}

pub fn is_grounded(action_type: ActionType, instruction: &str) -> bool {
    if !action_type.is_causal() {
        return true;
    }
    let lower = instruction.to_lowercase();
    grounding_keywords(action_type)
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// File-creation wording ("create file x with text y") grounds the single
/// file write even though it names no typing verb.
fn is_requested(action: &Action, instruction: &str) -> bool {
    let file_write = action.action_type() == ActionType::TypeText && action.context() == Context::File;
    (file_write && has_file_create_intent(instruction)) || is_grounded(action.action_type(), instruction)
}

/// Filter, not validator: ungrounded actions are dropped silently and
/// observations always pass.
pub fn filter_hallucinations(plan: Plan, instruction: &str) -> Plan {
    let before = plan.len();
    let kept: Plan = plan
        .into_iter()
        .filter(|item| match item {
            PlanItem::Observation(_) => true,
            PlanItem::Action(action) => {
                let grounded = is_requested(action, instruction);
                if !grounded {
                    warn!(
                        action = %action.action_type(),
                        instruction,
                        "hallucination detected: action not requested, dropping"
                    );
                }
                grounded
            }
        })
        .collect();
    debug!(kept = kept.len(), dropped = before - kept.len(), "action-intent gate passed");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Observation;

    #[test]
    fn drops_ungrounded_typing() {
        let plan = vec![
            Action::launch(Context::Desktop, "notepad.exe").unwrap().into(),
            Action::keystrokes("hello world").into(),
        ];
        let filtered = filter_hallucinations(plan, "open notepad");
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].is(ActionType::LaunchApp));
    }

    #[test]
    fn helpers_and_observations_always_pass() {
        let plan = vec![
            Action::wait(1.0).into(),
            Action::new(ActionType::FocusWindow, Context::Desktop, Some("Notepad".into()), None)
                .unwrap()
                .into(),
            Observation::new(crate::schema::ObservationType::ReadText, Context::Web, "h1")
                .unwrap()
                .into(),
        ];
        assert_eq!(filter_hallucinations(plan, "look around").len(), 3);
    }

    #[test]
    fn file_creation_wording_grounds_file_write() {
        let write = || -> PlanItem {
            Action::type_text(Context::File, Some("notes.txt".into()), "hello")
                .unwrap()
                .into()
        };
        for instruction in [
            "create file notes.txt with text hello",
            "new file notes.txt with text hello",
            "make file notes.txt",
            "generate file notes.txt",
        ] {
            assert_eq!(filter_hallucinations(vec![write()], instruction).len(), 1, "{instruction}");
        }

        // Desktop typing still needs a typing verb.
        let plan = vec![Action::keystrokes("hello").into()];
        assert!(filter_hallucinations(plan, "create file notes.txt with text hello").is_empty());
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert!(is_grounded(ActionType::CloseApp, "Please EXIT the editor"));
        assert!(is_grounded(ActionType::LaunchApp, "Go To example.com"));
        assert!(!is_grounded(ActionType::ClickControl, "open notepad"));
    }
}
