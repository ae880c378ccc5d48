// src/validation/plan.rs

use crate::error::PlanError;
use crate::schema::{ActionType, Context, Plan, PlanItem};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

pub const FILE_CREATE_KEYWORDS: [&str; 7] = [
    "create file",
    "write file",
    "save file",
    "new file",
    "file with text",
    "make file",
    "generate file",
];

pub const FILE_READ_KEYWORDS: [&str; 2] = ["read file", "read text from"];

const MAX_IDENTICAL_ACTIONS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanValidationError {
    #[error("plan is empty")]
    Empty,

    #[error("plan has {count} items (max: {max})")]
    TooManyItems { count: usize, max: usize },

    #[error("suspicious repetition: {count} identical actions '{signature}'")]
    Repetition { signature: String, count: usize },

    #[error("file intent cannot generate {contexts} actions")]
    FileIntentContext { contexts: String },

    #[error("file read intent must generate only observations, got {0} action(s)")]
    ReadIntentHasActions(usize),

    #[error("file read intent must generate at least one file observation")]
    ReadIntentNoObservation,

    #[error("file read plans must be observation-only, got {0} file action(s)")]
    FileReadWithActions(usize),

    #[error("file creation must be a single type_text action, got {0} file action(s)")]
    FileCreateNotAtomic(usize),

    #[error("file creation requires a type_text action, got {0}")]
    FileCreateWrongType(ActionType),
}

impl From<PlanValidationError> for PlanError {
    fn from(err: PlanValidationError) -> Self {
        match err {
            PlanValidationError::Empty => {
                PlanError::AmbiguousInstruction("no usable items left in plan".into())
            }
            PlanValidationError::TooManyItems { .. } => PlanError::TooComplex(err.to_string()),
            other => PlanError::CoherenceViolation(other.to_string()),
        }
    }
}

pub fn has_file_create_intent(instruction: &str) -> bool {
    let lower = instruction.to_lowercase();
    FILE_CREATE_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn has_file_read_intent(instruction: &str) -> bool {
    let lower = instruction.to_lowercase();
    FILE_READ_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn file_actions(plan: &[PlanItem]) -> Vec<&PlanItem> {
    plan.iter()
        .filter(|item| item.is_action() && item.context() == Context::File)
        .collect()
}

pub fn check_not_empty(plan: &[PlanItem]) -> Result<(), PlanValidationError> {
    if plan.is_empty() {
        return Err(PlanValidationError::Empty);
    }
    Ok(())
}

pub fn check_item_count(plan: &[PlanItem], max: usize) -> Result<(), PlanValidationError> {
    if plan.len() > max {
        return Err(PlanValidationError::TooManyItems {
            count: plan.len(),
            max,
        });
    }
    Ok(())
}

/// File-creation wording pins every Action to the file context; file-read
/// wording demands an observation-only plan.
pub fn check_intent_priority(plan: &[PlanItem], instruction: &str) -> Result<(), PlanValidationError> {
    if has_file_create_intent(instruction) {
        let mut foreign: Vec<&str> = plan
            .iter()
            .filter(|item| item.is_action() && item.context() != Context::File)
            .map(|item| item.context().as_str())
            .collect();
        foreign.sort_unstable();
        foreign.dedup();
        if !foreign.is_empty() {
            return Err(PlanValidationError::FileIntentContext {
                contexts: foreign.join(", "),
            });
        }
        info!("intent priority validated: file intent matched");
    }

    if has_file_read_intent(instruction) {
        let actions = plan.iter().filter(|item| item.is_action()).count();
        if actions > 0 {
            return Err(PlanValidationError::ReadIntentHasActions(actions));
        }
        let reads_file = plan
            .iter()
            .any(|item| item.is_observation() && item.context() == Context::File);
        if !reads_file {
            return Err(PlanValidationError::ReadIntentNoObservation);
        }
        info!("intent priority validated: file read intent matched");
    }

    Ok(())
}

/// One file `type_text` plus file `launch_app`s is a read-then-write
/// workflow; the launches are dropped so creation stays atomic.
pub fn normalize_file_plan(plan: Plan) -> Plan {
    let file_actions = file_actions(&plan);
    let writes = file_actions.iter().filter(|i| i.is(ActionType::TypeText)).count();
    let launches = file_actions.iter().filter(|i| i.is(ActionType::LaunchApp)).count();

    if writes != 1 || launches == 0 {
        return plan;
    }

    info!(launches, "normalizing file plan to atomic creation");
    plan.into_iter()
        .filter(|item| !(item.is(ActionType::LaunchApp) && item.context() == Context::File))
        .collect()
}

pub fn check_coherence(plan: &[PlanItem], instruction: &str) -> Result<(), PlanValidationError> {
    check_not_empty(plan)?;

    let actions: Vec<_> = plan.iter().filter_map(PlanItem::action).collect();
    if actions.is_empty() {
        info!("observation-only plan");
        return Ok(());
    }

    let lower = instruction.to_lowercase();
    if (lower.contains("twice") || lower.contains("2 times")) && actions.len() < 2 {
        warn!(actions = actions.len(), "instruction asks for repetition but plan has < 2 actions");
    }

    let has_launch = actions.iter().any(|a| a.action_type() == ActionType::LaunchApp);
    let has_type = actions.iter().any(|a| a.action_type() == ActionType::TypeText);
    if has_type && !has_launch {
        warn!("plan types text without launching an app, assuming one is open");
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for action in &actions {
        let signature = format!(
            "{}:{}:{}",
            action.action_type(),
            action.target().unwrap_or("None"),
            action.text().unwrap_or("None")
        );
        *counts.entry(signature).or_default() += 1;
    }
    if let Some((signature, count)) = counts
        .into_iter()
        .filter(|(_, count)| *count > MAX_IDENTICAL_ACTIONS)
        .max_by_key(|(_, count)| *count)
    {
        return Err(PlanValidationError::Repetition { signature, count });
    }

    Ok(())
}

/// File reads carry no file actions; file creation is exactly one
/// `type_text`.
pub fn check_file_minimality(plan: &[PlanItem]) -> Result<(), PlanValidationError> {
    let file_actions = file_actions(plan);
    let reads_file = plan
        .iter()
        .any(|item| item.is_observation() && item.context() == Context::File);

    if reads_file {
        if !file_actions.is_empty() {
            return Err(PlanValidationError::FileReadWithActions(file_actions.len()));
        }
        return Ok(());
    }

    let creates = file_actions.iter().any(|i| i.is(ActionType::TypeText));
    if !creates {
        return Ok(());
    }
    match file_actions.as_slice() {
        [only] if only.is(ActionType::TypeText) => Ok(()),
        [only] => Err(PlanValidationError::FileCreateWrongType(
            only.action().map_or(ActionType::TypeText, |a| a.action_type()),
        )),
        many => Err(PlanValidationError::FileCreateNotAtomic(many.len())),
    }
}

/// Full suite for a repaired model-backed plan, in pipeline order.
pub fn validate_plan(plan: Plan, instruction: &str, max_items: usize) -> Result<Plan, PlanValidationError> {
    check_not_empty(&plan)?;
    check_item_count(&plan, max_items)?;
    check_intent_priority(&plan, instruction)?;
    let plan = normalize_file_plan(plan);
    check_coherence(&plan, instruction)?;
    check_file_minimality(&plan)?;
    info!(items = plan.len(), "plan validated");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Action, Observation};
    use pretty_assertions::assert_eq;

    fn file_write(target: &str, text: &str) -> PlanItem {
        Action::type_text(Context::File, Some(target.into()), text).unwrap().into()
    }

    fn file_launch(target: &str) -> PlanItem {
        Action::launch(Context::File, target).unwrap().into()
    }

    fn notepad() -> PlanItem {
        Action::launch(Context::Desktop, "notepad.exe").unwrap().into()
    }

    #[test]
    fn count_bound_maps_to_too_complex() {
        let plan: Plan = (0..4).map(|_| Action::wait(1.0).into()).collect();
        let err = check_item_count(&plan, 3).unwrap_err();
        assert_eq!(err, PlanValidationError::TooManyItems { count: 4, max: 3 });
        assert!(matches!(PlanError::from(err), PlanError::TooComplex(_)));
        assert!(check_item_count(&plan, 4).is_ok());
    }

    #[test]
    fn file_intent_rejects_desktop_actions() {
        let plan = vec![notepad(), file_write("a.txt", "hi")];
        let err = check_intent_priority(&plan, "create file a.txt with text hi").unwrap_err();
        assert_eq!(
            err,
            PlanValidationError::FileIntentContext {
                contexts: "desktop".into()
            }
        );
    }

    #[test]
    fn read_intent_needs_observation_only() {
        let read = vec![PlanItem::from(Observation::read_file("a.txt").unwrap())];
        assert!(check_intent_priority(&read, "read file a.txt").is_ok());

        let err = check_intent_priority(&[notepad()], "read file a.txt").unwrap_err();
        assert_eq!(err, PlanValidationError::ReadIntentHasActions(1));

        let err = check_intent_priority(&[], "read text from a.txt").unwrap_err();
        assert_eq!(err, PlanValidationError::ReadIntentNoObservation);
    }

    #[test]
    fn normalization_drops_file_launches() {
        let plan = vec![file_launch("a.txt"), file_write("a.txt", "hi"), notepad()];
        let normalized = normalize_file_plan(plan);
        assert_eq!(normalized, vec![file_write("a.txt", "hi"), notepad()]);

        // Two writes are left for minimality to reject.
        let plan = vec![file_launch("a.txt"), file_write("a.txt", "x"), file_write("b.txt", "y")];
        assert_eq!(normalize_file_plan(plan.clone()), plan);
    }

    #[test]
    fn repetition_over_three_fails() {
        let plan: Plan = (0..4).map(|_| Action::keystrokes("a").into()).collect();
        let err = check_coherence(&plan, "type a four times").unwrap_err();
        assert_eq!(
            err,
            PlanValidationError::Repetition {
                signature: "type_text:None:a".into(),
                count: 4
            }
        );

        let plan: Plan = (0..3).map(|_| Action::keystrokes("a").into()).collect();
        assert!(check_coherence(&plan, "type a three times").is_ok());
    }

    #[test]
    fn coherence_allows_observation_only_and_rejects_empty() {
        let read = vec![PlanItem::from(Observation::read_file("a.txt").unwrap())];
        assert!(check_coherence(&read, "read it").is_ok());
        assert_eq!(check_coherence(&[], "x"), Err(PlanValidationError::Empty));
    }

    #[test]
    fn minimality_rules() {
        assert!(check_file_minimality(&[file_write("a.txt", "hi")]).is_ok());
        assert_eq!(
            check_file_minimality(&[file_write("a.txt", "x"), file_write("b.txt", "y")]),
            Err(PlanValidationError::FileCreateNotAtomic(2))
        );

        let mixed = vec![
            PlanItem::from(Observation::read_file("a.txt").unwrap()),
            file_launch("b.txt"),
        ];
        assert_eq!(
            check_file_minimality(&mixed),
            Err(PlanValidationError::FileReadWithActions(1))
        );

        // Launch-only file plans are not creations.
        assert!(check_file_minimality(&[file_launch("a.txt")]).is_ok());
    }

    #[test]
    fn full_suite_normalizes_read_then_write() {
        let plan = vec![file_launch("notes.txt"), file_write("notes.txt", "hello")];
        let validated = validate_plan(plan, "create file notes.txt with text hello", 15).unwrap();
        assert_eq!(validated, vec![file_write("notes.txt", "hello")]);
    }
}
