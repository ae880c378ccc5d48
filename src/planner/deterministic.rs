// src/planner/deterministic.rs

use crate::error::{PlanError, PlanResult};
use crate::planner::PlanGenerator;
use crate::repair::SAVE_SHORTCUT;
use crate::schema::{Action, ActionType, Context, Observation, ObservationResult, Plan};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

const NOTEPAD: &str = "notepad.exe";

pub const SUPPORTED_PATTERNS: &str = "'read file <path>', 'create file <path> with text <text>', \
     'open notepad and type <text>', 'type <text>', 'open notepad', 'focus <window>', \
     'close <app>', 'save', 'wait <n> seconds'";

static FILE_CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:create|make|write|generate|new)\s+(?:a\s+)?(?:new\s+)?file\s+(?:named\s+|called\s+)?["']?([^\s"']+)["']?\s+with\s+(?:the\s+)?(?:text|content)\s+(.+)$"#,
    )
    .unwrap()
});

static WAIT_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(?:second|sec|s)").unwrap());

/// Fixed phrasings matched in order; the first hit wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPlanner;

impl DeterministicPlanner {
    pub fn parse_instruction(&self, instruction: &str) -> PlanResult<Plan> {
        let trimmed = instruction.trim();
        let lower = trimmed.to_ascii_lowercase();

        for phrase in ["read text from file", "read file"] {
            if let Some(idx) = lower.find(phrase) {
                let path = unquote(&trimmed[idx + phrase.len()..]);
                if path.is_empty() {
                    return Err(PlanError::AmbiguousInstruction(
                        "could not extract filename from read instruction".into(),
                    ));
                }
                info!(path, "parsed file read");
                return Ok(vec![Observation::read_file(path).map_err(invalid)?.into()]);
            }
        }

        if let Some(caps) = FILE_CREATE.captures(trimmed) {
            let (path, text) = (&caps[1], unquote(&caps[2]));
            if !text.is_empty() {
                info!(path, "parsed file creation");
                return Ok(vec![
                    Action::type_text(Context::File, Some(path.to_string()), text)
                        .map_err(invalid)?
                        .into(),
                ]);
            }
        }

        if lower.contains("notepad") {
            if let Some(idx) = lower.find(" type ") {
                let text = unquote(&trimmed[idx + " type ".len()..]);
                if !text.is_empty() {
                    info!(text, "parsed open notepad and type");
                    return Ok(vec![
                        Action::launch(Context::Desktop, NOTEPAD).map_err(invalid)?.into(),
                        Action::keystrokes(text).into(),
                    ]);
                }
            }
        }

        if lower.starts_with("type ") {
            let text = unquote(&trimmed["type ".len()..]);
            if !text.is_empty() {
                info!(text, "parsed type");
                return Ok(vec![Action::keystrokes(text).into()]);
            }
        }

        let opens = lower.contains("open") || lower.contains("launch") || lower == "notepad";
        if lower.contains("notepad") && opens && !lower.contains("type") {
            info!("parsed open notepad");
            return Ok(vec![Action::launch(Context::Desktop, NOTEPAD).map_err(invalid)?.into()]);
        }

        for phrase in ["focus", "switch to"] {
            if let Some(idx) = lower.find(phrase) {
                let window = trimmed[idx + phrase.len()..].trim();
                if !window.is_empty() {
                    info!(window, "parsed focus window");
                    return Ok(vec![
                        Action::new(ActionType::FocusWindow, Context::Desktop, Some(window.into()), None)
                            .map_err(invalid)?
                            .into(),
                    ]);
                }
                break;
            }
        }

        if lower.contains("close") || lower.contains("exit") {
            info!(target = NOTEPAD, "parsed close app");
            return Ok(vec![
                Action::new(ActionType::CloseApp, Context::Desktop, Some(NOTEPAD.into()), None)
                    .map_err(invalid)?
                    .into(),
            ]);
        }

        if lower.contains("save") {
            info!("parsed save shortcut");
            return Ok(vec![Action::keystrokes(SAVE_SHORTCUT).into()]);
        }

        if lower.contains("wait") {
            // The matched duration is passed through as written.
            if let Some(seconds) = WAIT_SECONDS
                .captures(&lower)
                .map(|caps| caps[1].to_string())
                .filter(|text| text.parse::<f64>().is_ok())
            {
                info!(%seconds, "parsed wait");
                return Ok(vec![
                    Action::new(ActionType::Wait, Context::Desktop, Some(seconds), None)
                        .map_err(invalid)?
                        .into(),
                ]);
            }
        }

        error!(instruction, "unsupported instruction for deterministic planner");
        Err(PlanError::AmbiguousInstruction(format!(
            "unsupported instruction '{instruction}'; supported: {SUPPORTED_PATTERNS}"
        )))
    }
}

impl PlanGenerator for DeterministicPlanner {
    fn name(&self) -> &str {
        "deterministic"
    }

    fn generate(&self, instruction: &str, _prior: &[ObservationResult]) -> PlanResult<Plan> {
        self.parse_instruction(instruction)
    }
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

fn invalid(source: crate::schema::SchemaError) -> PlanError {
    PlanError::SchemaViolation {
        position: 1,
        item: "<deterministic>".into(),
        source,
    }
}
