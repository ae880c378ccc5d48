// src/planner/router.rs

//! High-priority intents that are answered without any generator.

use crate::error::{PlanError, PlanResult};
use crate::schema::{Action, Context, Observation, Plan, Verify};
use crate::workspace::{PathValidator, WorkspaceViolation};
use thiserror::Error;
use tracing::{info, warn};

const MARKET_KEYWORDS: [&str; 7] = [
    "analyze",
    "analysis",
    "technical",
    "support",
    "resistance",
    "trend",
    "tradingview",
];
const TRADING_KEYWORDS: [&str; 5] = ["buy", "sell", "trade", "execute", "order"];
const ACTION_KEYWORDS: [&str; 5] = ["draw", "mark", "click", "type", "open browser"];

const FILE_READ_PHRASES: [&str; 5] = [
    "read file",
    "read text from",
    "show contents of",
    "open file",
    "read the file",
];

/// Longer phrases first so "verify that x" does not leave "that" behind.
const VERIFY_PHRASES: [&str; 5] = [
    "verify_text_visible",
    "verify that",
    "check that",
    "confirm that",
    "verify",
];
const FILLER_WORDS: [&str; 2] = ["that", "the"];

const UNSAFE_KEYWORDS: [&str; 4] = ["delete system", "format drive", "regedit", "registry"];
const CONTRADICTIONS: [(&str, &str); 2] = [("open", "close"), ("type", "delete")];

pub const MIN_INSTRUCTION_CHARS: usize = 3;
pub const MAX_INSTRUCTION_CHARS: usize = 500;

const DEFAULT_DESKTOP_TARGET: &str = "notepad.exe";
const DEFAULT_WEB_TARGET: &str = "https://example.com";

/// Why an instruction was refused. Surfaced to callers as an empty plan.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Rejection {
    #[error("market analysis request is out of domain for the planner")]
    OutOfDomain,

    #[error(transparent)]
    Workspace(#[from] WorkspaceViolation),

    #[error("unsafe instruction: contains '{0}'")]
    Unsafe(&'static str),
}

#[derive(Debug, PartialEq)]
pub enum Route {
    /// Plan built directly from the instruction; generators are skipped.
    Direct(Plan),
    Rejected(Rejection),
    /// Nothing matched, hand the instruction to a generator.
    Generate,
}

pub fn route(instruction: &str, workspace: &dyn PathValidator) -> Route {
    let lower = instruction.trim().to_ascii_lowercase();

    if is_out_of_domain(&lower) {
        warn!(instruction, "market analysis intent reached planner");
        return Route::Rejected(Rejection::OutOfDomain);
    }

    if mentions_any(&lower, &FILE_READ_PHRASES) {
        match file_read_target(instruction) {
            Some(target) => {
                info!(%target, "file read intent, generator bypassed");
                if let Err(violation) = workspace.validate(&target) {
                    return Route::Rejected(violation.into());
                }
                return match Observation::read_file(target) {
                    Ok(observation) => Route::Direct(vec![observation.into()]),
                    Err(err) => {
                        warn!(%err, "file read target unusable, falling through");
                        Route::Generate
                    }
                };
            }
            None => warn!("file read intent detected but no filename found"),
        }
    }

    if mentions_any(&lower, &VERIFY_PHRASES) {
        match verification_action(instruction) {
            Some(action) => {
                info!(verify = ?action.verify(), "verification intent, generator bypassed");
                return Route::Direct(vec![action.into()]);
            }
            None => warn!("verification intent detected but no text to verify"),
        }
    }

    Route::Generate
}

fn mentions_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

fn is_out_of_domain(lower: &str) -> bool {
    mentions_any(lower, &MARKET_KEYWORDS)
        && !mentions_any(lower, &TRADING_KEYWORDS)
        && !mentions_any(lower, &ACTION_KEYWORDS)
}

/// Text after the first occurrence of `phrase`, matched case-insensitively
/// but returned in the caller's casing.
fn after<'a>(instruction: &'a str, phrase: &str) -> Option<&'a str> {
    let idx = instruction.to_ascii_lowercase().find(phrase)?;
    Some(instruction[idx + phrase.len()..].trim())
}

fn strip_leading_word<'a>(text: &'a str, word: &str) -> &'a str {
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) if first.eq_ignore_ascii_case(word) => rest.trim_start(),
        None if text.eq_ignore_ascii_case(word) => "",
        _ => text,
    }
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Path named by a file-read instruction. Falls back to the last word.
pub fn file_read_target(instruction: &str) -> Option<String> {
    let lower = instruction.to_ascii_lowercase();

    let extracted = if lower.contains("read file") {
        after(instruction, "read file").map(String::from)
    } else if lower.contains("read text from") {
        after(instruction, "read text from").map(|rest| strip_leading_word(rest, "file").to_string())
    } else if lower.contains("show contents of") {
        after(instruction, "show contents of").map(|rest| strip_leading_word(rest, "file").to_string())
    } else if lower.contains("open file") && lower.contains("read") {
        after(instruction, "open file").map(|rest| {
            rest.split_whitespace()
                .take_while(|w| !w.eq_ignore_ascii_case("and"))
                .collect::<Vec<_>>()
                .join(" ")
        })
    } else {
        None
    };

    extracted
        .map(|name| unquote(&name).to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| instruction.split_whitespace().last().map(|w| unquote(w).to_string()))
        .filter(|name| !name.is_empty())
}

/// Single launch action carrying a `text_visible` check.
pub fn verification_action(instruction: &str) -> Option<Action> {
    let lower = instruction.to_ascii_lowercase();

    let phrase = VERIFY_PHRASES.iter().find(|p| lower.contains(*p))?;
    let text = after(instruction, phrase)?
        .split_whitespace()
        .filter(|w| !FILLER_WORDS.iter().any(|f| w.eq_ignore_ascii_case(f)))
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }

    let (context, target) = if lower.contains("notepad") {
        (Context::Desktop, DEFAULT_DESKTOP_TARGET.to_string())
    } else if mentions_any(&lower, &["browser", "http", "www"]) {
        let url = instruction
            .split_whitespace()
            .find(|w| [".com", ".org", "http", "www"].iter().any(|m| w.contains(m)))
            .unwrap_or(DEFAULT_WEB_TARGET);
        (Context::Web, url.to_string())
    } else {
        (Context::Desktop, DEFAULT_DESKTOP_TARGET.to_string())
    };

    Action::launch(context, target)
        .ok()
        .map(|action| action.with_verify(Verify::text_visible(text)))
}

/// Checks applied before a generator runs.
///
/// Unsafe wording is a policy rejection; length problems are errors.
pub fn prevalidate(instruction: &str) -> PlanResult<Route> {
    let trimmed = instruction.trim();
    if trimmed.chars().count() < MIN_INSTRUCTION_CHARS {
        return Err(PlanError::AmbiguousInstruction(
            "instruction too short, please provide a clear task description".into(),
        ));
    }
    if instruction.chars().count() > MAX_INSTRUCTION_CHARS {
        return Err(PlanError::TooComplex(format!(
            "instruction too long (max {MAX_INSTRUCTION_CHARS} characters), please simplify"
        )));
    }

    let lower = trimmed.to_lowercase();
    for (first, second) in CONTRADICTIONS {
        if lower.contains(first) && lower.contains(second) {
            warn!(first, second, "potentially contradictory instruction");
        }
    }

    if let Some(keyword) = UNSAFE_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        return Ok(Route::Rejected(Rejection::Unsafe(*keyword)));
    }

    Ok(Route::Generate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ActionType, PlanItem};
    use crate::workspace::Workspace;
    use pretty_assertions::assert_eq;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        (dir, ws)
    }

    #[test]
    fn market_analysis_is_rejected() {
        let (_dir, ws) = workspace();
        assert_eq!(
            route("analyze the EURUSD trend", &ws),
            Route::Rejected(Rejection::OutOfDomain)
        );
        // Trading or action words keep it in play.
        assert_eq!(route("analyze the chart then buy", &ws), Route::Generate);
        assert_eq!(route("draw support lines", &ws), Route::Generate);
    }

    #[test]
    fn file_read_builds_single_observation() {
        let (_dir, ws) = workspace();
        let Route::Direct(plan) = route("Read file Notes.txt", &ws) else {
            panic!("expected direct plan");
        };
        assert_eq!(plan, vec![PlanItem::from(Observation::read_file("Notes.txt").unwrap())]);
    }

    #[test]
    fn file_read_escape_is_rejected() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            route("read file ../../etc/passwd", &ws),
            Route::Rejected(Rejection::Workspace(_))
        ));
    }

    #[test]
    fn file_read_target_variants() {
        assert_eq!(file_read_target("read text from file a.txt").as_deref(), Some("a.txt"));
        assert_eq!(file_read_target("read text from myfile.txt").as_deref(), Some("myfile.txt"));
        assert_eq!(file_read_target("show contents of 'b.md'").as_deref(), Some("b.md"));
        assert_eq!(
            file_read_target("open file sandwich.txt and read it").as_deref(),
            Some("sandwich.txt")
        );
        assert_eq!(file_read_target("please read the file todo.txt").as_deref(), Some("todo.txt"));
    }

    #[test]
    fn verification_defaults_to_notepad() {
        let action = verification_action("Verify that the Hello World is visible").unwrap();
        assert_eq!(action.action_type(), ActionType::LaunchApp);
        assert_eq!(action.context(), Context::Desktop);
        assert_eq!(action.target(), Some("notepad.exe"));
        assert_eq!(
            action.verify(),
            Some(&Verify::text_visible("Hello World is visible"))
        );
    }

    #[test]
    fn verification_in_browser_picks_url() {
        let action = verification_action("open browser at www.example.org and confirm that Welcome shows").unwrap();
        assert_eq!(action.context(), Context::Web);
        assert_eq!(action.target(), Some("www.example.org"));
        assert_eq!(action.verify().unwrap().value.as_deref(), Some("Welcome shows"));

        let action = verification_action("check that Login appears in the browser").unwrap();
        assert_eq!(action.target(), Some(DEFAULT_WEB_TARGET));
    }

    #[test]
    fn verification_without_text_falls_through() {
        let (_dir, ws) = workspace();
        assert_eq!(route("verify", &ws), Route::Generate);
    }

    #[test]
    fn prevalidation() {
        assert!(matches!(prevalidate("hi"), Err(PlanError::AmbiguousInstruction(_))));
        assert!(matches!(prevalidate(&"a".repeat(501)), Err(PlanError::TooComplex(_))));
        assert_eq!(
            prevalidate("open regedit and clean it").unwrap(),
            Route::Rejected(Rejection::Unsafe("regedit"))
        );
        assert_eq!(prevalidate("open notepad and close it").unwrap(), Route::Generate);
    }
}
