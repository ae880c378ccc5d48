// src/decompose/mod.rs

//! Complexity-driven splitting of instructions before planning.
//!
//! Separators are matched on the raw text with no notion of quoting, so a
//! typed string or filename containing "and" or a comma is split as well.
//! This is a known limitation and is kept as-is.

pub mod segment;

use crate::error::{PlanError, PlanResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

pub use segment::segment;

const VERBS: [&str; 12] = [
    "open ", "launch ", "start ", "run ", "close ", "exit ", "quit ", "wait ", "focus ",
    "switch to ", "verify ", "check ",
];

static STRONG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i);\s*|\s+,?\s*then\s+|\s+and\s+then\s+").unwrap());

static WEAK_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i),|\s+and\s+").unwrap());

/// Rough count of the actions an instruction will need.
///
/// Never 0 for non-blank input.
pub fn estimate_actions(instruction: &str) -> usize {
    let lower = instruction.to_lowercase();
    let mut count: usize = VERBS.iter().map(|v| lower.matches(v).count()).sum();

    count += lower.matches("type ").count() + lower.matches("write ").count();

    if lower.contains("save as") {
        count += 4;
    } else if lower.contains("save") {
        count += 3;
    }

    count += lower.matches("click").count() + lower.matches("press").count();

    if count == 0 && !instruction.trim().is_empty() {
        count = 1;
    }
    count
}

#[derive(Clone, Copy, Debug)]
pub struct Decomposer {
    pub max_actions: usize,
    pub max_depth: usize,
}

impl Decomposer {
    pub fn new(max_actions: usize, max_depth: usize) -> Self {
        Self {
            max_actions,
            max_depth,
        }
    }

    /// Split `instruction` into sub-instructions that each fit the action
    /// bound. An instruction already within the bound comes back unchanged
    /// as the only element.
    pub fn decompose(&self, instruction: &str) -> PlanResult<Vec<String>> {
        if self.estimate_fits(instruction) {
            return Ok(vec![instruction.to_string()]);
        }

        let parts = self.split(instruction, 0)?;
        if parts.len() > 1 {
            info!(count = parts.len(), ?parts, "task decomposition triggered");
        }
        Ok(parts)
    }

    fn estimate_fits(&self, instruction: &str) -> bool {
        estimate_actions(instruction) <= self.max_actions
    }

    fn split(&self, instruction: &str, depth: usize) -> PlanResult<Vec<String>> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Ok(Vec::new());
        }

        let estimate = estimate_actions(instruction);
        if estimate <= self.max_actions {
            return Ok(vec![instruction.to_string()]);
        }

        if depth >= self.max_depth {
            return Err(PlanError::TooComplex(format!(
                "decomposition exceeded depth {} (estimated {estimate} actions in '{instruction}')",
                self.max_depth
            )));
        }

        debug!(estimate, depth, instruction, "decomposing complex task");

        for separators in [&*STRONG_SEPARATORS, &*WEAK_SEPARATORS] {
            let fragments = split_on(separators, instruction);
            if fragments.len() > 1 {
                let mut results = Vec::new();
                for fragment in fragments {
                    results.extend(self.split(fragment, depth + 1)?);
                }
                return Ok(results);
            }
        }

        warn!(instruction, "could not decompose complex task further");
        Ok(vec![instruction.to_string()])
    }
}

fn split_on<'a>(separators: &Regex, instruction: &'a str) -> Vec<&'a str> {
    separators
        .split(instruction)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn estimates_weighted_verbs() {
        assert_eq!(estimate_actions("open notepad"), 1);
        assert_eq!(estimate_actions("open notepad and type hello"), 2);
        assert_eq!(estimate_actions("type hello and save as a.txt"), 5);
        assert_eq!(estimate_actions("type hello and save"), 4);
        assert_eq!(estimate_actions("hello there"), 1);
        assert_eq!(estimate_actions("   "), 0);
    }

    #[test]
    fn within_bound_is_identity() {
        let decomposer = Decomposer::new(15, 8);
        let instruction = "  open notepad; type hi  ";
        assert_eq!(decomposer.decompose(instruction).unwrap(), vec![instruction]);
    }

    #[test]
    fn strong_separators_split_first() {
        let decomposer = Decomposer::new(1, 8);
        let parts = decomposer
            .decompose("open notepad, type hi then close notepad")
            .unwrap();
        assert_eq!(parts, vec!["open notepad", "type hi", "close notepad"]);
    }

    #[test]
    fn semicolons_and_and_then() {
        let decomposer = Decomposer::new(1, 8);
        let parts = decomposer
            .decompose("open notepad; type hi AND THEN close notepad")
            .unwrap();
        assert_eq!(parts, vec!["open notepad", "type hi", "close notepad"]);
    }

    #[test]
    fn weak_separators_split_quoted_text_too() {
        let decomposer = Decomposer::new(1, 8);
        let parts = decomposer.decompose("open notepad and type salt and pepper").unwrap();
        assert_eq!(parts, vec!["open notepad", "type salt", "pepper"]);
    }

    #[test]
    fn unsplittable_instruction_is_returned_whole() {
        let decomposer = Decomposer::new(1, 8);
        let parts = decomposer.decompose("open open open").unwrap();
        assert_eq!(parts, vec!["open open open"]);
    }

    #[test]
    fn depth_guard_reports_too_complex() {
        let decomposer = Decomposer::new(1, 1);
        let err = decomposer
            .decompose("open a; open b and open c and open d")
            .unwrap_err();
        assert!(matches!(err, PlanError::TooComplex(_)));
    }
}
