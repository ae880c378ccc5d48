// src/planner/prompt.rs

use crate::schema::{ObservationResult, ObservationStatus};
use std::fmt::Write;

/// Vision results at or below this confidence must be confirmed by a human.
pub const LOW_VISION_CONFIDENCE: f64 = 0.7;

pub fn system_prompt(max_actions: usize) -> String {
    format!(
        r##"You are an action planner for a desktop automation agent with desktop, web and file contexts.

### Output contract
- Output ONLY a JSON array of objects. No explanations, no markdown, no code fences.
- Every element is a JSON object with named keys. Never emit bare values.
- At most {max_actions} items per plan.
- Special keys are written inside string values only, e.g. "{{ENTER}}".
- If the instruction is ambiguous ("do it", "fix the thing") or unsafe, output an empty array: []

### Content rules
1. Only type what the user explicitly asked for. Never invent filler text.
2. Opening an app does not imply typing anything into it.
3. Saving a file ("save as name.txt") is always four separate actions:
   - {{"action_type": "type_text", "context": "desktop", "text": "^s"}}
   - {{"action_type": "type_text", "context": "desktop", "text": "^a{{BACKSPACE}}"}}
   - {{"action_type": "type_text", "context": "desktop", "text": "name.txt"}}
   - {{"action_type": "type_text", "context": "desktop", "text": "{{ENTER}}"}}
   Never merge them into one string such as "^sname.txt{{ENTER}}".
4. Save before closing. close_app always comes after every save or type step.

### Action schema
- "action_type": one of launch_app, type_text, close_app, focus_window, wait, click_control
- "context": one of desktop, web, file
- "target": required for launch_app, focus_window, wait, click_control and close_app
- "text": required for type_text
- "verify": optional {{"requires_approval": true, "reason": "..."}} for low-confidence steps
- Never include coordinates. Coordinate input is not supported.

### Actions by context
DESKTOP
  {{"action_type": "launch_app", "context": "desktop", "target": "notepad.exe"}}
  {{"action_type": "type_text", "context": "desktop", "text": "hello world"}}
  {{"action_type": "wait", "context": "desktop", "target": "2.0"}}
  {{"action_type": "click_control", "context": "desktop", "target": "Save"}}
  {{"action_type": "focus_window", "context": "desktop", "target": "Notepad"}}
  {{"action_type": "close_app", "context": "desktop", "target": "notepad.exe"}}
WEB
  {{"action_type": "launch_app", "context": "web", "target": "https://example.com"}}
  {{"action_type": "type_text", "context": "web", "target": "input[name='q']", "text": "hello"}}
  {{"action_type": "click_control", "context": "web", "target": "button[type='submit']"}}
FILE
  {{"action_type": "type_text", "context": "file", "target": "notes.txt", "text": "file content"}}

### File creation (non-negotiable)
Creating a file is EXACTLY ONE action: type_text with context "file", a relative target path and the content as text.
Never add launch_app, never open an editor, never add a second file action.
  "create file notes.txt with text hello"
  -> [{{"action_type": "type_text", "context": "file", "target": "notes.txt", "text": "hello"}}]

### Observations (read-only)
  {{"observation_type": "read_text", "context": "web", "target": "h1"}}
  {{"observation_type": "read_text", "context": "file", "target": "notes.txt"}}
  {{"observation_type": "query_element", "context": "web", "target": "#search"}}
read_text is ONLY an observation_type, never an action_type.
Reading a file produces observations only, no actions.

### Vision context
If the plan relies on vision output with confidence <= {LOW_VISION_CONFIDENCE}, add
"verify": {{"requires_approval": true, "reason": "Action based on low-confidence vision: <details>"}}
to the affected action. Never click blindly on uncertain vision results.

### Examples
"open notepad and type hello"
[{{"action_type": "launch_app", "context": "desktop", "target": "notepad.exe"}}, {{"action_type": "type_text", "context": "desktop", "text": "hello"}}]

"open example.com and read the heading"
[{{"action_type": "launch_app", "context": "web", "target": "https://example.com"}}, {{"observation_type": "read_text", "context": "web", "target": "h1"}}]

"open notepad, type hello, save as test.txt, close"
[{{"action_type": "launch_app", "context": "desktop", "target": "notepad.exe"}}, {{"action_type": "type_text", "context": "desktop", "text": "hello"}}, {{"action_type": "type_text", "context": "desktop", "text": "^s"}}, {{"action_type": "type_text", "context": "desktop", "text": "^a{{BACKSPACE}}"}}, {{"action_type": "type_text", "context": "desktop", "text": "test.txt"}}, {{"action_type": "type_text", "context": "desktop", "text": "{{ENTER}}"}}, {{"action_type": "close_app", "context": "desktop", "target": "notepad.exe"}}]

Now generate the plan."##
    )
}

/// Instruction plus any earlier observation results.
pub fn user_prompt(instruction: &str, prior: &[ObservationResult]) -> String {
    let mut context = String::new();
    if !prior.is_empty() {
        context.push_str("\nCONTEXT FROM OBSERVATIONS:\n");
        for observation in prior {
            let kind = observation.observation.observation_type();
            let target = observation.observation.target();
            let result = observation.result.as_deref().unwrap_or("<no result>");
            let _ = match (observation.status, observation.vision_confidence) {
                (ObservationStatus::NotFound, _) => {
                    writeln!(context, "- [{kind} NOT FOUND]: {target}")
                }
                (ObservationStatus::Error, _) => writeln!(
                    context,
                    "- [{kind} FAILED]: {target} ({})",
                    observation.error.as_deref().unwrap_or("unknown error")
                ),
                (ObservationStatus::Success, Some(confidence)) => {
                    writeln!(context, "- [VISION (Confidence: {confidence})]: {result}")
                }
                (ObservationStatus::Success, None) => writeln!(context, "- [{kind}]: {result}"),
            };
        }
        let _ = writeln!(
            context,
            "\nUSE THIS CONTEXT to inform your plan. If Vision confidence is low (<={LOW_VISION_CONFIDENCE}) and uncorroborated, you MUST act cautiously."
        );
    }
    format!("Instruction: {instruction}\n{context}\nGenerate the action plan:")
}
