// src/schema/action.rs

use super::{non_blank, ActionType, Context, SchemaError};
use serde::{Deserialize, Serialize};

/// Post-condition metadata the verification engine checks after an Action.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Verify {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verify {
    pub fn text_visible(value: impl Into<String>) -> Self {
        Self {
            kind: Some("text_visible".into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }
}

/// A side-effecting execution unit.
///
/// There is deliberately no coordinate field: coordinate input is a
/// permanently disabled capability, and the wire parser rejects any item
/// that carries one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Action {
    action_type: ActionType,
    context: Context,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verify: Option<Verify>,
}

impl Action {
    /// Build an action, enforcing the per-context field rules.
    ///
    /// `close_app` outside the file context may omit its target; that is a
    /// pre-repair state the planner must resolve before a plan is emitted.
    pub fn new(
        action_type: ActionType,
        context: Context,
        target: Option<String>,
        text: Option<String>,
    ) -> Result<Self, SchemaError> {
        let action = Self {
            action_type,
            context,
            target: non_blank(target),
            text: non_blank(text),
            verify: None,
        };
        action.check()?;
        Ok(action)
    }

    pub fn launch(context: Context, target: impl Into<String>) -> Result<Self, SchemaError> {
        Self::new(ActionType::LaunchApp, context, Some(target.into()), None)
    }

    pub fn type_text(
        context: Context,
        target: Option<String>,
        text: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        Self::new(ActionType::TypeText, context, target, Some(text.into()))
    }

    /// Desktop `wait`; the duration travels in `target` as seconds, written
    /// at full precision with at least one decimal.
    pub fn wait(seconds: f64) -> Self {
        Self {
            action_type: ActionType::Wait,
            context: Context::Desktop,
            target: Some(format!("{seconds:?}")),
            text: None,
            verify: None,
        }
    }

    /// Desktop keystrokes typed into the focused window. Callers pass
    /// literals or strings already checked to be non-empty.
    pub(crate) fn keystrokes(text: impl Into<String>) -> Self {
        let text = text.into();
        debug_assert!(!text.trim().is_empty());
        Self {
            action_type: ActionType::TypeText,
            context: Context::Desktop,
            target: None,
            text: Some(text),
            verify: None,
        }
    }

    pub fn with_verify(mut self, verify: Verify) -> Self {
        self.verify = Some(verify);
        self
    }

    /// Copy with the target filled in. Only used by repair, which never
    /// changes the type or context, so the field rules still hold.
    pub(crate) fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = non_blank(Some(target.into())).or(self.target);
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn verify(&self) -> Option<&Verify> {
        self.verify.as_ref()
    }

    pub fn requires_approval(&self) -> bool {
        self.verify.as_ref().is_some_and(|v| v.requires_approval)
    }

    fn check(&self) -> Result<(), SchemaError> {
        use ActionType::*;

        let missing = |field: &'static str| SchemaError::MissingField {
            item: format!("{} ({})", self.action_type, self.context),
            field,
        };
        let not_here = || SchemaError::NotInContext {
            action: self.action_type,
            context: self.context,
        };
        let has_target = self.target.is_some();
        let has_text = self.text.is_some();

        match self.context {
            Context::Desktop => match self.action_type {
                LaunchApp | FocusWindow | ClickControl | Wait if !has_target => Err(missing("target")),
                TypeText if !has_text => Err(missing("text")),
                _ => Ok(()),
            },
            Context::Web => match self.action_type {
                FocusWindow | Wait => Err(not_here()),
                LaunchApp | ClickControl | TypeText if !has_target => Err(missing("target")),
                TypeText if !has_text => Err(missing("text")),
                _ => Ok(()),
            },
            Context::File => match self.action_type {
                CloseApp | FocusWindow | Wait => Err(not_here()),
                _ if !has_target => Err(missing("target")),
                TypeText if !has_text => Err(missing("text")),
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_rules() {
        assert!(Action::launch(Context::Desktop, "notepad.exe").is_ok());
        assert!(Action::new(ActionType::LaunchApp, Context::Desktop, None, None).is_err());
        assert!(Action::new(ActionType::TypeText, Context::Desktop, None, Some("  ".into())).is_err());
        // Target-less close is a legal intermediate state.
        assert!(Action::new(ActionType::CloseApp, Context::Desktop, None, None).is_ok());
    }

    #[test]
    fn web_type_text_needs_selector_and_text() {
        let err = Action::type_text(Context::Web, None, "hello").unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                item: "type_text (web)".into(),
                field: "target"
            }
        );
        assert!(Action::type_text(Context::Web, Some("#q".into()), "hello").is_ok());
        assert!(Action::new(ActionType::Wait, Context::Web, Some("1".into()), None).is_err());
    }

    #[test]
    fn file_rules() {
        assert!(Action::type_text(Context::File, Some("notes.txt".into()), "hi").is_ok());
        assert!(Action::new(ActionType::TypeText, Context::File, Some("notes.txt".into()), None).is_err());
        assert_eq!(
            Action::new(ActionType::CloseApp, Context::File, Some("x".into()), None).unwrap_err(),
            SchemaError::NotInContext {
                action: ActionType::CloseApp,
                context: Context::File
            }
        );
    }

    #[test]
    fn wait_formats_seconds() {
        assert_eq!(Action::wait(2.0).target(), Some("2.0"));
        assert_eq!(Action::wait(0.5).target(), Some("0.5"));
        assert_eq!(Action::wait(2.25).target(), Some("2.25"));
        assert_eq!(Action::wait(0.04).target(), Some("0.04"));
    }

    #[test]
    fn approval_comes_from_verify() {
        let action = Action::launch(Context::Desktop, "calc.exe").unwrap();
        assert!(!action.requires_approval());
        let action = action.with_verify(Verify {
            requires_approval: true,
            ..Verify::default()
        });
        assert!(action.requires_approval());
    }
}
