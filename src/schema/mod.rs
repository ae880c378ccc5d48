// src/schema/mod.rs

//! Execution units shared by every planning stage.
//!
//! A plan is a flat sequence of [`PlanItem`]s. An item is either an
//! [`Action`] (causes a side effect) or an [`Observation`] (read-only).
//! Both are immutable once built and can only be built through validating
//! constructors, so a value of either type always satisfies its field rules.

pub mod action;
pub mod graph;
pub mod observation;

pub use action::{Action, Verify};
pub use graph::{PlanGraph, PlanStep};
pub use observation::{Observation, ObservationResult, ObservationStatus};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordered output of one generator invocation, before segmentation.
pub type Plan = Vec<PlanItem>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Desktop,
    Web,
    File,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::Desktop, Context::Web, Context::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Desktop => "desktop",
            Context::Web => "web",
            Context::File => "file",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Context::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SchemaError::InvalidContext(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    LaunchApp,
    TypeText,
    CloseApp,
    FocusWindow,
    Wait,
    ClickControl,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::LaunchApp,
        ActionType::TypeText,
        ActionType::CloseApp,
        ActionType::FocusWindow,
        ActionType::Wait,
        ActionType::ClickControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::LaunchApp => "launch_app",
            ActionType::TypeText => "type_text",
            ActionType::CloseApp => "close_app",
            ActionType::FocusWindow => "focus_window",
            ActionType::Wait => "wait",
            ActionType::ClickControl => "click_control",
        }
    }

    /// `wait` and `focus_window` are passive helpers; everything else
    /// changes state and has to be grounded in the instruction.
    pub fn is_causal(&self) -> bool {
        !matches!(self, ActionType::Wait | ActionType::FocusWindow)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::IllegalType(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    ReadText,
    QueryElement,
    Vision,
    CheckAppState,
    VisionBufferRead,
}

impl ObservationType {
    pub const ALL: [ObservationType; 5] = [
        ObservationType::ReadText,
        ObservationType::QueryElement,
        ObservationType::Vision,
        ObservationType::CheckAppState,
        ObservationType::VisionBufferRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::ReadText => "read_text",
            ObservationType::QueryElement => "query_element",
            ObservationType::Vision => "vision",
            ObservationType::CheckAppState => "check_app_state",
            ObservationType::VisionBufferRead => "vision_buffer_read",
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::IllegalType(s.to_string()))
    }
}

/// Field-level rule violations raised while building an item.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{item} requires '{field}' field")]
    MissingField { item: String, field: &'static str },

    #[error("{action} is not supported in {context} context")]
    NotInContext { action: ActionType, context: Context },

    #[error("illegal type '{0}'")]
    IllegalType(String),

    #[error("invalid context '{0}' (expected desktop, web or file)")]
    InvalidContext(String),

    #[error("item must have either 'action_type' or 'observation_type' field")]
    MissingKind,

    #[error("coordinate targeting is disabled")]
    CoordinatesForbidden,

    #[error("field '{0}' must be a string")]
    NotAString(&'static str),

    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("{0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanItem {
    Action(Action),
    Observation(Observation),
}

impl PlanItem {
    pub fn context(&self) -> Context {
        match self {
            PlanItem::Action(a) => a.context(),
            PlanItem::Observation(o) => o.context(),
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match self {
            PlanItem::Action(a) => Some(a),
            PlanItem::Observation(_) => None,
        }
    }

    pub fn observation(&self) -> Option<&Observation> {
        match self {
            PlanItem::Observation(o) => Some(o),
            PlanItem::Action(_) => None,
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self, PlanItem::Action(_))
    }

    pub fn is_observation(&self) -> bool {
        matches!(self, PlanItem::Observation(_))
    }

    /// True for an Action of the given type.
    pub fn is(&self, action_type: ActionType) -> bool {
        self.action().is_some_and(|a| a.action_type() == action_type)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PlanItem::Action(a) => a.action_type().as_str(),
            PlanItem::Observation(o) => o.observation_type().as_str(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            PlanItem::Action(a) => a.target(),
            PlanItem::Observation(o) => Some(o.target()),
        }
    }

    /// Validate one untrusted JSON value against the closed item schema.
    pub fn from_value(value: &Value) -> Result<PlanItem, SchemaError> {
        if !value.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        let raw = RawPlanItem::deserialize(value).map_err(|e| SchemaError::Invalid(e.to_string()))?;
        PlanItem::try_from(raw)
    }
}

impl From<Action> for PlanItem {
    fn from(action: Action) -> Self {
        PlanItem::Action(action)
    }
}

impl From<Observation> for PlanItem {
    fn from(observation: Observation) -> Self {
        PlanItem::Observation(observation)
    }
}

impl<'de> Deserialize<'de> for PlanItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPlanItem::deserialize(deserializer)?;
        PlanItem::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Loosely typed wire form. Never escapes this module: it is converted into
/// a [`PlanItem`] in one step or rejected.
#[derive(Debug, Deserialize)]
struct RawPlanItem {
    action_type: Option<String>,
    observation_type: Option<String>,
    context: Option<String>,
    target: Option<Value>,
    text: Option<Value>,
    verify: Option<Verify>,
    coordinates: Option<Value>,
}

impl TryFrom<RawPlanItem> for PlanItem {
    type Error = SchemaError;

    fn try_from(raw: RawPlanItem) -> Result<Self, Self::Error> {
        if raw.coordinates.is_some() {
            return Err(SchemaError::CoordinatesForbidden);
        }

        let target = scalar_field("target", raw.target)?;
        let text = scalar_field("text", raw.text)?;

        let (kind, as_action) = match (raw.action_type, raw.observation_type) {
            (Some(kind), _) => (kind, true),
            (None, Some(kind)) => (kind, false),
            (None, None) => return Err(SchemaError::MissingKind),
        };

        // Models regularly emit observations under `action_type`.
        if let Ok(observation_type) = kind.parse::<ObservationType>() {
            let context = require_context(&kind, raw.context)?;
            return Observation::new(observation_type, context, target.unwrap_or_default())
                .map(PlanItem::Observation);
        }

        if !as_action {
            return Err(SchemaError::IllegalType(kind));
        }

        let action_type: ActionType = kind.parse()?;
        let context = require_context(&kind, raw.context)?;
        let action = Action::new(action_type, context, target, text)?;
        Ok(PlanItem::Action(match raw.verify {
            Some(verify) => action.with_verify(verify),
            None => action,
        }))
    }
}

fn require_context(kind: &str, context: Option<String>) -> Result<Context, SchemaError> {
    context
        .ok_or_else(|| SchemaError::MissingField {
            item: kind.to_string(),
            field: "context",
        })?
        .parse()
}

fn scalar_field(name: &'static str, value: Option<Value>) -> Result<Option<String>, SchemaError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(SchemaError::NotAString(name)),
    }
}

/// Blank strings count as absent everywhere in the schema.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
