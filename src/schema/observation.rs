// src/schema/observation.rs

use super::{non_blank, Context, ObservationType, SchemaError};
use serde::Serialize;

/// A read-only query. Never causes a side effect.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Observation {
    observation_type: ObservationType,
    context: Context,
    target: String,
}

impl Observation {
    pub fn new(
        observation_type: ObservationType,
        context: Context,
        target: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let target = non_blank(Some(target.into())).ok_or_else(|| SchemaError::MissingField {
            item: observation_type.to_string(),
            field: "target",
        })?;
        Ok(Self {
            observation_type,
            context,
            target,
        })
    }

    pub fn read_file(path: impl Into<String>) -> Result<Self, SchemaError> {
        Self::new(ObservationType::ReadText, Context::File, path)
    }

    pub fn observation_type(&self) -> ObservationType {
        self.observation_type
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObservationStatus {
    Success,
    NotFound,
    Error,
}

/// Outcome of an earlier observation, fed back into the model prompt.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationResult {
    pub observation: Observation,
    pub status: ObservationStatus,
    pub result: Option<String>,
    /// Set when `status` is [`ObservationStatus::Error`].
    pub error: Option<String>,
    /// Set when the result came from the vision pipeline.
    pub vision_confidence: Option<f64>,
}

impl ObservationResult {
    pub fn success(observation: Observation, result: impl Into<String>) -> Self {
        Self {
            observation,
            status: ObservationStatus::Success,
            result: Some(result.into()),
            error: None,
            vision_confidence: None,
        }
    }

    pub fn not_found(observation: Observation) -> Self {
        Self {
            observation,
            status: ObservationStatus::NotFound,
            result: None,
            error: None,
            vision_confidence: None,
        }
    }

    pub fn failed(observation: Observation, error: impl Into<String>) -> Self {
        Self {
            observation,
            status: ObservationStatus::Error,
            result: None,
            error: Some(error.into()),
            vision_confidence: None,
        }
    }

    pub fn with_vision_confidence(mut self, confidence: f64) -> Self {
        self.vision_confidence = Some(confidence);
        self
    }
}
