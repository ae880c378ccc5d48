// src/error.rs

use crate::client::ModelError;
use crate::schema::SchemaError;
use thiserror::Error;

/// Every way a planning attempt can fail.
///
/// Policy rejections (workspace escape, out-of-domain intent, unsafe
/// wording) are not errors: they come back as an empty plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("model output is malformed: {0}")]
    MalformedOutput(String),

    #[error("invalid item at position {position}: {source} (item: {item})")]
    SchemaViolation {
        position: usize,
        item: String,
        #[source]
        source: SchemaError,
    },

    #[error("ambiguous instruction: {0}")]
    AmbiguousInstruction(String),

    #[error("close target needs clarification (candidates: {candidates:?})")]
    NeedsClarification { candidates: Vec<String> },

    #[error("plan too complex: {0}")]
    TooComplex(String),

    #[error("incoherent plan: {0}")]
    CoherenceViolation(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PlanError {
    /// True when the model-backed generator itself failed to produce a usable
    /// plan, as opposed to a plan that was produced and then rejected.
    pub fn is_generator_failure(&self) -> bool {
        matches!(
            self,
            PlanError::Model(_)
                | PlanError::MalformedOutput(_)
                | PlanError::SchemaViolation { .. }
                | PlanError::AmbiguousInstruction(_)
        )
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
