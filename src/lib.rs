// src/lib.rs

//! Compiles natural-language automation instructions into validated,
//! context-segmented plan graphs for a desktop/web/file executor.

pub mod client;
pub mod config;
pub mod decompose;
pub mod error;
pub mod planner;
pub mod render;
pub mod repair;
pub mod schema;
pub mod validation;
pub mod workspace;

pub use config::AgentConfig;
pub use error::{PlanError, PlanResult};
pub use planner::Planner;
pub use schema::{Action, Observation, Plan, PlanGraph, PlanItem, PlanStep};
