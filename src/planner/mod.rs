// src/planner/mod.rs

//! Instruction → validated plan → context-segmented graphs.

pub mod deterministic;
pub mod llm;
pub mod prompt;
pub mod router;

pub use deterministic::DeterministicPlanner;
pub use llm::LlmPlanner;
pub use router::{Rejection, Route};

use crate::client::{ModelClient, ModelError, OllamaClient};
use crate::config::{AgentConfig, OnLlmFailure};
use crate::decompose::{Decomposer, segment};
use crate::error::{PlanError, PlanResult};
use crate::repair::{filter_hallucinations, repair_plan, repair_save_sequence};
use crate::schema::{Context, ObservationResult, Plan, PlanGraph};
use crate::validation::plan::{check_item_count, validate_plan};
use crate::workspace::{PathValidator, Workspace};
use tracing::{error, info, warn};

/// A strategy that turns one instruction into a raw plan.
pub trait PlanGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, instruction: &str, prior: &[ObservationResult]) -> PlanResult<Plan>;
}

pub struct Planner {
    config: AgentConfig,
    llm: Option<LlmPlanner>,
    deterministic: DeterministicPlanner,
    workspace: Box<dyn PathValidator>,
}

impl Planner {
    pub fn new(
        config: AgentConfig,
        client: Option<Box<dyn ModelClient>>,
        workspace: Box<dyn PathValidator>,
    ) -> Self {
        let max_items = config.planner.max_actions_per_plan;
        let llm = client
            .filter(|_| config.planner.use_llm)
            .map(|client| LlmPlanner::new(client, max_items));
        let mode = if llm.is_some() { "llm" } else { "deterministic" };
        info!(mode, "planner initialized");

        Self {
            config,
            llm,
            deterministic: DeterministicPlanner,
            workspace,
        }
    }

    /// Ollama client and workspace sandbox built from the config.
    pub fn from_config(config: AgentConfig) -> Result<Self, ModelError> {
        let client: Option<Box<dyn ModelClient>> = if config.planner.use_llm {
            Some(Box::new(OllamaClient::new(&config.llm)?))
        } else {
            None
        };
        let workspace = Box::new(Workspace::new(&config.workspace.root));
        Ok(Self::new(config, client, workspace))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn uses_model(&self) -> bool {
        self.llm.is_some()
    }

    /// Plan for a single instruction. An empty plan means the instruction
    /// was refused on policy grounds.
    pub fn create_plan(&self, instruction: &str, prior: &[ObservationResult]) -> PlanResult<Plan> {
        match router::route(instruction, self.workspace.as_ref()) {
            Route::Direct(plan) => return Ok(plan),
            Route::Rejected(rejection) => return Ok(reject(&rejection)),
            Route::Generate => {}
        }

        if let Route::Rejected(rejection) = router::prevalidate(instruction)? {
            return Ok(reject(&rejection));
        }

        let plan = match &self.llm {
            Some(llm) => self.plan_with_model(llm, instruction, prior)?,
            None => self.plan_deterministic(instruction)?,
        };

        Ok(self.enforce_workspace(plan))
    }

    /// Top-level entry point: decompose, plan each sub-instruction, then
    /// segment by context. Any refused sub-instruction refuses the whole
    /// instruction.
    pub fn create_plan_graph(
        &self,
        instruction: &str,
        prior: &[ObservationResult],
    ) -> PlanResult<Vec<PlanGraph>> {
        let decomposer = Decomposer::new(
            self.config.planner.max_actions_per_plan,
            self.config.planner.max_decomposition_depth,
        );
        let sub_tasks = decomposer.decompose(instruction)?;

        let mut graphs = Vec::new();
        for (idx, sub_task) in sub_tasks.iter().enumerate() {
            info!(task = idx + 1, total = sub_tasks.len(), sub_task = %sub_task, "planning sub-task");
            let plan = self.create_plan(sub_task, prior).inspect_err(|err| {
                error!(%err, sub_task = %sub_task, "planning failed for sub-task");
            })?;
            if plan.is_empty() {
                warn!(sub_task = %sub_task, "sub-task refused, discarding whole instruction");
                return Ok(Vec::new());
            }
            graphs.extend(segment(sub_task, plan, idx, sub_tasks.len()));
        }

        info!(graphs = graphs.len(), sub_tasks = sub_tasks.len(), "plan composition complete");
        Ok(graphs)
    }

    fn plan_with_model(
        &self,
        llm: &LlmPlanner,
        instruction: &str,
        prior: &[ObservationResult],
    ) -> PlanResult<Plan> {
        let raw = match llm.generate(instruction, prior) {
            Ok(plan) => plan,
            Err(err) if err.is_generator_failure() => {
                if self.config.fallback.on_llm_failure == OnLlmFailure::Deterministic {
                    warn!(%err, "model planning failed, falling back to deterministic planner");
                    return self.plan_deterministic(instruction);
                }
                error!(%err, "model planning failed");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let plan = filter_hallucinations(raw, instruction);
        let plan = repair_plan(plan, instruction)?;
        let plan = validate_plan(plan, instruction, self.config.planner.max_actions_per_plan)?;
        info!(items = plan.len(), "model plan accepted");
        Ok(plan)
    }

    fn plan_deterministic(&self, instruction: &str) -> PlanResult<Plan> {
        let plan = self.deterministic.generate(instruction, &[])?;
        let plan = repair_save_sequence(plan, instruction);
        check_item_count(&plan, self.config.planner.max_actions_per_plan)?;
        info!(
            items = plan.len(),
            generator = self.deterministic.name(),
            "deterministic plan accepted"
        );
        Ok(plan)
    }

    /// Every file-context target must resolve inside the workspace.
    fn enforce_workspace(&self, plan: Plan) -> Plan {
        for item in plan.iter().filter(|item| item.context() == Context::File) {
            let Some(target) = item.target() else {
                continue;
            };
            if let Err(violation) = self.workspace.validate(target) {
                return reject(&Rejection::Workspace(violation));
            }
        }
        plan
    }
}

fn reject(rejection: &Rejection) -> Plan {
    warn!(reason = %rejection, "instruction rejected by policy, returning empty plan");
    Vec::new()
}
