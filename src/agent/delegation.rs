//! Explicit, bounded delegation between agents of one crew.
//!
//! An agent with `allow_delegation` is offered a `delegate_work` tool listing
//! its coworkers. When the model calls it, a [`DelegationRouter`] picks the
//! coworker; the coworker then runs the sub-task one level deeper, without the
//! delegation tool. Only one hop is allowed per task.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::agent::agent::Agent;
use crate::agent::role::keywords;
use crate::llm::ToolSpec;

pub const DELEGATE_TOOL: &str = "delegate_work";

/// Deepest level at which an agent may still delegate; 0 means only crew-level runs
pub const MAX_DELEGATION_DEPTH: usize = 0;

/// Arguments of a `delegate_work` call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DelegationRequest {
    pub coworker: String,
    pub task: String,
    #[serde(default)]
    pub context: String,
}

impl DelegationRequest {
    pub fn parse(arguments: &str) -> Result<Self, String> {
        serde_json::from_str(arguments).map_err(|e| {
            format!("delegate_work expects {{\"coworker\", \"task\", \"context\"}} arguments: {e}")
        })
    }
}

/// Picks which coworker receives delegated work.
pub trait DelegationRouter: Send + Sync {
    /// `coworkers` never contains `from`
    fn route<'a>(
        &self,
        from: &Agent,
        request: &DelegationRequest,
        coworkers: &[&'a Arc<Agent>],
    ) -> Option<&'a Arc<Agent>>;
}

/// Exact role-name match first, then the coworker whose role and goal share the
/// most keywords with the request. Ties go to the coworker declared first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleKeywordRouter;

impl DelegationRouter for RoleKeywordRouter {
    fn route<'a>(
        &self,
        _from: &Agent,
        request: &DelegationRequest,
        coworkers: &[&'a Arc<Agent>],
    ) -> Option<&'a Arc<Agent>> {
        if let Some(exact) = coworkers.iter().find(|a| a.role.is_named(&request.coworker)) {
            return Some(*exact);
        }

        let wanted = keywords(&format!("{} {}", request.coworker, request.task));
        let mut best: Option<(&'a Arc<Agent>, usize)> = None;
        for coworker in coworkers {
            let score = coworker.role.keywords().intersection(&wanted).count();
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((*coworker, score));
            }
        }
        best.map(|(agent, _)| agent)
    }
}

static DEFAULT_ROUTER: RoleKeywordRouter = RoleKeywordRouter;

/// Function schema of the delegation tool for the given coworker roles
pub fn delegate_tool_spec(coworkers: &[&str]) -> ToolSpec {
    ToolSpec {
        name: DELEGATE_TOOL.to_string(),
        description: format!(
            "Delegate a specific task to one of the following coworkers: {}. \
             Provide the coworker's role, the task, and all context they need, since they know nothing else.",
            coworkers.join(", ")
        ),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "coworker": { "type": "string", "description": "Role of the coworker" },
                "task": { "type": "string", "description": "The task to delegate" },
                "context": { "type": "string", "description": "Everything the coworker needs to know" }
            },
            "required": ["coworker", "task"]
        }),
    }
}

/// Where an agent run sits: who it may delegate to, how deep it is, and the
/// cancellation token of the crew run.
#[derive(Clone)]
pub struct RunScope<'a> {
    pub coworkers: &'a [Arc<Agent>],
    pub router: &'a dyn DelegationRouter,
    pub depth: usize,
    pub cancel: CancellationToken,
}

impl RunScope<'static> {
    /// A lone agent run: no coworkers, never cancelled
    pub fn standalone() -> Self {
        Self {
            coworkers: &[],
            router: &DEFAULT_ROUTER,
            depth: 0,
            cancel: CancellationToken::new(),
        }
    }
}

impl<'a> RunScope<'a> {
    pub fn new(coworkers: &'a [Arc<Agent>], router: &'a dyn DelegationRouter, cancel: CancellationToken) -> Self {
        Self {
            coworkers,
            router,
            depth: 0,
            cancel,
        }
    }

    /// Scope for a coworker running delegated work
    pub fn delegated(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn coworkers_of(&self, agent: &Agent) -> Vec<&'a Arc<Agent>> {
        self.coworkers.iter().filter(|c| c.id != agent.id).collect()
    }

    pub fn can_delegate(&self, agent: &Agent) -> bool {
        agent.allow_delegation
            && self.depth <= MAX_DELEGATION_DEPTH
            && !self.coworkers_of(agent).is_empty()
    }
}
