use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Side effects the state machine asks collaborators to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ProbeBdResumable,
    AskResume,
    LoadResumeQueue,
    ParseIntake,
    ClarifyLowConfidence,
    AskSwitchOrMerge,
    BdUpsertEpicAndTasks,
    BuildPlanBaseline,
    RequestPlanReview,
    ApplyNonBlockingFeedback,
    DefineObservationTargets,
    DispatchResearchAgents,
    WaitForResearchResults,
    IngestResearchArtifacts,
    EvaluateResearchSufficiency,
    BuildDetailDesign,
    PrepareCoderHandoff,
    ScheduleResources,
    EnqueueWaitingTask,
    DispatchCoder,
    AwaitCoderOutput,
    RunReviewerExecutorMode,
    RejectClaimWithoutEvidence,
    ApplyReplanPatch,
    FinalizeDelivery,
    MarkCancelled,
    MarkFailed,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the serde name so logs and the wire agree.
        match serde_json::to_value(self) {
            Ok(Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// A request for a collaborator, not a confirmation that anything happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Attach a payload field, creating the map on first use.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Command::new(kind)
    }
}
