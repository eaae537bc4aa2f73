use serde::{Deserialize, Serialize};

use super::context::{ResearchArtifactRef, ResumeCandidate};

/// Verdict of the research-sufficiency evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDecision {
    #[default]
    EnoughInfo,
    NeedMoreResults,
    NeedReplan,
}

/// Verdict reported by the reviewer in executor mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    #[default]
    Pass,
    Retry,
    Replan,
}

/// Everything that can happen to a run. Events are the only way state changes.
///
/// Serialized with an internal `type` tag so the runtime can feed JSON
/// straight from collaborator callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Boot,
    BdProbeResult {
        #[serde(default)]
        candidates: Vec<ResumeCandidate>,
    },
    ResumeDecision {
        resume: bool,
    },
    ResumePlanLoaded {
        #[serde(default)]
        epic_id: Option<String>,
    },
    UserInput {
        text: String,
    },
    IntakeCompleted {
        confidence: f64,
        #[serde(default)]
        conflict: bool,
        #[serde(default)]
        epic_id: Option<String>,
    },
    SwitchResolved {
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        epic_id: Option<String>,
    },
    EpicSynced {
        #[serde(default)]
        epic_id: Option<String>,
    },
    PlanBaselined {
        confidence: f64,
        #[serde(default)]
        need_plan_review: bool,
    },
    PlanReviewPass,
    PlanReviewFeedback {
        #[serde(default)]
        blocking: bool,
    },
    ObserveDefined {
        #[serde(default)]
        research_expected: Option<u32>,
    },
    ResearchDispatched,
    ResearchResult {
        artifact: ResearchArtifactRef,
    },
    ResearchIngested,
    ResearchEvaluated {
        #[serde(default)]
        decision: ResearchDecision,
        #[serde(default)]
        missing: Option<u32>,
    },
    DetailDesigned,
    CoderHandoffReady,
    ScheduleDecided {
        confidence: f64,
        #[serde(default)]
        resource_busy: bool,
    },
    ResourceAvailable,
    DispatchResult {
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
    CoderResult,
    ReviewResult {
        #[serde(default)]
        decision: ReviewDecision,
        #[serde(default)]
        claims_without_evidence: u32,
    },
    ReplanApplied {
        confidence: f64,
    },
    RequirementChanged {
        #[serde(default)]
        summary: Option<String>,
    },
    Cancel {
        #[serde(default)]
        reason: Option<String>,
    },
    FatalError {
        error: String,
    },
    /// Liveness pulse from an agent, passed through by the runtime so the
    /// supervisor's heartbeats share the event stream. Always absorbed.
    Heartbeat {
        agent_id: String,
    },
    /// Clock pulse passed through by the runtime to show the run is still
    /// being driven. Always absorbed.
    Tick,
}

impl Event {
    /// The snake_case tag of this event, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Boot => "boot",
            Event::BdProbeResult { .. } => "bd_probe_result",
            Event::ResumeDecision { .. } => "resume_decision",
            Event::ResumePlanLoaded { .. } => "resume_plan_loaded",
            Event::UserInput { .. } => "user_input",
            Event::IntakeCompleted { .. } => "intake_completed",
            Event::SwitchResolved { .. } => "switch_resolved",
            Event::EpicSynced { .. } => "epic_synced",
            Event::PlanBaselined { .. } => "plan_baselined",
            Event::PlanReviewPass => "plan_review_pass",
            Event::PlanReviewFeedback { .. } => "plan_review_feedback",
            Event::ObserveDefined { .. } => "observe_defined",
            Event::ResearchDispatched => "research_dispatched",
            Event::ResearchResult { .. } => "research_result",
            Event::ResearchIngested => "research_ingested",
            Event::ResearchEvaluated { .. } => "research_evaluated",
            Event::DetailDesigned => "detail_designed",
            Event::CoderHandoffReady => "coder_handoff_ready",
            Event::ScheduleDecided { .. } => "schedule_decided",
            Event::ResourceAvailable => "resource_available",
            Event::DispatchResult { .. } => "dispatch_result",
            Event::CoderResult => "coder_result",
            Event::ReviewResult { .. } => "review_result",
            Event::ReplanApplied { .. } => "replan_applied",
            Event::RequirementChanged { .. } => "requirement_changed",
            Event::Cancel { .. } => "cancel",
            Event::FatalError { .. } => "fatal_error",
            Event::Heartbeat { .. } => "heartbeat",
            Event::Tick => "tick",
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// One instance of every event variant, for exhaustive sweeps.
    pub fn all_events() -> Vec<Event> {
        vec![
            Event::Boot,
            Event::BdProbeResult { candidates: Vec::new() },
            Event::ResumeDecision { resume: true },
            Event::ResumePlanLoaded { epic_id: None },
            Event::UserInput { text: "build X".into() },
            Event::IntakeCompleted {
                confidence: 0.9,
                conflict: false,
                epic_id: None,
            },
            Event::SwitchResolved {
                confidence: Some(0.9),
                epic_id: None,
            },
            Event::EpicSynced { epic_id: None },
            Event::PlanBaselined {
                confidence: 0.9,
                need_plan_review: false,
            },
            Event::PlanReviewPass,
            Event::PlanReviewFeedback { blocking: false },
            Event::ObserveDefined {
                research_expected: Some(2),
            },
            Event::ResearchDispatched,
            Event::ResearchResult {
                artifact: artifact("agent-1"),
            },
            Event::ResearchIngested,
            Event::ResearchEvaluated {
                decision: ResearchDecision::EnoughInfo,
                missing: None,
            },
            Event::DetailDesigned,
            Event::CoderHandoffReady,
            Event::ScheduleDecided {
                confidence: 0.9,
                resource_busy: false,
            },
            Event::ResourceAvailable,
            Event::DispatchResult { ok: true, error: None },
            Event::CoderResult,
            Event::ReviewResult {
                decision: ReviewDecision::Pass,
                claims_without_evidence: 0,
            },
            Event::ReplanApplied { confidence: 0.9 },
            Event::RequirementChanged { summary: None },
            Event::Cancel { reason: None },
            Event::FatalError {
                error: "boom".into(),
            },
            Event::Heartbeat {
                agent_id: "agent-1".into(),
            },
            Event::Tick,
        ]
    }

    pub fn artifact(agent_id: &str) -> ResearchArtifactRef {
        ResearchArtifactRef {
            agent_id: agent_id.to_string(),
            summary_path: format!("research/{agent_id}/summary.md"),
            memory_path: format!("research/{agent_id}/memory.json"),
            operation_log_path: None,
        }
    }
}
