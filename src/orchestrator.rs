use std::path::Path;

use uuid::Uuid;

use crate::config::EpicflowConfig;
use crate::error::Result;
use crate::runtime::{FsmRuntime, SnapshotStore};
use crate::state_machine::{
    Event, ResearchArtifactRef, ResearchDecision, ResumeCandidate, ReviewDecision, Snapshot,
    State, StateMachine, TransitionResult,
};

/// Summary of one driven run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub snapshot: Snapshot,
    /// Every state the run passed through, ending with the final one.
    pub state_transitions: Vec<State>,
    pub dispatched: usize,
    pub absorbed: usize,
}

/// Feeds event streams into a state machine runtime built from config.
pub struct Orchestrator {
    pub config: EpicflowConfig,
}

impl Orchestrator {
    pub fn new(config: EpicflowConfig) -> Self {
        Self { config }
    }

    fn store(&self) -> Option<SnapshotStore> {
        self.config.snapshot_path.clone().map(SnapshotStore::new)
    }

    /// Pick the starting snapshot: an explicit state wins, then a persisted
    /// snapshot, then a fresh run in `boot`.
    pub fn start_snapshot(&self, from_state: Option<State>) -> Result<Snapshot> {
        if let Some(state) = from_state {
            return Ok(Snapshot::new(state, self.config.initial_context()));
        }
        match self.store() {
            Some(store) if store.exists() => store.load(),
            _ => Ok(Snapshot::new(State::Boot, self.config.initial_context())),
        }
    }

    /// Dispatch `events` in order through a runtime, reporting each step to `on_step`.
    pub async fn run(
        &self,
        start: Snapshot,
        events: Vec<Event>,
        mut on_step: impl FnMut(State, &Event, &TransitionResult),
    ) -> Result<RunReport> {
        let (handle, task) = FsmRuntime::spawn(StateMachine::from_snapshot(start), self.store());
        let run_id = handle.run_id();

        let mut from = handle.snapshot().await?.state;
        let mut dispatched = 0;
        let mut absorbed = 0;
        for event in events {
            let result = handle.dispatch(event.clone()).await?;
            dispatched += 1;
            if !result.changed {
                absorbed += 1;
            }
            on_step(from, &event, &result);
            from = result.state;
        }

        drop(handle);
        let machine = task.await?;
        let mut state_transitions = machine.state_history().to_vec();
        state_transitions.push(machine.state());

        Ok(RunReport {
            run_id,
            snapshot: machine.snapshot().clone(),
            state_transitions,
            dispatched,
            absorbed,
        })
    }
}

/// Read a JSON array of events.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Read a JSON array of resume candidates.
pub fn read_candidates(path: &Path) -> Result<Vec<ResumeCandidate>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// A complete delivery: boot with nothing to resume, take a goal from the
/// user, plan, research with two agents, code, and pass review.
pub fn demo_events() -> Vec<Event> {
    let artifact = |agent: &str| ResearchArtifactRef {
        agent_id: agent.to_string(),
        summary_path: format!("research/{agent}/summary.md"),
        memory_path: format!("research/{agent}/memory.json"),
        operation_log_path: Some(format!("research/{agent}/ops.log")),
    };

    vec![
        Event::Boot,
        Event::BdProbeResult {
            candidates: Vec::new(),
        },
        Event::UserInput {
            text: "build X".into(),
        },
        Event::IntakeCompleted {
            confidence: 0.9,
            conflict: false,
            epic_id: Some("epic-demo".into()),
        },
        Event::EpicSynced { epic_id: None },
        Event::PlanBaselined {
            confidence: 0.85,
            need_plan_review: true,
        },
        Event::PlanReviewFeedback { blocking: false },
        Event::PlanReviewPass,
        Event::ObserveDefined {
            research_expected: Some(2),
        },
        Event::ResearchDispatched,
        Event::ResearchResult {
            artifact: artifact("researcher-1"),
        },
        Event::ResearchIngested,
        Event::ResearchEvaluated {
            decision: ResearchDecision::NeedMoreResults,
            missing: Some(0),
        },
        Event::ResearchResult {
            artifact: artifact("researcher-2"),
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
        Event::DispatchResult {
            ok: true,
            error: None,
        },
        Event::CoderResult,
        Event::ReviewResult {
            decision: ReviewDecision::Pass,
            claims_without_evidence: 1,
        },
        Event::CoderHandoffReady,
        Event::ScheduleDecided {
            confidence: 0.9,
            resource_busy: false,
        },
        Event::DispatchResult {
            ok: true,
            error: None,
        },
        Event::CoderResult,
        Event::ReviewResult {
            decision: ReviewDecision::Pass,
            claims_without_evidence: 0,
        },
    ]
}
