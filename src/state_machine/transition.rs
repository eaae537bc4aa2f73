use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::command::{Command, CommandKind};
use super::context::{Context, LOW_CONFIDENCE_THRESHOLD};
use super::event::{Event, ResearchDecision, ReviewDecision};
use super::state::State;
use crate::ranking::sort_resume_candidates;

/// Everything needed to resume a run: the active state plus its context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: State,
    pub context: Context,
}

impl Snapshot {
    pub fn new(state: State, context: Context) -> Self {
        Self { state, context }
    }
}

/// The outcome of applying one event to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub state: State,
    pub context: Context,
    /// True if the state or context changed, or any command was emitted.
    pub changed: bool,
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransitionResult {
    /// The resulting snapshot, without the commands.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.state, self.context.clone())
    }

    fn unchanged(snapshot: &Snapshot, reason: String) -> Self {
        Self {
            state: snapshot.state,
            context: snapshot.context.clone(),
            changed: false,
            commands: Vec::new(),
            reason: Some(reason),
        }
    }
}

/// Where a matched rule sends the run, and what it asks for on the way.
struct Step {
    state: State,
    commands: Vec<Command>,
    reason: &'static str,
}

impl Step {
    fn to(state: State, reason: &'static str) -> Self {
        Self {
            state,
            commands: Vec::new(),
            reason,
        }
    }

    fn emit(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }
}

/// Compute the next snapshot and commands for `event`. Pure and total.
///
/// Terminal states absorb everything. Otherwise the global rules (cancel,
/// fatal error, requirement change) win over per-state rules, and an event
/// the current state does not expect is reported as a no-op rather than an
/// error, since the transport may deliver duplicates or stale events.
pub fn transition(snapshot: &Snapshot, event: &Event) -> TransitionResult {
    if snapshot.state.is_terminal() {
        return TransitionResult::unchanged(snapshot, "terminal_state_ignored".to_string());
    }

    let mut context = snapshot.context.clone();
    let step = match apply_global_rules(snapshot.state, &mut context, event) {
        Some(step) => step,
        None => match apply_state_rules(snapshot.state, &mut context, event) {
            Some(step) => step,
            None => {
                return TransitionResult::unchanged(
                    snapshot,
                    format!("invalid_event_for_{}", snapshot.state),
                );
            }
        },
    };

    let changed =
        step.state != snapshot.state || context != snapshot.context || !step.commands.is_empty();

    TransitionResult {
        state: step.state,
        context,
        changed,
        commands: step.commands,
        reason: Some(step.reason.to_string()),
    }
}

fn apply_global_rules(state: State, ctx: &mut Context, event: &Event) -> Option<Step> {
    match event {
        Event::Cancel { reason } => {
            let mut cmd = Command::new(CommandKind::MarkCancelled);
            if let Some(reason) = reason {
                cmd = cmd.with("reason", reason.as_str());
            }
            Some(Step::to(State::Cancelled, "cancelled").emit(cmd))
        }
        Event::FatalError { error } => {
            ctx.last_error = Some(error.clone());
            Some(
                Step::to(State::Failed, "fatal_error")
                    .emit(Command::new(CommandKind::MarkFailed).with("error", error.as_str())),
            )
        }
        Event::RequirementChanged { summary } if state != State::ReplanPatch => {
            let mut cmd =
                Command::new(CommandKind::ApplyReplanPatch).with("trigger", "requirement_changed");
            if let Some(summary) = summary {
                cmd = cmd.with("summary", summary.as_str());
            }
            Some(Step::to(State::ReplanPatch, "requirement_changed").emit(cmd))
        }
        _ => None,
    }
}

fn apply_state_rules(state: State, ctx: &mut Context, event: &Event) -> Option<Step> {
    use CommandKind as K;

    let step = match (state, event) {
        (State::Boot, Event::Boot) => {
            Step::to(State::IdleProbeBd, "boot").emit(K::ProbeBdResumable)
        }

        (State::IdleProbeBd, Event::BdProbeResult { candidates }) => {
            let ranked = sort_resume_candidates(candidates);
            if ranked.is_empty() {
                ctx.resume_candidates.clear();
                ctx.resume_queue.clear();
                return Some(Step::to(State::Idle, "no_resume_candidates"));
            }
            ctx.resume_candidates = ranked.clone();
            ctx.resume_queue = ranked;
            if ctx.auto_resume {
                Step::to(State::ResumePlan, "auto_resume").emit(load_resume_queue(ctx))
            } else {
                Step::to(State::ResumeAsk, "resume_candidates_found").emit(
                    Command::new(K::AskResume)
                        .with("candidates", to_json(&ctx.resume_candidates)),
                )
            }
        }

        (State::ResumeAsk, Event::ResumeDecision { resume: true }) => {
            Step::to(State::ResumePlan, "resume_accepted").emit(load_resume_queue(ctx))
        }
        (State::ResumeAsk, Event::ResumeDecision { resume: false }) => {
            ctx.resume_queue.clear();
            Step::to(State::Idle, "resume_declined")
        }

        (State::ResumePlan, Event::ResumePlanLoaded { epic_id }) => {
            let resumed = epic_id
                .clone()
                .or_else(|| ctx.resume_queue.first().map(|c| c.epic_id.clone()));
            promote_epic(ctx, resumed);
            Step::to(State::Observe, "resume_plan_loaded").emit(K::DefineObservationTargets)
        }

        (State::Idle, Event::UserInput { text }) => Step::to(State::Intake, "user_input")
            .emit(Command::new(K::ParseIntake).with("text", text.as_str())),

        (
            State::Intake,
            Event::IntakeCompleted {
                confidence,
                conflict,
                epic_id,
            },
        ) => {
            ctx.confidence = *confidence;
            if *conflict {
                ctx.pending_epic_id = epic_id.clone();
            } else if epic_id.is_some() {
                ctx.current_epic_id = epic_id.clone();
            }

            if Context::is_low_confidence(ctx.confidence) {
                Step::to(State::AskSwitch, "low_confidence").emit(clarify(ctx))
            } else if *conflict {
                Step::to(State::AskSwitch, "intake_conflict").emit(
                    Command::new(K::AskSwitchOrMerge)
                        .with("current_epic_id", opt_json(&ctx.current_epic_id))
                        .with("pending_epic_id", opt_json(&ctx.pending_epic_id)),
                )
            } else {
                Step::to(State::EpicSync, "intake_ready").emit(upsert_epic(ctx))
            }
        }

        (State::AskSwitch, Event::SwitchResolved { confidence, epic_id }) => {
            ctx.confidence = confidence.unwrap_or(ctx.confidence);
            if epic_id.is_some() {
                promote_epic(ctx, epic_id.clone());
            }
            if Context::is_low_confidence(ctx.confidence) {
                Step::to(State::AskSwitch, "low_confidence").emit(clarify(ctx))
            } else {
                Step::to(State::EpicSync, "switch_resolved").emit(upsert_epic(ctx))
            }
        }

        (State::EpicSync, Event::EpicSynced { epic_id }) => {
            if epic_id.is_some() {
                promote_epic(ctx, epic_id.clone());
            }
            ctx.reviewer_feedback_count = 0;
            Step::to(State::PlanBaseline, "epic_synced").emit(K::BuildPlanBaseline)
        }

        (
            State::PlanBaseline,
            Event::PlanBaselined {
                confidence,
                need_plan_review,
            },
        ) => {
            ctx.confidence = *confidence;
            if Context::is_low_confidence(ctx.confidence) {
                Step::to(State::AskSwitch, "low_confidence").emit(clarify(ctx))
            } else if *need_plan_review {
                Step::to(State::PlanReview, "plan_review_required").emit(K::RequestPlanReview)
            } else {
                Step::to(State::Observe, "plan_baselined").emit(K::DefineObservationTargets)
            }
        }

        (State::PlanReview, Event::PlanReviewPass) => {
            ctx.reviewer_feedback_count = 0;
            Step::to(State::Observe, "plan_review_passed").emit(K::DefineObservationTargets)
        }
        (State::PlanReview, Event::PlanReviewFeedback { blocking: true }) => {
            ctx.reviewer_feedback_count = 0;
            Step::to(State::PlanBaseline, "blocking_feedback").emit(K::BuildPlanBaseline)
        }
        (State::PlanReview, Event::PlanReviewFeedback { blocking: false }) => {
            let rounds = ctx.reviewer_feedback_count.saturating_add(1);
            if rounds >= ctx.max_reviewer_feedback_count {
                ctx.reviewer_feedback_count = 0;
                Step::to(State::Observe, "feedback_bound_reached")
                    .emit(K::DefineObservationTargets)
            } else {
                ctx.reviewer_feedback_count = rounds;
                Step::to(State::PlanReview, "non_blocking_feedback")
                    .emit(K::ApplyNonBlockingFeedback)
            }
        }

        (State::Observe, Event::ObserveDefined { research_expected }) => {
            let expected = research_expected.unwrap_or(1).max(1);
            ctx.research_expected = expected;
            ctx.research_received = 0;
            ctx.research_artifacts.clear();
            Step::to(State::ResearchFanout, "research_round_opened")
                .emit(dispatch_research(expected))
        }

        (State::ResearchFanout, Event::ResearchDispatched) => {
            Step::to(State::WaitOthers, "research_dispatched").emit(K::WaitForResearchResults)
        }
        (State::ResearchFanout | State::WaitOthers, Event::ResearchResult { artifact }) => {
            ctx.research_artifacts.push(artifact.clone());
            ctx.research_received = ctx.research_received.saturating_add(1);
            Step::to(State::ResearchIngest, "research_result_received").emit(
                Command::new(K::IngestResearchArtifacts)
                    .with("received", ctx.research_received)
                    .with("expected", ctx.research_expected)
                    .with("artifact", to_json(artifact)),
            )
        }

        (State::ResearchIngest, Event::ResearchIngested) => {
            Step::to(State::ResearchEval, "research_ingested").emit(K::EvaluateResearchSufficiency)
        }

        (State::ResearchEval, Event::ResearchEvaluated { decision, missing }) => match decision {
            ResearchDecision::NeedReplan => {
                ctx.reviewer_feedback_count = 0;
                Step::to(State::PlanBaseline, "research_needs_replan").emit(K::BuildPlanBaseline)
            }
            ResearchDecision::NeedMoreResults => {
                let missing = missing.unwrap_or_else(|| ctx.research_missing());
                if missing > 0 {
                    Step::to(State::ResearchFanout, "research_refanout")
                        .emit(dispatch_research(missing))
                } else {
                    Step::to(State::WaitOthers, "research_pending")
                        .emit(K::WaitForResearchResults)
                }
            }
            ResearchDecision::EnoughInfo => {
                Step::to(State::DetailDesign, "research_sufficient").emit(K::BuildDetailDesign)
            }
        },

        (State::DetailDesign, Event::DetailDesigned) => {
            Step::to(State::CoderHandoff, "detail_designed").emit(K::PrepareCoderHandoff)
        }

        (State::CoderHandoff, Event::CoderHandoffReady) => {
            Step::to(State::Schedule, "coder_handoff_ready").emit(K::ScheduleResources)
        }

        (
            State::Schedule,
            Event::ScheduleDecided {
                confidence,
                resource_busy,
            },
        ) => {
            ctx.confidence = *confidence;
            if Context::is_low_confidence(ctx.confidence) {
                Step::to(State::AskSwitch, "low_confidence").emit(clarify(ctx))
            } else if *resource_busy {
                Step::to(State::Queue, "resource_busy").emit(K::EnqueueWaitingTask)
            } else {
                Step::to(State::Dispatch, "scheduled").emit(K::DispatchCoder)
            }
        }

        (State::Queue, Event::ResourceAvailable) => {
            Step::to(State::Dispatch, "resource_available").emit(K::DispatchCoder)
        }

        (State::Dispatch, Event::DispatchResult { ok: false, error }) => {
            let mut cmd = Command::new(K::ApplyReplanPatch).with("trigger", "dispatch_failed");
            if let Some(error) = error {
                cmd = cmd.with("error", error.as_str());
            }
            Step::to(State::ReplanPatch, "dispatch_failed").emit(cmd)
        }
        (State::Dispatch, Event::DispatchResult { ok: true, .. }) => {
            Step::to(State::CoderExec, "dispatched").emit(K::AwaitCoderOutput)
        }

        (State::CoderExec, Event::CoderResult) => {
            Step::to(State::ReviewAccept, "coder_result").emit(K::RunReviewerExecutorMode)
        }

        // Unsupported claims override whatever the reviewer decided.
        (
            State::ReviewAccept,
            Event::ReviewResult {
                claims_without_evidence,
                ..
            },
        ) if *claims_without_evidence > 0 => {
            Step::to(State::CoderHandoff, "claims_without_evidence").emit(
                Command::new(K::RejectClaimWithoutEvidence)
                    .with("claims_without_evidence", *claims_without_evidence),
            )
        }
        (State::ReviewAccept, Event::ReviewResult { decision, .. }) => match decision {
            ReviewDecision::Retry => {
                Step::to(State::CoderHandoff, "review_retry").emit(K::PrepareCoderHandoff)
            }
            ReviewDecision::Replan => Step::to(State::ReplanPatch, "review_replan")
                .emit(Command::new(K::ApplyReplanPatch).with("trigger", "review_replan")),
            ReviewDecision::Pass => {
                Step::to(State::Complete, "review_passed").emit(K::FinalizeDelivery)
            }
        },

        (State::ReplanPatch, Event::ReplanApplied { confidence }) => {
            ctx.confidence = *confidence;
            if Context::is_low_confidence(ctx.confidence) {
                Step::to(State::AskSwitch, "low_confidence").emit(clarify(ctx))
            } else {
                ctx.reviewer_feedback_count = 0;
                Step::to(State::PlanBaseline, "replan_applied").emit(K::BuildPlanBaseline)
            }
        }

        _ => return None,
    };

    Some(step)
}

fn promote_epic(ctx: &mut Context, epic_id: Option<String>) {
    if epic_id.is_some() {
        ctx.current_epic_id = epic_id;
    }
    ctx.pending_epic_id = None;
}

fn clarify(ctx: &Context) -> Command {
    Command::new(CommandKind::ClarifyLowConfidence)
        .with("confidence", ctx.confidence)
        .with("threshold", LOW_CONFIDENCE_THRESHOLD)
}

fn upsert_epic(ctx: &Context) -> Command {
    Command::new(CommandKind::BdUpsertEpicAndTasks).with("epic_id", opt_json(&ctx.current_epic_id))
}

fn load_resume_queue(ctx: &Context) -> Command {
    Command::new(CommandKind::LoadResumeQueue).with("queue", to_json(&ctx.resume_queue))
}

fn dispatch_research(slots: u32) -> Command {
    Command::new(CommandKind::DispatchResearchAgents).with("slots", slots)
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn opt_json(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, Value::from)
}
