use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The states of the orchestration control plane.
///
/// A run flows roughly: BOOT → IDLE_PROBE_BD → IDLE → INTAKE → EPIC_SYNC →
/// PLAN_BASELINE → OBSERVE → RESEARCH_* → DETAIL_DESIGN → CODER_HANDOFF →
/// SCHEDULE → DISPATCH → CODER_EXEC → REVIEW_ACCEPT → COMPLETE, with detours
/// through ASK_SWITCH, PLAN_REVIEW, QUEUE and REPLAN_PATCH.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Boot,
    IdleProbeBd,
    ResumeAsk,
    ResumePlan,
    Idle,
    Intake,
    AskSwitch,
    EpicSync,
    PlanBaseline,
    PlanReview,
    Observe,
    ResearchFanout,
    WaitOthers,
    ResearchIngest,
    ResearchEval,
    DetailDesign,
    CoderHandoff,
    Schedule,
    Queue,
    Dispatch,
    CoderExec,
    ReviewAccept,
    ReplanPatch,
    Complete,
    Cancelled,
    Failed,
}

impl State {
    /// Every state, in lifecycle order.
    pub const ALL: [State; 26] = [
        State::Boot,
        State::IdleProbeBd,
        State::ResumeAsk,
        State::ResumePlan,
        State::Idle,
        State::Intake,
        State::AskSwitch,
        State::EpicSync,
        State::PlanBaseline,
        State::PlanReview,
        State::Observe,
        State::ResearchFanout,
        State::WaitOthers,
        State::ResearchIngest,
        State::ResearchEval,
        State::DetailDesign,
        State::CoderHandoff,
        State::Schedule,
        State::Queue,
        State::Dispatch,
        State::CoderExec,
        State::ReviewAccept,
        State::ReplanPatch,
        State::Complete,
        State::Cancelled,
        State::Failed,
    ];

    /// Terminal states absorb every event.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Complete | State::Cancelled | State::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Boot => "boot",
            State::IdleProbeBd => "idle_probe_bd",
            State::ResumeAsk => "resume_ask",
            State::ResumePlan => "resume_plan",
            State::Idle => "idle",
            State::Intake => "intake",
            State::AskSwitch => "ask_switch",
            State::EpicSync => "epic_sync",
            State::PlanBaseline => "plan_baseline",
            State::PlanReview => "plan_review",
            State::Observe => "observe",
            State::ResearchFanout => "research_fanout",
            State::WaitOthers => "wait_others",
            State::ResearchIngest => "research_ingest",
            State::ResearchEval => "research_eval",
            State::DetailDesign => "detail_design",
            State::CoderHandoff => "coder_handoff",
            State::Schedule => "schedule",
            State::Queue => "queue",
            State::Dispatch => "dispatch",
            State::CoderExec => "coder_exec",
            State::ReviewAccept => "review_accept",
            State::ReplanPatch => "replan_patch",
            State::Complete => "complete",
            State::Cancelled => "cancelled",
            State::Failed => "failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for State {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_terminal_states() {
        let terminal: Vec<State> = State::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![State::Complete, State::Cancelled, State::Failed]
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(State::Boot.to_string(), "boot");
        assert_eq!(State::IdleProbeBd.to_string(), "idle_probe_bd");
        assert_eq!(State::ReviewAccept.to_string(), "review_accept");
        assert_eq!(State::Failed.to_string(), "failed");
    }

    #[test]
    fn display_and_parse_agree() {
        for state in State::ALL {
            assert_eq!(state.to_string().parse::<State>().unwrap(), state);
        }
        assert!("nowhere".parse::<State>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&State::ResearchFanout).unwrap();
        assert_eq!(json, "\"research_fanout\"");
        let state: State = serde_json::from_str("\"wait_others\"").unwrap();
        assert_eq!(state, State::WaitOthers);
    }
}
