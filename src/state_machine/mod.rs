mod command;
mod context;
mod event;
mod machine;
mod state;
mod transition;

pub use command::{Command, CommandKind};
pub use context::{
    Context, DEFAULT_MAX_REVIEWER_FEEDBACK_COUNT, LOW_CONFIDENCE_THRESHOLD, ResearchArtifactRef,
    ResumeCandidate,
};
pub use event::{Event, ResearchDecision, ReviewDecision};
pub use machine::StateMachine;
pub use state::{State, UnknownState};
pub use transition::{Snapshot, TransitionResult, transition};
