use serde::{Deserialize, Deserializer, Serialize};

/// Confidence below this value forces a clarification detour through `ask_switch`.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Non-blocking plan-review rounds allowed before forcing progress into `observe`.
pub const DEFAULT_MAX_REVIEWER_FEEDBACK_COUNT: u32 = 3;

/// A prior epic that can be resumed instead of starting from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCandidate {
    pub epic_id: String,
    /// Lower value means higher priority.
    pub priority: i64,
    /// ISO 8601 timestamp or epoch milliseconds (string or number).
    /// Unparsable values rank as epoch 0.
    #[serde(deserialize_with = "deserialize_updated_at")]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<Vec<String>>,
}

impl ResumeCandidate {
    /// A candidate with no blockers can be executed right away.
    pub fn is_executable(&self) -> bool {
        self.blocked_by.as_ref().is_none_or(|ids| ids.is_empty())
    }
}

// Numeric epoch milliseconds are kept as their decimal string.
fn deserialize_updated_at<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Millis(ms) => ms.to_string(),
    })
}

/// Where a research agent left its outputs. Never dereferenced by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchArtifactRef {
    pub agent_id: String,
    pub summary_path: String,
    pub memory_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_log_path: Option<String>,
}

/// Mutable bookkeeping owned by one state machine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub auto_resume: bool,
    pub confidence: f64,
    pub current_epic_id: Option<String>,
    pub pending_epic_id: Option<String>,
    pub resume_candidates: Vec<ResumeCandidate>,
    pub resume_queue: Vec<ResumeCandidate>,
    pub reviewer_feedback_count: u32,
    pub max_reviewer_feedback_count: u32,
    pub research_expected: u32,
    pub research_received: u32,
    pub research_artifacts: Vec<ResearchArtifactRef>,
    pub last_error: Option<String>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            auto_resume: false,
            confidence: 0.0,
            current_epic_id: None,
            pending_epic_id: None,
            resume_candidates: Vec::new(),
            resume_queue: Vec::new(),
            reviewer_feedback_count: 0,
            max_reviewer_feedback_count: DEFAULT_MAX_REVIEWER_FEEDBACK_COUNT,
            research_expected: 0,
            research_received: 0,
            research_artifacts: Vec::new(),
            last_error: None,
        }
    }
}

impl Context {
    /// True when `confidence` is too low to proceed without clarification.
    pub fn is_low_confidence(confidence: f64) -> bool {
        confidence < LOW_CONFIDENCE_THRESHOLD
    }

    /// Research results still outstanding for the current round.
    pub fn research_missing(&self) -> u32 {
        self.research_expected.saturating_sub(self.research_received)
    }
}
