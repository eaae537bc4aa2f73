//! Ranking of resumable epics found at boot.
//!
//! [`sort_resume_candidates`] produces a total order so the state machine can
//! either resume the head of the list or offer the whole list to the user.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::state_machine::ResumeCandidate;

/// Parse a candidate timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, zone-less ISO 8601 date-times and bare dates (both
/// read as UTC), or an integer of epoch milliseconds. Anything else is
/// treated as epoch 0.
pub fn parse_updated_at(raw: &str) -> i64 {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.timestamp_millis();
    }
    if let Some(ts) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return ts.and_utc().timestamp_millis();
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return midnight.and_utc().timestamp_millis();
    }
    raw.parse::<i64>().unwrap_or(0)
}

/// Compare two candidates by resume preference.
///
/// Order: executable before blocked, ascending priority, most recently
/// updated first, then ascending epic id.
pub fn compare_candidates(a: &ResumeCandidate, b: &ResumeCandidate) -> Ordering {
    b.is_executable()
        .cmp(&a.is_executable())
        .then_with(|| a.priority.cmp(&b.priority))
        .then_with(|| parse_updated_at(&b.updated_at).cmp(&parse_updated_at(&a.updated_at)))
        .then_with(|| a.epic_id.cmp(&b.epic_id))
}

/// Return a new, ranked copy of `candidates`. The input is left untouched.
pub fn sort_resume_candidates(candidates: &[ResumeCandidate]) -> Vec<ResumeCandidate> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(compare_candidates);
    ranked
}
