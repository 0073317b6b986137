use serde::{Deserialize, Serialize};

use super::roster::RosterStudent;
use super::student::ParsedStudent;

/// Confidence tier for one match decision, strongest evidence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
    None,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Medium => "medium",
            MatchConfidence::Low => "low",
            MatchConfidence::None => "none",
        }
    }

    /// Ordering for merge decisions: high beats medium beats low.
    pub fn rank(&self) -> u8 {
        match self {
            MatchConfidence::High => 3,
            MatchConfidence::Medium => 2,
            MatchConfidence::Low => 1,
            MatchConfidence::None => 0,
        }
    }
}

/// Output of matching one parsed student against the roster.
///
/// Invariant: `confidence == None` iff `matched.is_none()`.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub student: ParsedStudent,
    pub matched: Option<RosterStudent>,
    pub confidence: MatchConfidence,
    pub reason: String,
}

/// Counts derived from the match list; always sums to `matches.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub no_match: usize,
}

impl MatchSummary {
    pub fn from_matches(matches: &[MatchResult]) -> Self {
        let mut summary = MatchSummary::default();
        for result in matches {
            match result.confidence {
                MatchConfidence::High => summary.high_confidence += 1,
                MatchConfidence::Medium => summary.medium_confidence += 1,
                MatchConfidence::Low => summary.low_confidence += 1,
                MatchConfidence::None => summary.no_match += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.high_confidence + self.medium_confidence + self.low_confidence + self.no_match
    }
}

/// Full matcher output: one result per parsed student plus derived counts.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matches: Vec<MatchResult>,
    pub summary: MatchSummary,
}
