use serde::{Deserialize, Serialize};

use super::grade::GradeLevel;
use super::matching::MatchConfidence;
use super::roster::RosterStudent;
use super::scrub::ScrubbedGoal;

/// One roster student, its match provenance, and its scrubbed goals.
///
/// Parsed rows that matched the same roster student (duplicate rows across
/// sheets) are merged into one of these; goals dedup by scrubbed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMatch {
    pub student: RosterStudent,
    pub confidence: MatchConfidence,
    pub reason: String,
    pub goals: Vec<ScrubbedGoal>,
}

/// A parsed student no roster record claimed, surfaced for human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedStudent {
    pub initials: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeLevel>,
    pub reason: String,
}

/// Import-level counts for the review UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_parsed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

/// The payload handed to the upload/review UI. Raw pre-scrub text never
/// crosses this boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    #[serde(default)]
    pub matches: Vec<ProcessedMatch>,
    pub summary: ImportSummary,
    pub parse_errors: Vec<String>,
    pub parse_warnings: Vec<String>,
    pub scrub_errors: Vec<String>,
    pub unmatched_students: Vec<UnmatchedStudent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scrub::{PiiCategory, ScrubConfidence};

    #[test]
    fn test_preview_serializes_camel_case() {
        let preview = ImportPreview {
            matches: vec![ProcessedMatch {
                student: RosterStudent {
                    id: "s1".to_string(),
                    initials: "J.D.".to_string(),
                    grade_level: GradeLevel::Grade(3),
                    first_name: None,
                    last_name: None,
                },
                confidence: MatchConfidence::Medium,
                reason: "initials and grade match".to_string(),
                goals: vec![ScrubbedGoal {
                    original: None,
                    scrubbed: "[name] will read.".to_string(),
                    pii_detected: vec![PiiCategory::FirstName],
                    confidence: ScrubConfidence::High,
                }],
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&preview).unwrap();
        assert!(json.contains("\"unmatchedStudents\""));
        assert!(json.contains("\"parseErrors\""));
        assert!(json.contains("\"piiDetected\""));
        assert!(!json.contains("original"));
    }
}
