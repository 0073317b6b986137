//! Import Pipeline
//!
//! The orchestrator the import endpoint calls: parse the uploaded buffer,
//! match every parsed student against the roster, scrub PII out of the
//! matched students' goals, merge duplicate rows, and assemble the
//! preview payload a human reviews before anything is committed.
//!
//! Scrubbing fans out per matched student; a failing task is collected
//! into `scrub_errors` and never cancels sibling work. The raw pre-scrub
//! goal text is discarded before the payload boundary.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::domain::error::Result;
use crate::domain::matching::{MatchConfidence, MatchResult};
use crate::domain::preview::{ImportPreview, ImportSummary, ProcessedMatch, UnmatchedStudent};
use crate::domain::report::{ImportOptions, ParserConfig};
use crate::domain::roster::RosterStudent;
use crate::domain::scrub::{ScrubConfig, ScrubOutcome};

use super::pii_scrubber::PiiScrubber;
use super::report_parser::ReportParser;
use super::student_matcher::match_students;

pub struct ImportPipeline {
    parser: ReportParser,
    scrubber: Arc<PiiScrubber>,
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(ParserConfig::default(), ScrubConfig::default())
    }
}

impl ImportPipeline {
    pub fn new(parser_config: ParserConfig, scrub_config: ScrubConfig) -> Self {
        Self {
            parser: ReportParser::new(parser_config),
            scrubber: Arc::new(PiiScrubber::new(scrub_config)),
        }
    }

    /// Run the full parse -> match -> scrub pipeline on one uploaded
    /// buffer. Fails hard only when the container itself is unreadable;
    /// everything else degrades into the preview's error lists.
    pub async fn process(
        &self,
        buffer: &[u8],
        roster: &[RosterStudent],
        options: &ImportOptions,
    ) -> Result<ImportPreview> {
        let parse_outcome = self.parser.parse(buffer, options)?;
        let total_parsed = parse_outcome.students.len();

        let match_outcome = match_students(&parse_outcome.students, roster);

        let mut parse_warnings = parse_outcome.warnings;
        let matches = self.apply_target_filter(
            match_outcome.matches,
            roster,
            options,
            &mut parse_warnings,
        );

        let (matches, mut scrub_errors) = self.scrub_matches(matches).await;

        let summary = build_summary(total_parsed, &matches);
        let unmatched_students = collect_unmatched(&matches);
        let processed = merge_matches(matches, &mut scrub_errors);

        info!(
            total_parsed,
            matched = summary.matched,
            unmatched = summary.unmatched,
            scrub_errors = scrub_errors.len(),
            "import preview assembled"
        );

        Ok(ImportPreview {
            matches: processed,
            summary,
            parse_errors: parse_outcome.errors,
            parse_warnings,
            scrub_errors,
            unmatched_students,
        })
    }

    /// Narrow the output to one roster student when the caller asked for
    /// it (disambiguation flows). Applied after matching because only the
    /// roster knows ids.
    fn apply_target_filter(
        &self,
        matches: Vec<MatchResult>,
        roster: &[RosterStudent],
        options: &ImportOptions,
        warnings: &mut Vec<String>,
    ) -> Vec<MatchResult> {
        let Some(target_id) = options
            .target_student_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            return matches;
        };

        if !roster.iter().any(|student| student.id == target_id) {
            warnings.push(format!(
                "target student id '{}' is not on the roster; filter ignored",
                target_id
            ));
            return matches;
        }

        let before = matches.len();
        let retained: Vec<MatchResult> = matches
            .into_iter()
            .filter(|result| {
                result
                    .matched
                    .as_ref()
                    .is_some_and(|student| student.id == target_id)
            })
            .collect();

        if retained.is_empty() {
            warnings.push(format!(
                "target student id '{}' did not match any parsed row",
                target_id
            ));
        } else if retained.len() < before {
            warnings.push(format!(
                "target student filter retained {} of {} matched rows",
                retained.len(),
                before
            ));
        }

        retained
    }

    /// Fan out scrubbing per matched student and join the results.
    /// A panicking or failing task only loses that student's goals;
    /// sibling tasks complete normally.
    async fn scrub_matches(
        &self,
        matches: Vec<MatchResult>,
    ) -> (Vec<(MatchResult, Option<ScrubOutcome>)>, Vec<String>) {
        let mut scrub_errors = Vec::new();
        let mut join_set: JoinSet<(usize, ScrubOutcome)> = JoinSet::new();

        for (index, result) in matches.iter().enumerate() {
            if result.confidence == MatchConfidence::None || result.student.goals.is_empty() {
                continue;
            }
            let scrubber = Arc::clone(&self.scrubber);
            let goals = result.student.goals.clone();
            let first = result.student.first_name.clone();
            let last = result.student.last_name.clone();
            join_set.spawn(async move {
                let outcome = scrubber.scrub_goals(&goals, first.as_deref(), last.as_deref());
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<ScrubOutcome>> = vec![None; matches.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => {
                    warn!(error = %err, "scrub task failed; student goals omitted");
                    scrub_errors.push(
                        "a scrub task failed; the affected student's goals were omitted"
                            .to_string(),
                    );
                }
            }
        }

        (matches.into_iter().zip(outcomes).collect(), scrub_errors)
    }
}

fn build_summary(
    total_parsed: usize,
    matches: &[(MatchResult, Option<ScrubOutcome>)],
) -> ImportSummary {
    let mut summary = ImportSummary {
        total_parsed,
        ..Default::default()
    };
    for (result, _) in matches {
        match result.confidence {
            MatchConfidence::High => {
                summary.matched += 1;
                summary.high_confidence += 1;
            }
            MatchConfidence::Medium => {
                summary.matched += 1;
                summary.medium_confidence += 1;
            }
            MatchConfidence::Low => {
                summary.matched += 1;
                summary.low_confidence += 1;
            }
            MatchConfidence::None => summary.unmatched += 1,
        }
    }
    summary
}

fn collect_unmatched(matches: &[(MatchResult, Option<ScrubOutcome>)]) -> Vec<UnmatchedStudent> {
    matches
        .iter()
        .filter(|(result, _)| result.confidence == MatchConfidence::None)
        .map(|(result, _)| UnmatchedStudent {
            initials: result.student.initials.clone(),
            grade: result.student.grade_level.clone(),
            reason: result.reason.clone(),
        })
        .collect()
}

/// Merge matched rows that resolved to the same roster student (duplicate
/// rows across sheets) into one `ProcessedMatch`. Goals dedup by scrubbed
/// text; the strongest confidence wins and the reason notes the merge.
/// The transient `original` text is dropped here, before the boundary.
fn merge_matches(
    matches: Vec<(MatchResult, Option<ScrubOutcome>)>,
    scrub_errors: &mut Vec<String>,
) -> Vec<ProcessedMatch> {
    let mut processed: Vec<ProcessedMatch> = Vec::new();
    let mut by_roster_id: HashMap<String, usize> = HashMap::new();
    let mut merged_rows: HashMap<String, usize> = HashMap::new();

    for (result, scrub) in matches {
        let Some(roster_student) = result.matched else {
            continue;
        };

        let initials = result.student.initials.clone();
        let mut goals = Vec::new();
        if let Some(outcome) = scrub {
            for message in outcome.errors {
                scrub_errors.push(format!("student {}: {}", initials, message));
            }
            goals = outcome
                .goals
                .into_iter()
                .map(|goal| goal.without_original())
                .collect();
        }

        match by_roster_id.get(&roster_student.id) {
            Some(&slot) => {
                let entry = &mut processed[slot];
                for goal in goals {
                    if !entry.goals.iter().any(|g| g.scrubbed == goal.scrubbed) {
                        entry.goals.push(goal);
                    }
                }
                if result.confidence.rank() > entry.confidence.rank() {
                    entry.confidence = result.confidence;
                    entry.reason = result.reason;
                }
                *merged_rows.entry(roster_student.id.clone()).or_insert(1) += 1;
            }
            None => {
                by_roster_id.insert(roster_student.id.clone(), processed.len());
                processed.push(ProcessedMatch {
                    student: roster_student,
                    confidence: result.confidence,
                    reason: result.reason,
                    goals,
                });
            }
        }
    }

    for entry in &mut processed {
        if let Some(rows) = merged_rows.get(&entry.student.id) {
            entry.reason = format!("{}; merged {} source rows", entry.reason, rows);
        }
    }

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grade::GradeLevel;

    fn roster() -> Vec<RosterStudent> {
        vec![
            RosterStudent {
                id: "s1".to_string(),
                initials: "J.D.".to_string(),
                grade_level: GradeLevel::Grade(3),
                first_name: None,
                last_name: None,
            },
            RosterStudent {
                id: "s2".to_string(),
                initials: "A.B.".to_string(),
                grade_level: GradeLevel::Grade(2),
                first_name: None,
                last_name: None,
            },
        ]
    }

    const BASIC_CSV: &str = "\
Student,Grade,Goal(s)
\"Doe, Jane\",3,Jane Doe will read 50 words per minute.";

    #[tokio::test]
    async fn test_round_trip_example() {
        let preview = ImportPipeline::default()
            .process(BASIC_CSV.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(preview.matches.len(), 1);
        let processed = &preview.matches[0];
        assert_eq!(processed.student.id, "s1");
        assert_eq!(processed.confidence, MatchConfidence::Medium);
        assert_eq!(
            processed.goals[0].scrubbed,
            "[name] will read 50 words per minute."
        );
    }

    #[tokio::test]
    async fn test_duplicate_rows_merge_and_dedup_goals() {
        let csv = "\
Student,Grade,Goal(s)
\"Doe, Jane\",3,Jane Doe will read 50 words per minute.
Student,Grade,Goal(s)
\"Doe, Jane\",3,\"Jane Doe will read 50 words per minute.\nJane will write daily.\"";
        let preview = ImportPipeline::default()
            .process(csv.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(preview.matches.len(), 1);
        let processed = &preview.matches[0];
        assert_eq!(processed.goals.len(), 2);
        assert!(processed.reason.contains("merged 2 source rows"));
    }

    #[tokio::test]
    async fn test_unmatched_student_listed_not_dropped() {
        let csv = "\
Student,Grade,Goal(s)
\"Zed, Zoe\",1,Zoe will count.";
        let preview = ImportPipeline::default()
            .process(csv.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        assert!(preview.matches.is_empty());
        assert_eq!(preview.unmatched_students.len(), 1);
        assert_eq!(preview.unmatched_students[0].initials, "Z.Z.");
        assert_eq!(preview.summary.unmatched, 1);
        assert_eq!(preview.summary.matched, 0);
    }

    #[tokio::test]
    async fn test_target_filter_restricts_output() {
        let csv = "\
Student,Grade,Goal(s)
\"Doe, Jane\",3,Jane will read.
\"Brown, Amy\",2,Amy will write.";
        let options = ImportOptions {
            target_student_id: Some("s2".to_string()),
            ..Default::default()
        };
        let preview = ImportPipeline::default()
            .process(csv.as_bytes(), &roster(), &options)
            .await
            .unwrap();

        assert_eq!(preview.matches.len(), 1);
        assert_eq!(preview.matches[0].student.id, "s2");
        assert!(preview
            .parse_warnings
            .iter()
            .any(|w| w.contains("retained 1 of 2")));
    }

    #[tokio::test]
    async fn test_unknown_target_is_warning_not_failure() {
        let options = ImportOptions {
            target_student_id: Some("ghost".to_string()),
            ..Default::default()
        };
        let preview = ImportPipeline::default()
            .process(BASIC_CSV.as_bytes(), &roster(), &options)
            .await
            .unwrap();

        assert_eq!(preview.matches.len(), 1);
        assert!(preview
            .parse_warnings
            .iter()
            .any(|w| w.contains("not on the roster")));
    }

    #[tokio::test]
    async fn test_scrub_error_collected_with_initials_context() {
        let csv = "\
Student,Grade,Goal(s)
\"Doe, Jane\",3,Goal for JaneDoe: read 50 wpm.";
        let preview = ImportPipeline::default()
            .process(csv.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(preview.scrub_errors.len(), 1);
        assert!(preview.scrub_errors[0].contains("student J.D."));
        assert!(preview.scrub_errors[0].contains("goal omitted"));
        // The failed goal is omitted, the match itself survives.
        assert_eq!(preview.matches.len(), 1);
        assert!(preview.matches[0].goals.is_empty());
    }

    #[tokio::test]
    async fn test_summary_counts_are_consistent() {
        let csv = "\
Student,Grade,Goal(s)
\"Doe, Jane\",3,Jane will read.
\"Brown, Amy\",2,Amy will write.
\"Zed, Zoe\",1,Zoe will count.";
        let preview = ImportPipeline::default()
            .process(csv.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        let summary = &preview.summary;
        assert_eq!(summary.total_parsed, 3);
        assert_eq!(summary.matched + summary.unmatched, 3);
        assert_eq!(
            summary.high_confidence + summary.medium_confidence + summary.low_confidence,
            summary.matched
        );
    }

    #[tokio::test]
    async fn test_no_original_text_crosses_the_boundary() {
        let preview = ImportPipeline::default()
            .process(BASIC_CSV.as_bytes(), &roster(), &ImportOptions::default())
            .await
            .unwrap();

        for processed in &preview.matches {
            for goal in &processed.goals {
                assert!(goal.original.is_none());
            }
        }
        let json = serde_json::to_string(&preview).unwrap();
        assert!(!json.contains("original"));
        assert!(!json.contains("Jane"));
        assert!(!json.contains("Doe"));
    }
}
