//! Student Matcher
//!
//! Matches parsed report students to roster records using:
//! - Initials equality (mandatory gate, with a full-name escape hatch)
//! - Grade-level equality with a one-band adjacency fallback
//! - Full-name agreement as the confidence booster, when available
//!
//! The scoring rules are small named predicates combined by an explicit
//! tier table rather than one opaque score, so each rule stays unit
//! testable and every decision carries a human-readable reason. Pure and
//! deterministic: identical inputs always produce identical results.

use tracing::info;

use crate::domain::matching::{MatchConfidence, MatchOutcome, MatchResult, MatchSummary};
use crate::domain::roster::RosterStudent;
use crate::domain::student::{normalize_initials, ParsedStudent};

/// Match every parsed student against the roster. Every input yields
/// exactly one `MatchResult`, possibly with confidence `none`.
pub fn match_students(parsed: &[ParsedStudent], roster: &[RosterStudent]) -> MatchOutcome {
    let matches: Vec<MatchResult> = parsed
        .iter()
        .map(|student| match_one(student, roster))
        .collect();

    let summary = MatchSummary::from_matches(&matches);
    info!(
        total = matches.len(),
        high = summary.high_confidence,
        medium = summary.medium_confidence,
        low = summary.low_confidence,
        none = summary.no_match,
        "roster matching complete"
    );

    MatchOutcome { matches, summary }
}

/// Candidate evaluation for one roster student, before tie-breaking.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    roster: &'a RosterStudent,
    confidence: MatchConfidence,
    note: String,
}

fn match_one(student: &ParsedStudent, roster: &[RosterStudent]) -> MatchResult {
    let display_initials = if student.initials.is_empty() {
        "?".to_string()
    } else {
        student.initials.clone()
    };

    // Gate: initials must agree, unless full names agree exactly on both
    // sides (covers inconsistent initials formatting in source reports).
    let admitted: Vec<&RosterStudent> = roster
        .iter()
        .filter(|candidate| {
            initials_equal(&student.initials, &candidate.initials)
                || full_name_equal(student, candidate)
        })
        .collect();

    if admitted.is_empty() {
        return MatchResult {
            student: student.clone(),
            matched: None,
            confidence: MatchConfidence::None,
            reason: format!("no roster student shares initials {}", display_initials),
        };
    }

    // Same-grade candidates outrank adjacent-grade ones, which outrank
    // grade conflicts. The adjacency band only applies when no same-grade
    // candidate exists at all.
    let same_grade: Vec<&RosterStudent> = admitted
        .iter()
        .copied()
        .filter(|c| grade_equal(student, c))
        .collect();
    let adjacent_grade: Vec<&RosterStudent> = admitted
        .iter()
        .copied()
        .filter(|c| grade_adjacent(student, c))
        .collect();

    let pool: Vec<Candidate> = if !same_grade.is_empty() {
        same_grade
            .into_iter()
            .map(|c| evaluate_same_grade(student, c))
            .collect()
    } else if !adjacent_grade.is_empty() {
        adjacent_grade
            .into_iter()
            .map(|c| evaluate_adjacent_grade(student, c))
            .collect()
    } else {
        admitted
            .into_iter()
            .map(|c| evaluate_grade_conflict(student, c))
            .collect()
    };

    resolve(student, pool)
}

fn evaluate_same_grade<'a>(student: &ParsedStudent, roster: &'a RosterStudent) -> Candidate<'a> {
    if full_name_equal(student, roster) {
        let note = if initials_equal(&student.initials, &roster.initials) {
            "initials, grade and full name all match".to_string()
        } else {
            "full name and grade match exactly (initials formatted differently)".to_string()
        };
        return Candidate {
            roster,
            confidence: MatchConfidence::High,
            note,
        };
    }

    if roster.full_name().is_some() && student.full_name().is_some() {
        // Both sides carry a complete name and they disagree: evidence
        // against, force human review. A partial roster name is merely
        // unverifiable and falls through to medium.
        return Candidate {
            roster,
            confidence: MatchConfidence::Low,
            note: "initials and grade match but the roster name disagrees with the report"
                .to_string(),
        };
    }

    // Initials collisions across a grade are common, so a match that
    // cannot be name-verified never exceeds medium.
    let note = if roster.full_name().is_none() {
        "initials and grade match; roster stores initials only, name unverified"
    } else {
        "initials and grade match; report carries no full name, name unverified"
    };
    Candidate {
        roster,
        confidence: MatchConfidence::Medium,
        note: note.to_string(),
    }
}

fn evaluate_adjacent_grade<'a>(student: &ParsedStudent, roster: &'a RosterStudent) -> Candidate<'a> {
    if roster.full_name().is_some()
        && student.full_name().is_some()
        && !full_name_equal(student, roster)
    {
        return Candidate {
            roster,
            confidence: MatchConfidence::Low,
            note: "initials match an adjacent grade but the roster name disagrees".to_string(),
        };
    }

    let grades = grade_pair(student, roster);
    Candidate {
        roster,
        confidence: MatchConfidence::Medium,
        note: format!(
            "initials match; {} (adjacent band, no same-grade candidate)",
            grades
        ),
    }
}

fn evaluate_grade_conflict<'a>(student: &ParsedStudent, roster: &'a RosterStudent) -> Candidate<'a> {
    let grades = grade_pair(student, roster);
    Candidate {
        roster,
        confidence: MatchConfidence::Low,
        note: format!("initials match but {}", grades),
    }
}

/// Tie-break table: best tier wins; within a tier prefer the candidate
/// carrying name data (more verifiable); a still-unresolved tie is marked
/// ambiguous and downgraded to low, naming every tied candidate, so a
/// human reviews instead of the system silently guessing.
fn resolve(student: &ParsedStudent, pool: Vec<Candidate<'_>>) -> MatchResult {
    let best_rank = pool.iter().map(|c| c.confidence.rank()).max().unwrap_or(0);
    let mut best: Vec<Candidate> = pool
        .into_iter()
        .filter(|c| c.confidence.rank() == best_rank)
        .collect();

    if best.len() > 1 {
        let mut named: Vec<&Candidate> = best.iter().filter(|c| c.roster.has_name()).collect();
        if named.len() == 1 {
            let winner = named.remove(0);
            return MatchResult {
                student: student.clone(),
                matched: Some(winner.roster.clone()),
                confidence: winner.confidence,
                reason: format!(
                    "{}; preferred over same-score candidates lacking name data",
                    winner.note
                ),
            };
        }

        let ids: Vec<&str> = best.iter().map(|c| c.roster.id.as_str()).collect();
        let reason = format!(
            "ambiguous: {} roster students tie ({}); review required",
            ids.len(),
            ids.join(", ")
        );
        let first = best.remove(0);
        return MatchResult {
            student: student.clone(),
            matched: Some(first.roster.clone()),
            confidence: MatchConfidence::Low,
            reason,
        };
    }

    match best.pop() {
        Some(winner) => MatchResult {
            student: student.clone(),
            matched: Some(winner.roster.clone()),
            confidence: winner.confidence,
            reason: winner.note,
        },
        // Unreachable: callers only build non-empty pools.
        None => MatchResult {
            student: student.clone(),
            matched: None,
            confidence: MatchConfidence::None,
            reason: "no candidate evaluated".to_string(),
        },
    }
}

// --- predicates -------------------------------------------------------

/// Case-insensitive initials equality over normalized forms.
fn initials_equal(a: &str, b: &str) -> bool {
    let na = normalize_initials(a);
    !na.is_empty() && na == normalize_initials(b)
}

/// Exact full-name equality, case-insensitive and whitespace-trimmed,
/// requiring names on both sides.
fn full_name_equal(student: &ParsedStudent, roster: &RosterStudent) -> bool {
    match (student.full_name(), roster.full_name()) {
        (Some(a), Some(b)) => a.trim().to_lowercase() == b.trim().to_lowercase(),
        _ => false,
    }
}

fn grade_equal(student: &ParsedStudent, roster: &RosterStudent) -> bool {
    student
        .grade_level
        .as_ref()
        .is_some_and(|grade| grade.same_as(&roster.grade_level))
}

fn grade_adjacent(student: &ParsedStudent, roster: &RosterStudent) -> bool {
    student
        .grade_level
        .as_ref()
        .is_some_and(|grade| grade.adjacent_to(&roster.grade_level))
}

fn grade_pair(student: &ParsedStudent, roster: &RosterStudent) -> String {
    let parsed_grade = student
        .grade_level
        .as_ref()
        .map(|g| g.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "report grade {} vs roster grade {}",
        parsed_grade, roster.grade_level
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grade::GradeLevel;

    fn roster_student(id: &str, initials: &str, grade: GradeLevel) -> RosterStudent {
        RosterStudent {
            id: id.to_string(),
            initials: initials.to_string(),
            grade_level: grade,
            first_name: None,
            last_name: None,
        }
    }

    fn named_roster_student(
        id: &str,
        initials: &str,
        grade: GradeLevel,
        first: &str,
        last: &str,
    ) -> RosterStudent {
        RosterStudent {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..roster_student(id, initials, grade)
        }
    }

    fn parsed_student(first: &str, last: &str, initials: &str, grade: GradeLevel) -> ParsedStudent {
        ParsedStudent {
            first_name: (!first.is_empty()).then(|| first.to_string()),
            last_name: (!last.is_empty()).then(|| last.to_string()),
            initials: initials.to_string(),
            grade_level: Some(grade),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_example_is_medium() {
        let roster = vec![roster_student("s1", "J.D.", GradeLevel::Grade(3))];
        let parsed = vec![parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3))];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::Medium);
        assert_eq!(result.matched.as_ref().unwrap().id, "s1");
        assert!(result.reason.contains("name unverified"));
    }

    #[test]
    fn test_name_verified_match_is_high() {
        let roster = vec![named_roster_student(
            "s1",
            "J.D.",
            GradeLevel::Grade(3),
            "Jane",
            "Doe",
        )];
        let parsed = vec![parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3))];

        let outcome = match_students(&parsed, &roster);
        assert_eq!(outcome.matches[0].confidence, MatchConfidence::High);
    }

    #[test]
    fn test_full_name_match_survives_initials_mismatch() {
        // Source report formatted initials differently; full names agree.
        let roster = vec![named_roster_student(
            "s1",
            "JD",
            GradeLevel::Grade(3),
            "Jane",
            "Doe",
        )];
        let parsed = vec![parsed_student(
            "Jane",
            "Doe",
            "J.M.D.",
            GradeLevel::Grade(3),
        )];

        let outcome = match_students(&parsed, &roster);
        assert_eq!(outcome.matches[0].confidence, MatchConfidence::High);
    }

    #[test]
    fn test_no_match_example() {
        let roster = vec![roster_student("s1", "J.D.", GradeLevel::Grade(3))];
        let parsed = vec![parsed_student("Zed", "Zed", "Z.Z.", GradeLevel::Grade(3))];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::None);
        assert!(result.matched.is_none());
        assert!(result.reason.contains("Z.Z."));
    }

    #[test]
    fn test_ambiguous_tie_names_both_candidates() {
        let roster = vec![
            roster_student("s1", "A.B.", GradeLevel::Grade(2)),
            roster_student("s2", "A.B.", GradeLevel::Grade(2)),
        ];
        let parsed = vec![parsed_student("", "Brown", "A.B.", GradeLevel::Grade(2))];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::Low);
        assert!(result.matched.is_some());
        assert!(result.reason.contains("s1"));
        assert!(result.reason.contains("s2"));
    }

    #[test]
    fn test_tie_prefers_candidate_with_name_data() {
        let roster = vec![
            roster_student("s1", "A.B.", GradeLevel::Grade(2)),
            named_roster_student("s2", "A.B.", GradeLevel::Grade(2), "Amy", "Brown"),
        ];
        // Parsed side has no name, so s2 cannot be verified, but it is
        // the more verifiable record.
        let parsed = vec![ParsedStudent {
            initials: "A.B.".to_string(),
            grade_level: Some(GradeLevel::Grade(2)),
            ..Default::default()
        }];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.matched.as_ref().unwrap().id, "s2");
        assert_eq!(result.confidence, MatchConfidence::Medium);
        assert!(result.reason.contains("preferred over"));
    }

    #[test]
    fn test_adjacent_grade_is_medium_only_without_same_grade_candidate() {
        let roster = vec![
            roster_student("s1", "J.D.", GradeLevel::Grade(4)),
            roster_student("s2", "J.D.", GradeLevel::Grade(3)),
        ];
        let parsed = vec![parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3))];

        // A same-grade candidate exists: the adjacent one is ignored.
        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.matched.as_ref().unwrap().id, "s2");
        assert_eq!(result.confidence, MatchConfidence::Medium);

        // Without it, the adjacent band is tolerated at medium.
        let roster = vec![roster_student("s1", "J.D.", GradeLevel::Grade(4))];
        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::Medium);
        assert!(result.reason.contains("adjacent band"));
    }

    #[test]
    fn test_grade_conflict_is_low() {
        let roster = vec![roster_student("s1", "J.D.", GradeLevel::Grade(7))];
        let parsed = vec![parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3))];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::Low);
        assert!(result.reason.contains("report grade 3 vs roster grade 7"));
    }

    #[test]
    fn test_roster_name_disagreement_is_low() {
        let roster = vec![named_roster_student(
            "s1",
            "J.D.",
            GradeLevel::Grade(3),
            "John",
            "Deere",
        )];
        let parsed = vec![parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3))];

        let outcome = match_students(&parsed, &roster);
        let result = &outcome.matches[0];
        assert_eq!(result.confidence, MatchConfidence::Low);
        assert!(result.reason.contains("disagrees"));
    }

    #[test]
    fn test_coverage_invariant() {
        let roster = vec![roster_student("s1", "J.D.", GradeLevel::Grade(3))];
        let parsed = vec![
            parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3)),
            parsed_student("Zed", "Zed", "Z.Z.", GradeLevel::Grade(1)),
            parsed_student("Amy", "Brown", "A.B.", GradeLevel::K),
        ];

        let outcome = match_students(&parsed, &roster);
        assert_eq!(outcome.matches.len(), parsed.len());
        assert_eq!(outcome.summary.total(), parsed.len());
    }

    #[test]
    fn test_matching_is_idempotent() {
        let roster = vec![
            roster_student("s1", "J.D.", GradeLevel::Grade(3)),
            roster_student("s2", "A.B.", GradeLevel::Grade(2)),
            named_roster_student("s3", "A.B.", GradeLevel::Grade(2), "Amy", "Brown"),
        ];
        let parsed = vec![
            parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3)),
            parsed_student("Amy", "Brown", "A.B.", GradeLevel::Grade(2)),
        ];

        let first = match_students(&parsed, &roster);
        let second = match_students(&parsed, &roster);
        assert_eq!(first.summary, second.summary);
        for (a, b) in first.matches.iter().zip(second.matches.iter()) {
            assert_eq!(a.confidence, b.confidence);
            assert_eq!(a.reason, b.reason);
            assert_eq!(
                a.matched.as_ref().map(|m| &m.id),
                b.matched.as_ref().map(|m| &m.id)
            );
        }
    }

    #[test]
    fn test_summary_sums_to_match_count() {
        let roster = vec![
            roster_student("s1", "J.D.", GradeLevel::Grade(3)),
            roster_student("s2", "A.B.", GradeLevel::Grade(2)),
        ];
        let parsed = vec![
            parsed_student("Jane", "Doe", "J.D.", GradeLevel::Grade(3)),
            parsed_student("Amy", "Brown", "A.B.", GradeLevel::Grade(5)),
            parsed_student("Zed", "Zed", "Z.Z.", GradeLevel::Grade(1)),
        ];

        let outcome = match_students(&parsed, &roster);
        let summary = &outcome.summary;
        assert_eq!(
            summary.high_confidence
                + summary.medium_confidence
                + summary.low_confidence
                + summary.no_match,
            outcome.matches.len()
        );
    }
}
