use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::application::use_cases::report_schema::{detect_field, normalize_header, ReportField};
use crate::domain::goal_area::GoalArea;
use crate::domain::grade::GradeLevel;
use crate::domain::student::{derive_initials, ParsedStudent};

/// Column indices resolved from one header row. A sheet may resolve a new
/// mapping mid-stream when a later logical table starts.
#[derive(Debug, Clone)]
pub(super) struct ColumnMap {
    first_name_idx: Option<usize>,
    last_name_idx: Option<usize>,
    full_name_idx: Option<usize>,
    initials_idx: Option<usize>,
    grade_idx: Option<usize>,
    school_idx: Option<usize>,
    area_idx: Option<usize>,
    iep_date_idx: Option<usize>,
    goal_idxs: Vec<usize>,
}

/// What one data row decoded into.
#[derive(Debug)]
pub(super) enum RowOutcome {
    Student(ParsedStudent),
    /// Goals on a row whose name cells are empty: the continuation of a
    /// merged student cell spanning several goal rows.
    Continuation(Vec<String>),
    /// Blank padding or footer noise.
    Skip,
    Error(String),
}

impl ColumnMap {
    pub(super) fn from_header(header: &[String]) -> Self {
        let mut mapping = Self {
            first_name_idx: None,
            last_name_idx: None,
            full_name_idx: None,
            initials_idx: None,
            grade_idx: None,
            school_idx: None,
            area_idx: None,
            iep_date_idx: None,
            goal_idxs: Vec::new(),
        };

        for (idx, name) in header.iter().enumerate() {
            let key = normalize_header(name);
            if key.is_empty() {
                continue;
            }

            match detect_field(&key) {
                Some(ReportField::FirstName) if mapping.first_name_idx.is_none() => {
                    mapping.first_name_idx = Some(idx);
                }
                Some(ReportField::LastName) if mapping.last_name_idx.is_none() => {
                    mapping.last_name_idx = Some(idx);
                }
                Some(ReportField::FullName) if mapping.full_name_idx.is_none() => {
                    mapping.full_name_idx = Some(idx);
                }
                Some(ReportField::Initials) if mapping.initials_idx.is_none() => {
                    mapping.initials_idx = Some(idx);
                }
                Some(ReportField::Grade) if mapping.grade_idx.is_none() => {
                    mapping.grade_idx = Some(idx);
                }
                Some(ReportField::School) if mapping.school_idx.is_none() => {
                    mapping.school_idx = Some(idx);
                }
                Some(ReportField::GoalArea) if mapping.area_idx.is_none() => {
                    mapping.area_idx = Some(idx);
                }
                Some(ReportField::IepDate) if mapping.iep_date_idx.is_none() => {
                    mapping.iep_date_idx = Some(idx);
                }
                Some(ReportField::Goal) => mapping.goal_idxs.push(idx),
                _ => {}
            }
        }

        mapping
    }

    /// A mapping is usable when some name source resolved.
    pub(super) fn has_name_source(&self) -> bool {
        self.first_name_idx.is_some()
            || self.last_name_idx.is_some()
            || self.full_name_idx.is_some()
            || self.initials_idx.is_some()
    }

    pub(super) fn has_goal_column(&self) -> bool {
        !self.goal_idxs.is_empty()
    }

    /// Decode one data row through this mapping.
    pub(super) fn extract(
        &self,
        row: &[String],
        sheet: &str,
        row_number: usize,
        max_goals_per_cell: usize,
    ) -> RowOutcome {
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let mut first_name = cell(self.first_name_idx);
        let mut last_name = cell(self.last_name_idx);

        if first_name.is_none() && last_name.is_none() {
            if let Some(full) = cell(self.full_name_idx) {
                let (first, last) = split_name(&full);
                first_name = first;
                last_name = last;
            }
        }

        let explicit_initials = cell(self.initials_idx);
        let initials = explicit_initials.unwrap_or_else(|| {
            derive_initials(first_name.as_deref(), last_name.as_deref())
        });

        let mut goals = Vec::new();
        for &idx in &self.goal_idxs {
            if let Some(cell_value) = row.get(idx) {
                goals.extend(split_goal_cell(cell_value, max_goals_per_cell));
            }
        }

        let grade_level = cell(self.grade_idx).map(|raw| GradeLevel::parse(&raw));
        let school_site = cell(self.school_idx);
        let iep_date = cell(self.iep_date_idx).and_then(|raw| parse_report_date(&raw));

        let has_identity = last_name.is_some() || !initials.is_empty();
        let has_substance = !goals.is_empty()
            || grade_level.is_some()
            || school_site.is_some()
            || iep_date.is_some();

        if !has_identity && !has_substance {
            // Blank padding between logical tables.
            return RowOutcome::Skip;
        }
        if !has_identity {
            if !goals.is_empty() && grade_level.is_none() {
                return RowOutcome::Continuation(goals);
            }
            return RowOutcome::Error(format!(
                "sheet '{}' row {}: row has goal or grade data but no student name or initials",
                sheet, row_number
            ));
        }
        if !has_substance {
            // Name-ish cell with nothing else: merged-cell remnant or a
            // footer line ("Total students: 12").
            return RowOutcome::Skip;
        }

        RowOutcome::Student(ParsedStudent {
            first_name,
            last_name,
            initials,
            grade_level,
            school_site,
            goals,
            iep_date,
            source_sheet: sheet.to_string(),
            source_row: row_number,
        })
    }

    /// Area of this row's goals: explicit column first, else inferred from
    /// the goal text itself.
    pub(super) fn goal_area(&self, row: &[String], goal_text: &str) -> GoalArea {
        if let Some(token) = self
            .area_idx
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            return GoalArea::from_column_token(token);
        }
        GoalArea::infer(goal_text)
    }
}

/// Split a combined name cell: "Last, First" or "First [Middle] Last".
pub(super) fn split_name(full: &str) -> (Option<String>, Option<String>) {
    let trimmed = full.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    if let Some((last, first)) = trimmed.split_once(',') {
        let first = first.trim();
        let last = last.trim();
        return (
            (!first.is_empty()).then(|| first.to_string()),
            (!last.is_empty()).then(|| last.to_string()),
        );
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    match parts.as_slice() {
        [] => (None, None),
        [only] => (None, Some((*only).to_string())),
        [first, .., last] => (Some((*first).to_string()), Some((*last).to_string())),
    }
}

static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-–*•]+|\d+[.)])\s*").expect("bullet prefix pattern"));

/// Split a multi-goal cell into separate goal strings. Goals are commonly
/// newline- or bullet-delimited within one cell; purely-whitespace
/// fragments are absent values, not zero-length goals.
pub(super) fn split_goal_cell(cell: &str, max_goals: usize) -> Vec<String> {
    cell.split('\n')
        .flat_map(|line| line.split('•'))
        .map(|fragment| BULLET_PREFIX.replace(fragment, "").trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .take(max_goals)
        .collect()
}

/// Parse the date formats case-management systems actually export.
pub(super) fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // Workbook cells sometimes render as a full datetime.
    if let Some((date_part, _)) = s.split_once(' ') {
        for format in ["%Y-%m-%d", "%m/%d/%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
                return Some(date);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_map_resolves_synonyms() {
        let mapping = ColumnMap::from_header(&header(&["Student Name", "Gr", "Goal(s)", "Site"]));
        assert!(mapping.has_name_source());
        assert!(mapping.has_goal_column());
        assert_eq!(mapping.full_name_idx, Some(0));
        assert_eq!(mapping.grade_idx, Some(1));
        assert_eq!(mapping.goal_idxs, vec![2]);
        assert_eq!(mapping.school_idx, Some(3));
    }

    #[test]
    fn test_column_map_multiple_goal_columns() {
        let mapping = ColumnMap::from_header(&header(&["Last", "First", "Goal 1", "Goal 2"]));
        assert_eq!(mapping.goal_idxs, vec![2, 3]);
        assert_eq!(mapping.last_name_idx, Some(0));
        assert_eq!(mapping.first_name_idx, Some(1));
    }

    #[test]
    fn test_split_name_variants() {
        assert_eq!(
            split_name("Doe, Jane"),
            (Some("Jane".to_string()), Some("Doe".to_string()))
        );
        assert_eq!(
            split_name("Jane Doe"),
            (Some("Jane".to_string()), Some("Doe".to_string()))
        );
        assert_eq!(
            split_name("Jane Marie Doe"),
            (Some("Jane".to_string()), Some("Doe".to_string()))
        );
        assert_eq!(split_name("Doe"), (None, Some("Doe".to_string())));
        assert_eq!(split_name("   "), (None, None));
    }

    #[test]
    fn test_split_goal_cell() {
        let cell = "• Will read 50 wpm\n- Will write a paragraph\n2) Will count to 100\n   \n";
        let goals = split_goal_cell(cell, 50);
        assert_eq!(
            goals,
            vec![
                "Will read 50 wpm",
                "Will write a paragraph",
                "Will count to 100"
            ]
        );
    }

    #[test]
    fn test_split_goal_cell_whitespace_is_absent() {
        assert!(split_goal_cell("   \n  \t ", 50).is_empty());
    }

    #[test]
    fn test_split_goal_cell_caps_fragments() {
        let cell = "a\nb\nc\nd";
        assert_eq!(split_goal_cell(cell, 2).len(), 2);
    }

    #[test]
    fn test_extract_blank_row_skips() {
        let mapping = ColumnMap::from_header(&header(&["Student", "Grade", "Goals"]));
        let row = vec!["".to_string(), "  ".to_string(), "".to_string()];
        assert!(matches!(
            mapping.extract(&row, "Sheet1", 3, 50),
            RowOutcome::Skip
        ));
    }

    #[test]
    fn test_extract_goal_only_row_is_continuation() {
        let mapping = ColumnMap::from_header(&header(&["Student", "Grade", "Goals"]));
        let row = vec![
            "".to_string(),
            "".to_string(),
            "Will write a paragraph.".to_string(),
        ];
        match mapping.extract(&row, "Sheet1", 3, 50) {
            RowOutcome::Continuation(goals) => {
                assert_eq!(goals, vec!["Will write a paragraph."]);
            }
            other => panic!("expected continuation, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_goals_without_identity_is_error() {
        let mapping = ColumnMap::from_header(&header(&["Student", "Grade", "Goals"]));
        let row = vec![
            "".to_string(),
            "3".to_string(),
            "Will read 50 wpm".to_string(),
        ];
        assert!(matches!(
            mapping.extract(&row, "Sheet1", 4, 50),
            RowOutcome::Error(_)
        ));
    }

    #[test]
    fn test_extract_derives_initials() {
        let mapping = ColumnMap::from_header(&header(&["Student", "Grade", "Goals"]));
        let row = vec![
            "Doe, Jane".to_string(),
            "3".to_string(),
            "Will read 50 wpm".to_string(),
        ];
        match mapping.extract(&row, "Sheet1", 2, 50) {
            RowOutcome::Student(student) => {
                assert_eq!(student.initials, "J.D.");
                assert_eq!(student.first_name.as_deref(), Some("Jane"));
                assert_eq!(student.last_name.as_deref(), Some("Doe"));
                assert_eq!(student.grade_level, Some(GradeLevel::Grade(3)));
                assert_eq!(student.goals.len(), 1);
            }
            other => panic!("expected student, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        assert_eq!(parse_report_date("2025-09-15"), Some(expected));
        assert_eq!(parse_report_date("09/15/2025"), Some(expected));
        assert_eq!(parse_report_date("2025-09-15 00:00:00"), Some(expected));
        assert_eq!(parse_report_date("last fall"), None);
    }
}
