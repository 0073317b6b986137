// Centralized header alias configuration for report dialect detection.
//
// Goal: keep CSV/XLSX header matching flexible without scattering alias
// lists across the parser.

/// Roles a source column can play, resolved once per logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    FirstName,
    LastName,
    FullName,
    Initials,
    Grade,
    School,
    Goal,
    GoalArea,
    IepDate,
}

// NOTE:
// - These aliases are matched against a normalized header (lowercase,
//   punctuation -> underscore, collapsed).
// - Matching strategy:
//   1) exact match
//   2) ends_with("_alias") or starts_with("alias_")
//   3) contains("_alias_")

pub const FIRST_NAME_ALIASES: &[&str] = &["first_name", "first", "fname", "given_name"];

pub const LAST_NAME_ALIASES: &[&str] = &["last_name", "last", "lname", "surname", "family_name"];

pub const FULL_NAME_ALIASES: &[&str] = &[
    "student",
    "student_name",
    "name",
    "child",
    "child_name",
    "pupil",
    "full_name",
];

pub const INITIALS_ALIASES: &[&str] = &["initials", "student_initials", "init"];

pub const GRADE_ALIASES: &[&str] = &["grade", "grade_level", "gr", "class", "year"];

pub const SCHOOL_ALIASES: &[&str] = &[
    "school",
    "school_site",
    "school_name",
    "site",
    "campus",
    "location",
];

pub const GOAL_ALIASES: &[&str] = &[
    "goal",
    "goals",
    "goal_s",
    "annual_goal",
    "iep_goal",
    "objective",
    "objectives",
    "goal_text",
    "goal_description",
    "benchmark",
];

pub const GOAL_AREA_ALIASES: &[&str] = &[
    "area",
    "domain",
    "goal_area",
    "need_area",
    "category",
    "subject",
    "service_area",
];

pub const IEP_DATE_ALIASES: &[&str] = &[
    "iep_date",
    "date",
    "annual_review",
    "review_date",
    "meeting_date",
    "plan_date",
    // NOTE: "iep" alone is intentionally absent, it collides with iep_goal.
];

// Columns about adults (teacher, case manager, guardian) carry names that
// must never be mistaken for the student's. Any header matching one of
// these tokens resolves to no field at all.
pub const NON_STUDENT_TOKENS: &[&str] = &[
    "teacher",
    "provider",
    "case_manager",
    "manager",
    "staff",
    "parent",
    "guardian",
    "contact",
];

/// Normalize a header cell: lowercase, every non-alphanumeric run becomes
/// a single underscore. "Goal(s)" -> "goal_s", "IEP Date" -> "iep_date".
pub fn normalize_header(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn header_matches_alias(normalized_header: &str, alias: &str) -> bool {
    if normalized_header == alias {
        return true;
    }
    if normalized_header.ends_with(&format!("_{}", alias)) {
        return true;
    }
    if normalized_header.starts_with(&format!("{}_", alias)) {
        return true;
    }
    if normalized_header.contains(&format!("_{}_", alias)) {
        return true;
    }
    false
}

pub fn detect_field(normalized_header: &str) -> Option<ReportField> {
    if NON_STUDENT_TOKENS
        .iter()
        .any(|t| header_matches_alias(normalized_header, t))
    {
        return None;
    }

    // Priority matters: the specific field families go before the broad
    // ones so that e.g. "goal_area" resolves before "goal",
    // "school_year" before the grade-ish "year", and "school_name"
    // before the bare "name".
    let tables: &[(&[&str], ReportField)] = &[
        (INITIALS_ALIASES, ReportField::Initials),
        (GOAL_AREA_ALIASES, ReportField::GoalArea),
        (GOAL_ALIASES, ReportField::Goal),
        (IEP_DATE_ALIASES, ReportField::IepDate),
        (FIRST_NAME_ALIASES, ReportField::FirstName),
        (LAST_NAME_ALIASES, ReportField::LastName),
        (SCHOOL_ALIASES, ReportField::School),
        (GRADE_ALIASES, ReportField::Grade),
        (FULL_NAME_ALIASES, ReportField::FullName),
    ];
    for (aliases, field) in tables {
        if aliases
            .iter()
            .any(|a| header_matches_alias(normalized_header, a))
        {
            return Some(*field);
        }
    }
    None
}

/// Heuristic: a row is a header candidate when at least two cells resolve
/// to known fields, among them a name source and a goal or grade column.
/// This is what lets one sheet carry several logical tables: a later row
/// that looks like a header restarts the column mapping.
pub fn looks_like_header(row: &[String]) -> bool {
    let mut name_hits = 0usize;
    let mut other_hits = 0usize;

    for cell in row {
        let key = normalize_header(cell);
        if key.is_empty() {
            continue;
        }
        match detect_field(&key) {
            Some(
                ReportField::FullName
                | ReportField::FirstName
                | ReportField::LastName
                | ReportField::Initials,
            ) => name_hits += 1,
            Some(ReportField::Goal | ReportField::Grade) => other_hits += 1,
            Some(_) => {}
            None => {}
        }
    }

    name_hits >= 1 && (name_hits + other_hits) >= 2
}
