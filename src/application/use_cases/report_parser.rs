//! Report Parser
//!
//! Converts a raw upload buffer (workbook or delimited text) into a
//! normalized list of `ParsedStudent` records:
//! - Container detection from the file signature, not the declared type
//! - Per-sheet dialect resolution via header-synonym lookup
//! - Multi-goal cell splitting and grade/date normalization
//! - School-site and provider-role filtering
//!
//! Malformed rows degrade into `errors`; only an unreadable container is
//! a hard failure.

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::goal_area::GoalArea;
use crate::domain::grade::GradeLevel;
use crate::domain::report::{ImportOptions, ParseOutcome, ParserConfig};
use crate::domain::student::ParsedStudent;
use crate::infrastructure::report::{read_workbook, DelimitedReader, SheetGrid, SourceFormat};

use super::report_schema::looks_like_header;

mod rows;

use rows::{ColumnMap, RowOutcome};

pub struct ReportParser {
    config: ParserConfig,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ReportParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse an uploaded report buffer into student records.
    ///
    /// Returns `Err` only when the container itself cannot be opened.
    /// Everything else (bad rows, unknown grades, empty sheets) degrades
    /// into the outcome's `errors` and `warnings`.
    pub fn parse(&self, buffer: &[u8], options: &ImportOptions) -> Result<ParseOutcome> {
        self.config
            .validate()
            .map_err(AppError::ValidationError)?;

        if buffer.is_empty() {
            return Err(AppError::ParseError("Empty file buffer".to_string()));
        }

        let format = SourceFormat::detect(buffer);
        let mut outcome = ParseOutcome::default();

        let grids = match format {
            SourceFormat::Xlsx | SourceFormat::Xls => read_workbook(buffer, format)?,
            SourceFormat::Delimited => {
                let (grid, delimiter) = DelimitedReader::read_auto_detect(buffer)?;
                outcome.metadata.format_detected = format!(
                    "{} ({})",
                    format.as_str(),
                    delimiter_label(delimiter)
                );
                vec![grid]
            }
        };

        if outcome.metadata.format_detected.is_empty() {
            outcome.metadata.format_detected =
                format!("{} ({} sheets)", format.as_str(), grids.len());
        }

        for grid in &grids {
            if grid.is_empty() {
                outcome
                    .warnings
                    .push(format!("sheet '{}' is empty, skipped", grid.name));
                continue;
            }
            self.parse_sheet(grid, options, &mut outcome);
            outcome.metadata.sheets_parsed += 1;
        }

        if outcome.students.is_empty() && outcome.errors.is_empty() {
            outcome.errors.push(
                "no student rows found in any sheet; check that the report has a header row"
                    .to_string(),
            );
        }

        info!(
            students = outcome.students.len(),
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            goals_filtered = outcome.metadata.goals_filtered,
            format = %outcome.metadata.format_detected,
            "report parsed"
        );

        Ok(outcome)
    }

    /// Parse one sheet. A sheet may contain several logical tables: any
    /// row that looks like a header re-resolves the column mapping.
    fn parse_sheet(&self, grid: &SheetGrid, options: &ImportOptions, outcome: &mut ParseOutcome) {
        let mut mapping: Option<ColumnMap> = None;
        let mut rows_before_header = 0usize;
        let mut saw_usable_header = false;
        // Index of the last pushed student, for merged-cell continuation
        // rows. Reset on every header and whenever a row was filtered out,
        // so stray goals never attach to the wrong student.
        let mut last_student: Option<usize> = None;

        for (index, row) in grid.rows.iter().enumerate() {
            let row_number = index + 1;
            outcome.metadata.rows_seen += 1;

            if looks_like_header(row) {
                let resolved = ColumnMap::from_header(row);
                if resolved.has_name_source() {
                    if !resolved.has_goal_column() {
                        outcome.warnings.push(format!(
                            "sheet '{}' row {}: header has no recognizable goal column",
                            grid.name, row_number
                        ));
                    }
                    mapping = Some(resolved);
                    saw_usable_header = true;
                    last_student = None;
                    continue;
                }
            }

            let Some(current) = mapping.as_ref() else {
                rows_before_header += 1;
                continue;
            };

            match current.extract(row, &grid.name, row_number, self.config.max_goals_per_cell) {
                RowOutcome::Skip => {}
                RowOutcome::Error(message) => outcome.errors.push(message),
                RowOutcome::Continuation(goals) => {
                    let Some(slot) = last_student else {
                        outcome.errors.push(format!(
                            "sheet '{}' row {}: goal row has no student row above it",
                            grid.name, row_number
                        ));
                        continue;
                    };
                    let retained = self.filter_goal_list(current, row, goals, options, outcome);
                    outcome.students[slot].goals.extend(retained);
                }
                RowOutcome::Student(mut student) => {
                    if !student.is_identifiable() {
                        outcome.errors.push(format!(
                            "sheet '{}' row {}: student record has neither last name nor initials",
                            grid.name, row_number
                        ));
                        last_student = None;
                        continue;
                    }

                    if !self.retain_school(&student.school_site, options) {
                        last_student = None;
                        continue;
                    }

                    let goals = std::mem::take(&mut student.goals);
                    student.goals = self.filter_goal_list(current, row, goals, options, outcome);
                    self.check_grade(&student, outcome);
                    self.check_staleness(&student, outcome);

                    last_student = Some(outcome.students.len());
                    outcome.students.push(student);
                }
            }
        }

        if !saw_usable_header {
            outcome.errors.push(format!(
                "sheet '{}': no recognizable header row (looked for student/grade/goal columns)",
                grid.name
            ));
        } else if rows_before_header > 0 {
            outcome.warnings.push(format!(
                "sheet '{}': skipped {} rows before the first header",
                grid.name, rows_before_header
            ));
        }
    }

    /// School-site restriction: case-insensitive token containment.
    fn retain_school(&self, school_site: &Option<String>, options: &ImportOptions) -> bool {
        if !options.has_school_filter() {
            return true;
        }
        let Some(site) = school_site.as_deref() else {
            // No site on the row: keep it, the matcher narrows later.
            return true;
        };
        let site_lower = site.to_lowercase();
        options
            .user_schools
            .iter()
            .filter(|token| !token.trim().is_empty())
            .any(|token| site_lower.contains(&token.trim().to_lowercase()))
    }

    /// Provider-role restriction: drop goals outside the role's remit and
    /// count them for caller visibility.
    fn filter_goal_list(
        &self,
        mapping: &ColumnMap,
        row: &[String],
        goals: Vec<String>,
        options: &ImportOptions,
        outcome: &mut ParseOutcome,
    ) -> Vec<String> {
        let Some(allowed) = options
            .provider_role
            .as_deref()
            .and_then(GoalArea::allowed_for_role)
        else {
            return goals;
        };

        let before = goals.len();
        let retained: Vec<String> = goals
            .into_iter()
            .filter(|goal| allowed.contains(&mapping.goal_area(row, goal)))
            .collect();
        outcome.metadata.goals_filtered += before - retained.len();
        retained
    }

    fn check_grade(&self, student: &ParsedStudent, outcome: &mut ParseOutcome) {
        if let Some(GradeLevel::Unknown(raw)) = &student.grade_level {
            outcome.warnings.push(format!(
                "sheet '{}' row {}: unrecognized grade '{}' for student {}",
                student.source_sheet, student.source_row, raw, student.initials
            ));
        }
    }

    fn check_staleness(&self, student: &ParsedStudent, outcome: &mut ParseOutcome) {
        let Some(iep_date) = student.iep_date else {
            return;
        };
        let age_days = (Utc::now().date_naive() - iep_date).num_days();
        if age_days > self.config.stale_after_days {
            warn!(days = age_days, "stale IEP date in import");
            outcome.warnings.push(format!(
                "student {}: IEP dated {} is more than {} days old",
                student.initials, iep_date, self.config.stale_after_days
            ));
        }
    }
}

fn delimiter_label(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => "comma",
        b';' => "semicolon",
        b'\t' => "tab",
        b'|' => "pipe",
        _ => "unknown delimiter",
    }
}
