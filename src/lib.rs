//! IEP goals import core.
//!
//! Ingests third-party special-education reports (workbooks, CSV exports
//! from case-management systems) and prepares them for safe import into
//! an initials-only roster database:
//!
//! - **Report Parser**: raw buffer -> normalized student+goal records,
//!   auto-detecting the container format and per-sheet column dialect
//! - **Student Matcher**: confidence-scored fuzzy matching of parsed
//!   students against the caller's roster, with a reason per decision
//! - **PII Scrubber**: best-effort redaction of names out of free-text
//!   goal narratives before anything is persisted or displayed
//! - **Import Pipeline**: the orchestrator producing the preview payload
//!   a human reviews before commit
//!
//! The surrounding upload UI, database layer and auth are external
//! collaborators; this crate is a pure pipeline over its inputs.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::use_cases::import_pipeline::ImportPipeline;
pub use application::use_cases::pii_scrubber::PiiScrubber;
pub use application::use_cases::report_parser::ReportParser;
pub use application::use_cases::student_matcher::match_students;
pub use domain::error::{AppError, Result};
pub use domain::goal_area::GoalArea;
pub use domain::grade::GradeLevel;
pub use domain::matching::{MatchConfidence, MatchOutcome, MatchResult, MatchSummary};
pub use domain::preview::{ImportPreview, ImportSummary, ProcessedMatch, UnmatchedStudent};
pub use domain::report::{ImportOptions, ParseOutcome, ParserConfig, ReportMetadata};
pub use domain::roster::RosterStudent;
pub use domain::scrub::{PiiCategory, ScrubConfidence, ScrubConfig, ScrubOutcome, ScrubbedGoal};
pub use domain::student::ParsedStudent;
