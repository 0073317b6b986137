use serde::{Deserialize, Serialize};

use super::student::ParsedStudent;

/// Caller-supplied import options. Absent or unrecognized fields mean
/// "no filtering". Passed explicitly into the pipeline; there is no
/// ambient/global configuration state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Restrict parsing to rows whose school site matches one of these
    /// tokens (case-insensitive substring).
    pub user_schools: Vec<String>,

    /// Restrict output to one roster student, for disambiguation when
    /// same-initials students exist across schools. Applied after
    /// matching, since only the roster knows ids.
    pub target_student_id: Option<String>,

    /// Drops goals whose area is outside this provider type's remit
    /// (e.g. a resource teacher does not import speech-only goals).
    pub provider_role: Option<String>,
}

impl ImportOptions {
    pub fn has_school_filter(&self) -> bool {
        self.user_schools.iter().any(|s| !s.trim().is_empty())
    }
}

/// Configuration for the report parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Cap on goal fragments split out of a single cell (default: 50).
    /// Guards against pathological cells; overflow is reported as a warning.
    pub max_goals_per_cell: usize,

    /// IEP dates older than this many days trigger a staleness warning
    /// (default: 365).
    pub stale_after_days: i64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_goals_per_cell: 50,
            stale_after_days: 365,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_goals_per_cell == 0 {
            return Err("max_goals_per_cell must be > 0".to_string());
        }
        if self.stale_after_days <= 0 {
            return Err("stale_after_days must be > 0".to_string());
        }
        Ok(())
    }
}

/// Caller-visible facts about what the parser saw and decided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Human-readable container + dialect note, e.g.
    /// "xlsx workbook (2 sheets)" or "delimited text (tab)".
    pub format_detected: String,

    /// Goals excluded by provider-role filtering.
    pub goals_filtered: usize,

    pub sheets_parsed: usize,
    pub rows_seen: usize,
}

/// Parser output. Malformed rows degrade into `errors`; only an unreadable
/// container is a hard failure and never reaches this struct.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub students: Vec<ParsedStudent>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: ReportMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_to_no_filtering() {
        let options: ImportOptions = serde_json::from_str("{}").unwrap();
        assert!(options.user_schools.is_empty());
        assert!(options.target_student_id.is_none());
        assert!(options.provider_role.is_none());
        assert!(!options.has_school_filter());
    }

    #[test]
    fn test_options_ignore_unknown_fields() {
        let options: ImportOptions =
            serde_json::from_str(r#"{"providerRole":"speech","futureKnob":true}"#).unwrap();
        assert_eq!(options.provider_role.as_deref(), Some("speech"));
    }

    #[test]
    fn test_parser_config_validation() {
        assert!(ParserConfig::default().validate().is_ok());
        let bad = ParserConfig {
            max_goals_per_cell: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
