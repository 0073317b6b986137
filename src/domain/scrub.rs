use serde::{Deserialize, Serialize};

/// Category of PII detected in a goal string.
///
/// `FirstName`/`LastName` come from the known-name pass (grounded in data
/// known to belong to this exact student). `PossibleName` comes from the
/// heuristic pass and is flagged separately because it is lower confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    FirstName,
    LastName,
    PossibleName,
}

impl PiiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::FirstName => "first_name",
            PiiCategory::LastName => "last_name",
            PiiCategory::PossibleName => "possible_name",
        }
    }
}

/// Scrubber's confidence that all PII was removed from one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrubConfidence {
    High,
    Medium,
    Low,
}

/// Output of scrubbing one goal string.
///
/// `original` exists only transiently for in-process audit. It never
/// serializes, and the pipeline additionally clears it before the goal
/// enters a `ProcessedMatch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubbedGoal {
    #[serde(skip)]
    pub original: Option<String>,
    pub scrubbed: String,
    pub pii_detected: Vec<PiiCategory>,
    pub confidence: ScrubConfidence,
}

impl ScrubbedGoal {
    /// Drop the transient original before the goal crosses the boundary.
    pub fn without_original(mut self) -> Self {
        self.original = None;
        self
    }
}

/// Batch scrub output. A failure on one goal never aborts the batch; the
/// failing goal is omitted (fail closed) and reported here.
#[derive(Debug, Clone, Default)]
pub struct ScrubOutcome {
    pub goals: Vec<ScrubbedGoal>,
    pub errors: Vec<String>,
}

/// Configuration for the PII scrubber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubConfig {
    /// Neutral placeholder substituted for detected spans (default: "[name]").
    /// Substitution rather than deletion keeps the sentence readable for
    /// downstream worksheet generation.
    pub placeholder: String,

    /// Enable the heuristic name-pattern pass (default: true).
    pub heuristics_enabled: bool,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            placeholder: "[name]".to_string(),
            heuristics_enabled: true,
        }
    }
}

impl ScrubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.placeholder.trim().is_empty() {
            return Err("placeholder must not be empty".to_string());
        }
        if self.placeholder.chars().any(|c| c.is_alphabetic() && c.is_uppercase()) {
            return Err("placeholder must not look like a capitalized name".to_string());
        }
        Ok(())
    }
}
