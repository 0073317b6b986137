//! PII Scrubber
//!
//! Removes personally identifying information from free-text goal
//! narratives before they are persisted or displayed:
//! - Known-name pass: redacts every occurrence of the student's supplied
//!   first/last name, including common diminutives
//! - Heuristic pass: catches capitalized name-shaped spans the caller did
//!   not supply (a sibling or teacher mentioned in the text)
//! - Fail-closed verification: a goal whose known names survive redaction
//!   is omitted and reported, never emitted unscrubbed
//!
//! This is a best-effort redaction layer with confidence levels, not a
//! certified anonymizer.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::domain::scrub::{PiiCategory, ScrubConfidence, ScrubConfig, ScrubOutcome, ScrubbedGoal};

/// Common diminutive/nickname families. If the supplied first name appears
/// anywhere in a family, every member of the family is redacted with it.
const NICKNAME_FAMILIES: &[&[&str]] = &[
    &["william", "will", "bill", "billy", "liam"],
    &["robert", "rob", "bob", "bobby"],
    &["richard", "rick", "ricky", "rich"],
    &["michael", "mike", "mikey"],
    &["christopher", "chris", "topher"],
    &["jonathan", "jon", "jonny"],
    &["john", "jack", "johnny"],
    &["james", "jim", "jimmy", "jamie"],
    &["joseph", "joe", "joey"],
    &["thomas", "tom", "tommy"],
    &["charles", "charlie", "chuck"],
    &["daniel", "dan", "danny"],
    &["matthew", "matt", "matty"],
    &["anthony", "tony"],
    &["nicholas", "nick", "nicky"],
    &["alexander", "alex", "xander"],
    &["benjamin", "ben", "benny"],
    &["samuel", "sam", "sammy"],
    &["timothy", "tim", "timmy"],
    &["zachary", "zach", "zack"],
    &["edward", "ed", "eddie", "ted", "teddy"],
    &["andrew", "andy", "drew"],
    &["joshua", "josh"],
    &["david", "dave", "davey"],
    &["steven", "steve"],
    &["stephen", "steve"],
    &["elizabeth", "liz", "lizzie", "beth", "eliza", "betsy"],
    &["katherine", "kate", "katie", "kathy", "kat"],
    &["catherine", "cate", "katie", "cathy"],
    &["margaret", "maggie", "meg", "peggy"],
    &["jennifer", "jen", "jenny"],
    &["jessica", "jess", "jessie"],
    &["samantha", "sam", "sammy"],
    &["alexandra", "alex", "lexi"],
    &["rebecca", "becca", "becky"],
    &["abigail", "abby"],
    &["isabella", "bella", "izzy"],
    &["gabriella", "gabby"],
    &["victoria", "vicky", "tori"],
    &["stephanie", "steph"],
    &["kimberly", "kim"],
    &["patricia", "pat", "patty", "tricia"],
    &["christine", "chris", "chrissy"],
    &["kathleen", "kathy", "katie"],
];

// Capitalized words common in goal narratives that must never be treated
// as names by the heuristic pass.
const NON_NAME_WORDS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday",
    "IEP", "Student", "Students", "Teacher", "Grade", "Goal", "Given", "When", "While", "With",
    "Within", "The", "This", "During", "After", "Before", "Using", "Upon", "Per", "Across",
    "Reading", "Writing", "Math", "Speech", "Language", "English", "Spanish", "School",
    "Elementary", "Middle", "High", "Will", "Baseline", "Objective", "Benchmark", "Accuracy",
];

/// "Student's name is Jane" and similar introductions. The context part is
/// case-insensitive; the captured span must itself be capitalized.
static NAME_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?i:student|child|client)(?i:'s)?\s+(?i:name\s+is|named)\s+)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
    )
    .expect("name context pattern")
});

/// Two adjacent capitalized words: the classic "First Last" shape.
static CAPITALIZED_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b").expect("capitalized pair pattern"));

pub struct PiiScrubber {
    config: ScrubConfig,
}

impl Default for PiiScrubber {
    fn default() -> Self {
        Self::new(ScrubConfig::default())
    }
}

impl PiiScrubber {
    pub fn new(config: ScrubConfig) -> Self {
        Self { config }
    }

    /// Scrub a batch of goal strings belonging to one student.
    ///
    /// Each goal is processed independently; a failure on one is recorded
    /// in `errors` and that goal is omitted (fail closed) while the rest
    /// of the batch proceeds.
    pub fn scrub_goals(
        &self,
        goals: &[String],
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> ScrubOutcome {
        let mut outcome = ScrubOutcome::default();

        if let Err(message) = self.config.validate() {
            outcome
                .errors
                .push(format!("invalid scrub configuration: {}", message));
            return outcome;
        }

        for (index, goal) in goals.iter().enumerate() {
            match self.scrub_goal(goal, first_name, last_name) {
                Ok(scrubbed) => outcome.goals.push(scrubbed),
                Err(err) => {
                    warn!(goal_index = index, "goal omitted by fail-closed scrub policy");
                    outcome
                        .errors
                        .push(format!("goal {}: {}; goal omitted", index + 1, err));
                }
            }
        }

        outcome
    }

    /// Scrub one goal string.
    fn scrub_goal(
        &self,
        goal: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<ScrubbedGoal> {
        let placeholder = self.config.placeholder.as_str();
        let mut text = goal.to_string();
        let mut detected: Vec<PiiCategory> = Vec::new();

        // Pass 1: names known to belong to this exact student. Redacting
        // the combined "First Last" / "Last, First" forms first keeps a
        // full-name mention down to a single placeholder.
        let first = first_name.map(str::trim).filter(|s| !s.is_empty());
        let last = last_name.map(str::trim).filter(|s| !s.is_empty());

        if let (Some(first), Some(last)) = (first, last) {
            for pattern in [
                format!(r"\b{}\s+{}\b", regex::escape(first), regex::escape(last)),
                format!(r"\b{}\s*,\s*{}\b", regex::escape(last), regex::escape(first)),
            ] {
                if replace_all(&mut text, &pattern, placeholder)? {
                    push_unique(&mut detected, PiiCategory::FirstName);
                    push_unique(&mut detected, PiiCategory::LastName);
                }
            }
        }

        if let Some(first) = first {
            for variant in name_variants(first) {
                let pattern = format!(r"\b{}\b", regex::escape(&variant));
                if replace_all(&mut text, &pattern, placeholder)? {
                    push_unique(&mut detected, PiiCategory::FirstName);
                }
            }
        }

        if let Some(last) = last {
            let pattern = format!(r"\b{}\b", regex::escape(last));
            if replace_all(&mut text, &pattern, placeholder)? {
                push_unique(&mut detected, PiiCategory::LastName);
            }
        }

        let known_name_hits = !detected.is_empty();

        // Pass 2: name-shaped spans the caller did not supply.
        let mut heuristic_hits = false;
        if self.config.heuristics_enabled {
            heuristic_hits = self.apply_heuristics(&mut text, placeholder)?;
            if heuristic_hits {
                push_unique(&mut detected, PiiCategory::PossibleName);
            }
        }

        // Consecutive placeholders read badly; collapse them.
        let collapse = Regex::new(&format!(
            r"{0}(?:[\s,]+{0})+",
            regex::escape(placeholder)
        ))
        .map_err(|e| AppError::Internal(format!("placeholder collapse pattern: {}", e)))?;
        text = collapse.replace_all(&text, placeholder).into_owned();

        // Fail closed: if a known name still appears anywhere in the
        // redacted text (for instance fused into another token, where the
        // word-boundary patterns cannot see it), refuse to emit the goal.
        verify_redacted(&text, first, last, placeholder)?;

        let confidence = match (known_name_hits, heuristic_hits) {
            (_, false) => ScrubConfidence::High,
            (true, true) => ScrubConfidence::Medium,
            (false, true) => ScrubConfidence::Low,
        };

        Ok(ScrubbedGoal {
            original: Some(goal.to_string()),
            scrubbed: text,
            pii_detected: detected,
            confidence,
        })
    }

    /// Heuristic redaction of name-shaped spans. Returns whether anything
    /// fired.
    fn apply_heuristics(&self, text: &mut String, placeholder: &str) -> Result<bool> {
        let mut fired = false;

        // Introductions ("the student's name is Jane Q").
        let replaced = NAME_CONTEXT
            .replace_all(text.as_str(), |caps: &regex::Captures| {
                let full = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                full.replacen(name, placeholder, 1)
            })
            .into_owned();
        if replaced != *text {
            fired = true;
            *text = replaced;
        }

        // Capitalized pairs not in the goal-domain stopword list.
        let replaced = CAPITALIZED_PAIR
            .replace_all(text.as_str(), |caps: &regex::Captures| {
                let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let second = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                if NON_NAME_WORDS.contains(&first) || NON_NAME_WORDS.contains(&second) {
                    caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
                } else {
                    placeholder.to_string()
                }
            })
            .into_owned();
        if replaced != *text {
            fired = true;
            *text = replaced;
        }

        // A capitalized word hugging a placeholder is almost always the
        // unredacted half of a name ("Mary [name]" after the known last
        // name was removed). Iterate until stable: longer name runs
        // collapse one word per pass.
        let escaped = regex::escape(placeholder);
        let before = build_regex(&format!(r"\b([A-Z][a-z]+)\s+{}", escaped))?;
        let after = build_regex(&format!(r"{}\s+([A-Z][a-z]+)\b", escaped))?;
        for _ in 0..5 {
            let mut changed = false;
            for pattern in [&before, &after] {
                let replaced = pattern
                    .replace_all(text.as_str(), |caps: &regex::Captures| {
                        let word = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                        if NON_NAME_WORDS.contains(&word) {
                            caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
                        } else {
                            placeholder.to_string()
                        }
                    })
                    .into_owned();
                if replaced != *text {
                    changed = true;
                    fired = true;
                    *text = replaced;
                }
            }
            if !changed {
                break;
            }
        }

        Ok(fired)
    }
}

fn build_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::ScrubError(format!("pattern failed to compile: {}", e)))
}

/// Case-insensitive whole-word replacement. Returns whether a match fired.
fn replace_all(text: &mut String, pattern: &str, placeholder: &str) -> Result<bool> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| AppError::ScrubError(format!("name pattern failed to compile: {}", e)))?;
    if regex.is_match(text) {
        *text = regex.replace_all(text, placeholder).into_owned();
        Ok(true)
    } else {
        Ok(false)
    }
}

/// The supplied name plus its diminutive family, when it belongs to one.
fn name_variants(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let mut variants = vec![name.to_string()];
    for family in NICKNAME_FAMILIES {
        if family.contains(&lower.as_str()) {
            for member in *family {
                if *member != lower {
                    variants.push((*member).to_string());
                }
            }
            break;
        }
    }
    variants
}

/// Post-redaction check backing the fail-closed policy: no known name may
/// survive as a substring. Placeholders are stripped first so a name-like
/// placeholder never trips the check. The error carries no PII.
fn verify_redacted(
    text: &str,
    first: Option<&str>,
    last: Option<&str>,
    placeholder: &str,
) -> Result<()> {
    let remainder = text.replace(placeholder, "").to_lowercase();
    for (label, name) in [("first name", first), ("last name", last)] {
        if let Some(name) = name {
            if name.len() >= 2 && remainder.contains(&name.to_lowercase()) {
                return Err(AppError::ScrubError(format!(
                    "student {} survived redaction",
                    label
                )));
            }
        }
    }
    Ok(())
}

fn push_unique(detected: &mut Vec<PiiCategory>, category: PiiCategory) {
    if !detected.contains(&category) {
        detected.push(category);
    }
}
