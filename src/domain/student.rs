use chrono::NaiveDate;

use super::grade::GradeLevel;

/// One student record extracted from a source report.
///
/// Holds raw names exactly as written in the source. This type is
/// deliberately NOT serializable: raw names must never reach the import
/// boundary, only initials and scrubbed goal text do.
#[derive(Debug, Clone, Default)]
pub struct ParsedStudent {
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// Explicit from the source, or derived from the names.
    pub initials: String,

    pub grade_level: Option<GradeLevel>,
    pub school_site: Option<String>,

    /// Raw free-text goal narratives, one entry per goal.
    pub goals: Vec<String>,

    /// Used for staleness warnings only.
    pub iep_date: Option<NaiveDate>,

    // Provenance for diagnostics (sheet + 1-based row, never names).
    pub source_sheet: String,
    pub source_row: usize,
}

impl ParsedStudent {
    /// "First Last" when both parts are present.
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                Some(format!("{} {}", first, last))
            }
            _ => None,
        }
    }

    /// Invariant check: a record is usable with at least a last name or
    /// initials. Rows failing this are routed to errors, not students.
    pub fn is_identifiable(&self) -> bool {
        self.last_name.as_deref().is_some_and(|s| !s.trim().is_empty())
            || !self.initials.trim().is_empty()
    }
}

/// Derive display initials ("J.D.") from whatever name parts exist.
pub fn derive_initials(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let mut out = String::new();
    for part in [first_name, last_name].into_iter().flatten() {
        if let Some(c) = part.trim().chars().next() {
            out.push(c.to_ascii_uppercase());
            out.push('.');
        }
    }
    out
}

/// Canonical form for initials comparison: letters only, uppercased.
/// "J.D.", "jd" and "J. D." all normalize to "JD".
pub fn normalize_initials(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_initials() {
        assert_eq!(derive_initials(Some("Jane"), Some("Doe")), "J.D.");
        assert_eq!(derive_initials(None, Some("Doe")), "D.");
        assert_eq!(derive_initials(Some("  amy "), Some("brown")), "A.B.");
        assert_eq!(derive_initials(None, None), "");
    }

    #[test]
    fn test_normalize_initials() {
        assert_eq!(normalize_initials("J.D."), "JD");
        assert_eq!(normalize_initials("jd"), "JD");
        assert_eq!(normalize_initials("J. D."), "JD");
        assert_eq!(normalize_initials(""), "");
    }

    #[test]
    fn test_identifiable_requires_last_name_or_initials() {
        let mut student = ParsedStudent {
            first_name: Some("Jane".to_string()),
            ..Default::default()
        };
        assert!(!student.is_identifiable());

        student.initials = "J.D.".to_string();
        assert!(student.is_identifiable());

        student.initials.clear();
        student.last_name = Some("Doe".to_string());
        assert!(student.is_identifiable());
    }

    #[test]
    fn test_full_name_needs_both_parts() {
        let student = ParsedStudent {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(student.full_name(), Some("Jane Doe".to_string()));

        let partial = ParsedStudent {
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(partial.full_name(), None);
    }
}
