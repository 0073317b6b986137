use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized grade level for roster comparison.
///
/// The closed vocabulary is TK, K and 1 through 12. Anything else is kept
/// raw as `Unknown` so the caller can surface it in warnings instead of
/// silently losing the source value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum GradeLevel {
    Tk,
    K,
    Grade(u8),
    Unknown(String),
}

impl GradeLevel {
    /// Parse a raw grade token into the closed vocabulary.
    ///
    /// Accepted synonyms: "TK", "K", "KG", "kindergarten", "3", "03",
    /// "3rd", "Grade 3", "G3". Unrecognized tokens become `Unknown`.
    pub fn parse(raw: &str) -> GradeLevel {
        let token = raw.trim();
        if token.is_empty() {
            return GradeLevel::Unknown(String::new());
        }

        let lower = token.to_lowercase();
        match lower.as_str() {
            "tk" | "transitional kindergarten" | "t-k" => return GradeLevel::Tk,
            "k" | "kg" | "kinder" | "kindergarten" => return GradeLevel::K,
            _ => {}
        }

        // Strip common prefixes/suffixes: "Grade 3", "G3", "3rd", "03".
        let stripped = lower
            .trim_start_matches("grade")
            .trim_start_matches("gr.")
            .trim_start_matches("gr")
            .trim_start_matches('g')
            .trim()
            .trim_end_matches("st")
            .trim_end_matches("nd")
            .trim_end_matches("rd")
            .trim_end_matches("th")
            .trim();

        if let Ok(n) = stripped.parse::<u8>() {
            if (1..=12).contains(&n) {
                return GradeLevel::Grade(n);
            }
        }

        GradeLevel::Unknown(token.to_string())
    }

    /// Position on the TK..12 ladder, used for the one-band adjacency rule.
    /// `Unknown` has no position and never satisfies grade predicates.
    pub fn ordinal(&self) -> Option<i8> {
        match self {
            GradeLevel::Tk => Some(0),
            GradeLevel::K => Some(1),
            GradeLevel::Grade(n) => Some(*n as i8 + 1),
            GradeLevel::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, GradeLevel::Unknown(_))
    }

    /// Exact grade equality. Two `Unknown` values never compare equal here.
    pub fn same_as(&self, other: &GradeLevel) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// One grade band apart (e.g. the source predates a promotion).
    pub fn adjacent_to(&self, other: &GradeLevel) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => (a - b).abs() == 1,
            _ => false,
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeLevel::Tk => write!(f, "TK"),
            GradeLevel::K => write!(f, "K"),
            GradeLevel::Grade(n) => write!(f, "{}", n),
            GradeLevel::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<GradeLevel> for String {
    fn from(grade: GradeLevel) -> Self {
        grade.to_string()
    }
}

impl From<String> for GradeLevel {
    fn from(s: String) -> Self {
        GradeLevel::parse(&s)
    }
}

impl From<&str> for GradeLevel {
    fn from(s: &str) -> Self {
        GradeLevel::parse(s)
    }
}
