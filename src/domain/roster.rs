use serde::{Deserialize, Serialize};

use super::grade::GradeLevel;

/// A roster record the matcher compares against.
///
/// The target system stores initials and grade long-term; first/last name
/// are present only on the minority of rows where the caller's system
/// separately keeps them. Immutable during a matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudent {
    pub id: String,
    pub initials: String,
    pub grade_level: GradeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RosterStudent {
    pub fn has_name(&self) -> bool {
        self.first_name.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.last_name.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// "First Last" when both parts are present.
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                Some(format!("{} {}", first, last))
            }
            _ => None,
        }
    }
}
