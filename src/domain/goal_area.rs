use serde::{Deserialize, Serialize};

/// Service area a goal belongs to, used for provider-role filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalArea {
    Reading,
    Writing,
    Math,
    Communication,
    Motor,
    Behavior,
    SocialEmotional,
    /// No area column and no recognizable keywords. Never filtered out.
    Unspecified,
}

// Keyword tables are matched against lowercased text. Column tokens are
// checked before goal-text inference; the first hit wins.
const READING_KEYWORDS: &[&str] = &[
    "reading", "read aloud", "decoding", "fluency", "phonics", "sight words", "comprehension",
];
const WRITING_KEYWORDS: &[&str] = &["writing", "written", "spelling", "handwriting", "paragraph"];
const MATH_KEYWORDS: &[&str] = &[
    "math", "computation", "addition", "subtraction", "multiplication", "division", "number sense",
];
const COMMUNICATION_KEYWORDS: &[&str] = &[
    "speech", "language", "articulation", "phonolog", "expressive", "receptive", "communication",
    "vocabulary", "utterance",
];
const MOTOR_KEYWORDS: &[&str] = &[
    "motor", "occupational therapy", "sensory", "grasp", "gait", "mobility", "coordination",
];
const BEHAVIOR_KEYWORDS: &[&str] = &[
    "behavior", "behaviour", "on-task", "on task", "attention", "self-regulation", "compliance",
];
const SOCIAL_EMOTIONAL_KEYWORDS: &[&str] = &[
    "social", "emotional", "peer", "counseling", "self-esteem", "coping",
];

impl GoalArea {
    /// Resolve an explicit Area/Domain column value.
    pub fn from_column_token(token: &str) -> GoalArea {
        Self::infer(token)
    }

    /// Infer the area from free text (column token or goal narrative).
    pub fn infer(text: &str) -> GoalArea {
        let lower = text.to_lowercase();
        let tables: &[(&[&str], GoalArea)] = &[
            (COMMUNICATION_KEYWORDS, GoalArea::Communication),
            (MOTOR_KEYWORDS, GoalArea::Motor),
            (READING_KEYWORDS, GoalArea::Reading),
            (WRITING_KEYWORDS, GoalArea::Writing),
            (MATH_KEYWORDS, GoalArea::Math),
            (BEHAVIOR_KEYWORDS, GoalArea::Behavior),
            (SOCIAL_EMOTIONAL_KEYWORDS, GoalArea::SocialEmotional),
        ];
        for (keywords, area) in tables {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return *area;
            }
        }
        GoalArea::Unspecified
    }

    /// Areas a provider role may import. `None` means the role is unknown
    /// (or absent) and no filtering applies.
    pub fn allowed_for_role(role: &str) -> Option<&'static [GoalArea]> {
        let normalized = role.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "speech" | "slp" | "speech therapist" | "speech language pathologist" => Some(&[
                GoalArea::Communication,
                GoalArea::Unspecified,
            ]),
            "ot" | "occupational therapist" | "occupational therapy" => {
                Some(&[GoalArea::Motor, GoalArea::Unspecified])
            }
            "counselor" | "school psychologist" | "psychologist" => Some(&[
                GoalArea::Behavior,
                GoalArea::SocialEmotional,
                GoalArea::Unspecified,
            ]),
            "resource" | "resource teacher" | "education specialist" | "sped teacher" => Some(&[
                GoalArea::Reading,
                GoalArea::Writing,
                GoalArea::Math,
                GoalArea::Behavior,
                GoalArea::Unspecified,
            ]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_goal_text() {
        assert_eq!(
            GoalArea::infer("Student will read 50 words per minute with 90% accuracy."),
            GoalArea::Reading
        );
        assert_eq!(
            GoalArea::infer("Will produce /s/ in the initial position of words (articulation)."),
            GoalArea::Communication
        );
        assert_eq!(GoalArea::infer("Count to 100 using number sense strategies."), GoalArea::Math);
        assert_eq!(GoalArea::infer("Will do something unusual."), GoalArea::Unspecified);
    }

    #[test]
    fn test_role_filtering_tables() {
        let speech = GoalArea::allowed_for_role("Speech-Language Pathologist").unwrap();
        assert!(speech.contains(&GoalArea::Communication));
        assert!(!speech.contains(&GoalArea::Reading));

        let resource = GoalArea::allowed_for_role("resource").unwrap();
        assert!(resource.contains(&GoalArea::Reading));
        assert!(!resource.contains(&GoalArea::Communication));

        // Unknown role: no filtering.
        assert!(GoalArea::allowed_for_role("librarian").is_none());
    }

    #[test]
    fn test_unspecified_is_never_filtered() {
        for role in ["speech", "ot", "counselor", "resource"] {
            let allowed = GoalArea::allowed_for_role(role).unwrap();
            assert!(allowed.contains(&GoalArea::Unspecified), "role {}", role);
        }
    }
}
