//! Reconciles spoken or typed answers with a step's options
//!
//! Matching is case-insensitive substring containment in either direction, so
//! a user saying only part of an option still selects it. The first option in
//! list order wins. Anything that matches nothing is kept as free text.

/// Outcome of resolving an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Answer matched the option at `index`
    Matched { index: usize, option: String },
    /// Answer matched no option and is used as typed
    Freeform(String),
}

impl Resolution {
    /// Text to record as the user's choice
    #[must_use]
    pub fn choice_text(&self) -> &str {
        match self {
            Self::Matched { option, .. } => option,
            Self::Freeform(text) => text,
        }
    }

    /// Consume into the choice text
    #[must_use]
    pub fn into_choice_text(self) -> String {
        match self {
            Self::Matched { option, .. } => option,
            Self::Freeform(text) => text,
        }
    }

    /// Whether an option was matched
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Resolve an answer against the available options
#[must_use]
pub fn resolve(answer: &str, options: &[String]) -> Resolution {
    let needle = answer.trim().to_lowercase();

    if !needle.is_empty() {
        for (index, option) in options.iter().enumerate() {
            let candidate = option.to_lowercase();
            if candidate.contains(&needle) || needle.contains(&candidate) {
                tracing::debug!(answer, option = %option, "answer matched option");
                return Resolution::Matched {
                    index,
                    option: option.clone(),
                };
            }
        }
    }

    tracing::debug!(answer, "no option matched, keeping free text");
    Resolution::Freeform(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feelings() -> Vec<String> {
        [
            "💙 Feeling lost and foggy",
            "⚡ Anxious energy coursing through me",
            "🌫️ Emotionally numb and disconnected",
            "✨ Actually feeling pretty balanced",
            "😴 Deeply tired from all the healing work",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    #[test]
    fn test_fragment_matches_option() {
        let resolution = resolve("anxious energy", &feelings());
        assert_eq!(
            resolution,
            Resolution::Matched {
                index: 1,
                option: "⚡ Anxious energy coursing through me".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_is_freeform() {
        let resolution = resolve("something else entirely", &feelings());
        assert_eq!(
            resolution,
            Resolution::Freeform("something else entirely".to_string())
        );
        assert!(!resolution.is_match());
    }

    #[test]
    fn test_answer_containing_option_matches() {
        let options = vec!["calm".to_string(), "tired".to_string()];
        let resolution = resolve("I am really TIRED today", &options);
        assert_eq!(resolution.choice_text(), "tired");
    }

    #[test]
    fn test_first_match_wins() {
        // "feeling" appears in both the first and fourth option
        let resolution = resolve("feeling", &feelings());
        assert_eq!(resolution.choice_text(), "💙 Feeling lost and foggy");
    }

    #[test]
    fn test_exact_selection_matches_itself() {
        let options = feelings();
        for (i, option) in options.iter().enumerate() {
            match resolve(option, &options) {
                Resolution::Matched { index, .. } => assert_eq!(index, i),
                Resolution::Freeform(_) => panic!("option {i} did not match itself"),
            }
        }
    }

    #[test]
    fn test_blank_answer_never_matches() {
        assert_eq!(resolve("   ", &feelings()), Resolution::Freeform("   ".to_string()));
    }

    #[test]
    fn test_no_options_is_freeform() {
        assert_eq!(resolve("hello", &[]), Resolution::Freeform("hello".to_string()));
    }
}
