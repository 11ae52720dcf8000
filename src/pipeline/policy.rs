//! Parsing policy for yes/no answers from the language model.

/// Lenient boolean: `true` whenever the lowercased text contains `"true"`.
///
/// No structured parsing happens. `"True, because..."` and `"not true"` are
/// both positive, while empty text, `"false"` and `"No"` are negative.
pub fn parse_lenient_boolean(text: &str) -> bool {
    text.to_lowercase().contains("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_answers() {
        assert!(parse_lenient_boolean("true"));
        assert!(parse_lenient_boolean("True, because the query asks for statistics"));
        assert!(parse_lenient_boolean("  TRUE  "));
        assert!(parse_lenient_boolean("true: title mentions population"));
    }

    #[test]
    fn negative_answers() {
        assert!(!parse_lenient_boolean("false"));
        assert!(!parse_lenient_boolean("No"));
        assert!(!parse_lenient_boolean(""));
        assert!(!parse_lenient_boolean("{\"answer\": 1}"));
    }

    #[test]
    fn substring_matches_are_positive() {
        assert!(parse_lenient_boolean("untrue"));
        assert!(parse_lenient_boolean("false, that is not true"));
        assert!(parse_lenient_boolean("trUE-ish"));
    }
}
