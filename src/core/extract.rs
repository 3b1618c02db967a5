//! Build id extraction from free-form log text.

use std::sync::OnceLock;

use regex::Regex;

fn build_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"codebuild:[A-Za-z0-9-]+").expect("failed creating regex"))
}

/// First `codebuild:<id>` occurrence in `text`, or `default` when there is none
pub fn extract_build_id(text: &str, default: &str) -> String {
    build_id_pattern()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "Same as previous build";

    #[test]
    fn test_extracts_embedded_id() {
        let text = "[Container] Phase complete for codebuild:abc-123 in 4s";
        assert_eq!(extract_build_id(text, DEFAULT), "codebuild:abc-123");
    }

    #[test]
    fn test_first_match_wins() {
        let text = "codebuild:first-1\nother line\ncodebuild:second-2";
        assert_eq!(extract_build_id(text, DEFAULT), "codebuild:first-1");
    }

    #[test]
    fn test_stops_at_non_id_characters() {
        assert_eq!(
            extract_build_id("arn:aws:codebuild:us-east-1", DEFAULT),
            "codebuild:us-east-1"
        );
        assert_eq!(extract_build_id("codebuild:x_y", DEFAULT), "codebuild:x");
    }

    #[test]
    fn test_falls_back_to_default() {
        assert_eq!(extract_build_id("no ids here", DEFAULT), DEFAULT);
        assert_eq!(extract_build_id("codebuild: spaced", DEFAULT), DEFAULT);
        assert_eq!(extract_build_id("", DEFAULT), DEFAULT);
    }
}
