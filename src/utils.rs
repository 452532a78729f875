//! Utility functions for path manipulation

/// Sanitize a string for use as a single path component
///
/// Replaces characters that are invalid on common filesystems with `_`,
/// strips control characters, and trims leading/trailing dots and spaces.
/// Returns `"unnamed"` if nothing survives.
pub fn sanitize_path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');

    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_invalid_characters() {
        assert_eq!(sanitize_path_component("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_path_component("what?*"), "what__");
    }

    #[test]
    fn strips_control_characters_and_edge_dots() {
        assert_eq!(sanitize_path_component("..hidden. "), "hidden");
        assert_eq!(sanitize_path_component("a\x00b\x1fc"), "abc");
    }

    #[test]
    fn empty_input_falls_back_to_unnamed() {
        assert_eq!(sanitize_path_component(""), "unnamed");
        assert_eq!(sanitize_path_component(" .. "), "unnamed");
    }

    #[test]
    fn ordinary_names_pass_through() {
        assert_eq!(sanitize_path_component("videos"), "videos");
        assert_eq!(sanitize_path_component("My Channel"), "My Channel");
    }
}
