//! Text normalization shared by deduplication and the relevance prefilter.

/// Normalize an external identifier (DOI, PMID): trim and lowercase.
///
/// Returns `None` for blank identifiers, which never match each other.
#[must_use]
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Normalize a title for approximate comparison: lowercase, strip
/// non-alphanumerics, collapse whitespace.
#[must_use]
pub fn normalize_title(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased alphanumeric tokens. Punctuation separates tokens here, unlike
/// [`normalize_title`], so `"AI-based"` yields `["ai", "based"]`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Sliding windows of `size` tokens over a normalized title.
///
/// Titles with fewer than `size` tokens form a single shingle; an empty title
/// has none.
#[must_use]
pub fn shingles(normalized: &str, size: usize) -> Vec<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    if tokens.len() <= size {
        return vec![tokens.join(" ")];
    }
    tokens.windows(size).map(|w| w.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("10.1/ABC", Some("10.1/abc"))]
    #[case("  10.1/abc ", Some("10.1/abc"))]
    #[case("   ", None)]
    fn identifiers(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_identifier(raw).as_deref(), expected);
    }

    #[rstest]
    #[case("Effects of AI Tutoring on Learning", "effects of ai tutoring on learning")]
    #[case("effects of ai tutoring on learning!!", "effects of ai tutoring on learning")]
    #[case("  Deep   learning:\ta review ", "deep learning a review")]
    #[case("!!!", "")]
    fn titles(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_title(raw), expected);
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("AI-based Tutoring, 2021"), vec!["ai", "based", "tutoring", "2021"]);
    }

    #[test]
    fn shingles_use_three_token_windows() {
        assert_eq!(
            shingles("effects of ai tutoring", 3),
            vec!["effects of ai", "of ai tutoring"]
        );
        assert_eq!(shingles("short title", 3), vec!["short title"]);
        assert!(shingles("", 3).is_empty());
    }
}
