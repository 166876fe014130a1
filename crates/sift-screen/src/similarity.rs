//! Normalized string-similarity ratio.
//!
//! The ratio is the indel similarity scaled to `0..=100`:
//! `100 * 2 * lcs(a, b) / (len(a) + len(b))`, where `lcs` is the length of the
//! longest common subsequence over characters.

/// Similarity ratio of two strings in `0.0..=100.0`. Two empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(&a, &b);
    100.0 * (2 * lcs) as f64 / total as f64
}

/// Whether `ratio(a, b)` reaches `cutoff`.
#[must_use]
pub fn is_match(a: &str, b: &str, cutoff: u8) -> bool {
    ratio(a, b) >= f64::from(cutoff)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for lc in long {
        for (j, sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert!((ratio("effects of ai tutoring", "effects of ai tutoring") - 100.0).abs() < 1e-9);
        assert!((ratio("", "") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_score_0() {
        assert!(ratio("abc", "xyz").abs() < 1e-9);
        assert!(ratio("abc", "").abs() < 1e-9);
    }

    #[test]
    fn known_value() {
        // lcs("kitten", "sitting") = 4 ("ittn"); 2*4 / 13
        let expected = 100.0 * 8.0 / 13.0;
        assert!((ratio("kitten", "sitting") - expected).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        let a = "machine learning for tutoring";
        let b = "machine learning in tutoring systems";
        assert!((ratio(a, b) - ratio(b, a)).abs() < 1e-9);
    }

    #[test]
    fn cutoff_is_inclusive() {
        assert!(is_match("abcdefghij", "abcdefghij", 100));
        // one substitution in ten characters: lcs 9 -> 90.0
        assert!(is_match("abcdefghij", "abcdefghiX", 90));
        assert!(!is_match("abcdefghij", "abcdefghXY", 90));
    }
}
