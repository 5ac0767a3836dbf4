// SPDX-License-Identifier: Apache-2.0

//! pass@k estimation and the comparison statistics derived from it.

/// Added to the denominator of pass@k ratios.
pub const RATIO_EPSILON: f64 = 1e-6;

/// Stand-in for zero in `safe_log_ratio`.
const LOG_RATIO_EPSILON: f64 = 1e-10;

/// Unbiased estimate of the probability that at least one of `k` samples
/// drawn from `n` (of which `c` are correct) passes.
///
/// Evaluated as `1 - prod_{i=n-c+1}^{n} (1 - k/i)`, which never forms a
/// binomial coefficient with a negative argument. When fewer than `k`
/// samples are incorrect every draw of `k` contains a correct one and the
/// result is exactly `1.0`.
pub fn pass_at_k(n: usize, c: usize, k: usize) -> f64 {
    let incorrect = n.saturating_sub(c);
    if incorrect < k {
        return 1.0;
    }
    let k = k as f64;
    let product: f64 = (incorrect + 1..=n).map(|i| 1.0 - k / i as f64).product();
    1.0 - product
}

/// `mutated / (original + epsilon)`; finite for any non-negative input.
pub fn pass_ratio(mutated: f64, original: f64) -> f64 {
    mutated / (original + RATIO_EPSILON)
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            row[j + 1] = substitution.min(prev[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Mean edit distance over the pairs `(first[i], second[j])` with `i <= j`.
/// Zero when either side is empty.
pub fn average_levenshtein(first: &[String], second: &[String]) -> f64 {
    let mut total = 0usize;
    let mut count = 0usize;
    for (i, a) in first.iter().enumerate() {
        for b in second.iter().skip(i) {
            total += levenshtein(a, b);
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}

/// Natural log of `mutated / original` that stays finite at zero.
pub fn safe_log_ratio(mutated: f64, original: f64) -> f64 {
    match (mutated == 0.0, original == 0.0) {
        (true, true) => 0.0,
        (false, true) => (mutated / LOG_RATIO_EPSILON).ln(),
        (true, false) => -(original / LOG_RATIO_EPSILON).ln(),
        (false, false) => (mutated / original).ln(),
    }
}

pub fn symmetric_percent_change(mutated: f64, original: f64) -> f64 {
    if mutated == original {
        return 0.0;
    }
    200.0 * (mutated - original) / (mutated + original)
}

/// Change relative to `original`; infinite when `original` is zero.
pub fn percent_change(mutated: f64, original: f64) -> f64 {
    if mutated == original {
        return 0.0;
    }
    if original == 0.0 {
        return f64::INFINITY;
    }
    100.0 * (mutated - original) / original
}

/// Mean, median and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
}

impl Summary {
    /// `None` for an empty sample.
    pub fn of(values: &[f64]) -> Option<Summary> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Some(Summary {
            mean,
            median,
            stddev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ten_samples_seven_correct() {
        assert!(close(pass_at_k(10, 7, 1), 0.7));
        assert_eq!(pass_at_k(10, 7, 5), 1.0);
        assert_eq!(pass_at_k(10, 7, 10), 1.0);
        // 1 - C(7,2)/C(10,2)
        assert!(close(pass_at_k(10, 3, 2), 1.0 - 21.0 / 45.0));
    }

    #[test_case(0, 0, 1 ; "no samples")]
    #[test_case(5, 5, 3 ; "all correct")]
    #[test_case(4, 1, 4 ; "k exceeds incorrect")]
    fn fewer_incorrect_than_k_is_certain(n: usize, c: usize, k: usize) {
        assert_eq!(pass_at_k(n, c, k), 1.0);
    }

    #[test]
    fn nothing_correct_is_zero() {
        assert_eq!(pass_at_k(10, 0, 1), 0.0);
        assert_eq!(pass_at_k(10, 0, 5), 0.0);
    }

    #[test]
    fn monotonic_in_k() {
        for n in 1..=20 {
            for c in 0..=n {
                let mut last = 0.0;
                for k in 1..=n {
                    let p = pass_at_k(n, c, k);
                    assert!(p + 1e-12 >= last, "n={} c={} k={}", n, c, k);
                    assert!((0.0..=1.0 + 1e-12).contains(&p));
                    last = p;
                }
            }
        }
    }

    #[test]
    fn ratio_is_finite_when_original_is_zero() {
        let r = pass_ratio(0.5, 0.0);
        assert!(r.is_finite());
        assert!(r > 1e5);
        assert_eq!(pass_ratio(0.0, 0.0), 0.0);
        assert!(close(pass_ratio(0.5, 0.5), 0.5 / (0.5 + RATIO_EPSILON)));
    }

    #[test_case("", "", 0 ; "both empty")]
    #[test_case("kitten", "sitting", 3 ; "kitten")]
    #[test_case("abc", "", 3 ; "one empty")]
    #[test_case("flaw", "lawn", 2 ; "flaw")]
    fn edit_distance(a: &str, b: &str, want: usize) {
        assert_eq!(levenshtein(a, b), want);
        assert_eq!(levenshtein(b, a), want);
    }

    #[test]
    fn average_levenshtein_uses_upper_triangle() {
        let first = vec!["ab".to_string(), "xy".to_string()];
        let second = vec!["ab".to_string(), "abc".to_string()];
        // (ab, ab) = 0, (ab, abc) = 1, (xy, abc) = 3
        assert!(close(average_levenshtein(&first, &second), 4.0 / 3.0));
        assert_eq!(average_levenshtein(&first, &[]), 0.0);
        assert_eq!(average_levenshtein(&[], &second), 0.0);
    }

    #[test]
    fn log_ratio_edges() {
        assert_eq!(safe_log_ratio(0.0, 0.0), 0.0);
        assert!(safe_log_ratio(0.5, 0.0) > 20.0);
        assert!(safe_log_ratio(0.0, 0.5) < -20.0);
        assert!(close(safe_log_ratio(0.5, 0.25), 2f64.ln()));
    }

    #[test]
    fn percent_changes() {
        assert_eq!(percent_change(0.3, 0.3), 0.0);
        assert_eq!(percent_change(0.3, 0.0), f64::INFINITY);
        assert!(close(percent_change(0.75, 0.5), 50.0));
        assert!(close(symmetric_percent_change(1.0, 0.0), 200.0));
        assert!(close(symmetric_percent_change(0.0, 1.0), -200.0));
    }

    #[test]
    fn summary_statistics() {
        assert_eq!(Summary::of(&[]), None);
        let s = Summary::of(&[1.0, 3.0, 2.0, 6.0]).unwrap();
        assert!(close(s.mean, 3.0));
        assert!(close(s.median, 2.5));
        assert!(close(s.stddev, 3.5f64.sqrt()));
    }
}
