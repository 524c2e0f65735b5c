//! Lenient extraction of numeric samples from device replies.
//!
//! Replies mix prose and numbers. Every token between separators (space, comma,
//! newline, carriage return) that reads as a floating-point number becomes a
//! sample, `inf` and `nan` included; everything else is dropped without complaint.

const SEPARATORS: [char; 4] = [' ', ',', '\n', '\r'];

/// Parses a single token. Surrounding whitespace is ignored.
pub fn sample_value(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    token.parse::<f64>().ok()
}

/// Extracts the ordered sequence of samples from `text`. Never fails.
pub fn parse_samples(text: &str) -> Vec<f64> {
    text.split(SEPARATORS).filter_map(sample_value).collect()
}

/// Summary of a sample sequence. `min`, `max` and `mean` cover finite values only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub count: usize,
    pub finite: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SampleStats {
    /// Returns `None` when there is no finite sample to summarize.
    pub fn of(samples: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let min = finite.iter().copied().fold(f64::MAX, f64::min);
        let max = finite.iter().copied().fold(f64::MIN, f64::max);
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        Some(Self {
            count: samples.len(),
            finite: finite.len(),
            min,
            max,
            mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_separators() {
        assert_eq!(parse_samples("0.5 1.2,1.9\n"), vec![0.5, 1.2, 1.9]);
    }

    #[test]
    fn token_with_letters_is_dropped_whole() {
        assert_eq!(parse_samples("count=3"), Vec::<f64>::new());
        assert_eq!(parse_samples("dip count=3 ok"), Vec::<f64>::new());
        assert_eq!(parse_samples("dips: 3"), vec![3.0]);
    }

    #[test]
    fn prose_and_numbers_keep_order() {
        let reply = "History (n=5):\r\n0.012, 0.990, 1.500,\r\n1.200, 0.300\r\n";
        assert_eq!(parse_samples(reply), vec![0.012, 0.99, 1.5, 1.2, 0.3]);
    }

    #[test]
    fn consecutive_separators_yield_nothing_extra() {
        assert_eq!(parse_samples(",,1,, ,2\n\n\r3,"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        assert!(parse_samples("").is_empty());
        assert!(parse_samples(" \n\r\n  ").is_empty());
    }

    #[test]
    fn signs_exponents_and_integers_parse() {
        assert_eq!(parse_samples("-1 +2 3e-1 42"), vec![-1.0, 2.0, 0.3, 42.0]);
    }

    #[test]
    fn tabs_are_not_separators_but_are_trimmed() {
        assert_eq!(parse_samples("\t7 1\t2"), vec![7.0]);
    }

    #[test]
    fn infinite_and_overflowing_tokens_are_kept() {
        let samples = parse_samples("1 inf 1e999 -inf 2");
        assert_eq!(
            samples,
            vec![1.0, f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, 2.0]
        );
    }

    #[test]
    fn nan_tokens_are_kept_in_place() {
        let samples = parse_samples("nan 1 NaN");
        assert_eq!(samples.len(), 3);
        assert!(samples[0].is_nan());
        assert_eq!(samples[1], 1.0);
        assert!(samples[2].is_nan());
    }

    #[test]
    fn reparsing_serialized_output_is_stable() {
        let inputs = [
            "0.5 1.2,1.9\n",
            "Samples: 0.001 0.1 1e-3 123456.789\r\n-7,foo,8",
            "nothing numeric here",
            "nan inf -inf 1e999 0.25",
        ];
        for text in inputs {
            let first = parse_samples(text);
            let joined = first
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let again = parse_samples(&joined);
            assert_eq!(again.len(), first.len(), "input {text:?}");
            for (a, b) in again.iter().zip(&first) {
                assert!(a == b || (a.is_nan() && b.is_nan()), "input {text:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn stats_summarize_samples() {
        assert_eq!(SampleStats::of(&[]), None);
        let stats = SampleStats::of(&[1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.finite, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, 2.0);
    }

    #[test]
    fn stats_skip_non_finite_values() {
        let stats = SampleStats::of(&[f64::NAN, 0.5, f64::INFINITY, 1.5]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.finite, 2);
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 1.5);
        assert_eq!(stats.mean, 1.0);
        assert_eq!(SampleStats::of(&[f64::NAN, f64::INFINITY]), None);
    }
}
