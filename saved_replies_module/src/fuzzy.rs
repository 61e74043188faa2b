//! Approximate name matching on normalized edit distance.
//!
//! Scores are in `[0, 1]` where 0 is a perfect match. The pattern is compared
//! against every window of the text whose length is within the error budget
//! (`threshold * pattern_len`) of the pattern's; the best window wins. A window
//! only counts when it shares a run of `min_match_char_length` characters with
//! the pattern.

use strsim::normalized_levenshtein;

/// Floor for anything short of whole-text equality, so exact names rank
/// ahead of names that merely contain the term.
const PARTIAL_MATCH_FLOOR: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyOptions {
    /// Worst score still counted as a match.
    pub threshold: f64,
    /// How far from `location` a match may sit before it stops scoring.
    pub distance: usize,
    pub location: usize,
    pub min_match_char_length: usize,
    pub ignore_location: bool,
    pub case_sensitive: bool,
    pub ignore_field_norm: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            distance: 100,
            location: 0,
            min_match_char_length: 2,
            ignore_location: true,
            case_sensitive: false,
            ignore_field_norm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub is_match: bool,
    pub score: f64,
}

impl FuzzyMatch {
    const MISS: FuzzyMatch = FuzzyMatch {
        is_match: false,
        score: 1.0,
    };
}

#[derive(Debug, Clone)]
pub struct FuzzySearcher {
    pattern: Vec<char>,
    options: FuzzyOptions,
}

impl FuzzySearcher {
    pub fn new(pattern: &str, options: FuzzyOptions) -> Self {
        Self {
            pattern: fold_case(pattern, options.case_sensitive).chars().collect(),
            options,
        }
    }

    pub fn options(&self) -> &FuzzyOptions {
        &self.options
    }

    /// Raw score of the best window of `text`.
    pub fn search_in(&self, text: &str) -> FuzzyMatch {
        let text: Vec<char> = fold_case(text, self.options.case_sensitive).chars().collect();
        if self.pattern == text {
            return FuzzyMatch {
                is_match: true,
                score: 0.0,
            };
        }
        let min_run = self.options.min_match_char_length.max(1);
        if self.pattern.len() < min_run || text.len() < min_run {
            return FuzzyMatch::MISS;
        }

        let pattern: String = self.pattern.iter().collect();
        let budget = (self.options.threshold * self.pattern.len() as f64).ceil() as usize;
        let shortest = self.pattern.len().saturating_sub(budget).max(min_run);
        let longest = (self.pattern.len() + budget).min(text.len());

        let mut best: Option<f64> = None;
        for len in shortest..=longest {
            for start in 0..=text.len() - len {
                let window = &text[start..start + len];
                if !shares_run(&self.pattern, window, min_run) {
                    continue;
                }
                let candidate: String = window.iter().collect();
                let score = 1.0 - normalized_levenshtein(&pattern, &candidate)
                    + self.proximity_penalty(start);
                if best.map_or(true, |current| score < current) {
                    best = Some(score);
                }
            }
        }

        match best {
            Some(score) if score <= self.options.threshold => FuzzyMatch {
                is_match: true,
                score: score.max(PARTIAL_MATCH_FLOOR),
            },
            _ => FuzzyMatch::MISS,
        }
    }

    /// Weight a raw score by how many words the field has. Hits in short
    /// fields rank ahead of equally good hits in long ones.
    pub fn weighted_score(&self, raw_score: f64, field: &str) -> f64 {
        let base = if raw_score == 0.0 {
            f64::EPSILON
        } else {
            raw_score
        };
        if self.options.ignore_field_norm {
            base
        } else {
            base.powf(field_norm(field))
        }
    }

    fn proximity_penalty(&self, start: usize) -> f64 {
        if self.options.ignore_location {
            return 0.0;
        }
        let proximity = start.abs_diff(self.options.location);
        match (proximity, self.options.distance) {
            (0, _) => 0.0,
            (_, 0) => 1.0,
            (proximity, distance) => proximity as f64 / distance as f64,
        }
    }
}

/// `1 / sqrt(word_count)`, rounded to three decimals.
pub fn field_norm(value: &str) -> f64 {
    let words = value.split(' ').filter(|word| !word.is_empty()).count().max(1);
    let norm = 1.0 / (words as f64).sqrt();
    (norm * 1000.0).round() / 1000.0
}

fn fold_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

/// Whether `pattern` and `window` have `run` consecutive characters in common.
fn shares_run(pattern: &[char], window: &[char], run: usize) -> bool {
    if pattern.len() < run || window.len() < run {
        return false;
    }
    pattern
        .windows(run)
        .any(|gram| window.windows(run).any(|other| other == gram))
}
