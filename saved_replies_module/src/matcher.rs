use std::cmp::Ordering;

use crate::fuzzy::{FuzzyOptions, FuzzySearcher};

/// Anything that can be looked up by name.
pub trait MatchCandidate {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

#[derive(Debug)]
pub struct MatchResult<'a, T> {
    pub item: &'a T,
    /// Position of `item` in the candidate slice.
    pub index: usize,
    pub score: f64,
}

/// Rank `candidates` by how well their names match `search_term`.
///
/// Results are ordered best first; equal scores keep input order. Only
/// results whose final score is within the threshold are returned. A blank
/// search term matches nothing.
pub fn fuzzy_search_by_name<'a, T: MatchCandidate>(
    candidates: &'a [T],
    search_term: &str,
) -> Vec<MatchResult<'a, T>> {
    fuzzy_search_with_options(candidates, search_term, &FuzzyOptions::default())
}

pub fn fuzzy_search_with_options<'a, T: MatchCandidate>(
    candidates: &'a [T],
    search_term: &str,
    options: &FuzzyOptions,
) -> Vec<MatchResult<'a, T>> {
    if search_term.trim().is_empty() {
        return Vec::new();
    }

    let searcher = FuzzySearcher::new(search_term, options.clone());
    let mut results: Vec<MatchResult<'a, T>> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let name = item.name();
            if name.trim().is_empty() {
                return None;
            }
            let hit = searcher.search_in(name);
            if !hit.is_match {
                return None;
            }
            let score = searcher.weighted_score(hit.score, name);
            (score <= options.threshold).then_some(MatchResult { item, index, score })
        })
        .collect();

    results.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    results
}
