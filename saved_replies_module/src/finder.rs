use std::sync::Arc;
use tracing::{debug, error};

use crate::fuzzy::FuzzyOptions;
use crate::matcher::fuzzy_search_with_options;
use crate::store::{SavedReply, SavedReplyError, SavedReplyStore};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReply {
    pub reply: SavedReply,
    pub score: f64,
}

/// Looks up saved replies by name on top of a [`SavedReplyStore`].
pub struct SavedReplyFinder {
    store: Arc<dyn SavedReplyStore>,
    options: FuzzyOptions,
}

impl SavedReplyFinder {
    pub fn new(store: Arc<dyn SavedReplyStore>) -> Self {
        Self::with_options(store, FuzzyOptions::default())
    }

    pub fn with_options(store: Arc<dyn SavedReplyStore>, options: FuzzyOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &FuzzyOptions {
        &self.options
    }

    /// Active replies ranked against `term`, best first.
    pub fn search(&self, term: &str) -> Result<Vec<ScoredReply>, SavedReplyError> {
        let replies = self.store.list_active_replies()?;
        let results = fuzzy_search_with_options(&replies, term, &self.options)
            .into_iter()
            .map(|result| ScoredReply {
                reply: result.item.clone(),
                score: result.score,
            })
            .collect::<Vec<_>>();
        debug!(
            "saved reply search: {} candidates, {} matches",
            replies.len(),
            results.len()
        );
        Ok(results)
    }

    /// The single reply that best answers `term`.
    ///
    /// A reply whose name equals `term` exactly (case included) wins outright.
    /// Otherwise the top fuzzy match is used. Either way the winner is reloaded
    /// from the store by id.
    pub fn find_best_match(&self, term: &str) -> Result<Option<SavedReply>, SavedReplyError> {
        let replies = self.store.list_active_replies()?;

        if let Some(exact) = replies.iter().find(|reply| reply.name == term) {
            debug!("exact saved reply match {}", exact.id);
            return self.resolve(&exact.id).map(Some);
        }

        let ranked = fuzzy_search_with_options(&replies, term, &self.options);
        match ranked.first() {
            Some(best) => {
                debug!(
                    "fuzzy saved reply match {} score={:.4}",
                    best.item.id, best.score
                );
                self.resolve(&best.item.id).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Fetches a reply and counts it as used.
    pub fn use_reply(&self, id: &str) -> Result<SavedReply, SavedReplyError> {
        self.store.record_usage(id)
    }

    fn resolve(&self, id: &str) -> Result<SavedReply, SavedReplyError> {
        match self.store.get_reply(id)? {
            Some(reply) => Ok(reply),
            None => {
                error!("saved reply {} vanished between list and lookup", id);
                Err(SavedReplyError::InconsistentStore(id.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySavedReplyStore;

    fn finder_with(names: &[&str]) -> (SavedReplyFinder, Vec<SavedReply>) {
        let replies: Vec<SavedReply> = names
            .iter()
            .map(|name| SavedReply::new(name, &format!("{name} body")))
            .collect();
        let store = MemorySavedReplyStore::with_replies(replies.clone());
        (SavedReplyFinder::new(Arc::new(store)), replies)
    }

    /// Lists replies it cannot load afterwards.
    struct ForgetfulStore {
        replies: Vec<SavedReply>,
    }

    impl SavedReplyStore for ForgetfulStore {
        fn list_active_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
            Ok(self.replies.clone())
        }

        fn list_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
            Ok(self.replies.clone())
        }

        fn get_reply(&self, _id: &str) -> Result<Option<SavedReply>, SavedReplyError> {
            Ok(None)
        }

        fn create_reply(&self, _name: &str, _content: &str) -> Result<SavedReply, SavedReplyError> {
            Err(SavedReplyError::InvalidReply("read only".to_string()))
        }

        fn update_reply(
            &self,
            id: &str,
            _name: &str,
            _content: &str,
        ) -> Result<SavedReply, SavedReplyError> {
            Err(SavedReplyError::NotFound(id.to_string()))
        }

        fn set_active(&self, id: &str, _active: bool) -> Result<SavedReply, SavedReplyError> {
            Err(SavedReplyError::NotFound(id.to_string()))
        }

        fn record_usage(&self, id: &str) -> Result<SavedReply, SavedReplyError> {
            Err(SavedReplyError::NotFound(id.to_string()))
        }
    }

    #[test]
    fn exact_name_beats_better_fuzzy_score() {
        let mut popular = SavedReply::new("Refund", "Refunds take 5 days.");
        popular.usage_count = 10;
        let exact = SavedReply::new("refund", "See our refund policy.");
        let store = MemorySavedReplyStore::with_replies(vec![exact.clone(), popular.clone()]);
        let finder = SavedReplyFinder::new(Arc::new(store));

        // Case-folded, both names tie and the more used one ranks first.
        let ranked = finder.search("refund").expect("search");
        assert_eq!(ranked[0].reply.id, popular.id);

        let found = finder
            .find_best_match("refund")
            .expect("lookup")
            .expect("match");
        assert_eq!(found.id, exact.id);
    }

    #[test]
    fn fuzzy_fallback_picks_top_result() {
        let (finder, replies) = finder_with(&["Shipping Info", "Refund Policy"]);
        let found = finder
            .find_best_match("refnd")
            .expect("lookup")
            .expect("match");
        assert_eq!(found.id, replies[1].id);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let (finder, _) = finder_with(&["Shipping Info"]);
        assert!(finder.find_best_match("zzzzqqqq").expect("lookup").is_none());
        assert!(finder.find_best_match("   ").expect("lookup").is_none());
    }

    #[test]
    fn vanished_reply_is_reported() {
        let reply = SavedReply::new("Refund Policy", "We refund.");
        let id = reply.id.clone();
        let finder = SavedReplyFinder::new(Arc::new(ForgetfulStore {
            replies: vec![reply],
        }));

        assert!(matches!(
            finder.find_best_match("Refund Policy"),
            Err(SavedReplyError::InconsistentStore(missing)) if missing == id
        ));
        assert!(matches!(
            finder.find_best_match("refund"),
            Err(SavedReplyError::InconsistentStore(_))
        ));
    }

    #[test]
    fn inactive_replies_are_ignored() {
        let store = Arc::new(MemorySavedReplyStore::new());
        let reply = store.create_reply("Refund Policy", "body").expect("create");
        store.set_active(&reply.id, false).expect("deactivate");
        let finder = SavedReplyFinder::new(store);

        assert!(finder.find_best_match("Refund Policy").expect("lookup").is_none());
        assert!(finder.search("refund").expect("search").is_empty());
    }

    #[test]
    fn search_returns_scored_replies() {
        let (finder, replies) = finder_with(&["Refund Policy", "Shipping Info"]);
        let results = finder.search("refund").expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reply.id, replies[0].id);
        assert!(results[0].score <= 0.4);
    }

    #[test]
    fn use_reply_counts_usage() {
        let store = Arc::new(MemorySavedReplyStore::new());
        let reply = store.create_reply("Greeting", "Hello").expect("create");
        let finder = SavedReplyFinder::new(store.clone());

        finder.use_reply(&reply.id).expect("use");
        let used = finder.use_reply(&reply.id).expect("use");
        assert_eq!(used.usage_count, 2);
        assert!(matches!(
            finder.use_reply("missing"),
            Err(SavedReplyError::NotFound(_))
        ));
    }
}
