pub mod config;
pub mod customer_info;
pub mod finder;
pub mod fuzzy;
pub mod matcher;
pub mod store;

pub use config::SavedRepliesConfig;
pub use customer_info::{customer_info_prompt, CustomerMetadata, MetadataValue};
pub use finder::{SavedReplyFinder, ScoredReply};
pub use fuzzy::{FuzzyMatch, FuzzyOptions, FuzzySearcher};
pub use matcher::{fuzzy_search_by_name, fuzzy_search_with_options, MatchCandidate, MatchResult};
pub use store::{
    MemorySavedReplyStore, SavedReply, SavedReplyError, SavedReplyStore, SqliteSavedReplyStore,
};
