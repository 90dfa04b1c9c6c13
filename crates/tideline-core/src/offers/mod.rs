//! Offer intake: pruning rules, sailing merge, and refetch of empty offers.

pub mod prune;
pub mod refetch;
pub mod sync;

pub use prune::{
    TIER_MAX_NIGHTS, apply_all_pruning_rules, apply_all_pruning_rules_with_cap, find_empty_offers,
    merge_sailings, prune_excluded_sailings, prune_tier_offers, prune_tier_offers_with_cap,
};
pub use refetch::{Credentials, FetchError, HttpOfferFetcher, OfferFetcher, refetch_empty_offers};
pub use sync::{
    SailingRow, SyncOptions, flatten_offers, load_offers, normalize_offer_display, persist_offers,
    sync_offers,
};
