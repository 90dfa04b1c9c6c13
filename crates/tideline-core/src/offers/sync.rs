use super::prune::{TIER_MAX_NIGHTS, apply_all_pruning_rules_with_cap, prune_excluded_sailings, prune_tier_offers_with_cap};
use super::refetch::{OfferFetcher, refetch_empty_offers};
use crate::model::{ExcludedSailing, Offer, ProfileBlob};
use crate::normalize::{display_ship_name, parse_itinerary, port_title_case, title_case};
use crate::store::{ProfileStore, StoreError, load_blob, save_blob};
use serde::Serialize;
use tracing::{info, warn};

/// Knobs for [`sync_offers`].
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub tier_max_nights: u32,
    pub normalize_display: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            tier_max_nights: TIER_MAX_NIGHTS,
            normalize_display: false,
        }
    }
}

/// Full offer intake: tidy, prune, refetch empties, prune again.
///
/// The second pass runs the complete rule set so a refetched offer can never
/// bring back an excluded or over-cap sailing, and offers that stayed empty
/// are dropped.
#[must_use]
pub fn sync_offers(
    raw: &[Offer],
    excluded: &[ExcludedSailing],
    fetcher: Option<&dyn OfferFetcher>,
    options: SyncOptions,
) -> Vec<Offer> {
    let tidy: Vec<Offer> = if options.normalize_display {
        raw.iter().map(normalize_offer_display).collect()
    } else {
        raw.to_vec()
    };

    let first_pass = prune_tier_offers_with_cap(&prune_excluded_sailings(&tidy, excluded), options.tier_max_nights);

    let refetched = match fetcher {
        Some(fetcher) => refetch_empty_offers(&first_pass, fetcher),
        None => first_pass,
    };

    let offers = apply_all_pruning_rules_with_cap(&refetched, excluded, options.tier_max_nights);
    info!(
        received = raw.len(),
        kept = offers.len(),
        sailings = offers.iter().map(|o| o.sailings.len()).sum::<usize>(),
        "offer sync complete"
    );
    offers
}

/// Title-case offer and ship names.
#[must_use]
pub fn normalize_offer_display(offer: &Offer) -> Offer {
    let mut tidy = offer.clone();
    tidy.offer_name = title_case(offer.offer_name.trim());
    for sailing in &mut tidy.sailings {
        sailing.ship_name = title_case(sailing.ship_name.trim());
    }
    tidy
}

/// Write `offers` as the profile blob at `profile_key`.
///
/// Profile-level fields already stored under the key (email, loyalty data)
/// are carried over. An unreadable existing blob is replaced.
pub fn persist_offers(
    store: &dyn ProfileStore,
    profile_key: &str,
    offers: Vec<Offer>,
) -> Result<ProfileBlob, StoreError> {
    let mut blob = match load_blob(store, profile_key) {
        Ok(Some(mut existing)) => {
            existing.data.offers = offers;
            existing
        }
        Ok(None) => ProfileBlob::new(offers),
        Err(err) => {
            warn!(profile_key, error = %err, "replacing unreadable profile blob");
            ProfileBlob::new(offers)
        }
    };
    blob.touch();
    save_blob(store, profile_key, &blob)?;
    info!(profile_key, offers = blob.data.offers.len(), "profile offers persisted");
    Ok(blob)
}

/// Offers stored under `profile_key`, or `None` when the key is absent.
pub fn load_offers(store: &dyn ProfileStore, profile_key: &str) -> Result<Option<Vec<Offer>>, StoreError> {
    Ok(load_blob(store, profile_key)?.map(|blob| blob.data.offers))
}

/// One sailing flattened for list output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SailingRow {
    pub offer_code: String,
    pub offer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub ship: String,
    pub ship_code: String,
    pub sail_date: String,
    pub nights: u32,
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    pub gobo: bool,
}

/// One row per sailing, in offer order.
#[must_use]
pub fn flatten_offers(offers: &[Offer]) -> Vec<SailingRow> {
    offers
        .iter()
        .flat_map(|offer| {
            offer.sailings.iter().map(move |sailing| {
                let itinerary = parse_itinerary(&sailing.itinerary_description);
                SailingRow {
                    offer_code: offer.offer_code.clone(),
                    offer_name: offer.offer_name.clone(),
                    category: offer.category.clone(),
                    ship: display_ship_name(&sailing.ship_name),
                    ship_code: sailing.ship_code.clone(),
                    sail_date: sailing.sail_date.clone(),
                    nights: itinerary.nights,
                    ports: itinerary.ports.iter().map(|p| port_title_case(p)).collect(),
                    room_type: sailing.room_type.clone(),
                    gobo: sailing.gobo(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sailing;
    use crate::offers::refetch::FetchError;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn sailing(ship: &str, date: &str, itinerary: &str) -> Sailing {
        Sailing {
            ship_code: ship.into(),
            ship_name: "WONDER OF THE SEAS".into(),
            sail_date: date.into(),
            itinerary_description: itinerary.into(),
            ..Sailing::default()
        }
    }

    fn offer(code: &str, category: Option<&str>, sailings: Vec<Sailing>) -> Offer {
        Offer {
            offer_code: code.into(),
            offer_name: "WAVE SEASON".into(),
            category: category.map(str::to_string),
            sailings,
            ..Offer::default()
        }
    }

    struct Refills;

    impl OfferFetcher for Refills {
        fn fetch_offer(&self, offer_code: &str) -> Result<Option<Offer>, FetchError> {
            Ok(Some(offer(
                offer_code,
                Some("TIER"),
                vec![
                    sailing("WN", "2025-03-09", "7 Night"),
                    sailing("WN", "2025-05-01", "9 Night"),
                    sailing("IC", "2025-06-01", "4 Night"),
                ],
            )))
        }
    }

    #[test]
    fn sync_without_fetcher_drops_empty_offers() {
        let raw = vec![offer("A", None, Vec::new()), offer("B", None, vec![sailing("WN", "2025-03-09", "7 Night")])];
        let synced = sync_offers(&raw, &[], None, SyncOptions::default());
        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].offer_code, "B");
    }

    #[test]
    fn refetched_sailings_are_pruned_again() {
        let raw = vec![offer("T", Some("TIER"), Vec::new())];
        let excluded = vec![ExcludedSailing {
            ship_code: "IC".into(),
            sail_date: "2025-06-01".into(),
        }];
        let synced = sync_offers(&raw, &excluded, Some(&Refills), SyncOptions::default());
        assert_eq!(synced.len(), 1);
        let dates: Vec<_> = synced[0].sailings.iter().map(|s| s.sail_date.as_str()).collect();
        assert_eq!(dates, ["2025-03-09"]);
    }

    #[test]
    fn display_normalization_is_opt_in() {
        let raw = vec![offer("A", None, vec![sailing("WN", "2025-03-09", "7 Night")])];
        let plain = sync_offers(&raw, &[], None, SyncOptions::default());
        assert_eq!(plain[0].offer_name, "WAVE SEASON");

        let tidy = sync_offers(
            &raw,
            &[],
            None,
            SyncOptions {
                normalize_display: true,
                ..SyncOptions::default()
            },
        );
        assert_eq!(tidy[0].offer_name, "Wave Season");
        assert_eq!(tidy[0].sailings[0].ship_name, "Wonder Of The Seas");
    }

    #[test]
    fn persist_keeps_profile_level_fields() {
        let store = MemoryStore::new();
        store
            .set(
                "gobo-a",
                &json!({"data": {"offers": [], "email": "a@example.com"}, "savedAt": 1}).to_string(),
            )
            .expect("seed");

        let blob = persist_offers(&store, "gobo-a", vec![offer("A", None, Vec::new())]).expect("persist");
        assert_eq!(blob.data.email(), Some("a@example.com"));
        assert!(blob.saved_at > 1);

        let offers = load_offers(&store, "gobo-a").expect("load").expect("present");
        assert_eq!(offers.len(), 1);
        assert!(load_offers(&store, "gobo-missing").expect("load").is_none());
    }

    #[test]
    fn persist_replaces_corrupt_blob() {
        let store = MemoryStore::new();
        store.set("gobo-a", "{{nope").expect("seed");
        let blob = persist_offers(&store, "gobo-a", Vec::new()).expect("persist");
        assert!(blob.data.offers.is_empty());
    }

    #[test]
    fn flatten_emits_one_row_per_sailing() {
        let offers = vec![offer(
            "A",
            Some("Balcony"),
            vec![
                sailing("WN", "2025-03-09", "7 Night Western Caribbean: MIAMI, cozumel, PORT OF SPAIN"),
                sailing("WN", "2025-03-16", "Bahamas"),
            ],
        )];
        let rows = flatten_offers(&offers);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ship, "Wonder");
        assert_eq!(rows[0].nights, 7);
        assert_eq!(rows[0].ports, vec!["Miami", "Cozumel", "Port of Spain"]);
        assert_eq!(rows[1].nights, 0);
    }
}
