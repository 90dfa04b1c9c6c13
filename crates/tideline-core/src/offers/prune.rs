use crate::model::{ExcludedSailing, Offer, Sailing, ShipDate};
use crate::normalize::parse_nights;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Longest sailing (in nights) kept on a TIER offer.
pub const TIER_MAX_NIGHTS: u32 = 7;

/// Drop every sailing whose ship/date is excluded, whatever the offer.
#[must_use]
pub fn prune_excluded_sailings(offers: &[Offer], excluded: &[ExcludedSailing]) -> Vec<Offer> {
    if excluded.is_empty() {
        return offers.to_vec();
    }
    let blocked: HashSet<ShipDate> = excluded.iter().map(ExcludedSailing::ship_date).collect();

    offers
        .iter()
        .map(|offer| {
            let mut pruned = offer.without_sailings();
            pruned.sailings = offer
                .sailings
                .iter()
                .filter(|sailing| {
                    let keep = !blocked.contains(&sailing.ship_date());
                    if !keep {
                        debug!(offer_code = %offer.offer_code, sailing = %sailing.ship_date(), "excluded sailing pruned");
                    }
                    keep
                })
                .cloned()
                .collect();
            pruned
        })
        .collect()
}

/// Drop sailings longer than [`TIER_MAX_NIGHTS`] from TIER offers.
#[must_use]
pub fn prune_tier_offers(offers: &[Offer]) -> Vec<Offer> {
    prune_tier_offers_with_cap(offers, TIER_MAX_NIGHTS)
}

/// [`prune_tier_offers`] with a caller-chosen night cap.
#[must_use]
pub fn prune_tier_offers_with_cap(offers: &[Offer], max_nights: u32) -> Vec<Offer> {
    offers
        .iter()
        .map(|offer| {
            if !offer.is_tier() {
                return offer.clone();
            }
            let mut pruned = offer.without_sailings();
            pruned.sailings = offer
                .sailings
                .iter()
                .filter(|sailing| parse_nights(&sailing.itinerary_description) <= max_nights)
                .cloned()
                .collect();
            let dropped = offer.sailings.len() - pruned.sailings.len();
            if dropped > 0 {
                debug!(offer_code = %offer.offer_code, dropped, max_nights, "tier sailings over cap pruned");
            }
            pruned
        })
        .collect()
}

/// Exclusions, then the TIER cap, then removal of offers left with no
/// sailings (including offers that arrived empty).
#[must_use]
pub fn apply_all_pruning_rules(offers: &[Offer], excluded: &[ExcludedSailing]) -> Vec<Offer> {
    apply_all_pruning_rules_with_cap(offers, excluded, TIER_MAX_NIGHTS)
}

#[must_use]
pub fn apply_all_pruning_rules_with_cap(
    offers: &[Offer],
    excluded: &[ExcludedSailing],
    max_nights: u32,
) -> Vec<Offer> {
    let pruned = prune_tier_offers_with_cap(&prune_excluded_sailings(offers, excluded), max_nights);
    pruned
        .into_iter()
        .filter(|offer| !offer.sailings.is_empty())
        .collect()
}

/// Offers that currently have no sailings.
#[must_use]
pub fn find_empty_offers(offers: &[Offer]) -> Vec<&Offer> {
    offers.iter().filter(|offer| offer.sailings.is_empty()).collect()
}

/// Union of two sailing lists keyed by `shipCode|sailDate`.
///
/// Each key keeps the slot of its first appearance. Among `existing`
/// duplicates the last one wins; `incoming` sailings only fill keys that
/// `existing` lacks.
#[must_use]
pub fn merge_sailings(existing: &[Sailing], incoming: &[Sailing]) -> Vec<Sailing> {
    let mut slots: HashMap<ShipDate, usize> = HashMap::with_capacity(existing.len() + incoming.len());
    let mut merged: Vec<Sailing> = Vec::with_capacity(existing.len() + incoming.len());
    for sailing in existing {
        match slots.entry(sailing.ship_date()) {
            Entry::Occupied(slot) => merged[*slot.get()] = sailing.clone(),
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(sailing.clone());
            }
        }
    }
    for sailing in incoming {
        if let Entry::Vacant(slot) = slots.entry(sailing.ship_date()) {
            slot.insert(merged.len());
            merged.push(sailing.clone());
        }
    }
    merged
}
