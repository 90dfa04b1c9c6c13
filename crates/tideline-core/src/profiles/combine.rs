//! The combined profile: sailings two linked accounts can book together.

use super::linked::load_linked_accounts;
use crate::context::{ActiveView, COMBINED_KEY, ViewHooks};
use crate::model::{Brand, Offer, ProfileBlob, Sailing};
use crate::store::{ProfileStore, StoreError, load_blob, save_blob};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const TWO_ROOM_MARKER: &str = "two room offer";
const TWO_GUESTS: &str = "2 guests";

/// Identity of a sailing across two profiles.
#[derive(Debug, PartialEq, Eq, Hash)]
struct PairKey {
    campaign: String,
    ship_name: String,
    sail_date: String,
    gobo: Option<bool>,
}

impl PairKey {
    fn of(offer: &Offer, sailing: &Sailing) -> Self {
        Self {
            campaign: campaign_code(offer).to_string(),
            ship_name: sailing.ship_name.clone(),
            sail_date: sailing.sail_date.clone(),
            gobo: sailing.is_gobo,
        }
    }
}

/// Campaign the offer was issued under; falls back to the offer code.
fn campaign_code(offer: &Offer) -> &str {
    offer.extra_str("campaignCode").unwrap_or(&offer.offer_code)
}

/// Combine two profiles into the offers both can use.
///
/// The result copies `a`, keeping only sailings `b` also has under the same
/// campaign, ship, date, and GOBO flag. When either side is `None` the other
/// is returned as is.
#[must_use]
pub fn combine_profiles(a: Option<&ProfileBlob>, b: Option<&ProfileBlob>) -> Option<ProfileBlob> {
    let (a, b) = match (a, b) {
        (None, None) => return None,
        (Some(only), None) | (None, Some(only)) => return Some(only.clone()),
        (Some(a), Some(b)) => (a, b),
    };

    let mut partners: HashMap<PairKey, (&Offer, &Sailing)> = HashMap::new();
    for offer in &b.data.offers {
        for sailing in &offer.sailings {
            partners.insert(PairKey::of(offer, sailing), (offer, sailing));
        }
    }

    let mut combined = a.clone();
    for offer in &mut combined.data.offers {
        let key_offer = offer.without_sailings();
        let own_code = offer.offer_code.clone();
        let own_name = offer.offer_name.to_lowercase();
        let sailings = std::mem::take(&mut offer.sailings);

        for mut sailing in sailings {
            let Some(&(partner_offer, partner_sailing)) = partners.get(&PairKey::of(&key_offer, &sailing)) else {
                continue;
            };
            if own_name.contains(TWO_ROOM_MARKER) || partner_offer.offer_name.to_lowercase().contains(TWO_ROOM_MARKER) {
                continue;
            }

            let celebrity = key_offer.brand_hint() == Some(Brand::Celebrity)
                || partner_offer.brand_hint() == Some(Brand::Celebrity);
            let brand = if celebrity { Brand::Celebrity } else { Brand::Royal };
            let order = brand.room_order();
            let own_rank = rank(order, sailing.room_type.as_deref());
            let partner_rank = rank(order, partner_sailing.room_type.as_deref());

            let room_type = if sailing.gobo() || partner_sailing.gobo() {
                sailing.is_gobo = Some(false);
                // an unknown room type counts as the lowest
                let lowest = own_rank.zip(partner_rank).map_or(0, |(x, y)| x.min(y));
                Some(order[lowest].to_string())
            } else {
                if own_code != partner_offer.offer_code {
                    offer.offer_code = format!("{own_code} / {}", partner_offer.offer_code);
                }
                own_rank
                    .max(partner_rank)
                    .map(|highest| order[(highest + 1).min(order.len() - 1)].to_string())
            };

            sailing.room_type.clone_from(&room_type);
            offer.category = room_type;
            offer.extra.insert("guests".into(), Value::String(TWO_GUESTS.into()));
            offer.sailings.push(sailing);
        }
    }

    combined.data.offers.retain(|offer| !offer.sailings.is_empty());
    combined.merged = true;
    combined.merged_from = [a.data.email(), b.data.email()]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    combined.touch();

    debug!(
        offers = combined.data.offers.len(),
        sailings = combined.data.offers.iter().map(|o| o.sailings.len()).sum::<usize>(),
        "profiles combined"
    );
    Some(combined)
}

fn rank(order: &[&str], room_type: Option<&str>) -> Option<usize> {
    room_type.and_then(|room| order.iter().position(|candidate| *candidate == room))
}

/// Rebuild the combined profile from the first two linked accounts.
///
/// Returns `Ok(None)` without writing when fewer than two linked profiles
/// can be loaded.
pub fn update_combined_offers(
    store: &dyn ProfileStore,
    hooks: &dyn ViewHooks,
) -> Result<Option<ProfileBlob>, StoreError> {
    let accounts = load_linked_accounts(store);
    if accounts.len() < 2 {
        debug!(linked = accounts.len(), "not enough linked accounts to combine");
        return Ok(None);
    }

    let profiles: Vec<ProfileBlob> = accounts
        .iter()
        .filter_map(|account| match load_blob(store, &account.key) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(key = %account.key, error = %err, "skipping unreadable linked profile");
                None
            }
        })
        .collect();
    let [first, second, ..] = profiles.as_slice() else {
        debug!(loaded = profiles.len(), "not enough linked profiles to combine");
        return Ok(None);
    };

    let Some(combined) = combine_profiles(Some(first), Some(second)) else {
        return Ok(None);
    };
    save_blob(store, COMBINED_KEY, &combined)?;
    hooks.invalidate(&ActiveView::Combined);
    info!(offers = combined.data.offers.len(), "combined profile updated");
    Ok(Some(combined))
}
