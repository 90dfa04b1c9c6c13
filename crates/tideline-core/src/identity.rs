//! Stable identity for (offer, sailing) pairs.
//!
//! A sailing is identified by its offer code, ship name, sail date, and GOBO
//! flag, plus a discriminator naming the profile that owns it. Profile-scoped
//! matching compares all five parts. Combined-scoped matching additionally
//! accepts a match on the four core fields alone, so the combined view can
//! see favorites saved from either linked account.

use crate::model::{Offer, Sailing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator used when no profile id is supplied.
pub const COMBINED_DISCRIMINATOR: &str = "C";

/// Profile id assumed for favorites saved from a plain profile view without
/// an explicit id.
pub const DEFAULT_PROFILE_ID: &str = "0";

/// Joins the numeric ids of linked accounts (`"3-4"`).
pub const LINKED_ID_SEPARATOR: char = '-';

/// The discriminator-free part of a sailing identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreFields {
    pub offer_code: String,
    pub ship_name: String,
    pub sail_date: String,
    pub is_gobo: bool,
}

impl CoreFields {
    #[must_use]
    pub fn of(offer: &Offer, sailing: &Sailing) -> Self {
        Self {
            offer_code: offer.offer_code.clone(),
            ship_name: sailing.ship_name.clone(),
            sail_date: sailing.sail_date.clone(),
            is_gobo: sailing.gobo(),
        }
    }
}

/// Full identity key: discriminator plus core fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SailingKey {
    discriminator: String,
    core: CoreFields,
}

impl SailingKey {
    #[must_use]
    pub fn new(discriminator: &str, core: CoreFields) -> Self {
        Self {
            discriminator: discriminator.to_string(),
            core,
        }
    }

    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }
}

impl fmt::Display for SailingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.discriminator,
            self.core.offer_code,
            self.core.ship_name,
            self.core.sail_date,
            self.core.is_gobo
        )
    }
}

/// Treat an empty caller id the same as no id at all.
#[must_use]
pub fn caller_id(profile_id: Option<&str>) -> Option<&str> {
    profile_id.filter(|id| !id.is_empty())
}

/// Identity key for `sailing` within `offer`, discriminated by `profile_id`
/// or [`COMBINED_DISCRIMINATOR`] when there is none.
#[must_use]
pub fn sailing_key(offer: &Offer, sailing: &Sailing, profile_id: Option<&str>) -> SailingKey {
    SailingKey::new(
        caller_id(profile_id).unwrap_or(COMBINED_DISCRIMINATOR),
        CoreFields::of(offer, sailing),
    )
}

/// Compare two (offer, sailing) pairs ignoring any discriminator.
#[must_use]
pub fn core_fields_equal(
    a_offer: &Offer,
    a_sailing: &Sailing,
    b_offer: &Offer,
    b_sailing: &Sailing,
) -> bool {
    a_offer.offer_code == b_offer.offer_code
        && a_sailing.ship_name == b_sailing.ship_name
        && a_sailing.sail_date == b_sailing.sail_date
        && a_sailing.gobo() == b_sailing.gobo()
}

/// Which identity rules apply to a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Discriminator must match.
    Profile,
    /// Core fields alone are enough.
    Combined,
}

/// How combined scope is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopePolicy {
    /// Combined scope only when the active view is the combined profile.
    #[default]
    ViewOnly,
    /// Also treat a caller id containing `-` as a linked-account id.
    ViewOrLinkedId,
}

impl ScopePolicy {
    #[must_use]
    pub fn scope(self, combined_view: bool, profile_id: Option<&str>) -> MatchScope {
        let linked_id = matches!(self, Self::ViewOrLinkedId)
            && caller_id(profile_id).is_some_and(|id| id.contains(LINKED_ID_SEPARATOR));
        if combined_view || linked_id {
            MatchScope::Combined
        } else {
            MatchScope::Profile
        }
    }
}

/// Whether a stored entry matches the candidate (offer, sailing).
///
/// With a caller id, the exact key is compared using the stored entry's own
/// discriminator (or the caller id when the entry carries none). In combined
/// scope a core-field match is accepted as well.
#[must_use]
pub fn matches_stored(
    stored_offer: &Offer,
    stored_sailing: &Sailing,
    offer: &Offer,
    sailing: &Sailing,
    profile_id: Option<&str>,
    scope: MatchScope,
) -> bool {
    let exact = caller_id(profile_id).is_some_and(|id| {
        let stored_discriminator = caller_id(stored_sailing.profile_id.as_deref()).unwrap_or(id);
        sailing_key(stored_offer, stored_sailing, Some(stored_discriminator))
            == sailing_key(offer, sailing, Some(id))
    });

    exact
        || (scope == MatchScope::Combined
            && core_fields_equal(stored_offer, stored_sailing, offer, sailing))
}
