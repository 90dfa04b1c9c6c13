//! Saved (offer, sailing) entries kept as a pseudo-profile.
//!
//! Favorites live in the `goob-favorites` blob with the same shape as any
//! other profile: each parent offer is a clone of the source offer holding
//! only the favorited sailings, and every sailing is stamped with the
//! discriminator that was effective when it was saved.
//!
//! Ledger calls never fail. Storage problems are logged and reported as
//! [`LedgerOutcome::Skipped`]; membership queries degrade to `false`.

use crate::context::{ActiveView, FAVORITES_KEY, ProfileContext, ViewHooks};
use crate::identity::{MatchScope, caller_id, core_fields_equal, matches_stored, sailing_key};
use crate::model::{FavoriteMeta, Offer, ProfileBlob, Sailing};
use crate::store::{ProfileStore, StoreError, load_blob, save_blob};
use serde::Serialize;
use tracing::{debug, warn};

/// What a ledger mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "count", rename_all = "kebab-case")]
pub enum LedgerOutcome {
    Added,
    AlreadyPresent,
    Removed(usize),
    NotFound,
    /// Storage failed; nothing changed.
    Skipped,
}

impl LedgerOutcome {
    /// Whether the entry is stored after the call.
    #[must_use]
    pub const fn is_favorite(self) -> Option<bool> {
        match self {
            Self::Added | Self::AlreadyPresent => Some(true),
            Self::Removed(_) | Self::NotFound => Some(false),
            Self::Skipped => None,
        }
    }
}

/// Favorites over a [`ProfileStore`], refreshing the host view on change.
pub struct FavoriteLedger<'a> {
    store: &'a dyn ProfileStore,
    hooks: &'a dyn ViewHooks,
}

impl<'a> FavoriteLedger<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ProfileStore, hooks: &'a dyn ViewHooks) -> Self {
        Self { store, hooks }
    }

    /// Whether (offer, sailing) is saved for `profile_id` in this context.
    #[must_use]
    pub fn is_favorite(
        &self,
        ctx: &ProfileContext<'_>,
        offer: &Offer,
        sailing: &Sailing,
        profile_id: Option<&str>,
    ) -> bool {
        let Ok(blob) = self.load() else {
            return false;
        };
        let probe = probe_id(ctx, profile_id);
        let scope = ctx.match_scope(profile_id);

        blob.data.offers.iter().any(|stored_offer| {
            stored_offer.sailings.iter().any(|stored| {
                matches_stored(stored_offer, stored, offer, sailing, probe.as_deref(), scope)
            })
        })
    }

    /// Save (offer, sailing), stamped with the effective discriminator.
    pub fn add(
        &self,
        ctx: &ProfileContext<'_>,
        offer: &Offer,
        sailing: &Sailing,
        profile_id: Option<&str>,
    ) -> LedgerOutcome {
        let Ok(mut blob) = self.load() else {
            return LedgerOutcome::Skipped;
        };
        let effective = ctx.effective_discriminator(profile_id);

        let mut entry = sailing.clone();
        entry.profile_id = Some(effective.clone());

        let offers = &mut blob.data.offers;
        if let Some(parent) = offers.iter_mut().find(|o| o.offer_code == offer.offer_code) {
            let key = sailing_key(offer, &entry, Some(effective.as_str()));
            let exists = parent.sailings.iter().any(|stored| {
                let stored_id = caller_id(stored.profile_id.as_deref()).unwrap_or(effective.as_str());
                sailing_key(offer, stored, Some(stored_id)) == key
            });
            if exists {
                debug!(offer_code = %offer.offer_code, sail_date = %sailing.sail_date, "favorite already present");
                return LedgerOutcome::AlreadyPresent;
            }
            parent.sailings.push(entry);
        } else {
            let mut parent = offer.without_sailings();
            parent.sailings.push(entry);
            parent.favorite_meta = Some(FavoriteMeta {
                profile_id: effective.clone(),
            });
            offers.push(parent);
        }

        if self.save(ctx, &mut blob).is_err() {
            return LedgerOutcome::Skipped;
        }
        debug!(offer_code = %offer.offer_code, sail_date = %sailing.sail_date, profile_id = %effective, "favorite added");
        LedgerOutcome::Added
    }

    /// Remove (offer, sailing); parent offers left empty are purged.
    ///
    /// In the combined view without a caller id every entry with the same
    /// core fields goes, whoever saved it. Otherwise only entries whose own
    /// discriminator matches are removed.
    pub fn remove(
        &self,
        ctx: &ProfileContext<'_>,
        offer: &Offer,
        sailing: &Sailing,
        profile_id: Option<&str>,
    ) -> LedgerOutcome {
        let Ok(mut blob) = self.load() else {
            return LedgerOutcome::Skipped;
        };
        let probe = probe_id(ctx, profile_id);

        let mut removed = 0;
        for stored_offer in &mut blob.data.offers {
            let parent = stored_offer.without_sailings();
            let before = stored_offer.sailings.len();
            stored_offer.sailings.retain(|stored| match probe.as_deref() {
                None => !core_fields_equal(&parent, stored, offer, sailing),
                Some(id) => !matches_stored(&parent, stored, offer, sailing, Some(id), MatchScope::Profile),
            });
            removed += before - stored_offer.sailings.len();
        }
        blob.data.offers.retain(|o| !o.sailings.is_empty());

        if removed == 0 {
            debug!(offer_code = %offer.offer_code, sail_date = %sailing.sail_date, "favorite not found");
            return LedgerOutcome::NotFound;
        }
        if self.save(ctx, &mut blob).is_err() {
            return LedgerOutcome::Skipped;
        }
        debug!(offer_code = %offer.offer_code, sail_date = %sailing.sail_date, removed, "favorite removed");
        LedgerOutcome::Removed(removed)
    }

    /// Flip membership of (offer, sailing).
    pub fn toggle(
        &self,
        ctx: &ProfileContext<'_>,
        offer: &Offer,
        sailing: &Sailing,
        profile_id: Option<&str>,
    ) -> LedgerOutcome {
        if self.ensure_exists().is_err() {
            return LedgerOutcome::Skipped;
        }
        if self.is_favorite(ctx, offer, sailing, profile_id) {
            let outcome = self.remove(ctx, offer, sailing, profile_id);
            debug!(?profile_id, offer_code = %offer.offer_code, sail_date = %sailing.sail_date, ?outcome, "toggled favorite off");
            outcome
        } else {
            let outcome = self.add(ctx, offer, sailing, profile_id);
            debug!(?profile_id, offer_code = %offer.offer_code, sail_date = %sailing.sail_date, ?outcome, "toggled favorite on");
            outcome
        }
    }

    /// Stored favorites offers; empty when nothing is saved or storage fails.
    #[must_use]
    pub fn list(&self) -> Vec<Offer> {
        self.load().map(|blob| blob.data.offers).unwrap_or_default()
    }

    fn load(&self) -> Result<ProfileBlob, StoreError> {
        match load_blob(self.store, FAVORITES_KEY) {
            Ok(blob) => Ok(blob.unwrap_or_else(|| ProfileBlob::new(Vec::new()))),
            Err(err) => {
                warn!(key = FAVORITES_KEY, error = %err, "favorites unreadable");
                Err(err)
            }
        }
    }

    fn save(&self, ctx: &ProfileContext<'_>, blob: &mut ProfileBlob) -> Result<(), StoreError> {
        blob.touch();
        if let Err(err) = save_blob(self.store, FAVORITES_KEY, blob) {
            warn!(key = FAVORITES_KEY, error = %err, "favorites write failed");
            return Err(err);
        }
        self.hooks.invalidate(&ActiveView::Favorites);
        if ctx.view == ActiveView::Favorites {
            self.hooks.reload(&ActiveView::Favorites);
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), StoreError> {
        let present = self.store.get(FAVORITES_KEY).map_err(|err| {
            warn!(key = FAVORITES_KEY, error = %err, "favorites unreadable");
            err
        })?;
        if present.is_none() {
            save_blob(self.store, FAVORITES_KEY, &ProfileBlob::new(Vec::new())).map_err(|err| {
                warn!(key = FAVORITES_KEY, error = %err, "favorites write failed");
                err
            })?;
        }
        Ok(())
    }
}

/// Discriminator used to look up existing entries.
///
/// `None` only in the combined view without a caller id, where lookups fall
/// back to core fields. Elsewhere it is the discriminator `add` would stamp,
/// so a profile view with no caller id probes `"0"` rather than matching any
/// id; that keeps add then check then remove consistent.
fn probe_id(ctx: &ProfileContext<'_>, profile_id: Option<&str>) -> Option<String> {
    if ctx.is_combined_view() && caller_id(profile_id).is_none() {
        None
    } else {
        Some(ctx.effective_discriminator(profile_id))
    }
}
