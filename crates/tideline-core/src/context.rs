//! Read-only ambient state passed into ledger calls.

use crate::identity::{COMBINED_DISCRIMINATOR, DEFAULT_PROFILE_ID, LINKED_ID_SEPARATOR, MatchScope, ScopePolicy, caller_id};
use crate::profiles::LinkedAccount;
use std::fmt;

/// Storage key of the favorites pseudo-profile.
pub const FAVORITES_KEY: &str = "goob-favorites";

/// Storage key of the combined-offers pseudo-profile.
pub const COMBINED_KEY: &str = "goob-combined";

/// Maps a profile storage key to its stable numeric id.
pub trait ProfileIdResolver {
    fn profile_id(&self, key: &str) -> Option<u32>;
}

/// Resolver for hosts that do not number their profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfileIds;

impl ProfileIdResolver for NoProfileIds {
    fn profile_id(&self, _key: &str) -> Option<u32> {
        None
    }
}

/// Which profile the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveView {
    /// A single stored profile, by storage key.
    Profile(String),
    /// The synthetic profile built from linked accounts.
    Combined,
    /// The favorites pseudo-profile.
    Favorites,
}

impl ActiveView {
    /// Storage key backing the view.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        match self {
            Self::Profile(key) => key,
            Self::Combined => COMBINED_KEY,
            Self::Favorites => FAVORITES_KEY,
        }
    }
}

impl fmt::Display for ActiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(key) => write!(f, "profile:{key}"),
            Self::Combined => f.write_str("combined"),
            Self::Favorites => f.write_str("favorites"),
        }
    }
}

/// Callbacks into the host's view cache.
pub trait ViewHooks {
    /// Drop any cached rendering of `view`.
    fn invalidate(&self, view: &ActiveView);
    /// Re-render `view` from storage.
    fn reload(&self, view: &ActiveView);
}

/// Hooks for hosts without a view cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl ViewHooks for NoopHooks {
    fn invalidate(&self, _view: &ActiveView) {}
    fn reload(&self, _view: &ActiveView) {}
}

/// Everything a ledger operation needs to know about its surroundings.
pub struct ProfileContext<'a> {
    pub view: ActiveView,
    pub linked_accounts: Vec<LinkedAccount>,
    pub resolver: &'a dyn ProfileIdResolver,
    pub scope_policy: ScopePolicy,
}

impl<'a> ProfileContext<'a> {
    #[must_use]
    pub fn new(view: ActiveView, resolver: &'a dyn ProfileIdResolver) -> Self {
        Self {
            view,
            linked_accounts: Vec::new(),
            resolver,
            scope_policy: ScopePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_linked_accounts(mut self, accounts: Vec<LinkedAccount>) -> Self {
        self.linked_accounts = accounts;
        self
    }

    #[must_use]
    pub const fn with_scope_policy(mut self, policy: ScopePolicy) -> Self {
        self.scope_policy = policy;
        self
    }

    #[must_use]
    pub fn is_combined_view(&self) -> bool {
        self.view == ActiveView::Combined
    }

    #[must_use]
    pub fn match_scope(&self, profile_id: Option<&str>) -> MatchScope {
        self.scope_policy.scope(self.is_combined_view(), profile_id)
    }

    /// Discriminator stamped onto a favorite saved from this context.
    ///
    /// In the combined view this is the linked accounts' numeric ids joined
    /// with `-` (the account key stands in for an unresolved id), or `C`
    /// when fewer than two accounts are linked. Elsewhere it is the caller
    /// id, defaulting to `0`.
    #[must_use]
    pub fn effective_discriminator(&self, profile_id: Option<&str>) -> String {
        if self.is_combined_view() {
            if self.linked_accounts.len() < 2 {
                return COMBINED_DISCRIMINATOR.to_string();
            }
            return self
                .linked_accounts
                .iter()
                .map(|account| {
                    self.resolver
                        .profile_id(&account.key)
                        .map_or_else(|| account.key.clone(), |id| id.to_string())
                })
                .collect::<Vec<_>>()
                .join(&LINKED_ID_SEPARATOR.to_string());
        }
        caller_id(profile_id)
            .unwrap_or(DEFAULT_PROFILE_ID)
            .to_string()
    }
}

impl fmt::Debug for ProfileContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileContext")
            .field("view", &self.view)
            .field("linked_accounts", &self.linked_accounts)
            .field("scope_policy", &self.scope_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedIds(HashMap<&'static str, u32>);

    impl ProfileIdResolver for FixedIds {
        fn profile_id(&self, key: &str) -> Option<u32> {
            self.0.get(key).copied()
        }
    }

    fn account(key: &str) -> LinkedAccount {
        LinkedAccount {
            key: key.into(),
            email: None,
        }
    }

    #[test]
    fn profile_view_uses_caller_id_or_zero() {
        let ctx = ProfileContext::new(ActiveView::Profile("gobo-a".into()), &NoProfileIds);
        assert_eq!(ctx.effective_discriminator(Some("4")), "4");
        assert_eq!(ctx.effective_discriminator(Some("")), "0");
        assert_eq!(ctx.effective_discriminator(None), "0");
    }

    #[test]
    fn combined_view_joins_linked_ids() {
        let ids = FixedIds(HashMap::from([("gobo-a", 3), ("gobo-b", 4)]));
        let ctx = ProfileContext::new(ActiveView::Combined, &ids)
            .with_linked_accounts(vec![account("gobo-a"), account("gobo-b")]);
        assert_eq!(ctx.effective_discriminator(Some("9")), "3-4");
    }

    #[test]
    fn unresolved_linked_id_falls_back_to_key() {
        let ids = FixedIds(HashMap::from([("gobo-a", 3)]));
        let ctx = ProfileContext::new(ActiveView::Combined, &ids)
            .with_linked_accounts(vec![account("gobo-a"), account("gobo-z")]);
        assert_eq!(ctx.effective_discriminator(None), "3-gobo-z");
    }

    #[test]
    fn combined_view_with_one_account_uses_c() {
        let ctx = ProfileContext::new(ActiveView::Combined, &NoProfileIds)
            .with_linked_accounts(vec![account("gobo-a")]);
        assert_eq!(ctx.effective_discriminator(None), "C");
    }

    #[test]
    fn view_storage_keys() {
        assert_eq!(ActiveView::Favorites.storage_key(), "goob-favorites");
        assert_eq!(ActiveView::Combined.storage_key(), "goob-combined");
        assert_eq!(ActiveView::Profile("gobo-a".into()).storage_key(), "gobo-a");
    }
}
