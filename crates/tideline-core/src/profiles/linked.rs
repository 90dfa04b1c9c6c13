use crate::store::{ProfileStore, StoreError, load_json, save_json};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Store key holding the linked account list.
pub const LINKED_ACCOUNTS_KEY: &str = "goboLinkedAccounts";

/// A profile the user linked for the combined view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub key: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Linked accounts in link order; empty when unset or unreadable.
#[must_use]
pub fn load_linked_accounts(store: &dyn ProfileStore) -> Vec<LinkedAccount> {
    match load_json(store, LINKED_ACCOUNTS_KEY) {
        Ok(accounts) => accounts.unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable linked accounts");
            Vec::new()
        }
    }
}

pub fn save_linked_accounts(store: &dyn ProfileStore, accounts: &[LinkedAccount]) -> Result<(), StoreError> {
    save_json(store, LINKED_ACCOUNTS_KEY, accounts)
}
